// tests/logging_filter.rs

use tracing_subscriber::filter::LevelFilter;
use workchain::cli::LogLevel;
use workchain::logging::build_filter;

#[test]
fn cli_level_wins_over_environment() {
    let filter = build_filter(Some(LogLevel::Debug), Some("error"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
}

#[test]
fn environment_directives_are_used_without_cli_level() {
    let filter = build_filter(None, Some("warn"));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
}

#[test]
fn blank_environment_falls_back_to_info() {
    let filter = build_filter(None, Some("   "));
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));

    let filter = build_filter(None, None);
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
}
