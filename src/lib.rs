// src/lib.rs

pub mod chain;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod store;
pub mod types;
pub mod workers;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

pub use crate::chain::{Chain, ChainBuilder, Task, Worker, begin_with, begin_with_all};
pub use crate::engine::{ChainOutcome, ChainStatus, FailureReason, Outcome, TaskFailure};
pub use crate::errors::WorkchainError;
pub use crate::exec::{ChainHandle, Executor, ExecutorConfig};
pub use crate::store::ResultStore;
pub use crate::types::{ChainId, Data, Value};

use crate::cli::CliArgs;
use crate::config::load_or_default;
use crate::fs::{FileSystem, RealFileSystem};
use crate::workers::{KEY_OUTPUT_URI, PassthroughFilter, blur_pipeline};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (defaults when the file is missing)
/// - the blur pipeline chain
/// - the executor and the chain handle
/// - Ctrl-C handling (cancels the chain)
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = load_or_default(&args.config)?;
    if let Some(dir) = args.output_dir.clone() {
        cfg.pipeline.output_dir = dir;
    }

    let settings = cfg.pipeline_settings();
    let input = args.input.as_ref().map(|p| p.to_string_lossy().into_owned());
    if input.is_none() {
        warn!("no --input given; the chain will clean up and save nothing");
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let chain = blur_pipeline(
        fs,
        Arc::new(PassthroughFilter),
        &settings,
        input.as_deref(),
        args.blur_level,
    )?;

    if args.dry_run {
        print_dry_run(&chain);
        return Ok(());
    }

    let executor = Executor::new(cfg.executor_config());
    let handle = executor.enqueue(chain, Data::new());
    info!(chain_id = %handle.id(), "blur chain enqueued");

    // Ctrl-C → cooperative cancellation.
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            handle.cancel();
        });
    }

    let output = handle.await_result().await?.into_result()?;

    match output.get(KEY_OUTPUT_URI) {
        Some(uri) => println!("{uri}"),
        None => println!("{}", serde_json::to_string_pretty(&output)?),
    }

    Ok(())
}

/// Simple dry-run output: print nodes, tasks and their data contracts.
fn print_dry_run(chain: &Chain) {
    println!("workchain dry-run");
    println!("  nodes = {}", chain.len());
    println!("  tasks = {}", chain.task_count());
    println!();

    for (index, node) in chain.nodes().iter().enumerate() {
        println!("node {index}:");
        for task in node.tasks() {
            println!("  - {}", task.name());
            if !task.input().is_empty() {
                println!("      input: {:?}", task.input());
            }
            if !task.outputs().is_empty() {
                println!("      outputs: {:?}", task.outputs());
            }
            if let Some(timeout) = task.timeout() {
                println!("      timeout: {timeout:?}");
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
