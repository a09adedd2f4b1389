// src/workers/mod.rs

//! Workers for the image pipeline: clean up old outputs, blur N times, save.
//!
//! Image decoding and the blur itself belong to an [`ImageFilter`]
//! collaborator supplied by the embedding application. Storage goes through
//! [`FileSystem`] so the workers run against an in-memory tree in tests.

use std::path::PathBuf;
use std::sync::Arc;

use crate::chain::{Chain, begin_with};
use crate::errors::Result;
use crate::fs::FileSystem;

pub mod blur;
pub mod cleanup;
pub mod save;

pub use blur::blur_task;
pub use cleanup::cleanup_task;
pub use save::save_task;

/// Input/output key holding the path of the image being processed.
pub const KEY_IMAGE_URI: &str = "uri";

/// Output key holding the path of the saved image.
pub const KEY_OUTPUT_URI: &str = "outputUri";

/// Image transformation applied by each blur pass.
pub trait ImageFilter: Send + Sync + 'static {
    fn apply(&self, image: &[u8]) -> anyhow::Result<Vec<u8>>;
}

/// Filter that returns the image unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughFilter;

impl ImageFilter for PassthroughFilter {
    fn apply(&self, image: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(image.to_vec())
    }
}

/// Directories used by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Scratch directory for intermediate blur outputs; emptied by cleanup.
    pub output_dir: PathBuf,
    /// Where the final image is saved.
    pub save_dir: PathBuf,
}

/// Build `cleanup -> blur x blur_level -> save`.
///
/// Only the first blur pass receives `input_uri`; later passes read the
/// previous pass's output. With `blur_level == 0` the chain is just cleanup
/// followed by save.
pub fn blur_pipeline(
    fs: Arc<dyn FileSystem>,
    filter: Arc<dyn ImageFilter>,
    settings: &PipelineSettings,
    input_uri: Option<&str>,
    blur_level: u32,
) -> Result<Chain> {
    let mut builder = begin_with(cleanup_task(Arc::clone(&fs), settings.output_dir.clone()));

    for pass in 0..blur_level {
        let mut task = blur_task(Arc::clone(&fs), Arc::clone(&filter), settings.output_dir.clone());
        if pass == 0 {
            if let Some(uri) = input_uri {
                task = task.with_input(KEY_IMAGE_URI, uri);
            }
        }
        builder = builder.then(task);
    }

    builder
        .then(save_task(fs, settings.save_dir.clone()))
        .build()
}
