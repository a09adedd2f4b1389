// src/workers/cleanup.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::chain::Task;
use crate::engine::Outcome;
use crate::fs::FileSystem;

/// Task that deletes leftover `.png` files from `output_dir`.
///
/// A missing directory counts as already clean.
pub fn cleanup_task(fs: Arc<dyn FileSystem>, output_dir: PathBuf) -> Task {
    Task::blocking("cleanup", move |_input| {
        match cleanup_dir(fs.as_ref(), &output_dir) {
            Ok(removed) => {
                info!(dir = %output_dir.display(), removed, "cleaned up temporary files");
                Outcome::empty()
            }
            Err(e) => {
                warn!(dir = %output_dir.display(), error = %e, "cleanup failed");
                Outcome::failure(format!("{e:#}"))
            }
        }
    })
}

/// Remove every `*.png` directly inside `dir`. Returns how many were deleted.
pub fn cleanup_dir(fs: &dyn FileSystem, dir: &Path) -> Result<usize> {
    if !fs.is_dir(dir) {
        debug!(dir = %dir.display(), "output directory absent; nothing to clean");
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs.read_dir(dir)? {
        let is_png = entry.extension().is_some_and(|ext| ext == "png");
        if !is_png || fs.is_dir(&entry) {
            continue;
        }

        fs.remove_file(&entry)?;
        debug!(file = %entry.display(), "deleted");
        removed += 1;
    }

    Ok(removed)
}
