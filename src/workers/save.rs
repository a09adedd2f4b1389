// src/workers/save.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use crate::chain::Task;
use crate::engine::Outcome;
use crate::fs::FileSystem;
use crate::types::{Data, Value};
use crate::workers::{KEY_IMAGE_URI, KEY_OUTPUT_URI};

const TITLE: &str = "blurred-image";

/// Task that copies the image at `uri` into `save_dir` and outputs the saved
/// path as `outputUri`.
///
/// Without an upstream `uri` there is nothing to save; the task succeeds with
/// no output.
pub fn save_task(fs: Arc<dyn FileSystem>, save_dir: PathBuf) -> Task {
    Task::blocking("save", move |input| {
        let Some(uri) = input.get(KEY_IMAGE_URI).and_then(Value::as_str) else {
            info!("no image to save");
            return Outcome::empty();
        };

        match save_image(fs.as_ref(), Path::new(uri), &save_dir) {
            Ok(saved) => {
                info!(source = %uri, saved = %saved.display(), "image saved");
                let mut output = Data::new();
                output.insert(
                    KEY_OUTPUT_URI.to_string(),
                    Value::from(saved.to_string_lossy().into_owned()),
                );
                Outcome::success(output)
            }
            Err(e) => Outcome::failure(format!("{e:#}")),
        }
    })
    .with_output(KEY_OUTPUT_URI)
}

fn save_image(fs: &dyn FileSystem, source: &Path, save_dir: &Path) -> Result<PathBuf> {
    let image = fs.read(source)?;
    let stamp = Utc::now().format("%Y%m%d-%H%M%S%.3f");
    let target = save_dir.join(format!("{TITLE}-{stamp}.png"));
    fs.write(&target, &image)?;
    Ok(target)
}
