// src/workers/blur.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use uuid::Uuid;

use crate::chain::Task;
use crate::engine::Outcome;
use crate::fs::FileSystem;
use crate::types::{Data, Value};
use crate::workers::{ImageFilter, KEY_IMAGE_URI};

/// Task that applies one blur pass to the image at `uri` and outputs the
/// path of the blurred copy under the same key.
pub fn blur_task(fs: Arc<dyn FileSystem>, filter: Arc<dyn ImageFilter>, output_dir: PathBuf) -> Task {
    Task::blocking("blur", move |input| {
        let Some(uri) = input.get(KEY_IMAGE_URI).and_then(Value::as_str) else {
            return Outcome::failure(format!("missing input key '{KEY_IMAGE_URI}'"));
        };

        match blur_once(fs.as_ref(), filter.as_ref(), Path::new(uri), &output_dir) {
            Ok(written) => {
                info!(source = %uri, output = %written.display(), "blur pass written");
                let mut output = Data::new();
                output.insert(
                    KEY_IMAGE_URI.to_string(),
                    Value::from(written.to_string_lossy().into_owned()),
                );
                Outcome::success(output)
            }
            Err(e) => Outcome::failure(format!("{e:#}")),
        }
    })
    .with_output(KEY_IMAGE_URI)
}

fn blur_once(
    fs: &dyn FileSystem,
    filter: &dyn ImageFilter,
    source: &Path,
    output_dir: &Path,
) -> Result<PathBuf> {
    let image = fs.read(source)?;
    let blurred = filter
        .apply(&image)
        .with_context(|| format!("blurring {:?}", source))?;

    let target = output_dir.join(format!("blur-filter-output-{}.png", Uuid::new_v4()));
    fs.write(&target, &blurred)?;
    Ok(target)
}
