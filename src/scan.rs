//! Input discovery.
//!
//! Turns what the user selected (any mix of files and folders) into the
//! ordered list of files to convert:
//!
//! - a **file** is kept when its extension is accepted (`png`, `jpg`, `jpeg`,
//!   `bmp`, `tiff`, any case) and skipped otherwise;
//! - a **folder** is walked recursively and every accepted file inside it is
//!   collected, sorted by name within each directory.
//!
//! Selections are expanded in the order given. A selection that does not
//! exist stops the batch before it starts.

use crate::imaging::is_supported_input;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Input not found: {0}")]
    NotFound(PathBuf),
    #[error("Cannot read directory: {0}")]
    Walk(#[from] walkdir::Error),
}

fn collect_dir(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), ScanError> {
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && is_supported_input(entry.path()) {
            out.push(entry.into_path());
        }
    }
    Ok(())
}

/// Expand files and folders into the list of convertible files.
pub fn collect_inputs<P: AsRef<Path>>(selections: &[P]) -> Result<Vec<PathBuf>, ScanError> {
    let mut inputs = Vec::new();

    for selection in selections {
        let path = selection.as_ref();
        if path.is_dir() {
            collect_dir(path, &mut inputs)?;
        } else if path.is_file() {
            if is_supported_input(path) {
                inputs.push(path.to_path_buf());
            } else {
                tracing::info!(path = %path.display(), "skipping unsupported file");
            }
        } else {
            return Err(ScanError::NotFound(path.to_path_buf()));
        }
    }

    Ok(inputs)
}
