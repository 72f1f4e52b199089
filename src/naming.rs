//! Collision-safe output naming.
//!
//! Every input `dir/photo.png` maps to `photo.webp` inside its target
//! directory. When that name is taken, a numeric suffix is appended before
//! the extension until a free name is found:
//!
//! ```text
//! photo.webp      (exists)
//! photo_1.webp    (exists)
//! photo_2.webp    ← chosen, logged as "photo.webp -> photo_2.webp"
//! ```
//!
//! ## Concurrent workers
//!
//! Checking for existence and then writing later is a race: two workers
//! converting `a/photo.png` and `b/photo.jpg` into the same directory could
//! both see `photo.webp` as free and one would overwrite the other. Instead
//! each candidate is *reserved* with an exclusive create (`create_new`), which
//! the filesystem performs atomically. Whoever loses the race gets
//! `AlreadyExists` and moves on to the next suffix. The reservation holds the
//! open file until the encoded bytes are written, or removes the empty
//! placeholder if conversion fails.

use crate::types::RenameRecord;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Output file extension.
pub const OUTPUT_EXTENSION: &str = "webp";

/// Upper bound on suffix probing for a single name.
const MAX_SUFFIX: u32 = 1_000_000;

/// Where converted files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// One shared directory for every output.
    Directory(PathBuf),
    /// Next to each input file.
    SourceDirectory,
}

impl OutputTarget {
    /// Resolve the directory an input's output goes to.
    pub fn dir_for(&self, input: &Path) -> PathBuf {
        match self {
            OutputTarget::Directory(dir) => dir.clone(),
            OutputTarget::SourceDirectory => input
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

fn input_stem(input: &Path) -> io::Result<String> {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no file name", input.display()),
            )
        })
}

/// `photo.png` → `photo.webp`.
pub fn output_file_name(input: &Path) -> io::Result<String> {
    Ok(format!("{}.{}", input_stem(input)?, OUTPUT_EXTENSION))
}

/// `("photo", 2)` → `photo_2.webp`.
pub fn suffixed_name(stem: &str, counter: u32) -> String {
    format!("{stem}_{counter}.{OUTPUT_EXTENSION}")
}

/// An output path claimed on disk and not yet written.
#[derive(Debug)]
pub struct Reservation {
    path: PathBuf,
    rename: Option<RenameRecord>,
    file: File,
}

impl Reservation {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rename(&self) -> Option<&RenameRecord> {
        self.rename.as_ref()
    }

    /// Write the final bytes. On failure the partial file is removed.
    pub fn commit(mut self, bytes: &[u8]) -> io::Result<(PathBuf, Option<RenameRecord>)> {
        let written = self.file.write_all(bytes).and_then(|_| self.file.flush());
        match written {
            Ok(()) => Ok((self.path, self.rename)),
            Err(e) => {
                let Reservation { path, file, .. } = self;
                drop(file);
                remove_placeholder(&path);
                Err(e)
            }
        }
    }

    /// Give the name back: closes and deletes the empty placeholder.
    pub fn abandon(self) {
        let Reservation { path, file, .. } = self;
        drop(file);
        remove_placeholder(&path);
    }
}

fn remove_placeholder(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), "could not remove placeholder: {e}");
    }
}

fn try_claim(path: &Path) -> io::Result<Option<File>> {
    match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(e),
    }
}

/// Claim a non-colliding `.webp` path for `input` inside `dir`.
///
/// Creates `dir` (with parents) first. Never returns a path that existed
/// before the call, and never the same path to two callers.
pub fn reserve_output(input: &Path, dir: &Path) -> io::Result<Reservation> {
    std::fs::create_dir_all(dir)?;

    let stem = input_stem(input)?;
    let original = format!("{stem}.{OUTPUT_EXTENSION}");

    let first = dir.join(&original);
    if let Some(file) = try_claim(&first)? {
        return Ok(Reservation {
            path: first,
            rename: None,
            file,
        });
    }

    for counter in 1..=MAX_SUFFIX {
        let name = suffixed_name(&stem, counter);
        let candidate = dir.join(&name);
        if let Some(file) = try_claim(&candidate)? {
            tracing::debug!(from = %original, to = %name, "output name taken, renamed");
            return Ok(Reservation {
                path: candidate,
                rename: Some(RenameRecord {
                    original,
                    renamed: name,
                }),
                file,
            });
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {original} in {}", dir.display()),
    ))
}
