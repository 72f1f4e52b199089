//! # webp-batch
//!
//! Batch converter from PNG, JPEG, BMP and TIFF to WebP. Optionally carries a
//! node-graph generator's `workflow` JSON (stored in PNG text chunks) into
//! the EXIF ImageDescription of the converted file, so the workflow can be
//! recovered from the much smaller WebP.
//!
//! # Pipeline
//!
//! ```text
//! selections ──scan──► inputs ──request──► engine ──rayon pool──► worker × N
//!                                            │                     decode
//!                                            │                     (filter workflow)
//!                                            │                     encode WebP
//!                                            │                     reserve name + write
//!                                            ◄── FileReport ───────┘
//!                                  BatchEvent per file, BatchResult at the end
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Expands files and folders (recursively) into accepted inputs |
//! | [`process`] | The batch engine: request validation, worker pool, aggregation, events |
//! | [`convert`] | Converts one file in plain or workflow-preserving mode |
//! | [`naming`] | Collision-safe output names with atomic reservation |
//! | [`workflow`] | Pure workflow JSON filtering |
//! | [`imaging`] | Codec adapter: decode, text chunks, WebP encode, EXIF embedding |
//! | [`config`] | Optional TOML defaults and thread-count resolution |
//! | [`types`] | Outcomes, rename records and the batch result |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## No Overwrites, Ever
//!
//! An existing file is never replaced. Names are claimed with an exclusive
//! create, so concurrent workers writing same-named outputs into one folder
//! get `name.webp`, `name_1.webp`, ... and every rename is reported.
//!
//! ## Failures Are Data
//!
//! A broken input produces a `Failure` outcome with the underlying error
//! text; the rest of the batch carries on. Only an invalid request or a pool
//! that cannot start fails the batch as a whole.
//!
//! ## Events Over Callbacks
//!
//! Progress is published over a channel from a single aggregator, so a front
//! end reads monotonic percentages without sharing state with the workers.

pub mod config;
pub mod convert;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod process;
pub mod scan;
pub mod types;
pub mod workflow;

pub use naming::OutputTarget;
pub use process::{
    BatchError, BatchEvent, ConversionRequest, Progress, RequestError, convert_batch,
    spawn_batch,
};
pub use types::{BatchResult, ConversionOutcome, FailureKind, RenameRecord};
