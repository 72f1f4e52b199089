//! Batch conversion engine.
//!
//! Takes a validated [`ConversionRequest`], fans one task per input out onto
//! a bounded [rayon](https://docs.rs/rayon) pool, and folds the per-file
//! reports into a [`BatchResult`].
//!
//! ## Flow
//!
//! ```text
//! caller thread                      pool (N workers)
//! ─────────────                      ────────────────
//! spawn task × inputs      ───────►  convert_file(input)
//! recv report  ◄───────────────────  send FileReport
//!   append outcome / rename
//!   emit BatchEvent::Completed { progress }
//! ...until every task reported
//! ```
//!
//! The caller thread only aggregates, so progress events come from a single
//! place in completion order: exactly one per input, with a non-decreasing
//! percentage. A failed file never stops the others, even when the codec
//! panics on it; nothing is retried and a started batch cannot be cancelled.
//!
//! [`spawn_batch`] runs the same loop on a dedicated thread so a front end
//! stays responsive and reads events from a channel.

use crate::config::effective_threads;
use crate::convert::{ConversionMode, FileReport, convert_file};
use crate::imaging::{Codec, Quality, RustCodec};
use crate::naming::OutputTarget;
use crate::scan::{ScanError, collect_inputs};
use crate::types::{BatchResult, ConversionOutcome, RenameRecord};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;
use thiserror::Error;

/// Problems with a request, detected before any work is dispatched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Select at least one image file or folder")]
    EmptyInputs,
    #[error("Quality must be between 1 and 100, got {0}")]
    QualityOutOfRange(u32),
    #[error("Select an output directory or write next to the source files")]
    MissingOutputDir,
    #[error("Thread count must be at least 1")]
    ZeroConcurrency,
}

/// Batch-level failures. Per-file problems are never reported here.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Invalid request: {0}")]
    Request(#[from] RequestError),
    #[error("Cannot collect inputs: {0}")]
    Scan(#[from] ScanError),
    #[error("Cannot start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Cannot start conversion thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Conversion thread stopped unexpectedly")]
    Aborted,
}

/// One user-initiated conversion. Valid by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    inputs: Vec<PathBuf>,
    target: OutputTarget,
    quality: Quality,
    mode: ConversionMode,
    concurrency: usize,
}

impl ConversionRequest {
    /// Validate and build a request.
    ///
    /// `concurrency` of `None` uses every hardware thread; larger values are
    /// clamped down to the hardware count.
    pub fn new(
        inputs: Vec<PathBuf>,
        target: OutputTarget,
        quality: u32,
        preserve_workflow: bool,
        concurrency: Option<usize>,
    ) -> Result<Self, RequestError> {
        if inputs.is_empty() {
            return Err(RequestError::EmptyInputs);
        }
        let quality = Quality::new(quality).ok_or(RequestError::QualityOutOfRange(quality))?;
        if matches!(&target, OutputTarget::Directory(dir) if dir.as_os_str().is_empty()) {
            return Err(RequestError::MissingOutputDir);
        }
        if concurrency == Some(0) {
            return Err(RequestError::ZeroConcurrency);
        }
        let concurrency = effective_threads(concurrency);
        let mode = if preserve_workflow {
            ConversionMode::PreserveWorkflow
        } else {
            ConversionMode::Plain
        };

        Ok(Self {
            inputs,
            target,
            quality,
            mode,
            concurrency,
        })
    }

    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    pub fn target(&self) -> &OutputTarget {
        &self.target
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn mode(&self) -> ConversionMode {
        self.mode
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }
}

/// Expand user selections (files and folders) and build a request from them.
pub fn prepare_request<P: AsRef<Path>>(
    selections: &[P],
    target: OutputTarget,
    quality: u32,
    preserve_workflow: bool,
    concurrency: Option<usize>,
) -> Result<ConversionRequest, BatchError> {
    let inputs = collect_inputs(selections)?;
    Ok(ConversionRequest::new(
        inputs,
        target,
        quality,
        preserve_workflow,
        concurrency,
    )?)
}

/// Tasks finished so far out of the batch total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Integer percentage, truncated.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        (self.completed * 100 / self.total) as u8
    }
}

/// Notifications sent to the subscriber while a batch runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// One input finished, successfully or not.
    Completed {
        outcome: ConversionOutcome,
        rename: Option<RenameRecord>,
        progress: Progress,
    },
}

/// Run a batch with the production codec on the current thread.
pub fn convert_batch(
    request: &ConversionRequest,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchResult, BatchError> {
    convert_batch_with_codec(&RustCodec::new(), request, events)
}

/// Run a batch with a specific codec (allows testing with a mock).
pub fn convert_batch_with_codec(
    codec: &impl Codec,
    request: &ConversionRequest,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchResult, BatchError> {
    let total = request.inputs.len();
    tracing::info!(
        files = total,
        threads = request.concurrency,
        quality = request.quality.value(),
        mode = ?request.mode,
        "starting batch"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(request.concurrency)
        .thread_name(|i| format!("webp-worker-{i}"))
        .build()?;

    let (done_tx, done_rx) = mpsc::channel::<FileReport>();

    let result = pool.in_place_scope(|scope| {
        for input in &request.inputs {
            let done_tx = done_tx.clone();
            scope.spawn(move |_| {
                let report = convert_file(codec, input, &request.target, request.quality, request.mode);
                // The aggregator outlives every task, so this cannot fail
                let _ = done_tx.send(report);
            });
        }
        drop(done_tx);

        let mut result = BatchResult::default();
        for (index, report) in done_rx.iter().enumerate() {
            let FileReport { outcome, rename } = report;
            let progress = Progress {
                completed: index + 1,
                total,
            };

            if let Some(tx) = &events {
                // A subscriber that hung up just stops receiving
                let _ = tx.send(BatchEvent::Completed {
                    outcome: outcome.clone(),
                    rename: rename.clone(),
                    progress,
                });
            }

            result.renames.extend(rename);
            result.outcomes.push(outcome);
        }
        result
    });

    tracing::info!(
        converted = result.success_count(),
        failed = result.failure_count(),
        renamed = result.renames.len(),
        "batch finished"
    );
    Ok(result)
}

/// A batch running on its own thread.
pub struct BatchHandle {
    events: Receiver<BatchEvent>,
    thread: JoinHandle<Result<BatchResult, BatchError>>,
}

impl BatchHandle {
    /// Progress events, in completion order. The iterator ends when the batch does.
    pub fn events(&self) -> &Receiver<BatchEvent> {
        &self.events
    }

    /// Wait for the terminal result.
    pub fn join(self) -> Result<BatchResult, BatchError> {
        self.thread.join().map_err(|_| BatchError::Aborted)?
    }
}

/// Start a batch in the background with the production codec.
pub fn spawn_batch(request: ConversionRequest) -> Result<BatchHandle, BatchError> {
    let (tx, rx) = mpsc::channel();
    let thread = std::thread::Builder::new()
        .name("webp-batch".into())
        .spawn(move || convert_batch(&request, Some(tx)))?;
    Ok(BatchHandle { events: rx, thread })
}
