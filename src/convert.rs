//! Single-file conversion.
//!
//! One call converts one input into one `.webp` and always yields exactly one
//! [`ConversionOutcome`]; errors are folded into `Failure` outcomes, never
//! returned or panicked past this module.
//!
//! Two modes share the decode → encode → write path. They differ in how the
//! encoder parameters are built, and only the workflow mode reads the
//! source's text chunks:
//!
//! | Mode | Inputs | Pixels | Encoder | Metadata |
//! |---|---|---|---|---|
//! | [`ConversionMode::Plain`] | any accepted format | as decoded (alpha kept) | lossy, method 4 | none |
//! | [`ConversionMode::PreserveWorkflow`] | PNG only | RGB8 | lossy, method 6 | EXIF 0x010E = `"Workflow:" + json` |

use crate::imaging::{
    Codec, CodecError, METHOD_BEST, Quality, TextMetadata, WebpParams, has_png_extension,
};
use crate::naming::{OutputTarget, reserve_output};
use crate::types::{ConversionOutcome, FailureKind, RenameRecord};
use crate::workflow::{WORKFLOW_KEY, filter_workflow};
use image::DynamicImage;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix stored in front of the workflow JSON in the EXIF comment.
pub const WORKFLOW_COMMENT_PREFIX: &str = "Workflow:";

/// How each file is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversionMode {
    #[default]
    Plain,
    /// Carry the PNG `workflow` text chunk over into the EXIF comment.
    PreserveWorkflow,
}

#[derive(Error, Debug)]
enum ConvertError {
    #[error(
        "keeping the workflow only works for PNG files; use PNG files that carry a workflow or disable workflow preservation"
    )]
    FormatMismatch,
    #[error("{0}")]
    Decode(CodecError),
    #[error("{0}")]
    Encode(CodecError),
    #[error("{0}")]
    Filesystem(#[from] std::io::Error),
    /// A codec panicked on this file.
    #[error("the image library crashed: {0}")]
    Crashed(String),
}

impl ConvertError {
    fn kind(&self) -> FailureKind {
        match self {
            ConvertError::FormatMismatch => FailureKind::FormatMismatch,
            ConvertError::Decode(_) | ConvertError::Crashed(_) => FailureKind::Input,
            ConvertError::Encode(_) => FailureKind::Encode,
            ConvertError::Filesystem(_) => FailureKind::Filesystem,
        }
    }
}

/// What one conversion produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub outcome: ConversionOutcome,
    /// Present only for successful conversions that had to be renamed.
    pub rename: Option<RenameRecord>,
}

/// Build the encoder parameters (and the bitmap to feed it).
///
/// `workflow_source` is the source's text metadata, present only when the
/// workflow is to be preserved.
fn plan_encode(
    bitmap: DynamicImage,
    workflow_source: Option<TextMetadata>,
    quality: Quality,
) -> (DynamicImage, WebpParams) {
    match workflow_source {
        None => (bitmap, WebpParams::lossy(quality)),
        Some(text) => {
            let workflow = match text.get(WORKFLOW_KEY) {
                Some(raw) => filter_workflow(raw).text,
                None => {
                    tracing::warn!("no `{WORKFLOW_KEY}` text chunk, storing an empty workflow");
                    String::new()
                }
            };
            let comment = format!("{WORKFLOW_COMMENT_PREFIX}{workflow}");
            let params = WebpParams {
                quality,
                lossless: false,
                method: METHOD_BEST,
                exif_comment: Some(comment),
            };
            (DynamicImage::ImageRgb8(bitmap.to_rgb8()), params)
        }
    }
}

fn try_convert(
    codec: &impl Codec,
    input: &Path,
    target: &OutputTarget,
    quality: Quality,
    mode: ConversionMode,
) -> Result<(PathBuf, Option<RenameRecord>), ConvertError> {
    if mode == ConversionMode::PreserveWorkflow && !has_png_extension(input) {
        return Err(ConvertError::FormatMismatch);
    }

    let bitmap = codec.decode(input).map_err(ConvertError::Decode)?;
    let workflow_source = match mode {
        ConversionMode::Plain => None,
        ConversionMode::PreserveWorkflow => {
            Some(codec.read_text(input).map_err(ConvertError::Decode)?)
        }
    };
    let (bitmap, params) = plan_encode(bitmap, workflow_source, quality);
    let bytes = codec
        .encode_webp(&bitmap, &params)
        .map_err(ConvertError::Encode)?;

    let reservation = reserve_output(input, &target.dir_for(input))?;
    Ok(reservation.commit(&bytes)?)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Convert one file. Never fails: errors, and panics raised by the codec,
/// become a `Failure` outcome.
pub fn convert_file(
    codec: &impl Codec,
    input: &Path,
    target: &OutputTarget,
    quality: Quality,
    mode: ConversionMode,
) -> FileReport {
    let attempt = catch_unwind(AssertUnwindSafe(|| {
        try_convert(codec, input, target, quality, mode)
    }))
    .unwrap_or_else(|payload| Err(ConvertError::Crashed(panic_message(payload.as_ref()))));

    match attempt {
        Ok((output, rename)) => {
            tracing::debug!(input = %input.display(), output = %output.display(), "converted");
            FileReport {
                outcome: ConversionOutcome::Success {
                    input: input.to_path_buf(),
                    output,
                },
                rename,
            }
        }
        Err(e) => {
            let name = input
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| input.display().to_string());
            let reason = format!("Failed to convert {name}: {e}");
            if matches!(e, ConvertError::Crashed(_)) {
                tracing::warn!(input = %input.display(), "{reason}");
            } else {
                tracing::debug!(input = %input.display(), "{reason}");
            }
            FileReport {
                outcome: ConversionOutcome::Failure {
                    input: input.to_path_buf(),
                    kind: e.kind(),
                    reason,
                },
                rename: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockCodec, RecordedOp};
    use std::fs;
    use tempfile::TempDir;

    fn q(value: u32) -> Quality {
        Quality::new(value).unwrap()
    }

    #[test]
    fn plain_mode_writes_output() {
        let tmp = TempDir::new().unwrap();
        let codec = MockCodec::new();
        let target = OutputTarget::Directory(tmp.path().join("out"));

        let report = convert_file(&codec, Path::new("/in/cat.jpg"), &target, q(70), ConversionMode::Plain);

        let expected = tmp.path().join("out/cat.webp");
        assert_eq!(
            report.outcome,
            ConversionOutcome::Success {
                input: "/in/cat.jpg".into(),
                output: expected.clone(),
            }
        );
        assert!(report.rename.is_none());
        assert!(fs::read(&expected).unwrap().starts_with(b"RIFF"));
        assert_eq!(codec.text_reads(), 0);
        assert_eq!(
            codec.encodes(),
            vec![RecordedOp::Encode {
                quality: 70,
                lossless: false,
                method: 4,
                exif_comment: None,
            }]
        );
    }

    #[test]
    fn workflow_mode_filters_and_prefixes() {
        let tmp = TempDir::new().unwrap();
        let codec = MockCodec::with_metadata(&[(
            "workflow",
            r#"{"nodes":[{"type":"LoraInfo"},{"type":"KSampler"}]}"#,
        )]);
        let target = OutputTarget::Directory(tmp.path().to_path_buf());

        let report = convert_file(
            &codec,
            Path::new("gen.PNG"),
            &target,
            q(87),
            ConversionMode::PreserveWorkflow,
        );

        assert!(report.outcome.is_success());
        assert_eq!(codec.text_reads(), 1);
        assert_eq!(
            codec.encodes(),
            vec![RecordedOp::Encode {
                quality: 87,
                lossless: false,
                method: 6,
                exif_comment: Some(r#"Workflow:{"nodes":[{"type":"KSampler"}]}"#.into()),
            }]
        );
    }

    #[test]
    fn workflow_mode_without_field_stores_bare_prefix() {
        let tmp = TempDir::new().unwrap();
        let codec = MockCodec::new();
        let target = OutputTarget::Directory(tmp.path().to_path_buf());

        convert_file(&codec, Path::new("gen.png"), &target, q(50), ConversionMode::PreserveWorkflow);

        assert!(matches!(
            &codec.encodes()[0],
            RecordedOp::Encode { exif_comment: Some(c), .. } if c == "Workflow:"
        ));
    }

    #[test]
    fn workflow_mode_rejects_non_png() {
        let tmp = TempDir::new().unwrap();
        let codec = MockCodec::new();
        let target = OutputTarget::Directory(tmp.path().to_path_buf());

        let report = convert_file(
            &codec,
            Path::new("photo.jpg"),
            &target,
            q(87),
            ConversionMode::PreserveWorkflow,
        );

        match report.outcome {
            ConversionOutcome::Failure { kind, reason, .. } => {
                assert_eq!(kind, FailureKind::FormatMismatch);
                assert!(reason.starts_with("Failed to convert photo.jpg"));
                assert!(reason.contains("PNG"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        // Never decoded, nothing written
        assert!(codec.get_operations().is_empty());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn decode_failure_is_input_error_with_cause() {
        let tmp = TempDir::new().unwrap();
        let codec = MockCodec::failing_on(&["bad.png"]);
        let target = OutputTarget::Directory(tmp.path().to_path_buf());

        let report = convert_file(&codec, Path::new("bad.png"), &target, q(87), ConversionMode::Plain);

        match report.outcome {
            ConversionOutcome::Failure { kind, reason, .. } => {
                assert_eq!(kind, FailureKind::Input);
                assert!(reason.contains("mock refuses bad.png"), "{reason}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn codec_panic_becomes_input_failure() {
        let tmp = TempDir::new().unwrap();
        let codec = MockCodec::panicking_on(&["boom.png"]);
        let target = OutputTarget::Directory(tmp.path().to_path_buf());

        let report = convert_file(&codec, Path::new("boom.png"), &target, q(87), ConversionMode::Plain);

        match report.outcome {
            ConversionOutcome::Failure { kind, reason, .. } => {
                assert_eq!(kind, FailureKind::Input);
                assert!(reason.starts_with("Failed to convert boom.png"), "{reason}");
                assert!(reason.contains("mock decoder crashed on boom.png"), "{reason}");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(report.rename.is_none());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn unwritable_output_dir_is_filesystem_error() {
        let tmp = TempDir::new().unwrap();
        // A regular file where the output directory should be
        let blocker = tmp.path().join("out");
        fs::write(&blocker, b"").unwrap();
        let codec = MockCodec::new();
        let target = OutputTarget::Directory(blocker);

        let report = convert_file(&codec, Path::new("a.png"), &target, q(87), ConversionMode::Plain);

        assert!(matches!(
            report.outcome,
            ConversionOutcome::Failure {
                kind: FailureKind::Filesystem,
                ..
            }
        ));
    }

    #[test]
    fn collision_reports_rename() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("dup.webp"), b"keep me").unwrap();
        let codec = MockCodec::new();
        let target = OutputTarget::Directory(tmp.path().to_path_buf());

        let report = convert_file(&codec, Path::new("dup.bmp"), &target, q(87), ConversionMode::Plain);

        assert_eq!(report.rename.unwrap().to_string(), "dup.webp -> dup_1.webp");
        assert_eq!(fs::read(tmp.path().join("dup.webp")).unwrap(), b"keep me");
    }

    #[test]
    fn same_folder_target_writes_next_to_input() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("nested/pic.tiff");
        let codec = MockCodec::new();

        let report = convert_file(
            &codec,
            &input,
            &OutputTarget::SourceDirectory,
            q(87),
            ConversionMode::Plain,
        );

        assert_eq!(
            report.outcome,
            ConversionOutcome::Success {
                input: input.clone(),
                output: tmp.path().join("nested/pic.webp"),
            }
        );
    }
}
