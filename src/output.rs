//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Progress (one line per finished file, in completion order)
//!
//! ```text
//! [ 33%] dawn.png → webp/dawn.webp
//! [ 66%] dusk.png → webp/dusk_1.webp (renamed from dusk.webp)
//! [100%] notes.jpg failed: Failed to convert notes.jpg: ...
//! ```
//!
//! ## Summary
//!
//! ```text
//! Converted 2 image(s).
//! The output directory contained files with identical names.
//! The following converted files have been renamed:
//!     dusk.webp -> dusk_1.webp
//! Failed 1 image(s):
//!     Failed to convert notes.jpg: ...
//! ```
//!
//! # Architecture
//!
//! Each `format_*` function returns `Vec<String>` for testability and has a
//! `print_*` wrapper that writes to stdout. Format functions are pure.

use crate::process::BatchEvent;
use crate::types::{BatchResult, ConversionOutcome};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Format one progress event.
pub fn format_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Completed {
            outcome,
            rename,
            progress,
        } => {
            let prefix = format!("[{:>3}%]", progress.percent());
            let line = match outcome {
                ConversionOutcome::Success { input, output } => match rename {
                    Some(r) => format!(
                        "{} {} → {} (renamed from {})",
                        prefix,
                        file_name(input),
                        output.display(),
                        r.original
                    ),
                    None => format!("{} {} → {}", prefix, file_name(input), output.display()),
                },
                ConversionOutcome::Failure { input, reason, .. } => {
                    format!("{} {} failed: {}", prefix, file_name(input), reason)
                }
            };
            vec![line]
        }
    }
}

/// Format the completion summary for a batch.
pub fn format_summary(result: &BatchResult) -> Vec<String> {
    let mut lines = vec![format!("Converted {} image(s).", result.success_count())];

    if !result.renames.is_empty() {
        lines.push("The output directory contained files with identical names.".to_string());
        lines.push("The following converted files have been renamed:".to_string());
        for record in &result.renames {
            lines.push(format!("{}{}", indent(1), record));
        }
    }

    let failures: Vec<&ConversionOutcome> = result.failures().collect();
    if !failures.is_empty() {
        lines.push(format!("Failed {} image(s):", failures.len()));
        for failure in failures {
            if let ConversionOutcome::Failure { reason, .. } = failure {
                // Reasons may span lines; keep continuation lines aligned
                for (i, part) in reason.lines().enumerate() {
                    let depth = if i == 0 { 1 } else { 2 };
                    lines.push(format!("{}{}", indent(depth), part));
                }
            }
        }
    }

    lines
}

pub fn print_event(event: &BatchEvent) {
    for line in format_event(event) {
        println!("{}", line);
    }
}

pub fn print_summary(result: &BatchResult) {
    for line in format_summary(result) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Progress;
    use crate::types::{FailureKind, RenameRecord};
    use std::path::PathBuf;

    fn success(input: &str, output: &str) -> ConversionOutcome {
        ConversionOutcome::Success {
            input: PathBuf::from(input),
            output: PathBuf::from(output),
        }
    }

    fn failure(input: &str, reason: &str) -> ConversionOutcome {
        ConversionOutcome::Failure {
            input: PathBuf::from(input),
            kind: FailureKind::Input,
            reason: reason.to_string(),
        }
    }

    #[test]
    fn event_success_line() {
        let event = BatchEvent::Completed {
            outcome: success("in/dawn.png", "out/dawn.webp"),
            rename: None,
            progress: Progress {
                completed: 1,
                total: 3,
            },
        };
        assert_eq!(format_event(&event), vec!["[ 33%] dawn.png → out/dawn.webp"]);
    }

    #[test]
    fn event_renamed_line() {
        let event = BatchEvent::Completed {
            outcome: success("in/dusk.png", "out/dusk_1.webp"),
            rename: Some(RenameRecord {
                original: "dusk.webp".into(),
                renamed: "dusk_1.webp".into(),
            }),
            progress: Progress {
                completed: 2,
                total: 3,
            },
        };
        assert_eq!(
            format_event(&event),
            vec!["[ 66%] dusk.png → out/dusk_1.webp (renamed from dusk.webp)"]
        );
    }

    #[test]
    fn event_failure_line() {
        let event = BatchEvent::Completed {
            outcome: failure("in/notes.jpg", "Failed to convert notes.jpg: boom"),
            rename: None,
            progress: Progress {
                completed: 3,
                total: 3,
            },
        };
        assert_eq!(
            format_event(&event),
            vec!["[100%] notes.jpg failed: Failed to convert notes.jpg: boom"]
        );
    }

    #[test]
    fn summary_plain() {
        let result = BatchResult {
            outcomes: vec![success("a.png", "a.webp"), success("b.png", "b.webp")],
            renames: vec![],
        };
        assert_eq!(format_summary(&result), vec!["Converted 2 image(s)."]);
    }

    #[test]
    fn summary_lists_renames_and_failures() {
        let result = BatchResult {
            outcomes: vec![
                success("a.png", "a_1.webp"),
                failure("c.jpg", "Failed to convert c.jpg: first\nsecond"),
            ],
            renames: vec![RenameRecord {
                original: "a.webp".into(),
                renamed: "a_1.webp".into(),
            }],
        };
        assert_eq!(
            format_summary(&result),
            vec![
                "Converted 1 image(s).",
                "The output directory contained files with identical names.",
                "The following converted files have been renamed:",
                "    a.webp -> a_1.webp",
                "Failed 1 image(s):",
                "    Failed to convert c.jpg: first",
                "        second",
            ]
        );
    }
}
