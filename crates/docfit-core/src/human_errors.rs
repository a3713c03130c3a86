// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the operator preparing an upload.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The severity levels drive how a front-end presents the problem.

use crate::error::DocfitError;

/// Severity of an error from the operator's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Something about the file must change (smaller image, other format).
    ActionRequired,
    /// The requirement or configuration itself is wrong.
    InvalidInput,
    /// Cannot be fixed by the operator: a bug in the tool.
    Defect,
    /// A temporary problem; trying again may help.
    Transient,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the operator should try (shown as body text).
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert a `DocfitError` into a `HumanError`.
pub fn humanize_error(err: &DocfitError) -> HumanError {
    match err {
        DocfitError::InvalidRequirement(detail) => HumanError {
            message: "The upload requirement doesn't make sense.".into(),
            suggestion: format!("Check the size limit and dimensions for this document. ({detail})"),
            severity: Severity::InvalidInput,
        },

        DocfitError::InvalidConfig(detail) => HumanError {
            message: "The settings file has a problem.".into(),
            suggestion: format!("Fix or remove the settings file, then try again. ({detail})"),
            severity: Severity::InvalidInput,
        },

        DocfitError::UnsupportedFormat(detail) => HumanError {
            message: "This type of file can't be converted.".into(),
            suggestion: format!("Save the file as a JPEG or PNG image first, then try again. ({detail})"),
            severity: Severity::ActionRequired,
        },

        DocfitError::Decode(_) => HumanError {
            message: "This image couldn't be opened.".into(),
            suggestion: "The file may be damaged or not really an image. Try opening it on a computer and saving it again as a JPEG.".into(),
            severity: Severity::ActionRequired,
        },

        DocfitError::DecodeTimeout { seconds } => HumanError {
            message: "This image took too long to open.".into(),
            suggestion: format!(
                "Opening the image took more than {seconds} seconds. Try a smaller photo, or take a new one at a lower resolution."
            ),
            severity: Severity::Transient,
        },

        DocfitError::Encode(_) | DocfitError::PdfError(_) => HumanError {
            message: "The converted file couldn't be created.".into(),
            suggestion: "Try again. If this keeps happening, try a different image.".into(),
            severity: Severity::Transient,
        },

        DocfitError::Stage { stage, detail } => HumanError {
            message: format!("A processing step ({stage}) didn't work."),
            suggestion: format!("Try a different image, or convert it yourself first. ({detail})"),
            severity: Severity::ActionRequired,
        },

        DocfitError::CompressionExhausted {
            original_bytes,
            ceiling_bytes,
            ..
        } => HumanError {
            message: "This image can't be made small enough.".into(),
            suggestion: format!(
                "The file is {} and the limit is {}. Crop away empty borders, use a simpler scan, or check whether a larger limit applies.",
                format_size(*original_bytes),
                format_size(*ceiling_bytes)
            ),
            severity: Severity::ActionRequired,
        },

        DocfitError::ValidationFailure(_) | DocfitError::Task(_) => HumanError {
            message: "Something went wrong inside the converter.".into(),
            suggestion: "This is a bug, not a problem with your file. Please report it along with the transformation log.".into(),
            severity: Severity::Defect,
        },

        DocfitError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The file couldn't be read or written.".into(),
                    suggestion: "Check the file permissions, or try a different folder.".into(),
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: format!("Try again. ({io_err})"),
                    severity: Severity::Transient,
                }
            }
        }

        DocfitError::Serialization(_) => HumanError {
            message: "A settings or report file is malformed.".into(),
            suggestion: "Check that the file is valid JSON.".into(),
            severity: Severity::InvalidInput,
        },
    }
}

/// Format a byte count the way portals quote limits ("200 KB", "1.5 MB").
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    let value = bytes as f64;
    if value >= MB {
        format!("{:.1} MB", value / MB)
    } else if value >= KB {
        format!("{:.0} KB", value / KB)
    } else {
        format!("{bytes} bytes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Stage;

    #[test]
    fn exhausted_mentions_sizes() {
        let err = DocfitError::CompressionExhausted {
            original_bytes: 4 * 1024 * 1024,
            target_bytes: 170 * 1024,
            ceiling_bytes: 200 * 1024,
            ratio: 20.0,
        };
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains("4.0 MB"));
        assert!(human.suggestion.contains("200 KB"));
    }

    #[test]
    fn validation_failure_is_defect() {
        let human = humanize_error(&DocfitError::ValidationFailure("size 11 > 10".into()));
        assert_eq!(human.severity, Severity::Defect);
    }

    #[test]
    fn timeout_is_transient() {
        let human = humanize_error(&DocfitError::DecodeTimeout { seconds: 10 });
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.suggestion.contains("10 seconds"));
    }

    #[test]
    fn stage_error_names_stage() {
        let err = DocfitError::Stage {
            stage: Stage::FormatConvert,
            detail: "webp encoder unavailable".into(),
        };
        assert!(humanize_error(&err).message.contains("format-convert"));
    }

    #[test]
    fn sizes_format_like_portals() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(200 * 1024), "200 KB");
        assert_eq!(format_size(1536 * 1024), "1.5 MB");
    }
}
