use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Record;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failure,
}

/// Caller-visible result of an analysis request.
///
/// Failures the pipeline expects (unreadable image, wrong content type,
/// unrenderable PDF) are reported through this shape, not through an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisOutcome {
    pub status: OutcomeStatus,
    pub message: Value,
}

impl AnalysisOutcome {
    pub fn success(record: Record) -> Self {
        Self {
            status: OutcomeStatus::Success,
            message: Value::Object(record),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Failure,
            message: Value::String(message.into()),
        }
    }
}

pub const UNREADABLE_IMAGE: &str = "Could not read image";
pub const UNDECODABLE_IMAGE: &str = "Could not process image file.";
pub const NOT_A_PDF: &str = "File must be a PDF";
pub const UNPROCESSABLE_PDF: &str = "Could not process PDF file.";

/// An uploaded file as received from a multipart field.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }
}
