use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntryKind, Record};

/// Immutable record of one analysed upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: String,
    pub image_ref: String,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub response: Option<Record>,
}

impl HistoryEntry {
    pub fn new(image_ref: String, kind: EntryKind, response: Option<Record>) -> Self {
        Self {
            id: nanoid::nanoid!(),
            image_ref,
            date: Utc::now(),
            kind,
            response,
        }
    }
}
