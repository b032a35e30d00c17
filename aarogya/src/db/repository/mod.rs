mod history;
mod profiles;
mod users;

pub use history::HistoryRepository;
pub use profiles::ProfileRepository;
pub use users::UserRepository;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{AppError, Result};

/// Fixed-width RFC 3339 so lexical order in SQL matches chronological order.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Internal(format!("Corrupt timestamp '{raw}': {e}")))
}
