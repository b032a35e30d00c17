use std::sync::Arc;

use tracing::{debug, info};

use crate::db::DatabaseBackend;
use crate::error::{AppError, Result};
use crate::models::{EntryKind, HistoryEntry, Record, User};

/// Per-user, append-only history of analysis results.
#[derive(Clone)]
pub struct HistoryLedger {
    db: Arc<dyn DatabaseBackend>,
}

impl HistoryLedger {
    pub fn new(db: Arc<dyn DatabaseBackend>) -> Self {
        Self { db }
    }

    /// Record a result for `user`.
    ///
    /// The entry is written before the profile references it. A crash between
    /// the two leaves an unreferenced entry, never a dangling reference.
    pub async fn append(
        &self,
        user: &User,
        image_ref: String,
        response: Option<Record>,
        kind: EntryKind,
    ) -> Result<HistoryEntry> {
        let entry = HistoryEntry::new(image_ref, kind, response);
        self.db.create_history_entry(&entry).await?;

        self.db.ensure_profile(&user.id, &user.email).await?;
        if !self.db.append_history_ref(&user.id, &entry.id).await? {
            return Err(AppError::Internal(format!(
                "Profile for user {} vanished during history append",
                user.id
            )));
        }

        info!(user_id = %user.id, entry_id = %entry.id, kind = %kind, "History entry appended");
        Ok(entry)
    }

    /// Most recent first. Empty when the user has no profile yet.
    pub async fn list(&self, user_id: &str) -> Result<Vec<HistoryEntry>> {
        let entries = self.db.list_history(user_id).await?;
        debug!(user_id, count = entries.len(), "History listed");
        Ok(entries)
    }
}
