use async_trait::async_trait;

use crate::error::Result;
use crate::models::{HistoryEntry, MedicalProfile, UpdateProfileRequest, User};

/// Account records owned by the auth subsystem.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<()>;
    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
}

/// At most one medical profile per user id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<MedicalProfile>>;
    async fn upsert_profile_fields(
        &self,
        user_id: &str,
        email: &str,
        update: &UpdateProfileRequest,
    ) -> Result<()>;
    async fn ensure_profile(&self, user_id: &str, email: &str) -> Result<()>;
    /// Returns `false` when the user has no profile row.
    async fn append_history_ref(&self, user_id: &str, entry_id: &str) -> Result<bool>;
    async fn count_profiles(&self) -> Result<u64>;
}

/// Immutable history entries. Never updated or deleted.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn create_history_entry(&self, entry: &HistoryEntry) -> Result<()>;
    async fn list_history(&self, user_id: &str) -> Result<Vec<HistoryEntry>>;
    async fn count_history_entries(&self) -> Result<u64>;
}

/// A complete database backend that combines all store traits plus lifecycle
/// operations.
#[async_trait]
pub trait DatabaseBackend: UserStore + ProfileStore + HistoryStore {
    /// Sync with remote (e.g. Turso replication). No-op for local-only backends.
    async fn sync(&self) -> Result<()>;
}
