use async_trait::async_trait;

use crate::db::connection::Database;
use crate::db::repository::{HistoryRepository, ProfileRepository, UserRepository};
use crate::db::traits::{DatabaseBackend, HistoryStore, ProfileStore, UserStore};
use crate::error::Result;
use crate::models::{HistoryEntry, MedicalProfile, UpdateProfileRequest, User};

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for LibSqlBackend {
    async fn create_user(&self, user: &User) -> Result<()> {
        let conn = self.db.connect()?;
        UserRepository::create(&conn, user).await
    }
    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let conn = self.db.connect()?;
        UserRepository::get_by_id(&conn, id).await
    }
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.db.connect()?;
        UserRepository::get_by_email(&conn, email).await
    }
}

#[async_trait]
impl ProfileStore for LibSqlBackend {
    async fn get_profile(&self, user_id: &str) -> Result<Option<MedicalProfile>> {
        let conn = self.db.connect()?;
        ProfileRepository::get(&conn, user_id).await
    }
    async fn upsert_profile_fields(
        &self,
        user_id: &str,
        email: &str,
        update: &UpdateProfileRequest,
    ) -> Result<()> {
        let conn = self.db.connect()?;
        ProfileRepository::upsert_fields(&conn, user_id, email, update).await
    }
    async fn ensure_profile(&self, user_id: &str, email: &str) -> Result<()> {
        let conn = self.db.connect()?;
        ProfileRepository::ensure(&conn, user_id, email).await
    }
    async fn append_history_ref(&self, user_id: &str, entry_id: &str) -> Result<bool> {
        let conn = self.db.connect()?;
        ProfileRepository::append_history(&conn, user_id, entry_id).await
    }
    async fn count_profiles(&self) -> Result<u64> {
        let conn = self.db.connect()?;
        ProfileRepository::count(&conn).await
    }
}

#[async_trait]
impl HistoryStore for LibSqlBackend {
    async fn create_history_entry(&self, entry: &HistoryEntry) -> Result<()> {
        let conn = self.db.connect()?;
        HistoryRepository::create(&conn, entry).await
    }
    async fn list_history(&self, user_id: &str) -> Result<Vec<HistoryEntry>> {
        let conn = self.db.connect()?;
        HistoryRepository::list_for_user(&conn, user_id).await
    }
    async fn count_history_entries(&self) -> Result<u64> {
        let conn = self.db.connect()?;
        HistoryRepository::count(&conn).await
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }
}
