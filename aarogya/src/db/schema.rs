use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            full_name TEXT,
            created_at TEXT NOT NULL
        );

        -- One row per user; the three medical fields and history are JSON arrays
        CREATE TABLE IF NOT EXISTS medical_profiles (
            user_id TEXT PRIMARY KEY,
            email TEXT NOT NULL,
            allergy TEXT NOT NULL DEFAULT '[]',
            chronic_condition TEXT NOT NULL DEFAULT '[]',
            current_medication TEXT NOT NULL DEFAULT '[]',
            history TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS history_entries (
            id TEXT PRIMARY KEY,
            image_ref TEXT NOT NULL,
            date TEXT NOT NULL,
            kind TEXT NOT NULL,
            response TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_history_entries_date ON history_entries(date);
        "#,
    )
    .await?;

    Ok(())
}
