use libsql::{params, Connection};

use crate::error::{AppError, Result};
use crate::models::{EntryKind, HistoryEntry, Record};

use super::{format_timestamp, parse_timestamp};

pub struct HistoryRepository;

impl HistoryRepository {
    pub async fn create(conn: &Connection, entry: &HistoryEntry) -> Result<()> {
        let response = match &entry.response {
            Some(record) => Some(serde_json::to_string(record)?),
            None => None,
        };

        conn.execute(
            r#"
            INSERT INTO history_entries (id, image_ref, date, kind, response)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                entry.id.clone(),
                entry.image_ref.clone(),
                format_timestamp(&entry.date),
                entry.kind.to_string(),
                response,
            ],
        )
        .await?;

        Ok(())
    }

    /// Entries referenced by the user's profile, most recent first.
    pub async fn list_for_user(conn: &Connection, user_id: &str) -> Result<Vec<HistoryEntry>> {
        let mut rows = conn
            .query(
                r#"
                SELECT h.id, h.image_ref, h.date, h.kind, h.response
                FROM medical_profiles p, json_each(p.history) j
                JOIN history_entries h ON h.id = j.value
                WHERE p.user_id = ?1
                ORDER BY h.date DESC, h.rowid DESC
                "#,
                params![user_id],
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::row_to_entry(&row)?);
        }
        Ok(entries)
    }

    pub async fn count(conn: &Connection) -> Result<u64> {
        let mut rows = conn
            .query("SELECT COUNT(*) FROM history_entries", ())
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? as u64),
            None => Ok(0),
        }
    }

    /// Rows that do not map back to an entry are reported, not patched over.
    fn row_to_entry(row: &libsql::Row) -> Result<HistoryEntry> {
        let id: String = row.get(0)?;
        let kind = row
            .get::<String>(3)?
            .parse::<EntryKind>()
            .map_err(|e| AppError::Internal(format!("Corrupt history entry {id}: {e}")))?;
        let response: Option<Record> = match row.get::<Option<String>>(4)? {
            Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| {
                AppError::Internal(format!("Corrupt response in history entry {id}: {e}"))
            })?),
            None => None,
        };

        Ok(HistoryEntry {
            image_ref: row.get(1)?,
            date: parse_timestamp(&row.get::<String>(2)?)?,
            kind,
            response,
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::ProfileRepository;
    use crate::db::schema::init_schema;
    use crate::models::Record;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn setup_test_db() -> Connection {
        let conn = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .unwrap()
            .connect()
            .unwrap();
        init_schema(&conn).await.unwrap();
        conn
    }

    fn entry(id: &str, minutes_ago: i64, response: Option<Record>) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            image_ref: format!("/images/{id}.jpg"),
            date: Utc::now() - Duration::minutes(minutes_ago),
            kind: EntryKind::Med,
            response,
        }
    }

    #[tokio::test]
    async fn test_list_orders_by_date_not_append_order() {
        let conn = setup_test_db().await;
        ProfileRepository::ensure(&conn, "u1", "a@b.c").await.unwrap();

        // appended out of chronological order
        for e in [entry("new", 1, None), entry("old", 30, None), entry("mid", 10, None)] {
            HistoryRepository::create(&conn, &e).await.unwrap();
            ProfileRepository::append_history(&conn, "u1", &e.id)
                .await
                .unwrap();
        }

        let ids: Vec<String> = HistoryRepository::list_for_user(&conn, "u1")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_response_round_trips_and_unreferenced_entries_hidden() {
        let conn = setup_test_db().await;
        ProfileRepository::ensure(&conn, "u1", "a@b.c").await.unwrap();

        let mut response = Record::new();
        response.insert("final_recommendation".to_string(), json!("Avoid"));
        let referenced = entry("e1", 0, Some(response.clone()));
        let orphan = entry("e2", 0, None);
        HistoryRepository::create(&conn, &referenced).await.unwrap();
        HistoryRepository::create(&conn, &orphan).await.unwrap();
        ProfileRepository::append_history(&conn, "u1", "e1")
            .await
            .unwrap();

        let entries = HistoryRepository::list_for_user(&conn, "u1").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].response, Some(response));
        assert_eq!(HistoryRepository::count(&conn).await.unwrap(), 2);
    }

    async fn referenced_raw_row(conn: &Connection, date: &str, kind: &str, response: &str) {
        ProfileRepository::ensure(conn, "u1", "a@b.c").await.unwrap();
        conn.execute(
            "INSERT INTO history_entries (id, image_ref, date, kind, response) VALUES ('bad', '/images/bad.jpg', ?1, ?2, ?3)",
            params![date, kind, response],
        )
        .await
        .unwrap();
        ProfileRepository::append_history(conn, "u1", "bad")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_rows_are_reported() {
        let now = format_timestamp(&Utc::now());
        let cases = [
            (now.as_str(), "prescription", "{}"),
            (now.as_str(), "med", "{not json"),
            ("yesterday", "med", "{}"),
        ];

        for (date, kind, response) in cases {
            let conn = setup_test_db().await;
            referenced_raw_row(&conn, date, kind, response).await;

            let err = HistoryRepository::list_for_user(&conn, "u1")
                .await
                .unwrap_err();
            assert!(
                matches!(err, AppError::Internal(_)),
                "{date}/{kind}/{response}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn test_list_without_profile_is_empty() {
        let conn = setup_test_db().await;
        assert!(HistoryRepository::list_for_user(&conn, "nobody")
            .await
            .unwrap()
            .is_empty());
    }
}
