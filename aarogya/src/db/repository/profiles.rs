use chrono::Utc;
use libsql::{params, Connection};

use crate::error::{AppError, Result};
use crate::models::{MedicalField, MedicalProfile, UpdateProfileRequest};

use super::{format_timestamp, parse_timestamp};

pub struct ProfileRepository;

impl ProfileRepository {
    pub async fn get(conn: &Connection, user_id: &str) -> Result<Option<MedicalProfile>> {
        let mut rows = conn
            .query(
                r#"
                SELECT user_id, email, allergy, chronic_condition, current_medication,
                       history, created_at, updated_at
                FROM medical_profiles WHERE user_id = ?1
                "#,
                params![user_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_profile(&row)?)),
            None => Ok(None),
        }
    }

    /// Create the profile or overwrite the fields present in `update`.
    ///
    /// Runs as a single statement; absent fields keep their stored value.
    pub async fn upsert_fields(
        conn: &Connection,
        user_id: &str,
        email: &str,
        update: &UpdateProfileRequest,
    ) -> Result<()> {
        let now = format_timestamp(&Utc::now());
        conn.execute(
            r#"
            INSERT INTO medical_profiles (
                user_id, email, allergy, chronic_condition, current_medication,
                history, created_at, updated_at
            ) VALUES (
                ?1, ?2, COALESCE(?3, '[]'), COALESCE(?4, '[]'), COALESCE(?5, '[]'), '[]', ?6, ?6
            )
            ON CONFLICT(user_id) DO UPDATE SET
                allergy = COALESCE(?3, allergy),
                chronic_condition = COALESCE(?4, chronic_condition),
                current_medication = COALESCE(?5, current_medication),
                updated_at = ?6
            "#,
            params![
                user_id,
                email,
                update.allergy.as_ref().map(MedicalField::to_stored),
                update.chronic_condition.as_ref().map(MedicalField::to_stored),
                update.current_medication.as_ref().map(MedicalField::to_stored),
                now,
            ],
        )
        .await?;

        Ok(())
    }

    /// Create an empty profile for the user unless one already exists.
    pub async fn ensure(conn: &Connection, user_id: &str, email: &str) -> Result<()> {
        let now = format_timestamp(&Utc::now());
        conn.execute(
            r#"
            INSERT INTO medical_profiles (user_id, email, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT(user_id) DO NOTHING
            "#,
            params![user_id, email, now],
        )
        .await?;
        Ok(())
    }

    /// Append an entry id to the profile's history array in place.
    pub async fn append_history(conn: &Connection, user_id: &str, entry_id: &str) -> Result<bool> {
        let now = format_timestamp(&Utc::now());
        let affected = conn
            .execute(
                r#"
                UPDATE medical_profiles
                SET history = json_insert(history, '$[#]', ?2), updated_at = ?3
                WHERE user_id = ?1
                "#,
                params![user_id, entry_id, now],
            )
            .await?;
        Ok(affected > 0)
    }

    pub async fn count(conn: &Connection) -> Result<u64> {
        let mut rows = conn
            .query("SELECT COUNT(*) FROM medical_profiles", ())
            .await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)? as u64),
            None => Ok(0),
        }
    }

    fn row_to_profile(row: &libsql::Row) -> Result<MedicalProfile> {
        let user_id: String = row.get(0)?;
        let history = serde_json::from_str(&row.get::<String>(5)?).map_err(|e| {
            AppError::Internal(format!("Corrupt history list for profile {user_id}: {e}"))
        })?;

        Ok(MedicalProfile {
            user_id,
            email: row.get(1)?,
            allergy: MedicalField::from_stored(&row.get::<String>(2)?),
            chronic_condition: MedicalField::from_stored(&row.get::<String>(3)?),
            current_medication: MedicalField::from_stored(&row.get::<String>(4)?),
            history,
            created_at: parse_timestamp(&row.get::<String>(6)?)?,
            updated_at: parse_timestamp(&row.get::<String>(7)?)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::init_schema;
    use pretty_assertions::assert_eq;

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

    #[tokio::test]
    async fn test_upsert_creates_then_updates_in_place() {
        let conn = setup_test_db().await;

        let first = UpdateProfileRequest {
            allergy: Some(MedicalField::from_text("penicillin")),
            ..Default::default()
        };
        ProfileRepository::upsert_fields(&conn, "u1", "a@b.c", &first)
            .await
            .unwrap();

        let second = UpdateProfileRequest {
            current_medication: Some(MedicalField::from_items(["metformin", "aspirin"])),
            ..Default::default()
        };
        ProfileRepository::upsert_fields(&conn, "u1", "a@b.c", &second)
            .await
            .unwrap();

        let profile = ProfileRepository::get(&conn, "u1").await.unwrap().unwrap();
        assert_eq!(profile.allergy.joined(), "penicillin");
        assert_eq!(profile.current_medication.joined(), "metformin, aspirin");
        assert!(profile.chronic_condition.is_empty());
        assert_eq!(ProfileRepository::count(&conn).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_legacy_plain_string_columns_are_normalized() {
        let conn = setup_test_db().await;
        conn.execute(
            r#"
            INSERT INTO medical_profiles (user_id, email, allergy, chronic_condition,
                                          current_medication, history, created_at, updated_at)
            VALUES ('u1', 'a@b.c', 'Ibuprofen', '', '[]', '[]',
                    '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')
            "#,
            (),
        )
        .await
        .unwrap();

        let profile = ProfileRepository::get(&conn, "u1").await.unwrap().unwrap();
        assert_eq!(profile.allergy.values(), ["Ibuprofen".to_string()]);
        assert!(profile.chronic_condition.is_empty());
    }

    #[tokio::test]
    async fn test_ensure_and_append_history() {
        let conn = setup_test_db().await;
        assert!(!ProfileRepository::append_history(&conn, "u1", "e0")
            .await
            .unwrap());

        ProfileRepository::ensure(&conn, "u1", "a@b.c").await.unwrap();
        ProfileRepository::ensure(&conn, "u1", "a@b.c").await.unwrap();
        assert!(ProfileRepository::append_history(&conn, "u1", "e1")
            .await
            .unwrap());
        assert!(ProfileRepository::append_history(&conn, "u1", "e2")
            .await
            .unwrap());

        let profile = ProfileRepository::get(&conn, "u1").await.unwrap().unwrap();
        assert_eq!(profile.history, vec!["e1".to_string(), "e2".to_string()]);
        assert_eq!(ProfileRepository::count(&conn).await.unwrap(), 1);
    }
}
