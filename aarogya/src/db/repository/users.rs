use libsql::{params, Connection};

use crate::error::{AppError, Result};
use crate::models::User;

use super::{format_timestamp, parse_timestamp};

pub struct UserRepository;

impl UserRepository {
    pub async fn create(conn: &Connection, user: &User) -> Result<()> {
        let result = conn
            .execute(
                r#"
                INSERT INTO users (id, email, password_hash, full_name, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    user.id.clone(),
                    user.email.clone(),
                    user.password_hash.clone(),
                    user.full_name.clone(),
                    format_timestamp(&user.created_at),
                ],
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("UNIQUE constraint failed") => {
                Err(AppError::Conflict("Email already registered".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
        let mut rows = conn
            .query(
                "SELECT id, email, password_hash, full_name, created_at FROM users WHERE id = ?1",
                params![id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn get_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
        let mut rows = conn
            .query(
                "SELECT id, email, password_hash, full_name, created_at FROM users WHERE email = ?1",
                params![email],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    fn row_to_user(row: &libsql::Row) -> Result<User> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            full_name: row.get(3)?,
            created_at: parse_timestamp(&row.get::<String>(4)?)?,
        })
    }
}
