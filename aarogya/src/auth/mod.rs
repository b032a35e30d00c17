//! Accounts and bearer tokens.
//!
//! Passwords are stored as argon2 PHC strings. Access tokens are HS256 JWTs
//! whose subject is the user id; they are stateless, so logout is a no-op
//! on the server side.

mod password;
mod token;

use std::sync::Arc;

use validator::Validate;

use crate::config::AuthConfig;
use crate::db::DatabaseBackend;
use crate::error::{AppError, Result};
use crate::models::{AccessToken, LoginRequest, RegisterRequest, User};

pub use password::{hash_password, verify_password};
pub use token::{decode_token, issue_token, Claims};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Clone)]
pub struct AuthService {
    db: Arc<dyn DatabaseBackend>,
    secret_key: Option<String>,
    token_ttl_hours: i64,
}

impl AuthService {
    pub fn new(db: Arc<dyn DatabaseBackend>, config: &AuthConfig) -> Self {
        if config.secret_key.is_none() {
            tracing::warn!("SECRET_KEY not set; logins and protected routes will be refused");
        }
        Self {
            db,
            secret_key: config.secret_key.clone(),
            token_ttl_hours: config.token_ttl_hours,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret_key.is_some()
    }

    fn secret(&self) -> Result<&str> {
        self.secret_key.as_deref().ok_or_else(|| {
            AppError::Unauthorized("Authentication not configured. Set SECRET_KEY.".to_string())
        })
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<User> {
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let email = normalize_email(&request.email);
        if self.db.get_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password = request.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {e}")))??;

        let mut user = User::new(nanoid::nanoid!(), email, password_hash);
        user.full_name = request
            .full_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        self.db.create_user(&user).await?;
        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, request: LoginRequest) -> Result<AccessToken> {
        let secret = self.secret()?;

        let user = self
            .db
            .get_user_by_email(&normalize_email(&request.email))
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        let password = request.password;
        let stored_hash = user.password_hash.clone();
        let verified =
            tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
                .await
                .map_err(|e| AppError::Internal(format!("Password check task failed: {e}")))?;
        if !verified {
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let token = issue_token(&user.id, secret, self.token_ttl_hours)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(AccessToken::bearer(token))
    }

    /// The user a bearer token was issued to.
    pub async fn verify_token(&self, token: &str) -> Result<User> {
        let claims = decode_token(token, self.secret()?)?;
        self.db
            .get_user_by_id(&claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::{Database, LibSqlBackend};
    use tempfile::NamedTempFile;

    async fn setup(secret: Option<&str>) -> (AuthService, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let config = DatabaseConfig {
            url: format!("file:{}", temp_file.path().display()),
            auth_token: None,
            local_path: None,
        };
        let db: Arc<dyn DatabaseBackend> =
            Arc::new(LibSqlBackend::new(Database::new(&config).await.unwrap()));
        let auth = AuthService::new(
            db,
            &AuthConfig {
                secret_key: secret.map(str::to_string),
                token_ttl_hours: 12,
            },
        );
        (auth, temp_file)
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "hunter2".to_string(),
            full_name: Some(" Asha Rao ".to_string()),
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_login_verify() {
        let (auth, _temp) = setup(Some("secret")).await;

        let user = auth
            .register(register_request("Asha@Example.com"))
            .await
            .unwrap();
        assert_eq!(user.email, "asha@example.com");
        assert_eq!(user.full_name.as_deref(), Some("Asha Rao"));

        let token = auth
            .login(login_request("asha@example.com", "hunter2"))
            .await
            .unwrap();
        assert_eq!(token.token_type, "bearer");

        let current = auth.verify_token(&token.access_token).await.unwrap();
        assert_eq!(current.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (auth, _temp) = setup(Some("secret")).await;
        auth.register(register_request("a@b.co")).await.unwrap();

        let result = auth.register(register_request("A@B.CO")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_invalid_registration_rejected() {
        let (auth, _temp) = setup(Some("secret")).await;
        let result = auth.register(register_request("not-an-email")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let (auth, _temp) = setup(Some("secret")).await;
        auth.register(register_request("a@b.co")).await.unwrap();

        for request in [
            login_request("a@b.co", "wrong"),
            login_request("nobody@b.co", "hunter2"),
        ] {
            match auth.login(request).await {
                Err(AppError::Unauthorized(msg)) => assert_eq!(msg, INVALID_CREDENTIALS),
                other => panic!("expected unauthorized, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_missing_secret_refuses_tokens() {
        let (auth, _temp) = setup(None).await;
        assert!(!auth.is_configured());
        auth.register(register_request("a@b.co")).await.unwrap();

        assert!(matches!(
            auth.login(login_request("a@b.co", "hunter2")).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            auth.verify_token("anything").await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_token_for_deleted_or_unknown_user() {
        let (auth, _temp) = setup(Some("secret")).await;
        let token = issue_token("ghost", "secret", 1).unwrap();
        assert!(matches!(
            auth.verify_token(&token).await,
            Err(AppError::Unauthorized(_))
        ));
    }
}
