//! Account service: signup, login and password reset.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use linkup_mail::{templates, Email, SharedMailer};
use linkup_models::{normalize_email, User, UserId};
use linkup_store::UserRepository;

use crate::auth::issue_token;
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::security::{generate_reset_token, hash_reset_token, sanitize_text};

/// Lifetime of a password reset token.
const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Fields accepted at signup, already validated.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// A user together with a freshly issued session token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct AccountService {
    users: UserRepository,
    mailer: SharedMailer,
    config: ApiConfig,
}

impl AccountService {
    pub fn new(users: UserRepository, mailer: SharedMailer, config: ApiConfig) -> Self {
        Self {
            users,
            mailer,
            config,
        }
    }

    fn session(&self, user: User) -> ApiResult<Session> {
        let token = issue_token(&user.id, &self.config.jwt_secret, self.config.jwt_ttl_hours)?;
        Ok(Session { user, token })
    }

    pub async fn signup(&self, account: NewAccount) -> ApiResult<Session> {
        let email = normalize_email(&account.email);
        let username = account.username.trim().to_string();

        if self.users.username_exists(&username).await? {
            return Err(ApiError::conflict("Username already exists"));
        }

        let password_hash = hash_password(account.password).await?;
        let user = User::new(sanitize_text(&account.name), username, email, password_hash);

        match self.users.create(&user).await {
            Ok(()) => {}
            Err(e) if e.is_already_exists() => {
                return Err(ApiError::conflict("Email already exists"));
            }
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.id, "User signed up");
        metrics::record_signup();

        let profile_url = format!("{}/profile/{}", self.config.frontend_url, user.username);
        self.deliver(&user.email, templates::welcome(&user.name, &profile_url), "welcome")
            .await;

        self.session(user)
    }

    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<Session> {
        let invalid = || ApiError::bad_request("Invalid credentials");

        let Some(user) = self.users.find_by_email(email).await? else {
            metrics::record_login(false);
            return Err(invalid());
        };

        if !verify_password(password.to_string(), user.password_hash.clone()).await? {
            metrics::record_login(false);
            return Err(invalid());
        }

        metrics::record_login(true);
        info!(user_id = %user.id, "User logged in");
        self.session(user)
    }

    pub async fn me(&self, user_id: &UserId) -> ApiResult<User> {
        self.users
            .get(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    /// Start a password reset. Succeeds whether or not the account exists.
    pub async fn forgot_password(&self, email: &str) -> ApiResult<()> {
        let Some(user) = self.users.find_by_email(email).await? else {
            info!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_reset_token();
        let expires = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.users
            .set_reset_token(&user.id, &hash_reset_token(&token), expires)
            .await?;

        let reset_url = format!("{}/reset-password/{}", self.config.frontend_url, token);
        self.deliver(&user.email, templates::password_reset(&reset_url), "password_reset")
            .await;

        info!(user_id = %user.id, "Password reset token issued");
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> ApiResult<()> {
        let invalid = || ApiError::bad_request("Invalid or expired reset token");

        let user = self
            .users
            .find_by_reset_token(&hash_reset_token(token))
            .await?
            .ok_or_else(invalid)?;

        match user.reset_password_expires {
            Some(expires) if expires > Utc::now() => {}
            _ => return Err(invalid()),
        }

        let password_hash = hash_password(password.to_string()).await?;
        self.users.set_password(&user.id, &password_hash).await?;

        self.deliver(
            &user.email,
            templates::password_reset_success(),
            "password_reset_success",
        )
        .await;

        info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }

    /// Send an email; delivery failures are logged only.
    async fn deliver(&self, to: &str, email: Email, template: &str) {
        if let Err(e) = self.mailer.send(to, &email.subject, &email.body).await {
            warn!(template, "Failed to send email: {}", e);
            metrics::record_email_failure(template);
        }
    }
}

/// Argon2id hash with a random salt, computed off the async workers.
pub async fn hash_password(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
            .map_err(|e| ApiError::internal(format!("Failed to create salt: {}", e)))?;
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))
    })
    .await
    .map_err(|e| ApiError::internal(format!("Password hashing task failed: {}", e)))?
}

/// Check a password against a stored hash. Unparseable hashes never match.
pub async fn verify_password(password: String, hash: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || match PasswordHash::new(&hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    })
    .await
    .map_err(|e| ApiError::internal(format!("Password verification task failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use linkup_mail::LogMailer;
    use linkup_store::MemoryStore;

    use super::*;
    use crate::auth::verify_token;

    fn service() -> (AccountService, UserRepository) {
        let users = UserRepository::new(Arc::new(MemoryStore::new()));
        let service = AccountService::new(users.clone(), Arc::new(LogMailer), ApiConfig::default());
        (service, users)
    }

    fn account(username: &str, email: &str) -> NewAccount {
        NewAccount {
            name: "Ada Lovelace".to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password: "secret123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_signup_then_login() {
        let (service, _) = service();
        let session = service
            .signup(account("ada", " Ada@Example.com "))
            .await
            .unwrap();
        assert_eq!(session.user.email, "ada@example.com");
        let claims = verify_token(&session.token, &ApiConfig::default().jwt_secret).unwrap();
        assert_eq!(claims.sub, session.user.id.to_string());

        let login = service.login("ADA@example.com", "secret123").await.unwrap();
        assert_eq!(login.user.id, session.user.id);

        let wrong = service.login("ada@example.com", "nope").await.unwrap_err();
        let unknown = service.login("bob@example.com", "secret123").await.unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_duplicate_email_and_username_conflict() {
        let (service, _) = service();
        service.signup(account("ada", "ada@example.com")).await.unwrap();

        let err = service
            .signup(account("ada2", "ADA@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let err = service
            .signup(account("ada", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_reset_password_flow() {
        let (service, users) = service();
        let session = service.signup(account("ada", "ada@example.com")).await.unwrap();

        // Plant a known token the way forgot_password stores it.
        let token = generate_reset_token();
        users
            .set_reset_token(
                &session.user.id,
                &hash_reset_token(&token),
                Utc::now() + Duration::minutes(5),
            )
            .await
            .unwrap();

        assert!(service.reset_password("wrong", "newpass1").await.is_err());
        service.reset_password(&token, "newpass1").await.unwrap();
        assert!(service.login("ada@example.com", "newpass1").await.is_ok());

        // Tokens are single use.
        assert!(service.reset_password(&token, "again123").await.is_err());
    }

    #[tokio::test]
    async fn test_forgot_password_unknown_email_is_ok() {
        let (service, _) = service();
        service.forgot_password("nobody@example.com").await.unwrap();
    }
}
