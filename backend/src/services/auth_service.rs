//! Account management: registration, login, JWT issuance, password reset.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::password_reset::PasswordResetToken;
use crate::models::user::User;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Reset tokens are valid for one hour.
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// JWT claims carried in access tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Service for user accounts and credentials.
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    jwt_ttl_secs: i64,
}

impl AuthService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt_secret.clone(),
            jwt_ttl_secs: config.jwt_ttl_secs,
        }
    }

    /// Create an account. The email must be unique; the password is stored as
    /// a bcrypt hash.
    pub async fn register(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email)?;
        validate_password(password)?;

        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))?;

        let user: User = sqlx::query_as(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(&email)
        .bind(&password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                AppError::Conflict("Email is already registered".to_string())
            }
            _ => AppError::Database(e.to_string()),
        })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Verify credentials and issue an access token.
    pub async fn login(&self, email: &str, password: &str) -> Result<(String, User)> {
        let email = normalize_email(email)?;

        let user: Option<User> = sqlx::query_as(
            "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(&email)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        // Same error for unknown email and wrong password
        let user = user
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        let valid = bcrypt::verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::Authentication(
                "Invalid email or password".to_string(),
            ));
        }

        let token = self.issue_token(&user)?;
        Ok((token, user))
    }

    /// Mint a signed access token for a user.
    pub fn issue_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.jwt_ttl_secs)).timestamp(),
        };
        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?)
    }

    /// Validate a bearer token and return its claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }

    /// Fetch a user by id.
    pub async fn get_user(&self, id: Uuid) -> Result<User> {
        let user: Option<User> = sqlx::query_as(
            "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        user.ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Create a single-use reset token for the given email, if an account
    /// exists. Returns the user and the raw token to embed in the reset mail;
    /// only the SHA-256 digest is stored. Returns `None` for unknown emails so
    /// the handler can respond identically either way.
    pub async fn create_reset_token(&self, email: &str) -> Result<Option<(User, String)>> {
        let email = match normalize_email(email) {
            Ok(e) => e,
            // Malformed emails are indistinguishable from unknown ones
            Err(_) => return Ok(None),
        };

        let user: Option<User> = sqlx::query_as(
            "SELECT id, email, password_hash, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(&email)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(user) = user else {
            return Ok(None);
        };

        let raw_token = generate_token();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);

        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user.id)
        .bind(hash_token(&raw_token))
        .bind(expires_at)
        .execute(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(Some((user, raw_token)))
    }

    /// Redeem a reset token and set the new password. The token is marked used
    /// in the same transaction as the password update.
    pub async fn reset_password(&self, raw_token: &str, new_password: &str) -> Result<()> {
        validate_password(new_password)?;

        let record: Option<PasswordResetToken> = sqlx::query_as(
            r#"
            SELECT id, user_id, token_hash, expires_at, used_at, created_at
            FROM password_reset_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(hash_token(raw_token))
        .fetch_optional(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        let record = record
            .ok_or_else(|| AppError::Authentication("Invalid or expired reset token".to_string()))?;

        if !record.is_redeemable(Utc::now()) {
            return Err(AppError::Authentication(
                "Invalid or expired reset token".to_string(),
            ));
        }

        let password_hash = bcrypt::hash(new_password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))?;

        let mut tx = self.db.begin().await?;

        sqlx::query("UPDATE users SET password_hash = $1, updated_at = now() WHERE id = $2")
            .bind(&password_hash)
            .bind(record.user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        sqlx::query("UPDATE password_reset_tokens SET used_at = now() WHERE id = $1")
            .bind(record.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tx.commit().await?;

        tracing::info!(user_id = %record.user_id, "Password reset completed");
        Ok(())
    }

    /// Delete expired or used reset tokens. Returns the number removed.
    pub async fn purge_stale_reset_tokens(&self) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM password_reset_tokens WHERE expires_at < now() OR used_at IS NOT NULL",
        )
        .execute(&self.db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

/// Lowercase and minimally validate an email address.
pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = email.len() >= 3
        && email.contains('@')
        && !email.starts_with('@')
        && !email.ends_with('@');
    if !valid {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    Ok(email)
}

/// Enforce the minimum password length.
pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// 32 random bytes, hex-encoded.
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    hex::encode(bytes)
}

/// SHA-256 digest stored in place of the raw token.
fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}
