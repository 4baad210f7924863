// SPDX-License-Identifier: MIT

//! Token lifecycle service: registration, login, refresh rotation, logout.
//!
//! Access tokens are stateless 15-minute JWTs. Refresh tokens are 7-day
//! JWTs with a server-side record keyed by the opaque token value, so any
//! single token can be revoked. Rotation is single-use: exchanging a
//! refresh token consumes its record, and a replayed value finds nothing.

use crate::config::{Config, ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS};
use crate::db::Db;
use crate::error::{AppError, Result};
use crate::models::{RefreshTokenRecord, UserSummary};
use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by the short-lived access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user id)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
}

/// Claims carried by the refresh token. The `jti` makes every issued
/// token value unique even for back-to-back logins of the same user.
#[derive(Debug, Serialize, Deserialize)]
struct RefreshClaims {
    sub: String,
    iat: usize,
    exp: usize,
    jti: String,
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub tokens: TokenPair,
    pub user: UserSummary,
}

/// Authentication service owning token issuance, verification, rotation
/// and revocation.
#[derive(Clone)]
pub struct AuthService {
    db: Db,
    access_secret: Vec<u8>,
    refresh_secret: Vec<u8>,
    min_password_len: usize,
}

impl AuthService {
    pub fn new(db: Db, config: &Config) -> Self {
        Self {
            db,
            access_secret: config.jwt_access_secret.clone(),
            refresh_secret: config.jwt_refresh_secret.clone(),
            min_password_len: config.min_password_len,
        }
    }

    // ─── Account Operations ──────────────────────────────────────

    /// Create a new account. Only the argon2 hash of the password is stored.
    pub fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<UserSummary> {
        if password.len() < self.min_password_len {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                self.min_password_len
            )));
        }

        let password_hash = hash_password(password)?;
        let user = self.db.create_user(email, password_hash, name)?;

        tracing::info!(user_id = %user.id, "Account created");
        Ok(user.summary())
    }

    /// Authenticate and issue a token pair. Unknown email and wrong
    /// password fail identically.
    pub fn login(&self, email: &str, password: &str, ip: Option<String>) -> Result<LoginOutcome> {
        let user = self
            .db
            .get_user_by_email(email)
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        self.db.record_login(user.id, ip);

        let tokens = self.issue_pair(user.id)?;

        tracing::info!(user_id = %user.id, "Login successful");
        Ok(LoginOutcome {
            tokens,
            user: user.summary(),
        })
    }

    // ─── Token Operations ────────────────────────────────────────

    /// Exchange a refresh token for a new pair, consuming the old record.
    ///
    /// The `DashMap::remove` inside `consume_refresh_token` is the
    /// atomicity point: a value can be exchanged at most once, and an
    /// immediate replay fails with `RefreshNotFound`.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.decode_refresh(refresh_token)?;

        let record = self
            .db
            .consume_refresh_token(refresh_token)
            .ok_or(AppError::RefreshNotFound)?;

        if record.expires_at < Utc::now() {
            // The stale record was already removed by the consume above.
            return Err(AppError::RefreshExpired);
        }

        let user_id: Uuid = claims.sub.parse().map_err(|_| AppError::InvalidToken)?;
        if user_id != record.user_id {
            return Err(AppError::InvalidToken);
        }

        self.issue_pair(user_id)
    }

    /// Revoke a refresh token. Idempotent: unknown or already-removed
    /// values are not an error.
    pub fn logout(&self, refresh_token: &str) {
        self.db.delete_refresh_token(refresh_token);
    }

    /// Verify an access token and return the user id it names.
    ///
    /// An expired signature maps to `TokenExpired` so the response body
    /// carries the code the companion client keys its refresh on; every
    /// other failure is a hard `InvalidToken`.
    pub fn verify_access(&self, token: &str) -> Result<Uuid> {
        let key = DecodingKey::from_secret(&self.access_secret);
        let validation = Validation::new(Algorithm::HS256);

        let data = decode::<AccessClaims>(token, &key, &validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::InvalidToken,
        })?;

        data.claims.sub.parse().map_err(|_| AppError::InvalidToken)
    }

    /// Issue an access/refresh pair and persist the refresh record.
    fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair> {
        let now = Utc::now();
        let iat = now.timestamp() as usize;

        let access_claims = AccessClaims {
            sub: user_id.to_string(),
            iat,
            exp: (now.timestamp() + ACCESS_TOKEN_TTL_SECS) as usize,
        };
        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &access_claims,
            &EncodingKey::from_secret(&self.access_secret),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Access token encoding failed: {}", e)))?;

        let refresh_expires_at = now + Duration::seconds(REFRESH_TOKEN_TTL_SECS);
        let refresh_claims = RefreshClaims {
            sub: user_id.to_string(),
            iat,
            exp: refresh_expires_at.timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
        };
        let refresh_token = encode(
            &Header::new(Algorithm::HS256),
            &refresh_claims,
            &EncodingKey::from_secret(&self.refresh_secret),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Refresh token encoding failed: {}", e)))?;

        self.db.insert_refresh_token(
            &refresh_token,
            RefreshTokenRecord {
                user_id,
                expires_at: refresh_expires_at,
            },
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    fn decode_refresh(&self, token: &str) -> Result<RefreshClaims> {
        let key = DecodingKey::from_secret(&self.refresh_secret);
        let validation = Validation::new(Algorithm::HS256);

        decode::<RefreshClaims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::InvalidToken)
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))
}

fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid stored hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Internal(anyhow::anyhow!(
            "Password verification failed: {}",
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn service() -> AuthService {
        AuthService::new(Db::new(), &Config::test_default())
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("secret1").unwrap();
        assert_ne!(hash, "secret1");
        assert!(verify_password("secret1", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_register_rejects_short_password() {
        let auth = service();
        let err = auth.register("a@example.com", "short", None).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_login_unknown_and_wrong_password_fail_identically() {
        let auth = service();
        auth.register("alice@example.com", "secret1", None).unwrap();

        let unknown = auth.login("bob@example.com", "secret1", None).unwrap_err();
        let wrong = auth
            .login("alice@example.com", "notsecret", None)
            .unwrap_err();

        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert!(matches!(wrong, AppError::InvalidCredentials));
    }

    #[test]
    fn test_refresh_rotation_is_single_use() {
        let auth = service();
        auth.register("alice@example.com", "secret1", None).unwrap();
        let login = auth.login("alice@example.com", "secret1", None).unwrap();

        let rotated = auth.refresh(&login.tokens.refresh_token).unwrap();
        assert_ne!(rotated.refresh_token, login.tokens.refresh_token);

        // Immediate replay of the consumed value.
        let replay = auth.refresh(&login.tokens.refresh_token).unwrap_err();
        assert!(matches!(replay, AppError::RefreshNotFound));

        // The rotated token still works.
        auth.refresh(&rotated.refresh_token).unwrap();
    }

    #[test]
    fn test_refresh_rejects_never_issued_token() {
        let auth = service();
        auth.register("alice@example.com", "secret1", None).unwrap();
        let login = auth.login("alice@example.com", "secret1", None).unwrap();

        // Well-signed but never stored: simulate by logging the value out
        // first, which deletes the record.
        auth.logout(&login.tokens.refresh_token);
        let err = auth.refresh(&login.tokens.refresh_token).unwrap_err();
        assert!(matches!(err, AppError::RefreshNotFound));
    }

    #[test]
    fn test_refresh_expired_record_is_deleted() {
        let auth = service();
        let db = auth.db.clone();
        auth.register("alice@example.com", "secret1", None).unwrap();
        let login = auth.login("alice@example.com", "secret1", None).unwrap();

        // Backdate the server-side record past its expiry while the JWT
        // itself is still valid.
        let record = db
            .consume_refresh_token(&login.tokens.refresh_token)
            .unwrap();
        db.insert_refresh_token(
            &login.tokens.refresh_token,
            RefreshTokenRecord {
                user_id: record.user_id,
                expires_at: Utc::now() - Duration::minutes(5),
            },
        );

        let err = auth.refresh(&login.tokens.refresh_token).unwrap_err();
        assert!(matches!(err, AppError::RefreshExpired));
        // Stale record was removed as a side effect.
        assert_eq!(db.refresh_token_count(), 0);
    }

    #[test]
    fn test_logout_is_idempotent() {
        let auth = service();
        auth.register("alice@example.com", "secret1", None).unwrap();
        let login = auth.login("alice@example.com", "secret1", None).unwrap();

        auth.logout(&login.tokens.refresh_token);
        auth.logout(&login.tokens.refresh_token);
        auth.logout("never-issued");
    }

    #[test]
    fn test_verify_access_distinguishes_expired_from_invalid() {
        let auth = service();
        auth.register("alice@example.com", "secret1", None).unwrap();
        let login = auth.login("alice@example.com", "secret1", None).unwrap();

        auth.verify_access(&login.tokens.access_token).unwrap();

        let garbage = auth.verify_access("not.a.jwt").unwrap_err();
        assert!(matches!(garbage, AppError::InvalidToken));

        // Craft an access token that expired an hour ago.
        let config = Config::test_default();
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: Uuid::new_v4().to_string(),
            iat: (now - 7200) as usize,
            exp: (now - 3600) as usize,
        };
        let expired = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&config.jwt_access_secret),
        )
        .unwrap();

        let err = auth.verify_access(&expired).unwrap_err();
        assert!(matches!(err, AppError::TokenExpired));
    }
}
