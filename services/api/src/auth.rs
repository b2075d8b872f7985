//! services/api/src/auth.rs
//!
//! Password hashing and JWT issuing/verification.

use argon2::{
    password_hash::{
        rand_core::OsRng, Error as PasswordHashError, PasswordHash, PasswordHasher,
        PasswordVerifier, SaltString,
    },
    Argon2,
};
use chrono::Utc;
use commit_core::User;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    ExpiredToken,
    #[error("Wrong token type")]
    WrongTokenType,
    #[error("Authentication error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub username: String,
    pub typ: TokenType,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

impl Claims {
    /// Time left before the token expires; zero once it has.
    pub fn remaining_lifetime(&self) -> Duration {
        let left = self.exp - Utc::now().timestamp();
        Duration::from_secs(left.max(0) as u64)
    }
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Signs and verifies access and refresh tokens, each with its own secret.
pub struct TokenIssuer {
    access: KeyPair,
    refresh: KeyPair,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(access_secret: &str, refresh_secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        Self {
            access: KeyPair::from_secret(access_secret),
            refresh: KeyPair::from_secret(refresh_secret),
            validation,
        }
    }

    pub fn issue_access(&self, user: &User) -> Result<String, AuthError> {
        self.issue(user, TokenType::Access, ACCESS_TOKEN_TTL)
    }

    pub fn issue_refresh(&self, user: &User) -> Result<String, AuthError> {
        self.issue(user, TokenType::Refresh, REFRESH_TOKEN_TTL)
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify(token, TokenType::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, AuthError> {
        self.verify(token, TokenType::Refresh)
    }

    fn keys(&self, typ: TokenType) -> &KeyPair {
        match typ {
            TokenType::Access => &self.access,
            TokenType::Refresh => &self.refresh,
        }
    }

    fn issue(&self, user: &User, typ: TokenType, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            typ,
            iat: now,
            exp: now + ttl.as_secs() as i64,
            jti: Uuid::new_v4(),
        };
        encode(&Header::default(), &claims, &self.keys(typ).encoding)
            .map_err(|e| AuthError::Internal(format!("Failed to sign token: {e}")))
    }

    fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, AuthError> {
        let claims = decode::<Claims>(token, &self.keys(expected).decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })?;

        if claims.typ != expected {
            return Err(AuthError::WrongTokenType);
        }
        Ok(claims)
    }
}

/// Hashes a password into a PHC string.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Internal(format!("Failed to hash password: {e}")))
}

/// Checks a password against a stored PHC string.
pub fn verify_password(password: &str, hashed: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hashed)
        .map_err(|e| AuthError::Internal(format!("Failed to parse password hash: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(PasswordHashError::Password) => Ok(false),
        Err(other) => Err(AuthError::Internal(format!(
            "Password verification failed: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            username: "ada".to_string(),
            first_name: None,
            last_name: None,
            profile_image_url: None,
            bio: None,
            timezone: "UTC".to_string(),
            is_active: true,
            email_verified: false,
            push_notifications_enabled: true,
            created_at: now,
            updated_at: now,
            last_active_at: now,
        }
    }

    #[test]
    fn access_token_round_trips_its_claims() {
        let issuer = TokenIssuer::new("access", "refresh");
        let user = user();
        let token = issuer.issue_access(&user).unwrap();
        let claims = issuer.verify_access(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "ada");
        assert_eq!(claims.typ, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, ACCESS_TOKEN_TTL.as_secs() as i64);
    }

    #[test]
    fn tokens_issued_together_differ() {
        let issuer = TokenIssuer::new("access", "refresh");
        let user = user();
        assert_ne!(
            issuer.issue_access(&user).unwrap(),
            issuer.issue_access(&user).unwrap()
        );
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let issuer = TokenIssuer::new("shared", "shared");
        let refresh = issuer.issue_refresh(&user()).unwrap();
        assert!(matches!(
            issuer.verify_access(&refresh),
            Err(AuthError::WrongTokenType)
        ));
        assert!(issuer.verify_refresh(&refresh).is_ok());
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let issuer = TokenIssuer::new("access", "refresh");
        let other = TokenIssuer::new("someone-else", "refresh");
        let token = other.issue_access(&user()).unwrap();
        assert!(matches!(issuer.verify_access(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let issuer = TokenIssuer::new("access", "refresh");
        let user = user();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id,
            email: user.email,
            username: user.username,
            typ: TokenType::Access,
            iat: now - 120,
            exp: now - 60,
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"access")).unwrap();
        assert!(matches!(issuer.verify_access(&token), Err(AuthError::ExpiredToken)));
    }

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }
}
