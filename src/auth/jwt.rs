use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::user::Role;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub sub: i32,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 access tokens, and mints opaque refresh tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        TokenService {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        TokenService::new(
            &config.jwt_secret,
            Duration::minutes(config.access_ttl_minutes),
            Duration::days(config.refresh_ttl_days),
        )
    }

    pub fn issue_access(&self, user_id: i32, email: &str, role: Role) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::internal(format!("failed to sign access token: {}", e)))
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }

    /// Returns a fresh refresh token value and its expiry.
    pub fn new_refresh_token(&self) -> (String, DateTime<Utc>) {
        (Uuid::new_v4().to_string(), Utc::now() + self.refresh_ttl)
    }

    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl.num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret", Duration::minutes(15), Duration::days(7))
    }

    #[test]
    fn issued_token_verifies() {
        let tokens = service();
        let jwt = tokens.issue_access(7, "trinity@zion.net", Role::Manager).unwrap();
        let claims = tokens.verify_access(&jwt).unwrap();

        assert_eq!(claims.sub, 7);
        assert_eq!(claims.email, "trinity@zion.net");
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let tokens = TokenService::new("test-secret", Duration::minutes(-5), Duration::days(7));
        let jwt = tokens.issue_access(1, "a@b.io", Role::User).unwrap();

        let err = tokens.verify_access(&jwt).unwrap_err();
        assert_eq!(err.code(), "TOKEN_EXPIRED");
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let other = TokenService::new("other-secret", Duration::minutes(15), Duration::days(7));
        let jwt = other.issue_access(1, "a@b.io", Role::Admin).unwrap();

        let err = service().verify_access(&jwt).unwrap_err();
        assert_eq!(err.code(), "INVALID_TOKEN");
    }

    #[test]
    fn refresh_tokens_are_unique_and_in_the_future() {
        let tokens = service();
        let (first, expires_at) = tokens.new_refresh_token();
        let (second, _) = tokens.new_refresh_token();

        assert_ne!(first, second);
        assert!(expires_at > Utc::now() + Duration::days(6));
    }
}
