//! Bearer JWT authentication (spec §4.K): subject is the user's email,
//! expiry ≈ 30 minutes. Grounded in the Claims/AuthContext split used by
//! `dropbox-dTOOL/dashflow-wasm-executor/src/auth.rs`, simplified to this
//! system's single `sub`-is-email shape.

use carbonledger_core::config::JwtConfig;
use carbonledger_core::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims: subject is the user's email, per spec §4.K.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Encodes and validates bearer tokens for one deployment secret.
#[derive(Clone)]
pub struct AuthContext {
    secret: String,
    expiry_minutes: i64,
}

impl AuthContext {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            expiry_minutes: config.expiry_minutes,
        }
    }

    pub fn issue_token(&self, user_id: Uuid, email: &str) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: email.to_string(),
            user_id,
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.expiry_minutes)).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("jwt encode failed: {e}")))
    }

    /// Decode and validate a bearer token. Expiry is checked by the
    /// `jsonwebtoken` validator itself; any failure becomes `AppError::Auth`
    /// per spec ("invalid or expired -> 401").
    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|_| AppError::Auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> AuthContext {
        AuthContext::new(&JwtConfig {
            secret: "test-secret-value-that-is-long-enough".into(),
            algorithm: "HS256".into(),
            expiry_minutes: 30,
        })
    }

    #[test]
    fn round_trips_a_freshly_issued_token() {
        let ctx = context();
        let user_id = Uuid::new_v4();
        let token = ctx.issue_token(user_id, "a@x.io").unwrap();
        let claims = ctx.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "a@x.io");
        assert_eq!(claims.user_id, user_id);
    }

    #[test]
    fn rejects_a_token_signed_with_a_different_secret() {
        let ctx = context();
        let token = ctx.issue_token(Uuid::new_v4(), "a@x.io").unwrap();

        let other = AuthContext::new(&JwtConfig {
            secret: "a-completely-different-secret-value".into(),
            algorithm: "HS256".into(),
            expiry_minutes: 30,
        });
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn rejects_an_expired_token() {
        let ctx = AuthContext::new(&JwtConfig {
            secret: "test-secret-value-that-is-long-enough".into(),
            algorithm: "HS256".into(),
            expiry_minutes: -1,
        });
        let token = ctx.issue_token(Uuid::new_v4(), "a@x.io").unwrap();
        assert!(ctx.verify_token(&token).is_err());
    }
}
