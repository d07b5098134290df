use crate::{error::AppError, AppState};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The claims carried by an access token. `sub` is the username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 access tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Issues a token for `username` valid from `now` until `now + ttl`.
    pub fn issue(&self, username: &str, now: DateTime<Utc>) -> Result<String, AppError> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::Internal(format!("token expiry overflows from {now}")))?;
        let claims = Claims {
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("failed to sign token: {e}")))
    }

    /// Checks the signature and that `now` is strictly before the expiry.
    ///
    /// Expiry is checked here against the caller's clock rather than by the
    /// jsonwebtoken validator, which would apply its default leeway.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token.");
                AppError::Unauthorized("Missing or invalid token".to_string())
            })?
            .claims;

        if now.timestamp() >= claims.exp {
            return Err(AppError::Unauthorized("Token has expired".to_string()));
        }
        Ok(claims)
    }
}

/// The authenticated caller, extracted from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Missing or invalid token".to_string()))?;

        let claims = state.tokens.verify(token, Utc::now())?;
        Ok(AuthUser {
            username: claims.sub,
        })
    }
}

/// Hashes a password with a fresh salt on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))
}

/// Checks a password against a stored hash on the blocking pool.
pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("failed to verify password: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("test-secret", Duration::hours(1))
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn token_is_valid_until_one_hour_after_issue() {
        let token = issuer().issue("alice", t0()).unwrap();

        let claims = issuer().verify(&token, t0()).unwrap();
        assert_eq!(claims.sub, "alice");
        assert!(issuer().verify(&token, t0() + Duration::seconds(3599)).is_ok());
        assert!(matches!(
            issuer().verify(&token, t0() + Duration::seconds(3600)),
            Err(AppError::Unauthorized(_))
        ));
        assert!(issuer().verify(&token, t0() + Duration::seconds(3601)).is_err());
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = TokenIssuer::new("other-secret", Duration::hours(1)).issue("alice", t0()).unwrap();
        assert!(matches!(
            issuer().verify(&token, t0()),
            Err(AppError::Unauthorized(msg)) if msg == "Missing or invalid token"
        ));
    }

    #[test]
    fn expiry_past_the_calendar_limit_is_an_error() {
        let issuer = TokenIssuer::new("test-secret", Duration::days(366));
        assert!(matches!(
            issuer.issue("alice", DateTime::<Utc>::MAX_UTC - Duration::days(1)),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(issuer().verify("not.a.jwt", t0()).is_err());
    }

    #[tokio::test]
    async fn password_round_trip_and_mutation() {
        let hash = hash_password("hunter22".to_string(), 4).await.unwrap();
        assert_ne!(hash, "hunter22");
        assert!(verify_password("hunter22".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("hunter23".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("Hunter22".to_string(), hash).await.unwrap());
    }

    #[tokio::test]
    async fn same_password_gets_different_salts() {
        let a = hash_password("pw".to_string(), 4).await.unwrap();
        let b = hash_password("pw".to_string(), 4).await.unwrap();
        assert_ne!(a, b);
    }
}
