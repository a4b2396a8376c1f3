use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::{config::AuthConfig, state::AppState};

/// Session token payload: the user's email and a Unix expiry timestamp.
///
/// `sub` is optional so a token without the claim is reported as
/// [`TokenError::MissingSubject`] instead of failing to deserialize.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub exp: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature is invalid or malformed")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token carries no subject")]
    MissingSubject,
}

/// Process-wide signing material. Tokens are HMAC-SHA256 signed and
/// self-contained; there is no server-side revocation, logout only drops the
/// client cookie.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub access_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let AuthConfig {
            secret,
            token_ttl_minutes,
        } = state.config.auth.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::minutes(token_ttl_minutes),
        }
    }
}

impl JwtKeys {
    pub fn issue(&self, subject: &str, ttl: Duration) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: Some(subject.to_string()),
            exp: (now + ttl).unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(subject = %subject, "token issued");
        Ok(token)
    }

    pub fn validate(&self, token: &str) -> Result<String, TokenError> {
        let mut validation = Validation::default();
        // Exact expiry: a token is invalid the second `exp` passes.
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::InvalidSignature,
            }
        })?;
        let subject = data.claims.sub.ok_or(TokenError::MissingSubject)?;
        debug!(subject = %subject, "token verified");
        Ok(subject)
    }
}
