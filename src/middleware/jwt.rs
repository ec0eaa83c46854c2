//! JWT bearer authentication

use crate::server::{handler, middleware, HttpError, MiddlewareFunc};

use chrono::Utc;
use hyper::header::AUTHORIZATION;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("invalid claims data: {0}")]
    Data(#[from] serde_json::Error),
    #[error("invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// The `data` payload of a verified token, stored in the request context.
#[derive(Debug, Clone, PartialEq)]
pub struct JwtClaims(pub Value);

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    exp: i64,
    data: Value,
}

/// Issues and verifies HS256 tokens carrying an arbitrary JSON payload.
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_duration: Duration,
}

impl JwtManager {
    pub fn new(secret: impl AsRef<[u8]>, token_duration: Duration) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            token_duration,
        }
    }

    pub fn token_duration(&self) -> Duration {
        self.token_duration
    }

    /// Sign `data` into a token expiring after the configured duration.
    pub fn generate<T: Serialize>(&self, data: &T) -> Result<String, JwtError> {
        let claims = Claims {
            exp: Utc::now().timestamp() + self.token_duration.as_secs() as i64,
            data: serde_json::to_value(data)?,
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Check signature and expiry, returning the payload.
    pub fn verify(&self, token: &str) -> Result<Value, JwtError> {
        let validation = Validation::new(Algorithm::HS256);
        let token = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(token.claims.data)
    }
}

/// Reject requests without a valid `Authorization: Bearer <token>` with 401.
/// On success the payload is available as [`JwtClaims`] via `Context::get`.
pub fn jwt(manager: Arc<JwtManager>) -> MiddlewareFunc {
    middleware(move |next| {
        let manager = manager.clone();
        handler(move |c| {
            let next = next.clone();
            let manager = manager.clone();
            Box::pin(async move {
                let token = match c.header(AUTHORIZATION.as_str()) {
                    Some(value) if !value.is_empty() => value,
                    _ => return Err(HttpError::unauthorized().into()),
                };
                let token = token.strip_prefix("Bearer ").unwrap_or(token);

                let data = match manager.verify(token) {
                    Ok(data) => data,
                    Err(e) => {
                        debug!("rejecting token: {}", e);
                        return Err(HttpError::unauthorized().into());
                    }
                };

                c.set(JwtClaims(data));
                next(c).await
            })
        })
    })
}
