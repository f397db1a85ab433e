//! Identity token verification.
//!
//! Tokens are verified against the identity provider's published JSON key
//! set: select the key by the token header's `kid`, check the RS256
//! signature and audience, extract the verified `email` claim. The key set
//! is cached in-process and refetched once when an unknown `kid` appears.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::anyhow;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::AuthError;

/// Verifies a bearer token and yields the owner email it asserts.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<String, AuthError>;
}

/// Claims we read from a verified token.
#[derive(Debug, Deserialize)]
struct Claims {
    email: Option<String>,
}

/// One RSA public key from the JWKS document.
#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct KeySet {
    keys: Vec<Jwk>,
}

/// JWKS-backed verifier.
///
/// All methods are synchronous (blocking HTTP on a cache miss) — callers in
/// async contexts should use `tokio::task::spawn_blocking`.
pub struct JwksVerifier {
    client: reqwest::blocking::Client,
    jwks_url: String,
    audience: String,
    keys: Mutex<HashMap<String, Jwk>>,
}

impl JwksVerifier {
    pub fn new(config: &crate::config::AuthConfig) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            jwks_url: config.jwks_url.clone(),
            audience: config.audience.clone(),
            keys: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a key by kid, refetching the key set once on a miss.
    fn key_for(&self, kid: &str) -> Result<Jwk, AuthError> {
        {
            let keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(key) = keys.get(kid) {
                return Ok(key.clone());
            }
        }

        let fetched: KeySet = self
            .client
            .get(&self.jwks_url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::KeyFetch(anyhow!(e)))?
            .json()
            .map_err(|e| AuthError::KeyFetch(anyhow!(e)))?;

        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        for key in fetched.keys {
            keys.insert(key.kid.clone(), key);
        }

        keys.get(kid)
            .cloned()
            .ok_or_else(|| AuthError::UnknownKey(kid.to_string()))
    }
}

impl TokenVerifier for JwksVerifier {
    fn verify(&self, token: &str) -> Result<String, AuthError> {
        let header =
            decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidToken("token header has no kid".into()))?;

        let jwk = self.key_for(&kid)?;
        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.audience]);

        let data = decode::<Claims>(token, &key, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        data.claims.email.ok_or(AuthError::MissingEmail)
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn extract_bearer(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
