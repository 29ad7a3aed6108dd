//! Signed identity tokens (HS256 JWT)

use crate::error::RelayError;
use dronerelay_shared::now_secs;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Claims carried by every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

/// Issues and verifies bearer tokens with a single process-wide secret.
///
/// Stateless: there is no revocation list, a token is valid until `exp`.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    /// Create a token service signing with `secret`
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Issue a token for `identity`, valid for the configured TTL from now
    pub fn issue(&self, identity: &str) -> Result<String, RelayError> {
        let issued_at = now_secs();
        self.sign(&Claims {
            sub: identity.to_string(),
            iat: issued_at,
            exp: issued_at + self.ttl.as_secs(),
        })
    }

    /// Sign an arbitrary claim set
    pub fn sign(&self, claims: &Claims) -> Result<String, RelayError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| RelayError::Internal(format!("token signing failed: {}", e)))
    }

    /// Verify a token and return its subject
    pub fn verify(&self, token: &str) -> Result<String, RelayError> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims.sub),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(RelayError::ExpiredToken),
                _ => Err(RelayError::InvalidToken),
            },
        }
    }
}
