//! JWT signing and verification.
//!
//! One algorithm per deployment: HS256 when a shared secret is configured,
//! EdDSA (Ed25519, PEM keys) otherwise. Every token carries issuer, audience,
//! issued-at, expiry and a random `jti`.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::users::Role;

#[derive(Debug, Error)]
pub enum TokenError {
    /// Any structural, signature, issuer/audience or expiry failure.
    /// Callers only ever see this one kind; [`TokenError::reason`] is for logs.
    #[error("invalid token")]
    InvalidToken(#[source] JwtError),

    #[error("failed to sign token: {0}")]
    Signing(#[source] JwtError),

    #[error("invalid key material: {0}")]
    KeyMaterial(String),
}

impl TokenError {
    /// Short internal classification of a verification failure
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidToken(e) => match e.kind() {
                ErrorKind::ExpiredSignature => "expired",
                ErrorKind::InvalidSignature => "bad signature",
                ErrorKind::InvalidIssuer => "wrong issuer",
                ErrorKind::InvalidAudience => "wrong audience",
                ErrorKind::InvalidAlgorithm => "wrong algorithm",
                ErrorKind::MissingRequiredClaim(_) => "missing claim",
                _ => "malformed",
            },
            Self::Signing(_) => "signing",
            Self::KeyMaterial(_) => "key material",
        }
    }
}

/// Domain payload of a token: who, as what, allowed to do what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: String,
    /// Present on access tokens, absent on refresh tokens
    pub role: Option<Role>,
    pub capabilities: Vec<String>,
}

/// What actually goes over the wire.
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    // Missing `sub` decodes as empty so the refresh flow can reject it as a
    // semantic failure rather than a cryptographic one.
    #[serde(default)]
    sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
    #[serde(default)]
    authorities: Vec<String>,
    iss: String,
    aud: String,
    iat: i64,
    exp: i64,
    jti: String,
}

pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
}

impl TokenCodec {
    /// HS256 with a shared secret
    pub fn with_secret(
        secret: &[u8],
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::KeyMaterial("empty shared secret".to_string()));
        }
        Ok(Self::build(
            Algorithm::HS256,
            EncodingKey::from_secret(secret),
            DecodingKey::from_secret(secret),
            issuer.into(),
            audience.into(),
        ))
    }

    /// EdDSA with a PKCS#8 private key and SPKI public key, both PEM
    pub fn with_ed25519_pem(
        private_pem: &[u8],
        public_pem: &[u8],
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Result<Self, TokenError> {
        let encoding_key = EncodingKey::from_ed_pem(private_pem)
            .map_err(|e| TokenError::KeyMaterial(format!("private key: {}", e)))?;
        let decoding_key = DecodingKey::from_ed_pem(public_pem)
            .map_err(|e| TokenError::KeyMaterial(format!("public key: {}", e)))?;
        Ok(Self::build(
            Algorithm::EdDSA,
            encoding_key,
            decoding_key,
            issuer.into(),
            audience.into(),
        ))
    }

    fn build(
        algorithm: Algorithm,
        encoding_key: EncodingKey,
        decoding_key: DecodingKey,
        issuer: String,
        audience: String,
    ) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_audience(&[audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        Self {
            algorithm,
            encoding_key,
            decoding_key,
            validation,
            issuer,
            audience,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Sign `claims`, expiring `ttl` from now. A negative `ttl` yields an
    /// already-expired token.
    pub fn sign(&self, claims: &TokenClaims, ttl: Duration) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let wire = WireClaims {
            sub: claims.user_id.clone(),
            role: claims.role,
            authorities: claims.capabilities.clone(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now,
            exp: now + ttl.num_seconds(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(self.algorithm), &wire, &self.encoding_key).map_err(TokenError::Signing)
    }

    /// Check signature, issuer, audience and expiry, then return the payload.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let data = decode::<WireClaims>(token, &self.decoding_key, &self.validation)
            .map_err(TokenError::InvalidToken)?;
        let wire = data.claims;

        // jsonwebtoken accepts exp == now; a token is only live while now < exp
        if wire.exp <= Utc::now().timestamp() {
            return Err(TokenError::InvalidToken(JwtError::from(
                ErrorKind::ExpiredSignature,
            )));
        }

        Ok(TokenClaims {
            user_id: wire.sub,
            role: wire.role,
            capabilities: wire.authorities,
        })
    }
}
