//! Authentication and authorization.
//!
//! ## Components
//! - `password`: Argon2 hashing and the credential verifier
//! - `token`: JWT codec (HS256 shared secret or EdDSA key pair)
//! - `capability`: Role → Capability table and the refresh marker
//! - `service`: token pair issuance and refresh
//! - `principal`: the per-request verified identity
//! - `middleware`: access and authority guards, route descriptors
//! - `handlers`: `/auth/token` and `/auth/refresh`
//! - `error`: auth error taxonomy and its HTTP mapping

pub mod capability;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod password;
pub mod principal;
pub mod service;
pub mod token;

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;

pub use capability::{CapabilityError, REFRESH_TOKEN, RoleCapabilityMap, RoleGrant, capabilities};
pub use error::{AuthError, ErrorBody};
pub use middleware::{
    GuardState, RouteAccess, access_guard, authority_guard, bearer_token, guarded, route_guard,
};
pub use password::{CredentialVerifier, hash_password};
pub use principal::Principal;
pub use service::{TokenLifetimes, TokenPair, UserAuthService};
pub use token::{TokenClaims, TokenCodec, TokenError};

use crate::config::{AuthConfig, SigningConfig};
use crate::users::UserStore;

/// Build the token codec for the configured signing mode.
pub fn build_codec(config: &AuthConfig, env: &str) -> Result<TokenCodec> {
    let audience = config.audience_for(env);
    let codec = match &config.signing {
        SigningConfig::Secret { secret } => {
            TokenCodec::with_secret(secret.as_bytes(), config.issuer.as_str(), audience)?
        }
        SigningConfig::KeyPair {
            private_key_path,
            public_key_path,
        } => {
            let private_pem = fs::read(private_key_path)
                .with_context(|| format!("Failed to read private key: {}", private_key_path))?;
            let public_pem = fs::read(public_key_path)
                .with_context(|| format!("Failed to read public key: {}", public_key_path))?;
            TokenCodec::with_ed25519_pem(
                &private_pem,
                &public_pem,
                config.issuer.as_str(),
                audience,
            )?
        }
    };
    tracing::info!(
        algorithm = ?codec.algorithm(),
        issuer = codec.issuer(),
        audience = codec.audience(),
        "token codec ready"
    );
    Ok(codec)
}

/// Assemble the auth service from configuration.
pub fn build_auth_service(
    config: &AuthConfig,
    env: &str,
    store: Arc<dyn UserStore>,
) -> Result<UserAuthService> {
    let codec = build_codec(config, env)?;
    let capabilities = match &config.role_capabilities {
        Some(grants) => RoleCapabilityMap::new(grants.clone())?,
        None => RoleCapabilityMap::default(),
    };
    let lifetimes = TokenLifetimes {
        access: Duration::try_seconds(config.access_token_ttl_secs)
            .context("access_token_ttl_secs out of range")?,
        refresh: Duration::try_seconds(config.refresh_token_ttl_secs)
            .context("refresh_token_ttl_secs out of range")?,
    };
    Ok(UserAuthService::new(store, codec, capabilities, lifetimes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{InMemoryUserStore, Role};
    use std::collections::HashMap;

    fn auth_config(signing: SigningConfig) -> AuthConfig {
        AuthConfig {
            signing,
            issuer: "userhub".to_string(),
            audience: None,
            access_token_ttl_secs: 60,
            refresh_token_ttl_secs: 120,
            role_capabilities: None,
        }
    }

    #[test]
    fn test_build_secret_codec_uses_env_as_audience() {
        let config = auth_config(SigningConfig::Secret {
            secret: "s3cret".to_string(),
        });
        let codec = build_codec(&config, "staging").unwrap();
        assert_eq!(codec.algorithm(), jsonwebtoken::Algorithm::HS256);
        assert_eq!(codec.audience(), "staging");
    }

    #[test]
    fn test_build_key_pair_codec_from_files() {
        let config = auth_config(SigningConfig::KeyPair {
            private_key_path: "tests/fixtures/ed25519_private.pem".to_string(),
            public_key_path: "tests/fixtures/ed25519_public.pem".to_string(),
        });
        let codec = build_codec(&config, "dev").unwrap();
        assert_eq!(codec.algorithm(), jsonwebtoken::Algorithm::EdDSA);
    }

    #[test]
    fn test_missing_key_file_and_empty_secret_fail() {
        let config = auth_config(SigningConfig::KeyPair {
            private_key_path: "does/not/exist.pem".to_string(),
            public_key_path: "tests/fixtures/ed25519_public.pem".to_string(),
        });
        assert!(build_codec(&config, "dev").is_err());

        let config = auth_config(SigningConfig::Secret {
            secret: String::new(),
        });
        assert!(build_codec(&config, "dev").is_err());
    }

    #[test]
    fn test_build_auth_service_applies_overrides() {
        let mut config = auth_config(SigningConfig::Secret {
            secret: "s3cret".to_string(),
        });
        let mut grants = HashMap::new();
        grants.insert(Role::RegularUser, vec!["PROFILE:read".to_string()]);
        config.role_capabilities = Some(grants);

        let service =
            build_auth_service(&config, "dev", Arc::new(InMemoryUserStore::new())).unwrap();
        assert_eq!(
            service.capabilities().capabilities_for(Role::RegularUser),
            vec!["PROFILE:read".to_string()]
        );
        assert_eq!(service.lifetimes().access, Duration::seconds(60));
        assert_eq!(service.lifetimes().refresh, Duration::seconds(120));
    }

    #[test]
    fn test_reserved_capability_in_config_fails() {
        let mut config = auth_config(SigningConfig::Secret {
            secret: "s3cret".to_string(),
        });
        let mut grants = HashMap::new();
        grants.insert(Role::SuperUser, vec![REFRESH_TOKEN.to_string()]);
        config.role_capabilities = Some(grants);

        assert!(build_auth_service(&config, "dev", Arc::new(InMemoryUserStore::new())).is_err());
    }

    #[test]
    fn test_out_of_range_ttl_is_an_error_not_a_panic() {
        let mut config = auth_config(SigningConfig::Secret {
            secret: "s3cret".to_string(),
        });
        config.access_token_ttl_secs = i64::MAX;

        let err = build_auth_service(&config, "dev", Arc::new(InMemoryUserStore::new()))
            .err()
            .unwrap();
        assert!(err.to_string().contains("access_token_ttl_secs"));
    }
}
