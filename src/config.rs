use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

use crate::users::Role;

/// Overrides `auth.signing.secret` when set, keeps the secret out of YAML
pub const JWT_SECRET_ENV: &str = "USERHUB_JWT_SECRET";

/// Upper bound for token lifetimes (one year)
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL. Absent → in-memory user store.
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub postgres_max_connections: u32,
    pub auth: AuthConfig,
    /// Users inserted at startup when running on the in-memory store
    #[serde(default)]
    pub seed_users: Vec<SeedUser>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    pub signing: SigningConfig,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Defaults to the deployment environment name
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: i64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: i64,
    /// Replaces the built-in Role → Capability table
    #[serde(default)]
    pub role_capabilities: Option<HashMap<Role, Vec<String>>>,
}

impl AuthConfig {
    pub fn audience_for(&self, env: &str) -> String {
        self.audience.clone().unwrap_or_else(|| env.to_string())
    }
}

/// Token signing mode, one per deployment
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SigningConfig {
    /// HS256
    Secret {
        #[serde(default)]
        secret: String,
    },
    /// EdDSA, PEM files
    KeyPair {
        private_key_path: String,
        public_key_path: String,
    },
}

#[derive(Serialize, Deserialize, Clone)]
pub struct SeedUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl std::fmt::Debug for SeedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

fn default_max_connections() -> u32 {
    10
}

fn default_issuer() -> String {
    "userhub".to_string()
}

fn default_access_ttl() -> i64 {
    15 * 60
}

fn default_refresh_ttl() -> i64 {
    24 * 60 * 60
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path))?;

        if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
            if let SigningConfig::Secret { secret: ref mut s } = config.auth.signing {
                *s = secret;
            }
        }
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        for (name, ttl) in [
            ("access_token_ttl_secs", config.auth.access_token_ttl_secs),
            ("refresh_token_ttl_secs", config.auth.refresh_token_ttl_secs),
        ] {
            if !(1..=MAX_TOKEN_TTL_SECS).contains(&ttl) {
                anyhow::bail!(
                    "auth.{} must be between 1 and {} seconds, got {}",
                    name,
                    MAX_TOKEN_TTL_SECS,
                    ttl
                );
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
log_level: info
log_dir: ./logs
log_file: userhub.log
use_json: false
rotation: daily
gateway:
  host: 0.0.0.0
  port: 8080
auth:
  signing:
    mode: secret
    secret: dev-secret
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert!(config.postgres_url.is_none());
        assert_eq!(config.postgres_max_connections, 10);
        assert_eq!(config.auth.issuer, "userhub");
        assert_eq!(config.auth.access_token_ttl_secs, 900);
        assert_eq!(config.auth.refresh_token_ttl_secs, 86_400);
        assert_eq!(config.auth.audience_for("staging"), "staging");
        assert!(config.auth.role_capabilities.is_none());
        assert!(config.seed_users.is_empty());
        assert_eq!(
            config.auth.signing,
            SigningConfig::Secret {
                secret: "dev-secret".to_string()
            }
        );
    }

    #[test]
    fn test_key_pair_and_overrides() {
        let yaml = MINIMAL.replace(
            "  signing:\n    mode: secret\n    secret: dev-secret\n",
            r#"  signing:
    mode: key_pair
    private_key_path: keys/private.pem
    public_key_path: keys/public.pem
  audience: production
  access_token_ttl_secs: 60
  role_capabilities:
    REGULAR_USER: ["PROFILE:read"]
seed_users:
  - username: root
    email: root@example.com
    password: change-me
    role: SUPER_USER
"#,
        );
        let config = AppConfig::from_yaml(&yaml).unwrap();

        assert!(matches!(config.auth.signing, SigningConfig::KeyPair { .. }));
        assert_eq!(config.auth.audience_for("dev"), "production");
        assert_eq!(config.auth.access_token_ttl_secs, 60);
        let caps = config.auth.role_capabilities.as_ref().unwrap();
        assert_eq!(caps[&Role::RegularUser], vec!["PROFILE:read".to_string()]);
        assert_eq!(config.seed_users.len(), 1);
        assert_eq!(config.seed_users[0].role, Role::SuperUser);
        assert!(!format!("{:?}", config.seed_users[0]).contains("change-me"));
    }

    #[test]
    fn test_non_positive_ttl_rejected() {
        let yaml = MINIMAL.replace(
            "    secret: dev-secret\n",
            "    secret: dev-secret\n  refresh_token_ttl_secs: 0\n",
        );
        assert!(AppConfig::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_oversized_ttl_rejected() {
        let yaml = MINIMAL.replace(
            "    secret: dev-secret\n",
            "    secret: dev-secret\n  access_token_ttl_secs: 9223372036854775807\n",
        );
        let err = AppConfig::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("access_token_ttl_secs"));
    }

    #[test]
    fn test_unknown_signing_mode_rejected() {
        let yaml = MINIMAL.replace("mode: secret", "mode: rsa");
        assert!(AppConfig::from_yaml(&yaml).is_err());
    }
}
