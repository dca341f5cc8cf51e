use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use utoipa::ToSchema;

use super::capability::{REFRESH_TOKEN, RoleCapabilityMap};
use super::error::AuthError;
use super::password::CredentialVerifier;
use super::principal::Principal;
use super::token::{TokenClaims, TokenCodec, TokenError};
use crate::users::{UserRecord, UserStore};

/// Access/refresh pair returned by both token endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::minutes(15),
            refresh: Duration::hours(24),
        }
    }
}

/// Issues and refreshes token pairs, and turns access tokens into principals.
///
/// Stateless: nothing is remembered between calls. Refresh tokens are not
/// single-use, every refresh mints a fresh pair.
pub struct UserAuthService {
    store: Arc<dyn UserStore>,
    verifier: CredentialVerifier,
    codec: TokenCodec,
    capabilities: RoleCapabilityMap,
    lifetimes: TokenLifetimes,
}

impl UserAuthService {
    pub fn new(
        store: Arc<dyn UserStore>,
        codec: TokenCodec,
        capabilities: RoleCapabilityMap,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self {
            verifier: CredentialVerifier::new(store.clone()),
            store,
            codec,
            capabilities,
            lifetimes,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn capabilities(&self) -> &RoleCapabilityMap {
        &self.capabilities
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    /// Login with username or email plus password
    pub async fn authenticate_with_credentials(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<TokenPair, AuthError> {
        self.verifier.verify(identifier, password).await?;

        // Deleted between the two lookups: same answer as a wrong password
        let user = self
            .store
            .get_user_by_identifier(identifier)
            .await?
            .ok_or(AuthError::BadCredentials)?;

        let pair = self.issue_pair(&user)?;
        tracing::info!(user_id = %user.id, role = %user.role, "issued token pair");
        Ok(pair)
    }

    /// Exchange a live refresh token for a brand-new pair
    pub async fn authenticate_with_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenPair, AuthError> {
        let claims = self.verify(refresh_token)?;

        if claims.user_id.is_empty() || !claims.capabilities.iter().any(|c| c == REFRESH_TOKEN) {
            tracing::warn!("refresh rejected: token is not a refresh token");
            return Err(AuthError::BadToken);
        }

        let user = match self.store.get_user_by_id(&claims.user_id).await? {
            Some(user) => user,
            None => {
                tracing::warn!(user_id = %claims.user_id, "refresh rejected: user no longer exists");
                return Err(AuthError::BadToken);
            }
        };

        let pair = self.issue_pair(&user)?;
        tracing::info!(user_id = %user.id, "refreshed token pair");
        Ok(pair)
    }

    /// Verify an access token and build the request principal.
    ///
    /// Refresh tokens are refused here: they only mint pairs.
    pub fn verify_access_token(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.verify(token)?;

        if claims.capabilities.iter().any(|c| c == REFRESH_TOKEN) {
            tracing::debug!("refresh token presented as access token");
            return Err(AuthError::Unauthorized);
        }
        match claims.role {
            Some(role) if !claims.user_id.is_empty() => Ok(Principal {
                user_id: claims.user_id,
                role,
                capabilities: claims.capabilities,
            }),
            _ => {
                tracing::debug!("access token without subject or role");
                Err(AuthError::Unauthorized)
            }
        }
    }

    fn verify(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.codec.verify(token).map_err(|e: TokenError| {
            tracing::debug!(reason = e.reason(), "token verification failed");
            AuthError::from(e)
        })
    }

    fn issue_pair(&self, user: &UserRecord) -> Result<TokenPair, AuthError> {
        let access = TokenClaims {
            user_id: user.id.clone(),
            role: Some(user.role),
            capabilities: self.capabilities.capabilities_for(user.role),
        };
        let refresh = TokenClaims {
            user_id: user.id.clone(),
            role: None,
            capabilities: vec![REFRESH_TOKEN.to_string()],
        };

        Ok(TokenPair {
            access_token: self.codec.sign(&access, self.lifetimes.access)?,
            refresh_token: self.codec.sign(&refresh, self.lifetimes.refresh)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user_auth::capabilities::USER_ADMINISTRATION_READ;
    use crate::user_auth::hash_password;
    use crate::users::store::FailingStore;
    use crate::users::{InMemoryUserStore, NewUser, Role};

    struct Fixture {
        store: Arc<InMemoryUserStore>,
        service: UserAuthService,
        admin: UserRecord,
        regular: UserRecord,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryUserStore::new());
        let admin = store
            .create_user(NewUser {
                username: "root".to_string(),
                email: "root@example.com".to_string(),
                password_hash: hash_password("root-password").unwrap(),
                role: Role::SuperUser,
            })
            .await
            .unwrap();
        let regular = store
            .create_user(NewUser {
                username: "bob".to_string(),
                email: "bob@example.com".to_string(),
                password_hash: hash_password("bob-password").unwrap(),
                role: Role::RegularUser,
            })
            .await
            .unwrap();

        let codec = TokenCodec::with_secret(b"service-test-secret", "userhub", "test").unwrap();
        let service = UserAuthService::new(
            store.clone(),
            codec,
            RoleCapabilityMap::default(),
            TokenLifetimes::default(),
        );

        Fixture {
            store,
            service,
            admin,
            regular,
        }
    }

    #[tokio::test]
    async fn test_credentials_issue_role_derived_access_token() {
        let fx = fixture().await;
        let pair = fx
            .service
            .authenticate_with_credentials("root", "root-password")
            .await
            .unwrap();

        let access = fx.service.codec().verify(&pair.access_token).unwrap();
        assert_eq!(access.user_id, fx.admin.id);
        assert_eq!(access.role, Some(Role::SuperUser));
        assert_eq!(
            access.capabilities,
            RoleCapabilityMap::default().capabilities_for(Role::SuperUser)
        );

        let refresh = fx.service.codec().verify(&pair.refresh_token).unwrap();
        assert_eq!(refresh.user_id, fx.admin.id);
        assert_eq!(refresh.role, None);
        assert_eq!(refresh.capabilities, vec![REFRESH_TOKEN.to_string()]);
    }

    #[tokio::test]
    async fn test_login_by_email() {
        let fx = fixture().await;
        let pair = fx
            .service
            .authenticate_with_credentials("bob@example.com", "bob-password")
            .await
            .unwrap();
        let principal = fx.service.verify_access_token(&pair.access_token).unwrap();
        assert_eq!(principal.user_id, fx.regular.id);
        assert!(principal.capabilities.is_empty());
    }

    #[tokio::test]
    async fn test_bad_credentials_for_wrong_password_and_unknown_user() {
        let fx = fixture().await;
        let wrong = fx
            .service
            .authenticate_with_credentials("root", "nope")
            .await
            .unwrap_err();
        let unknown = fx
            .service
            .authenticate_with_credentials("ghost", "root-password")
            .await
            .unwrap_err();
        assert!(matches!(wrong, AuthError::BadCredentials));
        assert!(matches!(unknown, AuthError::BadCredentials));
    }

    #[tokio::test]
    async fn test_refresh_mints_new_pair_with_same_content() {
        let fx = fixture().await;
        let first = fx
            .service
            .authenticate_with_credentials("root", "root-password")
            .await
            .unwrap();
        let second = fx
            .service
            .authenticate_with_refresh_token(&first.refresh_token)
            .await
            .unwrap();

        assert_ne!(first.access_token, second.access_token);
        assert_ne!(first.refresh_token, second.refresh_token);
        assert_eq!(
            fx.service.codec().verify(&first.access_token).unwrap(),
            fx.service.codec().verify(&second.access_token).unwrap()
        );

        // Not single-use: the old refresh token still works
        assert!(
            fx.service
                .authenticate_with_refresh_token(&first.refresh_token)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_refresh_picks_up_role_change() {
        let fx = fixture().await;
        let pair = fx
            .service
            .authenticate_with_credentials("bob", "bob-password")
            .await
            .unwrap();
        fx.store
            .update_role(&fx.regular.id, Role::SuperUser)
            .await
            .unwrap();

        let refreshed = fx
            .service
            .authenticate_with_refresh_token(&pair.refresh_token)
            .await
            .unwrap();
        let principal = fx
            .service
            .verify_access_token(&refreshed.access_token)
            .unwrap();
        assert_eq!(principal.role, Role::SuperUser);
        assert!(principal.has_capability(USER_ADMINISTRATION_READ));
    }

    #[tokio::test]
    async fn test_expired_refresh_token_is_unauthorized() {
        let fx = fixture().await;
        let expired = fx
            .service
            .codec()
            .sign(
                &TokenClaims {
                    user_id: fx.admin.id.clone(),
                    role: None,
                    capabilities: vec![REFRESH_TOKEN.to_string()],
                },
                Duration::seconds(-30),
            )
            .unwrap();

        let err = fx
            .service
            .authenticate_with_refresh_token(&expired)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn test_access_token_is_not_a_refresh_token() {
        let fx = fixture().await;
        let pair = fx
            .service
            .authenticate_with_credentials("root", "root-password")
            .await
            .unwrap();
        let err = fx
            .service
            .authenticate_with_refresh_token(&pair.access_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::BadToken));
        assert_eq!(err.to_string(), "Bad jwt");
    }

    #[tokio::test]
    async fn test_refresh_without_subject_is_bad_token() {
        let fx = fixture().await;
        let token = fx
            .service
            .codec()
            .sign(
                &TokenClaims {
                    user_id: String::new(),
                    role: None,
                    capabilities: vec![REFRESH_TOKEN.to_string()],
                },
                Duration::minutes(5),
            )
            .unwrap();
        let err = fx
            .service
            .authenticate_with_refresh_token(&token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::BadToken));
    }

    #[tokio::test]
    async fn test_refresh_for_deleted_user_is_bad_token() {
        let fx = fixture().await;
        let pair = fx
            .service
            .authenticate_with_credentials("bob", "bob-password")
            .await
            .unwrap();
        assert!(fx.store.delete_user(&fx.regular.id).await.unwrap());

        let err = fx
            .service
            .authenticate_with_refresh_token(&pair.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::BadToken));
    }

    #[tokio::test]
    async fn test_garbage_refresh_token_is_unauthorized() {
        let fx = fixture().await;
        let err = fx
            .service
            .authenticate_with_refresh_token("garbage")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized));
    }

    #[tokio::test]
    async fn test_refresh_token_cannot_be_used_for_access() {
        let fx = fixture().await;
        let pair = fx
            .service
            .authenticate_with_credentials("root", "root-password")
            .await
            .unwrap();
        assert!(matches!(
            fx.service.verify_access_token(&pair.refresh_token),
            Err(AuthError::Unauthorized)
        ));
        assert!(matches!(
            fx.service.verify_access_token(""),
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_store_outage_is_internal_error() {
        let codec = TokenCodec::with_secret(b"secret", "userhub", "test").unwrap();
        let service = UserAuthService::new(
            Arc::new(FailingStore),
            codec,
            RoleCapabilityMap::default(),
            TokenLifetimes::default(),
        );

        let err = service
            .authenticate_with_credentials("root", "root-password")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));

        let refresh = service
            .codec()
            .sign(
                &TokenClaims {
                    user_id: "u1".to_string(),
                    role: None,
                    capabilities: vec![REFRESH_TOKEN.to_string()],
                },
                Duration::minutes(5),
            )
            .unwrap();
        let err = service
            .authenticate_with_refresh_token(&refresh)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
    }
}
