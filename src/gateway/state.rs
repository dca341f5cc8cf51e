use std::sync::Arc;
use std::time::Instant;

use crate::user_auth::UserAuthService;
use crate::users::UserStore;

/// Gateway shared state
#[derive(Clone)]
pub struct AppState {
    /// Token issuance, refresh and verification
    pub auth: Arc<UserAuthService>,
    /// User records
    pub users: Arc<dyn UserStore>,
    /// Deployment environment name (also the token audience by default)
    pub env: String,
    started_at: Instant,
}

impl AppState {
    pub fn new(auth: Arc<UserAuthService>, users: Arc<dyn UserStore>, env: impl Into<String>) -> Self {
        Self {
            auth,
            users,
            env: env.into(),
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
