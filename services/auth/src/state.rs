use std::sync::Arc;

use crate::config::AuthSettings;
use crate::domain::repository::CredentialStore;
use crate::gateway::AuthGateway;
use crate::infra::db::DbCredentialStore;
use crate::rate_limit::AuthThrottle;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState<S: CredentialStore = DbCredentialStore> {
    pub store: S,
    pub settings: Arc<AuthSettings>,
    pub gateway: Arc<AuthGateway>,
    pub throttle: AuthThrottle,
}

impl<S: CredentialStore> AppState<S> {
    pub fn new(store: S, settings: AuthSettings, throttle: AuthThrottle) -> Self {
        let gateway = AuthGateway::standard(store.profiles(), settings.jwt_secret.clone());
        Self {
            store,
            settings: Arc::new(settings),
            gateway: Arc::new(gateway),
            throttle,
        }
    }
}
