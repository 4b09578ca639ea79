use std::sync::Arc;

use gw_backend::{AuthProvider, Backend, StoreConnector};
use gw_domain::config::Config;
use gw_providers::registry::ProviderRegistry;

use crate::pipeline::Generator;

/// Shared application state passed to all API handlers.
///
/// Holds only collaborator handles built once at startup; no per-request
/// data lives here.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub llm: Arc<ProviderRegistry>,
    pub auth: Arc<dyn AuthProvider>,
    pub store: Arc<dyn StoreConnector>,
}

impl AppState {
    pub fn new(config: Arc<Config>, llm: Arc<ProviderRegistry>, backend: Backend) -> Self {
        Self {
            config,
            llm,
            auth: backend.auth,
            store: backend.store,
        }
    }

    /// Completion client over the provider registry.
    pub fn generator(&self) -> Generator {
        Generator::new(self.llm.clone())
    }
}
