//! `gw-backend`: clients for the hosted auth service and data API.
//!
//! Two traits describe the collaborator boundary:
//!
//! - [`AuthProvider`] resolves access tokens to users and runs password
//!   sign-in / sign-out.
//! - [`StoreConnector`] binds a [`DataStore`] to a caller's access token so
//!   every read and write runs with that caller's row-level permissions.
//!
//! | `backend.mode` | Auth                      | Store                          |
//! |----------------|---------------------------|--------------------------------|
//! | `hosted`       | [`HostedAuth`] (`/auth/v1`) | [`HostedStoreConnector`] (`/rest/v1`) |
//! | `memory`       | [`MemoryAuth`]            | [`MemoryStore`]                |

pub mod auth;
pub mod gotrue;
pub mod hosted;
pub mod memory;
pub mod postgrest;
pub mod store;

pub use auth::{AuthProvider, AuthSession, AuthUser};
pub use gotrue::HostedAuth;
pub use hosted::{from_reqwest, HostedClient};
pub use memory::{MemoryAuth, MemoryStore};
pub use postgrest::{HostedStoreConnector, PostgrestStore};
pub use store::{DataStore, InsightFilter, StoreConnector, TaskFilter};

use std::sync::Arc;

use gw_domain::config::{BackendConfig, BackendMode};
use gw_domain::error::Result;

/// The pair of collaborator handles shared by every request.
#[derive(Clone)]
pub struct Backend {
    pub auth: Arc<dyn AuthProvider>,
    pub store: Arc<dyn StoreConnector>,
}

/// Create the auth and store clients selected by `backend.mode`.
pub fn create_backend(cfg: &BackendConfig) -> Result<Backend> {
    match cfg.mode {
        BackendMode::Hosted => {
            let client = Arc::new(HostedClient::new(cfg)?);
            tracing::info!(url = %cfg.url, "using hosted backend");
            Ok(Backend {
                auth: Arc::new(HostedAuth::new(client.clone())),
                store: Arc::new(HostedStoreConnector::new(client)),
            })
        }
        BackendMode::Memory => {
            let auth = MemoryAuth::new();
            for user in &cfg.dev_users {
                auth.add_user(&user.email, &user.password);
            }
            tracing::warn!(
                dev_users = cfg.dev_users.len(),
                "using in-memory backend; data is lost on restart"
            );
            Ok(Backend {
                auth: Arc::new(auth),
                store: Arc::new(MemoryStore::new()),
            })
        }
    }
}
