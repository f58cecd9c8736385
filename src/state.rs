use std::sync::Arc;

use axum::extract::FromRef;
use tokio::sync::RwLock;

use crate::catalog::Catalog;
use crate::error::AppError;
use crate::session::SessionStore;
use crate::storage::FileStore;
use crate::utils::secret::AdminSecret;

pub type SharedCatalog = Arc<RwLock<Catalog>>;
pub type SharedSessions = Arc<RwLock<SessionStore>>;

#[derive(Clone)]
pub struct AppState {
    pub catalog: SharedCatalog,
    pub sessions: SharedSessions,
    pub admin_secret: Arc<AdminSecret>,
}

impl AppState {
    /// Opens the store under `data_dir`, loads the catalog and hashes the
    /// admin secret.
    pub fn build(data_dir: impl Into<std::path::PathBuf>, admin_password: &str) -> Result<Self, AppError> {
        let store = FileStore::open(data_dir)?;
        let mut catalog = Catalog::new(store);
        catalog.load()?;

        Ok(Self {
            catalog: Arc::new(RwLock::new(catalog)),
            sessions: Arc::new(RwLock::new(SessionStore::default())),
            admin_secret: Arc::new(AdminSecret::from_plain(admin_password)?),
        })
    }

    /// Replaces the session store with an empty one using `idle_ttl`.
    pub fn with_session_idle(mut self, idle_ttl: chrono::Duration) -> Self {
        self.sessions = Arc::new(RwLock::new(SessionStore::new(idle_ttl)));
        self
    }
}

impl FromRef<AppState> for SharedCatalog {
    fn from_ref(state: &AppState) -> Self {
        state.catalog.clone()
    }
}

impl FromRef<AppState> for SharedSessions {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
