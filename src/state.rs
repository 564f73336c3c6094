use crate::auth::jwt::JwtKeys;
use crate::auth::services::AuthService;
use crate::config::AppConfig;
use crate::mailer::{HttpMailer, Mailer};
use crate::store::{RestStore, RowStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = Arc::new(RestStore::new(&config.store.url, &config.store.api_key)?)
            as Arc<dyn RowStore>;
        let mailer =
            Arc::new(HttpMailer::new(&config.mail, &config.base_url)?) as Arc<dyn Mailer>;

        Ok(Self::from_parts(store, mailer, config))
    }

    /// Assemble the state from explicit collaborators. Tests pass an
    /// in-memory store and a fake mailer here.
    pub fn from_parts(
        store: Arc<dyn RowStore>,
        mailer: Arc<dyn Mailer>,
        config: Arc<AppConfig>,
    ) -> Self {
        let jwt = JwtKeys::new(&config.jwt);
        Self {
            auth: Arc::new(AuthService::new(store, mailer, jwt)),
            config,
        }
    }
}
