use std::sync::Arc;

use anyhow::anyhow;

use zflow_ai::ChatModel;
use zflow_db::Database;
use zflow_pipeline::Dispatcher;
use zflow_types::api::PublicConfig;

use crate::ApiError;
use crate::identity::IdentityProvider;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub chat_model: Arc<dyn ChatModel>,
    pub code_model: Arc<dyn ChatModel>,
    pub identity: Arc<dyn IdentityProvider>,
    pub dispatcher: Dispatcher,
    pub public_config: PublicConfig,
}

impl AppStateInner {
    pub fn new(
        db: Arc<Database>,
        jwt_secret: String,
        chat_model: Arc<dyn ChatModel>,
        code_model: Arc<dyn ChatModel>,
        identity: Arc<dyn IdentityProvider>,
        public_config: PublicConfig,
    ) -> AppState {
        let dispatcher = Dispatcher::new(db.clone(), chat_model.clone(), code_model.clone());
        Arc::new(Self {
            db,
            jwt_secret,
            chat_model,
            code_model,
            identity,
            dispatcher,
            public_config,
        })
    }

    /// Run a blocking DB call off the async runtime.
    pub async fn db_call<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        let result = tokio::task::spawn_blocking(move || f(db.as_ref()))
            .await
            .map_err(|e| anyhow!("spawn_blocking join error: {}", e))??;
        Ok(result)
    }
}
