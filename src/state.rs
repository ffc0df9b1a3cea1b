use std::sync::Arc;

use crate::config::AppConfig;
use crate::db;
use crate::nutrition::FoodTable;
use crate::recognition::{self, Recognizer};
use crate::records::repo::RecordStore;
use crate::storage::{LocalStorage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub store: RecordStore,
    pub config: Arc<AppConfig>,
    pub foods: Arc<FoodTable>,
    pub storage: Arc<dyn StorageClient>,
    pub recognizer: Arc<dyn Recognizer>,
}

impl AppState {
    /// Connects the database, creates the schema and the upload directory.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let store = RecordStore::new(db::connect(&config.database_url).await?);
        store.init().await?;

        let storage = Arc::new(LocalStorage::new(&config.upload_dir).await?) as Arc<dyn StorageClient>;
        let recognizer = recognition::from_config(&config.recognizer);
        tracing::info!(
            recognizer = recognizer.name(),
            upload_dir = %config.upload_dir.display(),
            "state initialised"
        );

        Ok(Self::from_parts(store, config, storage, recognizer))
    }

    pub fn from_parts(
        store: RecordStore,
        config: Arc<AppConfig>,
        storage: Arc<dyn StorageClient>,
        recognizer: Arc<dyn Recognizer>,
    ) -> Self {
        Self {
            store,
            config,
            foods: Arc::new(FoodTable::default()),
            storage,
            recognizer,
        }
    }

    /// In-memory database, uploads under `upload_dir`, default config.
    #[cfg(test)]
    pub async fn fake(upload_dir: &std::path::Path) -> Self {
        let store = RecordStore::new(db::connect_in_memory().await);
        store.init().await.expect("schema");

        let config = Arc::new(AppConfig {
            database_url: "sqlite::memory:".into(),
            upload_dir: upload_dir.to_path_buf(),
            ..AppConfig::default()
        });
        let storage = Arc::new(LocalStorage::new(upload_dir).await.expect("upload dir"))
            as Arc<dyn StorageClient>;
        let recognizer = recognition::from_config(&config.recognizer);

        Self::from_parts(store, config, storage, recognizer)
    }
}
