use std::sync::Arc;

use pdf_merger_core::{
    BlobStore, MergeOrchestrator, PdfEngine, ServiceConfig, create_blob_store, create_engine,
};

/// Shared application state
pub struct AppState {
    pub config: ServiceConfig,
    pub orchestrator: MergeOrchestrator,
    pub blob_store: Arc<dyn BlobStore>,
}

impl AppState {
    /// State backed by the default lopdf engine
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_engine(config, create_engine())
    }

    pub fn with_engine(config: ServiceConfig, engine: Arc<dyn PdfEngine>) -> Self {
        let blob_store = create_blob_store(&config.storage);
        let orchestrator = MergeOrchestrator::new(engine, &config);
        Self {
            config,
            orchestrator,
            blob_store,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("orchestrator", &self.orchestrator)
            .field("blob_store", &self.blob_store.name())
            .finish()
    }
}
