use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use shared::protocol::{
    CreateRecordsRequest, DeleteRecordsRequest, ListRecordsRequest, ListRecordsResponse,
    MutationResponse, UpdateRecordsRequest,
};

pub mod catalog;
pub mod config;
pub mod debounce;
pub mod error;
pub mod forms;
mod http_backend;
mod in_memory;
pub mod query;

pub use catalog::{CatalogClient, CatalogEvent, CatalogSnapshot, FetchOutcome};
pub use config::{load_settings, Settings};
pub use debounce::{debounce_commits, Debouncer};
pub use error::{CatalogError, CatalogOperation};
pub use forms::{
    DeleteConfirmModal, DeleteDetails, FormError, ModalError, ModalPhase, ProductDraft,
    ProductForm, ProductModal, ProductSubmission,
};
pub use http_backend::HttpRecordsBackend;
pub use in_memory::{sample_products, InMemoryRecordsBackend};
pub use query::{Pager, QueryState, PAGE_SIZE};

/// The four collection operations the catalog needs from a records service.
///
/// `Err` means the call never produced a decodable response (transport
/// failure). A decoded response with `status == false` is returned as `Ok`
/// and judged by the caller.
#[async_trait]
pub trait RecordsBackend: Send + Sync {
    async fn list_records(&self, request: ListRecordsRequest) -> Result<ListRecordsResponse>;
    async fn create_records(&self, request: CreateRecordsRequest) -> Result<MutationResponse>;
    async fn update_records(&self, request: UpdateRecordsRequest) -> Result<MutationResponse>;
    async fn delete_records(&self, request: DeleteRecordsRequest) -> Result<MutationResponse>;
}

/// Backend selected at startup: the seeded in-memory store, or the HTTP
/// records service described by `settings`.
pub fn records_backend(settings: &Settings, in_memory: bool) -> Result<Arc<dyn RecordsBackend>> {
    if in_memory {
        tracing::info!(collection = %settings.collection, "backend: using seeded in-memory records");
        return Ok(Arc::new(InMemoryRecordsBackend::with_products(
            settings.collection.clone(),
            sample_products(),
        )));
    }

    if settings.api_key.is_empty() {
        tracing::warn!("config: no api key configured; the records service will likely reject requests");
    }
    let backend = HttpRecordsBackend::from_settings(settings)?;
    tracing::info!(base_url = backend.base_url(), "backend: using records service");
    Ok(Arc::new(backend))
}
