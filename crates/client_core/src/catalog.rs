use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::{
    domain::{CategoryFilter, Product, ProductId, SortOrder},
    protocol::{
        product_id_filter, product_update_rules, CreateOptions, CreateRecordsRequest,
        DeleteRecordsRequest, ListRecordsResponse, MutationResponse, UpdateOptions,
        UpdateRecordsRequest,
    },
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info};

use crate::{
    error::{CatalogError, CatalogOperation},
    forms::ProductForm,
    query::{by_product_id, Pager, QueryState},
    RecordsBackend,
};

/// What the UI renders: the current query plus the last page that came back
/// for it.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSnapshot {
    pub query: QueryState,
    pub products: Vec<Product>,
    pub total_pages: u32,
    pub loading: bool,
    pub last_error: Option<String>,
}

impl Default for CatalogSnapshot {
    fn default() -> Self {
        Self {
            query: QueryState::default(),
            products: Vec::new(),
            total_pages: 1,
            loading: false,
            last_error: None,
        }
    }
}

impl CatalogSnapshot {
    pub fn pager(&self) -> Pager {
        Pager::new(self.query.page, self.total_pages)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    PageLoaded(CatalogSnapshot),
    FetchFailed {
        message: String,
    },
    MutationSucceeded {
        operation: CatalogOperation,
        message: String,
    },
    MutationFailed {
        operation: CatalogOperation,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// A newer fetch was issued while this one was in flight; its response
    /// was dropped.
    Superseded,
    Failed,
    /// The query did not change, so nothing was requested.
    Unchanged,
}

struct CatalogState {
    snapshot: CatalogSnapshot,
}

pub struct CatalogClient {
    backend: Arc<dyn RecordsBackend>,
    collection: String,
    inner: Mutex<CatalogState>,
    fetch_seq: AtomicU64,
    events: broadcast::Sender<CatalogEvent>,
}

impl CatalogClient {
    pub fn new(backend: Arc<dyn RecordsBackend>, collection: impl Into<String>) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            backend,
            collection: collection.into(),
            inner: Mutex::new(CatalogState {
                snapshot: CatalogSnapshot::default(),
            }),
            fetch_seq: AtomicU64::new(0),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CatalogEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> CatalogSnapshot {
        self.inner.lock().await.snapshot.clone()
    }

    fn publish(&self, event: CatalogEvent) {
        let _ = self.events.send(event);
    }

    pub async fn set_category(&self, category: CategoryFilter) -> FetchOutcome {
        self.update_query(|query| query.set_category(category))
            .await
    }

    pub async fn set_sort(&self, sort: SortOrder) -> FetchOutcome {
        self.update_query(|query| query.set_sort(sort)).await
    }

    /// Applies an already-debounced search string.
    pub async fn commit_search(&self, search: &str) -> FetchOutcome {
        let search = search.to_string();
        self.update_query(move |query| query.set_search(search))
            .await
    }

    /// Replaces the whole query at once, e.g. from command-line flags.
    pub async fn set_query(&self, query: QueryState) -> FetchOutcome {
        self.update_query(move |current| *current = query).await
    }

    /// Moves to `page`, clamped to `[1, total_pages]`.
    pub async fn go_to_page(&self, page: u32) -> FetchOutcome {
        let page = { self.inner.lock().await.snapshot.pager().clamp(page) };
        self.update_query(|query| query.set_page(page)).await
    }

    pub async fn next_page(&self) -> FetchOutcome {
        let pager = { self.inner.lock().await.snapshot.pager() };
        match pager.next_page() {
            Some(page) => self.go_to_page(page).await,
            None => FetchOutcome::Unchanged,
        }
    }

    pub async fn previous_page(&self) -> FetchOutcome {
        let pager = { self.inner.lock().await.snapshot.pager() };
        match pager.previous_page() {
            Some(page) => self.go_to_page(page).await,
            None => FetchOutcome::Unchanged,
        }
    }

    pub async fn refresh(&self) -> FetchOutcome {
        self.fetch_products().await
    }

    async fn update_query(&self, apply: impl FnOnce(&mut QueryState)) -> FetchOutcome {
        let changed = {
            let mut guard = self.inner.lock().await;
            let before = guard.snapshot.query.clone();
            apply(&mut guard.snapshot.query);
            guard.snapshot.query != before
        };
        if !changed {
            return FetchOutcome::Unchanged;
        }
        self.fetch_products().await
    }

    /// Requests the page the current query describes and, unless a newer
    /// fetch has been issued in the meantime, replaces the visible list with
    /// it. A page past the end of a non-empty result is pulled back to the
    /// last page and requested again. Failures leave the previous list in
    /// place.
    pub async fn fetch_products(&self) -> FetchOutcome {
        loop {
            let (seq, request) = {
                let mut guard = self.inner.lock().await;
                let seq = self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1;
                guard.snapshot.loading = true;
                (seq, guard.snapshot.query.build(&self.collection))
            };
            let page = request.page;

            let result = self.backend.list_records(request).await;

            let mut guard = self.inner.lock().await;
            let latest = self.fetch_seq.load(Ordering::SeqCst);
            if seq != latest {
                debug!(seq, latest, page, "catalog: discarding stale page response");
                return FetchOutcome::Superseded;
            }

            match list_outcome(result) {
                Ok(response) => {
                    let total_pages = response.meta.total_pages;
                    if total_pages > 0 && page > total_pages {
                        guard.snapshot.query.set_page(total_pages);
                        drop(guard);
                        debug!(page, total_pages, "catalog: page past the end, refetching");
                        continue;
                    }

                    guard.snapshot.loading = false;
                    guard.snapshot.products = response.data;
                    guard.snapshot.total_pages = total_pages;
                    guard.snapshot.last_error = None;
                    let snapshot = guard.snapshot.clone();
                    drop(guard);

                    info!(
                        page,
                        total_pages = snapshot.total_pages,
                        count = snapshot.products.len(),
                        "catalog: page loaded"
                    );
                    self.publish(CatalogEvent::PageLoaded(snapshot));
                    return FetchOutcome::Applied;
                }
                Err(err) => {
                    guard.snapshot.loading = false;
                    let message = err.to_string();
                    guard.snapshot.last_error = Some(message.clone());
                    drop(guard);

                    error!(page, "catalog: {message}");
                    self.publish(CatalogEvent::FetchFailed { message });
                    return FetchOutcome::Failed;
                }
            }
        }
    }

    /// Looks up one product by id without touching the visible page.
    pub async fn fetch_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<Product>, CatalogError> {
        let request = by_product_id(&self.collection, product_id);
        let response = list_outcome(self.backend.list_records(request).await)?;
        Ok(response.data.into_iter().next())
    }

    /// Validates `form`, creates the product under a fresh `P<millis>` id and
    /// re-fetches the current page.
    pub async fn create_product(&self, form: &ProductForm) -> Result<ProductId, CatalogError> {
        let result = self.submit_create(form).await;
        self.settle(CatalogOperation::Create, result, |_| {
            "Product added successfully!".to_string()
        })
        .await
    }

    async fn submit_create(&self, form: &ProductForm) -> Result<ProductId, CatalogError> {
        let draft = form.validate()?;
        let product_id = ProductId::from_timestamp_millis(chrono::Utc::now().timestamp_millis());
        let request = CreateRecordsRequest {
            table: self.collection.clone(),
            data: vec![draft.into_product(product_id.clone())],
            options: CreateOptions::upsert_on_product_id(),
        };
        debug!(product_id = %product_id, "catalog: creating product");
        mutation_outcome(
            CatalogOperation::Create,
            self.backend.create_records(request).await,
        )?;
        Ok(product_id)
    }

    pub async fn update_product(
        &self,
        product_id: &ProductId,
        form: &ProductForm,
    ) -> Result<(), CatalogError> {
        let result = self.submit_update(product_id, form).await;
        self.settle(CatalogOperation::Update, result, |name| {
            format!("Successfully updated product: {name}")
        })
        .await
        .map(|_| ())
    }

    async fn submit_update(
        &self,
        product_id: &ProductId,
        form: &ProductForm,
    ) -> Result<String, CatalogError> {
        let draft = form.validate()?;
        let name = draft.name.clone();
        let request = UpdateRecordsRequest {
            table: self.collection.clone(),
            data: draft.into_patch(),
            filter: product_id_filter(product_id),
            options: UpdateOptions {
                validation_rule: product_update_rules(),
            },
        };
        debug!(product_id = %product_id, "catalog: updating product");
        mutation_outcome(
            CatalogOperation::Update,
            self.backend.update_records(request).await,
        )?;
        Ok(name)
    }

    pub async fn delete_product(&self, product_id: &ProductId) -> Result<(), CatalogError> {
        let label = {
            let guard = self.inner.lock().await;
            guard
                .snapshot
                .products
                .iter()
                .find(|product| &product.product_id == product_id)
                .map(|product| product.name.clone())
                .unwrap_or_else(|| product_id.to_string())
        };
        let request = DeleteRecordsRequest {
            table: self.collection.clone(),
            filter: product_id_filter(product_id),
        };
        debug!(product_id = %product_id, "catalog: deleting product");
        let result = mutation_outcome(
            CatalogOperation::Delete,
            self.backend.delete_records(request).await,
        );
        self.settle(CatalogOperation::Delete, result, |_| {
            format!("Deleted product: {label}")
        })
        .await
    }

    /// Logs and publishes a mutation outcome; successes re-fetch the current
    /// page before returning.
    async fn settle<T>(
        &self,
        operation: CatalogOperation,
        result: Result<T, CatalogError>,
        success_message: impl FnOnce(&T) -> String,
    ) -> Result<T, CatalogError> {
        match result {
            Ok(value) => {
                let message = success_message(&value);
                info!(%operation, "catalog: {message}");
                self.publish(CatalogEvent::MutationSucceeded { operation, message });
                self.fetch_products().await;
                Ok(value)
            }
            Err(err) => {
                if err.is_validation() {
                    info!(%operation, "catalog: {err}");
                } else {
                    error!(%operation, "catalog: {err}");
                }
                self.publish(CatalogEvent::MutationFailed {
                    operation,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

fn list_outcome(
    result: anyhow::Result<ListRecordsResponse>,
) -> Result<ListRecordsResponse, CatalogError> {
    let response = result.map_err(|source| CatalogError::Transport {
        operation: CatalogOperation::Fetch,
        source,
    })?;
    if !response.status {
        let reason = response
            .error
            .as_ref()
            .map(|err| err.message.clone())
            .or_else(|| response.message.clone());
        return Err(CatalogError::rejected(CatalogOperation::Fetch, reason));
    }
    Ok(response)
}

fn mutation_outcome(
    operation: CatalogOperation,
    result: anyhow::Result<MutationResponse>,
) -> Result<(), CatalogError> {
    let response = result.map_err(|source| CatalogError::Transport { operation, source })?;
    if !response.status {
        return Err(CatalogError::rejected(operation, response.failure_reason()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
