use std::sync::atomic::AtomicBool;

use super::*;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::Category,
    protocol::{ListRecordsRequest, MutationResponse},
};
use tokio::sync::{mpsc, oneshot};

use crate::{
    forms::{ProductModal, ProductSubmission},
    in_memory::sample_products,
    InMemoryRecordsBackend,
};

type PendingList = (
    ListRecordsRequest,
    oneshot::Sender<Result<ListRecordsResponse>>,
);

/// Parks every `list_records` call until the test answers it, so responses
/// can be resolved out of order. Mutations go straight to the store.
struct GatedBackend {
    store: Arc<InMemoryRecordsBackend>,
    lists: mpsc::UnboundedSender<PendingList>,
}

impl GatedBackend {
    fn new(store: Arc<InMemoryRecordsBackend>) -> (Self, mpsc::UnboundedReceiver<PendingList>) {
        let (lists, pending) = mpsc::unbounded_channel();
        (Self { store, lists }, pending)
    }
}

#[async_trait]
impl RecordsBackend for GatedBackend {
    async fn list_records(&self, request: ListRecordsRequest) -> Result<ListRecordsResponse> {
        let (reply, response) = oneshot::channel();
        self.lists
            .send((request, reply))
            .map_err(|_| anyhow!("test harness stopped listening"))?;
        response
            .await
            .map_err(|_| anyhow!("test harness dropped the reply"))?
    }

    async fn create_records(&self, request: CreateRecordsRequest) -> Result<MutationResponse> {
        self.store.create_records(request).await
    }

    async fn update_records(&self, request: UpdateRecordsRequest) -> Result<MutationResponse> {
        self.store.update_records(request).await
    }

    async fn delete_records(&self, request: DeleteRecordsRequest) -> Result<MutationResponse> {
        self.store.delete_records(request).await
    }
}

/// Counts every call and can be switched into a failing mode.
struct RecordingBackend {
    store: InMemoryRecordsBackend,
    calls: Mutex<Vec<&'static str>>,
    transport_down: AtomicBool,
}

impl RecordingBackend {
    fn seeded() -> Self {
        Self {
            store: InMemoryRecordsBackend::with_products("products", sample_products()),
            calls: Mutex::new(Vec::new()),
            transport_down: AtomicBool::new(false),
        }
    }

    async fn record(&self, call: &'static str) -> Result<()> {
        self.calls.lock().await.push(call);
        if self.transport_down.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordsBackend for RecordingBackend {
    async fn list_records(&self, request: ListRecordsRequest) -> Result<ListRecordsResponse> {
        self.record("list").await?;
        self.store.list_records(request).await
    }

    async fn create_records(&self, request: CreateRecordsRequest) -> Result<MutationResponse> {
        self.record("create").await?;
        self.store.create_records(request).await
    }

    async fn update_records(&self, request: UpdateRecordsRequest) -> Result<MutationResponse> {
        self.record("update").await?;
        self.store.update_records(request).await
    }

    async fn delete_records(&self, request: DeleteRecordsRequest) -> Result<MutationResponse> {
        self.record("delete").await?;
        self.store.delete_records(request).await
    }
}

fn recording_client() -> (Arc<CatalogClient>, Arc<RecordingBackend>) {
    let backend = Arc::new(RecordingBackend::seeded());
    let client = CatalogClient::new(backend.clone(), "products");
    (client, backend)
}

fn lamp_form(name: &str, price: &str, stock: &str) -> ProductForm {
    ProductForm {
        name: name.to_string(),
        category: Category::Furniture,
        price: price.to_string(),
        stock: stock.to_string(),
        description: "Warm LED lamp".to_string(),
        image_url: String::new(),
    }
}

async fn next_mutation_event(events: &mut broadcast::Receiver<CatalogEvent>) -> CatalogEvent {
    loop {
        match events.recv().await.expect("event") {
            CatalogEvent::PageLoaded(_) | CatalogEvent::FetchFailed { .. } => continue,
            event => return event,
        }
    }
}

#[tokio::test]
async fn initial_fetch_loads_first_page() {
    let (client, _backend) = recording_client();
    let mut events = client.subscribe_events();

    assert_eq!(client.snapshot().await.total_pages, 1);
    assert_eq!(client.fetch_products().await, FetchOutcome::Applied);

    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.products.len(), 4);
    assert_eq!(snapshot.total_pages, 3);
    assert!(!snapshot.loading);
    assert_eq!(snapshot.pager().label(), "Page 1 of 3");
    assert!(snapshot
        .products
        .windows(2)
        .all(|pair| pair[0].price <= pair[1].price));

    match events.recv().await.expect("event") {
        CatalogEvent::PageLoaded(loaded) => assert_eq!(loaded, snapshot),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn query_changes_reset_page_and_refetch() {
    let (client, backend) = recording_client();
    client.fetch_products().await;

    assert_eq!(client.go_to_page(2).await, FetchOutcome::Applied);
    assert_eq!(client.snapshot().await.query.page, 2);
    client
        .set_category(CategoryFilter::Only(Category::Audio))
        .await;
    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.query.page, 1);
    assert!(snapshot
        .products
        .iter()
        .all(|product| product.category == Category::Audio));

    client.set_category(CategoryFilter::All).await;
    assert_eq!(client.go_to_page(2).await, FetchOutcome::Applied);
    assert_eq!(client.snapshot().await.query.page, 2);
    client.set_sort(SortOrder::Highest).await;
    assert_eq!(client.snapshot().await.query.page, 1);

    assert_eq!(client.go_to_page(2).await, FetchOutcome::Applied);
    assert_eq!(client.snapshot().await.query.page, 2);
    client.commit_search("tripod").await;
    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.query.page, 1);
    assert!(snapshot.products.is_empty());
    assert_eq!(snapshot.pager().label(), "Page 1 of -");

    assert_eq!(
        client.commit_search("tripod").await,
        FetchOutcome::Unchanged
    );
    assert_eq!(backend.calls.lock().await.len(), 8);
}

#[tokio::test]
async fn query_page_past_the_end_lands_on_last_page() {
    let (client, backend) = recording_client();
    let mut query = QueryState::default();
    query.set_page(9);

    assert_eq!(client.set_query(query).await, FetchOutcome::Applied);
    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.query.page, 3);
    assert_eq!(snapshot.products.len(), 2);
    assert_eq!(snapshot.pager().label(), "Page 3 of 3");
    assert!(!snapshot.loading);
    assert_eq!(*backend.calls.lock().await, vec!["list", "list"]);
}

#[tokio::test]
async fn emptying_the_last_page_moves_back_one_page() {
    let (client, _backend) = recording_client();
    client.fetch_products().await;
    client.go_to_page(3).await;

    let last_page: Vec<ProductId> = client
        .snapshot()
        .await
        .products
        .iter()
        .map(|product| product.product_id.clone())
        .collect();
    assert_eq!(last_page.len(), 2);
    for product_id in &last_page {
        client.delete_product(product_id).await.expect("delete");
    }

    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.query.page, 2);
    assert_eq!(snapshot.products.len(), 4);
    assert_eq!(snapshot.pager().label(), "Page 2 of 2");
    assert!(!snapshot.pager().can_go_next());
}

#[tokio::test]
async fn pager_moves_stay_in_range() {
    let (client, _backend) = recording_client();
    client.fetch_products().await;

    assert_eq!(client.previous_page().await, FetchOutcome::Unchanged);
    client.go_to_page(99).await;
    assert_eq!(client.snapshot().await.query.page, 3);
    assert_eq!(client.next_page().await, FetchOutcome::Unchanged);

    assert_eq!(client.previous_page().await, FetchOutcome::Applied);
    assert_eq!(client.snapshot().await.query.page, 2);
}

#[tokio::test]
async fn stale_page_response_does_not_overwrite_newer_one() {
    let store = Arc::new(InMemoryRecordsBackend::with_products(
        "products",
        sample_products(),
    ));
    let (backend, mut pending) = GatedBackend::new(store.clone());
    let client = CatalogClient::new(Arc::new(backend), "products");

    let first = tokio::spawn({
        let client = client.clone();
        async move { client.fetch_products().await }
    });
    let (first_request, first_reply) = pending.recv().await.expect("first list");
    assert!(client.snapshot().await.loading);

    let second = tokio::spawn({
        let client = client.clone();
        async move {
            client
                .set_category(CategoryFilter::Only(Category::Wearables))
                .await
        }
    });
    let (second_request, second_reply) = pending.recv().await.expect("second list");

    second_reply
        .send(store.list_records(second_request).await)
        .expect("reply");
    assert_eq!(second.await.expect("join"), FetchOutcome::Applied);

    first_reply
        .send(store.list_records(first_request).await)
        .expect("reply");
    assert_eq!(first.await.expect("join"), FetchOutcome::Superseded);

    let snapshot = client.snapshot().await;
    assert!(!snapshot.loading);
    assert_eq!(snapshot.products.len(), 2);
    assert!(snapshot
        .products
        .iter()
        .all(|product| product.category == Category::Wearables));
}

#[tokio::test]
async fn fetch_failure_keeps_previous_list() {
    let (client, backend) = recording_client();
    let mut events = client.subscribe_events();
    client.fetch_products().await;
    let loaded = client.snapshot().await;

    backend.transport_down.store(true, Ordering::SeqCst);
    assert_eq!(client.refresh().await, FetchOutcome::Failed);

    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.products, loaded.products);
    assert!(!snapshot.loading);
    assert!(snapshot
        .last_error
        .as_deref()
        .is_some_and(|message| message.contains("connection refused")));

    let _ = events.recv().await.expect("page loaded");
    match events.recv().await.expect("event") {
        CatalogEvent::FetchFailed { message } => assert!(message.contains("fetch products")),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn invalid_create_never_reaches_backend() {
    let (client, backend) = recording_client();
    let mut events = client.subscribe_events();

    for form in [
        lamp_form("La", "20", "5"),
        lamp_form("Lamp", "0", "5"),
        lamp_form("Lamp", "20", "-1"),
        lamp_form("Lamp", "twenty", "5"),
    ] {
        let err = client.create_product(&form).await.expect_err("invalid");
        assert!(err.is_validation());
        match next_mutation_event(&mut events).await {
            CatalogEvent::MutationFailed { operation, .. } => {
                assert_eq!(operation, CatalogOperation::Create)
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
    assert!(backend.calls.lock().await.is_empty());
}

#[tokio::test]
async fn create_shows_product_only_after_refetch() {
    let store = Arc::new(InMemoryRecordsBackend::new());
    let (backend, mut pending) = GatedBackend::new(store.clone());
    let client = CatalogClient::new(Arc::new(backend), "products");

    let create = tokio::spawn({
        let client = client.clone();
        async move { client.create_product(&lamp_form("Desk Lamp", "20", "5")).await }
    });

    let (request, reply) = pending.recv().await.expect("refetch after create");
    assert_eq!(store.records("products").await.len(), 1);
    assert!(client.snapshot().await.products.is_empty());

    reply
        .send(store.list_records(request).await)
        .expect("reply");
    let product_id = create.await.expect("join").expect("created");
    assert!(product_id.as_str().starts_with('P'));

    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.products.len(), 1);
    assert_eq!(snapshot.products[0].product_id, product_id);
    assert_eq!(
        snapshot.products[0].image_url.as_deref(),
        Some(shared::domain::PLACEHOLDER_IMAGE_URL)
    );
}

#[tokio::test]
async fn update_reports_new_name_and_refetches() {
    let (client, backend) = recording_client();
    let mut events = client.subscribe_events();

    client
        .update_product(
            &ProductId::from("P1006"),
            &lamp_form("Bedside Lamp", "24.5", "7"),
        )
        .await
        .expect("update");

    match next_mutation_event(&mut events).await {
        CatalogEvent::MutationSucceeded { operation, message } => {
            assert_eq!(operation, CatalogOperation::Update);
            assert_eq!(message, "Successfully updated product: Bedside Lamp");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(*backend.calls.lock().await, vec!["update", "list"]);

    let updated = client
        .fetch_product(&ProductId::from("P1006"))
        .await
        .expect("lookup")
        .expect("present");
    assert_eq!(updated.name, "Bedside Lamp");
    assert_eq!(updated.price, 24.5);
}

#[tokio::test]
async fn delete_names_the_removed_product() {
    let (client, _backend) = recording_client();
    client.set_category(CategoryFilter::Only(Category::Furniture)).await;
    let mut events = client.subscribe_events();

    client
        .delete_product(&ProductId::from("P1006"))
        .await
        .expect("delete");

    match next_mutation_event(&mut events).await {
        CatalogEvent::MutationSucceeded { message, .. } => {
            assert_eq!(message, "Deleted product: Reading Lamp")
        }
        other => panic!("unexpected event: {other:?}"),
    }
    let snapshot = client.snapshot().await;
    assert_eq!(snapshot.products.len(), 1);
    assert_eq!(
        client
            .fetch_product(&ProductId::from("P1006"))
            .await
            .expect("lookup"),
        None
    );
}

#[tokio::test]
async fn rejected_update_keeps_modal_open() {
    let (client, backend) = recording_client();
    let mut events = client.subscribe_events();

    let mut modal = ProductModal::default();
    let missing = Product {
        product_id: ProductId::from("P404"),
        ..sample_products().remove(0)
    };
    modal.open_edit(&missing);

    let submission = modal.begin_submit().expect("valid form");
    let ProductSubmission::Update { product_id, form } = submission else {
        panic!("edit modal should submit an update");
    };
    let outcome = client.update_product(&product_id, &form).await;
    let err = outcome.as_ref().expect_err("nothing to update");
    assert!(matches!(err, CatalogError::Rejected { .. }));
    modal.finish(outcome.map_err(|err| err.to_string()));

    assert!(modal.is_open());
    assert!(modal
        .error()
        .is_some_and(|message| message.contains("no records matched")));
    match next_mutation_event(&mut events).await {
        CatalogEvent::MutationFailed { operation, .. } => {
            assert_eq!(operation, CatalogOperation::Update)
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(*backend.calls.lock().await, vec!["update"]);
}

#[tokio::test]
async fn transport_failure_on_delete_is_reported() {
    let (client, backend) = recording_client();
    backend.transport_down.store(true, Ordering::SeqCst);

    let err = client
        .delete_product(&ProductId::from("P1001"))
        .await
        .expect_err("backend down");
    assert!(matches!(
        err,
        CatalogError::Transport {
            operation: CatalogOperation::Delete,
            ..
        }
    ));
    assert_eq!(*backend.calls.lock().await, vec!["delete"]);
}
