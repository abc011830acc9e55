//! Process-local records service with the same filter/search/sort/page
//! semantics the catalog expects from the remote one. Backs `--in-memory`
//! runs and the catalog tests.

use std::{cmp::Ordering, collections::HashMap};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use shared::{
    domain::{Category, Product, ProductId, SortDirection},
    error::{ApiError, ApiException, ErrorCode},
    protocol::{
        CreateRecordsRequest, DeleteRecordsRequest, ListRecordsRequest, ListRecordsResponse,
        MutationResponse, RecordFilter, SearchSpec, UpdateRecordsRequest,
    },
};
use tokio::sync::RwLock;
use tracing::debug;

use crate::RecordsBackend;

#[derive(Default)]
pub struct InMemoryRecordsBackend {
    tables: RwLock<HashMap<String, Vec<Product>>>,
}

impl InMemoryRecordsBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(table: impl Into<String>, products: Vec<Product>) -> Self {
        let mut tables = HashMap::new();
        tables.insert(table.into(), products);
        Self {
            tables: RwLock::new(tables),
        }
    }

    pub async fn records(&self, table: &str) -> Vec<Product> {
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

fn as_record(product: &Product) -> Value {
    serde_json::to_value(product).unwrap_or(Value::Null)
}

fn matches_filter(record: &Value, filter: &RecordFilter) -> bool {
    filter
        .iter()
        .all(|(field, expected)| record.get(field) == Some(expected))
}

fn matches_search(record: &Value, search: Option<&SearchSpec>) -> bool {
    let Some(search) = search else {
        return true;
    };
    let needle = search.query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    search.columns.iter().any(|column| {
        record
            .get(column)
            .and_then(Value::as_str)
            .is_some_and(|text| text.to_lowercase().contains(&needle))
    })
}

fn compare_by(a: &Value, b: &Value, column: &str) -> Ordering {
    match (a.get(column), b.get(column)) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn check_rules(request: &UpdateRecordsRequest) -> Result<(), ApiException> {
    let patch = serde_json::to_value(&request.data)
        .map_err(|err| ApiException::new(ErrorCode::Internal, err.to_string()))?;
    for (field, rule) in &request.options.validation_rule {
        rule.check(field, patch.get(field))?;
    }
    Ok(())
}

#[async_trait]
impl RecordsBackend for InMemoryRecordsBackend {
    async fn list_records(&self, request: ListRecordsRequest) -> Result<ListRecordsResponse> {
        if request.list == 0 || request.page == 0 {
            return Ok(ListRecordsResponse::failed(ApiError::new(
                ErrorCode::Validation,
                "page and list must be at least 1",
            )));
        }

        let tables = self.tables.read().await;
        let Some(rows) = tables.get(&request.table) else {
            return Ok(ListRecordsResponse::failed(ApiError::new(
                ErrorCode::NotFound,
                format!("table '{}' not found", request.table),
            )));
        };

        let mut matched: Vec<(Value, &Product)> = rows
            .iter()
            .map(|product| (as_record(product), product))
            .filter(|(record, _)| {
                matches_filter(record, &request.filter)
                    && matches_search(record, request.search.as_ref())
            })
            .collect();

        matched.sort_by(|(a, pa), (b, pb)| {
            let ordering = compare_by(a, b, &request.order_by);
            let ordering = match request.order {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            ordering.then_with(|| pa.product_id.cmp(&pb.product_id))
        });

        let total = matched.len() as u64;
        let list = u64::from(request.list);
        let total_pages = total.div_ceil(list) as u32;
        let skip = (u64::from(request.page) - 1) * list;
        let data = matched
            .into_iter()
            .skip(skip as usize)
            .take(request.list as usize)
            .map(|(_, product)| product.clone())
            .collect::<Vec<_>>();

        debug!(
            table = %request.table,
            page = request.page,
            total_pages,
            returned = data.len(),
            "backend: in-memory list"
        );
        Ok(ListRecordsResponse::page(data, total_pages, total))
    }

    async fn create_records(&self, request: CreateRecordsRequest) -> Result<MutationResponse> {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(request.table).or_default();
        let keys = &request.options.conflict_keys;

        let mut affected = 0;
        for product in request.data {
            let record = as_record(&product);
            let existing = if keys.is_empty() {
                None
            } else {
                rows.iter().position(|row| {
                    let row = as_record(row);
                    keys.iter().all(|key| row.get(key) == record.get(key))
                })
            };

            match existing {
                Some(index) if request.options.upsert => rows[index] = product,
                Some(_) => {
                    return Ok(MutationResponse::failed(ApiError::new(
                        ErrorCode::Conflict,
                        format!("record {} already exists", product.product_id),
                    )))
                }
                None => rows.push(product),
            }
            affected += 1;
        }

        Ok(MutationResponse::ok(affected))
    }

    async fn update_records(&self, request: UpdateRecordsRequest) -> Result<MutationResponse> {
        if let Err(err) = check_rules(&request) {
            return Ok(MutationResponse::failed(err.into()));
        }

        let mut tables = self.tables.write().await;
        let rows = tables.entry(request.table.clone()).or_default();
        let mut affected = 0;
        for row in rows.iter_mut() {
            if matches_filter(&as_record(row), &request.filter) {
                request.data.apply_to(row);
                affected += 1;
            }
        }

        if affected == 0 {
            return Ok(MutationResponse::failed(ApiError::new(
                ErrorCode::NotFound,
                "no records matched the update filter",
            )));
        }
        Ok(MutationResponse::ok(affected))
    }

    async fn delete_records(&self, request: DeleteRecordsRequest) -> Result<MutationResponse> {
        if request.filter.is_empty() {
            return Ok(MutationResponse::failed(ApiError::new(
                ErrorCode::Validation,
                "delete requires a where filter",
            )));
        }

        let mut tables = self.tables.write().await;
        let rows = tables.entry(request.table).or_default();
        let before = rows.len();
        rows.retain(|row| !matches_filter(&as_record(row), &request.filter));
        let affected = (before - rows.len()) as u64;

        if affected == 0 {
            return Ok(MutationResponse::failed(ApiError::new(
                ErrorCode::NotFound,
                "no records matched the delete filter",
            )));
        }
        Ok(MutationResponse::ok(affected))
    }
}

/// Demo catalog used by `--in-memory` runs.
pub fn sample_products() -> Vec<Product> {
    let rows: [(&str, &str, Category, f64, u32, &str); 10] = [
        (
            "P1001",
            "Wireless Earbuds",
            Category::Audio,
            59.99,
            34,
            "Bluetooth 5.3 earbuds with charging case",
        ),
        (
            "P1002",
            "Studio Monitor Speakers",
            Category::Audio,
            249.0,
            6,
            "Pair of 5-inch active monitors",
        ),
        (
            "P1003",
            "4K Action Camera",
            Category::Electronics,
            189.5,
            15,
            "Waterproof camera with stabilization",
        ),
        (
            "P1004",
            "Mechanical Keyboard",
            Category::Electronics,
            89.0,
            9,
            "Hot-swappable switches",
        ),
        (
            "P1005",
            "Standing Desk",
            Category::Furniture,
            420.0,
            4,
            "Electric sit/stand desk with memory presets",
        ),
        (
            "P1006",
            "Reading Lamp",
            Category::Furniture,
            20.0,
            5,
            "Warm LED lamp",
        ),
        (
            "P1007",
            "Fitness Tracker",
            Category::Wearables,
            79.0,
            22,
            "Heart rate and sleep tracking band",
        ),
        (
            "P1008",
            "Smart Watch",
            Category::Wearables,
            299.0,
            11,
            "AMOLED watch with GPS",
        ),
        (
            "P1009",
            "USB-C Hub",
            Category::Accessories,
            39.0,
            50,
            "7-in-1 hub with HDMI and card reader",
        ),
        (
            "P1010",
            "Laptop Sleeve",
            Category::Accessories,
            25.0,
            3,
            "",
        ),
    ];

    rows.into_iter()
        .map(|(id, name, category, price, stock, description)| Product {
            product_id: ProductId::from(id),
            name: name.to_string(),
            category,
            price,
            stock,
            description: Some(description.to_string()),
            image_url: None,
        })
        .collect()
}
