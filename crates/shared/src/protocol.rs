//! Request/response shapes of the remote records API.
//!
//! Field names follow the backend's JSON convention (`where`, `orderBy`,
//! `list`, `conflictKeys`, `validationRule`, `meta.totalPages`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{Category, Product, ProductId, SortDirection},
    error::{ApiError, ApiException},
};

pub const PRODUCT_FIELDS: [&str; 7] = [
    "product_id",
    "name",
    "category",
    "price",
    "stock",
    "description",
    "image_url",
];
pub const SEARCH_COLUMNS: [&str; 3] = ["name", "description", "category"];
pub const PRICE_COLUMN: &str = "price";
pub const PRODUCT_ID_KEY: &str = "product_id";

/// Equality filter: every entry must match the record's field exactly.
pub type RecordFilter = BTreeMap<String, Value>;

pub fn product_id_filter(product_id: &ProductId) -> RecordFilter {
    let mut filter = RecordFilter::new();
    filter.insert(
        PRODUCT_ID_KEY.to_string(),
        Value::String(product_id.0.clone()),
    );
    filter
}

pub fn category_filter(category: Category) -> RecordFilter {
    let mut filter = RecordFilter::new();
    filter.insert(
        "category".to_string(),
        Value::String(category.as_str().to_string()),
    );
    filter
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSpec {
    pub columns: Vec<String>,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRecordsRequest {
    pub table: String,
    #[serde(rename = "where", default)]
    pub filter: RecordFilter,
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchSpec>,
    pub order_by: String,
    pub order: SortDirection,
    pub page: u32,
    pub list: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total_pages: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_records: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListRecordsResponse {
    pub status: bool,
    #[serde(default)]
    pub data: Vec<Product>,
    #[serde(default)]
    pub meta: PageMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl ListRecordsResponse {
    pub fn page(data: Vec<Product>, total_pages: u32, total_records: u64) -> Self {
        Self {
            status: true,
            data,
            meta: PageMeta {
                total_pages,
                total_records: Some(total_records),
            },
            message: None,
            error: None,
        }
    }

    pub fn failed(error: ApiError) -> Self {
        Self {
            status: false,
            data: Vec::new(),
            meta: PageMeta::default(),
            message: Some(error.message.clone()),
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOptions {
    pub upsert: bool,
    #[serde(default)]
    pub conflict_keys: Vec<String>,
}

impl CreateOptions {
    pub fn upsert_on_product_id() -> Self {
        Self {
            upsert: true,
            conflict_keys: vec![PRODUCT_ID_KEY.to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRecordsRequest {
    pub table: String,
    pub data: Vec<Product>,
    pub options: CreateOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: String,
    pub category: Category,
    pub price: f64,
    pub stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ProductPatch {
    pub fn apply_to(&self, product: &mut Product) {
        product.name = self.name.clone();
        product.category = self.category;
        product.price = self.price;
        product.stock = self.stock;
        if self.description.is_some() {
            product.description = self.description.clone();
        }
        if self.image_url.is_some() {
            product.image_url = self.image_url.clone();
        }
    }
}

/// Server-side rule for one field of an update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greater_than: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greater_or_equal: Option<f64>,
}

impl ValidationRule {
    pub fn check(&self, field: &str, value: Option<&Value>) -> Result<(), ApiException> {
        let value = match value {
            None | Some(Value::Null) => {
                if self.required {
                    return Err(ApiException::field_rule(field, "is required"));
                }
                return Ok(());
            }
            Some(value) => value,
        };

        if let Some(min_length) = self.min_length {
            let len = value.as_str().map(|s| s.chars().count()).unwrap_or(0);
            if len < min_length {
                return Err(ApiException::field_rule(
                    field,
                    format!("must be at least {min_length} characters"),
                ));
            }
        }

        if let Some(bound) = self.greater_than {
            if !value.as_f64().is_some_and(|n| n > bound) {
                return Err(ApiException::field_rule(
                    field,
                    format!("must be greater than {bound}"),
                ));
            }
        }

        if let Some(bound) = self.greater_or_equal {
            if !value.as_f64().is_some_and(|n| n >= bound) {
                return Err(ApiException::field_rule(
                    field,
                    format!("must be greater than or equal to {bound}"),
                ));
            }
        }

        Ok(())
    }
}

pub type ValidationRules = BTreeMap<String, ValidationRule>;

/// Rules sent with every product update.
pub fn product_update_rules() -> ValidationRules {
    let mut rules = ValidationRules::new();
    rules.insert(
        "name".to_string(),
        ValidationRule {
            required: true,
            min_length: Some(3),
            ..ValidationRule::default()
        },
    );
    rules.insert(
        "price".to_string(),
        ValidationRule {
            required: true,
            greater_than: Some(0.0),
            ..ValidationRule::default()
        },
    );
    rules.insert(
        "stock".to_string(),
        ValidationRule {
            required: true,
            greater_or_equal: Some(0.0),
            ..ValidationRule::default()
        },
    );
    rules
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOptions {
    #[serde(default)]
    pub validation_rule: ValidationRules,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecordsRequest {
    pub table: String,
    pub data: ProductPatch,
    #[serde(rename = "where")]
    pub filter: RecordFilter,
    #[serde(default)]
    pub options: UpdateOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteRecordsRequest {
    pub table: String,
    #[serde(rename = "where")]
    pub filter: RecordFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationResponse {
    pub status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl MutationResponse {
    pub fn ok(affected: u64) -> Self {
        Self {
            status: true,
            affected: Some(affected),
            message: None,
            error: None,
        }
    }

    pub fn failed(error: ApiError) -> Self {
        Self {
            status: false,
            affected: None,
            message: Some(error.message.clone()),
            error: Some(error),
        }
    }

    /// Best available explanation for a non-success response.
    pub fn failure_reason(&self) -> Option<String> {
        self.error
            .as_ref()
            .map(|err| err.message.clone())
            .or_else(|| self.message.clone())
    }
}
