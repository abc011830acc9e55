//! Create/edit/delete modal state and product form validation.
//!
//! Forms hold raw text exactly as typed; `ProductForm::validate` is the only
//! way to turn one into a `ProductDraft`, so nothing reaches the mutation
//! gateway without passing the name/price/stock rules first.

use shared::{
    domain::{format_price, Category, Product, ProductId, PLACEHOLDER_IMAGE_URL},
    protocol::ProductPatch,
};
use thiserror::Error;
use url::Url;

pub const MIN_NAME_LEN: usize = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("product name must be at least 3 characters")]
    NameTooShort,
    #[error("price must be a number")]
    PriceNotNumber,
    #[error("price must be greater than 0")]
    PriceNotPositive,
    #[error("stock must be a whole number")]
    StockNotInteger,
    #[error("stock cannot be negative")]
    StockNegative,
    #[error("image URL is not valid: {0}")]
    InvalidImageUrl(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductForm {
    pub name: String,
    pub category: Category,
    pub price: String,
    pub stock: String,
    pub description: String,
    pub image_url: String,
}

impl Default for ProductForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            category: Category::Electronics,
            price: String::new(),
            stock: String::new(),
            description: String::new(),
            image_url: String::new(),
        }
    }
}

impl ProductForm {
    /// Edit form pre-filled from an existing product.
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            category: product.category,
            price: product.price.to_string(),
            stock: product.stock.to_string(),
            description: product.description.clone().unwrap_or_default(),
            image_url: product.image_url.clone().unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<ProductDraft, FormError> {
        let name = self.name.trim();
        if name.chars().count() < MIN_NAME_LEN {
            return Err(FormError::NameTooShort);
        }

        let price = self
            .price
            .trim()
            .parse::<f64>()
            .map_err(|_| FormError::PriceNotNumber)?;
        if !price.is_finite() {
            return Err(FormError::PriceNotNumber);
        }
        if price <= 0.0 {
            return Err(FormError::PriceNotPositive);
        }

        let stock = self
            .stock
            .trim()
            .parse::<i64>()
            .map_err(|_| FormError::StockNotInteger)?;
        if stock < 0 {
            return Err(FormError::StockNegative);
        }
        let stock = u32::try_from(stock).map_err(|_| FormError::StockNotInteger)?;

        let image_url = match self.image_url.trim() {
            "" => None,
            raw => {
                Url::parse(raw).map_err(|err| FormError::InvalidImageUrl(err.to_string()))?;
                Some(raw.to_string())
            }
        };

        let description = match self.description.trim() {
            "" => None,
            text => Some(text.to_string()),
        };

        Ok(ProductDraft {
            name: name.to_string(),
            category: self.category,
            price,
            stock,
            description,
            image_url,
        })
    }
}

/// A validated form, ready to become a new record or an update patch.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub category: Category,
    pub price: f64,
    pub stock: u32,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl ProductDraft {
    pub fn into_product(self, product_id: ProductId) -> Product {
        Product {
            product_id,
            name: self.name,
            category: self.category,
            price: self.price,
            stock: self.stock,
            description: Some(self.description.unwrap_or_default()),
            image_url: Some(
                self.image_url
                    .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string()),
            ),
        }
    }

    /// Edits always send description and image so clearing them sticks.
    pub fn into_patch(self) -> ProductPatch {
        ProductPatch {
            name: self.name,
            category: self.category,
            price: self.price,
            stock: self.stock,
            description: Some(self.description.unwrap_or_default()),
            image_url: Some(self.image_url.unwrap_or_default()),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModalError {
    #[error("modal is not open")]
    NotOpen,
    #[error("a submission is already in progress")]
    AlreadySubmitting,
    #[error(transparent)]
    Invalid(#[from] FormError),
}

/// `Closed -> Open -> Submitting -> (Closed | Open)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalPhase {
    #[default]
    Closed,
    Open,
    Submitting,
}

impl ModalPhase {
    fn begin_submit(&mut self) -> Result<(), ModalError> {
        match self {
            ModalPhase::Open => {
                *self = ModalPhase::Submitting;
                Ok(())
            }
            ModalPhase::Submitting => Err(ModalError::AlreadySubmitting),
            ModalPhase::Closed => Err(ModalError::NotOpen),
        }
    }

    fn finish(&mut self, succeeded: bool) {
        if *self == ModalPhase::Submitting {
            *self = if succeeded {
                ModalPhase::Closed
            } else {
                ModalPhase::Open
            };
        }
    }

    fn cancel(&mut self) -> bool {
        match self {
            ModalPhase::Open => {
                *self = ModalPhase::Closed;
                true
            }
            ModalPhase::Closed => true,
            ModalPhase::Submitting => false,
        }
    }
}

/// What a product modal hands to the mutation gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductSubmission {
    Create(ProductForm),
    Update {
        product_id: ProductId,
        form: ProductForm,
    },
}

/// Create and edit share one modal; `target` is set when editing.
#[derive(Debug, Clone, Default)]
pub struct ProductModal {
    phase: ModalPhase,
    target: Option<ProductId>,
    pub form: ProductForm,
    error: Option<String>,
}

impl ProductModal {
    pub fn open_create(&mut self) {
        self.phase = ModalPhase::Open;
        self.target = None;
        self.form = ProductForm::default();
        self.error = None;
    }

    pub fn open_edit(&mut self, product: &Product) {
        self.phase = ModalPhase::Open;
        self.target = Some(product.product_id.clone());
        self.form = ProductForm::from_product(product);
        self.error = None;
    }

    pub fn phase(&self) -> ModalPhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase != ModalPhase::Closed
    }

    pub fn is_editing(&self) -> bool {
        self.target.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Validates locally, then moves to `Submitting`. A validation failure
    /// keeps the modal open with the reason recorded.
    pub fn begin_submit(&mut self) -> Result<ProductSubmission, ModalError> {
        if self.phase != ModalPhase::Open {
            return Err(match self.phase {
                ModalPhase::Submitting => ModalError::AlreadySubmitting,
                _ => ModalError::NotOpen,
            });
        }
        if let Err(err) = self.form.validate() {
            self.error = Some(err.to_string());
            return Err(err.into());
        }
        self.phase.begin_submit()?;
        self.error = None;

        Ok(match &self.target {
            None => ProductSubmission::Create(self.form.clone()),
            Some(product_id) => ProductSubmission::Update {
                product_id: product_id.clone(),
                form: self.form.clone(),
            },
        })
    }

    pub fn finish(&mut self, outcome: Result<(), String>) {
        let succeeded = outcome.is_ok();
        self.phase.finish(succeeded);
        match outcome {
            Ok(()) => {
                self.target = None;
                self.form = ProductForm::default();
                self.error = None;
            }
            Err(message) => self.error = Some(message),
        }
    }

    pub fn cancel(&mut self) -> bool {
        let closed = self.phase.cancel();
        if closed {
            self.target = None;
            self.error = None;
        }
        closed
    }
}

/// Fields shown before a delete is committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteDetails {
    pub name: String,
    pub price: String,
    pub category: String,
    pub stock: String,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteConfirmModal {
    phase: ModalPhase,
    target: Option<Product>,
    error: Option<String>,
}

impl DeleteConfirmModal {
    pub fn open(&mut self, product: Product) {
        self.phase = ModalPhase::Open;
        self.target = Some(product);
        self.error = None;
    }

    pub fn phase(&self) -> ModalPhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase != ModalPhase::Closed
    }

    pub fn target(&self) -> Option<&Product> {
        self.target.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn details(&self) -> Option<DeleteDetails> {
        self.target.as_ref().map(|product| DeleteDetails {
            name: product.name.clone(),
            price: format_price(product.price),
            category: product.category.to_string(),
            stock: product.stock.to_string(),
        })
    }

    /// Explicit confirm; the returned id is what gets deleted.
    pub fn confirm(&mut self) -> Result<ProductId, ModalError> {
        let product_id = self
            .target
            .as_ref()
            .map(|product| product.product_id.clone())
            .ok_or(ModalError::NotOpen)?;
        self.phase.begin_submit()?;
        self.error = None;
        Ok(product_id)
    }

    pub fn finish(&mut self, outcome: Result<(), String>) {
        self.phase.finish(outcome.is_ok());
        match outcome {
            Ok(()) => {
                self.target = None;
                self.error = None;
            }
            Err(message) => self.error = Some(message),
        }
    }

    pub fn cancel(&mut self) -> bool {
        let closed = self.phase.cancel();
        if closed {
            self.target = None;
            self.error = None;
        }
        closed
    }
}
