use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/300";
pub const LOW_STOCK_THRESHOLD: u32 = 10;

macro_rules! string_id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id_newtype!(ProductId);

impl ProductId {
    /// Client-assigned id for a new product, `P<unix millis>`.
    pub fn from_timestamp_millis(millis: i64) -> Self {
        Self(format!("P{millis}"))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownToken {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Electronics,
    Furniture,
    Wearables,
    Audio,
    Accessories,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Electronics,
        Category::Furniture,
        Category::Wearables,
        Category::Audio,
        Category::Accessories,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Electronics => "Electronics",
            Category::Furniture => "Furniture",
            Category::Wearables => "Wearables",
            Category::Audio => "Audio",
            Category::Accessories => "Accessories",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownToken {
                kind: "category",
                value: s.to_string(),
            })
    }
}

/// Category selector value: `all` or a single category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn category(self) -> Option<Category> {
        match self {
            CategoryFilter::All => None,
            CategoryFilter::Only(category) => Some(category),
        }
    }

    pub fn heading(self) -> String {
        match self {
            CategoryFilter::All => "Showing All Products".to_string(),
            CategoryFilter::Only(category) => format!("Showing products in {category}"),
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("all"),
            CategoryFilter::Only(category) => category.fmt(f),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(CategoryFilter::All);
        }
        s.parse().map(CategoryFilter::Only)
    }
}

/// Price sort selector; the token names match the UI selector values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Lowest,
    Highest,
}

impl SortOrder {
    pub fn direction(self) -> SortDirection {
        match self {
            SortOrder::Lowest => SortDirection::Asc,
            SortOrder::Highest => SortDirection::Desc,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            SortOrder::Lowest => "lowest",
            SortOrder::Highest => "highest",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortOrder::Lowest => "Lowest price",
            SortOrder::Highest => "Highest price",
        }
    }
}

impl FromStr for SortOrder {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lowest" => Ok(SortOrder::Lowest),
            "highest" => Ok(SortOrder::Highest),
            _ => Err(UnknownToken {
                kind: "sort order",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    pub name: String,
    pub category: Category,
    pub price: f64,
    pub stock: u32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        self.stock <= LOW_STOCK_THRESHOLD
    }

    pub fn stock_label(&self) -> String {
        if self.is_low_stock() {
            format!("Only {} left", self.stock)
        } else {
            "In stock".to_string()
        }
    }

    pub fn price_label(&self) -> String {
        format_price(self.price)
    }

    pub fn image_url_or_placeholder(&self) -> &str {
        self.image_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(PLACEHOLDER_IMAGE_URL)
    }

    /// Card blurb: long descriptions are cut to 32 chars plus an ellipsis.
    pub fn short_description(&self) -> String {
        match self.description.as_deref().map(str::trim) {
            None | Some("") => "No description".to_string(),
            Some(text) if text.chars().count() > 30 => {
                let head: String = text.chars().take(32).collect();
                format!("{head}...")
            }
            Some(text) => text.to_string(),
        }
    }
}

/// `20.0` renders as `$20`, `19.5` as `$19.5`.
pub fn format_price(price: f64) -> String {
    format!("${price}")
}
