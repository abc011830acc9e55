//! Catalog query state and its translation into a `list_records` request.

use shared::{
    domain::{CategoryFilter, ProductId, SortDirection, SortOrder},
    protocol::{
        category_filter, product_id_filter, ListRecordsRequest, RecordFilter, SearchSpec,
        PRICE_COLUMN, PRODUCT_FIELDS, SEARCH_COLUMNS,
    },
};

pub const PAGE_SIZE: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub category: CategoryFilter,
    pub sort: SortOrder,
    pub page: u32,
    pub page_size: u32,
    pub search: String,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            category: CategoryFilter::All,
            sort: SortOrder::Lowest,
            page: 1,
            page_size: PAGE_SIZE,
            search: String::new(),
        }
    }
}

impl QueryState {
    pub fn set_category(&mut self, category: CategoryFilter) {
        self.category = category;
        self.page = 1;
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        self.sort = sort;
        self.page = 1;
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
        self.page = 1;
    }

    /// Pages below 1 are pinned to 1; the upper bound is the pager's job.
    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn build(&self, table: &str) -> ListRecordsRequest {
        let filter = match self.category {
            CategoryFilter::All => RecordFilter::new(),
            CategoryFilter::Only(category) => category_filter(category),
        };

        ListRecordsRequest {
            table: table.to_string(),
            filter,
            fields: product_fields(),
            search: Some(SearchSpec {
                columns: SEARCH_COLUMNS.iter().map(|c| c.to_string()).collect(),
                query: self.search.clone(),
            }),
            order_by: PRICE_COLUMN.to_string(),
            order: self.sort.direction(),
            page: self.page,
            list: self.page_size,
        }
    }
}

/// Single-record lookup on `product_id`.
pub fn by_product_id(table: &str, product_id: &ProductId) -> ListRecordsRequest {
    ListRecordsRequest {
        table: table.to_string(),
        filter: product_id_filter(product_id),
        fields: product_fields(),
        search: None,
        order_by: PRICE_COLUMN.to_string(),
        order: SortDirection::Asc,
        page: 1,
        list: 1,
    }
}

fn product_fields() -> Vec<String> {
    PRODUCT_FIELDS.iter().map(|f| f.to_string()).collect()
}

/// Previous/next controls over `[1, total_pages]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    pub current_page: u32,
    pub total_pages: u32,
}

impl Pager {
    pub fn new(current_page: u32, total_pages: u32) -> Self {
        Self {
            current_page,
            total_pages,
        }
    }

    pub fn can_go_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn can_go_next(&self) -> bool {
        self.total_pages != 0 && self.current_page < self.total_pages
    }

    pub fn previous_page(&self) -> Option<u32> {
        self.can_go_previous()
            .then(|| self.current_page.saturating_sub(1).max(1))
    }

    pub fn next_page(&self) -> Option<u32> {
        self.can_go_next()
            .then(|| (self.current_page + 1).min(self.total_pages))
    }

    /// Clamps a requested page into the valid range.
    pub fn clamp(&self, page: u32) -> u32 {
        page.clamp(1, self.total_pages.max(1))
    }

    pub fn label(&self) -> String {
        if self.total_pages == 0 {
            format!("Page {} of -", self.current_page)
        } else {
            format!("Page {} of {}", self.current_page, self.total_pages)
        }
    }
}
