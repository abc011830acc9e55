//! Backend commands queued from UI to backend worker.

use client_core::ProductForm;
use shared::domain::{CategoryFilter, ProductId, SortOrder};

pub enum BackendCommand {
    Refresh,
    SetCategory(CategoryFilter),
    SetSort(SortOrder),
    CommitSearch(String),
    GoToPage(u32),
    Create {
        form: ProductForm,
    },
    Update {
        product_id: ProductId,
        form: ProductForm,
    },
    Delete {
        product_id: ProductId,
    },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Refresh => "refresh",
            BackendCommand::SetCategory(_) => "set_category",
            BackendCommand::SetSort(_) => "set_sort",
            BackendCommand::CommitSearch(_) => "commit_search",
            BackendCommand::GoToPage(_) => "go_to_page",
            BackendCommand::Create { .. } => "create_product",
            BackendCommand::Update { .. } => "update_product",
            BackendCommand::Delete { .. } => "delete_product",
        }
    }

    /// Whether the command ends in a page fetch the UI should wait on.
    pub fn is_fetch(&self) -> bool {
        !matches!(
            self,
            BackendCommand::Create { .. }
                | BackendCommand::Update { .. }
                | BackendCommand::Delete { .. }
        )
    }
}
