//! UI layer for the catalog GUI: toolbar, product list, pager and modals.

pub mod app;

pub use app::CatalogApp;
