mod backend_bridge;
mod controller;
mod ui;

use clap::Parser;
use client_core::load_settings;
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::ui::CatalogApp;

#[derive(Parser, Debug)]
#[command(name = "catalog_gui", about = "Product catalog desktop front end")]
struct Args {
    #[arg(long)]
    backend_url: Option<String>,
    #[arg(long)]
    api_key: Option<String>,
    /// Use a seeded local store instead of the records service.
    #[arg(long)]
    in_memory: bool,
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let settings = load_settings().with_overrides(args.backend_url, args.api_key);
    let search_debounce = settings.search_debounce();

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(1024);
    backend_bridge::runtime::launch(settings, args.in_memory, cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Product Catalog")
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([720.0, 520.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Product Catalog",
        options,
        Box::new(move |_cc| Ok(Box::new(CatalogApp::new(cmd_tx, ui_rx, search_debounce)))),
    )
}
