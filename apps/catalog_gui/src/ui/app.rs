use std::time::Duration;

use client_core::{
    CatalogOperation, CatalogSnapshot, DeleteConfirmModal, Debouncer, ModalError,
    ModalPhase, ProductModal, ProductSubmission, QueryState,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::domain::{Category, CategoryFilter, Product, SortOrder};
use tokio::time::Instant;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{
    events::{UiError, UiEvent},
    orchestration::dispatch_backend_command,
};

const LOW_STOCK_COLOR: egui::Color32 = egui::Color32::from_rgb(220, 80, 70);
const IN_STOCK_COLOR: egui::Color32 = egui::Color32::from_rgb(80, 170, 100);

pub struct CatalogApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    /// Query as the user last set it; the snapshot catches up once the
    /// matching page arrives.
    query: QueryState,
    snapshot: CatalogSnapshot,
    pending_fetches: u32,
    fetch_error: Option<String>,
    search_input: String,
    search: Debouncer<String>,
    product_modal: ProductModal,
    delete_modal: DeleteConfirmModal,
    alert: Option<UiError>,
    status: String,
}

impl CatalogApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        search_debounce: Duration,
    ) -> Self {
        let mut app = Self {
            cmd_tx,
            ui_rx,
            query: QueryState::default(),
            snapshot: CatalogSnapshot::default(),
            pending_fetches: 0,
            fetch_error: None,
            search_input: String::new(),
            search: Debouncer::new(String::new(), search_debounce),
            product_modal: ProductModal::default(),
            delete_modal: DeleteConfirmModal::default(),
            alert: None,
            status: String::new(),
        };
        app.send(BackendCommand::Refresh);
        app
    }

    fn send(&mut self, cmd: BackendCommand) {
        let is_fetch = cmd.is_fetch();
        if dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status) && is_fetch {
            self.pending_fetches += 1;
        }
    }

    fn is_loading(&self) -> bool {
        self.pending_fetches > 0
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::Error(err) => {
                    tracing::warn!(context = ?err.context(), "ui: {}", err.message());
                    self.status = err.title().to_string();
                    self.alert = Some(err);
                }
                UiEvent::Snapshot(snapshot) => {
                    self.fetch_error = None;
                    self.snapshot = snapshot;
                }
                UiEvent::FetchFailed(message) => {
                    self.fetch_error = Some(message);
                }
                UiEvent::FetchSettled(outcome) => {
                    tracing::debug!(?outcome, "ui: fetch settled");
                    self.pending_fetches = self.pending_fetches.saturating_sub(1);
                }
                UiEvent::MutationFinished { operation, result } => match operation {
                    CatalogOperation::Delete => self.delete_modal.finish(result),
                    _ => self.product_modal.finish(result),
                },
            }
        }
    }

    fn poll_search(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        if let Some(search) = self.search.poll(now) {
            self.query.set_search(search.clone());
            self.send(BackendCommand::CommitSearch(search));
        }
        if let Some(deadline) = self.search.deadline() {
            ctx.request_repaint_after(deadline.saturating_duration_since(now));
        }
    }

    fn show_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("catalog_toolbar").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal_wrapped(|ui| {
                ui.heading(self.query.category.heading());
                if self.is_loading() {
                    ui.spinner();
                }
            });
            ui.add_space(4.0);

            ui.horizontal_wrapped(|ui| {
                let mut category = self.query.category;
                egui::ComboBox::from_id_salt("category_filter")
                    .selected_text(match category {
                        CategoryFilter::All => "All",
                        CategoryFilter::Only(category) => category.as_str(),
                    })
                    .show_ui(ui, |ui| {
                        ui.selectable_value(&mut category, CategoryFilter::All, "All");
                        for option in Category::ALL {
                            ui.selectable_value(
                                &mut category,
                                CategoryFilter::Only(option),
                                option.as_str(),
                            );
                        }
                    });
                if category != self.query.category {
                    self.query.set_category(category);
                    self.send(BackendCommand::SetCategory(category));
                }

                let mut sort = self.query.sort;
                egui::ComboBox::from_id_salt("price_sort")
                    .selected_text(sort.label())
                    .show_ui(ui, |ui| {
                        for option in [SortOrder::Lowest, SortOrder::Highest] {
                            ui.selectable_value(&mut sort, option, option.label());
                        }
                    });
                if sort != self.query.sort {
                    self.query.set_sort(sort);
                    self.send(BackendCommand::SetSort(sort));
                }

                let search = ui.add(
                    egui::TextEdit::singleline(&mut self.search_input)
                        .hint_text("Search products")
                        .desired_width(240.0),
                );
                if search.changed() {
                    self.search.input(self.search_input.clone(), Instant::now());
                }

                let can_add = !self.product_modal.is_open() && !self.delete_modal.is_open();
                if ui
                    .add_enabled(can_add, egui::Button::new("Add product"))
                    .clicked()
                {
                    self.product_modal.open_create();
                }
            });

            if !self.status.is_empty() {
                ui.small(&self.status);
            }
            ui.add_space(4.0);
        });
    }

    fn show_pager(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("catalog_pager").show(ctx, |ui| {
            let pager = self.snapshot.pager();
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(pager.can_go_previous(), egui::Button::new("Previous"))
                    .clicked()
                {
                    if let Some(page) = pager.previous_page() {
                        self.query.set_page(page);
                        self.send(BackendCommand::GoToPage(page));
                    }
                }
                ui.label(pager.label());
                if ui
                    .add_enabled(pager.can_go_next(), egui::Button::new("Next"))
                    .clicked()
                {
                    if let Some(page) = pager.next_page() {
                        self.query.set_page(page);
                        self.send(BackendCommand::GoToPage(page));
                    }
                }
            });
        });
    }

    fn show_products(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(message) = self.fetch_error.clone() {
                ui.vertical_centered(|ui| {
                    ui.add_space(40.0);
                    ui.heading("Something went wrong");
                    ui.label(message);
                    if ui.button("Try again").clicked() {
                        self.send(BackendCommand::Refresh);
                    }
                });
                return;
            }

            if self.snapshot.products.is_empty() {
                ui.vertical_centered(|ui| {
                    ui.add_space(40.0);
                    if self.is_loading() {
                        ui.spinner();
                    } else {
                        ui.label("No products found");
                    }
                });
                return;
            }

            let mut edit: Option<Product> = None;
            let mut delete: Option<Product> = None;
            let actions_enabled = !self.product_modal.is_open() && !self.delete_modal.is_open();
            egui::ScrollArea::vertical().show(ui, |ui| {
                for product in &self.snapshot.products {
                    egui::Frame::group(ui.style()).show(ui, |ui| {
                        ui.set_width(ui.available_width());
                        ui.horizontal(|ui| {
                            ui.strong(&product.name);
                            ui.label(product.category.as_str());
                            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                ui.strong(product.price_label());
                            });
                        });
                        ui.label(product.short_description());
                        ui.horizontal(|ui| {
                            let color = if product.is_low_stock() {
                                LOW_STOCK_COLOR
                            } else {
                                IN_STOCK_COLOR
                            };
                            ui.colored_label(color, product.stock_label());
                            ui.hyperlink_to("Image", product.image_url_or_placeholder());
                            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                                if ui
                                    .add_enabled(actions_enabled, egui::Button::new("Delete"))
                                    .clicked()
                                {
                                    delete = Some(product.clone());
                                }
                                if ui
                                    .add_enabled(actions_enabled, egui::Button::new("Edit"))
                                    .clicked()
                                {
                                    edit = Some(product.clone());
                                }
                            });
                        });
                    });
                    ui.add_space(4.0);
                }
            });

            if let Some(product) = edit {
                self.product_modal.open_edit(&product);
            }
            if let Some(product) = delete {
                self.delete_modal.open(product);
            }
        });
    }

    fn show_product_modal(&mut self, ctx: &egui::Context) {
        if !self.product_modal.is_open() {
            return;
        }
        let submitting = self.product_modal.phase() == ModalPhase::Submitting;
        let (title, submit_label) = if self.product_modal.is_editing() {
            ("Edit product", "Save changes")
        } else {
            ("Add product", "Add product")
        };

        let mut submit = false;
        let mut cancel = false;
        egui::Window::new(title)
            .id(egui::Id::new("product_modal"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.add_enabled_ui(!submitting, |ui| {
                    let form = &mut self.product_modal.form;
                    egui::Grid::new("product_form")
                        .num_columns(2)
                        .spacing([12.0, 8.0])
                        .show(ui, |ui| {
                            ui.label("Name");
                            ui.text_edit_singleline(&mut form.name);
                            ui.end_row();

                            ui.label("Category");
                            egui::ComboBox::from_id_salt("product_form_category")
                                .selected_text(form.category.as_str())
                                .show_ui(ui, |ui| {
                                    for option in Category::ALL {
                                        ui.selectable_value(
                                            &mut form.category,
                                            option,
                                            option.as_str(),
                                        );
                                    }
                                });
                            ui.end_row();

                            ui.label("Price");
                            ui.text_edit_singleline(&mut form.price);
                            ui.end_row();

                            ui.label("Stock");
                            ui.text_edit_singleline(&mut form.stock);
                            ui.end_row();

                            ui.label("Description");
                            ui.add(egui::TextEdit::multiline(&mut form.description).desired_rows(3));
                            ui.end_row();

                            ui.label("Image URL");
                            ui.add(
                                egui::TextEdit::singleline(&mut form.image_url)
                                    .hint_text("optional"),
                            );
                            ui.end_row();
                        });
                });

                if let Some(error) = self.product_modal.error() {
                    ui.colored_label(LOW_STOCK_COLOR, error);
                }

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.add_enabled(!submitting, egui::Button::new("Cancel")).clicked() {
                        cancel = true;
                    }
                    if ui
                        .add_enabled(!submitting, egui::Button::new(submit_label))
                        .clicked()
                    {
                        submit = true;
                    }
                    if submitting {
                        ui.spinner();
                    }
                });
            });

        if cancel {
            self.product_modal.cancel();
        }
        if submit {
            match self.product_modal.begin_submit() {
                Ok(ProductSubmission::Create(form)) => self.send(BackendCommand::Create { form }),
                Ok(ProductSubmission::Update { product_id, form }) => {
                    self.send(BackendCommand::Update { product_id, form })
                }
                Err(ModalError::Invalid(_)) => {}
                Err(err) => self.status = err.to_string(),
            }
        }
    }

    fn show_delete_modal(&mut self, ctx: &egui::Context) {
        let Some(details) = self.delete_modal.details() else {
            return;
        };
        let submitting = self.delete_modal.phase() == ModalPhase::Submitting;

        let mut confirm = false;
        let mut cancel = false;
        egui::Window::new("Delete product")
            .id(egui::Id::new("delete_modal"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                ui.label("Are you sure you want to delete this product?");
                egui::Grid::new("delete_details")
                    .num_columns(2)
                    .spacing([12.0, 6.0])
                    .show(ui, |ui| {
                        for (label, value) in [
                            ("Name", &details.name),
                            ("Price", &details.price),
                            ("Category", &details.category),
                            ("Stock", &details.stock),
                        ] {
                            ui.label(label);
                            ui.strong(value);
                            ui.end_row();
                        }
                    });

                if let Some(error) = self.delete_modal.error() {
                    ui.colored_label(LOW_STOCK_COLOR, error);
                }

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.add_enabled(!submitting, egui::Button::new("Cancel")).clicked() {
                        cancel = true;
                    }
                    if ui.add_enabled(!submitting, egui::Button::new("Delete")).clicked() {
                        confirm = true;
                    }
                    if submitting {
                        ui.spinner();
                    }
                });
            });

        if cancel {
            self.delete_modal.cancel();
        }
        if confirm {
            match self.delete_modal.confirm() {
                Ok(product_id) => self.send(BackendCommand::Delete { product_id }),
                Err(err) => self.status = err.to_string(),
            }
        }
    }

    fn show_alert(&mut self, ctx: &egui::Context) {
        let Some(alert) = &self.alert else {
            return;
        };
        let mut dismiss = false;
        let mut retry = false;
        egui::Window::new(alert.title())
            .id(egui::Id::new("alert_window"))
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_TOP, egui::vec2(0.0, 48.0))
            .show(ctx, |ui| {
                ui.label(alert.message());
                ui.horizontal(|ui| {
                    if alert.is_retryable() && ui.button("Try again").clicked() {
                        retry = true;
                    }
                    if ui.button("OK").clicked() {
                        dismiss = true;
                    }
                });
            });

        if retry {
            self.alert = None;
            self.send(BackendCommand::Refresh);
        } else if dismiss {
            self.alert = None;
        }
    }
}

impl eframe::App for CatalogApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.poll_search(ctx);

        self.show_toolbar(ctx);
        self.show_pager(ctx);
        self.show_products(ctx);
        self.show_product_modal(ctx);
        self.show_delete_modal(ctx);
        self.show_alert(ctx);

        if self.is_loading()
            || self.product_modal.phase() == ModalPhase::Submitting
            || self.delete_modal.phase() == ModalPhase::Submitting
        {
            ctx.request_repaint_after(Duration::from_millis(16));
        } else {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

#[cfg(test)]
mod tests {
    use client_core::{sample_products, FetchOutcome};
    use crossbeam_channel::bounded;

    use super::*;

    fn app() -> (CatalogApp, Receiver<BackendCommand>, Sender<UiEvent>) {
        let (cmd_tx, cmd_rx) = bounded(16);
        let (ui_tx, ui_rx) = bounded(16);
        let app = CatalogApp::new(cmd_tx, ui_rx, Duration::from_millis(700));
        (app, cmd_rx, ui_tx)
    }

    #[test]
    fn startup_requests_first_page_and_tracks_loading() {
        let (mut app, cmd_rx, ui_tx) = app();
        assert!(matches!(cmd_rx.try_recv(), Ok(BackendCommand::Refresh)));
        assert!(app.is_loading());

        ui_tx
            .send(UiEvent::FetchSettled(FetchOutcome::Applied))
            .expect("send");
        app.process_ui_events();
        assert!(!app.is_loading());
    }

    #[test]
    fn failed_create_keeps_modal_open_with_reason() {
        let (mut app, _cmd_rx, ui_tx) = app();
        app.product_modal.open_create();
        app.product_modal.form.name = "Desk Lamp".to_string();
        app.product_modal.form.price = "20".to_string();
        app.product_modal.form.stock = "5".to_string();
        assert!(matches!(
            app.product_modal.begin_submit(),
            Ok(ProductSubmission::Create(_))
        ));

        ui_tx
            .send(UiEvent::MutationFinished {
                operation: CatalogOperation::Create,
                result: Err("create product failed: connection refused".to_string()),
            })
            .expect("send");
        app.process_ui_events();

        assert_eq!(app.product_modal.phase(), ModalPhase::Open);
        assert_eq!(
            app.product_modal.error(),
            Some("create product failed: connection refused")
        );
    }

    #[test]
    fn confirmed_delete_closes_on_success() {
        let (mut app, _cmd_rx, ui_tx) = app();
        app.delete_modal.open(sample_products().remove(5));
        let product_id = app.delete_modal.confirm().expect("confirm");
        assert_eq!(product_id.as_str(), "P1006");

        ui_tx
            .send(UiEvent::MutationFinished {
                operation: CatalogOperation::Delete,
                result: Ok(()),
            })
            .expect("send");
        app.process_ui_events();
        assert!(!app.delete_modal.is_open());
    }

    #[test]
    fn fetch_failure_shows_fallback_until_next_page() {
        let (mut app, _cmd_rx, ui_tx) = app();
        ui_tx
            .send(UiEvent::FetchFailed("fetch products failed: timed out".to_string()))
            .expect("send");
        app.process_ui_events();
        assert!(app.fetch_error.is_some());

        ui_tx
            .send(UiEvent::Snapshot(CatalogSnapshot::default()))
            .expect("send");
        app.process_ui_events();
        assert!(app.fetch_error.is_none());
    }
}
