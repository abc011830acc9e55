//! Runtime bridge between UI command queue and backend event intake.

use std::{sync::Arc, thread};

use client_core::{records_backend, CatalogClient, CatalogEvent, CatalogOperation, Settings};
use crossbeam_channel::{Receiver, Sender};
use tokio::sync::broadcast::error::RecvError;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn launch(
    settings: Settings,
    in_memory: bool,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let backend = match records_backend(&settings, in_memory) {
                Ok(backend) => backend,
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::BackendStartup,
                        format!("backend worker startup failure: {err:#}"),
                    )));
                    tracing::error!("failed to configure records backend: {err:#}");
                    return;
                }
            };
            let client = CatalogClient::new(backend, settings.collection.clone());
            tokio::spawn(forward_catalog_events(Arc::clone(&client), ui_tx.clone()));
            let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));

            while let Ok(cmd) = cmd_rx.recv() {
                tokio::spawn(handle_command(Arc::clone(&client), cmd, ui_tx.clone()));
            }
            tracing::info!("backend: command queue closed; worker exiting");
        });
    });
}

async fn forward_catalog_events(client: Arc<CatalogClient>, ui_tx: Sender<UiEvent>) {
    let mut events = client.subscribe_events();
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "backend: ui event forwarder lagged");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        let ui_event = match event {
            CatalogEvent::PageLoaded(snapshot) => UiEvent::Snapshot(snapshot),
            CatalogEvent::FetchFailed { message } => UiEvent::FetchFailed(message),
            CatalogEvent::MutationSucceeded { message, .. } => UiEvent::Info(message),
            CatalogEvent::MutationFailed { operation, message } => {
                UiEvent::Error(UiError::from_message(operation.into(), message))
            }
        };
        let _ = ui_tx.try_send(ui_event);
    }
}

async fn handle_command(client: Arc<CatalogClient>, cmd: BackendCommand, ui_tx: Sender<UiEvent>) {
    tracing::debug!(command = cmd.name(), "backend: handling command");
    let (operation, result) = match cmd {
        BackendCommand::Refresh => return settle_fetch(&ui_tx, client.refresh().await),
        BackendCommand::SetCategory(category) => {
            return settle_fetch(&ui_tx, client.set_category(category).await)
        }
        BackendCommand::SetSort(sort) => return settle_fetch(&ui_tx, client.set_sort(sort).await),
        BackendCommand::CommitSearch(search) => {
            return settle_fetch(&ui_tx, client.commit_search(&search).await)
        }
        BackendCommand::GoToPage(page) => {
            return settle_fetch(&ui_tx, client.go_to_page(page).await)
        }
        BackendCommand::Create { form } => (
            CatalogOperation::Create,
            client.create_product(&form).await.map(|_| ()),
        ),
        BackendCommand::Update { product_id, form } => (
            CatalogOperation::Update,
            client.update_product(&product_id, &form).await,
        ),
        BackendCommand::Delete { product_id } => (
            CatalogOperation::Delete,
            client.delete_product(&product_id).await,
        ),
    };

    let _ = ui_tx.try_send(UiEvent::MutationFinished {
        operation,
        result: result.map_err(|err| err.to_string()),
    });
}

fn settle_fetch(ui_tx: &Sender<UiEvent>, outcome: client_core::FetchOutcome) {
    let _ = ui_tx.try_send(UiEvent::FetchSettled(outcome));
}
