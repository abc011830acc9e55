use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use shared::protocol::{
    CreateRecordsRequest, DeleteRecordsRequest, ListRecordsRequest, ListRecordsResponse,
    MutationResponse, UpdateRecordsRequest,
};
use tracing::debug;

use crate::{
    config::{normalize_backend_url, Settings},
    RecordsBackend,
};

/// Records service reached over HTTP with a static bearer credential.
pub struct HttpRecordsBackend {
    http: Client,
    base_url: String,
    api_key: String,
}

impl HttpRecordsBackend {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: Client::new(),
            base_url: normalize_backend_url(base_url)?,
            api_key: api_key.into(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url: normalize_backend_url(&settings.backend_url)?,
            api_key: settings.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, R>(&self, operation: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/records/{operation}", self.base_url);
        debug!(%url, "backend: posting records request");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .with_context(|| format!("records {operation} request failed: {url}"))?
            .error_for_status()
            .with_context(|| format!("records {operation} returned an error status"))?;

        response
            .json()
            .await
            .with_context(|| format!("invalid records {operation} response body"))
    }
}

#[async_trait]
impl RecordsBackend for HttpRecordsBackend {
    async fn list_records(&self, request: ListRecordsRequest) -> Result<ListRecordsResponse> {
        self.post("list", &request).await
    }

    async fn create_records(&self, request: CreateRecordsRequest) -> Result<MutationResponse> {
        self.post("create", &request).await
    }

    async fn update_records(&self, request: UpdateRecordsRequest) -> Result<MutationResponse> {
        self.post("update", &request).await
    }

    async fn delete_records(&self, request: DeleteRecordsRequest) -> Result<MutationResponse> {
        self.post("delete", &request).await
    }
}

#[cfg(test)]
#[path = "tests/http_backend_tests.rs"]
mod tests;
