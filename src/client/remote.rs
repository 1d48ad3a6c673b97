use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::api::{ApiResponse, OWNER_HEADER};
use crate::config::ClientConfig;
use crate::error::{Result, TrackerError};
use crate::tracker::{
    ApplicationId, ApplicationPatch, ApplicationStatus, NewApplication, OwnerId, Pagination,
    TrackedApplication,
};

pub const FETCH_FAILED: &str = "Failed to fetch applications";
pub const CREATE_FAILED: &str = "Failed to add application";
pub const UPDATE_FAILED: &str = "Failed to update application";
pub const DELETE_FAILED: &str = "Failed to delete application";

/// Parameters of a list fetch. `None` fields are left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    pub status: Option<ApplicationStatus>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListRequest {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(status) = self.status {
            pairs.push(("status", status.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListResponse {
    pub items: Vec<TrackedApplication>,
    pub pagination: Pagination,
}

/// The remote record store as seen by the client core.
///
/// Implementations report every failure as [`TrackerError::RequestFailed`]
/// carrying the server's message when one was returned.
#[async_trait]
pub trait TrackerRemote: Send + Sync {
    async fn list(&self, request: &ListRequest) -> Result<ListResponse>;

    async fn fetch(&self, id: &ApplicationId) -> Result<TrackedApplication>;

    async fn create(&self, payload: &NewApplication) -> Result<TrackedApplication>;

    async fn update(
        &self,
        id: &ApplicationId,
        patch: &ApplicationPatch,
    ) -> Result<TrackedApplication>;

    async fn delete(&self, id: &ApplicationId) -> Result<()>;
}

/// [`TrackerRemote`] over the REST API.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
    owner_id: OwnerId,
}

impl HttpRemote {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| TrackerError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            owner_id: config.owner_id.clone(),
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/api/tracker", self.base_url)
    }

    fn record_url(&self, id: &ApplicationId) -> String {
        format!("{}/api/tracker/{}", self.base_url, id)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<ApiResponse<T>> {
        let response = request
            .header(OWNER_HEADER, self.owner_id.as_str())
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Tracker request did not complete");
                TrackerError::RequestFailed(fallback.to_string())
            })?;

        let status = response.status();
        let body = response.json::<ApiResponse<T>>().await;

        match body {
            Ok(body) if status.is_success() && body.success => Ok(body),
            Ok(body) => {
                tracing::debug!(status = %status, message = ?body.message, "Tracker request rejected");
                Err(TrackerError::RequestFailed(
                    body.message.unwrap_or_else(|| fallback.to_string()),
                ))
            }
            Err(e) => {
                tracing::warn!(status = %status, error = %e, "Unreadable tracker response");
                Err(TrackerError::RequestFailed(fallback.to_string()))
            }
        }
    }

    async fn send_for_data<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<T> {
        self.send::<T>(request, fallback)
            .await?
            .data
            .ok_or_else(|| TrackerError::RequestFailed(fallback.to_string()))
    }
}

#[async_trait]
impl TrackerRemote for HttpRemote {
    async fn list(&self, request: &ListRequest) -> Result<ListResponse> {
        let http = self
            .client
            .get(self.collection_url())
            .query(&request.query_pairs());
        let body = self.send::<Vec<TrackedApplication>>(http, FETCH_FAILED).await?;
        let items = body.data.unwrap_or_default();
        let pagination = body.pagination.unwrap_or_else(|| {
            Pagination::new(1, items.len().max(1) as u32, items.len() as u64)
        });
        Ok(ListResponse { items, pagination })
    }

    async fn fetch(&self, id: &ApplicationId) -> Result<TrackedApplication> {
        self.send_for_data(self.client.get(self.record_url(id)), FETCH_FAILED)
            .await
    }

    async fn create(&self, payload: &NewApplication) -> Result<TrackedApplication> {
        let http = self.client.post(self.collection_url()).json(payload);
        self.send_for_data(http, CREATE_FAILED).await
    }

    async fn update(
        &self,
        id: &ApplicationId,
        patch: &ApplicationPatch,
    ) -> Result<TrackedApplication> {
        let http = self.client.put(self.record_url(id)).json(patch);
        self.send_for_data(http, UPDATE_FAILED).await
    }

    async fn delete(&self, id: &ApplicationId) -> Result<()> {
        self.send::<serde_json::Value>(self.client.delete(self.record_url(id)), DELETE_FAILED)
            .await
            .map(|_| ())
    }
}
