use crate::models::{
    AggregationType, AnalyticsRow, DataState, Dimension, FilterGroup, SearchType, Site, Sitemap,
    UrlInspection,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const QUOTA_MARKERS: &[&str] = &[
    "quota",
    "rate limit",
    "ratelimit",
    "rate_limit",
    "too many requests",
    "resource_exhausted",
];

const TRANSIENT_NETWORK_MARKERS: &[&str] = &[
    "connection reset",
    "connection refused",
    "connection closed",
    "econnreset",
    "etimedout",
    "timed out",
    "timeout",
    "enotfound",
    "eai_again",
    "dns",
    "socket hang up",
];

#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("Search Console returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response from Search Console: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Quota exhaustion, transient network trouble and 5xx responses are
    /// worth another attempt. Everything else (auth, validation) is final.
    pub fn is_retryable(&self) -> bool {
        if let Some(status) = self.status() {
            if status >= 500 || status == 429 {
                return true;
            }
        }

        let message = self.to_string().to_lowercase();
        if QUOTA_MARKERS.iter().any(|marker| message.contains(marker)) {
            return true;
        }

        matches!(self, RemoteError::Network(_))
            && TRANSIENT_NETWORK_MARKERS
                .iter()
                .any(|marker| message.contains(marker))
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Body of one search analytics call, in the service's wire format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAnalyticsRequest {
    pub start_date: String,
    pub end_date: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimensions: Vec<Dimension>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dimension_filter_groups: Vec<FilterGroup>,
    pub row_limit: u32,
    pub start_row: u32,
    pub data_state: DataState,
    pub aggregation_type: AggregationType,
    #[serde(rename = "type")]
    pub search_type: SearchType,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAnalyticsResponse {
    #[serde(default)]
    pub rows: Vec<AnalyticsRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_aggregation_type: Option<String>,
}

/// Authenticated handle on the remote Search Console service.
///
/// Implementations perform exactly one remote call per method; retry and
/// pagination live in [`crate::client::SearchConsoleClient`].
#[async_trait]
pub trait SearchConsoleApi: Send + Sync {
    async fn search_analytics(
        &self,
        site_url: &str,
        request: &SearchAnalyticsRequest,
    ) -> RemoteResult<SearchAnalyticsResponse>;

    async fn list_sites(&self) -> RemoteResult<Vec<Site>>;

    async fn get_site(&self, site_url: &str) -> RemoteResult<Site>;

    async fn list_sitemaps(&self, site_url: &str) -> RemoteResult<Vec<Sitemap>>;

    async fn get_sitemap(&self, site_url: &str, feedpath: &str) -> RemoteResult<Sitemap>;

    async fn submit_sitemap(&self, site_url: &str, feedpath: &str) -> RemoteResult<()>;

    async fn delete_sitemap(&self, site_url: &str, feedpath: &str) -> RemoteResult<()>;

    async fn inspect_url(&self, site_url: &str, inspection_url: &str)
        -> RemoteResult<UrlInspection>;
}
