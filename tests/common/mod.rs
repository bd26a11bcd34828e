//! In-memory Search Console used by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use gsc_insights::client::{
    RemoteError, RemoteResult, RetryConfig, SearchAnalyticsRequest, SearchAnalyticsResponse,
    SearchConsoleApi, SearchConsoleClient,
};
use gsc_insights::config::AccessScope;
use gsc_insights::models::{AnalyticsRow, Site, Sitemap, UrlInspection};
use gsc_insights::tools::ToolExecutor;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

pub const SITE: &str = "sc-domain:example.com";

/// Rows are generated on demand: the fake holds `total_rows` rows and serves
/// the slice `[startRow, startRow + rowLimit)` of them, unless canned rows
/// were registered for the request's first dimension.
#[derive(Default)]
pub struct FakeSearchConsole {
    pub total_rows: usize,
    pub canned: HashMap<String, Vec<AnalyticsRow>>,
    pub failures: Mutex<VecDeque<RemoteError>>,
    pub requests: Mutex<Vec<SearchAnalyticsRequest>>,
    pub sites: Vec<Site>,
    pub sitemaps: Vec<Sitemap>,
    pub remote_calls: AtomicU32,
    pub writes: AtomicU32,
}

impl FakeSearchConsole {
    pub fn with_rows(total_rows: usize) -> Self {
        Self {
            total_rows,
            ..Self::default()
        }
    }

    /// Serve `rows` for requests whose dimension list joins to `dimensions`
    /// (e.g. "query,page"), or "" for no dimensions.
    pub fn canned(mut self, dimensions: &str, rows: Vec<AnalyticsRow>) -> Self {
        self.canned.insert(dimensions.to_string(), rows);
        self
    }

    pub fn failing_first(self, failures: Vec<RemoteError>) -> Self {
        *self.failures.lock().unwrap() = failures.into();
        self
    }

    pub fn with_site(mut self, site_url: &str) -> Self {
        self.sites.push(Site {
            site_url: site_url.to_string(),
            permission_level: Some("siteOwner".to_string()),
        });
        self
    }

    pub fn with_sitemap(mut self, path: &str) -> Self {
        self.sitemaps.push(Sitemap {
            path: path.to_string(),
            last_submitted: Some("2024-01-01T00:00:00Z".to_string()),
            last_downloaded: None,
            is_pending: false,
            is_sitemaps_index: false,
            sitemap_type: Some("sitemap".to_string()),
            warnings: Some("0".to_string()),
            errors: Some("0".to_string()),
            contents: Vec::new(),
        });
        self
    }

    pub fn calls(&self) -> u32 {
        self.remote_calls.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> Vec<SearchAnalyticsRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_failure(&self) -> Option<RemoteError> {
        self.remote_calls.fetch_add(1, Ordering::SeqCst);
        self.failures.lock().unwrap().pop_front()
    }
}

pub fn not_found() -> RemoteError {
    RemoteError::Status {
        status: 404,
        message: "Requested entity was not found.".to_string(),
    }
}

pub fn row(key: &str, i: usize) -> AnalyticsRow {
    AnalyticsRow::new(&[key], i as u64, 10 * i as u64 + 10, 0.05, 7.5)
}

#[async_trait]
impl SearchConsoleApi for FakeSearchConsole {
    async fn search_analytics(
        &self,
        _site_url: &str,
        request: &SearchAnalyticsRequest,
    ) -> RemoteResult<SearchAnalyticsResponse> {
        if let Some(err) = self.next_failure() {
            return Err(err);
        }
        self.requests.lock().unwrap().push(request.clone());

        let dimensions = request
            .dimensions
            .iter()
            .map(|d| d.as_str())
            .collect::<Vec<_>>()
            .join(",");
        if let Some(rows) = self.canned.get(&dimensions) {
            return Ok(SearchAnalyticsResponse {
                rows: rows.iter().take(request.row_limit as usize).cloned().collect(),
                response_aggregation_type: Some("byProperty".to_string()),
            });
        }

        let start = (request.start_row as usize).min(self.total_rows);
        let end = (start + request.row_limit as usize).min(self.total_rows);
        Ok(SearchAnalyticsResponse {
            rows: (start..end).map(|i| row(&format!("q{i}"), i)).collect(),
            response_aggregation_type: Some("byProperty".to_string()),
        })
    }

    async fn list_sites(&self) -> RemoteResult<Vec<Site>> {
        if let Some(err) = self.next_failure() {
            return Err(err);
        }
        Ok(self.sites.clone())
    }

    async fn get_site(&self, site_url: &str) -> RemoteResult<Site> {
        if let Some(err) = self.next_failure() {
            return Err(err);
        }
        self.sites
            .iter()
            .find(|s| s.site_url == site_url)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn list_sitemaps(&self, _site_url: &str) -> RemoteResult<Vec<Sitemap>> {
        if let Some(err) = self.next_failure() {
            return Err(err);
        }
        Ok(self.sitemaps.clone())
    }

    async fn get_sitemap(&self, _site_url: &str, feedpath: &str) -> RemoteResult<Sitemap> {
        if let Some(err) = self.next_failure() {
            return Err(err);
        }
        self.sitemaps
            .iter()
            .find(|s| s.path == feedpath)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn submit_sitemap(&self, _site_url: &str, _feedpath: &str) -> RemoteResult<()> {
        if let Some(err) = self.next_failure() {
            return Err(err);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_sitemap(&self, _site_url: &str, _feedpath: &str) -> RemoteResult<()> {
        if let Some(err) = self.next_failure() {
            return Err(err);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// URLs containing "broken" fail with a validation error.
    async fn inspect_url(
        &self,
        _site_url: &str,
        inspection_url: &str,
    ) -> RemoteResult<UrlInspection> {
        if let Some(err) = self.next_failure() {
            return Err(err);
        }
        if inspection_url.contains("broken") {
            return Err(RemoteError::Status {
                status: 400,
                message: format!("URL {inspection_url} is not in property"),
            });
        }
        Ok(UrlInspection {
            inspection_url: inspection_url.to_string(),
            inspection_result: json!({
                "indexStatusResult": {"verdict": "PASS", "coverageState": "Submitted and indexed"}
            }),
        })
    }
}

/// Retries without meaningful delay.
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 3,
        base_delay_ms: 1,
    }
}

pub fn client(fake: Arc<FakeSearchConsole>) -> SearchConsoleClient {
    SearchConsoleClient::with_retry_config(fake, fast_retry())
}

pub fn executor(fake: Arc<FakeSearchConsole>, scope: AccessScope) -> ToolExecutor {
    ToolExecutor::new(client(fake), scope)
}
