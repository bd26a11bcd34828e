use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info};

use super::retry::{with_retry, RetryConfig};
use super::trait_def::{
    RemoteResult, SearchAnalyticsRequest, SearchAnalyticsResponse, SearchConsoleApi,
};
use crate::models::{
    AnalyticsRow, InspectionOutcome, QueryDescriptor, Site, Sitemap, UrlInspection,
    SERVICE_MAX_ROWS,
};

/// Maximum number of URL inspections in flight at once.
pub const MAX_CONCURRENT_INSPECTIONS: usize = 10;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Rows returned by one logical query, possibly stitched from several pages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    pub rows: Vec<AnalyticsRow>,
    pub aggregation_type: Option<String>,
}

/// Retrying, paginating front for a [`SearchConsoleApi`] handle.
#[derive(Clone)]
pub struct SearchConsoleClient {
    api: Arc<dyn SearchConsoleApi>,
    retry: RetryConfig,
}

impl SearchConsoleClient {
    pub fn new(api: Arc<dyn SearchConsoleApi>) -> Self {
        Self::with_retry_config(api, RetryConfig::default())
    }

    pub fn with_retry_config(api: Arc<dyn SearchConsoleApi>, retry: RetryConfig) -> Self {
        Self { api, retry }
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry
    }

    /// Execute one logical query.
    ///
    /// Limits up to [`SERVICE_MAX_ROWS`] are served by a single call. Larger
    /// limits are fetched page by page, advancing `startRow`, until the limit
    /// is reached or the service runs out of rows.
    pub async fn execute(&self, query: &QueryDescriptor) -> RemoteResult<QueryResult> {
        if query.row_limit <= SERVICE_MAX_ROWS {
            let request = build_request(query, query.row_limit, query.start_row);
            let response = self.search_analytics(&query.site_url, &request).await?;
            return Ok(QueryResult {
                rows: response.rows,
                aggregation_type: response.response_aggregation_type,
            });
        }

        let target = query.row_limit as usize;
        let mut rows: Vec<AnalyticsRow> = Vec::new();
        let mut aggregation_type = None;
        let mut start_row = query.start_row;
        let mut pages = 0;

        while rows.len() < target {
            let page_size = ((target - rows.len()) as u32).min(SERVICE_MAX_ROWS);
            let request = build_request(query, page_size, start_row);
            let response = self.search_analytics(&query.site_url, &request).await?;
            pages += 1;

            if response.response_aggregation_type.is_some() {
                aggregation_type = response.response_aggregation_type;
            }

            let returned = response.rows.len();
            if returned == 0 {
                break;
            }
            rows.extend(response.rows);

            if returned < page_size as usize {
                break;
            }
            start_row = start_row.saturating_add(page_size);
        }

        rows.truncate(target);
        info!(
            site = %query.site_url,
            pages,
            rows = rows.len(),
            "Paginated search analytics query completed"
        );

        Ok(QueryResult {
            rows,
            aggregation_type,
        })
    }

    pub async fn list_sites(&self) -> RemoteResult<Vec<Site>> {
        with_retry("list_sites", self.retry, || self.api.list_sites()).await
    }

    /// Returns `None` when the service does not know the property.
    pub async fn get_site(&self, site_url: &str) -> RemoteResult<Option<Site>> {
        let result = with_retry("get_site", self.retry, || self.api.get_site(site_url)).await;
        absent_if_not_found(result)
    }

    pub async fn list_sitemaps(&self, site_url: &str) -> RemoteResult<Vec<Sitemap>> {
        with_retry("list_sitemaps", self.retry, || {
            self.api.list_sitemaps(site_url)
        })
        .await
    }

    /// Returns `None` when the sitemap has not been submitted for the property.
    pub async fn get_sitemap(&self, site_url: &str, feedpath: &str) -> RemoteResult<Option<Sitemap>> {
        let result = with_retry("get_sitemap", self.retry, || {
            self.api.get_sitemap(site_url, feedpath)
        })
        .await;
        absent_if_not_found(result)
    }

    pub async fn submit_sitemap(&self, site_url: &str, feedpath: &str) -> RemoteResult<()> {
        with_retry("submit_sitemap", self.retry, || {
            self.api.submit_sitemap(site_url, feedpath)
        })
        .await
    }

    pub async fn delete_sitemap(&self, site_url: &str, feedpath: &str) -> RemoteResult<()> {
        with_retry("delete_sitemap", self.retry, || {
            self.api.delete_sitemap(site_url, feedpath)
        })
        .await
    }

    pub async fn inspect_url(&self, site_url: &str, url: &str) -> RemoteResult<UrlInspection> {
        with_retry("inspect_url", self.retry, || self.api.inspect_url(site_url, url)).await
    }

    /// Inspect several URLs with bounded fan-out. Each URL gets its own retry
    /// budget and its own outcome; results keep the input order.
    pub async fn inspect_urls(&self, site_url: &str, urls: &[String]) -> Vec<InspectionOutcome> {
        // Owned inputs: the batch future must be `Send` to run inside axum handlers.
        let inspections: Vec<_> = urls
            .iter()
            .cloned()
            .map(|url| {
                let client = self.clone();
                let site_url = site_url.to_string();
                async move {
                    let result = client.inspect_url(&site_url, &url).await;
                    match result {
                        Ok(inspection) => InspectionOutcome::succeeded(inspection),
                        Err(e) => InspectionOutcome::failed(url, e.to_string()),
                    }
                }
            })
            .collect();

        stream::iter(inspections)
            .buffered(MAX_CONCURRENT_INSPECTIONS)
        .collect()
        .await
    }

    async fn search_analytics(
        &self,
        site_url: &str,
        request: &SearchAnalyticsRequest,
    ) -> RemoteResult<SearchAnalyticsResponse> {
        debug!(
            site = site_url,
            row_limit = request.row_limit,
            start_row = request.start_row,
            "Calling search analytics"
        );
        with_retry("search_analytics", self.retry, || {
            self.api.search_analytics(site_url, request)
        })
        .await
    }
}

fn build_request(query: &QueryDescriptor, row_limit: u32, start_row: u32) -> SearchAnalyticsRequest {
    SearchAnalyticsRequest {
        start_date: query.start_date.format(DATE_FORMAT).to_string(),
        end_date: query.end_date.format(DATE_FORMAT).to_string(),
        dimensions: query.dimensions.clone(),
        dimension_filter_groups: query.filter_groups.clone(),
        row_limit,
        start_row,
        data_state: query.data_state,
        aggregation_type: query.aggregation_type,
        search_type: query.search_type,
    }
}

fn absent_if_not_found<T>(result: RemoteResult<T>) -> RemoteResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
