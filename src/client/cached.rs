use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::trait_def::{
    RemoteResult, SearchAnalyticsRequest, SearchAnalyticsResponse, SearchConsoleApi,
};
use crate::models::{Site, Sitemap, UrlInspection};

/// Read-through cache in front of another [`SearchConsoleApi`].
///
/// Analytics, site and sitemap reads are cached. URL inspection always
/// reaches the service, and a sitemap write drops the cached sitemap entries
/// of its property. Failures are never cached.
pub struct CachedSearchConsole {
    inner: Arc<dyn SearchConsoleApi>,
    analytics_cache: Cache<String, SearchAnalyticsResponse>,
    sites_cache: Cache<(), Vec<Site>>,
    site_cache: Cache<String, Site>,
    sitemaps_cache: Cache<String, Vec<Sitemap>>,
    sitemap_cache: Cache<(String, String), Sitemap>,
}

impl CachedSearchConsole {
    pub fn new(inner: Arc<dyn SearchConsoleApi>, max_entries: u64, ttl_secs: u64) -> Self {
        let ttl = Duration::from_secs(ttl_secs);
        let analytics_cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        let sites_cache = Cache::builder().max_capacity(1).time_to_live(ttl).build();
        let site_cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        let sitemaps_cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        let sitemap_cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self {
            inner,
            analytics_cache,
            sites_cache,
            site_cache,
            sitemaps_cache,
            sitemap_cache,
        }
    }

    async fn invalidate_sitemaps(&self, site_url: &str, feedpath: &str) {
        self.sitemaps_cache.invalidate(site_url).await;
        self.sitemap_cache
            .invalidate(&(site_url.to_string(), feedpath.to_string()))
            .await;
        debug!(site = site_url, feedpath, "Invalidated sitemap cache");
    }

    fn analytics_key(site_url: &str, request: &SearchAnalyticsRequest) -> String {
        let body = serde_json::to_string(request).unwrap_or_default();
        format!("{site_url}|{body}")
    }
}

#[async_trait]
impl SearchConsoleApi for CachedSearchConsole {
    async fn search_analytics(
        &self,
        site_url: &str,
        request: &SearchAnalyticsRequest,
    ) -> RemoteResult<SearchAnalyticsResponse> {
        let key = Self::analytics_key(site_url, request);
        if let Some(cached) = self.analytics_cache.get(&key).await {
            debug!(site = site_url, "Search analytics cache hit");
            return Ok(cached);
        }

        let response = self.inner.search_analytics(site_url, request).await?;
        self.analytics_cache.insert(key, response.clone()).await;
        Ok(response)
    }

    async fn list_sites(&self) -> RemoteResult<Vec<Site>> {
        if let Some(cached) = self.sites_cache.get(&()).await {
            return Ok(cached);
        }

        let sites = self.inner.list_sites().await?;
        self.sites_cache.insert((), sites.clone()).await;
        Ok(sites)
    }

    async fn get_site(&self, site_url: &str) -> RemoteResult<Site> {
        if let Some(cached) = self.site_cache.get(site_url).await {
            return Ok(cached);
        }

        let site = self.inner.get_site(site_url).await?;
        self.site_cache.insert(site_url.to_string(), site.clone()).await;
        Ok(site)
    }

    async fn list_sitemaps(&self, site_url: &str) -> RemoteResult<Vec<Sitemap>> {
        if let Some(cached) = self.sitemaps_cache.get(site_url).await {
            return Ok(cached);
        }

        let sitemaps = self.inner.list_sitemaps(site_url).await?;
        self.sitemaps_cache
            .insert(site_url.to_string(), sitemaps.clone())
            .await;
        Ok(sitemaps)
    }

    async fn get_sitemap(&self, site_url: &str, feedpath: &str) -> RemoteResult<Sitemap> {
        let key = (site_url.to_string(), feedpath.to_string());
        if let Some(cached) = self.sitemap_cache.get(&key).await {
            return Ok(cached);
        }

        let sitemap = self.inner.get_sitemap(site_url, feedpath).await?;
        self.sitemap_cache.insert(key, sitemap.clone()).await;
        Ok(sitemap)
    }

    async fn submit_sitemap(&self, site_url: &str, feedpath: &str) -> RemoteResult<()> {
        let result = self.inner.submit_sitemap(site_url, feedpath).await;
        self.invalidate_sitemaps(site_url, feedpath).await;
        result
    }

    async fn delete_sitemap(&self, site_url: &str, feedpath: &str) -> RemoteResult<()> {
        let result = self.inner.delete_sitemap(site_url, feedpath).await;
        self.invalidate_sitemaps(site_url, feedpath).await;
        result
    }

    async fn inspect_url(
        &self,
        site_url: &str,
        inspection_url: &str,
    ) -> RemoteResult<UrlInspection> {
        self.inner.inspect_url(site_url, inspection_url).await
    }
}
