use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::trait_def::{
    RemoteError, RemoteResult, SearchAnalyticsRequest, SearchAnalyticsResponse, SearchConsoleApi,
};
use crate::config::SearchConsoleConfig;
use crate::models::{AnalyticsRow, Site, Sitemap, UrlInspection};

const INSPECTION_LANGUAGE: &str = "en-US";

/// [`SearchConsoleApi`] over the public REST endpoints, authenticated with a
/// bearer token issued elsewhere.
#[derive(Clone)]
pub struct HttpSearchConsole {
    client: Client,
    api_base_url: Url,
    inspection_base_url: Url,
    access_token: String,
}

impl HttpSearchConsole {
    pub fn from_config(config: &SearchConsoleConfig) -> Result<Self> {
        let access_token = config
            .access_token
            .clone()
            .context("GSC_ACCESS_TOKEN must be set to reach Search Console")?;

        let client = Client::builder()
            .user_agent(concat!("gsc-insights/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("failed to build HTTP client for Search Console")?;

        let api_base_url = Url::parse(&config.api_base_url)
            .with_context(|| format!("invalid GSC_API_BASE_URL '{}'", config.api_base_url))?;
        let inspection_base_url = Url::parse(&config.inspection_base_url).with_context(|| {
            format!(
                "invalid GSC_INSPECTION_BASE_URL '{}'",
                config.inspection_base_url
            )
        })?;

        Ok(Self {
            client,
            api_base_url,
            inspection_base_url,
            access_token,
        })
    }

    /// Append path segments to `base`, percent-encoding each one. Site URLs
    /// such as `https://example.com/` must travel as a single segment.
    fn endpoint(base: &Url, segments: &[&str]) -> RemoteResult<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::Decode(format!("base URL '{base}' cannot hold a path")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn site_endpoint(&self, site_url: &str, rest: &[&str]) -> RemoteResult<Url> {
        let mut segments = vec!["sites", site_url];
        segments.extend_from_slice(rest);
        Self::endpoint(&self.api_base_url, &segments)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.access_token)
    }

    async fn send(&self, builder: RequestBuilder) -> RemoteResult<reqwest::Response> {
        let response = builder.send().await.map_err(network_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            status: status.as_u16(),
            message: extract_error_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string()),
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> RemoteResult<T> {
        self.send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SearchConsoleApi for HttpSearchConsole {
    async fn search_analytics(
        &self,
        site_url: &str,
        request: &SearchAnalyticsRequest,
    ) -> RemoteResult<SearchAnalyticsResponse> {
        let url = self.site_endpoint(site_url, &["searchAnalytics", "query"])?;
        let wire: WireAnalyticsResponse = self
            .send_json(self.request(Method::POST, url).json(request))
            .await?;

        Ok(SearchAnalyticsResponse {
            rows: wire.rows.into_iter().map(WireRow::into_row).collect(),
            response_aggregation_type: wire.response_aggregation_type,
        })
    }

    async fn list_sites(&self) -> RemoteResult<Vec<Site>> {
        let url = Self::endpoint(&self.api_base_url, &["sites"])?;
        let list: SiteList = self.send_json(self.request(Method::GET, url)).await?;
        Ok(list.site_entry)
    }

    async fn get_site(&self, site_url: &str) -> RemoteResult<Site> {
        let url = self.site_endpoint(site_url, &[])?;
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn list_sitemaps(&self, site_url: &str) -> RemoteResult<Vec<Sitemap>> {
        let url = self.site_endpoint(site_url, &["sitemaps"])?;
        let list: SitemapList = self.send_json(self.request(Method::GET, url)).await?;
        Ok(list.sitemap)
    }

    async fn get_sitemap(&self, site_url: &str, feedpath: &str) -> RemoteResult<Sitemap> {
        let url = self.site_endpoint(site_url, &["sitemaps", feedpath])?;
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn submit_sitemap(&self, site_url: &str, feedpath: &str) -> RemoteResult<()> {
        let url = self.site_endpoint(site_url, &["sitemaps", feedpath])?;
        self.send(self.request(Method::PUT, url)).await?;
        Ok(())
    }

    async fn delete_sitemap(&self, site_url: &str, feedpath: &str) -> RemoteResult<()> {
        let url = self.site_endpoint(site_url, &["sitemaps", feedpath])?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn inspect_url(
        &self,
        site_url: &str,
        inspection_url: &str,
    ) -> RemoteResult<UrlInspection> {
        let url = Self::endpoint(&self.inspection_base_url, &["urlInspection", "index:inspect"])?;
        let body = json!({
            "inspectionUrl": inspection_url,
            "siteUrl": site_url,
            "languageCode": INSPECTION_LANGUAGE,
        });
        let wire: WireInspection = self
            .send_json(self.request(Method::POST, url).json(&body))
            .await?;

        Ok(UrlInspection {
            inspection_url: inspection_url.to_string(),
            inspection_result: wire.inspection_result,
        })
    }
}

/// Tag reqwest failures with the transient condition they represent so the
/// retry classifier can recognise them.
fn network_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Network(format!("request timed out: {err}"))
    } else if err.is_connect() {
        RemoteError::Network(format!("connection refused or reset: {err}"))
    } else {
        RemoteError::Network(err.to_string())
    }
}

/// Google APIs report failures as `{"error": {"message": ...}}`.
fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAnalyticsResponse {
    #[serde(default)]
    rows: Vec<WireRow>,
    #[serde(default)]
    response_aggregation_type: Option<String>,
}

/// The service sends counts as JSON numbers that may carry a fractional part.
#[derive(Debug, Deserialize)]
struct WireRow {
    #[serde(default)]
    keys: Option<Vec<String>>,
    #[serde(default)]
    clicks: Option<f64>,
    #[serde(default)]
    impressions: Option<f64>,
    #[serde(default)]
    ctr: Option<f64>,
    #[serde(default)]
    position: Option<f64>,
}

impl WireRow {
    fn into_row(self) -> AnalyticsRow {
        AnalyticsRow {
            keys: self.keys,
            clicks: self.clicks.unwrap_or(0.0).max(0.0) as u64,
            impressions: self.impressions.unwrap_or(0.0).max(0.0) as u64,
            ctr: self.ctr.unwrap_or(0.0),
            position: self.position.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SiteList {
    #[serde(default)]
    site_entry: Vec<Site>,
}

#[derive(Debug, Deserialize)]
struct SitemapList {
    #[serde(default)]
    sitemap: Vec<Sitemap>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireInspection {
    #[serde(default)]
    inspection_result: Value,
}
