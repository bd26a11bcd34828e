use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub site_url: String,
    #[serde(default)]
    pub permission_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sitemap {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_submitted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_downloaded: Option<String>,
    #[serde(default)]
    pub is_pending: bool,
    #[serde(default)]
    pub is_sitemaps_index: bool,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub sitemap_type: Option<String>,
    /// The service encodes these 64-bit counters as strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<SitemapContent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapContent {
    #[serde(default, rename = "type")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub submitted: Option<String>,
    #[serde(default)]
    pub indexed: Option<String>,
}

/// Index status of a single URL as reported by the inspection endpoint.
///
/// The inspection document is deep and changes often upstream, so it is
/// passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlInspection {
    pub inspection_url: String,
    pub inspection_result: Value,
}

/// Per-URL result of a batch inspection. Failures are kept per item so one
/// bad URL does not hide the others.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionOutcome {
    pub url: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspection_result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InspectionOutcome {
    pub fn succeeded(inspection: UrlInspection) -> Self {
        Self {
            url: inspection.inspection_url,
            success: true,
            inspection_result: Some(inspection.inspection_result),
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            success: false,
            inspection_result: None,
            error: Some(error.into()),
        }
    }
}
