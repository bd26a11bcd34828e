//! Rendering of raw analytics rows for human and token-constrained readers.
//!
//! Every output shape is produced from the same [`NormalizedRow`]: URL keys
//! are stripped once, then the full, compact or CSV serializer decides how
//! the metrics are spelled.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::string::FromUtf8Error;
use thiserror::Error;

use crate::models::{AnalyticsRow, Dimension};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Full,
    #[default]
    Compact,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormatOptions {
    pub format: OutputFormat,
    pub site_url: Option<String>,
}

impl FormatOptions {
    pub fn new(format: OutputFormat, site_url: Option<String>) -> Self {
        Self { format, site_url }
    }

    pub fn is_compact(&self) -> bool {
        self.format == OutputFormat::Compact
    }
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush CSV buffer: {0}")]
    Flush(String),
    #[error("CSV output was not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// CTR as a 4-decimal fraction (full) or a 2-decimal percentage string
/// (compact).
pub fn format_ctr(ctr: f64, format: OutputFormat) -> Value {
    match format {
        OutputFormat::Compact => Value::String(ctr_percent(ctr)),
        OutputFormat::Full | OutputFormat::Csv => Value::from(round_ctr(ctr)),
    }
}

pub fn ctr_percent(ctr: f64) -> String {
    format!("{:.2}%", ctr * 100.0)
}

pub fn round_ctr(ctr: f64) -> f64 {
    round_to(ctr, 4)
}

pub fn round_position(position: f64) -> f64 {
    round_to(position, 1)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Remove the property's own scheme and host from an absolute URL.
///
/// `sc-domain:` properties match both schemes with and without `www.`;
/// URL-prefix properties match their own URL. A URL that matches no prefix
/// is returned as-is, and a bare host becomes `/`.
pub fn strip_url_prefix(url: &str, site_url: &str) -> String {
    if !is_absolute_url(url) {
        return url.to_string();
    }

    let prefixes: Vec<String> = match site_url.strip_prefix("sc-domain:") {
        Some(domain) => vec![
            format!("https://{domain}"),
            format!("https://www.{domain}"),
            format!("http://{domain}"),
            format!("http://www.{domain}"),
        ],
        None => vec![site_url.trim_end_matches('/').to_string()],
    };

    for prefix in prefixes.iter().filter(|p| !p.is_empty()) {
        if let Some(rest) = url.strip_prefix(prefix.as_str()) {
            // "https://example.com" must not swallow "https://example.community/x"
            if !rest.is_empty() && !rest.starts_with(['/', '?', '#']) {
                continue;
            }
            return if rest.is_empty() {
                "/".to_string()
            } else {
                rest.to_string()
            };
        }
    }

    url.to_string()
}

fn is_absolute_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Strip URL prefixes from the keys of every row.
pub fn strip_row_urls(rows: &[AnalyticsRow], site_url: Option<&str>) -> Vec<AnalyticsRow> {
    rows.iter()
        .map(|row| AnalyticsRow {
            keys: normalize_keys(row.keys.as_ref(), site_url),
            ..row.clone()
        })
        .collect()
}

fn normalize_keys(keys: Option<&Vec<String>>, site_url: Option<&str>) -> Option<Vec<String>> {
    keys.map(|keys| match site_url {
        Some(site) => keys.iter().map(|k| strip_url_prefix(k, site)).collect(),
        None => keys.clone(),
    })
}

/// Format-independent view of one row with URL keys already stripped.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub keys: Option<Vec<String>>,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}

impl NormalizedRow {
    pub fn from_row(row: &AnalyticsRow, site_url: Option<&str>) -> Self {
        Self {
            keys: normalize_keys(row.keys.as_ref(), site_url),
            clicks: row.clicks,
            impressions: row.impressions,
            ctr: row.ctr,
            position: row.position,
        }
    }

    fn into_full(self) -> FullRow {
        FullRow {
            keys: self.keys,
            clicks: self.clicks,
            impressions: self.impressions,
            ctr: round_ctr(self.ctr),
            position: round_position(self.position),
        }
    }

    fn into_compact(self) -> CompactRow {
        let (key, keys) = match self.keys {
            Some(mut keys) if keys.len() == 1 => (keys.pop(), None),
            other => (None, other),
        };

        CompactRow {
            key,
            keys,
            clicks: self.clicks,
            imp: self.impressions,
            ctr: ctr_percent(self.ctr),
            pos: round_position(self.position),
        }
    }
}

/// The four metrics of a row spelled for `format`, for payloads that carry
/// their own key fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: Value,
    pub position: f64,
}

impl Metrics {
    pub fn from_row(row: &AnalyticsRow, format: OutputFormat) -> Self {
        Self {
            clicks: row.clicks,
            impressions: row.impressions,
            ctr: format_ctr(row.ctr, format),
            position: round_position(row.position),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompactRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
    pub clicks: u64,
    pub imp: u64,
    pub ctr: String,
    pub pos: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FormattedRow {
    Full(FullRow),
    Compact(CompactRow),
}

/// Render one row. CSV callers get the full shape per row.
pub fn format_row(row: &AnalyticsRow, options: &FormatOptions) -> FormattedRow {
    let normalized = NormalizedRow::from_row(row, options.site_url.as_deref());
    match options.format {
        OutputFormat::Compact => FormattedRow::Compact(normalized.into_compact()),
        OutputFormat::Full | OutputFormat::Csv => FormattedRow::Full(normalized.into_full()),
    }
}

pub fn format_rows(rows: &[AnalyticsRow], options: &FormatOptions) -> Vec<FormattedRow> {
    rows.iter().map(|row| format_row(row, options)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Totals {
    pub clicks: u64,
    pub impressions: u64,
}

pub fn totals(rows: &[AnalyticsRow]) -> Totals {
    rows.iter().fold(Totals::default(), |acc, row| Totals {
        clicks: acc.clicks + row.clicks,
        impressions: acc.impressions + row.impressions,
    })
}

/// One-sentence description of the leading row.
pub fn summarize(
    rows: &[AnalyticsRow],
    dimensions: &[Dimension],
    site_url: Option<&str>,
) -> Option<String> {
    let first = NormalizedRow::from_row(rows.first()?, site_url);
    let position = round_position(first.position);

    let summary = match (dimensions.first(), first.keys.as_ref().and_then(|k| k.first())) {
        (Some(dimension), Some(key)) => format!(
            "Top {} '{}' got {} clicks from {} impressions at position {:.1}",
            dimension.as_str(),
            key,
            first.clicks,
            first.impressions,
            position
        ),
        _ => format!(
            "Property got {} clicks from {} impressions at position {:.1}",
            first.clicks, first.impressions, position
        ),
    };

    Some(summary)
}

pub fn to_csv(
    rows: &[AnalyticsRow],
    dimensions: &[Dimension],
    site_url: Option<&str>,
) -> Result<String, FormatError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());

    let mut header: Vec<&str> = dimensions.iter().map(Dimension::as_str).collect();
    header.extend(["clicks", "impressions", "ctr", "position"]);
    writer.write_record(&header)?;

    for row in rows {
        let full = NormalizedRow::from_row(row, site_url).into_full();
        let mut record: Vec<String> = full.keys.unwrap_or_default();
        // Rows without keys still line up with the dimension columns
        record.resize(dimensions.len(), String::new());
        record.push(full.clicks.to_string());
        record.push(full.impressions.to_string());
        record.push(full.ctr.to_string());
        record.push(full.position.to_string());
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| FormatError::Flush(e.to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Rows plus totals and, in compact mode, a summary sentence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(rename = "rowCount")]
    pub row_count: usize,
    pub totals: Totals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<FormattedRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv: Option<String>,
}

pub fn format_response(
    rows: &[AnalyticsRow],
    dimensions: &[Dimension],
    options: &FormatOptions,
) -> Result<FormattedResponse, FormatError> {
    let site_url = options.site_url.as_deref();
    let summary = if options.is_compact() {
        summarize(rows, dimensions, site_url)
    } else {
        None
    };

    let (formatted, csv) = match options.format {
        OutputFormat::Csv => (None, Some(to_csv(rows, dimensions, site_url)?)),
        _ => (Some(format_rows(rows, options)), None),
    };

    Ok(FormattedResponse {
        summary,
        row_count: rows.len(),
        totals: totals(rows),
        rows: formatted,
        csv,
    })
}
