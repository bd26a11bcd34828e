//! Typed views over the loosely-typed argument bags tools receive.
//!
//! Every struct here is deserialized straight from the caller's JSON and then
//! validated, so malformed input is rejected before any remote call.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::error::{ToolError, ToolResult};
use crate::analytics::{
    CannibalizationCriteria, DateRange, FormatOptions, Granularity, LowCtrCriteria, OutputFormat,
};
use crate::models::{
    AggregationType, DataState, Dimension, DimensionFilter, FilterGroup, GroupType,
    QueryDescriptor, SearchType, DEFAULT_ROW_LIMIT, SERVICE_MAX_ROWS,
};

/// Row limit ceiling for ordinary query tools.
pub const MAX_TOOL_ROW_LIMIT: u32 = SERVICE_MAX_ROWS;
/// Row limit ceiling for the export tool, served by pagination.
pub const MAX_EXPORT_ROW_LIMIT: u32 = 100_000;
/// Rows fetched as input for the opportunity analyses.
pub const DEFAULT_SOURCE_ROWS: u32 = 1000;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Deserialize an argument bag. A missing bag is treated as `{}`.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> ToolResult<T> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ToolError::invalid(e.to_string()))
}

pub fn parse_date(field: &str, value: &str) -> ToolResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        ToolError::invalid(format!("{field} must be a date in YYYY-MM-DD format, got '{value}'"))
    })
}

pub fn parse_range(
    start_field: &str,
    start: &str,
    end_field: &str,
    end: &str,
) -> ToolResult<DateRange> {
    let start_date = parse_date(start_field, start)?;
    let end_date = parse_date(end_field, end)?;
    if start_date > end_date {
        return Err(ToolError::invalid(format!(
            "{start_field} ({start_date}) must not be after {end_field} ({end_date})"
        )));
    }
    Ok(DateRange::new(start_date, end_date))
}

fn require(field: &str, value: &str) -> ToolResult<()> {
    if value.trim().is_empty() {
        return Err(ToolError::invalid(format!("{field} is required")));
    }
    Ok(())
}

fn check_limit(field: &str, value: u32, max: u32) -> ToolResult<u32> {
    if value == 0 || value > max {
        return Err(ToolError::invalid(format!(
            "{field} must be between 1 and {max}, got {value}"
        )));
    }
    Ok(value)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteArgs {
    pub site_url: String,
}

impl SiteArgs {
    pub fn validate(self) -> ToolResult<Self> {
        require("siteUrl", &self.site_url)?;
        Ok(self)
    }
}

/// Query-shaping options shared by every analytics tool.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryOptions {
    pub dimensions: Vec<Dimension>,
    /// Shorthand for a single AND group.
    pub filters: Vec<DimensionFilter>,
    pub filter_groups: Vec<FilterGroup>,
    pub limit: Option<u32>,
    pub start_row: u32,
    pub data_state: DataState,
    pub aggregation_type: AggregationType,
    pub search_type: SearchType,
    pub format: Option<OutputFormat>,
}

impl QueryOptions {
    pub fn filter_groups(&self) -> Vec<FilterGroup> {
        let mut groups = self.filter_groups.clone();
        if !self.filters.is_empty() {
            groups.push(FilterGroup {
                group_type: GroupType::And,
                filters: self.filters.clone(),
            });
        }
        groups
    }

    /// Build the descriptor for `range`, enforcing `1..=max_limit` rows.
    pub fn descriptor(
        &self,
        site_url: &str,
        range: DateRange,
        max_limit: u32,
    ) -> ToolResult<QueryDescriptor> {
        let limit = check_limit("limit", self.limit.unwrap_or(DEFAULT_ROW_LIMIT), max_limit)?;

        Ok(QueryDescriptor::new(site_url, range.start_date, range.end_date)
            .with_dimensions(self.dimensions.clone())
            .with_filter_groups(self.filter_groups())
            .with_row_limit(limit)
            .with_start_row(self.start_row)
            .with_data_state(self.data_state)
            .with_aggregation_type(self.aggregation_type)
            .with_search_type(self.search_type))
    }

    pub fn format_options(&self, site_url: &str, default: OutputFormat) -> FormatOptions {
        FormatOptions::new(self.format.unwrap_or(default), Some(site_url.to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryArgs {
    pub site_url: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub granularity: Granularity,
    #[serde(flatten)]
    pub options: QueryOptions,
}

impl QueryArgs {
    pub fn range(&self) -> ToolResult<DateRange> {
        require("siteUrl", &self.site_url)?;
        parse_range("startDate", &self.start_date, "endDate", &self.end_date)
    }

    pub fn descriptor(&self, max_limit: u32) -> ToolResult<QueryDescriptor> {
        let range = self.range()?;

        if self.granularity != Granularity::Daily
            && self.options.dimensions.contains(&Dimension::Date)
            && self.options.dimensions.first() != Some(&Dimension::Date)
        {
            return Err(ToolError::invalid(
                "granularity requires 'date' to be the first dimension",
            ));
        }

        self.options.descriptor(&self.site_url, range, max_limit)
    }

    /// Whether rows need re-bucketing after the fetch.
    pub fn wants_rollup(&self) -> bool {
        self.granularity != Granularity::Daily
            && self.options.dimensions.first() == Some(&Dimension::Date)
    }
}

/// Arguments for the low-CTR analysis. The thresholds sit at the top level
/// of the bag next to the query fields.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowCtrArgs {
    pub site_url: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub search_type: SearchType,
    #[serde(default)]
    pub data_state: DataState,
    pub source_rows: Option<u32>,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(flatten)]
    pub criteria: LowCtrCriteria,
}

impl LowCtrArgs {
    pub fn descriptor(&self) -> ToolResult<QueryDescriptor> {
        if self.criteria.limit == 0 {
            return Err(ToolError::invalid("limit must be at least 1"));
        }
        if self.criteria.min_position > self.criteria.max_position {
            return Err(ToolError::invalid("minPosition must not exceed maxPosition"));
        }
        analysis_descriptor(
            &self.site_url,
            &self.start_date,
            &self.end_date,
            self.source_rows,
            self.search_type,
            self.data_state,
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CannibalizationArgs {
    pub site_url: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub search_type: SearchType,
    #[serde(default)]
    pub data_state: DataState,
    pub source_rows: Option<u32>,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(flatten)]
    pub criteria: CannibalizationCriteria,
}

impl CannibalizationArgs {
    pub fn descriptor(&self) -> ToolResult<QueryDescriptor> {
        if self.criteria.limit == 0 {
            return Err(ToolError::invalid("limit must be at least 1"));
        }
        analysis_descriptor(
            &self.site_url,
            &self.start_date,
            &self.end_date,
            self.source_rows,
            self.search_type,
            self.data_state,
        )
    }
}

/// Both opportunity analyses work on (query, page) rows.
fn analysis_descriptor(
    site_url: &str,
    start_date: &str,
    end_date: &str,
    source_rows: Option<u32>,
    search_type: SearchType,
    data_state: DataState,
) -> ToolResult<QueryDescriptor> {
    require("siteUrl", site_url)?;
    let range = parse_range("startDate", start_date, "endDate", end_date)?;
    let rows = check_limit(
        "sourceRows",
        source_rows.unwrap_or(DEFAULT_SOURCE_ROWS),
        MAX_TOOL_ROW_LIMIT,
    )?;

    Ok(QueryDescriptor::new(site_url, range.start_date, range.end_date)
        .with_dimensions(vec![Dimension::Query, Dimension::Page])
        .with_row_limit(rows)
        .with_search_type(search_type)
        .with_data_state(data_state))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareArgs {
    pub site_url: String,
    pub period1_start_date: String,
    pub period1_end_date: String,
    pub period2_start_date: String,
    pub period2_end_date: String,
    #[serde(flatten)]
    pub options: QueryOptions,
}

impl CompareArgs {
    /// The descriptor carries period 1's range; the comparator swaps in
    /// period 2 for the baseline query.
    pub fn resolve(&self) -> ToolResult<(QueryDescriptor, DateRange, DateRange)> {
        require("siteUrl", &self.site_url)?;
        let period1 = parse_range(
            "period1StartDate",
            &self.period1_start_date,
            "period1EndDate",
            &self.period1_end_date,
        )?;
        let period2 = parse_range(
            "period2StartDate",
            &self.period2_start_date,
            "period2EndDate",
            &self.period2_end_date,
        )?;
        let descriptor = self
            .options
            .descriptor(&self.site_url, period1, MAX_TOOL_ROW_LIMIT)?;
        Ok((descriptor, period1, period2))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummaryArgs {
    pub site_url: String,
    pub end_date: Option<String>,
    #[serde(default)]
    pub format: OutputFormat,
}

impl WeeklySummaryArgs {
    /// Explicit end date, or `None` to use the default reporting window.
    pub fn end_date(&self) -> ToolResult<Option<NaiveDate>> {
        require("siteUrl", &self.site_url)?;
        self.end_date
            .as_deref()
            .map(|value| parse_date("endDate", value))
            .transpose()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapArgs {
    pub site_url: String,
    #[serde(alias = "sitemapUrl")]
    pub feedpath: String,
}

impl SitemapArgs {
    pub fn validate(self) -> ToolResult<Self> {
        require("siteUrl", &self.site_url)?;
        require("feedpath", &self.feedpath)?;
        Ok(self)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectArgs {
    pub site_url: String,
    #[serde(alias = "inspectionUrl")]
    pub url: String,
}

impl InspectArgs {
    pub fn validate(self) -> ToolResult<Self> {
        require("siteUrl", &self.site_url)?;
        require("url", &self.url)?;
        Ok(self)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInspectArgs {
    pub site_url: String,
    pub urls: Vec<String>,
}

impl BatchInspectArgs {
    pub fn validate(self) -> ToolResult<Self> {
        require("siteUrl", &self.site_url)?;
        if self.urls.is_empty() {
            return Err(ToolError::invalid("urls must contain at least one URL"));
        }
        Ok(self)
    }
}
