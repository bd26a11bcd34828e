use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::args::{
    parse_args, BatchInspectArgs, CannibalizationArgs, CompareArgs, InspectArgs, LowCtrArgs,
    QueryArgs, SiteArgs, SitemapArgs, WeeklySummaryArgs, MAX_EXPORT_ROW_LIMIT, MAX_TOOL_ROW_LIMIT,
};
use super::error::{ToolError, ToolResult, WRITE_SCOPE_REQUIRED};
use super::schemas::{GscToolSchemas, ToolSchema};
use crate::analytics::formatter::strip_row_urls;
use crate::analytics::{
    compare_periods, default_summary_end, detect_cannibalization, find_low_ctr_opportunities,
    format_response, resolve_granularity, rollup, weekly_summary, FormatError, FormatOptions,
    OutputFormat,
};
use crate::client::{SearchConsoleApi, SearchConsoleClient};
use crate::config::{AccessScope, Config, ToolsConfig};
use crate::models::{AnalyticsRow, Dimension};

const TOOL_LOG_TARGET: &str = "gsc_insights::tools";

/// Payload keys holding row-like arrays that may be cut to fit the budget.
const TRUNCATABLE_KEYS: [&str; 5] = ["rows", "results", "opportunities", "issues", "sitemaps"];

/// Result of one tool invocation as handed back to the calling client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutcome {
    pub is_error: bool,
    pub payload: JsonValue,
}

impl ToolOutcome {
    pub fn success(payload: JsonValue) -> Self {
        Self {
            is_error: false,
            payload,
        }
    }

    pub fn failure(error: &ToolError) -> Self {
        Self {
            is_error: true,
            payload: json!({
                "error": error.to_string(),
                "kind": error.kind(),
            }),
        }
    }
}

/// Executes Search Console tools by name with JSON arguments.
pub struct ToolExecutor {
    client: SearchConsoleClient,
    scope: AccessScope,
    max_result_bytes: usize,
}

impl ToolExecutor {
    pub fn new(client: SearchConsoleClient, scope: AccessScope) -> Self {
        Self {
            client,
            scope,
            max_result_bytes: ToolsConfig::DEFAULT_MAX_RESULT_BYTES,
        }
    }

    pub fn from_config(api: Arc<dyn SearchConsoleApi>, config: &Config) -> Self {
        let client =
            SearchConsoleClient::with_retry_config(api, config.search_console.retry_config());

        info!(
            scope = ?config.search_console.scope,
            max_result_bytes = config.tools.max_result_bytes,
            "Tool executor initialized"
        );

        Self::new(client, config.search_console.scope)
            .with_max_result_bytes(config.tools.max_result_bytes)
    }

    pub fn with_max_result_bytes(mut self, max_result_bytes: usize) -> Self {
        self.max_result_bytes = max_result_bytes;
        self
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        GscToolSchemas::all()
    }

    /// Execute a tool and fold any failure into an error payload.
    pub async fn execute(&self, tool_name: &str, args: JsonValue) -> ToolOutcome {
        match self.try_execute(tool_name, args).await {
            Ok(payload) => ToolOutcome::success(payload),
            Err(err) => ToolOutcome::failure(&err),
        }
    }

    /// Execute a tool, keeping the failure class for callers that map it
    /// (the HTTP layer turns it into a status code).
    pub async fn try_execute(&self, tool_name: &str, args: JsonValue) -> ToolResult<JsonValue> {
        log_tool_call_start(tool_name, &args);

        let result = self.dispatch(tool_name, args).await;

        match result {
            Ok(payload) => {
                let payload = self.truncate_if_oversized(tool_name, payload);
                log_tool_call_finish(tool_name, &payload);
                Ok(payload)
            }
            Err(err) => {
                warn!(
                    target: TOOL_LOG_TARGET,
                    tool = tool_name,
                    kind = err.kind(),
                    "Tool call failed: {}",
                    err
                );
                Err(err)
            }
        }
    }

    async fn dispatch(&self, tool_name: &str, args: JsonValue) -> ToolResult<JsonValue> {
        match tool_name {
            "list_sites" => self.list_sites().await,
            "get_site" => self.get_site(parse_args(args)?).await,
            "query_search_analytics" => self.query_search_analytics(parse_args(args)?).await,
            "get_top_queries" => self.get_top(parse_args(args)?, Dimension::Query).await,
            "get_top_pages" => self.get_top(parse_args(args)?, Dimension::Page).await,
            "export_search_analytics" => self.export_search_analytics(parse_args(args)?).await,
            "find_low_ctr_opportunities" => {
                self.find_low_ctr_opportunities(parse_args(args)?).await
            }
            "detect_cannibalization" => self.detect_cannibalization(parse_args(args)?).await,
            "compare_periods" => self.compare_periods(parse_args(args)?).await,
            "weekly_summary" => self.weekly_summary(parse_args(args)?).await,
            "list_sitemaps" => self.list_sitemaps(parse_args(args)?).await,
            "get_sitemap" => self.get_sitemap(parse_args(args)?).await,
            "submit_sitemap" => self.submit_sitemap(parse_args(args)?).await,
            "delete_sitemap" => self.delete_sitemap(parse_args(args)?).await,
            "inspect_url" => self.inspect_url(parse_args(args)?).await,
            "batch_inspect_urls" => self.batch_inspect_urls(parse_args(args)?).await,
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    async fn list_sites(&self) -> ToolResult<JsonValue> {
        let sites = self.client.list_sites().await?;
        Ok(json!({
            "count": sites.len(),
            "sites": sites,
        }))
    }

    async fn get_site(&self, args: SiteArgs) -> ToolResult<JsonValue> {
        let args = args.validate()?;
        match self.client.get_site(&args.site_url).await? {
            Some(site) => Ok(json!({"found": true, "site": site})),
            None => Ok(json!({"found": false, "siteUrl": args.site_url})),
        }
    }

    async fn query_search_analytics(&self, args: QueryArgs) -> ToolResult<JsonValue> {
        let descriptor = args.descriptor(MAX_TOOL_ROW_LIMIT)?;
        let options = args
            .options
            .format_options(&args.site_url, OutputFormat::Compact);

        let mut rows = self.client.execute(&descriptor).await?.rows;
        let mut payload_granularity = None;
        if args.wants_rollup() {
            let resolved =
                resolve_granularity(args.granularity, descriptor.start_date, descriptor.end_date);
            rows = rollup(rows, resolved, descriptor.start_date, descriptor.end_date);
            payload_granularity = Some(resolved);
        }

        let mut payload = render(&rows, &descriptor.dimensions, &options)?;
        if let (Some(granularity), Some(map)) = (payload_granularity, payload.as_object_mut()) {
            map.insert("granularity".to_string(), json!(granularity));
        }
        Ok(payload)
    }

    async fn get_top(&self, mut args: QueryArgs, dimension: Dimension) -> ToolResult<JsonValue> {
        args.options.dimensions = vec![dimension];
        let descriptor = args.descriptor(MAX_TOOL_ROW_LIMIT)?;
        let options = args
            .options
            .format_options(&args.site_url, OutputFormat::Compact);

        let rows = self.client.execute(&descriptor).await?.rows;
        render(&rows, &descriptor.dimensions, &options)
    }

    async fn export_search_analytics(&self, args: QueryArgs) -> ToolResult<JsonValue> {
        let descriptor = args.descriptor(MAX_EXPORT_ROW_LIMIT)?;
        let options = args.options.format_options(&args.site_url, OutputFormat::Csv);

        let rows = self.client.execute(&descriptor).await?.rows;
        info!(
            target: TOOL_LOG_TARGET,
            site = %descriptor.site_url,
            requested = descriptor.row_limit,
            returned = rows.len(),
            "Export fetched"
        );
        render(&rows, &descriptor.dimensions, &options)
    }

    async fn find_low_ctr_opportunities(&self, args: LowCtrArgs) -> ToolResult<JsonValue> {
        let descriptor = args.descriptor()?;
        let rows = self.client.execute(&descriptor).await?.rows;
        let rows = compact_urls(rows, &args.site_url, args.format);

        let report = find_low_ctr_opportunities(&rows, &args.criteria, args.format);
        Ok(json!({
            "siteUrl": args.site_url,
            "analyzedRows": rows.len(),
            "count": report.opportunities.len(),
            "totalPotentialClicks": report.total_potential_clicks,
            "opportunities": report.opportunities,
        }))
    }

    async fn detect_cannibalization(&self, args: CannibalizationArgs) -> ToolResult<JsonValue> {
        let descriptor = args.descriptor()?;
        let rows = self.client.execute(&descriptor).await?.rows;
        let rows = compact_urls(rows, &args.site_url, args.format);

        let issues = detect_cannibalization(&rows, &args.criteria, args.format);
        Ok(json!({
            "siteUrl": args.site_url,
            "analyzedRows": rows.len(),
            "count": issues.len(),
            "issues": issues,
        }))
    }

    async fn compare_periods(&self, args: CompareArgs) -> ToolResult<JsonValue> {
        let (descriptor, period1, period2) = args.resolve()?;
        let options = args
            .options
            .format_options(&args.site_url, OutputFormat::Compact);

        let comparison =
            compare_periods(&self.client, &descriptor, period1, period2, &options).await?;
        to_payload(&comparison)
    }

    async fn weekly_summary(&self, args: WeeklySummaryArgs) -> ToolResult<JsonValue> {
        let end_date = args
            .end_date()?
            .unwrap_or_else(|| default_summary_end(Utc::now().date_naive()));
        let options = FormatOptions::new(args.format, Some(args.site_url.clone()));

        let summary = weekly_summary(&self.client, &args.site_url, end_date, &options).await?;
        to_payload(&summary)
    }

    async fn list_sitemaps(&self, args: SiteArgs) -> ToolResult<JsonValue> {
        let args = args.validate()?;
        let sitemaps = self.client.list_sitemaps(&args.site_url).await?;
        Ok(json!({
            "siteUrl": args.site_url,
            "count": sitemaps.len(),
            "sitemaps": sitemaps,
        }))
    }

    async fn get_sitemap(&self, args: SitemapArgs) -> ToolResult<JsonValue> {
        let args = args.validate()?;
        match self.client.get_sitemap(&args.site_url, &args.feedpath).await? {
            Some(sitemap) => Ok(json!({"found": true, "sitemap": sitemap})),
            None => Ok(json!({"found": false, "feedpath": args.feedpath})),
        }
    }

    async fn submit_sitemap(&self, args: SitemapArgs) -> ToolResult<JsonValue> {
        self.require_write_scope()?;
        let args = args.validate()?;
        self.client
            .submit_sitemap(&args.site_url, &args.feedpath)
            .await?;
        Ok(json!({
            "success": true,
            "message": format!("Submitted sitemap {} for {}", args.feedpath, args.site_url),
        }))
    }

    async fn delete_sitemap(&self, args: SitemapArgs) -> ToolResult<JsonValue> {
        self.require_write_scope()?;
        let args = args.validate()?;
        self.client
            .delete_sitemap(&args.site_url, &args.feedpath)
            .await?;
        Ok(json!({
            "success": true,
            "message": format!("Deleted sitemap {} from {}", args.feedpath, args.site_url),
        }))
    }

    async fn inspect_url(&self, args: InspectArgs) -> ToolResult<JsonValue> {
        let args = args.validate()?;
        let inspection = self.client.inspect_url(&args.site_url, &args.url).await?;
        to_payload(&inspection)
    }

    async fn batch_inspect_urls(&self, args: BatchInspectArgs) -> ToolResult<JsonValue> {
        let args = args.validate()?;
        let results = self.client.inspect_urls(&args.site_url, &args.urls).await;
        let succeeded = results.iter().filter(|r| r.success).count();
        Ok(json!({
            "siteUrl": args.site_url,
            "total": results.len(),
            "succeeded": succeeded,
            "failed": results.len() - succeeded,
            "results": results,
        }))
    }

    fn require_write_scope(&self) -> ToolResult<()> {
        if self.scope.allows_writes() {
            Ok(())
        } else {
            Err(ToolError::PermissionDenied(WRITE_SCOPE_REQUIRED.to_string()))
        }
    }

    /// Cut the payload's row array when the serialized payload is larger
    /// than `max_result_bytes`, recording what was dropped.
    fn truncate_if_oversized(&self, tool_name: &str, mut payload: JsonValue) -> JsonValue {
        let result_bytes = payload.to_string().len();
        if result_bytes <= self.max_result_bytes {
            return payload;
        }

        let Some(map) = payload.as_object_mut() else {
            return payload;
        };
        let Some(key) = TRUNCATABLE_KEYS.iter().copied().find(|key| {
            map.get(*key)
                .and_then(JsonValue::as_array)
                .is_some_and(|items| !items.is_empty())
        }) else {
            warn!(
                target: TOOL_LOG_TARGET,
                tool = tool_name,
                result_bytes,
                "Oversized result has no row array to truncate, returning as-is"
            );
            return payload;
        };
        let Some(items) = map.get_mut(key).and_then(JsonValue::as_array_mut) else {
            return payload;
        };

        let item_count = items.len();
        let bytes_per_item = (result_bytes / item_count).max(1);
        let keep_items = (self.max_result_bytes / bytes_per_item).clamp(1, item_count);
        items.truncate(keep_items);

        warn!(
            target: TOOL_LOG_TARGET,
            tool = tool_name,
            result_bytes,
            max_bytes = self.max_result_bytes,
            original_items = item_count,
            kept_items = keep_items,
            "Tool result exceeded size limit, truncated {}",
            key
        );

        map.insert(
            "truncated".to_string(),
            json!({
                "field": key,
                "originalItems": item_count,
                "keptItems": keep_items,
                "maxBytes": self.max_result_bytes,
            }),
        );
        payload
    }
}

fn render(
    rows: &[AnalyticsRow],
    dimensions: &[Dimension],
    options: &FormatOptions,
) -> ToolResult<JsonValue> {
    let response = format_response(rows, dimensions, options)?;
    to_payload(&response)
}

fn to_payload<T: Serialize>(value: &T) -> ToolResult<JsonValue> {
    serde_json::to_value(value).map_err(|e| ToolError::Format(FormatError::Json(e)))
}

/// Compact analyses report pages relative to the property.
fn compact_urls(rows: Vec<AnalyticsRow>, site_url: &str, format: OutputFormat) -> Vec<AnalyticsRow> {
    if format == OutputFormat::Compact {
        strip_row_urls(&rows, Some(site_url))
    } else {
        rows
    }
}

fn log_tool_call_start(tool_name: &str, args: &JsonValue) {
    info!(
        target: TOOL_LOG_TARGET,
        tool = tool_name,
        "Tool call started"
    );
    debug!(
        target: TOOL_LOG_TARGET,
        tool = tool_name,
        "Tool input payload: {}",
        args
    );
}

fn log_tool_call_finish(tool_name: &str, payload: &JsonValue) {
    info!(
        target: TOOL_LOG_TARGET,
        tool = tool_name,
        "Tool call completed"
    );
    debug!(
        target: TOOL_LOG_TARGET,
        tool = tool_name,
        "Tool output payload: {}",
        payload
    );
}
