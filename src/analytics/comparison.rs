//! Period-over-period comparison and the weekly self-comparison summary.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::formatter::{format_rows, round_ctr, round_position, FormatOptions, FormattedRow};
use crate::client::{RemoteResult, SearchConsoleClient};
use crate::models::{AnalyticsRow, Dimension, QueryDescriptor};

/// Days the service needs before a day's data is considered complete.
pub const REPORTING_LAG_DAYS: i64 = 3;

const WEEKLY_TOP_QUERIES: u32 = 10;
const WEEKLY_TOP_PAGES: u32 = 10;
const WEEKLY_TOP_DEVICES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }
}

/// Aggregate metrics of one period.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodTotals {
    pub clicks: u64,
    pub impressions: u64,
    pub ctr: f64,
    pub position: f64,
}

impl PeriodTotals {
    /// Position is the plain mean over rows.
    pub fn unweighted(rows: &[AnalyticsRow]) -> Self {
        let position = if rows.is_empty() {
            0.0
        } else {
            rows.iter().map(|r| r.position).sum::<f64>() / rows.len() as f64
        };
        Self::from_sums(rows, position)
    }

    /// Position is weighted by each row's impressions.
    pub fn impression_weighted(rows: &[AnalyticsRow]) -> Self {
        let impressions: u64 = rows.iter().map(|r| r.impressions).sum();
        let position = if impressions == 0 {
            0.0
        } else {
            rows.iter()
                .map(|r| r.position * r.impressions as f64)
                .sum::<f64>()
                / impressions as f64
        };
        Self::from_sums(rows, position)
    }

    fn from_sums(rows: &[AnalyticsRow], position: f64) -> Self {
        let clicks: u64 = rows.iter().map(|r| r.clicks).sum();
        let impressions: u64 = rows.iter().map(|r| r.impressions).sum();
        let ctr = if impressions == 0 {
            0.0
        } else {
            clicks as f64 / impressions as f64
        };

        Self {
            clicks,
            impressions,
            ctr: round_ctr(ctr),
            position: round_position(position),
        }
    }
}

/// Change from the baseline (period 2) to the period of interest (period 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodDelta {
    pub clicks: String,
    pub clicks_change: String,
    pub impressions: String,
    pub impressions_change: String,
    pub position: String,
}

impl PeriodDelta {
    pub fn between(current: &PeriodTotals, baseline: &PeriodTotals) -> Self {
        Self {
            clicks: signed_difference(current.clicks, baseline.clicks),
            clicks_change: percent_change(current.clicks, baseline.clicks),
            impressions: signed_difference(current.impressions, baseline.impressions),
            impressions_change: percent_change(current.impressions, baseline.impressions),
            position: position_delta(current.position, baseline.position),
        }
    }
}

/// `+20.0%` style change, or `N/A` against an empty baseline.
pub fn percent_change(current: u64, baseline: u64) -> String {
    if baseline == 0 {
        return "N/A".to_string();
    }
    let change = (current as f64 - baseline as f64) / baseline as f64 * 100.0;
    format!("{:+.1}%", normalize_zero(round_position(change)))
}

fn signed_difference(current: u64, baseline: u64) -> String {
    format!("{:+}", current as i64 - baseline as i64)
}

fn position_delta(current: f64, baseline: f64) -> String {
    format!("{:+.1}", normalize_zero(round_position(current - baseline)))
}

fn normalize_zero(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodReport {
    #[serde(flatten)]
    pub range: DateRange,
    pub totals: PeriodTotals,
    pub row_count: usize,
    pub rows: Vec<FormattedRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodComparison {
    pub period1: PeriodReport,
    pub period2: PeriodReport,
    /// Present only when both periods returned rows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<PeriodDelta>,
}

/// Run `query` over both ranges concurrently and compare the results.
pub async fn compare_periods(
    client: &SearchConsoleClient,
    query: &QueryDescriptor,
    period1: DateRange,
    period2: DateRange,
    options: &FormatOptions,
) -> RemoteResult<PeriodComparison> {
    let first = query.for_range(period1.start_date, period1.end_date);
    let second = query.for_range(period2.start_date, period2.end_date);

    let (current, baseline) = tokio::try_join!(client.execute(&first), client.execute(&second))?;

    let current_totals = PeriodTotals::unweighted(&current.rows);
    let baseline_totals = PeriodTotals::unweighted(&baseline.rows);
    let delta = (!current.rows.is_empty() && !baseline.rows.is_empty())
        .then(|| PeriodDelta::between(&current_totals, &baseline_totals));

    Ok(PeriodComparison {
        period1: PeriodReport {
            range: period1,
            totals: current_totals,
            row_count: current.rows.len(),
            rows: format_rows(&current.rows, options),
        },
        period2: PeriodReport {
            range: period2,
            totals: baseline_totals,
            row_count: baseline.rows.len(),
            rows: format_rows(&baseline.rows, options),
        },
        delta,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyWindows {
    pub current: DateRange,
    pub previous: DateRange,
}

/// The seven days ending at `end_date` and the seven days before them.
pub fn weekly_windows(end_date: NaiveDate) -> WeeklyWindows {
    let current_start = end_date - Duration::days(6);
    let previous_end = current_start - Duration::days(1);
    WeeklyWindows {
        current: DateRange::new(current_start, end_date),
        previous: DateRange::new(previous_end - Duration::days(6), previous_end),
    }
}

/// Latest date with complete data as of `today`.
pub fn default_summary_end(today: NaiveDate) -> NaiveDate {
    today - Duration::days(REPORTING_LAG_DAYS)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceBreakdown {
    pub device: String,
    pub clicks: u64,
    pub impressions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekSnapshot {
    #[serde(flatten)]
    pub range: DateRange,
    pub totals: PeriodTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySummary {
    pub site_url: String,
    pub current_week: WeekSnapshot,
    pub previous_week: WeekSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<PeriodDelta>,
    pub top_queries: Vec<FormattedRow>,
    pub top_pages: Vec<FormattedRow>,
    pub devices: Vec<DeviceBreakdown>,
}

/// Last week against the week before, plus the current week's leaders.
pub async fn weekly_summary(
    client: &SearchConsoleClient,
    site_url: &str,
    end_date: NaiveDate,
    options: &FormatOptions,
) -> RemoteResult<WeeklySummary> {
    let windows = weekly_windows(end_date);
    let current = QueryDescriptor::new(site_url, windows.current.start_date, windows.current.end_date);
    let previous = current.for_range(windows.previous.start_date, windows.previous.end_date);
    let queries = current
        .clone()
        .with_dimensions(vec![Dimension::Query])
        .with_row_limit(WEEKLY_TOP_QUERIES);
    let pages = current
        .clone()
        .with_dimensions(vec![Dimension::Page])
        .with_row_limit(WEEKLY_TOP_PAGES);
    let devices = current
        .clone()
        .with_dimensions(vec![Dimension::Device])
        .with_row_limit(WEEKLY_TOP_DEVICES);

    let (current_rows, previous_rows, query_rows, page_rows, device_rows) = tokio::try_join!(
        client.execute(&current),
        client.execute(&previous),
        client.execute(&queries),
        client.execute(&pages),
        client.execute(&devices),
    )?;

    let current_totals = PeriodTotals::impression_weighted(&current_rows.rows);
    let previous_totals = PeriodTotals::impression_weighted(&previous_rows.rows);
    let delta = (!current_rows.rows.is_empty() && !previous_rows.rows.is_empty())
        .then(|| PeriodDelta::between(&current_totals, &previous_totals));

    Ok(WeeklySummary {
        site_url: site_url.to_string(),
        current_week: WeekSnapshot {
            range: windows.current,
            totals: current_totals,
        },
        previous_week: WeekSnapshot {
            range: windows.previous,
            totals: previous_totals,
        },
        delta,
        top_queries: format_rows(&query_rows.rows, options),
        top_pages: format_rows(&page_rows.rows, options),
        devices: device_rows
            .rows
            .iter()
            .map(|row| DeviceBreakdown {
                device: row.first_key().unwrap_or("unknown").to_string(),
                clicks: row.clicks,
                impressions: row.impressions,
            })
            .collect(),
    })
}
