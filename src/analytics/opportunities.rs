//! Derived analyses over (query, page) rows: low-CTR opportunities and
//! keyword cannibalization.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::formatter::{Metrics, OutputFormat};
use crate::models::AnalyticsRow;

/// CTR a page is assumed to be able to reach once its snippet is improved.
/// Flat across positions 4-20; a documented heuristic, not a per-position
/// benchmark curve.
pub const BENCHMARK_CTR: f64 = 0.05;

/// Best position below which one page is treated as the clear winner.
const DOMINANT_POSITION: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LowCtrCriteria {
    pub min_impressions: u64,
    pub max_ctr: f64,
    pub min_position: f64,
    pub max_position: f64,
    pub limit: usize,
}

impl Default for LowCtrCriteria {
    fn default() -> Self {
        Self {
            min_impressions: 100,
            max_ctr: 0.03,
            min_position: 4.0,
            max_position: 20.0,
            limit: 25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(flatten)]
    pub metrics: Metrics,
    pub potential_clicks: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityReport {
    pub opportunities: Vec<Opportunity>,
    /// Sum over the returned opportunities only.
    pub total_potential_clicks: i64,
}

/// Estimated extra clicks if the row's CTR reached [`BENCHMARK_CTR`].
pub fn potential_clicks(impressions: u64, clicks: u64) -> i64 {
    (impressions as f64 * BENCHMARK_CTR - clicks as f64).round() as i64
}

/// Rows that rank reasonably well but earn few clicks, best upside first.
///
/// Filtering runs on the raw metrics; `format` only decides how the kept
/// rows spell ctr and position.
pub fn find_low_ctr_opportunities(
    rows: &[AnalyticsRow],
    criteria: &LowCtrCriteria,
    format: OutputFormat,
) -> OpportunityReport {
    let mut opportunities: Vec<Opportunity> = rows
        .iter()
        .filter(|row| {
            row.impressions >= criteria.min_impressions
                && row.ctr < criteria.max_ctr
                && row.position >= criteria.min_position
                && row.position <= criteria.max_position
        })
        .filter_map(|row| {
            let query = row.key(0)?.to_string();
            Some(Opportunity {
                query,
                page: row.key(1).map(str::to_string),
                metrics: Metrics::from_row(row, format),
                potential_clicks: potential_clicks(row.impressions, row.clicks),
            })
        })
        .collect();

    opportunities.sort_by(|a, b| b.potential_clicks.cmp(&a.potential_clicks));
    opportunities.truncate(criteria.limit);

    let total_potential_clicks = opportunities.iter().map(|o| o.potential_clicks).sum();

    OpportunityReport {
        opportunities,
        total_potential_clicks,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CannibalizationCriteria {
    pub min_impressions: u64,
    pub limit: usize,
}

impl Default for CannibalizationCriteria {
    fn default() -> Self {
        Self {
            min_impressions: 50,
            limit: 25,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetingPage {
    pub page: String,
    #[serde(flatten)]
    pub metrics: Metrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CannibalizationIssue {
    pub query: String,
    /// Best-ranked page first.
    pub pages: Vec<CompetingPage>,
    pub total_impressions: u64,
    pub recommendation: String,
}

/// Queries for which two or more pages of the property compete.
pub fn detect_cannibalization(
    rows: &[AnalyticsRow],
    criteria: &CannibalizationCriteria,
    format: OutputFormat,
) -> Vec<CannibalizationIssue> {
    // (page, row) pairs per query
    let mut groups: HashMap<&str, Vec<(&str, &AnalyticsRow)>> = HashMap::new();

    for row in rows {
        let (Some(query), Some(page)) = (row.key(0), row.key(1)) else {
            continue;
        };
        groups.entry(query).or_default().push((page, row));
    }

    let mut issues: Vec<CannibalizationIssue> = groups
        .into_iter()
        .filter_map(|(query, mut entries)| {
            let distinct: BTreeSet<&str> = entries.iter().map(|(page, _)| *page).collect();
            if distinct.len() < 2 {
                return None;
            }

            let total_impressions: u64 = entries.iter().map(|(_, row)| row.impressions).sum();
            if total_impressions < criteria.min_impressions {
                return None;
            }

            entries.sort_by(|a, b| a.1.position.total_cmp(&b.1.position));
            let (best_page, best_row) = entries[0];
            let recommendation = recommend(best_page, best_row.position);

            let pages = entries
                .into_iter()
                .map(|(page, row)| CompetingPage {
                    page: page.to_string(),
                    metrics: Metrics::from_row(row, format),
                })
                .collect();

            Some(CannibalizationIssue {
                query: query.to_string(),
                pages,
                total_impressions,
                recommendation,
            })
        })
        .collect();

    issues.sort_by(|a, b| {
        b.total_impressions
            .cmp(&a.total_impressions)
            .then_with(|| a.query.cmp(&b.query))
    });
    issues.truncate(criteria.limit);
    issues
}

fn recommend(best_page: &str, best_position: f64) -> String {
    if best_position < DOMINANT_POSITION {
        format!(
            "Consider consolidating competing content into {} (position {:.1}), which already ranks best for this query.",
            best_page, best_position
        )
    } else {
        format!(
            "No page clearly dominates (best position {:.1}). Options: consolidate the pages into one authoritative page; differentiate their content so each targets a distinct intent; or add canonical tags pointing to the preferred page.",
            best_position
        )
    }
}
