//! Re-bucketing of daily date-dimension rows into weeks or months.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::AnalyticsRow;

/// Ranges longer than this many days roll up to months under `auto`.
const AUTO_MONTHLY_AFTER_DAYS: i64 = 90;
/// Ranges longer than this many days roll up to weeks under `auto`.
const AUTO_WEEKLY_AFTER_DAYS: i64 = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Auto,
}

/// Resolve `auto` against the queried range. Explicit granularities are
/// returned unchanged.
pub fn resolve_granularity(
    granularity: Granularity,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Granularity {
    if granularity != Granularity::Auto {
        return granularity;
    }

    let span = (end_date - start_date).num_days();
    if span > AUTO_MONTHLY_AFTER_DAYS {
        Granularity::Monthly
    } else if span > AUTO_WEEKLY_AFTER_DAYS {
        Granularity::Weekly
    } else {
        Granularity::Daily
    }
}

#[derive(Default)]
struct Bucket {
    clicks: u64,
    impressions: u64,
    position_sum: f64,
    rows: usize,
}

/// Collapse daily rows into coarser buckets.
///
/// The first key of each row must be a `YYYY-MM-DD` date; rows without one
/// are dropped. Keys after the date are kept and bucketed separately. Clicks
/// and impressions are summed, position is the plain mean of the bucket's
/// rows, and CTR is recomputed from the summed counts.
pub fn rollup(
    rows: Vec<AnalyticsRow>,
    granularity: Granularity,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Vec<AnalyticsRow> {
    let resolved = resolve_granularity(granularity, start_date, end_date);
    if resolved == Granularity::Daily {
        return rows;
    }

    let mut buckets: BTreeMap<(String, Vec<String>), Bucket> = BTreeMap::new();

    for row in rows {
        let Some(keys) = row.keys else {
            continue;
        };
        let Some(date) = keys.first().and_then(|k| parse_date(k)) else {
            continue;
        };

        let bucket_key = bucket_key(date, resolved);
        let bucket = buckets
            .entry((bucket_key, keys[1..].to_vec()))
            .or_default();
        bucket.clicks += row.clicks;
        bucket.impressions += row.impressions;
        bucket.position_sum += row.position;
        bucket.rows += 1;
    }

    buckets
        .into_iter()
        .map(|((bucket_key, rest), bucket)| {
            let mut keys = Vec::with_capacity(rest.len() + 1);
            keys.push(bucket_key);
            keys.extend(rest);

            AnalyticsRow {
                keys: Some(keys),
                clicks: bucket.clicks,
                impressions: bucket.impressions,
                ctr: if bucket.impressions == 0 {
                    0.0
                } else {
                    bucket.clicks as f64 / bucket.impressions as f64
                },
                position: bucket.position_sum / bucket.rows as f64,
            }
        })
        .collect()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Weekly buckets start on the ISO Monday on or before `date`; monthly
/// buckets are `YYYY-MM`.
fn bucket_key(date: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Monthly => format!("{:04}-{:02}", date.year(), date.month()),
        Granularity::Weekly => {
            let offset = date.weekday().num_days_from_monday() as i64;
            (date - Duration::days(offset)).format("%Y-%m-%d").to_string()
        }
        Granularity::Daily | Granularity::Auto => date.format("%Y-%m-%d").to_string(),
    }
}
