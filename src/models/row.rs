use serde::{Deserialize, Serialize};

/// One bucket of aggregated search performance data.
///
/// `keys` carries one value per requested dimension, in request order, and is
/// absent when the query asked for no dimensions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalyticsRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub impressions: u64,
    #[serde(default)]
    pub ctr: f64,
    #[serde(default)]
    pub position: f64,
}

impl AnalyticsRow {
    pub fn new(keys: &[&str], clicks: u64, impressions: u64, ctr: f64, position: f64) -> Self {
        let keys = if keys.is_empty() {
            None
        } else {
            Some(keys.iter().map(|k| k.to_string()).collect())
        };

        Self {
            keys,
            clicks,
            impressions,
            ctr,
            position,
        }
    }

    /// Key value at `index`, if the row has that many dimensions.
    pub fn key(&self, index: usize) -> Option<&str> {
        self.keys
            .as_ref()
            .and_then(|keys| keys.get(index))
            .map(String::as_str)
    }

    pub fn first_key(&self) -> Option<&str> {
        self.key(0)
    }
}
