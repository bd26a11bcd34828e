use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Largest row count the remote service returns from a single call.
pub const SERVICE_MAX_ROWS: u32 = 25_000;

/// Row limit applied by every tool when the caller does not ask for more.
pub const DEFAULT_ROW_LIMIT: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Query,
    Page,
    Country,
    Device,
    SearchAppearance,
    Date,
}

impl Dimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Query => "query",
            Dimension::Page => "page",
            Dimension::Country => "country",
            Dimension::Device => "device",
            Dimension::SearchAppearance => "searchAppearance",
            Dimension::Date => "date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    IncludingRegex,
    ExcludingRegex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionFilter {
    pub dimension: Dimension,
    #[serde(default = "DimensionFilter::default_operator")]
    pub operator: FilterOperator,
    pub expression: String,
}

impl DimensionFilter {
    const fn default_operator() -> FilterOperator {
        FilterOperator::Equals
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterGroup {
    #[serde(default)]
    pub group_type: GroupType,
    pub filters: Vec<DimensionFilter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataState {
    #[default]
    All,
    Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregationType {
    #[default]
    Auto,
    ByPage,
    ByProperty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchType {
    #[default]
    Web,
    Image,
    Video,
    News,
    Discover,
    GoogleNews,
}

/// Immutable description of one logical analytics query.
///
/// `row_limit` may exceed [`SERVICE_MAX_ROWS`]; the query client splits such
/// requests into sequential pages.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    pub site_url: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub dimensions: Vec<Dimension>,
    pub filter_groups: Vec<FilterGroup>,
    pub row_limit: u32,
    pub start_row: u32,
    pub data_state: DataState,
    pub aggregation_type: AggregationType,
    pub search_type: SearchType,
}

impl QueryDescriptor {
    pub fn new(site_url: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            site_url: site_url.into(),
            start_date,
            end_date,
            dimensions: Vec::new(),
            filter_groups: Vec::new(),
            row_limit: DEFAULT_ROW_LIMIT,
            start_row: 0,
            data_state: DataState::default(),
            aggregation_type: AggregationType::default(),
            search_type: SearchType::default(),
        }
    }

    pub fn with_dimensions(mut self, dimensions: Vec<Dimension>) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_filter_groups(mut self, filter_groups: Vec<FilterGroup>) -> Self {
        self.filter_groups = filter_groups;
        self
    }

    pub fn with_row_limit(mut self, row_limit: u32) -> Self {
        self.row_limit = row_limit;
        self
    }

    pub fn with_start_row(mut self, start_row: u32) -> Self {
        self.start_row = start_row;
        self
    }

    pub fn with_data_state(mut self, data_state: DataState) -> Self {
        self.data_state = data_state;
        self
    }

    pub fn with_aggregation_type(mut self, aggregation_type: AggregationType) -> Self {
        self.aggregation_type = aggregation_type;
        self
    }

    pub fn with_search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }

    /// Same query over a different date range.
    pub fn for_range(&self, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_names_match_wire_format() {
        let json = serde_json::to_string(&vec![Dimension::SearchAppearance, Dimension::Page]).unwrap();
        assert_eq!(json, r#"["searchAppearance","page"]"#);
        assert_eq!(Dimension::SearchAppearance.as_str(), "searchAppearance");
    }

    #[test]
    fn filter_defaults_to_equals_operator() {
        let filter: DimensionFilter =
            serde_json::from_str(r#"{"dimension":"country","expression":"usa"}"#).unwrap();
        assert_eq!(filter.operator, FilterOperator::Equals);

        let filter: DimensionFilter = serde_json::from_str(
            r#"{"dimension":"page","operator":"excludingRegex","expression":"/tag/"}"#,
        )
        .unwrap();
        assert_eq!(filter.operator, FilterOperator::ExcludingRegex);
    }

    #[test]
    fn for_range_keeps_everything_but_dates() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let query = QueryDescriptor::new("sc-domain:example.com", start, end)
            .with_dimensions(vec![Dimension::Query])
            .with_row_limit(500);

        let other_start = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        let other_end = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let shifted = query.for_range(other_start, other_end);

        assert_eq!(shifted.start_date, other_start);
        assert_eq!(shifted.end_date, other_end);
        assert_eq!(shifted.dimensions, query.dimensions);
        assert_eq!(shifted.row_limit, 500);
    }
}
