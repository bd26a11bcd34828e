pub mod query;
pub mod row;
pub mod site;

pub use query::{
    AggregationType, DataState, Dimension, DimensionFilter, FilterGroup, FilterOperator,
    GroupType, QueryDescriptor, SearchType, DEFAULT_ROW_LIMIT, SERVICE_MAX_ROWS,
};
pub use row::AnalyticsRow;
pub use site::{InspectionOutcome, Site, Sitemap, SitemapContent, UrlInspection};
