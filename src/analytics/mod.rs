//! Analytics engine
//!
//! Pure transformations over search analytics rows (formatting, date
//! rollups, opportunity detection) plus the period comparator, which is the
//! only part that talks to the query client.

pub mod comparison;
pub mod formatter;
pub mod opportunities;
pub mod rollup;

pub use comparison::{
    compare_periods, default_summary_end, weekly_summary, weekly_windows, DateRange,
    DeviceBreakdown, PeriodComparison, PeriodDelta, PeriodTotals, WeeklySummary,
};
pub use formatter::{
    format_response, format_rows, strip_url_prefix, FormatError, FormatOptions,
    FormattedResponse, FormattedRow, Metrics, OutputFormat,
};
pub use opportunities::{
    detect_cannibalization, find_low_ctr_opportunities, CannibalizationCriteria,
    CannibalizationIssue, LowCtrCriteria, Opportunity, OpportunityReport,
};
pub use rollup::{resolve_granularity, rollup, Granularity};
