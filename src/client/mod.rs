pub mod cached;
pub mod http;
pub mod retry;
pub mod search_console;
pub mod trait_def;

pub use cached::CachedSearchConsole;
pub use http::HttpSearchConsole;
pub use retry::RetryConfig;
pub use search_console::{QueryResult, SearchConsoleClient, MAX_CONCURRENT_INSPECTIONS};
pub use trait_def::{
    RemoteError, RemoteResult, SearchAnalyticsRequest, SearchAnalyticsResponse, SearchConsoleApi,
};
