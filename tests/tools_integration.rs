//! Tool executor integration tests
//!
//! Every tool is driven through `ToolExecutor` with JSON argument bags, the
//! way a tool-calling client would.

mod common;

use common::{executor, FakeSearchConsole, SITE};
use gsc_insights::client::RemoteError;
use gsc_insights::config::AccessScope;
use gsc_insights::models::AnalyticsRow;
use gsc_insights::tools::{ToolError, WRITE_SCOPE_REQUIRED};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn test_sitemap_writes_denied_with_readonly_scope() {
    let fake = Arc::new(FakeSearchConsole::default());
    let executor = executor(fake.clone(), AccessScope::Readonly);

    for tool in ["submit_sitemap", "delete_sitemap"] {
        let outcome = executor
            .execute(
                tool,
                json!({"siteUrl": SITE, "feedpath": "https://example.com/sitemap.xml"}),
            )
            .await;

        assert!(outcome.is_error);
        assert_eq!(outcome.payload["error"], WRITE_SCOPE_REQUIRED);
        assert_eq!(outcome.payload["kind"], "permission_denied");
    }
    assert_eq!(fake.calls(), 0);
}

#[tokio::test]
async fn test_sitemap_writes_allowed_with_full_scope() {
    let fake = Arc::new(FakeSearchConsole::default());
    let executor = executor(fake.clone(), AccessScope::Full);

    let payload = executor
        .try_execute(
            "submit_sitemap",
            json!({"siteUrl": SITE, "feedpath": "https://example.com/sitemap.xml"}),
        )
        .await
        .unwrap();

    assert_eq!(payload["success"], true);
    assert_eq!(fake.writes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_malformed_arguments_fail_before_remote_call() {
    let fake = Arc::new(FakeSearchConsole::with_rows(100));
    let executor = executor(fake.clone(), AccessScope::Readonly);

    let cases = [
        ("query_search_analytics", json!({"siteUrl": SITE, "startDate": "2024-01-01"})),
        (
            "query_search_analytics",
            json!({"siteUrl": SITE, "startDate": "yesterday", "endDate": "2024-01-31"}),
        ),
        (
            "get_top_queries",
            json!({"siteUrl": SITE, "startDate": "2024-01-01", "endDate": "2024-01-31", "limit": 30000}),
        ),
        (
            "export_search_analytics",
            json!({"siteUrl": SITE, "startDate": "2024-01-01", "endDate": "2024-01-31", "limit": 100001}),
        ),
        ("inspect_url", json!({"siteUrl": SITE})),
        ("batch_inspect_urls", json!({"siteUrl": SITE, "urls": []})),
        ("weekly_summary", json!({"siteUrl": SITE, "endDate": "2024-13-01"})),
    ];

    for (tool, args) in cases {
        let err = executor.try_execute(tool, args.clone()).await.unwrap_err();
        assert!(
            matches!(err, ToolError::InvalidArguments(_)),
            "{tool} {args} should be rejected, got {err:?}"
        );
    }
    assert_eq!(fake.calls(), 0);
}

#[tokio::test]
async fn test_not_found_entities_report_found_false() {
    let fake = Arc::new(FakeSearchConsole::default().with_site(SITE));
    let executor = executor(fake, AccessScope::Readonly);

    let found = executor
        .try_execute("get_site", json!({"siteUrl": SITE}))
        .await
        .unwrap();
    assert_eq!(found["found"], true);
    assert_eq!(found["site"]["permissionLevel"], "siteOwner");

    let missing = executor
        .try_execute("get_site", json!({"siteUrl": "sc-domain:nope.com"}))
        .await
        .unwrap();
    assert_eq!(missing["found"], false);

    let sitemap = executor
        .try_execute(
            "get_sitemap",
            json!({"siteUrl": SITE, "feedpath": "https://example.com/missing.xml"}),
        )
        .await
        .unwrap();
    assert_eq!(sitemap["found"], false);
}

#[tokio::test]
async fn test_batch_inspection_reports_partial_failure() {
    let fake = Arc::new(FakeSearchConsole::default());
    let executor = executor(fake, AccessScope::Readonly);

    let payload = executor
        .try_execute(
            "batch_inspect_urls",
            json!({
                "siteUrl": SITE,
                "urls": [
                    "https://example.com/a",
                    "https://example.com/broken",
                    "https://example.com/b"
                ]
            }),
        )
        .await
        .unwrap();

    assert_eq!(payload["total"], 3);
    assert_eq!(payload["succeeded"], 2);
    assert_eq!(payload["failed"], 1);
    assert_eq!(payload["results"][1]["url"], "https://example.com/broken");
    assert_eq!(payload["results"][1]["success"], false);
    assert!(payload["results"][1]["error"]
        .as_str()
        .unwrap()
        .contains("not in property"));
    assert_eq!(
        payload["results"][2]["inspectionResult"]["indexStatusResult"]["verdict"],
        "PASS"
    );
}

#[tokio::test]
async fn test_remote_failure_becomes_error_payload() {
    let fake = Arc::new(FakeSearchConsole::default().failing_first(vec![RemoteError::Status {
        status: 403,
        message: "User does not have sufficient permission for site".to_string(),
    }]));
    let executor = executor(fake, AccessScope::Readonly);

    let outcome = executor.execute("list_sites", json!({})).await;
    assert!(outcome.is_error);
    assert_eq!(outcome.payload["kind"], "remote_error");
    assert!(outcome.payload["error"]
        .as_str()
        .unwrap()
        .contains("sufficient permission"));
}

#[tokio::test]
async fn test_compact_query_strips_property_prefix() {
    let fake = Arc::new(FakeSearchConsole::default().canned(
        "page",
        vec![
            AnalyticsRow::new(&["https://www.example.com/blog/post"], 120, 2400, 0.05, 3.44),
            AnalyticsRow::new(&["https://example.com"], 80, 4000, 0.02, 1.26),
        ],
    ));
    let executor = executor(fake, AccessScope::Readonly);

    let payload = executor
        .try_execute(
            "get_top_pages",
            json!({"siteUrl": SITE, "startDate": "2024-01-01", "endDate": "2024-01-31"}),
        )
        .await
        .unwrap();

    assert_eq!(payload["rowCount"], 2);
    assert_eq!(payload["totals"]["clicks"], 200);
    assert_eq!(payload["totals"]["impressions"], 6400);
    assert_eq!(payload["rows"][0]["key"], "/blog/post");
    assert_eq!(payload["rows"][0]["imp"], 2400);
    assert_eq!(payload["rows"][0]["ctr"], "5.00%");
    assert_eq!(payload["rows"][0]["pos"], 3.4);
    assert_eq!(payload["rows"][1]["key"], "/");
    assert_eq!(
        payload["summary"],
        "Top page '/blog/post' got 120 clicks from 2400 impressions at position 3.4"
    );
}

#[tokio::test]
async fn test_full_format_keeps_precision() {
    let fake = Arc::new(FakeSearchConsole::default().canned(
        "page",
        vec![AnalyticsRow::new(&["https://example.com/a"], 3, 56, 0.053571, 4.26)],
    ));
    let executor = executor(fake, AccessScope::Readonly);

    let payload = executor
        .try_execute(
            "query_search_analytics",
            json!({
                "siteUrl": "https://example.com/",
                "startDate": "2024-01-01",
                "endDate": "2024-01-31",
                "dimensions": ["page"],
                "format": "full"
            }),
        )
        .await
        .unwrap();

    assert!(payload.get("summary").is_none());
    assert_eq!(payload["rows"][0]["keys"][0], "/a");
    assert_eq!(payload["rows"][0]["ctr"], 0.0536);
    assert_eq!(payload["rows"][0]["position"], 4.3);
    assert_eq!(payload["rows"][0]["impressions"], 56);
}

#[tokio::test]
async fn test_export_paginates_and_defaults_to_csv() {
    let fake = Arc::new(FakeSearchConsole::with_rows(40_000));
    let executor = executor(fake.clone(), AccessScope::Readonly);

    let payload = executor
        .try_execute(
            "export_search_analytics",
            json!({
                "siteUrl": SITE,
                "startDate": "2024-01-01",
                "endDate": "2024-01-31",
                "dimensions": ["query"],
                "limit": 30000
            }),
        )
        .await
        .unwrap();

    assert_eq!(payload["rowCount"], 30_000);
    assert!(payload.get("rows").is_none());
    let csv = payload["csv"].as_str().unwrap();
    assert!(csv.starts_with("query,clicks,impressions,ctr,position\n"));
    assert_eq!(csv.lines().count(), 30_001);
    assert_eq!(fake.recorded().len(), 2);
}

#[tokio::test]
async fn test_low_ctr_opportunities_tool() {
    let fake = Arc::new(FakeSearchConsole::default().canned(
        "query,page",
        vec![
            AnalyticsRow::new(&["running shoes", "https://example.com/shoes"], 10, 1000, 0.01, 10.0),
            AnalyticsRow::new(&["trail shoes", "https://example.com/trail"], 50, 1000, 0.05, 8.0),
            AnalyticsRow::new(&["shoe sale", "https://example.com/sale"], 2, 400, 0.005, 2.0),
        ],
    ));
    let executor = executor(fake, AccessScope::Readonly);

    let payload = executor
        .try_execute(
            "find_low_ctr_opportunities",
            json!({"siteUrl": SITE, "startDate": "2024-01-01", "endDate": "2024-01-31"}),
        )
        .await
        .unwrap();

    assert_eq!(payload["analyzedRows"], 3);
    assert_eq!(payload["count"], 1);
    assert_eq!(payload["totalPotentialClicks"], 40);
    assert_eq!(payload["opportunities"][0]["query"], "running shoes");
    assert_eq!(payload["opportunities"][0]["page"], "/shoes");
    assert_eq!(payload["opportunities"][0]["potentialClicks"], 40);
}

#[tokio::test]
async fn test_cannibalization_tool() {
    let fake = Arc::new(FakeSearchConsole::default().canned(
        "query,page",
        vec![
            AnalyticsRow::new(&["shoes", "https://example.com/shoes-2019"], 5, 300, 0.016, 7.8),
            AnalyticsRow::new(&["shoes", "https://example.com/shoes"], 40, 500, 0.08, 3.2),
            AnalyticsRow::new(&["boots", "https://example.com/boots"], 40, 500, 0.08, 3.2),
        ],
    ));
    let executor = executor(fake, AccessScope::Readonly);

    let payload = executor
        .try_execute(
            "detect_cannibalization",
            json!({"siteUrl": SITE, "startDate": "2024-01-01", "endDate": "2024-01-31", "format": "full"}),
        )
        .await
        .unwrap();

    assert_eq!(payload["count"], 1);
    let issue = &payload["issues"][0];
    assert_eq!(issue["query"], "shoes");
    assert_eq!(issue["totalImpressions"], 800);
    assert_eq!(issue["pages"][0]["page"], "https://example.com/shoes");
    assert!(issue["recommendation"]
        .as_str()
        .unwrap()
        .starts_with("Consider consolidating"));
}

#[tokio::test]
async fn test_analysis_metrics_follow_requested_format() {
    let fake = Arc::new(FakeSearchConsole::default().canned(
        "query,page",
        vec![
            AnalyticsRow::new(&["wide shoes", "https://example.com/wide"], 4, 1200, 0.0033333333, 12.98765),
            AnalyticsRow::new(&["wide shoes", "https://example.com/wide-fit"], 1, 100, 0.0123456789, 10.23456),
        ],
    ));
    let executor = executor(fake, AccessScope::Readonly);
    let args = |format: &str| {
        json!({"siteUrl": SITE, "startDate": "2024-01-01", "endDate": "2024-01-31", "format": format})
    };

    let compact = executor
        .try_execute("find_low_ctr_opportunities", args("compact"))
        .await
        .unwrap();
    let opportunity = &compact["opportunities"][0];
    assert_eq!(opportunity["page"], "/wide");
    assert_eq!(opportunity["ctr"], "0.33%");
    assert_eq!(opportunity["position"], 13.0);

    let full = executor
        .try_execute("find_low_ctr_opportunities", args("full"))
        .await
        .unwrap();
    let opportunity = &full["opportunities"][0];
    assert_eq!(opportunity["ctr"], 0.0033);
    assert_eq!(opportunity["position"], 13.0);

    let compact = executor
        .try_execute("detect_cannibalization", args("compact"))
        .await
        .unwrap();
    let page = &compact["issues"][0]["pages"][0];
    assert_eq!(page["page"], "/wide-fit");
    assert_eq!(page["ctr"], "1.23%");
    assert_eq!(page["position"], 10.2);

    let full = executor
        .try_execute("detect_cannibalization", args("full"))
        .await
        .unwrap();
    let page = &full["issues"][0]["pages"][0];
    assert_eq!(page["page"], "https://example.com/wide-fit");
    assert_eq!(page["ctr"], 0.0123);
    assert_eq!(page["position"], 10.2);
}

#[tokio::test]
async fn test_compare_periods_tool() {
    let fake = Arc::new(FakeSearchConsole::default().canned(
        "",
        vec![AnalyticsRow {
            keys: None,
            clicks: 100,
            impressions: 1000,
            ctr: 0.1,
            position: 5.0,
        }],
    ));
    let executor = executor(fake.clone(), AccessScope::Readonly);

    let payload = executor
        .try_execute(
            "compare_periods",
            json!({
                "siteUrl": SITE,
                "period1StartDate": "2024-02-01",
                "period1EndDate": "2024-02-29",
                "period2StartDate": "2024-01-01",
                "period2EndDate": "2024-01-31"
            }),
        )
        .await
        .unwrap();

    assert_eq!(payload["period1"]["startDate"], "2024-02-01");
    assert_eq!(payload["period2"]["endDate"], "2024-01-31");
    assert_eq!(payload["delta"]["clicksChange"], "+0.0%");
    assert_eq!(payload["delta"]["position"], "+0.0");

    let mut starts: Vec<String> = fake.recorded().into_iter().map(|r| r.start_date).collect();
    starts.sort();
    assert_eq!(starts, vec!["2024-01-01", "2024-02-01"]);
}

#[tokio::test]
async fn test_weekly_summary_tool_uses_explicit_end_date() {
    let fake = Arc::new(FakeSearchConsole::with_rows(3));
    let executor = executor(fake.clone(), AccessScope::Readonly);

    let payload = executor
        .try_execute(
            "weekly_summary",
            json!({"siteUrl": SITE, "endDate": "2024-03-14"}),
        )
        .await
        .unwrap();

    assert_eq!(payload["currentWeek"]["startDate"], "2024-03-08");
    assert_eq!(payload["previousWeek"]["endDate"], "2024-03-07");
    assert!(payload["delta"].is_object());
    assert_eq!(fake.recorded().len(), 5);
}
