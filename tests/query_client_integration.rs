//! Query client integration tests
//!
//! Pagination, retry and not-found handling against the in-memory service.

mod common;

use chrono::NaiveDate;
use common::{client, FakeSearchConsole, SITE};
use gsc_insights::client::{RemoteError, RetryConfig, SearchConsoleClient};
use gsc_insights::models::{Dimension, QueryDescriptor};
use std::sync::Arc;

fn descriptor(row_limit: u32) -> QueryDescriptor {
    QueryDescriptor::new(
        SITE,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
    )
    .with_dimensions(vec![Dimension::Query])
    .with_row_limit(row_limit)
}

fn unavailable() -> RemoteError {
    RemoteError::Status {
        status: 503,
        message: "Backend Error".to_string(),
    }
}

#[tokio::test]
async fn test_large_limit_is_paginated_in_service_sized_pages() {
    let fake = Arc::new(FakeSearchConsole::with_rows(80_000));
    let result = client(fake.clone()).execute(&descriptor(60_000)).await.unwrap();

    assert_eq!(result.rows.len(), 60_000);
    assert_eq!(result.aggregation_type.as_deref(), Some("byProperty"));

    let requests = fake.recorded();
    let offsets: Vec<u32> = requests.iter().map(|r| r.start_row).collect();
    let limits: Vec<u32> = requests.iter().map(|r| r.row_limit).collect();
    assert_eq!(offsets, vec![0, 25_000, 50_000]);
    assert_eq!(limits, vec![25_000, 25_000, 10_000]);

    // Pages are stitched in order
    assert_eq!(result.rows[25_000].first_key(), Some("q25000"));
    assert_eq!(result.rows[59_999].first_key(), Some("q59999"));
}

#[tokio::test]
async fn test_pagination_stops_on_short_page() {
    let fake = Arc::new(FakeSearchConsole::with_rows(30_000));
    let result = client(fake.clone()).execute(&descriptor(60_000)).await.unwrap();

    assert_eq!(result.rows.len(), 30_000);
    assert_eq!(fake.recorded().len(), 2);
}

#[tokio::test]
async fn test_pagination_stops_on_empty_page() {
    let fake = Arc::new(FakeSearchConsole::with_rows(50_000));
    let result = client(fake.clone()).execute(&descriptor(75_000)).await.unwrap();

    assert_eq!(result.rows.len(), 50_000);
    // Third page comes back empty
    assert_eq!(fake.recorded().len(), 3);
}

#[tokio::test]
async fn test_limit_within_service_maximum_is_one_call() {
    for limit in [1, 25, 25_000] {
        let fake = Arc::new(FakeSearchConsole::with_rows(100_000));
        let result = client(fake.clone()).execute(&descriptor(limit)).await.unwrap();

        assert_eq!(result.rows.len(), limit as usize);
        let requests = fake.recorded();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].row_limit, limit);
        assert_eq!(requests[0].start_row, 0);
    }
}

#[tokio::test]
async fn test_request_carries_descriptor_fields() {
    let fake = Arc::new(FakeSearchConsole::with_rows(10));
    client(fake.clone())
        .execute(&descriptor(10).with_start_row(5))
        .await
        .unwrap();

    let request = &fake.recorded()[0];
    assert_eq!(request.start_date, "2024-01-01");
    assert_eq!(request.end_date, "2024-03-31");
    assert_eq!(request.dimensions, vec![Dimension::Query]);
    assert_eq!(request.start_row, 5);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let fake = Arc::new(
        FakeSearchConsole::with_rows(10).failing_first(vec![
            unavailable(),
            RemoteError::Network("connection reset by peer".to_string()),
            RemoteError::Status {
                status: 403,
                message: "Quota exceeded for quota metric 'Queries'".to_string(),
            },
        ]),
    );

    let result = client(fake.clone()).execute(&descriptor(10)).await.unwrap();
    assert_eq!(result.rows.len(), 10);
    assert_eq!(fake.calls(), 4);
}

#[tokio::test]
async fn test_retries_exhausted_after_four_attempts() {
    let fake = Arc::new(
        FakeSearchConsole::with_rows(10).failing_first((0..10).map(|_| unavailable()).collect()),
    );

    let err = client(fake.clone()).execute(&descriptor(10)).await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert_eq!(fake.calls(), 4);
}

#[tokio::test]
async fn test_permanent_failure_is_not_retried() {
    let fake = Arc::new(FakeSearchConsole::with_rows(10).failing_first(vec![
        RemoteError::Status {
            status: 401,
            message: "Request had invalid authentication credentials.".to_string(),
        },
    ]));

    let err = client(fake.clone()).execute(&descriptor(10)).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(fake.calls(), 1);
}

#[tokio::test]
async fn test_retry_budget_is_configurable() {
    let fake = Arc::new(
        FakeSearchConsole::with_rows(10).failing_first((0..10).map(|_| unavailable()).collect()),
    );
    let client = SearchConsoleClient::with_retry_config(
        fake.clone(),
        RetryConfig {
            max_retries: 1,
            base_delay_ms: 1,
        },
    );

    assert!(client.execute(&descriptor(10)).await.is_err());
    assert_eq!(fake.calls(), 2);
}

#[tokio::test]
async fn test_get_operations_map_not_found_to_none() {
    let fake = Arc::new(
        FakeSearchConsole::default()
            .with_site(SITE)
            .with_sitemap("https://example.com/sitemap.xml"),
    );
    let client = client(fake);

    assert!(client.get_site(SITE).await.unwrap().is_some());
    assert!(client.get_site("sc-domain:other.com").await.unwrap().is_none());
    assert!(client
        .get_sitemap(SITE, "https://example.com/sitemap.xml")
        .await
        .unwrap()
        .is_some());
    assert!(client
        .get_sitemap(SITE, "https://example.com/missing.xml")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_batch_inspection_keeps_order_and_isolates_failures() {
    let fake = Arc::new(FakeSearchConsole::default());
    let urls: Vec<String> = (0..25)
        .map(|i| {
            if i % 5 == 0 {
                format!("https://example.com/broken-{i}")
            } else {
                format!("https://example.com/page-{i}")
            }
        })
        .collect();

    let outcomes = client(fake).inspect_urls(SITE, &urls).await;

    assert_eq!(outcomes.len(), 25);
    for (outcome, url) in outcomes.iter().zip(&urls) {
        assert_eq!(&outcome.url, url);
        assert_eq!(outcome.success, !url.contains("broken"));
        assert_eq!(outcome.error.is_some(), url.contains("broken"));
    }
}

#[tokio::test]
async fn test_batch_inspection_runs_on_spawned_task() {
    let client = client(Arc::new(FakeSearchConsole::default()));
    let urls = vec![
        "https://example.com/a".to_string(),
        "https://example.com/broken".to_string(),
    ];

    let outcomes = tokio::spawn(async move { client.inspect_urls(SITE, &urls).await })
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].success);
    assert!(!outcomes[1].success);
}
