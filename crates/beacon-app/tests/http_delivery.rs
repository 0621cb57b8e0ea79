//! HTTP 싱크 전송 통합 테스트 (mockito).

use beacon_app::settings::CliOverrides;
use beacon_app::wiring::{build_sinks, telemetry_builder};
use beacon_core::config::{AppConfig, SinkKind};
use beacon_core::models::error_event::{ApiFailure, ErrorSeverity};
use beacon_network::batch_dispatcher::FlushOutcome;
use mockito::Matcher;
use serde_json::json;

fn http_config(url: &str) -> AppConfig {
    let mut config = AppConfig::default_config();
    CliOverrides {
        server: Some(url.to_string()),
        ..CliOverrides::default()
    }
    .apply(&mut config);
    config.sink.api_key = Some("test-key".to_string());
    config.performance.enabled = false;
    config
}

#[tokio::test]
async fn batches_are_posted_per_store() {
    let mut server = mockito::Server::new_async().await;
    let usage = server
        .mock("POST", "/stores/usage_events/records")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::Regex("\"path\":\"/pricing\"".to_string()))
        .with_status(201)
        .expect(1)
        .create_async()
        .await;
    let errors = server
        .mock("POST", "/stores/error_logs/records")
        .match_body(Matcher::Regex("\"status\":503".to_string()))
        .with_status(201)
        .expect(1)
        .create_async()
        .await;

    let config = http_config(&server.url());
    assert_eq!(config.sink.kind, SinkKind::Http);
    let sinks = build_sinks(&config).unwrap();
    let (builder, _hub) = telemetry_builder(config, sinks);
    let telemetry = builder.build().unwrap();
    telemetry.start();

    telemetry.usage().track_page_view("/pricing", None);
    telemetry.errors().track_api_error(ApiFailure {
        method: "GET".to_string(),
        url: "/api/plans".to_string(),
        status: 503,
        message: None,
        request_body: None,
        response_body: Some(json!({"retry": true})),
    });

    let report = telemetry.shutdown().await;
    assert_eq!(report.usage, FlushOutcome::Delivered(2));
    assert_eq!(report.errors, FlushOutcome::Delivered(1));

    usage.assert_async().await;
    errors.assert_async().await;
}

#[tokio::test]
async fn rejected_batch_stays_queued() {
    let mut server = mockito::Server::new_async().await;
    let rejected = server
        .mock("POST", "/stores/error_logs/records")
        .with_status(503)
        .with_body("maintenance")
        .expect(1)
        .create_async()
        .await;

    let config = http_config(&server.url());
    let sinks = build_sinks(&config).unwrap();
    let (builder, _hub) = telemetry_builder(config, sinks);
    let telemetry = builder.build().unwrap();

    telemetry.errors().track_network_error("/api/sync", Some("POST"), "timeout");
    assert_eq!(telemetry.errors().flush_now().await, FlushOutcome::Failed(1));
    rejected.assert_async().await;

    let stats = telemetry.errors().stats();
    assert_eq!(stats.sealed + stats.live, 1);
    assert_eq!(stats.consecutive_failures, 1);
}

#[tokio::test]
async fn statistics_are_fetched_from_server() {
    let mut server = mockito::Server::new_async().await;
    let statistics = server
        .mock("GET", "/stores/error_logs/statistics")
        .match_query(Matcher::Regex("since=".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "total": 12,
                "by_severity": {"critical": 1, "medium": 4},
                "by_category": {"api": 5},
                "last_24h": 5
            })
            .to_string(),
        )
        .create_async()
        .await;

    let config = http_config(&server.url());
    let sinks = build_sinks(&config).unwrap();
    let (builder, _hub) = telemetry_builder(config, sinks);
    let telemetry = builder.build().unwrap();

    let stats = telemetry.errors().error_statistics().await.unwrap();
    assert_eq!(stats.total, 12);
    assert_eq!(stats.by_severity.get(&ErrorSeverity::Critical), Some(&1));
    statistics.assert_async().await;
}
