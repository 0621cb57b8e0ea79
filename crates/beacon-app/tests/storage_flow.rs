//! 저장소 흐름 통합 테스트.
//!
//! 설정 → SQLite 싱크 와이어링 → 수집 → 종료 플러시 → 재오픈 후 검증.

use beacon_app::wiring::{build_sinks, telemetry_builder};
use beacon_collector::errors::ErrorReport;
use beacon_core::config::AppConfig;
use beacon_core::models::error_event::{ErrorCategory, ErrorSeverity};
use beacon_core::models::event::EventDetail;
use beacon_core::models::observation::{FaultKind, FaultReport, ObservationEntry};
use beacon_core::models::record::{Attributes, StoreName};
use beacon_network::batch_dispatcher::FlushOutcome;
use beacon_storage::sqlite::SqliteRecordSink;
use futures::future::join_all;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn sqlite_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default_config();
    config.sink.db_path = Some(dir.path().join("beacon.db"));
    config.performance.enabled = false;
    config
}

#[tokio::test]
async fn events_and_errors_survive_restart() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(&dir);

    let sinks = build_sinks(&config).unwrap();
    let (builder, hub) = telemetry_builder(config, sinks);
    let telemetry = builder.build().unwrap();
    telemetry.start();

    telemetry.usage().track_page_view("/pipeline", Some("Pipeline"));
    let fields: Attributes = serde_json::from_value(json!({
        "company": "ACME",
        "credit_card": "4111 1111 1111 1111"
    }))
    .unwrap();
    telemetry.usage().track_form_submit("deal", fields, true);
    telemetry.errors().track_error(
        ErrorReport::new("dashboard 렌더링 실패")
            .with_severity(ErrorSeverity::Low)
            .with_category(ErrorCategory::Validation),
    );
    hub.publish(ObservationEntry::Fault(FaultReport {
        kind: FaultKind::Uncaught,
        message: "TypeError: x is undefined".to_string(),
        stack: None,
        file: Some("app.js".to_string()),
        line: Some(10),
        column: Some(3),
        component_trail: vec![],
    }));

    let report = telemetry.shutdown().await;
    assert_eq!(report.errors, FlushOutcome::Delivered(2));
    drop(telemetry);

    let reopened = SqliteRecordSink::open(&dir.path().join("beacon.db"), 30).unwrap();
    // 페이지 뷰, 폼 제출, 종료 이벤트
    assert_eq!(reopened.count(StoreName::UsageEvents).unwrap(), 3);
    assert_eq!(reopened.count(StoreName::ErrorLogs).unwrap(), 2);

    let events = reopened.recent(StoreName::UsageEvents, 10).unwrap();
    let raw = serde_json::to_string(&events).unwrap();
    assert!(!raw.contains("4111"));
    assert!(events
        .iter()
        .any(|r| matches!(r.event(), Some(EventDetail::FormSubmit { fields, .. }) if fields["company"] == json!("ACME"))));
}

#[tokio::test]
async fn error_statistics_from_sqlite() {
    let dir = TempDir::new().unwrap();
    let config = sqlite_config(&dir);

    let sinks = build_sinks(&config).unwrap();
    let (builder, _hub) = telemetry_builder(config, sinks);
    let telemetry = builder.build().unwrap();

    for severity in [ErrorSeverity::High, ErrorSeverity::High, ErrorSeverity::Low] {
        telemetry
            .errors()
            .track_error(ErrorReport::new("boom").with_severity(severity));
    }
    assert_eq!(telemetry.errors().flush_now().await, FlushOutcome::Delivered(3));

    let stats = telemetry.errors().error_statistics().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.last_24h, 3);
    assert_eq!(stats.by_severity.get(&ErrorSeverity::High), Some(&2));
    assert_eq!(stats.by_category.get(&ErrorCategory::ScriptFault), Some(&3));
}

#[tokio::test]
async fn concurrent_producers_lose_nothing() {
    let dir = TempDir::new().unwrap();
    let mut config = sqlite_config(&dir);
    config.usage.capacity = 10;
    config.usage.max_buffered = Some(1_000);

    let (builder, _hub) = telemetry_builder(config.clone(), build_sinks(&config).unwrap());
    let telemetry = Arc::new(builder.build().unwrap());
    telemetry.start();

    let producers = (0..4).map(|worker| {
        let telemetry = telemetry.clone();
        tokio::spawn(async move {
            for i in 0..25 {
                telemetry
                    .usage()
                    .track_search(&format!("w{worker}-q{i}"), None);
                tokio::task::yield_now().await;
            }
        })
    });
    for joined in join_all(producers).await {
        joined.unwrap();
    }

    telemetry.shutdown().await;
    let reopened = SqliteRecordSink::open(&dir.path().join("beacon.db"), 30).unwrap();
    // 검색 100개 + 종료 이벤트
    assert_eq!(reopened.count(StoreName::UsageEvents).unwrap(), 101);
    assert_eq!(telemetry.stats().usage.dropped, 0);
}
