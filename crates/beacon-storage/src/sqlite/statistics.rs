//! 에러 저장소 집계 (ErrorStatisticsSource 포트 구현).

use async_trait::async_trait;
use beacon_core::error::CoreError;
use beacon_core::models::error_event::{ErrorCategory, ErrorSeverity, ErrorStatistics};
use beacon_core::models::record::StoreName;
use beacon_core::ports::sink::ErrorStatisticsSource;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, warn};

use super::records::format_timestamp;
use super::SqliteRecordSink;

impl SqliteRecordSink {
    /// 에러 저장소 집계
    ///
    /// `total`은 전체 기간, 나머지는 `since` 이후 구간 기준.
    pub fn query_error_statistics(&self, since: DateTime<Utc>) -> Result<ErrorStatistics, CoreError> {
        let since = format_timestamp(since);
        let store = StoreName::ErrorLogs.as_str();
        let conn = self.lock()?;

        let total: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM records WHERE store = ?1",
                rusqlite::params![store],
                |row| row.get(0),
            )
            .map_err(|e| CoreError::Storage(format!("에러 총계 조회 실패: {e}")))?;

        let last_24h: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM records WHERE store = ?1 AND timestamp >= ?2",
                rusqlite::params![store, since],
                |row| row.get(0),
            )
            .map_err(|e| CoreError::Storage(format!("구간 에러 수 조회 실패: {e}")))?;

        let mut stats = ErrorStatistics {
            total: total.max(0) as u64,
            last_24h: last_24h.max(0) as u64,
            ..Default::default()
        };

        for (value, count) in grouped_counts(&conn, "severity", store, &since)? {
            match ErrorSeverity::parse(&value) {
                Some(severity) => {
                    stats.by_severity.insert(severity, count);
                }
                None => warn!("알 수 없는 심각도 무시: {value}"),
            }
        }

        for (value, count) in grouped_counts(&conn, "category", store, &since)? {
            match ErrorCategory::parse(&value) {
                Some(category) => {
                    stats.by_category.insert(category, count);
                }
                None => warn!("알 수 없는 분류 무시: {value}"),
            }
        }

        debug!(
            "에러 통계: 전체 {}, 구간 {}",
            stats.total, stats.last_24h
        );
        Ok(stats)
    }
}

/// 컬럼별 그룹 집계. `column`은 내부 상수만 전달된다
fn grouped_counts(
    conn: &Connection,
    column: &str,
    store: &str,
    since: &str,
) -> Result<Vec<(String, u64)>, CoreError> {
    let sql = format!(
        "SELECT {column}, COUNT(*) FROM records
         WHERE store = ?1 AND timestamp >= ?2 AND {column} IS NOT NULL
         GROUP BY {column}"
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| CoreError::Storage(format!("쿼리 준비 실패: {e}")))?;

    let rows = stmt
        .query_map(rusqlite::params![store, since], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })
        .map_err(|e| CoreError::Storage(format!("쿼리 실행 실패: {e}")))?;

    let mut counts = Vec::new();
    for row in rows {
        let (value, count) = row.map_err(|e| CoreError::Storage(format!("행 읽기 실패: {e}")))?;
        counts.push((value, count.max(0) as u64));
    }
    Ok(counts)
}

#[async_trait]
impl ErrorStatisticsSource for SqliteRecordSink {
    async fn error_statistics(&self, since: DateTime<Utc>) -> Result<ErrorStatistics, CoreError> {
        self.query_error_statistics(since)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::models::context::EnvironmentContext;
    use beacon_core::models::error_event::{ErrorDetail, ErrorPayload, PerformanceSnapshot};
    use beacon_core::models::record::{RecordPayload, TelemetryRecord};
    use chrono::Duration;

    fn error_record(
        severity: ErrorSeverity,
        category: ErrorCategory,
        age: Duration,
    ) -> TelemetryRecord {
        let mut record = TelemetryRecord::new(
            "sess_stats".to_string(),
            None,
            EnvironmentContext::default(),
            RecordPayload::Error(ErrorPayload {
                message: "failure".to_string(),
                severity,
                category,
                stack: None,
                component_trail: vec![],
                performance: PerformanceSnapshot::default(),
                detail: ErrorDetail::Reported,
            }),
        );
        record.timestamp = Utc::now() - age;
        record
    }

    #[tokio::test]
    async fn statistics_split_all_time_and_window() {
        let sink = SqliteRecordSink::open_in_memory(30).unwrap();
        let records = vec![
            error_record(ErrorSeverity::High, ErrorCategory::Api, Duration::minutes(5)),
            error_record(ErrorSeverity::High, ErrorCategory::Network, Duration::hours(2)),
            error_record(ErrorSeverity::Low, ErrorCategory::Api, Duration::hours(3)),
            // 24시간 밖
            error_record(ErrorSeverity::Critical, ErrorCategory::ScriptFault, Duration::days(3)),
        ];
        sink.insert_batch(StoreName::ErrorLogs, &records).unwrap();

        let stats = sink
            .error_statistics(Utc::now() - Duration::hours(24))
            .await
            .unwrap();

        assert_eq!(stats.total, 4);
        assert_eq!(stats.last_24h, 3);
        assert_eq!(stats.by_severity.get(&ErrorSeverity::High), Some(&2));
        assert_eq!(stats.by_severity.get(&ErrorSeverity::Low), Some(&1));
        assert_eq!(stats.by_severity.get(&ErrorSeverity::Critical), None);
        assert_eq!(stats.by_category.get(&ErrorCategory::Api), Some(&2));
        assert_eq!(stats.by_category.get(&ErrorCategory::Network), Some(&1));
    }

    #[test]
    fn usage_events_are_not_counted() {
        use beacon_core::models::event::EventDetail;

        let sink = SqliteRecordSink::open_in_memory(30).unwrap();
        let event = TelemetryRecord::new(
            "sess_stats".to_string(),
            None,
            EnvironmentContext::default(),
            RecordPayload::Event(EventDetail::PageView {
                path: "/".to_string(),
                title: None,
            }),
        );
        sink.insert_batch(StoreName::UsageEvents, &[event]).unwrap();

        let stats = sink
            .query_error_statistics(Utc::now() - Duration::hours(24))
            .unwrap();
        assert_eq!(stats, ErrorStatistics::default());
    }
}
