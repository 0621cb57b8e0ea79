//! 레코드 저장 (RecordSink 포트 구현).
//!
//! 배치 삽입, 저장소별 조회, 보존 정책 적용.

use async_trait::async_trait;
use beacon_core::error::CoreError;
use beacon_core::models::record::{RecordPayload, StoreName, TelemetryRecord};
use beacon_core::ports::sink::RecordSink;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use tracing::{debug, info};

use super::SqliteRecordSink;

/// 정렬 가능한 고정 형식 타임스탬프 (UTC, 밀리초, `Z` 접미사)
pub(super) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl SqliteRecordSink {
    /// 여러 레코드를 한 트랜잭션으로 저장
    ///
    /// 같은 ID가 이미 있으면 무시한다 (재전송된 배치의 중복 제거).
    /// 새로 삽입된 레코드 수를 반환한다.
    pub fn insert_batch(
        &self,
        store: StoreName,
        records: &[TelemetryRecord],
    ) -> Result<usize, CoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| CoreError::Storage(format!("트랜잭션 시작 실패: {e}")))?;

        let mut inserted = 0;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT OR IGNORE INTO records
                        (id, store, kind, timestamp, session_id, user_id, event_type, severity, category, data)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                )
                .map_err(|e| CoreError::Storage(format!("쿼리 준비 실패: {e}")))?;

            for record in records {
                let (event_type, severity, category) = match &record.payload {
                    RecordPayload::Event(detail) => (Some(detail.event_type().as_str()), None, None),
                    RecordPayload::Error(error) => (
                        None,
                        Some(error.severity.as_str()),
                        Some(error.category.as_str()),
                    ),
                    RecordPayload::Metric(_) => (None, None, None),
                };
                let data = serde_json::to_string(record)?;

                inserted += stmt
                    .execute(rusqlite::params![
                        record.id.to_string(),
                        store.as_str(),
                        record.payload.kind(),
                        format_timestamp(record.timestamp),
                        record.session_id,
                        record.user_id,
                        event_type,
                        severity,
                        category,
                        data,
                    ])
                    .map_err(|e| CoreError::Storage(format!("배치 저장 실패: {e}")))?;
            }
        }

        tx.commit()
            .map_err(|e| CoreError::Storage(format!("트랜잭션 커밋 실패: {e}")))?;

        if inserted < records.len() {
            debug!(
                "[{store}] 중복 레코드 {}개 무시",
                records.len() - inserted
            );
        }
        debug!("[{store}] 레코드 배치 저장: {inserted}개");
        Ok(inserted)
    }

    /// 저장소의 레코드 수
    pub fn count(&self, store: StoreName) -> Result<u64, CoreError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM records WHERE store = ?1",
                rusqlite::params![store.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| CoreError::Storage(format!("레코드 수 조회 실패: {e}")))?;
        Ok(count.max(0) as u64)
    }

    /// 저장소의 최근 레코드 (최신순)
    pub fn recent(&self, store: StoreName, limit: usize) -> Result<Vec<TelemetryRecord>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT data FROM records WHERE store = ?1
                 ORDER BY timestamp DESC, rowid DESC LIMIT ?2",
            )
            .map_err(|e| CoreError::Storage(format!("쿼리 준비 실패: {e}")))?;

        let rows = stmt
            .query_map(rusqlite::params![store.as_str(), limit as i64], |row| {
                row.get::<_, String>(0)
            })
            .map_err(|e| CoreError::Storage(format!("쿼리 실행 실패: {e}")))?;

        let mut records = Vec::new();
        for row in rows {
            let data = row.map_err(|e| CoreError::Storage(format!("행 읽기 실패: {e}")))?;
            records.push(serde_json::from_str(&data)?);
        }
        Ok(records)
    }

    /// 보존 기간이 지난 레코드 삭제
    pub fn enforce_retention(&self) -> Result<usize, CoreError> {
        let cutoff = format_timestamp(Utc::now() - Duration::days(self.retention_days as i64));

        let conn = self.lock()?;
        let deleted = conn
            .execute(
                "DELETE FROM records WHERE timestamp < ?1",
                rusqlite::params![cutoff],
            )
            .map_err(|e| CoreError::Storage(format!("보존 정책 적용 실패: {e}")))?;

        if deleted > 0 {
            info!(
                "보존 정책: {deleted}개 레코드 삭제 (>{} 일)",
                self.retention_days
            );
        }
        Ok(deleted)
    }
}

#[async_trait]
impl RecordSink for SqliteRecordSink {
    async fn insert(&self, store: StoreName, records: &[TelemetryRecord]) -> Result<(), CoreError> {
        self.insert_batch(store, records).map(|_| ())
    }
}
