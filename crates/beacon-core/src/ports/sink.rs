//! 원격 싱크 포트.
//!
//! 구현: `beacon-network` (HTTP), `beacon-storage` (SQLite)

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::models::error_event::ErrorStatistics;
use crate::models::record::{StoreName, TelemetryRecord};

/// 추가 전용(append-only) 레코드 싱크
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// 배치를 지정 저장소에 삽입
    ///
    /// 성공 시 배치는 전달된 것으로 간주된다. 실패 시 호출자가 재큐잉한다.
    /// 성공 응답이 유실되면 같은 레코드가 다시 전달될 수 있다 (at-least-once).
    async fn insert(&self, store: StoreName, records: &[TelemetryRecord]) -> Result<(), CoreError>;
}

/// 에러 저장소 집계 조회 (대시보드용 읽기 경로)
#[async_trait]
pub trait ErrorStatisticsSource: Send + Sync {
    /// `since` 이후 구간의 심각도/분류별 집계와 전체 건수 조회
    async fn error_statistics(&self, since: DateTime<Utc>) -> Result<ErrorStatistics, CoreError>;
}
