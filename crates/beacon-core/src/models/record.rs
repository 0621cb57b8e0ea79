//! 텔레메트리 레코드 (공통 봉투).
//!
//! 모든 수집기가 큐에 쌓는 단일 레코드 타입. 레코드 종류별 데이터는
//! `RecordPayload` tagged enum으로 표현한다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::context::EnvironmentContext;
use super::error_event::ErrorPayload;
use super::event::EventDetail;
use super::metric::MetricRecord;

/// 자유 형식 속성 (폼 필드, 메타데이터 등)
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// 원격 싱크의 논리 저장소
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreName {
    /// 사용 이벤트 저장소 (성능 알림도 이벤트로 기록됨)
    UsageEvents,
    /// 에러 로그 저장소
    ErrorLogs,
}

impl StoreName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreName::UsageEvents => "usage_events",
            StoreName::ErrorLogs => "error_logs",
        }
    }
}

impl std::fmt::Display for StoreName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 레코드 종류별 데이터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum RecordPayload {
    Event(EventDetail),
    Error(ErrorPayload),
    Metric(MetricRecord),
}

impl RecordPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            RecordPayload::Event(_) => "event",
            RecordPayload::Error(_) => "error",
            RecordPayload::Metric(_) => "metric",
        }
    }
}

/// 텔레메트리 레코드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// 생성 시 부여되는 고유 ID (재사용 없음)
    pub id: Uuid,
    /// 생성 시각 (전송 시각 아님)
    pub timestamp: DateTime<Utc>,
    /// 세션 수명 동안 고정된 ID
    pub session_id: String,
    /// 인증된 사용자 ID (익명 세션이면 None)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub context: EnvironmentContext,
    pub payload: RecordPayload,
}

impl TelemetryRecord {
    /// 새 레코드 생성: ID와 타임스탬프를 지금 부여한다
    pub fn new(
        session_id: String,
        user_id: Option<String>,
        context: EnvironmentContext,
        payload: RecordPayload,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            session_id,
            user_id,
            context,
            payload,
        }
    }

    /// 이벤트 레코드이면 이벤트 상세 반환
    pub fn event(&self) -> Option<&EventDetail> {
        match &self.payload {
            RecordPayload::Event(detail) => Some(detail),
            _ => None,
        }
    }

    /// 에러 레코드이면 에러 페이로드 반환
    pub fn error(&self) -> Option<&ErrorPayload> {
        match &self.payload {
            RecordPayload::Error(payload) => Some(payload),
            _ => None,
        }
    }
}
