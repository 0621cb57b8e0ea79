//! 에러 레코드 모델.
//!
//! 미처리 예외, 거부된 비동기 작업, API/네트워크/성능/상호작용 에러와
//! 에러 시점의 성능 스냅샷, 대시보드용 집계 통계를 정의.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::metric::MetricName;

/// 에러 심각도
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Low => "low",
            ErrorSeverity::Medium => "medium",
            ErrorSeverity::High => "high",
            ErrorSeverity::Critical => "critical",
        }
    }

    /// HTTP 상태 코드에서 심각도 도출 (≥500 high, ≥400 medium, 그 외 low)
    pub fn from_http_status(status: u16) -> Self {
        if status >= 500 {
            ErrorSeverity::High
        } else if status >= 400 {
            ErrorSeverity::Medium
        } else {
            ErrorSeverity::Low
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(ErrorSeverity::Low),
            "medium" => Some(ErrorSeverity::Medium),
            "high" => Some(ErrorSeverity::High),
            "critical" => Some(ErrorSeverity::Critical),
            _ => None,
        }
    }
}

/// 에러 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    ScriptFault,
    Network,
    Api,
    Auth,
    Validation,
    Performance,
    Security,
    UserInteraction,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::ScriptFault => "script-fault",
            ErrorCategory::Network => "network",
            ErrorCategory::Api => "api",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Performance => "performance",
            ErrorCategory::Security => "security",
            ErrorCategory::UserInteraction => "user-interaction",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "script-fault" => Some(ErrorCategory::ScriptFault),
            "network" => Some(ErrorCategory::Network),
            "api" => Some(ErrorCategory::Api),
            "auth" => Some(ErrorCategory::Auth),
            "validation" => Some(ErrorCategory::Validation),
            "performance" => Some(ErrorCategory::Performance),
            "security" => Some(ErrorCategory::Security),
            "user-interaction" => Some(ErrorCategory::UserInteraction),
            _ => None,
        }
    }
}

/// 에러 시점의 페이지 성능 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_load_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_contentful_paint_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub largest_contentful_paint_ms: Option<f64>,
    /// 사용 가능한 경우에만 채워짐
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heap_used_bytes: Option<u64>,
}

/// API 호출 실패 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiFailure {
    pub method: String,
    pub url: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<serde_json::Value>,
}

/// 에러 출처별 상세
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ErrorDetail {
    /// 미처리 스크립트 예외
    ScriptFault {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<u32>,
    },
    /// 처리되지 않은 비동기 거부
    UnhandledRejection {
        reason: String,
    },
    /// 컴포넌트 경계에서 잡힌 에러
    ComponentBoundary {
        component: String,
    },
    /// Rust panic (panic hook 경유)
    Panic {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thread: Option<String>,
    },
    Api(ApiFailure),
    Network {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        method: Option<String>,
    },
    Performance {
        metric: MetricName,
        value: f64,
        threshold: f64,
    },
    Interaction {
        action: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        element: Option<String>,
    },
    /// 호출자가 직접 보고한 일반 에러
    Reported,
}

/// 에러 레코드 페이로드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    pub severity: ErrorSeverity,
    pub category: ErrorCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// 발생 컴포넌트 경로 (바깥 → 안쪽)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub component_trail: Vec<String>,
    pub performance: PerformanceSnapshot,
    pub detail: ErrorDetail,
}

/// 에러 저장소 집계 (대시보드 조회용)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorStatistics {
    /// 저장소 전체 에러 수
    pub total: u64,
    /// 최근 24시간 심각도별 수
    pub by_severity: BTreeMap<ErrorSeverity, u64>,
    /// 최근 24시간 분류별 수
    pub by_category: BTreeMap<ErrorCategory, u64>,
    /// 최근 24시간 에러 수
    pub last_24h: u64,
}
