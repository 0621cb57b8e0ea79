//! 애플리케이션 설정 구조체.
//!
//! 싱크 연결, 수집기별 큐 용량/플러시 주기, 전송 타임아웃/백오프,
//! 성능 관찰, 프라이버시, 환경 컨텍스트 설정을 정의한다.
//! `ConfigManager`가 JSON 파일에서 로드하고, 바이너리가 환경변수/CLI로 덮어쓴다.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::models::context::Dimensions;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 원격 싱크 설정
    #[serde(default)]
    pub sink: SinkConfig,
    /// 사용 이벤트 수집기 설정
    #[serde(default)]
    pub usage: UsageConfig,
    /// 에러 수집기 설정
    #[serde(default)]
    pub errors: ErrorsConfig,
    /// 성능 수집기 설정
    #[serde(default)]
    pub performance: PerformanceConfig,
    /// 전송(플러시) 설정
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// 프라이버시 설정
    #[serde(default)]
    pub privacy: PrivacyConfig,
    /// 환경 컨텍스트 기본값
    #[serde(default)]
    pub context: ContextConfig,
}

// ============================================================
// 싱크 설정
// ============================================================

/// 싱크 종류
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// 로컬 SQLite 저장소
    #[default]
    Sqlite,
    /// HTTP 원격 저장소
    Http,
}

/// 원격 싱크 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub kind: SinkKind,
    /// HTTP 싱크 베이스 URL
    #[serde(default)]
    pub endpoint: Option<String>,
    /// HTTP 싱크 API 키 (Bearer)
    #[serde(default)]
    pub api_key: Option<String>,
    /// SQLite 파일 경로 (None이면 플랫폼 데이터 디렉토리)
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// HTTP 요청 타임아웃 (밀리초)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// 로컬 보존 기간 (일)
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Sqlite,
            endpoint: None,
            api_key: None,
            db_path: None,
            request_timeout_ms: default_request_timeout_ms(),
            retention_days: default_retention_days(),
        }
    }
}

// ============================================================
// 수집기 설정
// ============================================================

/// 사용 이벤트 수집기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 즉시 플러시를 유발하는 큐 용량
    #[serde(default = "default_usage_capacity")]
    pub capacity: usize,
    /// 주기 플러시 간격 (밀리초)
    #[serde(default = "default_usage_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// 로컬 버퍼 상한 (None이면 용량 × 10). 초과 시 가장 오래된 레코드 폐기
    #[serde(default)]
    pub max_buffered: Option<usize>,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_usage_capacity(),
            flush_interval_ms: default_usage_flush_interval_ms(),
            max_buffered: None,
        }
    }
}

impl UsageConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn max_buffered(&self) -> usize {
        self.max_buffered
            .unwrap_or(self.capacity.saturating_mul(DEFAULT_BUFFER_FACTOR))
    }
}

/// 에러 수집기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_errors_capacity")]
    pub capacity: usize,
    #[serde(default = "default_errors_flush_interval_ms")]
    pub flush_interval_ms: u64,
    #[serde(default)]
    pub max_buffered: Option<usize>,
    /// Rust panic을 치명적 스크립트 장애로 기록
    #[serde(default)]
    pub capture_panics: bool,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_errors_capacity(),
            flush_interval_ms: default_errors_flush_interval_ms(),
            max_buffered: None,
            capture_panics: false,
        }
    }
}

impl ErrorsConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn max_buffered(&self) -> usize {
        self.max_buffered
            .unwrap_or(self.capacity.saturating_mul(DEFAULT_BUFFER_FACTOR))
    }
}

/// 성능 수집기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 메모리 스냅샷 주기 (밀리초)
    #[serde(default = "default_memory_interval_ms")]
    pub memory_interval_ms: u64,
    /// 이 시간을 넘는 리소스는 "slow"
    #[serde(default = "default_slow_resource_ms")]
    pub slow_resource_ms: f64,
    /// 이 크기를 넘는 리소스는 "large"
    #[serde(default = "default_large_resource_bytes")]
    pub large_resource_bytes: u64,
    /// 보관할 최근 알림 수
    #[serde(default = "default_alert_history")]
    pub alert_history: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            memory_interval_ms: default_memory_interval_ms(),
            slow_resource_ms: default_slow_resource_ms(),
            large_resource_bytes: default_large_resource_bytes(),
            alert_history: default_alert_history(),
        }
    }
}

impl PerformanceConfig {
    pub fn memory_interval(&self) -> Duration {
        Duration::from_millis(self.memory_interval_ms)
    }
}

// ============================================================
// 전송 설정
// ============================================================

/// 전송(플러시) 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// 단일 배치 전송 타임아웃 (밀리초). 초과 시 재시도 가능한 실패로 처리
    #[serde(default = "default_delivery_timeout_ms")]
    pub timeout_ms: u64,
    /// 연속 실패 시 지수 백오프 적용
    #[serde(default = "default_true")]
    pub backoff_enabled: bool,
    /// 백오프 상한 (밀리초)
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// 강제 오프라인 (전송 시도 없음)
    #[serde(default)]
    pub force_offline: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_delivery_timeout_ms(),
            backoff_enabled: true,
            max_backoff_ms: default_max_backoff_ms(),
            force_offline: false,
        }
    }
}

impl DeliveryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// 백오프 비활성화 시 None
    pub fn max_backoff(&self) -> Option<Duration> {
        self.backoff_enabled
            .then(|| Duration::from_millis(self.max_backoff_ms))
    }
}

// ============================================================
// 프라이버시 설정
// ============================================================

/// 프라이버시 설정: 폼 페이로드 마스킹
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyConfig {
    /// 마스킹된 값을 대체할 고정 문자열
    #[serde(default = "default_redaction_marker")]
    pub redaction_marker: String,
    /// 기본 목록(password, ssn, credit card 등) 외 추가 민감 키
    #[serde(default)]
    pub extra_sensitive_keys: Vec<String>,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            redaction_marker: default_redaction_marker(),
            extra_sensitive_keys: Vec::new(),
        }
    }
}

// ============================================================
// 환경 컨텍스트 설정
// ============================================================

/// 환경 컨텍스트 기본값 (호스트가 런타임에 갱신 가능)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    #[serde(default = "default_location")]
    pub initial_location: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_viewport")]
    pub viewport: Dimensions,
    #[serde(default = "default_viewport")]
    pub screen: Dimensions,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            initial_location: default_location(),
            user_agent: default_user_agent(),
            locale: default_locale(),
            timezone: default_timezone(),
            viewport: default_viewport(),
            screen: default_viewport(),
        }
    }
}

impl AppConfig {
    /// 기본 설정 생성
    pub fn default_config() -> Self {
        Self {
            sink: SinkConfig::default(),
            usage: UsageConfig::default(),
            errors: ErrorsConfig::default(),
            performance: PerformanceConfig::default(),
            delivery: DeliveryConfig::default(),
            privacy: PrivacyConfig::default(),
            context: ContextConfig::default(),
        }
    }

    /// HTTP 요청 타임아웃을 Duration으로 반환
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.sink.request_timeout_ms)
    }

    /// 설정값 검증
    pub fn validate(&self) -> Result<(), crate::error::CoreError> {
        use crate::error::CoreError;

        if self.usage.capacity == 0 {
            return Err(CoreError::Validation {
                field: "usage.capacity".to_string(),
                message: "0보다 커야 합니다".to_string(),
            });
        }
        if self.errors.capacity == 0 {
            return Err(CoreError::Validation {
                field: "errors.capacity".to_string(),
                message: "0보다 커야 합니다".to_string(),
            });
        }
        if self.usage.max_buffered() < self.usage.capacity
            || self.errors.max_buffered() < self.errors.capacity
        {
            return Err(CoreError::Validation {
                field: "max_buffered".to_string(),
                message: "버퍼 상한은 큐 용량 이상이어야 합니다".to_string(),
            });
        }
        if self.usage.flush_interval_ms == 0 || self.errors.flush_interval_ms == 0 {
            return Err(CoreError::Validation {
                field: "flush_interval_ms".to_string(),
                message: "0보다 커야 합니다".to_string(),
            });
        }
        if self.sink.kind == SinkKind::Http && self.sink.endpoint.is_none() {
            return Err(CoreError::Validation {
                field: "sink.endpoint".to_string(),
                message: "HTTP 싱크에는 endpoint가 필요합니다".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

// ============================================================
// 기본값 함수
// ============================================================

/// 버퍼 상한 기본 배수 (용량 대비)
const DEFAULT_BUFFER_FACTOR: usize = 10;

fn default_true() -> bool {
    true
}
fn default_request_timeout_ms() -> u64 {
    30_000
}
fn default_retention_days() -> u32 {
    30
}
fn default_usage_capacity() -> usize {
    50
}
fn default_usage_flush_interval_ms() -> u64 {
    10_000
}
fn default_errors_capacity() -> usize {
    100
}
fn default_errors_flush_interval_ms() -> u64 {
    30_000
}
fn default_memory_interval_ms() -> u64 {
    30_000
}
fn default_slow_resource_ms() -> f64 {
    1_000.0
}
fn default_large_resource_bytes() -> u64 {
    100 * 1024
}
fn default_alert_history() -> usize {
    100
}
fn default_delivery_timeout_ms() -> u64 {
    10_000
}
fn default_max_backoff_ms() -> u64 {
    300_000 // 5분
}
fn default_redaction_marker() -> String {
    "[REDACTED]".to_string()
}
fn default_location() -> String {
    "/".to_string()
}
fn default_user_agent() -> String {
    format!("beacon/{}", env!("CARGO_PKG_VERSION"))
}
fn default_locale() -> String {
    "en-US".to_string()
}
fn default_timezone() -> String {
    "UTC".to_string()
}
fn default_viewport() -> Dimensions {
    Dimensions::new(1920, 1080)
}
