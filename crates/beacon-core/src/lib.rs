//! # beacon-core
//!
//! BEACON 텔레메트리 레코드 모델, 포트(trait) 정의, 에러 타입.
//! 모든 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`]: 레코드/이벤트/에러/메트릭/관찰 엔트리 (serde Serialize/Deserialize)
//! - [`ports`]: Hexagonal Architecture 포트 인터페이스 (싱크, 관찰 소스, 세션, 컨텍스트)
//! - [`error`]: 핵심 에러 타입 (thiserror)
//! - [`config`]: 애플리케이션 설정 구조체
//! - [`config_manager`]: 설정 파일 관리 (로드/저장)

pub mod config;
pub mod config_manager;
pub mod error;
pub mod models;
pub mod ports;

#[cfg(test)]
mod tests {
    #[test]
    fn config_defaults() {
        let config = crate::config::AppConfig::default_config();
        assert_eq!(config.usage.capacity, 50);
        assert_eq!(config.errors.capacity, 100);
        assert_eq!(config.errors.flush_interval_ms, 30_000);
        assert_eq!(config.performance.memory_interval_ms, 30_000);
        assert!(config.delivery.backoff_enabled);
        assert_eq!(config.privacy.redaction_marker, "[REDACTED]");
    }
}
