//! BEACON 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 자신의 라이브러리 에러를 `CoreError`로 매핑한다.
//! 계측 호출(`track_*`)은 에러를 호출자에게 돌려주지 않으며,
//! 이 타입은 전송/조회/설정 경로에서만 표면화된다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패: {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 인증 실패 (API 키 누락/거부)
    #[error("인증 에러: {0}")]
    Auth(String),

    /// 네트워크 에러 (연결 실패 등)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 전송 타임아웃
    #[error("전송 타임아웃: {timeout_ms}ms 초과")]
    Timeout {
        /// 초과된 타임아웃 시간 (밀리초)
        timeout_ms: u64,
    },

    /// 싱크가 배치를 거부함 (4xx/5xx)
    #[error("싱크 거부 ({status}): {message}")]
    SinkRejected {
        /// 응답 상태 코드
        status: u16,
        /// 응답 본문 또는 사유
        message: String,
    },

    /// Rate Limit 초과 (429)
    #[error("요청 한도 초과, {retry_after_secs}초 후 재시도")]
    RateLimit {
        /// 재시도 대기 시간 (초)
        retry_after_secs: u64,
    },

    /// 서비스 일시 불가 (503)
    #[error("서비스 일시 불가: {0}")]
    ServiceUnavailable(String),

    /// 로컬 저장소 에러 (SQLite 등)
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// 구독/관찰 소스 에러
    #[error("관찰 소스 에러: {0}")]
    Observation(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// 다음 타이머 틱에서 재시도할 가치가 있는 전송 실패인지 판별
    ///
    /// 디스패처는 모든 실패를 재큐잉하지만, 로그 레벨과 통계 분류에 사용된다.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::Network(_)
                | CoreError::Timeout { .. }
                | CoreError::RateLimit { .. }
                | CoreError::ServiceUnavailable(_)
                | CoreError::Storage(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(CoreError::Network("down".to_string()).is_transient());
        assert!(CoreError::Timeout { timeout_ms: 10 }.is_transient());
        assert!(CoreError::RateLimit {
            retry_after_secs: 60
        }
        .is_transient());
        assert!(!CoreError::Auth("bad key".to_string()).is_transient());
        assert!(!CoreError::SinkRejected {
            status: 400,
            message: "schema".to_string()
        }
        .is_transient());
    }

    #[test]
    fn timeout_message_includes_millis() {
        let err = CoreError::Timeout { timeout_ms: 1500 };
        assert!(err.to_string().contains("1500ms"));
    }
}
