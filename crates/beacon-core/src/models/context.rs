//! 환경 컨텍스트 모델.
//!
//! 레코드 생성 시점에 캡처되는 실행 환경 스냅샷. 한 번 첨부되면 변경되지 않는다.

use serde::{Deserialize, Serialize};

/// 화면/뷰포트 크기 (픽셀)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// 네트워크 품질 힌트 (Network Information API 유사)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkHints {
    /// 유효 연결 유형 (예: "4g", "3g", "slow-2g")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_type: Option<String>,
    /// 예상 다운링크 대역폭 (Mbps)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downlink_mbps: Option<f64>,
    /// 예상 왕복 지연 (밀리초)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtt_ms: Option<u32>,
    /// 데이터 절약 모드
    #[serde(default)]
    pub save_data: bool,
}

/// 레코드 생성 시점의 환경 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentContext {
    /// 현재 위치 (URL 또는 라우트)
    pub location: String,
    /// 직전 위치
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    /// 뷰포트 크기
    pub viewport: Dimensions,
    /// 스크린 크기
    pub screen: Dimensions,
    /// User-Agent 문자열
    pub user_agent: String,
    /// 로케일 (예: "ko-KR")
    pub locale: String,
    /// IANA 타임존 (예: "Asia/Seoul")
    pub timezone: String,
    /// 네트워크 품질 힌트
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkHints>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_hints_are_optional_on_the_wire() {
        let ctx = EnvironmentContext {
            location: "/dashboard".to_string(),
            viewport: Dimensions::new(1280, 720),
            screen: Dimensions::new(1920, 1080),
            user_agent: "beacon-test".to_string(),
            locale: "ko-KR".to_string(),
            timezone: "Asia/Seoul".to_string(),
            ..Default::default()
        };

        let json = serde_json::to_value(&ctx).unwrap();
        assert!(json.get("network").is_none());
        assert!(json.get("referrer").is_none());
        assert_eq!(json["viewport"]["width"], 1280);
    }
}
