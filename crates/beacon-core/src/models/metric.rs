//! 성능 메트릭 모델.
//!
//! 고정 카탈로그의 메트릭 이름, 최신값 레코드, 임계값 분류 결과(알림)를 정의.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::Attributes;

/// 메트릭 카탈로그
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricName {
    /// Largest Contentful Paint (ms)
    Lcp,
    /// First Contentful Paint (ms)
    Fcp,
    /// First Input Delay (ms)
    Fid,
    /// Cumulative Layout Shift (단위 없음)
    Cls,
    /// Interaction to Next Paint (ms)
    Inp,
    /// Time To First Byte (ms)
    Ttfb,
    /// 근사 Time To Interactive (ms)
    Tti,
    /// 근사 First Meaningful Paint (ms)
    Fmp,
    /// 전체 페이지 로드 시간 (ms)
    PageLoad,
    /// 롱 태스크 지속 시간 (ms)
    LongTask,
    /// 힙/상주 메모리 사용량 (bytes)
    MemoryUsage,
    /// 느린 리소스 로드 시간 (ms)
    SlowResource,
    /// 큰 리소스 전송 크기 (bytes)
    LargeResource,
}

impl MetricName {
    pub const ALL: [MetricName; 13] = [
        MetricName::Lcp,
        MetricName::Fcp,
        MetricName::Fid,
        MetricName::Cls,
        MetricName::Inp,
        MetricName::Ttfb,
        MetricName::Tti,
        MetricName::Fmp,
        MetricName::PageLoad,
        MetricName::LongTask,
        MetricName::MemoryUsage,
        MetricName::SlowResource,
        MetricName::LargeResource,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::Lcp => "LCP",
            MetricName::Fcp => "FCP",
            MetricName::Fid => "FID",
            MetricName::Cls => "CLS",
            MetricName::Inp => "INP",
            MetricName::Ttfb => "TTFB",
            MetricName::Tti => "TTI",
            MetricName::Fmp => "FMP",
            MetricName::PageLoad => "PAGE_LOAD",
            MetricName::LongTask => "LONG_TASK",
            MetricName::MemoryUsage => "MEMORY_USAGE",
            MetricName::SlowResource => "SLOW_RESOURCE",
            MetricName::LargeResource => "LARGE_RESOURCE",
        }
    }

    /// Core Web Vitals 여부 (요약 뷰에서 사용)
    pub fn is_core_vital(&self) -> bool {
        matches!(
            self,
            MetricName::Lcp | MetricName::Fid | MetricName::Cls | MetricName::Inp
        )
    }
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 메트릭 최신값 레코드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub name: MetricName,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
    /// 소스별 속성 (예: 페인트 메트릭의 요소 태그)
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub metadata: Attributes,
}

/// 임계값 분류 결과 (낮을수록 좋음)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Excellent,
    Good,
    NeedsImprovement,
    Poor,
}

impl Rating {
    /// 알림을 생성하는 분류인지
    pub fn is_breach(&self) -> bool {
        matches!(self, Rating::NeedsImprovement | Rating::Poor)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Excellent => "excellent",
            Rating::Good => "good",
            Rating::NeedsImprovement => "needs_improvement",
            Rating::Poor => "poor",
        }
    }
}

/// 알림 심각도
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Medium,
    High,
}

/// 임계값 위반 시 생성되는 파생 알림
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAlert {
    pub metric_name: MetricName,
    pub value: f64,
    pub threshold: f64,
    pub category: Rating,
    pub severity: AlertSeverity,
    pub raised_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_ordering_goes_from_best_to_worst() {
        assert!(Rating::Excellent < Rating::Good);
        assert!(Rating::Good < Rating::NeedsImprovement);
        assert!(Rating::NeedsImprovement < Rating::Poor);
        assert!(!Rating::Good.is_breach());
        assert!(Rating::NeedsImprovement.is_breach());
    }

    #[test]
    fn metric_name_wire_format() {
        let json = serde_json::to_string(&MetricName::LargeResource).unwrap();
        assert_eq!(json, "\"LARGE_RESOURCE\"");
        assert_eq!(MetricName::Ttfb.to_string(), "TTFB");
        assert!(MetricName::Cls.is_core_vital());
        assert!(!MetricName::Ttfb.is_core_vital());
    }
}
