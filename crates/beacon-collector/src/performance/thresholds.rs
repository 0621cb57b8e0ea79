//! 임계값 평가기.
//!
//! 메트릭별 고정 임계값 `T`에 대해 `v ≤ 0.75T` excellent, `v ≤ T` good,
//! `v ≤ 1.5T` needs_improvement, 그 외 poor. 경계값은 더 좋은 쪽으로 분류된다.

use beacon_core::models::metric::{AlertSeverity, MetricName, PerformanceAlert, Rating};
use chrono::Utc;

/// 메트릭별 임계값 (ms, CLS는 단위 없음). 임계값이 없는 메트릭은 분류하지 않는다
pub fn threshold_for(metric: MetricName) -> Option<f64> {
    match metric {
        MetricName::Lcp => Some(2500.0),
        MetricName::Fcp => Some(1800.0),
        MetricName::Fid => Some(100.0),
        MetricName::Cls => Some(0.1),
        MetricName::Inp => Some(200.0),
        MetricName::Ttfb => Some(800.0),
        MetricName::Tti => Some(3800.0),
        MetricName::Fmp => Some(2000.0),
        _ => None,
    }
}

/// 값 분류
pub fn classify(value: f64, threshold: f64) -> Rating {
    if value <= threshold * 0.75 {
        Rating::Excellent
    } else if value <= threshold {
        Rating::Good
    } else if value <= threshold * 1.5 {
        Rating::NeedsImprovement
    } else {
        Rating::Poor
    }
}

/// 메트릭 분류 (임계값 없으면 None)
pub fn rate(metric: MetricName, value: f64) -> Option<Rating> {
    threshold_for(metric).map(|threshold| classify(value, threshold))
}

/// 위반이면 알림 생성: poor는 high, needs_improvement는 medium
pub fn evaluate(metric: MetricName, value: f64) -> Option<PerformanceAlert> {
    let threshold = threshold_for(metric)?;
    let category = classify(value, threshold);
    let severity = match category {
        Rating::Poor => AlertSeverity::High,
        Rating::NeedsImprovement => AlertSeverity::Medium,
        Rating::Excellent | Rating::Good => return None,
    };

    Some(PerformanceAlert {
        metric_name: metric,
        value,
        threshold,
        category,
        severity,
        raised_at: Utc::now(),
    })
}
