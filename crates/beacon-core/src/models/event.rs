//! 사용 이벤트 모델.
//!
//! 페이지 뷰, 사용자 액션, 폼 제출, 전환 등 퍼널/참여 분석용 이벤트.
//! 이벤트 유형은 `EventDetail` variant에 의해 고정된다.

use serde::{Deserialize, Serialize};

use super::metric::{MetricName, PerformanceAlert};
use super::record::Attributes;

/// 이벤트 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    PageView,
    UserAction,
    FormSubmit,
    ButtonClick,
    LinkClick,
    Search,
    Conversion,
    PerformanceAlert,
    FeatureUsage,
    /// 성능 수집기가 전달하는 메트릭 사본
    Performance,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PageView => "page-view",
            EventType::UserAction => "user-action",
            EventType::FormSubmit => "form-submit",
            EventType::ButtonClick => "button-click",
            EventType::LinkClick => "link-click",
            EventType::Search => "search",
            EventType::Conversion => "conversion",
            EventType::PerformanceAlert => "performance-alert",
            EventType::FeatureUsage => "feature-usage",
            EventType::Performance => "performance",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 이벤트 상세: 유형별 고정 필드
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "kebab-case")]
pub enum EventDetail {
    PageView {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    UserAction {
        action: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        #[serde(default, skip_serializing_if = "Attributes::is_empty")]
        attributes: Attributes,
    },
    FormSubmit {
        form: String,
        /// 새니타이즈된 필드 값 (민감 필드는 마스킹됨)
        fields: Attributes,
        success: bool,
    },
    ButtonClick {
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
    },
    LinkClick {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Search {
        query: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        results: Option<u32>,
    },
    Conversion {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        currency: Option<String>,
    },
    PerformanceAlert(PerformanceAlert),
    FeatureUsage {
        feature: String,
        #[serde(default, skip_serializing_if = "Attributes::is_empty")]
        attributes: Attributes,
    },
    Performance {
        metric: MetricName,
        value: f64,
        #[serde(default, skip_serializing_if = "Attributes::is_empty")]
        metadata: Attributes,
    },
}

impl EventDetail {
    /// variant가 결정하는 이벤트 유형
    pub fn event_type(&self) -> EventType {
        match self {
            EventDetail::PageView { .. } => EventType::PageView,
            EventDetail::UserAction { .. } => EventType::UserAction,
            EventDetail::FormSubmit { .. } => EventType::FormSubmit,
            EventDetail::ButtonClick { .. } => EventType::ButtonClick,
            EventDetail::LinkClick { .. } => EventType::LinkClick,
            EventDetail::Search { .. } => EventType::Search,
            EventDetail::Conversion { .. } => EventType::Conversion,
            EventDetail::PerformanceAlert(_) => EventType::PerformanceAlert,
            EventDetail::FeatureUsage { .. } => EventType::FeatureUsage,
            EventDetail::Performance { .. } => EventType::Performance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_tag_matches_event_type() {
        let detail = EventDetail::ButtonClick {
            label: "save".to_string(),
            location: Some("toolbar".to_string()),
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["event_type"], "button-click");
        assert_eq!(detail.event_type().as_str(), "button-click");
    }

    #[test]
    fn empty_attributes_are_omitted() {
        let detail = EventDetail::FeatureUsage {
            feature: "kanban".to_string(),
            attributes: Attributes::new(),
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert!(json.get("attributes").is_none());

        let back: EventDetail = serde_json::from_value(json).unwrap();
        assert_eq!(back, detail);
    }
}
