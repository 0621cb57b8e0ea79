//! 관찰 엔트리 모델.
//!
//! 관찰 소스(페인트/입력/레이아웃 이동/리소스/내비게이션/롱 태스크/메모리/장애)가
//! 구독자에게 전달하는 원시 신호. 시간 값은 모두 내비게이션 시작 기준 밀리초.

use serde::{Deserialize, Serialize};

/// 구독 가능한 엔트리 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryType {
    LargestContentfulPaint,
    Paint,
    FirstInput,
    LayoutShift,
    Event,
    Resource,
    Navigation,
    LongTask,
    Memory,
    Fault,
}

/// 페인트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaintKind {
    FirstPaint,
    FirstContentfulPaint,
}

/// 내비게이션 타이밍 (내비게이션 시작 기준 ms)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationTiming {
    #[serde(default)]
    pub start_time: f64,
    pub request_start: f64,
    pub response_start: f64,
    pub dom_interactive: f64,
    pub dom_content_loaded_event_end: f64,
    pub load_event_end: f64,
    /// 내비게이션 유형 (navigate, reload, back_forward 등)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_type: Option<String>,
}

/// 장애 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// 미처리 예외
    Uncaught,
    /// 처리되지 않은 비동기 거부
    UnhandledRejection,
    /// 컴포넌트 경계에서 포착
    ComponentBoundary,
}

/// 호스트 애플리케이션의 장애 보고
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultReport {
    pub kind: FaultKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    /// 컴포넌트 경계 장애의 컴포넌트 경로
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub component_trail: Vec<String>,
}

/// 관찰 엔트리
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entry_type", rename_all = "kebab-case")]
pub enum ObservationEntry {
    LargestContentfulPaint {
        start_time: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        element: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<u64>,
    },
    Paint {
        kind: PaintKind,
        start_time: f64,
    },
    FirstInput {
        name: String,
        start_time: f64,
        processing_start: f64,
    },
    LayoutShift {
        start_time: f64,
        value: f64,
        #[serde(default)]
        had_recent_input: bool,
    },
    /// 상호작용 이벤트 타이밍 (INP 계산용)
    Event {
        name: String,
        start_time: f64,
        duration: f64,
        #[serde(default)]
        interaction_id: u64,
    },
    Resource {
        name: String,
        #[serde(default)]
        initiator_type: String,
        duration: f64,
        #[serde(default)]
        transfer_size: u64,
    },
    Navigation(NavigationTiming),
    LongTask {
        start_time: f64,
        duration: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribution: Option<String>,
    },
    Memory {
        used_bytes: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_bytes: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit_bytes: Option<u64>,
    },
    Fault(FaultReport),
}

impl ObservationEntry {
    /// 이 엔트리가 속한 구독 유형
    pub fn entry_type(&self) -> EntryType {
        match self {
            ObservationEntry::LargestContentfulPaint { .. } => EntryType::LargestContentfulPaint,
            ObservationEntry::Paint { .. } => EntryType::Paint,
            ObservationEntry::FirstInput { .. } => EntryType::FirstInput,
            ObservationEntry::LayoutShift { .. } => EntryType::LayoutShift,
            ObservationEntry::Event { .. } => EntryType::Event,
            ObservationEntry::Resource { .. } => EntryType::Resource,
            ObservationEntry::Navigation(_) => EntryType::Navigation,
            ObservationEntry::LongTask { .. } => EntryType::LongTask,
            ObservationEntry::Memory { .. } => EntryType::Memory,
            ObservationEntry::Fault(_) => EntryType::Fault,
        }
    }
}
