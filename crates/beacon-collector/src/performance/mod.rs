//! 성능 수집기.
//!
//! 관찰 소스에서 페인트/입력/레이아웃 이동/상호작용/리소스/내비게이션/
//! 롱 태스크/메모리 엔트리를 구독해 메트릭으로 바꾼다.
//!
//! 메트릭은 큐가 아니라 이름별 최신값 맵에 저장된다. 매 기록은 사용 이벤트로
//! 복사되고, 임계값 위반은 알림 이벤트가 되며, poor 위반은 high 에러로 승격된다.

pub mod interactions;
pub mod layout_shift;
pub mod thresholds;

use beacon_core::config::PerformanceConfig;
use beacon_core::models::error_event::{ErrorCategory, ErrorDetail, ErrorSeverity};
use beacon_core::models::metric::{MetricName, MetricRecord, PerformanceAlert, Rating};
use beacon_core::models::observation::{EntryType, NavigationTiming, ObservationEntry, PaintKind};
use beacon_core::models::record::Attributes;
use beacon_core::ports::observation::{ObservationSource, SubscriptionHandle};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use crate::errors::{ErrorCollector, ErrorReport};
use crate::snapshot::PerformanceSnapshotCell;
use crate::usage::UsageCollector;

use self::interactions::InteractionTracker;
use self::layout_shift::LayoutShiftWindow;

/// 구독하는 엔트리 유형 (각각 독립 구독)
pub const MONITORED_ENTRY_TYPES: [EntryType; 9] = [
    EntryType::LargestContentfulPaint,
    EntryType::Paint,
    EntryType::FirstInput,
    EntryType::LayoutShift,
    EntryType::Event,
    EntryType::Resource,
    EntryType::Navigation,
    EntryType::LongTask,
    EntryType::Memory,
];

/// 메인 스레드를 막지 않는 것으로 보는 롱 태스크 구간 (ms)
const LONG_TASK_BUDGET_MS: f64 = 50.0;

#[derive(Debug, Default)]
struct PerfState {
    metrics: BTreeMap<MetricName, MetricRecord>,
    alerts: VecDeque<PerformanceAlert>,
    total_alerts: u64,
    layout_shift: LayoutShiftWindow,
    interactions: InteractionTracker,
    long_tasks: u64,
    total_blocking_ms: f64,
    slow_resources: u64,
    large_resources: u64,
    dropped_observations: u64,
}

/// 대시보드용 메트릭 뷰
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricView {
    pub value: f64,
    /// 임계값이 없는 메트릭은 None
    pub rating: Option<Rating>,
    pub recorded_at: DateTime<Utc>,
}

/// 대시보드 조회 결과
#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
    pub metrics: BTreeMap<MetricName, MetricView>,
    /// 오래된 것부터
    pub recent_alerts: Vec<PerformanceAlert>,
    pub interactions: usize,
}

/// 요약 조회 결과
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSummary {
    pub metrics_tracked: usize,
    pub total_alerts: u64,
    pub poor: usize,
    pub needs_improvement: usize,
    /// Core Web Vitals 분류
    pub core_vitals: BTreeMap<MetricName, Rating>,
    /// 분류된 메트릭 중 good 이상 비율 (0-100). 분류된 메트릭이 없으면 100
    pub score: u8,
    pub long_tasks: u64,
    pub total_blocking_ms: f64,
    pub slow_resources: u64,
    pub large_resources: u64,
    pub dropped_observations: u64,
}

/// 성능 수집기
pub struct PerformanceCollector {
    config: PerformanceConfig,
    usage: Arc<UsageCollector>,
    errors: Arc<ErrorCollector>,
    snapshot: Arc<PerformanceSnapshotCell>,
    state: Mutex<PerfState>,
    subscriptions: Mutex<Vec<(EntryType, Arc<dyn ObservationSource>, SubscriptionHandle)>>,
}

impl PerformanceCollector {
    pub fn new(
        config: &PerformanceConfig,
        usage: Arc<UsageCollector>,
        errors: Arc<ErrorCollector>,
        snapshot: Arc<PerformanceSnapshotCell>,
    ) -> Self {
        Self {
            config: config.clone(),
            usage,
            errors,
            snapshot,
            state: Mutex::new(PerfState::default()),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// 관찰 구독 시작. 활성 구독 수 반환
    ///
    /// 소스가 지원하지 않는 유형은 건너뛴다. 이미 구독 중이면 그대로 둔다.
    pub fn start_monitoring(self: &Arc<Self>, source: Arc<dyn ObservationSource>) -> usize {
        if !self.config.enabled {
            info!("[performance] 수집 비활성 - 관찰 구독 안 함");
            return 0;
        }

        let mut subscriptions = self.subscriptions.lock();
        if !subscriptions.is_empty() {
            debug!("[performance] 이미 관찰 중 ({}개 구독)", subscriptions.len());
            return subscriptions.len();
        }

        for entry_type in MONITORED_ENTRY_TYPES {
            if !source.supports(entry_type) {
                debug!("[performance] 소스가 지원하지 않는 유형 - 건너뜀: {entry_type:?}");
                continue;
            }

            let weak: Weak<PerformanceCollector> = Arc::downgrade(self);
            let callback = Arc::new(move |entry: ObservationEntry| {
                if let Some(collector) = weak.upgrade() {
                    collector.handle_entry(entry);
                }
            });

            match source.subscribe(&[entry_type], callback) {
                Ok(handle) => subscriptions.push((entry_type, source.clone(), handle)),
                Err(e) => warn!("[performance] 관찰 구독 실패 ({entry_type:?}): {e}"),
            }
        }

        info!("[performance] 관찰 시작: {}개 유형", subscriptions.len());
        subscriptions.len()
    }

    /// 모든 관찰 구독 해제. 멱등
    pub fn stop_monitoring(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        if subscriptions.is_empty() {
            return;
        }
        for (_, source, handle) in &subscriptions {
            source.unsubscribe(*handle);
        }
        info!("[performance] 관찰 중지: {}개 구독 해제", subscriptions.len());
    }

    /// 현재 구독 중인 유형
    pub fn monitored_types(&self) -> Vec<EntryType> {
        self.subscriptions.lock().iter().map(|(t, _, _)| *t).collect()
    }

    /// 관찰 엔트리 처리
    pub fn handle_entry(&self, entry: ObservationEntry) {
        match entry {
            ObservationEntry::LargestContentfulPaint {
                start_time,
                element,
                size,
            } => {
                let mut metadata = Attributes::new();
                if let Some(element) = element {
                    metadata.insert("element".to_string(), json!(element));
                }
                if let Some(size) = size {
                    metadata.insert("size".to_string(), json!(size));
                }
                if self.record_metric(MetricName::Lcp, start_time, metadata) {
                    self.snapshot.set_largest_contentful_paint(start_time);
                }
            }
            ObservationEntry::Paint { kind, start_time } => match kind {
                PaintKind::FirstContentfulPaint => {
                    if self.record_metric(MetricName::Fcp, start_time, Attributes::new()) {
                        self.snapshot.set_first_contentful_paint(start_time);
                    }
                }
                PaintKind::FirstPaint => debug!("[performance] first-paint 무시: {start_time}"),
            },
            ObservationEntry::FirstInput {
                name,
                start_time,
                processing_start,
            } => {
                let metadata = Attributes::from([("event".to_string(), json!(name))]);
                self.record_metric(MetricName::Fid, processing_start - start_time, metadata);
            }
            ObservationEntry::LayoutShift {
                start_time,
                value,
                had_recent_input,
            } => {
                if !value.is_finite() || value < 0.0 {
                    self.drop_observation("layout-shift", value);
                    return;
                }
                let reported = self
                    .state
                    .lock()
                    .layout_shift
                    .add(start_time, value, had_recent_input);
                if let Some(cls) = reported {
                    self.record_metric(MetricName::Cls, cls, Attributes::new());
                }
            }
            ObservationEntry::Event {
                name,
                duration,
                interaction_id,
                ..
            } => {
                if !duration.is_finite() || duration < 0.0 {
                    self.drop_observation("event", duration);
                    return;
                }
                let reported = self.state.lock().interactions.add(interaction_id, duration);
                if let Some(inp) = reported {
                    let metadata = Attributes::from([("event".to_string(), json!(name))]);
                    self.record_metric(MetricName::Inp, inp, metadata);
                }
            }
            ObservationEntry::Resource {
                name,
                initiator_type,
                duration,
                transfer_size,
            } => self.handle_resource(name, initiator_type, duration, transfer_size),
            ObservationEntry::Navigation(timing) => self.handle_navigation(&timing),
            ObservationEntry::LongTask {
                duration,
                attribution,
                ..
            } => {
                let mut metadata = Attributes::new();
                if let Some(attribution) = attribution {
                    metadata.insert("attribution".to_string(), json!(attribution));
                }
                if self.record_metric(MetricName::LongTask, duration, metadata) {
                    let mut state = self.state.lock();
                    state.long_tasks += 1;
                    state.total_blocking_ms += (duration - LONG_TASK_BUDGET_MS).max(0.0);
                }
            }
            ObservationEntry::Memory {
                used_bytes,
                total_bytes,
                limit_bytes,
            } => {
                let mut metadata = Attributes::new();
                if let Some(total) = total_bytes {
                    metadata.insert("total_bytes".to_string(), json!(total));
                }
                if let Some(limit) = limit_bytes {
                    metadata.insert("limit_bytes".to_string(), json!(limit));
                }
                if self.record_metric(MetricName::MemoryUsage, used_bytes as f64, metadata) {
                    self.snapshot.set_heap_used(used_bytes);
                }
            }
            ObservationEntry::Fault(_) => {
                debug!("[performance] 장애 엔트리는 에러 수집기 담당 - 무시");
            }
        }
    }

    fn handle_resource(&self, name: String, initiator_type: String, duration: f64, transfer_size: u64) {
        let metadata = Attributes::from([
            ("resource".to_string(), json!(name)),
            ("initiator_type".to_string(), json!(initiator_type)),
        ]);

        if duration > self.config.slow_resource_ms
            && self.record_metric(MetricName::SlowResource, duration, metadata.clone())
        {
            self.state.lock().slow_resources += 1;
        }
        if transfer_size > self.config.large_resource_bytes
            && self.record_metric(MetricName::LargeResource, transfer_size as f64, metadata)
        {
            self.state.lock().large_resources += 1;
        }
    }

    /// 내비게이션 타이밍에서 TTFB, 근사 TTI/FMP, 페이지 로드 도출
    fn handle_navigation(&self, timing: &NavigationTiming) {
        let mut metadata = Attributes::new();
        if let Some(kind) = &timing.navigation_type {
            metadata.insert("navigation_type".to_string(), json!(kind));
        }

        let derived = [
            (MetricName::Ttfb, timing.response_start),
            (MetricName::Tti, timing.dom_interactive),
            (MetricName::Fmp, timing.dom_content_loaded_event_end),
            (MetricName::PageLoad, timing.load_event_end),
        ];
        for (metric, mark) in derived {
            // 아직 도달하지 않은 마크는 0
            if mark <= 0.0 {
                continue;
            }
            let value = mark - timing.start_time;
            if self.record_metric(metric, value, metadata.clone()) && metric == MetricName::PageLoad {
                self.snapshot.set_page_load(value);
            }
        }
    }

    fn drop_observation(&self, kind: &str, value: f64) {
        self.state.lock().dropped_observations += 1;
        warn!("[performance] 잘못된 관찰값 폐기 ({kind}): {value}");
    }

    /// 메트릭 기록: 최신값 갱신, 사용 이벤트 사본, 임계값 평가
    ///
    /// NaN/음수는 폐기하고 false를 반환한다.
    pub fn record_metric(&self, name: MetricName, value: f64, metadata: Attributes) -> bool {
        if !value.is_finite() || value < 0.0 {
            self.drop_observation(name.as_str(), value);
            return false;
        }

        let alert = thresholds::evaluate(name, value);
        {
            let mut state = self.state.lock();
            state.metrics.insert(
                name,
                MetricRecord {
                    name,
                    value,
                    recorded_at: Utc::now(),
                    metadata: metadata.clone(),
                },
            );
            if let Some(alert) = &alert {
                state.alerts.push_back(alert.clone());
                while state.alerts.len() > self.config.alert_history {
                    state.alerts.pop_front();
                }
                state.total_alerts += 1;
            }
        }
        debug!("[performance] 메트릭 기록: {name} = {value}");

        self.usage.track_performance(name, value, metadata);

        if let Some(alert) = alert {
            self.escalate(alert);
        }
        true
    }

    fn escalate(&self, alert: PerformanceAlert) {
        let PerformanceAlert {
            metric_name,
            value,
            threshold,
            category,
            ..
        } = alert;
        info!(
            "[performance] 임계값 위반: {metric_name} = {value} ({}, 임계값 {threshold})",
            category.as_str()
        );

        self.usage.track_performance_alert(alert);

        if category == Rating::Poor {
            self.errors.track_error(
                ErrorReport::new(format!(
                    "{metric_name} 성능 심각 저하: {value:.1} (임계값 {threshold})"
                ))
                .with_severity(ErrorSeverity::High)
                .with_category(ErrorCategory::Performance)
                .with_detail(ErrorDetail::Performance {
                    metric: metric_name,
                    value,
                    threshold,
                }),
            );
        }
    }

    /// 메트릭 최신값
    pub fn latest(&self, name: MetricName) -> Option<MetricRecord> {
        self.state.lock().metrics.get(&name).cloned()
    }

    pub fn dashboard_data(&self) -> DashboardData {
        let state = self.state.lock();
        let metrics = state
            .metrics
            .iter()
            .map(|(name, record)| {
                (
                    *name,
                    MetricView {
                        value: record.value,
                        rating: thresholds::rate(*name, record.value),
                        recorded_at: record.recorded_at,
                    },
                )
            })
            .collect();

        DashboardData {
            metrics,
            recent_alerts: state.alerts.iter().cloned().collect(),
            interactions: state.interactions.interaction_count(),
        }
    }

    pub fn performance_summary(&self) -> PerformanceSummary {
        let state = self.state.lock();
        let ratings: Vec<(MetricName, Rating)> = state
            .metrics
            .values()
            .filter_map(|r| thresholds::rate(r.name, r.value).map(|rating| (r.name, rating)))
            .collect();

        let passing = ratings
            .iter()
            .filter(|(_, rating)| !rating.is_breach())
            .count();
        let score = if ratings.is_empty() {
            100
        } else {
            (passing * 100 / ratings.len()) as u8
        };

        PerformanceSummary {
            metrics_tracked: state.metrics.len(),
            total_alerts: state.total_alerts,
            poor: ratings.iter().filter(|(_, r)| *r == Rating::Poor).count(),
            needs_improvement: ratings
                .iter()
                .filter(|(_, r)| *r == Rating::NeedsImprovement)
                .count(),
            core_vitals: ratings
                .iter()
                .filter(|(name, _)| name.is_core_vital())
                .copied()
                .collect(),
            score,
            long_tasks: state.long_tasks,
            total_blocking_ms: state.total_blocking_ms,
            slow_resources: state.slow_resources,
            large_resources: state.large_resources,
            dropped_observations: state.dropped_observations,
        }
    }
}

impl Drop for PerformanceCollector {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}
