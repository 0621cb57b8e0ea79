//! 에러 수집기.
//!
//! 호스트의 장애 보고(미처리 예외, 비동기 거부, 컴포넌트 경계)와 명시적으로
//! 보고된 API/네트워크/성능/상호작용 에러를 환경 컨텍스트와 성능 스냅샷을
//! 붙여 `error_logs` 저장소용 큐에 쌓는다.
//!
//! `critical` 레코드는 즉시 플러시를 요청하고, 나머지는 주기 타이머를 기다린다.

use beacon_core::config::{DeliveryConfig, ErrorsConfig};
use beacon_core::error::CoreError;
use beacon_core::models::error_event::{
    ApiFailure, ErrorCategory, ErrorDetail, ErrorPayload, ErrorSeverity, ErrorStatistics,
};
use beacon_core::models::metric::MetricName;
use beacon_core::models::observation::{EntryType, FaultKind, FaultReport, ObservationEntry};
use beacon_core::models::record::{RecordPayload, StoreName};
use beacon_core::ports::observation::{ObservationSource, SubscriptionHandle};
use beacon_core::ports::sink::ErrorStatisticsSource;
use beacon_network::batch_dispatcher::{BatchDispatcher, DispatcherStats, FlushOutcome, FlushTrigger};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use crate::sanitize::Sanitizer;
use crate::snapshot::PerformanceSnapshotCell;
use crate::{dispatcher_config, CollectorDeps};

/// 에러 보고 입력. 지정하지 않은 심각도/분류는 medium / script-fault
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    pub message: String,
    pub severity: Option<ErrorSeverity>,
    pub category: Option<ErrorCategory>,
    pub stack: Option<String>,
    pub component_trail: Vec<String>,
    pub detail: ErrorDetail,
}

impl ErrorReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: None,
            category: None,
            stack: None,
            component_trail: Vec::new(),
            detail: ErrorDetail::Reported,
        }
    }

    pub fn with_severity(mut self, severity: ErrorSeverity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_component_trail(mut self, trail: Vec<String>) -> Self {
        self.component_trail = trail;
        self
    }

    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.detail = detail;
        self
    }
}

/// 에러 수집기
pub struct ErrorCollector {
    deps: CollectorDeps,
    dispatcher: BatchDispatcher,
    snapshot: Arc<PerformanceSnapshotCell>,
    sanitizer: Sanitizer,
    statistics: Option<Arc<dyn ErrorStatisticsSource>>,
    enabled: bool,
    tracked: AtomicU64,
    fault_subscription: Mutex<Option<(Arc<dyn ObservationSource>, SubscriptionHandle)>>,
    panic_hook_installed: AtomicBool,
}

impl ErrorCollector {
    pub fn new(
        config: &ErrorsConfig,
        delivery: &DeliveryConfig,
        deps: CollectorDeps,
        snapshot: Arc<PerformanceSnapshotCell>,
        sanitizer: Sanitizer,
    ) -> Self {
        let dispatcher = BatchDispatcher::new(
            dispatcher_config(
                StoreName::ErrorLogs,
                config.capacity,
                config.flush_interval(),
                config.max_buffered(),
                delivery,
            ),
            deps.sink.clone(),
            deps.connectivity.clone(),
        );

        Self {
            deps,
            dispatcher,
            snapshot,
            sanitizer,
            statistics: None,
            enabled: config.enabled,
            tracked: AtomicU64::new(0),
            fault_subscription: Mutex::new(None),
            panic_hook_installed: AtomicBool::new(false),
        }
    }

    /// 대시보드 집계 조회 경로 설정
    pub fn with_statistics(mut self, source: Arc<dyn ErrorStatisticsSource>) -> Self {
        self.statistics = Some(source);
        self
    }

    /// 에러 기록
    pub fn track_error(&self, report: ErrorReport) {
        if !self.enabled {
            debug!("[errors] 수집 비활성 - 에러 무시: {}", report.message);
            return;
        }

        let severity = report.severity.unwrap_or(ErrorSeverity::Medium);
        let category = report.category.unwrap_or(ErrorCategory::ScriptFault);
        let payload = ErrorPayload {
            message: report.message,
            severity,
            category,
            stack: report.stack,
            component_trail: report.component_trail,
            performance: self.snapshot.snapshot(),
            detail: report.detail,
        };

        let record = self.deps.record(RecordPayload::Error(payload));
        debug!(
            "[errors] 에러 기록: {} / {} ({})",
            severity.as_str(),
            category.as_str(),
            record.id
        );

        self.tracked.fetch_add(1, Ordering::Relaxed);
        self.dispatcher.push(record);

        if severity == ErrorSeverity::Critical {
            debug!("[errors] 치명적 에러 - 즉시 플러시 요청");
            self.dispatcher.request_flush(FlushTrigger::Critical);
        }
    }

    /// API 에러: HTTP 상태로 심각도 도출, 요청/응답 본문은 새니타이즈
    pub fn track_api_error(&self, failure: ApiFailure) {
        let severity = ErrorSeverity::from_http_status(failure.status);
        let category = match failure.status {
            401 | 403 => ErrorCategory::Auth,
            _ => ErrorCategory::Api,
        };
        let message = failure.message.clone().unwrap_or_else(|| {
            format!(
                "{} {} 실패 (HTTP {})",
                failure.method, failure.url, failure.status
            )
        });

        let failure = ApiFailure {
            request_body: failure
                .request_body
                .as_ref()
                .map(|body| self.sanitizer.sanitize_value(body)),
            response_body: failure
                .response_body
                .as_ref()
                .map(|body| self.sanitizer.sanitize_value(body)),
            ..failure
        };

        self.track_error(
            ErrorReport::new(message)
                .with_severity(severity)
                .with_category(category)
                .with_detail(ErrorDetail::Api(failure)),
        );
    }

    pub fn track_network_error(&self, url: &str, method: Option<&str>, message: &str) {
        self.track_error(
            ErrorReport::new(message)
                .with_severity(ErrorSeverity::Medium)
                .with_category(ErrorCategory::Network)
                .with_detail(ErrorDetail::Network {
                    url: url.to_string(),
                    method: method.map(str::to_string),
                }),
        );
    }

    pub fn track_performance_error(&self, metric: MetricName, value: f64, threshold: f64) {
        self.track_error(
            ErrorReport::new(format!("{metric} 임계값 초과: {value} > {threshold}"))
                .with_severity(ErrorSeverity::Medium)
                .with_category(ErrorCategory::Performance)
                .with_detail(ErrorDetail::Performance {
                    metric,
                    value,
                    threshold,
                }),
        );
    }

    pub fn track_user_interaction_error(&self, action: &str, element: Option<&str>, message: &str) {
        self.track_error(
            ErrorReport::new(message)
                .with_severity(ErrorSeverity::Low)
                .with_category(ErrorCategory::UserInteraction)
                .with_detail(ErrorDetail::Interaction {
                    action: action.to_string(),
                    element: element.map(str::to_string),
                }),
        );
    }

    /// 호스트 장애 보고를 에러 레코드로 변환
    pub fn track_fault(&self, fault: FaultReport) {
        let (severity, detail) = match fault.kind {
            FaultKind::Uncaught => (
                ErrorSeverity::High,
                ErrorDetail::ScriptFault {
                    file: fault.file,
                    line: fault.line,
                    column: fault.column,
                },
            ),
            FaultKind::UnhandledRejection => (
                ErrorSeverity::Medium,
                ErrorDetail::UnhandledRejection {
                    reason: fault.message.clone(),
                },
            ),
            FaultKind::ComponentBoundary => (
                ErrorSeverity::High,
                ErrorDetail::ComponentBoundary {
                    component: fault
                        .component_trail
                        .last()
                        .cloned()
                        .unwrap_or_else(|| "unknown".to_string()),
                },
            ),
        };

        let mut report = ErrorReport::new(fault.message)
            .with_severity(severity)
            .with_category(ErrorCategory::ScriptFault)
            .with_component_trail(fault.component_trail)
            .with_detail(detail);
        report.stack = fault.stack;
        self.track_error(report);
    }

    /// 장애 관찰 구독. 이미 연결돼 있으면 기존 구독을 교체한다
    pub fn attach_fault_source(
        self: &Arc<Self>,
        source: Arc<dyn ObservationSource>,
    ) -> Result<(), CoreError> {
        self.detach_fault_source();

        let weak: Weak<ErrorCollector> = Arc::downgrade(self);
        let handle = source.subscribe(
            &[EntryType::Fault],
            Arc::new(move |entry: ObservationEntry| {
                let Some(collector) = weak.upgrade() else {
                    return;
                };
                match entry {
                    ObservationEntry::Fault(fault) => collector.track_fault(fault),
                    other => debug!("[errors] 장애 외 엔트리 무시: {:?}", other.entry_type()),
                }
            }),
        )?;

        *self.fault_subscription.lock() = Some((source, handle));
        info!("[errors] 장애 관찰 구독 시작");
        Ok(())
    }

    /// 장애 관찰 구독 해제. 멱등
    pub fn detach_fault_source(&self) {
        if let Some((source, handle)) = self.fault_subscription.lock().take() {
            source.unsubscribe(handle);
            info!("[errors] 장애 관찰 구독 해제");
        }
    }

    /// Rust panic을 치명적 스크립트 장애로 기록하는 panic hook 설치
    ///
    /// 이전 hook은 기록 후 그대로 호출된다. 두 번째 호출부터는 무시.
    pub fn install_panic_hook(self: &Arc<Self>) {
        if self.panic_hook_installed.swap(true, Ordering::SeqCst) {
            return;
        }

        let weak: Weak<ErrorCollector> = Arc::downgrade(self);
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if let Some(collector) = weak.upgrade() {
                let payload = info.payload();
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "panic".to_string());
                let location = info
                    .location()
                    .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
                let thread = std::thread::current().name().map(str::to_string);

                collector.track_error(
                    ErrorReport::new(message)
                        .with_severity(ErrorSeverity::Critical)
                        .with_category(ErrorCategory::ScriptFault)
                        .with_detail(ErrorDetail::Panic { location, thread }),
                );
            }
            previous(info);
        }));
        info!("[errors] panic hook 설치");
    }

    /// 최근 24시간 에러 집계 (전체 건수는 전 기간)
    pub async fn error_statistics(&self) -> Result<ErrorStatistics, CoreError> {
        let source = self.statistics.as_ref().ok_or_else(|| {
            CoreError::Config("에러 통계 소스가 설정되지 않았습니다".to_string())
        })?;
        let since = Utc::now() - chrono::Duration::hours(24);
        source.error_statistics(since).await.inspect_err(|e| {
            warn!("[errors] 에러 통계 조회 실패: {e}");
        })
    }

    pub fn start(&self) {
        if !self.enabled {
            info!("[errors] 수집 비활성 - 워커 시작 안 함");
            return;
        }
        self.dispatcher.start();
    }

    /// 워커 정지 + 장애 구독 해제
    pub async fn stop(&self) {
        self.detach_fault_source();
        self.dispatcher.stop().await;
    }

    pub async fn flush_now(&self) -> FlushOutcome {
        self.dispatcher.flush_now().await
    }

    pub async fn flush_with(&self, trigger: FlushTrigger) -> FlushOutcome {
        self.dispatcher.flush_with(trigger).await
    }

    pub fn queue_len(&self) -> usize {
        self.dispatcher.queue_len()
    }

    pub fn tracked(&self) -> u64 {
        self.tracked.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> DispatcherStats {
        self.dispatcher.stats()
    }
}
