//! 텔레메트리 부트스트랩 서비스.
//!
//! 싱크, 연결 상태, 세션, 컨텍스트, 관찰 소스를 주입받아 세 수집기를 구성하고
//! 시작/정지 수명 주기를 소유한다.

use beacon_core::config::AppConfig;
use beacon_core::error::CoreError;
use beacon_core::models::record::Attributes;
use beacon_core::ports::context::ContextProvider;
use beacon_core::ports::observation::ObservationSource;
use beacon_core::ports::session::SessionStore;
use beacon_core::ports::sink::{ErrorStatisticsSource, RecordSink};
use beacon_network::batch_dispatcher::{DispatcherStats, FlushOutcome, FlushTrigger};
use beacon_network::connectivity::{ConnectivityMonitor, ConnectivityStats};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::SharedContextProvider;
use crate::errors::ErrorCollector;
use crate::performance::{PerformanceCollector, PerformanceSummary};
use crate::sanitize::Sanitizer;
use crate::session::InMemorySessionStore;
use crate::snapshot::PerformanceSnapshotCell;
use crate::usage::UsageCollector;
use crate::CollectorDeps;

/// 두 큐의 플러시 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub usage: FlushOutcome,
    pub errors: FlushOutcome,
}

/// 전체 상태 스냅샷
#[derive(Debug, Clone)]
pub struct TelemetryStats {
    pub usage: DispatcherStats,
    pub errors: DispatcherStats,
    pub connectivity: ConnectivityStats,
    pub usage_tracked: u64,
    pub errors_tracked: u64,
    pub performance: PerformanceSummary,
}

/// `Telemetry` 빌더
pub struct TelemetryBuilder {
    config: AppConfig,
    sink: Option<Arc<dyn RecordSink>>,
    statistics: Option<Arc<dyn ErrorStatisticsSource>>,
    connectivity: Option<Arc<ConnectivityMonitor>>,
    session: Option<Arc<dyn SessionStore>>,
    context: Option<Arc<dyn ContextProvider>>,
    source: Option<Arc<dyn ObservationSource>>,
}

impl TelemetryBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            sink: None,
            statistics: None,
            connectivity: None,
            session: None,
            context: None,
            source: None,
        }
    }

    /// 레코드 싱크 (필수)
    pub fn sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn statistics(mut self, statistics: Arc<dyn ErrorStatisticsSource>) -> Self {
        self.statistics = Some(statistics);
        self
    }

    pub fn connectivity(mut self, connectivity: Arc<ConnectivityMonitor>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    pub fn session(mut self, session: Arc<dyn SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn context(mut self, context: Arc<dyn ContextProvider>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn observation_source(mut self, source: Arc<dyn ObservationSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn build(self) -> Result<Telemetry, CoreError> {
        self.config.validate()?;
        let sink = self
            .sink
            .ok_or_else(|| CoreError::Config("레코드 싱크가 지정되지 않았습니다".to_string()))?;

        let connectivity = self
            .connectivity
            .unwrap_or_else(|| Arc::new(ConnectivityMonitor::default()));
        if self.config.delivery.force_offline {
            connectivity.set_force_offline(true);
        }

        let session = self
            .session
            .unwrap_or_else(|| Arc::new(InMemorySessionStore::new()));
        let context = self.context.unwrap_or_else(|| {
            Arc::new(SharedContextProvider::from_config(&self.config.context))
        });

        let deps = CollectorDeps {
            sink,
            connectivity: connectivity.clone(),
            session: session.clone(),
            context,
        };
        let sanitizer = Sanitizer::from_config(&self.config.privacy);
        let snapshot = Arc::new(PerformanceSnapshotCell::new());

        let usage = Arc::new(UsageCollector::new(
            &self.config.usage,
            &self.config.delivery,
            deps.clone(),
            sanitizer.clone(),
        ));

        let mut errors = ErrorCollector::new(
            &self.config.errors,
            &self.config.delivery,
            deps,
            snapshot.clone(),
            sanitizer,
        );
        if let Some(statistics) = self.statistics {
            errors = errors.with_statistics(statistics);
        }
        let errors = Arc::new(errors);

        let performance = Arc::new(PerformanceCollector::new(
            &self.config.performance,
            usage.clone(),
            errors.clone(),
            snapshot,
        ));

        Ok(Telemetry {
            config: self.config,
            usage,
            errors,
            performance,
            connectivity,
            session,
            source: self.source,
            started: AtomicBool::new(false),
        })
    }
}

/// 텔레메트리 서비스
pub struct Telemetry {
    config: AppConfig,
    usage: Arc<UsageCollector>,
    errors: Arc<ErrorCollector>,
    performance: Arc<PerformanceCollector>,
    connectivity: Arc<ConnectivityMonitor>,
    session: Arc<dyn SessionStore>,
    source: Option<Arc<dyn ObservationSource>>,
    started: AtomicBool,
}

impl Telemetry {
    pub fn builder(config: AppConfig) -> TelemetryBuilder {
        TelemetryBuilder::new(config)
    }

    /// 플러시 워커 시작, 장애/성능 관찰 구독. 멱등
    ///
    /// tokio 런타임 안에서 호출해야 한다.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("텔레메트리 이미 시작됨");
            return;
        }

        self.usage.start();
        self.errors.start();

        if let Some(source) = &self.source {
            if self.config.errors.enabled {
                if let Err(e) = self.errors.attach_fault_source(source.clone()) {
                    warn!("장애 관찰 구독 실패 - 명시적 보고만 수집: {e}");
                }
            }
            self.performance.start_monitoring(source.clone());
        } else {
            info!("관찰 소스 없음 - 명시적 track 호출만 수집");
        }

        if self.config.errors.enabled && self.config.errors.capture_panics {
            self.errors.install_panic_hook();
        }

        info!(
            "텔레메트리 시작 (세션: {}, 온라인: {})",
            self.session.session_id(),
            self.connectivity.is_online()
        );
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn usage(&self) -> &Arc<UsageCollector> {
        &self.usage
    }

    pub fn errors(&self) -> &Arc<ErrorCollector> {
        &self.errors
    }

    pub fn performance(&self) -> &Arc<PerformanceCollector> {
        &self.performance
    }

    pub fn connectivity(&self) -> &Arc<ConnectivityMonitor> {
        &self.connectivity
    }

    /// 온라인/오프라인 신호. 온라인 복귀 시 각 워커가 즉시 한 번 플러시한다
    pub fn set_online(&self, online: bool) {
        self.connectivity.set_online(online);
    }

    /// 로그인: 세션 ID는 유지
    pub fn login(&self, user_id: &str) {
        self.session.set_user_id(Some(user_id.to_string()));
    }

    pub fn logout(&self) {
        self.session.set_user_id(None);
    }

    /// 화면 비가시화: 마지막 이벤트 기록 후 두 큐를 즉시 플러시 (백오프 무시)
    pub async fn on_visibility_hidden(&self) -> FlushReport {
        self.record_lifecycle_event("visibility-hidden");
        self.flush_all(FlushTrigger::Unload).await
    }

    /// 종료: 마지막 이벤트 기록, 관찰 해제, 최종 플러시, 워커 정지
    pub async fn shutdown(&self) -> FlushReport {
        self.record_lifecycle_event("page-unload");
        self.performance.stop_monitoring();

        let report = self.flush_all(FlushTrigger::Unload).await;
        self.usage.stop().await;
        self.errors.stop().await;
        self.started.store(false, Ordering::SeqCst);

        let stats = self.stats();
        if stats.usage.live + stats.usage.sealed + stats.errors.live + stats.errors.sealed > 0 {
            warn!(
                "종료 시 미전송 레코드 유실: 사용 {}개, 에러 {}개",
                stats.usage.live + stats.usage.sealed,
                stats.errors.live + stats.errors.sealed
            );
        }
        info!("텔레메트리 종료: {report:?}");
        report
    }

    /// 두 큐 즉시 플러시
    pub async fn flush_all(&self, trigger: FlushTrigger) -> FlushReport {
        let (usage, errors) = tokio::join!(
            self.usage.flush_with(trigger),
            self.errors.flush_with(trigger)
        );
        FlushReport { usage, errors }
    }

    fn record_lifecycle_event(&self, action: &str) {
        let attributes = Attributes::from([(
            "session_id".to_string(),
            json!(self.session.session_id()),
        )]);
        self.usage.track_user_action(action, None, attributes);
    }

    pub fn stats(&self) -> TelemetryStats {
        TelemetryStats {
            usage: self.usage.stats(),
            errors: self.errors.stats(),
            connectivity: self.connectivity.stats(),
            usage_tracked: self.usage.tracked(),
            errors_tracked: self.errors.tracked(),
            performance: self.performance.performance_summary(),
        }
    }
}
