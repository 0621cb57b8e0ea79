//! # beacon-collector
//!
//! 사용 이벤트, 에러, 성능 수집기와 이를 묶는 [`telemetry::Telemetry`] 서비스.
//!
//! - [`usage`]: 페이지 뷰/액션/폼 제출/전환 이벤트 → `usage_events` 저장소
//! - [`errors`]: 장애/API/네트워크/상호작용 에러 → `error_logs` 저장소
//! - [`performance`]: 관찰 엔트리 → 메트릭 최신값, 임계값 알림, 심각 위반 승격
//!
//! 모든 `track_*` 메서드는 호출자에게 에러를 돌려주지 않는다.

pub mod context;
pub mod errors;
pub mod performance;
pub mod sanitize;
pub mod session;
pub mod snapshot;
pub mod telemetry;
pub mod usage;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use beacon_core::config::DeliveryConfig;
use beacon_core::models::record::{RecordPayload, StoreName, TelemetryRecord};
use beacon_core::ports::context::ContextProvider;
use beacon_core::ports::session::SessionStore;
use beacon_core::ports::sink::RecordSink;
use beacon_network::batch_dispatcher::DispatcherConfig;
use beacon_network::connectivity::ConnectivityMonitor;
use std::time::Duration;

/// 수집기 공통 의존성
#[derive(Clone)]
pub struct CollectorDeps {
    pub sink: Arc<dyn RecordSink>,
    pub connectivity: Arc<ConnectivityMonitor>,
    pub session: Arc<dyn SessionStore>,
    pub context: Arc<dyn ContextProvider>,
}

impl CollectorDeps {
    /// 현재 세션/사용자/환경으로 레코드 생성
    pub fn record(&self, payload: RecordPayload) -> TelemetryRecord {
        TelemetryRecord::new(
            self.session.session_id(),
            self.session.user_id(),
            self.context.capture(),
            payload,
        )
    }
}

/// 수집기 설정 + 전송 설정 → 디스패처 설정
pub(crate) fn dispatcher_config(
    store: StoreName,
    capacity: usize,
    flush_interval: Duration,
    max_buffered: usize,
    delivery: &DeliveryConfig,
) -> DispatcherConfig {
    DispatcherConfig::new(store, capacity, flush_interval)
        .with_max_buffered(max_buffered)
        .with_delivery_timeout(delivery.timeout())
        .with_max_backoff(delivery.max_backoff())
}
