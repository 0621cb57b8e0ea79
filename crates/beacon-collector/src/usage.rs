//! 사용 이벤트 수집기.
//!
//! 페이지 뷰, 사용자 액션, 폼 제출, 전환 등 이산 이벤트를 레코드로 만들어
//! `usage_events` 저장소용 큐에 쌓는다. 성능 수집기의 메트릭 사본과 알림도
//! 이 경로로 기록된다.

use beacon_core::config::{DeliveryConfig, UsageConfig};
use beacon_core::models::event::EventDetail;
use beacon_core::models::metric::{MetricName, PerformanceAlert};
use beacon_core::models::record::{Attributes, RecordPayload, StoreName};
use beacon_network::batch_dispatcher::{BatchDispatcher, DispatcherStats, FlushOutcome, FlushTrigger};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use crate::sanitize::Sanitizer;
use crate::{dispatcher_config, CollectorDeps};

/// 사용 이벤트 수집기
pub struct UsageCollector {
    deps: CollectorDeps,
    dispatcher: BatchDispatcher,
    sanitizer: Sanitizer,
    enabled: bool,
    tracked: AtomicU64,
}

impl UsageCollector {
    pub fn new(
        config: &UsageConfig,
        delivery: &DeliveryConfig,
        deps: CollectorDeps,
        sanitizer: Sanitizer,
    ) -> Self {
        let dispatcher = BatchDispatcher::new(
            dispatcher_config(
                StoreName::UsageEvents,
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
            sanitizer,
            enabled: config.enabled,
            tracked: AtomicU64::new(0),
        }
    }

    /// 이벤트 기록: 새니타이즈 후 큐에 추가. 용량 도달 시 즉시 플러시 요청
    pub fn track_event(&self, detail: EventDetail) {
        let event_type = detail.event_type();
        if !self.enabled {
            debug!("[usage] 수집 비활성 - 이벤트 무시: {event_type}");
            return;
        }

        let detail = self.sanitizer.sanitize_event(detail);
        let record = self.deps.record(RecordPayload::Event(detail));
        debug!("[usage] 이벤트 기록: {event_type} ({})", record.id);

        self.tracked.fetch_add(1, Ordering::Relaxed);
        self.dispatcher.push(record);
    }

    /// 페이지 뷰: 컨텍스트 위치를 먼저 갱신한다
    pub fn track_page_view(&self, path: &str, title: Option<&str>) {
        self.deps.context.navigate(path);
        self.track_event(EventDetail::PageView {
            path: path.to_string(),
            title: title.map(str::to_string),
        });
    }

    pub fn track_user_action(&self, action: &str, target: Option<&str>, attributes: Attributes) {
        self.track_event(EventDetail::UserAction {
            action: action.to_string(),
            target: target.map(str::to_string),
            attributes,
        });
    }

    pub fn track_button_click(&self, label: &str, location: Option<&str>) {
        self.track_event(EventDetail::ButtonClick {
            label: label.to_string(),
            location: location.map(str::to_string),
        });
    }

    pub fn track_link_click(&self, url: &str, text: Option<&str>) {
        self.track_event(EventDetail::LinkClick {
            url: url.to_string(),
            text: text.map(str::to_string),
        });
    }

    /// 폼 제출: 민감 필드는 저장 전에 마스킹된다
    pub fn track_form_submit(&self, form: &str, fields: Attributes, success: bool) {
        self.track_event(EventDetail::FormSubmit {
            form: form.to_string(),
            fields,
            success,
        });
    }

    pub fn track_search(&self, query: &str, results: Option<u32>) {
        self.track_event(EventDetail::Search {
            query: query.to_string(),
            results,
        });
    }

    pub fn track_conversion(&self, name: &str, value: Option<f64>, currency: Option<&str>) {
        self.track_event(EventDetail::Conversion {
            name: name.to_string(),
            value,
            currency: currency.map(str::to_string),
        });
    }

    pub fn track_feature_usage(&self, feature: &str, attributes: Attributes) {
        self.track_event(EventDetail::FeatureUsage {
            feature: feature.to_string(),
            attributes,
        });
    }

    /// 성능 메트릭 사본
    pub fn track_performance(&self, metric: MetricName, value: f64, metadata: Attributes) {
        self.track_event(EventDetail::Performance {
            metric,
            value,
            metadata,
        });
    }

    pub fn track_performance_alert(&self, alert: PerformanceAlert) {
        self.track_event(EventDetail::PerformanceAlert(alert));
    }

    /// 주기 플러시 워커 시작 (tokio 런타임 안에서 호출)
    pub fn start(&self) {
        if !self.enabled {
            info!("[usage] 수집 비활성 - 워커 시작 안 함");
            return;
        }
        self.dispatcher.start();
    }

    pub async fn stop(&self) {
        self.dispatcher.stop().await;
    }

    /// 워커를 거치지 않고 즉시 전송
    pub async fn flush_now(&self) -> FlushOutcome {
        self.dispatcher.flush_now().await
    }

    pub async fn flush_with(&self, trigger: FlushTrigger) -> FlushOutcome {
        self.dispatcher.flush_with(trigger).await
    }

    pub fn queue_len(&self) -> usize {
        self.dispatcher.queue_len()
    }

    /// 수집기 생성 이후 기록된 이벤트 수
    pub fn tracked(&self) -> u64 {
        self.tracked.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> DispatcherStats {
        self.dispatcher.stats()
    }
}
