//! 프로세스 메모리 관찰 소스.
//!
//! sysinfo로 현재 프로세스의 상주 메모리를 주기적으로 샘플링해
//! `ObservationEntry::Memory`로 전달한다. 구독자가 있는 동안에만 샘플러가 돈다.

use beacon_core::error::CoreError;
use beacon_core::models::observation::{EntryType, ObservationEntry};
use beacon_core::ports::observation::{ObservationCallback, ObservationSource, SubscriptionHandle};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::hub::ObservationHub;

struct MemoryInner {
    hub: ObservationHub,
    sys: Mutex<System>,
    pid: Option<Pid>,
    sampler: Mutex<Option<(JoinHandle<()>, watch::Sender<bool>)>>,
    interval: Duration,
}

/// sysinfo 기반 메모리 관찰 소스: `ObservationSource` 포트 구현 (Memory 유형만)
pub struct ProcessMemorySource {
    inner: Arc<MemoryInner>,
}

impl ProcessMemorySource {
    /// 새 메모리 소스 생성
    pub fn new(interval: Duration) -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                warn!("현재 프로세스 PID 조회 실패 - 메모리 샘플링 불가: {e}");
                None
            }
        };

        Self {
            inner: Arc::new(MemoryInner {
                hub: ObservationHub::with_supported(&[EntryType::Memory]),
                sys: Mutex::new(System::new()),
                pid,
                sampler: Mutex::new(None),
                interval,
            }),
        }
    }

    /// 현재 메모리 스냅샷 (구독자에게 전달하지 않음)
    pub fn sample(&self) -> Result<ObservationEntry, CoreError> {
        self.inner.sample()
    }

    /// 샘플러 실행 여부
    pub fn is_sampling(&self) -> bool {
        self.inner
            .sampler
            .lock()
            .as_ref()
            .is_some_and(|(h, _)| !h.is_finished())
    }
}

impl MemoryInner {
    fn sample(&self) -> Result<ObservationEntry, CoreError> {
        let pid = self
            .pid
            .ok_or_else(|| CoreError::Observation("프로세스 PID 없음".to_string()))?;

        let mut sys = self.sys.lock();
        sys.refresh_memory();
        sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );

        let process = sys
            .process(pid)
            .ok_or_else(|| CoreError::Observation(format!("프로세스 정보 없음: {pid}")))?;

        let used_bytes = process.memory();
        let total_bytes = sys.total_memory();
        debug!(
            "프로세스 메모리: {}/{}MB",
            used_bytes / 1_048_576,
            total_bytes / 1_048_576
        );

        Ok(ObservationEntry::Memory {
            used_bytes,
            total_bytes: Some(total_bytes),
            limit_bytes: None,
        })
    }

    fn sample_and_publish(&self) {
        match self.sample() {
            Ok(entry) => {
                self.hub.publish(entry);
            }
            Err(e) => warn!("메모리 샘플링 실패: {e}"),
        }
    }

    fn ensure_sampler(self: &Arc<Self>) {
        let mut sampler = self.sampler.lock();
        if sampler.as_ref().is_some_and(|(h, _)| !h.is_finished()) {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("tokio 런타임 밖에서 구독 - 주기 메모리 샘플링 비활성화");
            return;
        };

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let weak: Weak<MemoryInner> = Arc::downgrade(self);
        let period = self.interval;

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(inner) = weak.upgrade() else { break };
                        inner.sample_and_publish();
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            debug!("메모리 샘플러 종료");
        });

        *sampler = Some((handle, shutdown_tx));
        info!("메모리 샘플러 시작 (주기: {period:?})");
    }

    fn stop_sampler(&self) {
        if let Some((_, shutdown_tx)) = self.sampler.lock().take() {
            let _ = shutdown_tx.send(true);
            info!("메모리 샘플러 정지");
        }
    }
}

impl Drop for MemoryInner {
    fn drop(&mut self) {
        self.stop_sampler();
    }
}

impl ObservationSource for ProcessMemorySource {
    fn subscribe(
        &self,
        entry_types: &[EntryType],
        callback: ObservationCallback,
    ) -> Result<SubscriptionHandle, CoreError> {
        let handle = self.inner.hub.subscribe(entry_types, callback)?;
        self.inner.ensure_sampler();
        Ok(handle)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.inner.hub.unsubscribe(handle);
        if self.inner.hub.subscriber_count() == 0 {
            self.inner.stop_sampler();
        }
    }

    fn supports(&self, entry_type: EntryType) -> bool {
        entry_type == EntryType::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn sample_reports_current_process() {
        let source = ProcessMemorySource::new(Duration::from_secs(30));
        match source.sample().unwrap() {
            ObservationEntry::Memory {
                used_bytes,
                total_bytes,
                ..
            } => {
                assert!(used_bytes > 0);
                assert!(total_bytes.unwrap() >= used_bytes);
            }
            other => panic!("unexpected entry: {other:?}"),
        }
    }

    #[test]
    fn only_memory_is_supported() {
        let source = ProcessMemorySource::new(Duration::from_secs(30));
        assert!(source.supports(EntryType::Memory));
        assert!(!source.supports(EntryType::Paint));

        let result = source.subscribe(&[EntryType::LongTask], Arc::new(|_: ObservationEntry| {}));
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn samples_while_subscribed() {
        let source = ProcessMemorySource::new(Duration::from_secs(30));
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();

        let handle = source
            .subscribe(
                &[EntryType::Memory],
                Arc::new(move |_: ObservationEntry| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
        assert!(source.is_sampling());

        // 즉시 1회 + 30초, 60초
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        source.unsubscribe(handle);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!source.is_sampling());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn subscribing_outside_runtime_does_not_sample() {
        let source = ProcessMemorySource::new(Duration::from_secs(30));
        let handle = source
            .subscribe(&[EntryType::Memory], Arc::new(|_: ObservationEntry| {}))
            .unwrap();
        assert!(!source.is_sampling());
        source.unsubscribe(handle);
    }

    #[tokio::test(start_paused = true)]
    async fn sampler_restarts_after_resubscribe() {
        let source = ProcessMemorySource::new(Duration::from_secs(30));
        let noop = || Arc::new(|_: ObservationEntry| {}) as ObservationCallback;

        let first = source.subscribe(&[EntryType::Memory], noop()).unwrap();
        let second = source.subscribe(&[EntryType::Memory], noop()).unwrap();
        assert!(source.is_sampling());

        // 구독자가 남아 있으면 계속 샘플링
        source.unsubscribe(first);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(source.is_sampling());

        source.unsubscribe(second);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!source.is_sampling());

        let third = source.subscribe(&[EntryType::Memory], noop()).unwrap();
        assert!(source.is_sampling());
        source.unsubscribe(third);
    }
}
