//! 관찰 허브.
//!
//! 호스트 애플리케이션이 페인트/입력/레이아웃 이동/리소스/내비게이션/롱 태스크/
//! 장애 엔트리를 `publish`하면, 해당 유형을 구독한 콜백에 전달한다.
//! 구독자 콜백의 panic은 잡아서 로그만 남긴다 (계측 실패는 호스트에 전파하지 않음).

use beacon_core::error::CoreError;
use beacon_core::models::observation::{EntryType, ObservationEntry};
use beacon_core::ports::observation::{ObservationCallback, ObservationSource, SubscriptionHandle};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

struct Subscriber {
    entry_types: HashSet<EntryType>,
    callback: ObservationCallback,
}

/// 호스트 공급 관찰 소스: `ObservationSource` 포트 구현
pub struct ObservationHub {
    /// 공급 가능한 유형 (None이면 전체)
    supported: Option<HashSet<EntryType>>,
    subscribers: RwLock<HashMap<u64, Subscriber>>,
    next_id: AtomicU64,
    published: AtomicU64,
    callback_panics: AtomicU64,
}

impl ObservationHub {
    /// 모든 엔트리 유형을 공급하는 허브
    pub fn new() -> Self {
        Self {
            supported: None,
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            published: AtomicU64::new(0),
            callback_panics: AtomicU64::new(0),
        }
    }

    /// 지정 유형만 공급하는 허브
    pub fn with_supported(entry_types: &[EntryType]) -> Self {
        Self {
            supported: Some(entry_types.iter().copied().collect()),
            ..Self::new()
        }
    }

    /// 엔트리를 구독자들에게 전달. 전달된 구독자 수 반환
    pub fn publish(&self, entry: ObservationEntry) -> usize {
        let entry_type = entry.entry_type();
        if !self.supports(entry_type) {
            debug!("지원하지 않는 엔트리 유형 무시: {entry_type:?}");
            return 0;
        }

        // 콜백 안에서 구독/해제가 가능하도록 잠금 밖에서 호출
        let callbacks: Vec<ObservationCallback> = self
            .subscribers
            .read()
            .values()
            .filter(|s| s.entry_types.contains(&entry_type))
            .map(|s| s.callback.clone())
            .collect();

        self.published.fetch_add(1, Ordering::Relaxed);

        let mut delivered = 0;
        for callback in callbacks {
            let entry = entry.clone();
            match catch_unwind(AssertUnwindSafe(|| callback(entry))) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    self.callback_panics.fetch_add(1, Ordering::Relaxed);
                    warn!("관찰 콜백 panic - 엔트리 폐기 ({entry_type:?})");
                }
            }
        }
        delivered
    }

    /// 현재 구독 수
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// 누적 publish 수
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// panic으로 폐기된 콜백 호출 수
    pub fn callback_panics(&self) -> u64 {
        self.callback_panics.load(Ordering::Relaxed)
    }
}

impl Default for ObservationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservationSource for ObservationHub {
    fn subscribe(
        &self,
        entry_types: &[EntryType],
        callback: ObservationCallback,
    ) -> Result<SubscriptionHandle, CoreError> {
        let entry_types: HashSet<EntryType> = entry_types
            .iter()
            .copied()
            .filter(|t| self.supports(*t))
            .collect();

        if entry_types.is_empty() {
            return Err(CoreError::Observation(
                "구독 가능한 엔트리 유형이 없습니다".to_string(),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!("관찰 구독 등록: #{id} {entry_types:?}");
        self.subscribers.write().insert(
            id,
            Subscriber {
                entry_types,
                callback,
            },
        );
        Ok(SubscriptionHandle(id))
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        if self.subscribers.write().remove(&handle.0).is_some() {
            debug!("관찰 구독 해제: #{}", handle.0);
        }
    }

    fn supports(&self, entry_type: EntryType) -> bool {
        self.supported
            .as_ref()
            .map_or(true, |set| set.contains(&entry_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn long_task(duration: f64) -> ObservationEntry {
        ObservationEntry::LongTask {
            start_time: 100.0,
            duration,
            attribution: None,
        }
    }

    fn collecting() -> (Arc<Mutex<Vec<ObservationEntry>>>, ObservationCallback) {
        let seen = Arc::new(Mutex::new(Vec::<ObservationEntry>::new()));
        let sink = seen.clone();
        let callback: ObservationCallback =
            Arc::new(move |entry: ObservationEntry| sink.lock().push(entry));
        (seen, callback)
    }

    #[test]
    fn fan_out_by_entry_type() {
        let hub = ObservationHub::new();
        let (tasks, on_task) = collecting();
        let (shifts, on_shift) = collecting();

        hub.subscribe(&[EntryType::LongTask], on_task).unwrap();
        hub.subscribe(&[EntryType::LayoutShift], on_shift).unwrap();

        assert_eq!(hub.publish(long_task(80.0)), 1);
        assert_eq!(tasks.lock().len(), 1);
        assert!(shifts.lock().is_empty());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let hub = ObservationHub::new();
        let (seen, callback) = collecting();
        let handle = hub.subscribe(&[EntryType::LongTask], callback).unwrap();

        hub.unsubscribe(handle);
        hub.unsubscribe(handle); // 중복 해제는 무시
        assert_eq!(hub.publish(long_task(80.0)), 0);
        assert!(seen.lock().is_empty());
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn panicking_subscriber_does_not_affect_others() {
        let hub = ObservationHub::new();
        let (seen, callback) = collecting();

        hub.subscribe(
            &[EntryType::LongTask],
            Arc::new(|_: ObservationEntry| panic!("subscriber failure")),
        )
        .unwrap();
        hub.subscribe(&[EntryType::LongTask], callback).unwrap();

        assert_eq!(hub.publish(long_task(60.0)), 1);
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(hub.callback_panics(), 1);
    }

    #[test]
    fn restricted_hub_rejects_unsupported_types() {
        let hub = ObservationHub::with_supported(&[EntryType::Fault]);
        let (_, callback) = collecting();

        assert!(!hub.supports(EntryType::Paint));
        let err = hub.subscribe(&[EntryType::Paint], callback).unwrap_err();
        assert!(matches!(err, CoreError::Observation(_)));
        assert_eq!(hub.publish(long_task(70.0)), 0);
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let hub = Arc::new(ObservationHub::new());
        let handle_slot: Arc<Mutex<Option<SubscriptionHandle>>> = Arc::new(Mutex::new(None));

        let hub_ref = Arc::downgrade(&hub);
        let slot = handle_slot.clone();
        let handle = hub
            .subscribe(
                &[EntryType::LongTask],
                Arc::new(move |_: ObservationEntry| {
                    if let (Some(hub), Some(handle)) = (hub_ref.upgrade(), *slot.lock()) {
                        hub.unsubscribe(handle);
                    }
                }),
            )
            .unwrap();
        *handle_slot.lock() = Some(handle);

        assert_eq!(hub.publish(long_task(90.0)), 1);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
