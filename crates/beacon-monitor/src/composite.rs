//! 복합 관찰 소스.
//!
//! 엔트리 유형별로 담당 소스를 골라 구독을 나눠 등록한다.
//! 예: 메모리는 `ProcessMemorySource`, 나머지는 호스트 공급 `ObservationHub`.

use beacon_core::error::CoreError;
use beacon_core::models::observation::EntryType;
use beacon_core::ports::observation::{ObservationCallback, ObservationSource, SubscriptionHandle};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// 유형별 라우팅 소스: 먼저 등록된 소스가 우선
pub struct CompositeSource {
    sources: Vec<Arc<dyn ObservationSource>>,
    /// 복합 핸들 → (소스 인덱스, 하위 핸들)
    subscriptions: Mutex<HashMap<u64, Vec<(usize, SubscriptionHandle)>>>,
    next_id: AtomicU64,
}

impl CompositeSource {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            subscriptions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// 소스 추가 (빌더)
    pub fn with_source(mut self, source: Arc<dyn ObservationSource>) -> Self {
        self.sources.push(source);
        self
    }

    fn owner_of(&self, entry_type: EntryType) -> Option<usize> {
        self.sources.iter().position(|s| s.supports(entry_type))
    }
}

impl Default for CompositeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservationSource for CompositeSource {
    fn subscribe(
        &self,
        entry_types: &[EntryType],
        callback: ObservationCallback,
    ) -> Result<SubscriptionHandle, CoreError> {
        let mut routed: BTreeMap<usize, Vec<EntryType>> = BTreeMap::new();
        for &entry_type in entry_types {
            match self.owner_of(entry_type) {
                Some(index) => routed.entry(index).or_default().push(entry_type),
                None => debug!("담당 소스 없음 - 구독 생략: {entry_type:?}"),
            }
        }

        if routed.is_empty() {
            return Err(CoreError::Observation(format!(
                "구독 가능한 소스가 없습니다: {entry_types:?}"
            )));
        }

        let mut handles = Vec::with_capacity(routed.len());
        for (index, types) in routed {
            match self.sources[index].subscribe(&types, callback.clone()) {
                Ok(handle) => handles.push((index, handle)),
                Err(e) => {
                    // 부분 등록 롤백
                    for (i, h) in handles {
                        self.sources[i].unsubscribe(h);
                    }
                    return Err(e);
                }
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscriptions.lock().insert(id, handles);
        Ok(SubscriptionHandle(id))
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        let handles = self.subscriptions.lock().remove(&handle.0);
        for (index, child) in handles.into_iter().flatten() {
            self.sources[index].unsubscribe(child);
        }
    }

    fn supports(&self, entry_type: EntryType) -> bool {
        self.owner_of(entry_type).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::ObservationHub;
    use beacon_core::models::observation::ObservationEntry;
    use std::sync::atomic::AtomicUsize;

    fn counting() -> (Arc<AtomicUsize>, ObservationCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let callback: ObservationCallback = Arc::new(move |_: ObservationEntry| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    fn memory_entry() -> ObservationEntry {
        ObservationEntry::Memory {
            used_bytes: 1024,
            total_bytes: None,
            limit_bytes: None,
        }
    }

    fn long_task() -> ObservationEntry {
        ObservationEntry::LongTask {
            start_time: 0.0,
            duration: 75.0,
            attribution: None,
        }
    }

    #[test]
    fn routes_each_type_to_its_owner() {
        let memory = Arc::new(ObservationHub::with_supported(&[EntryType::Memory]));
        let host = Arc::new(ObservationHub::new());
        let composite = CompositeSource::new()
            .with_source(memory.clone())
            .with_source(host.clone());

        let (count, callback) = counting();
        composite
            .subscribe(&[EntryType::Memory, EntryType::LongTask], callback)
            .unwrap();

        // 메모리는 첫 번째 소스만 담당
        assert_eq!(host.publish(memory_entry()), 0);
        assert_eq!(memory.publish(memory_entry()), 1);
        assert_eq!(host.publish(long_task()), 1);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribe_detaches_from_every_source() {
        let memory = Arc::new(ObservationHub::with_supported(&[EntryType::Memory]));
        let host = Arc::new(ObservationHub::new());
        let composite = CompositeSource::new()
            .with_source(memory.clone())
            .with_source(host.clone());

        let (_, callback) = counting();
        let handle = composite
            .subscribe(&[EntryType::Memory, EntryType::Paint], callback)
            .unwrap();
        assert_eq!(memory.subscriber_count(), 1);
        assert_eq!(host.subscriber_count(), 1);

        composite.unsubscribe(handle);
        composite.unsubscribe(handle);
        assert_eq!(memory.subscriber_count(), 0);
        assert_eq!(host.subscriber_count(), 0);
    }

    #[test]
    fn no_owner_is_an_error() {
        let composite = CompositeSource::new()
            .with_source(Arc::new(ObservationHub::with_supported(&[EntryType::Fault])));
        let (_, callback) = counting();

        assert!(!composite.supports(EntryType::Navigation));
        assert!(composite
            .subscribe(&[EntryType::Navigation], callback)
            .is_err());
    }
}
