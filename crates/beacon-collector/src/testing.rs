//! 테스트 더블.

use async_trait::async_trait;
use beacon_core::error::CoreError;
use beacon_core::models::record::{StoreName, TelemetryRecord};
use beacon_core::ports::sink::RecordSink;
use beacon_network::connectivity::ConnectivityMonitor;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::context::SharedContextProvider;
use crate::session::InMemorySessionStore;
use crate::CollectorDeps;

/// 저장소별로 받은 레코드를 기록하는 싱크
#[derive(Default)]
pub(crate) struct RecordingSink {
    records: Mutex<Vec<(StoreName, TelemetryRecord)>>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl RecordingSink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn records(&self, store: StoreName) -> Vec<TelemetryRecord> {
        self.records
            .lock()
            .iter()
            .filter(|(s, _)| *s == store)
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSink for RecordingSink {
    async fn insert(&self, store: StoreName, records: &[TelemetryRecord]) -> Result<(), CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(CoreError::Network("sink unreachable".to_string()));
        }
        self.records
            .lock()
            .extend(records.iter().cloned().map(|r| (store, r)));
        Ok(())
    }
}

pub(crate) fn deps(sink: Arc<RecordingSink>) -> CollectorDeps {
    CollectorDeps {
        sink,
        connectivity: Arc::new(ConnectivityMonitor::new(true)),
        session: Arc::new(InMemorySessionStore::with_session_id("sess_test")),
        context: Arc::new(SharedContextProvider::default()),
    }
}
