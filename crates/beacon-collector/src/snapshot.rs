//! 에러 시점 성능 스냅샷 셀.
//!
//! 성능 수집기가 갱신하고 에러 수집기가 에러 레코드마다 사본을 첨부한다.

use beacon_core::models::error_event::PerformanceSnapshot;
use parking_lot::RwLock;

#[derive(Debug, Default)]
pub struct PerformanceSnapshotCell {
    inner: RwLock<PerformanceSnapshot>,
}

impl PerformanceSnapshotCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PerformanceSnapshot {
        self.inner.read().clone()
    }

    pub fn set_page_load(&self, ms: f64) {
        self.inner.write().page_load_ms = Some(ms);
    }

    pub fn set_first_contentful_paint(&self, ms: f64) {
        self.inner.write().first_contentful_paint_ms = Some(ms);
    }

    pub fn set_largest_contentful_paint(&self, ms: f64) {
        self.inner.write().largest_contentful_paint_ms = Some(ms);
    }

    pub fn set_heap_used(&self, bytes: u64) {
        self.inner.write().heap_used_bytes = Some(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_are_visible_in_later_snapshots_only() {
        let cell = PerformanceSnapshotCell::new();
        let empty = cell.snapshot();

        cell.set_page_load(1500.0);
        cell.set_largest_contentful_paint(2100.0);
        cell.set_heap_used(64 * 1024 * 1024);

        assert_eq!(empty, PerformanceSnapshot::default());
        let snap = cell.snapshot();
        assert_eq!(snap.page_load_ms, Some(1500.0));
        assert_eq!(snap.largest_contentful_paint_ms, Some(2100.0));
        assert_eq!(snap.first_contentful_paint_ms, None);
        assert_eq!(snap.heap_used_bytes, Some(64 * 1024 * 1024));
    }
}
