//! 연결 상태 모니터.
//!
//! 호스트의 `online`/`offline` 신호를 받아 온라인 여부를 추적하고,
//! 상태 전환을 watch 채널로 브로드캐스트한다.
//! 디스패처는 오프라인 동안 플러시를 건너뛰고, 온라인 복귀 시 즉시 1회 플러시한다.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// 연결 상태 모니터
///
/// 실효 온라인 여부 = 호스트 신호가 online 이고 강제 오프라인이 아님.
pub struct ConnectivityMonitor {
    /// 호스트가 마지막으로 보고한 상태
    reported_online: AtomicBool,
    /// 강제 오프라인 모드
    force_offline: AtomicBool,
    /// 실효 상태 전환 횟수
    transitions: AtomicU64,
    /// 마지막 실효 상태 전환 시각
    last_change: Mutex<Option<DateTime<Utc>>>,
    /// 실효 상태 브로드캐스트 (수신기가 없어도 값은 갱신됨)
    status_tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// 초기 상태를 지정해 생성
    pub fn new(initially_online: bool) -> Self {
        let (status_tx, _) = watch::channel(initially_online);
        Self {
            reported_online: AtomicBool::new(initially_online),
            force_offline: AtomicBool::new(false),
            transitions: AtomicU64::new(0),
            last_change: Mutex::new(None),
            status_tx,
        }
    }

    /// 호스트의 online/offline 신호 반영
    pub fn set_online(&self, online: bool) {
        let previous = self.reported_online.swap(online, Ordering::SeqCst);
        if previous != online {
            debug!("연결 신호 수신: online={online}");
        }
        self.publish();
    }

    /// 강제 오프라인 모드 설정
    pub fn set_force_offline(&self, force: bool) {
        let previous = self.force_offline.swap(force, Ordering::SeqCst);
        if previous != force {
            if force {
                info!("강제 오프라인 모드 활성화");
            } else {
                info!("강제 오프라인 모드 해제");
            }
        }
        self.publish();
    }

    /// 강제 오프라인 모드 여부
    pub fn is_force_offline(&self) -> bool {
        self.force_offline.load(Ordering::SeqCst)
    }

    /// 현재 실효 온라인 상태
    pub fn is_online(&self) -> bool {
        !self.is_force_offline() && self.reported_online.load(Ordering::SeqCst)
    }

    /// 실효 상태 변경 수신기 생성
    ///
    /// 구독 이전의 전환은 이미 읽은 것으로 표시되어, 이후 전환에만 깨어난다.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.status_tx.subscribe()
    }

    /// 실효 상태가 바뀌었으면 브로드캐스트
    fn publish(&self) {
        let online = self.is_online();
        let changed = self.status_tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if changed {
            self.transitions.fetch_add(1, Ordering::Relaxed);
            *self.last_change.lock() = Some(Utc::now());
            if online {
                info!("연결 복구됨 - 온라인 모드");
            } else {
                info!("연결 끊김 - 오프라인 모드 (플러시 보류)");
            }
        }
    }

    /// 연결 상태 통계
    pub fn stats(&self) -> ConnectivityStats {
        ConnectivityStats {
            is_online: self.is_online(),
            force_offline: self.is_force_offline(),
            transitions: self.transitions.load(Ordering::Relaxed),
            last_change: *self.last_change.lock(),
        }
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

/// 연결 상태 통계
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityStats {
    /// 현재 실효 온라인 여부
    pub is_online: bool,
    /// 강제 오프라인 모드
    pub force_offline: bool,
    /// 실효 상태 전환 횟수
    pub transitions: u64,
    /// 마지막 전환 시각
    pub last_change: Option<DateTime<Utc>>,
}

/// Arc로 감싼 ConnectivityMonitor
pub type SharedConnectivity = Arc<ConnectivityMonitor>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_follows_constructor() {
        assert!(ConnectivityMonitor::default().is_online());
        assert!(!ConnectivityMonitor::new(false).is_online());
    }

    #[test]
    fn repeated_signal_is_not_a_transition() {
        let monitor = ConnectivityMonitor::new(true);
        monitor.set_online(true);
        monitor.set_online(true);
        assert_eq!(monitor.stats().transitions, 0);

        monitor.set_online(false);
        monitor.set_online(false);
        assert_eq!(monitor.stats().transitions, 1);
        assert!(monitor.stats().last_change.is_some());
    }

    #[test]
    fn force_offline_overrides_host_signal() {
        let monitor = ConnectivityMonitor::new(true);

        monitor.set_force_offline(true);
        assert!(!monitor.is_online());

        monitor.set_online(true); // 강제 모드에서는 여전히 오프라인
        assert!(!monitor.is_online());

        monitor.set_force_offline(false);
        assert!(monitor.is_online());
    }

    #[tokio::test]
    async fn subscribe_receives_transitions() {
        let monitor = ConnectivityMonitor::new(true);
        let mut rx = monitor.subscribe();
        assert!(*rx.borrow());

        monitor.set_online(false);
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());

        monitor.set_online(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
    }

    #[tokio::test]
    async fn unchanged_signal_does_not_wake_subscribers() {
        let monitor = ConnectivityMonitor::new(true);
        let mut rx = monitor.subscribe();

        monitor.set_online(true);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn late_subscriber_ignores_earlier_transitions() {
        let monitor = ConnectivityMonitor::new(true);
        monitor.set_online(false);
        monitor.set_online(true);

        let mut rx = monitor.subscribe();
        assert!(*rx.borrow());
        assert!(!rx.has_changed().unwrap());

        monitor.set_online(false);
        rx.changed().await.unwrap();
        assert!(!*rx.borrow_and_update());
    }
}
