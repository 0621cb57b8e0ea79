//! 프로세스 범위 세션 저장소.
//!
//! 실행 중인 프로세스 하나를 한 세션으로 본다. 세션 ID는 첫 조회 시 생성된다.

use beacon_core::ports::session::SessionStore;
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::OnceLock;
use tracing::debug;
use uuid::Uuid;

/// 메모리 기반 `SessionStore` 구현
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    session_id: OnceLock<String>,
    user_id: RwLock<Option<String>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 고정 세션 ID로 생성 (호스트가 ID를 이미 갖고 있을 때)
    pub fn with_session_id(session_id: impl Into<String>) -> Self {
        let store = Self::default();
        let _ = store.session_id.set(session_id.into());
        store
    }
}

/// `sess_{unix_ms}_{8자리 hex}` 형식
fn generate_session_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("sess_{}_{}", Utc::now().timestamp_millis(), &suffix[..8])
}

impl SessionStore for InMemorySessionStore {
    fn session_id(&self) -> String {
        self.session_id
            .get_or_init(|| {
                let id = generate_session_id();
                debug!("세션 ID 생성: {id}");
                id
            })
            .clone()
    }

    fn user_id(&self) -> Option<String> {
        self.user_id.read().clone()
    }

    fn set_user_id(&self, user_id: Option<String>) {
        debug!("사용자 ID 변경: {:?}", user_id.as_deref());
        *self.user_id.write() = user_id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_stable_across_login() {
        let store = InMemorySessionStore::new();
        let first = store.session_id();
        assert!(first.starts_with("sess_"));

        store.set_user_id(Some("user_42".to_string()));
        assert_eq!(store.user_id().as_deref(), Some("user_42"));
        assert_eq!(store.session_id(), first);

        store.set_user_id(None);
        assert_eq!(store.user_id(), None);
        assert_eq!(store.session_id(), first);
    }

    #[test]
    fn separate_stores_get_distinct_sessions() {
        let a = InMemorySessionStore::new();
        let b = InMemorySessionStore::new();
        assert_ne!(a.session_id(), b.session_id());
    }

    #[test]
    fn preset_session_id_is_kept() {
        let store = InMemorySessionStore::with_session_id("sess_fixed");
        assert_eq!(store.session_id(), "sess_fixed");
    }
}
