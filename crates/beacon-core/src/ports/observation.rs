//! 관찰 소스 포트.
//!
//! 구현: `beacon-monitor` crate (호스트 공급 허브, sysinfo 메모리 샘플러)
//!
//! 성능 수집기와 에러 수집기는 페인트/입력/레이아웃 이동/리소스/내비게이션/
//! 롱 태스크/메모리/장애 관찰을 모두 이 형태로 구독한다.

use std::sync::Arc;

use crate::error::CoreError;
use crate::models::observation::{EntryType, ObservationEntry};

/// 구독 콜백. 소스의 스레드에서 동기적으로 호출된다
pub type ObservationCallback = Arc<dyn Fn(ObservationEntry) + Send + Sync>;

/// 구독 핸들 (구독 해제에 사용)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// 관찰 소스
pub trait ObservationSource: Send + Sync {
    /// 지정 엔트리 유형 구독
    ///
    /// 소스가 지원하지 않는 유형만 요청하면 `CoreError::Observation`을 반환한다.
    fn subscribe(
        &self,
        entry_types: &[EntryType],
        callback: ObservationCallback,
    ) -> Result<SubscriptionHandle, CoreError>;

    /// 구독 해제. 이미 해제된 핸들은 무시한다
    fn unsubscribe(&self, handle: SubscriptionHandle);

    /// 이 소스가 공급할 수 있는 엔트리 유형인지
    fn supports(&self, entry_type: EntryType) -> bool;
}
