//! 환경 컨텍스트 제공 포트.

use crate::models::context::EnvironmentContext;

/// 레코드 생성 시점의 환경 스냅샷 제공자
pub trait ContextProvider: Send + Sync {
    /// 현재 환경 스냅샷 (반환값은 이후 변경되지 않는다)
    fn capture(&self) -> EnvironmentContext;

    /// 페이지 뷰 시 현재 위치 갱신. 이미 캡처된 스냅샷에는 영향 없음
    fn navigate(&self, _location: &str) {}
}
