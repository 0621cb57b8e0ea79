//! 세션/식별자 저장소 포트.
//!
//! 텔레메트리 코어는 읽기만 하며, 수명 주기는 호스트가 소유한다.

/// 세션 범위 식별자 저장소
pub trait SessionStore: Send + Sync {
    /// 세션 ID: 첫 사용 시 생성되고 세션 동안 변하지 않는다
    fn session_id(&self) -> String;

    /// 인증된 사용자 ID (익명이면 None)
    fn user_id(&self) -> Option<String>;

    /// 사용자 ID 변경 (로그인/로그아웃). 세션 ID에는 영향 없음
    fn set_user_id(&self, user_id: Option<String>);
}
