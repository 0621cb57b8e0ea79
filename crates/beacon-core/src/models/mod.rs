//! BEACON 도메인 모델.
//!
//! 수집기-싱크 간 공유하는 텔레메트리 레코드 구조체를 정의한다.
//! 모든 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod context;
pub mod error_event;
pub mod event;
pub mod metric;
pub mod observation;
pub mod record;
