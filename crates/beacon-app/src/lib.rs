//! # beacon-app
//!
//! `beacon` 바이너리의 조립 코드. 설정 계층 병합, 싱크/관찰 소스 와이어링,
//! 라이프사이클(시그널), JSON-lines 신호 재생.

pub mod lifecycle;
pub mod replay;
pub mod settings;
pub mod wiring;
