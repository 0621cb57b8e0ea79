//! # beacon-monitor
//!
//! 관찰 소스 어댑터.
//! 호스트 애플리케이션이 공급하는 성능/장애 엔트리를 구독자에게 전달하고,
//! sysinfo로 프로세스 메모리를 주기 샘플링한다.
//!
//! - [`hub`]: 호스트 공급 허브 (`publish` → 유형별 fan-out)
//! - [`memory`]: 프로세스 메모리 소스 (sysinfo)
//! - [`composite`]: 엔트리 유형별 소스 라우팅

pub mod composite;
pub mod hub;
pub mod memory;
