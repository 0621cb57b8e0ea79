//! # beacon-storage
//!
//! SQLite 레코드 싱크.
//! 수집기 배치를 저장소별로 append-only 저장하고(레코드 ID 기준 중복 제거),
//! 스키마 마이그레이션, 보존 정책, 에러 통계 조회를 제공한다.
//!
//! ## 모듈
//! - `sqlite`: 레코드 싱크 (RecordSink, ErrorStatisticsSource 구현)
//! - `migration`: 스키마 마이그레이션

pub mod migration;
pub mod sqlite;
