//! SQLite 저장소 어댑터.
//!
//! `RecordSink` + `ErrorStatisticsSource` 포트 구현.
//!
//! # 모듈 구조
//! - `records`: 레코드 배치 삽입 (RecordSink 포트), 조회, 보존 정책
//! - `statistics`: 에러 저장소 집계 (ErrorStatisticsSource 포트)

mod records;
mod statistics;

use beacon_core::error::CoreError;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::migration;

/// SQLite 레코드 싱크: `RecordSink` + `ErrorStatisticsSource` 포트 구현
pub struct SqliteRecordSink {
    pub(super) conn: Mutex<Connection>,
    pub(super) retention_days: u32,
}

impl SqliteRecordSink {
    /// 파일 기반 SQLite 싱크 생성
    pub fn open(path: &Path, retention_days: u32) -> Result<Self, CoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| CoreError::Storage(format!("SQLite 열기 실패: {e}")))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA cache_size=4000;
            PRAGMA temp_store=MEMORY;
            ",
        )
        .map_err(|e| CoreError::Storage(format!("PRAGMA 설정 실패: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Storage(format!("마이그레이션 실패: {e}")))?;

        info!("SQLite 싱크 초기화: {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
            retention_days,
        })
    }

    /// 인메모리 SQLite 싱크 생성 (테스트/오프라인 데모용)
    pub fn open_in_memory(retention_days: u32) -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::Storage(format!("인메모리 SQLite 생성 실패: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Storage(format!("마이그레이션 실패: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
            retention_days,
        })
    }

    pub(super) fn lock(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("잠금 획득 실패: {e}")))
    }

    /// 보존 기간 (일)
    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::models::record::StoreName;
    use tempfile::TempDir;

    #[test]
    fn open_file_creates_parent_and_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("beacon.db");

        let sink = SqliteRecordSink::open(&path, 30).unwrap();
        assert!(path.exists());
        assert_eq!(sink.count(StoreName::UsageEvents).unwrap(), 0);
    }

    #[test]
    fn reopen_keeps_schema_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("beacon.db");

        drop(SqliteRecordSink::open(&path, 30).unwrap());
        let sink = SqliteRecordSink::open(&path, 7).unwrap();
        assert_eq!(sink.retention_days(), 7);
    }
}
