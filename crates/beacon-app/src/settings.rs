//! 설정 계층 병합.
//!
//! 우선순위: 설정 파일(JSON) < `BEACON__SECTION__KEY` 환경변수 < CLI 인자.
//! 파일은 `ConfigManager`가, 환경변수 오버레이는 `config` crate가 담당한다.

use beacon_core::config::{AppConfig, SinkKind};
use beacon_core::config_manager::ConfigManager;
use beacon_core::error::CoreError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 환경변수 접두사 (`BEACON__USAGE__CAPACITY=20`)
pub const ENV_PREFIX: &str = "BEACON";
const ENV_SEPARATOR: &str = "__";

/// CLI에서 넘어온 덮어쓰기 값
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// HTTP 싱크 베이스 URL (지정 시 싱크 종류를 http로 전환)
    pub server: Option<String>,
    /// SQLite 파일 경로 (지정 시 싱크 종류를 sqlite로 전환)
    pub db: Option<PathBuf>,
    /// 강제 오프라인
    pub offline: bool,
}

impl CliOverrides {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(server) = &self.server {
            config.sink.kind = SinkKind::Http;
            config.sink.endpoint = Some(server.clone());
        }
        if let Some(db) = &self.db {
            config.sink.kind = SinkKind::Sqlite;
            config.sink.db_path = Some(db.clone());
        }
        if self.offline {
            config.delivery.force_offline = true;
        }
    }
}

/// 파일 설정 로드. 경로 미지정 시 플랫폼 기본 위치, 실패하면 기본값
pub fn load_base(path: Option<&Path>) -> Result<AppConfig, CoreError> {
    match path {
        Some(path) => Ok(ConfigManager::with_path(path.to_path_buf())?.get()),
        None => match ConfigManager::new() {
            Ok(manager) => {
                debug!("설정 파일: {}", manager.config_path().display());
                Ok(manager.get())
            }
            Err(e) => {
                warn!("기본 설정 파일 로드 실패, 기본값 사용: {e}");
                Ok(AppConfig::default_config())
            }
        },
    }
}

/// 환경변수 오버레이
///
/// `vars`가 None이면 프로세스 환경변수를 읽는다.
pub fn overlay_env(
    base: &AppConfig,
    vars: Option<HashMap<String, String>>,
) -> Result<AppConfig, CoreError> {
    let layered = config::Config::builder()
        .add_source(
            config::Config::try_from(base)
                .map_err(|e| CoreError::Config(format!("기본 설정 변환 실패: {e}")))?,
        )
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(vars),
        )
        .build()
        .map_err(|e| CoreError::Config(format!("환경변수 설정 병합 실패: {e}")))?;

    layered
        .try_deserialize()
        .map_err(|e| CoreError::Config(format!("환경변수 설정 해석 실패: {e}")))
}

/// 파일, 환경변수, CLI 순으로 병합 후 검증
pub fn resolve(path: Option<&Path>, overrides: &CliOverrides) -> Result<AppConfig, CoreError> {
    let base = load_base(path)?;
    let mut config = overlay_env(&base, None)?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn env_overrides_nested_keys() {
        let base = AppConfig::default_config();
        let config = overlay_env(
            &base,
            vars(&[
                ("BEACON__USAGE__CAPACITY", "20"),
                ("BEACON__DELIVERY__BACKOFF_ENABLED", "false"),
                ("BEACON__SINK__KIND", "http"),
                ("BEACON__SINK__ENDPOINT", "https://telemetry.example"),
                ("UNRELATED", "1"),
            ]),
        )
        .unwrap();

        assert_eq!(config.usage.capacity, 20);
        assert!(!config.delivery.backoff_enabled);
        assert_eq!(config.sink.kind, SinkKind::Http);
        assert_eq!(
            config.sink.endpoint.as_deref(),
            Some("https://telemetry.example")
        );
        assert_eq!(config.errors.capacity, base.errors.capacity);
    }

    #[test]
    fn no_env_keeps_base() {
        let mut base = AppConfig::default_config();
        base.errors.flush_interval_ms = 5_000;
        let config = overlay_env(&base, vars(&[])).unwrap();
        assert_eq!(config.errors.flush_interval_ms, 5_000);
        assert_eq!(config.usage.max_buffered, None);
    }

    #[test]
    fn cli_overrides_win() {
        let mut config = AppConfig::default_config();
        CliOverrides {
            server: Some("http://localhost:9000".to_string()),
            db: None,
            offline: true,
        }
        .apply(&mut config);

        assert_eq!(config.sink.kind, SinkKind::Http);
        assert!(config.delivery.force_offline);

        CliOverrides {
            db: Some(PathBuf::from("/tmp/beacon.db")),
            ..CliOverrides::default()
        }
        .apply(&mut config);
        assert_eq!(config.sink.kind, SinkKind::Sqlite);
        assert_eq!(config.sink.db_path, Some(PathBuf::from("/tmp/beacon.db")));
    }

    #[test]
    fn explicit_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let config = load_base(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(config.usage.capacity, 50);
    }

    #[test]
    fn malformed_file_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();

        assert_matches!(load_base(Some(&path)), Err(CoreError::Config(_)));
    }
}
