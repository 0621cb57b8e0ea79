//! 어댑터 조립.
//!
//! 설정에 따라 SQLite 또는 HTTP 싱크를 만들고, 관찰 소스(호스트 허브 + 프로세스 메모리)를
//! 묶어 `Telemetry` 빌더에 주입한다.

use beacon_collector::telemetry::{Telemetry, TelemetryBuilder};
use beacon_core::config::{AppConfig, SinkKind};
use beacon_core::config_manager::ConfigManager;
use beacon_core::error::CoreError;
use beacon_core::ports::sink::{ErrorStatisticsSource, RecordSink};
use beacon_monitor::composite::CompositeSource;
use beacon_monitor::hub::ObservationHub;
use beacon_monitor::memory::ProcessMemorySource;
use beacon_network::http_sink::HttpRecordSink;
use beacon_storage::sqlite::SqliteRecordSink;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// 기본 SQLite 파일 이름
const DB_FILE_NAME: &str = "beacon.db";

/// 설정으로부터 만든 싱크 한 쌍 (같은 인스턴스)
pub struct Sinks {
    pub records: Arc<dyn RecordSink>,
    pub statistics: Arc<dyn ErrorStatisticsSource>,
}

/// 설정된 종류의 싱크 생성. SQLite는 열 때 보존 정책을 한 번 적용한다
pub fn build_sinks(config: &AppConfig) -> Result<Sinks, CoreError> {
    match config.sink.kind {
        SinkKind::Sqlite => {
            let path = match &config.sink.db_path {
                Some(path) => path.clone(),
                None => default_db_path()?,
            };
            let sink = Arc::new(SqliteRecordSink::open(&path, config.sink.retention_days)?);
            sink.enforce_retention()?;
            Ok(Sinks {
                records: sink.clone(),
                statistics: sink,
            })
        }
        SinkKind::Http => {
            let endpoint = config.sink.endpoint.as_deref().ok_or_else(|| {
                CoreError::Config("HTTP 싱크에는 endpoint가 필요합니다".to_string())
            })?;
            let sink = Arc::new(HttpRecordSink::new(
                endpoint,
                config.sink.api_key.clone(),
                config.request_timeout(),
            )?);
            info!("HTTP 싱크: {endpoint}");
            Ok(Sinks {
                records: sink.clone(),
                statistics: sink,
            })
        }
    }
}

fn default_db_path() -> Result<PathBuf, CoreError> {
    Ok(ConfigManager::data_dir()?.join(DB_FILE_NAME))
}

/// 관찰 소스: 호스트 공급 허브 + (성능 수집 활성 시) 프로세스 메모리 샘플러
pub fn observation_sources(config: &AppConfig) -> (Arc<ObservationHub>, CompositeSource) {
    let hub = Arc::new(ObservationHub::new());
    let mut composite = CompositeSource::new();
    if config.performance.enabled {
        composite = composite.with_source(Arc::new(ProcessMemorySource::new(
            config.performance.memory_interval(),
        )));
    }
    composite = composite.with_source(hub.clone());
    (hub, composite)
}

/// 설정 하나로 싱크와 관찰 소스를 연결한 빌더
pub fn telemetry_builder(
    config: AppConfig,
    sinks: Sinks,
) -> (TelemetryBuilder, Arc<ObservationHub>) {
    let (hub, composite) = observation_sources(&config);
    let builder = Telemetry::builder(config)
        .sink(sinks.records)
        .statistics(sinks.statistics)
        .observation_source(Arc::new(composite));
    (builder, hub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_core::models::observation::EntryType;
    use beacon_core::ports::observation::ObservationSource;
    use tempfile::TempDir;

    #[test]
    fn sqlite_sink_at_configured_path() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default_config();
        config.sink.db_path = Some(dir.path().join("data").join("beacon.db"));

        assert!(build_sinks(&config).is_ok());
        assert!(dir.path().join("data").join("beacon.db").exists());
    }

    #[test]
    fn http_sink_requires_endpoint() {
        let mut config = AppConfig::default_config();
        config.sink.kind = SinkKind::Http;
        assert!(matches!(build_sinks(&config), Err(CoreError::Config(_))));

        config.sink.endpoint = Some("http://127.0.0.1:9".to_string());
        assert!(build_sinks(&config).is_ok());
    }

    #[test]
    fn memory_source_follows_performance_flag() {
        let mut config = AppConfig::default_config();
        let (_, composite) = observation_sources(&config);
        assert!(composite.supports(EntryType::Memory));
        assert!(composite.supports(EntryType::Fault));

        config.performance.enabled = false;
        let (_, composite) = observation_sources(&config);
        assert!(composite.supports(EntryType::LargestContentfulPaint));
    }
}
