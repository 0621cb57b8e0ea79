//! # beacon
//!
//! BEACON 텔레메트리 에이전트 진입점.
//! 설정 계층 병합, 싱크/관찰 소스 조립, 신호 재생, 시그널 대기 후 최종 플러시.

use anyhow::{Context, Result};
use beacon_app::lifecycle::LifecycleManager;
use beacon_app::replay::replay;
use beacon_app::settings::{self, CliOverrides};
use beacon_app::wiring::{build_sinks, telemetry_builder};
use clap::Parser;
use std::path::PathBuf;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// BEACON 텔레메트리 에이전트
///
/// 사용 이벤트, 에러, 성능 관찰을 버퍼링해 원격 저장소로 배치 전송한다
#[derive(Parser, Debug)]
#[command(name = "beacon")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// HTTP 싱크 URL (지정 시 HTTP 싱크 사용)
    #[arg(long, short = 's')]
    server: Option<String>,

    /// SQLite 파일 경로 (지정 시 SQLite 싱크 사용)
    #[arg(long, conflicts_with = "server")]
    db: Option<PathBuf>,

    /// 오프라인 모드로 실행 (큐에만 쌓고 전송하지 않음)
    #[arg(long, short = 'o')]
    offline: bool,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// JSON-lines 신호 파일 재생 (`-`이면 표준입력)
    #[arg(long, short = 'r')]
    replay: Option<String>,

    /// 재생이 끝나면 시그널을 기다리지 않고 종료
    #[arg(long, requires = "replay")]
    exit_after_replay: bool,

    /// 저장소 에러 통계를 JSON으로 출력하고 종료
    #[arg(long)]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "beacon={level},beacon_app={level},beacon_core={level},beacon_collector={level},beacon_network={level},beacon_storage={level},beacon_monitor={level}",
        level = args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    let overrides = CliOverrides {
        server: args.server.clone(),
        db: args.db.clone(),
        offline: args.offline,
    };
    let config = settings::resolve(args.config.as_deref(), &overrides).context("설정 로드 실패")?;
    info!(
        "BEACON 시작 (싱크: {:?}, 오프라인: {})",
        config.sink.kind, config.delivery.force_offline
    );

    let sinks = build_sinks(&config).context("싱크 초기화 실패")?;
    let (builder, hub) = telemetry_builder(config, sinks);
    let telemetry = builder.build().context("텔레메트리 구성 실패")?;

    if args.stats {
        let statistics = telemetry.errors().error_statistics().await?;
        println!("{}", serde_json::to_string_pretty(&statistics)?);
        return Ok(());
    }

    telemetry.start();
    let lifecycle = LifecycleManager::new();

    if let Some(source) = &args.replay {
        let result = if source == "-" {
            replay(BufReader::new(tokio::io::stdin()), &telemetry, &hub).await
        } else {
            let file = tokio::fs::File::open(source)
                .await
                .with_context(|| format!("재생 파일 열기 실패: {source}"))?;
            replay(BufReader::new(file), &telemetry, &hub).await
        };
        let summary = result.context("신호 재생 실패")?;

        if summary.invalid > 0 {
            warn!("해석하지 못한 신호 {}개", summary.invalid);
        }
        if args.exit_after_replay {
            lifecycle.shutdown();
        }
    }

    if !lifecycle.is_shutting_down() {
        info!("BEACON 실행 중 (Ctrl+C로 종료)");
        lifecycle.wait_for_signal().await?;
    }

    let report = telemetry.shutdown().await;
    let stats = telemetry.stats();
    info!(
        "최종 상태: 사용 이벤트 {}개 기록, 에러 {}개 기록, 플러시 {:?}",
        stats.usage_tracked, stats.errors_tracked, report
    );
    info!("성능 요약: {}", serde_json::to_string(&stats.performance)?);

    info!("BEACON 종료");
    Ok(())
}
