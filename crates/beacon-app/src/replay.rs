//! JSON-lines 신호 재생.
//!
//! 호스트 애플리케이션 대신 파일/표준입력에서 계측 신호를 한 줄씩 읽어
//! 텔레메트리 서비스에 전달한다. 빈 줄과 `#` 주석은 건너뛰고,
//! 해석할 수 없는 줄은 경고 후 계속 진행한다.
//!
//! ```text
//! {"signal":"event","detail":{"event_type":"page-view","path":"/pricing"}}
//! {"signal":"observation","entry":{"entry_type":"largest-contentful-paint","start_time":4200}}
//! {"signal":"error","message":"결제 실패","severity":"critical"}
//! {"signal":"offline"}
//! {"signal":"wait","ms":500}
//! ```

use beacon_collector::errors::ErrorReport;
use beacon_collector::telemetry::Telemetry;
use beacon_core::models::error_event::{ApiFailure, ErrorCategory, ErrorSeverity};
use beacon_core::models::event::EventDetail;
use beacon_core::models::observation::ObservationEntry;
use beacon_monitor::hub::ObservationHub;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// 재생 신호 한 줄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "kebab-case")]
pub enum Signal {
    /// 관찰 엔트리 (허브로 publish)
    Observation { entry: ObservationEntry },
    /// 사용 이벤트
    Event { detail: EventDetail },
    /// 명시적 에러 보고
    Error {
        message: String,
        #[serde(default)]
        severity: Option<ErrorSeverity>,
        #[serde(default)]
        category: Option<ErrorCategory>,
        #[serde(default)]
        stack: Option<String>,
    },
    /// API 실패
    ApiError(ApiFailure),
    Online,
    Offline,
    /// 화면 비가시화 (즉시 플러시)
    Hidden,
    Login { user_id: String },
    Logout,
    /// 다음 신호까지 대기
    Wait { ms: u64 },
}

/// 재생 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub applied: usize,
    pub skipped: usize,
    pub invalid: usize,
}

/// 신호 하나 적용
pub async fn apply(signal: Signal, telemetry: &Telemetry, hub: &ObservationHub) {
    match signal {
        Signal::Observation { entry } => {
            let delivered = hub.publish(entry);
            debug!("관찰 엔트리 전달: 구독자 {delivered}명");
        }
        Signal::Event { detail } => match detail {
            EventDetail::PageView { path, title } => {
                telemetry.usage().track_page_view(&path, title.as_deref())
            }
            other => telemetry.usage().track_event(other),
        },
        Signal::Error {
            message,
            severity,
            category,
            stack,
        } => {
            let mut report = ErrorReport::new(message);
            if let Some(severity) = severity {
                report = report.with_severity(severity);
            }
            if let Some(category) = category {
                report = report.with_category(category);
            }
            if let Some(stack) = stack {
                report = report.with_stack(stack);
            }
            telemetry.errors().track_error(report);
        }
        Signal::ApiError(failure) => telemetry.errors().track_api_error(failure),
        Signal::Online => telemetry.set_online(true),
        Signal::Offline => telemetry.set_online(false),
        Signal::Hidden => {
            let report = telemetry.on_visibility_hidden().await;
            debug!("비가시화 플러시: {report:?}");
        }
        Signal::Login { user_id } => telemetry.login(&user_id),
        Signal::Logout => telemetry.logout(),
        Signal::Wait { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
    }
}

/// 입력 끝까지 재생
pub async fn replay<R>(
    reader: R,
    telemetry: &Telemetry,
    hub: &ObservationHub,
) -> std::io::Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = ReplaySummary::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            summary.skipped += 1;
            continue;
        }

        match serde_json::from_str::<Signal>(line) {
            Ok(signal) => {
                apply(signal, telemetry, hub).await;
                summary.applied += 1;
            }
            Err(e) => {
                warn!("재생 {line_no}행 해석 실패, 건너뜀: {e}");
                summary.invalid += 1;
            }
        }
    }

    info!(
        "재생 완료: 적용 {}개, 건너뜀 {}개, 오류 {}개",
        summary.applied, summary.skipped, summary.invalid
    );
    Ok(summary)
}
