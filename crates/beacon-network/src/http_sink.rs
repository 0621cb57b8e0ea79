//! HTTP 레코드 싱크.
//!
//! `RecordSink` / `ErrorStatisticsSource` 포트 구현.
//! 재시도는 하지 않는다: 실패한 배치의 재시도는 디스패처가 담당한다.

use async_trait::async_trait;
use beacon_core::error::CoreError;
use beacon_core::models::error_event::ErrorStatistics;
use beacon_core::models::record::{StoreName, TelemetryRecord};
use beacon_core::ports::sink::{ErrorStatisticsSource, RecordSink};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Retry-After 헤더가 없을 때 기본 대기 시간 (초)
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// 삽입 요청 본문
#[derive(Serialize)]
struct InsertRequest<'a> {
    records: &'a [TelemetryRecord],
}

/// 원격 append-only 저장소 HTTP 클라이언트
pub struct HttpRecordSink {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpRecordSink {
    /// 새 HTTP 싱크 생성
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        Url::parse(base_url)
            .map_err(|e| CoreError::Config(format!("잘못된 싱크 URL: {base_url}: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn records_url(&self, store: StoreName) -> String {
        format!("{}/stores/{}/records", self.base_url, store.as_str())
    }

    fn statistics_url(&self, since: DateTime<Utc>) -> Result<Url, CoreError> {
        let raw = format!(
            "{}/stores/{}/statistics",
            self.base_url,
            StoreName::ErrorLogs.as_str()
        );
        let since = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        Url::parse_with_params(&raw, &[("since", since.as_str())])
            .map_err(|e| CoreError::Config(format!("통계 URL 생성 실패: {e}")))
    }

    /// API 키가 있으면 Bearer 헤더 추가
    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    /// 응답 상태 코드 확인 및 에러 매핑
    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, CoreError> {
        let status = resp.status();

        if status.is_success() {
            return Ok(resp);
        }

        let status_code = status.as_u16();
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        let text = resp.text().await.unwrap_or_else(|e| {
            warn!("응답 본문 읽기 실패: {e}");
            String::new()
        });

        match status_code {
            401 | 403 => Err(CoreError::Auth(format!("싱크 인증 실패 ({status}): {text}"))),
            429 => Err(CoreError::RateLimit {
                retry_after_secs: retry_after,
            }),
            503 => Err(CoreError::ServiceUnavailable(text)),
            _ => Err(CoreError::SinkRejected {
                status: status_code,
                message: text,
            }),
        }
    }
}

#[async_trait]
impl RecordSink for HttpRecordSink {
    async fn insert(&self, store: StoreName, records: &[TelemetryRecord]) -> Result<(), CoreError> {
        if records.is_empty() {
            return Ok(());
        }

        debug!("레코드 삽입 요청: store={store}, {}개", records.len());

        let req = self
            .client
            .post(self.records_url(store))
            .json(&InsertRequest { records });
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("레코드 삽입 요청 실패: {e}")))?;

        Self::check_response(resp).await?;
        debug!("레코드 삽입 성공: store={store}");
        Ok(())
    }
}

#[async_trait]
impl ErrorStatisticsSource for HttpRecordSink {
    async fn error_statistics(&self, since: DateTime<Utc>) -> Result<ErrorStatistics, CoreError> {
        let url = self.statistics_url(since)?;
        debug!("에러 통계 조회: {url}");

        let resp = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("에러 통계 요청 실패: {e}")))?;

        let resp = Self::check_response(resp).await?;
        resp.json::<ErrorStatistics>()
            .await
            .map_err(|e| CoreError::Internal(format!("에러 통계 응답 파싱 실패: {e}")))
    }
}
