//! 배치 디스패처.
//!
//! 수집기별 유한 큐에 레코드를 모아 원격 싱크로 전송한다.
//! 주기 타이머, 용량 도달, 치명적 레코드, 연결 복구, 수동/언로드 요청이
//! 플러시를 유발한다. 실패한 배치는 큐 앞쪽에 되돌려 다음 시도에서 재전송한다.

use beacon_core::error::CoreError;
use beacon_core::models::record::{StoreName, TelemetryRecord};
use beacon_core::ports::sink::RecordSink;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::connectivity::ConnectivityMonitor;

// ============================================================
// 유한 큐
// ============================================================

/// `RecordQueue::push` 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// 큐에 추가됨
    Queued,
    /// 라이브 구간이 용량에 도달해 봉인됨: 즉시 플러시 필요
    FlushNeeded,
}

/// 봉인 접두부를 가진 유한 FIFO 큐
///
/// 라이브 구간(봉인되지 않은 레코드)이 `capacity`에 도달하면 전체를 봉인해
/// 다음 전송 대상으로 넘긴다. 라이브 구간은 `capacity`를 넘지 않는다.
/// 봉인 + 라이브 합계가 `max_buffered`를 넘으면 가장 오래된 레코드부터 폐기한다.
#[derive(Debug)]
pub struct RecordQueue {
    records: VecDeque<TelemetryRecord>,
    /// 앞쪽에서부터 봉인된 레코드 수
    sealed: usize,
    capacity: usize,
    max_buffered: usize,
    dropped: u64,
}

impl RecordQueue {
    pub fn new(capacity: usize, max_buffered: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            sealed: 0,
            capacity,
            max_buffered: max_buffered.max(capacity),
            dropped: 0,
        }
    }

    /// 레코드 추가
    pub fn push(&mut self, record: TelemetryRecord) -> PushOutcome {
        self.records.push_back(record);
        self.enforce_ceiling();

        if self.live_len() >= self.capacity {
            self.sealed = self.records.len();
            PushOutcome::FlushNeeded
        } else {
            PushOutcome::Queued
        }
    }

    /// 전체(봉인 + 라이브)를 꺼내 큐를 비움
    pub fn drain(&mut self) -> Vec<TelemetryRecord> {
        self.sealed = 0;
        self.records.drain(..).collect()
    }

    /// 전송 실패한 배치를 앞쪽에 되돌림
    ///
    /// 배치 순서와, 배치 이후 도착한 레코드와의 상대 순서가 유지된다.
    pub fn requeue(&mut self, batch: Vec<TelemetryRecord>) {
        let count = batch.len();
        for record in batch.into_iter().rev() {
            self.records.push_front(record);
        }
        self.sealed += count;
        self.enforce_ceiling();
    }

    fn enforce_ceiling(&mut self) {
        let excess = self.records.len().saturating_sub(self.max_buffered);
        if excess == 0 {
            return;
        }
        self.records.drain(..excess);
        self.sealed = self.sealed.saturating_sub(excess);
        self.dropped += excess as u64;
        warn!(
            "버퍼 상한({}) 초과 - 가장 오래된 레코드 {excess}개 폐기 (누적 {})",
            self.max_buffered, self.dropped
        );
    }

    /// 전체 레코드 수
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 봉인되지 않은 레코드 수
    pub fn live_len(&self) -> usize {
        self.records.len() - self.sealed
    }

    /// 다음 전송을 기다리는 봉인 레코드 수
    pub fn sealed_len(&self) -> usize {
        self.sealed
    }

    /// 상한 초과로 폐기된 누적 레코드 수
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ============================================================
// 디스패처
// ============================================================

/// 디스패처 설정
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// 대상 저장소
    pub store: StoreName,
    /// 즉시 플러시를 유발하는 라이브 구간 용량
    pub capacity: usize,
    /// 봉인 + 라이브 합계 상한
    pub max_buffered: usize,
    /// 주기 플러시 간격
    pub flush_interval: Duration,
    /// 단일 배치 전송 타임아웃
    pub delivery_timeout: Duration,
    /// 백오프 상한 (None이면 백오프 없음: 매 주기마다 재시도)
    pub max_backoff: Option<Duration>,
}

impl DispatcherConfig {
    /// 기본 전송 파라미터로 생성 (타임아웃 10초, 백오프 상한 5분, 상한 = 용량 × 10)
    pub fn new(store: StoreName, capacity: usize, flush_interval: Duration) -> Self {
        Self {
            store,
            capacity,
            max_buffered: capacity.saturating_mul(10),
            flush_interval,
            delivery_timeout: Duration::from_secs(10),
            max_backoff: Some(Duration::from_secs(300)),
        }
    }

    pub fn with_max_buffered(mut self, max_buffered: usize) -> Self {
        self.max_buffered = max_buffered;
        self
    }

    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    pub fn with_max_backoff(mut self, max_backoff: Option<Duration>) -> Self {
        self.max_backoff = max_backoff;
        self
    }
}

/// 플러시 유발 원인
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// 주기 타이머
    Timer,
    /// 라이브 구간 용량 도달
    Capacity,
    /// 치명적 심각도 레코드
    Critical,
    /// 오프라인 → 온라인 전환
    Reconnect,
    /// 호출자의 명시적 요청
    Manual,
    /// 페이지 언로드/비가시화
    Unload,
}

impl FlushTrigger {
    /// 백오프 대기를 무시하고 즉시 시도하는 원인인지
    pub fn bypasses_backoff(&self) -> bool {
        !matches!(self, FlushTrigger::Timer | FlushTrigger::Capacity)
    }
}

/// 플러시 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// 배치 전송 성공 (레코드 수)
    Delivered(usize),
    /// 보낼 레코드 없음
    Empty,
    /// 오프라인: 배치를 꺼내지 않음
    Offline,
    /// 백오프 대기 중: 시도하지 않음
    BackingOff,
    /// 전송 실패, 배치 재큐잉 (레코드 수)
    Failed(usize),
}

/// 디스패처 통계
#[derive(Debug, Clone, PartialEq)]
pub struct DispatcherStats {
    pub store: StoreName,
    /// 봉인되지 않은 레코드 수
    pub live: usize,
    /// 전송 대기 중인 봉인 레코드 수
    pub sealed: usize,
    /// 상한 초과로 폐기된 누적 레코드 수
    pub dropped: u64,
    /// 전송 성공한 누적 레코드 수
    pub delivered_total: u64,
    /// 실패한 전송 시도 수
    pub failed_attempts: u64,
    /// 현재 연속 실패 횟수
    pub consecutive_failures: u32,
    /// 마지막 성공 전송 시각
    pub last_success: Option<DateTime<Utc>>,
}

/// 연속 실패 기반 백오프 상태
///
/// n회 연속 실패 후 다음 `2^(n-1) - 1`번의 주기 틱을 건너뛴다.
/// 실제 재시도 간격은 `interval × 2^(n-1)` (상한 `max_backoff`).
#[derive(Debug, Default)]
struct BackoffState {
    consecutive_failures: u32,
    ticks_to_skip: u64,
}

struct DispatcherInner {
    config: DispatcherConfig,
    sink: Arc<dyn RecordSink>,
    connectivity: Arc<ConnectivityMonitor>,
    queue: Mutex<RecordQueue>,
    /// 워커에게 전달할 대기 중 플러시 요청 (가장 긴급한 원인만 유지)
    pending: Mutex<Option<FlushTrigger>>,
    wake: Notify,
    /// 전송 직렬화: 워커와 `flush_now`가 공유
    delivery_lock: tokio::sync::Mutex<()>,
    backoff: Mutex<BackoffState>,
    delivered_total: AtomicU64,
    failed_attempts: AtomicU64,
    last_success: Mutex<Option<DateTime<Utc>>>,
}

/// 배치 디스패처: 유한 큐 + 플러시 스케줄러 + 재큐잉
pub struct BatchDispatcher {
    inner: Arc<DispatcherInner>,
    worker: Mutex<Option<(JoinHandle<()>, watch::Sender<bool>)>>,
}

impl BatchDispatcher {
    pub fn new(
        config: DispatcherConfig,
        sink: Arc<dyn RecordSink>,
        connectivity: Arc<ConnectivityMonitor>,
    ) -> Self {
        let queue = RecordQueue::new(config.capacity, config.max_buffered);
        Self {
            inner: Arc::new(DispatcherInner {
                config,
                sink,
                connectivity,
                queue: Mutex::new(queue),
                pending: Mutex::new(None),
                wake: Notify::new(),
                delivery_lock: tokio::sync::Mutex::new(()),
                backoff: Mutex::new(BackoffState::default()),
                delivered_total: AtomicU64::new(0),
                failed_attempts: AtomicU64::new(0),
                last_success: Mutex::new(None),
            }),
            worker: Mutex::new(None),
        }
    }

    /// 대상 저장소
    pub fn store(&self) -> StoreName {
        self.inner.config.store
    }

    /// 레코드를 큐에 추가. 용량 도달 시 워커에게 즉시 플러시 요청
    pub fn push(&self, record: TelemetryRecord) {
        let outcome = {
            let mut queue = self.inner.queue.lock();
            let outcome = queue.push(record);
            debug!(
                "[{}] 레코드 큐 추가, 라이브 {} / 봉인 {}",
                self.inner.config.store,
                queue.live_len(),
                queue.sealed_len()
            );
            outcome
        };

        if outcome == PushOutcome::FlushNeeded {
            debug!("[{}] 큐 용량 도달 - 즉시 플러시 요청", self.inner.config.store);
            self.request_flush(FlushTrigger::Capacity);
        }
    }

    /// 워커에게 플러시 요청 (비동기, 즉시 반환)
    pub fn request_flush(&self, trigger: FlushTrigger) {
        self.inner.request(trigger);
    }

    /// 즉시 플러시하고 결과 반환 (백오프 무시)
    pub async fn flush_now(&self) -> FlushOutcome {
        self.inner.flush(FlushTrigger::Manual).await
    }

    /// 지정 원인으로 즉시 플러시
    pub async fn flush_with(&self, trigger: FlushTrigger) -> FlushOutcome {
        self.inner.flush(trigger).await
    }

    /// 플러시 워커 시작. 이미 실행 중이면 무시
    ///
    /// tokio 런타임 안에서 호출해야 한다.
    pub fn start(&self) {
        let mut worker = self.worker.lock();
        if worker.as_ref().is_some_and(|(handle, _)| !handle.is_finished()) {
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(run_worker(inner, shutdown_rx));
        *worker = Some((handle, shutdown_tx));

        info!(
            "[{}] 플러시 워커 시작 (주기: {:?}, 용량: {})",
            self.inner.config.store, self.inner.config.flush_interval, self.inner.config.capacity
        );
    }

    /// 플러시 워커 정지 (큐 내용은 유지). 멱등
    pub async fn stop(&self) {
        let worker = self.worker.lock().take();
        if let Some((handle, shutdown_tx)) = worker {
            let _ = shutdown_tx.send(true);
            if let Err(e) = handle.await {
                warn!("[{}] 플러시 워커 종료 실패: {e}", self.inner.config.store);
            }
            info!("[{}] 플러시 워커 정지", self.inner.config.store);
        }
    }

    /// 워커 실행 여부
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|(handle, _)| !handle.is_finished())
    }

    /// 큐 전체 레코드 수
    pub fn queue_len(&self) -> usize {
        self.inner.queue.lock().len()
    }

    pub fn stats(&self) -> DispatcherStats {
        let queue = self.inner.queue.lock();
        DispatcherStats {
            store: self.inner.config.store,
            live: queue.live_len(),
            sealed: queue.sealed_len(),
            dropped: queue.dropped(),
            delivered_total: self.inner.delivered_total.load(Ordering::Relaxed),
            failed_attempts: self.inner.failed_attempts.load(Ordering::Relaxed),
            consecutive_failures: self.inner.backoff.lock().consecutive_failures,
            last_success: *self.inner.last_success.lock(),
        }
    }
}

impl DispatcherInner {
    fn request(&self, trigger: FlushTrigger) {
        {
            let mut pending = self.pending.lock();
            *pending = match *pending {
                Some(existing) if existing.bypasses_backoff() => Some(existing),
                _ => Some(trigger),
            };
        }
        self.wake.notify_one();
    }

    fn take_pending(&self) -> Option<FlushTrigger> {
        self.pending.lock().take()
    }

    /// 백오프 중이면 true. 주기 틱이면 건너뛸 틱 하나를 소모한다
    fn backing_off(&self, trigger: FlushTrigger) -> bool {
        if trigger.bypasses_backoff() || self.config.max_backoff.is_none() {
            return false;
        }
        let mut backoff = self.backoff.lock();
        if backoff.ticks_to_skip == 0 {
            return false;
        }
        if trigger == FlushTrigger::Timer {
            backoff.ticks_to_skip -= 1;
        }
        true
    }

    fn record_success(&self, count: usize) {
        let mut backoff = self.backoff.lock();
        backoff.consecutive_failures = 0;
        backoff.ticks_to_skip = 0;
        drop(backoff);

        self.delivered_total
            .fetch_add(count as u64, Ordering::Relaxed);
        *self.last_success.lock() = Some(Utc::now());
    }

    fn record_failure(&self) -> u32 {
        self.failed_attempts.fetch_add(1, Ordering::Relaxed);

        let mut backoff = self.backoff.lock();
        backoff.consecutive_failures = backoff.consecutive_failures.saturating_add(1);
        if let Some(max_backoff) = self.config.max_backoff {
            let exponent = (backoff.consecutive_failures - 1).min(32);
            let multiplier = 1u64 << exponent;
            let interval_ms = self.config.flush_interval.as_millis().max(1) as u64;
            let cap_ticks = (max_backoff.as_millis() as u64 / interval_ms).max(1);
            backoff.ticks_to_skip = multiplier.min(cap_ticks) - 1;
        }
        backoff.consecutive_failures
    }

    async fn flush(&self, trigger: FlushTrigger) -> FlushOutcome {
        let store = self.config.store;

        if !self.connectivity.is_online() {
            debug!("[{store}] 오프라인 - 플러시 보류 ({trigger:?})");
            return FlushOutcome::Offline;
        }

        let _guard = self.delivery_lock.lock().await;

        // 앞선 전송을 기다리는 동안 끊겼을 수 있음
        if !self.connectivity.is_online() {
            debug!("[{store}] 전송 대기 중 오프라인 전환 - 플러시 보류 ({trigger:?})");
            return FlushOutcome::Offline;
        }

        if self.backing_off(trigger) {
            debug!("[{store}] 백오프 대기 중 - 플러시 건너뜀 ({trigger:?})");
            return FlushOutcome::BackingOff;
        }

        let batch = self.queue.lock().drain();
        if batch.is_empty() {
            return FlushOutcome::Empty;
        }
        let count = batch.len();

        let timeout = self.config.delivery_timeout;
        let result = match tokio::time::timeout(timeout, self.sink.insert(store, &batch)).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        };

        match result {
            Ok(()) => {
                self.record_success(count);
                info!("[{store}] 배치 전송 성공: {count}개 레코드 ({trigger:?})");
                FlushOutcome::Delivered(count)
            }
            Err(e) => {
                self.queue.lock().requeue(batch);
                let failures = self.record_failure();
                if e.is_transient() {
                    warn!("[{store}] 배치 전송 실패 (연속 {failures}회), {count}개 재큐잉: {e}");
                } else {
                    warn!(
                        "[{store}] 배치 거부됨 (연속 {failures}회), {count}개 재큐잉 - 싱크 설정 확인 필요: {e}"
                    );
                }
                FlushOutcome::Failed(count)
            }
        }
    }
}

/// 플러시 워커 루프
///
/// 주기 틱, 즉시 플러시 요청, 연결 복구, 종료 신호를 하나의 루프에서 처리하므로
/// 같은 디스패처의 전송은 항상 직렬화된다.
async fn run_worker(inner: Arc<DispatcherInner>, mut shutdown: watch::Receiver<bool>) {
    let period = inner.config.flush_interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut online_rx = inner.connectivity.subscribe();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                inner.flush(FlushTrigger::Timer).await;
            }
            _ = inner.wake.notified() => {
                if let Some(trigger) = inner.take_pending() {
                    inner.flush(trigger).await;
                }
            }
            changed = online_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let online = *online_rx.borrow_and_update();
                if online {
                    info!("[{}] 온라인 복귀 - 즉시 플러시", inner.config.store);
                    inner.flush(FlushTrigger::Reconnect).await;
                }
            }
            _ = shutdown.changed() => {
                debug!("[{}] 플러시 워커 종료 신호 수신", inner.config.store);
                break;
            }
        }
    }
}
