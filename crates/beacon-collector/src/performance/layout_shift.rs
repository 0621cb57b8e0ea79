//! CLS 세션 윈도우.
//!
//! 직전 엔트리와의 간격이 1초 미만이고 세션 시작부터 5초 미만이면 같은 세션에
//! 합산한다. 보고되는 CLS는 지금까지의 세션 합계 중 최댓값이다.
//! 최근 입력 직후의 이동은 사용자가 기대한 이동이므로 제외한다.

const MAX_GAP_MS: f64 = 1000.0;
const MAX_SPAN_MS: f64 = 5000.0;

#[derive(Debug, Clone, Copy)]
struct Session {
    start: f64,
    last: f64,
    value: f64,
}

#[derive(Debug, Default)]
pub struct LayoutShiftWindow {
    current: Option<Session>,
    max: f64,
}

impl LayoutShiftWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// 엔트리 추가. 보고 CLS가 커졌으면 새 값을 반환
    pub fn add(&mut self, start_time: f64, value: f64, had_recent_input: bool) -> Option<f64> {
        if had_recent_input {
            return None;
        }

        let session = match self.current {
            Some(mut s) if start_time - s.last < MAX_GAP_MS && start_time - s.start < MAX_SPAN_MS => {
                s.value += value;
                s.last = start_time;
                s
            }
            _ => Session {
                start: start_time,
                last: start_time,
                value,
            },
        };
        self.current = Some(session);

        if session.value > self.max {
            self.max = session.value;
            Some(self.max)
        } else {
            None
        }
    }

    /// 현재 보고 CLS
    pub fn value(&self) -> f64 {
        self.max
    }

    /// 진행 중인 세션 합계
    pub fn current_session(&self) -> f64 {
        self.current.map_or(0.0, |s| s.value)
    }
}
