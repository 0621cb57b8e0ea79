//! INP 추적.
//!
//! 상호작용 ID별 최대 지연을 모아 가장 느린 상호작용을 보고한다.
//! 상호작용 50회마다 최악값을 하나씩 건너뛰어 98번째 백분위수에 근사한다.
//!
//! 상호작용 ID는 증가하는 순서로 발급되므로, 지금까지 본 최대 ID보다 큰 ID만
//! 새 상호작용으로 센다. 보관 상태는 후보 목록 크기로 제한된다.

/// 보관할 최장 상호작용 수
const MAX_CANDIDATES: usize = 10;
const INTERACTIONS_PER_SKIP: usize = 50;

#[derive(Debug, Default)]
pub struct InteractionTracker {
    /// (interaction_id, 지연) 지연 내림차순
    longest: Vec<(u64, f64)>,
    /// 지금까지 본 가장 큰 상호작용 ID
    max_id: u64,
    /// 서로 다른 상호작용 수
    count: usize,
}

impl InteractionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 이벤트 타이밍 추가. 보고값이 바뀌면 새 INP 반환
    ///
    /// `interaction_id == 0`은 상호작용이 아닌 이벤트라 무시한다.
    pub fn add(&mut self, interaction_id: u64, duration: f64) -> Option<f64> {
        if interaction_id == 0 {
            return None;
        }
        let before = self.value();

        if interaction_id > self.max_id {
            self.max_id = interaction_id;
            self.count += 1;
        }

        match self.longest.iter_mut().find(|(id, _)| *id == interaction_id) {
            Some(candidate) => candidate.1 = candidate.1.max(duration),
            None => self.longest.push((interaction_id, duration)),
        }
        self.longest
            .sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        self.longest.truncate(MAX_CANDIDATES);

        let after = self.value();
        (after != before).then_some(after).flatten()
    }

    /// 지금까지의 상호작용 수
    pub fn interaction_count(&self) -> usize {
        self.count
    }

    /// 현재 INP 추정치
    pub fn value(&self) -> Option<f64> {
        if self.longest.is_empty() {
            return None;
        }
        let index = (self.interaction_count() / INTERACTIONS_PER_SKIP).min(self.longest.len() - 1);
        Some(self.longest[index].1)
    }
}
