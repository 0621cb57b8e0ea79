//! 공유 환경 컨텍스트 제공자.
//!
//! 가변 템플릿을 들고 있다가 `capture()` 시점의 사본을 돌려준다.
//! 이미 레코드에 첨부된 사본은 이후 갱신의 영향을 받지 않는다.

use beacon_core::config::ContextConfig;
use beacon_core::models::context::{Dimensions, EnvironmentContext, NetworkHints};
use beacon_core::ports::context::ContextProvider;
use parking_lot::RwLock;
use tracing::debug;

/// `ContextProvider` 구현
#[derive(Debug)]
pub struct SharedContextProvider {
    template: RwLock<EnvironmentContext>,
}

impl SharedContextProvider {
    pub fn new(context: EnvironmentContext) -> Self {
        Self {
            template: RwLock::new(context),
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(EnvironmentContext {
            location: config.initial_location.clone(),
            referrer: None,
            viewport: config.viewport,
            screen: config.screen,
            user_agent: config.user_agent.clone(),
            locale: config.locale.clone(),
            timezone: config.timezone.clone(),
            network: None,
        })
    }

    /// 현재 위치 갱신. 직전 위치는 referrer가 된다
    pub fn set_location(&self, location: &str) {
        let mut template = self.template.write();
        if template.location == location {
            return;
        }
        let previous = std::mem::replace(&mut template.location, location.to_string());
        template.referrer = Some(previous);
        debug!("위치 갱신: {location}");
    }

    /// 네트워크 품질 힌트 갱신
    pub fn set_network(&self, hints: Option<NetworkHints>) {
        self.template.write().network = hints;
    }

    /// 뷰포트 크기 갱신 (리사이즈)
    pub fn set_viewport(&self, viewport: Dimensions) {
        self.template.write().viewport = viewport;
    }
}

impl Default for SharedContextProvider {
    fn default() -> Self {
        Self::from_config(&ContextConfig::default())
    }
}

impl ContextProvider for SharedContextProvider {
    fn capture(&self) -> EnvironmentContext {
        self.template.read().clone()
    }

    fn navigate(&self, location: &str) {
        self.set_location(location);
    }
}
