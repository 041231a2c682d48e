use parking_lot::RwLock;
use std::sync::Arc;

use textmap_search::config::AppConfig;
use textmap_search::search::{SearchContext, VoiceOracle};
use textmap_search::store::TextStore;

pub struct AppState {
    pub store: Arc<TextStore>,
    /// Swapped when the asset directory changes / 资源目录变更时替换
    pub voice: RwLock<Arc<dyn VoiceOracle>>,
    /// Live settings, replaced by saveSettings / 当前设置
    pub config: RwLock<AppConfig>,
}

impl AppState {
    /// Snapshot of the search settings for one request / 单次请求的搜索上下文
    pub fn search_context(&self) -> SearchContext {
        SearchContext::from_config(&self.config.read().search)
    }

    pub fn voice(&self) -> Arc<dyn VoiceOracle> {
        self.voice.read().clone()
    }
}
