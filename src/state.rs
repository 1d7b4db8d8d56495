use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::features::thumbnail::{FontRegistry, ThumbnailService};

/// 聚合的应用共享状态
#[derive(Clone)]
pub struct AppState {
    /// 缩略图渲染服务
    pub thumbnails: Arc<ThumbnailService>,
    /// 只读字体表（与渲染服务共享同一份）
    pub fonts: Arc<FontRegistry>,
    /// 控制并发渲染的信号量（限制 CPU 密集型任务数量）
    pub render_semaphore: Arc<Semaphore>,
}

impl AppState {
    /// 按配置组装共享状态
    pub fn new(config: &crate::config::AppConfig, fonts: Arc<FontRegistry>) -> Self {
        Self {
            thumbnails: Arc::new(ThumbnailService::from_config(config, fonts.clone())),
            fonts,
            render_semaphore: Arc::new(Semaphore::new(
                config.thumbnail.effective_parallelism(),
            )),
        }
    }
}
