//! Wire 风格的依赖注入模块
//!
//! 按依赖顺序组装附件管线：配置、字节缓存、本地与远端来源、
//! 领域服务、展示适配器。宿主注入的协作方（持久层、令牌、
//! 海报抽帧）以端口引用传入。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use mage_mobile_core::MageAppConfig;

use crate::application::display::DisplayAdapter;
use crate::application::surface::{DisplaySurface, SurfaceEvent};
use crate::config::AttachmentConfig;
use crate::domain::repository::{
    AccessTokenProviderRef, AttachmentStoreRef, LocalMediaSourceRef, MediaByteCacheRef,
    PosterFrameProviderRef, RemoteMediaSourceRef,
};
use crate::domain::service::AttachmentMediaService;
use crate::infrastructure::cache::InMemoryMediaCache;
use crate::infrastructure::local::FilesystemMediaSource;
use crate::infrastructure::persistence::InMemoryAttachmentStore;
use crate::infrastructure::remote::HttpMediaSource;

/// 应用上下文 - 包含组装完成的管线组件
pub struct ApplicationContext {
    pub service: Arc<AttachmentMediaService>,
    pub adapter: Arc<DisplayAdapter>,
    pub cache: Arc<InMemoryMediaCache>,
}

impl ApplicationContext {
    /// 为一个可复用的 UI 单元创建展示面
    pub fn create_surface(&self) -> (DisplaySurface, mpsc::Receiver<SurfaceEvent>) {
        DisplaySurface::new(self.service.clone(), self.adapter.clone())
    }
}

/// 构建应用上下文
///
/// 按照依赖顺序构建所有组件，宿主未提供的协作方以 None 传入。
pub fn initialize(
    app_config: &MageAppConfig,
    documents_root: PathBuf,
    token_provider: Option<AccessTokenProviderRef>,
    poster_provider: Option<PosterFrameProviderRef>,
    store: Option<AttachmentStoreRef>,
) -> Result<ApplicationContext> {
    // 1. 加载配置
    let config = AttachmentConfig::from_app_config(app_config);

    // 2. 构建字节缓存与本地来源
    let cache = Arc::new(InMemoryMediaCache::new(config.cache_budget_bytes));
    let local: LocalMediaSourceRef = Arc::new(FilesystemMediaSource::new(&documents_root));

    // 3. 构建远端来源，未配置远端源的离线部署跳过
    let remote: Option<RemoteMediaSourceRef> = match &config.remote_source {
        Some(remote_config) => Some(Arc::new(
            HttpMediaSource::new(remote_config, token_provider)
                .context("Failed to build http media source")?,
        )),
        None => None,
    };

    // 4. 持久层，宿主未提供时以内存实现兜底
    let store: AttachmentStoreRef =
        store.unwrap_or_else(|| Arc::new(InMemoryAttachmentStore::new()));

    // 5. 构建领域服务与展示适配器
    let adapter = Arc::new(DisplayAdapter::new(&config));
    let service = Arc::new(AttachmentMediaService::new(
        cache.clone() as MediaByteCacheRef,
        local,
        remote,
        Some(store),
        poster_provider,
        config,
    ));

    Ok(ApplicationContext {
        service,
        adapter,
        cache,
    })
}

#[cfg(test)]
mod tests {
    use mage_mobile_core::RemoteSourceConfig;

    use super::*;
    use crate::config::DEFAULT_CACHE_BUDGET_BYTES;

    #[tokio::test]
    async fn test_initialize_without_remote_profile() {
        let dir = tempfile::tempdir().expect("tempdir");
        let context = initialize(
            &MageAppConfig::default(),
            dir.path().to_path_buf(),
            None,
            None,
            None,
        )
        .expect("initialize");

        let stats = context.cache.stats().await;
        assert_eq!(stats.budget_bytes, DEFAULT_CACHE_BUDGET_BYTES);

        let (_surface, _events) = context.create_surface();
    }

    #[test]
    fn test_initialize_with_remote_profile() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app_config = MageAppConfig::default();
        app_config.remote_sources.insert(
            "default".to_string(),
            RemoteSourceConfig {
                base_url: "https://mage.example.com/api/".to_string(),
                ..Default::default()
            },
        );

        let context = initialize(&app_config, dir.path().to_path_buf(), None, None, None)
            .expect("initialize");
        assert!(context.service.config().remote_source.is_some());
    }

    #[test]
    fn test_initialize_rejects_invalid_base_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app_config = MageAppConfig::default();
        app_config.remote_sources.insert(
            "default".to_string(),
            RemoteSourceConfig {
                base_url: "not a url".to_string(),
                ..Default::default()
            },
        );

        assert!(initialize(&app_config, dir.path().to_path_buf(), None, None, None).is_err());
    }
}
