use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;

use super::model::{Attachment, ResolvedSource, TargetSize};

/// 下载进度回调，参数为 0.0..=1.0 的完成比例
pub type ProgressSink = Box<dyn Fn(f64) + Send + Sync>;

/// 附件记录存取端口
#[async_trait::async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn load_attachment(&self, id: &str) -> anyhow::Result<Option<Attachment>>;

    /// 回写修复后的本地路径
    async fn update_local_path(&self, id: &str, path: &str) -> anyhow::Result<()>;
}

pub type AttachmentStoreRef = Arc<dyn AttachmentStore>;

/// 媒体字节缓存端口，键为远端标识加层级后缀
#[async_trait::async_trait]
pub trait MediaByteCache: Send + Sync {
    async fn exists(&self, key: &str) -> bool;

    async fn fetch(&self, key: &str) -> Option<Bytes>;

    async fn store(&self, key: &str, bytes: Bytes);

    /// 移除已确认损坏的条目
    async fn invalidate(&self, key: &str);
}

pub type MediaByteCacheRef = Arc<dyn MediaByteCache>;

/// 远端媒体来源端口
#[async_trait::async_trait]
pub trait RemoteMediaSource: Send + Sync {
    async fn fetch(&self, url: &str, progress: Option<ProgressSink>) -> anyhow::Result<Bytes>;
}

pub type RemoteMediaSourceRef = Arc<dyn RemoteMediaSource>;

/// 本地文件来源端口，根目录由宿主注入
#[async_trait::async_trait]
pub trait LocalMediaSource: Send + Sync {
    fn documents_root(&self) -> PathBuf;

    async fn exists(&self, path: &Path) -> bool;

    async fn read(&self, path: &Path) -> anyhow::Result<Bytes>;
}

pub type LocalMediaSourceRef = Arc<dyn LocalMediaSource>;

/// 访问令牌提供端口，由宿主会话层实现
pub trait AccessTokenProvider: Send + Sync {
    fn access_token(&self) -> Option<String>;
}

pub type AccessTokenProviderRef = Arc<dyn AccessTokenProvider>;

/// 视频海报帧提取端口，由宿主播放器栈实现
#[async_trait::async_trait]
pub trait PosterFrameProvider: Send + Sync {
    async fn poster_frame(
        &self,
        source: &ResolvedSource,
        target: Option<TargetSize>,
    ) -> anyhow::Result<image::DynamicImage>;
}

pub type PosterFrameProviderRef = Arc<dyn PosterFrameProvider>;
