//! 缓存层级判定
//!
//! 只做缓存元数据查询，不触发网络，也不读取图像字节。

use super::model::MediaTier;
use super::repository::MediaByteCacheRef;

pub struct CacheTierResolver {
    cache: MediaByteCacheRef,
}

impl CacheTierResolver {
    pub fn new(cache: MediaByteCacheRef) -> Self {
        Self { cache }
    }

    pub async fn is_thumbnail_cached(&self, remote_id: &str) -> bool {
        self.cache
            .exists(&MediaTier::Thumbnail.cache_key(remote_id))
            .await
    }

    /// 全尺寸条目同样满足大图判定
    pub async fn is_large_cached(&self, remote_id: &str) -> bool {
        self.cache
            .exists(&MediaTier::Large.cache_key(remote_id))
            .await
            || self.is_full_size_cached(remote_id).await
    }

    pub async fn is_full_size_cached(&self, remote_id: &str) -> bool {
        self.cache
            .exists(&MediaTier::Full.cache_key(remote_id))
            .await
    }

    pub async fn is_any_cached(&self, remote_id: &str) -> bool {
        self.is_thumbnail_cached(remote_id).await || self.is_large_cached(remote_id).await
    }
}
