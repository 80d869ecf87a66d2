use std::path::{Path, PathBuf};

use bytes::Bytes;
use image::{DynamicImage, ImageFormat};
use tracing::{debug, instrument, warn};

use crate::config::AttachmentConfig;
use crate::infrastructure::media_processor::MediaProcessor;

use super::healer::PathHealer;
use super::model::{
    Attachment, LoadError, LoadOutcome, LoadRequest, LoadedMedia, MediaOrigin, MediaTier,
    RemotePlan, ResolvedSource, TargetSize, poster_cache_key,
};
use super::repository::{
    AttachmentStoreRef, LocalMediaSourceRef, MediaByteCacheRef, PosterFrameProviderRef,
    ProgressSink, RemoteMediaSourceRef,
};
use super::tiering::CacheTierResolver;

/// 附件媒体加载服务
///
/// 按固定优先级选定来源（修复后的本地文件、各层级缓存、远端回源），
/// 执行一次加载并交付单一终态。
pub struct AttachmentMediaService {
    cache: MediaByteCacheRef,
    local: LocalMediaSourceRef,
    remote: Option<RemoteMediaSourceRef>,
    store: Option<AttachmentStoreRef>,
    poster_provider: Option<PosterFrameProviderRef>,
    healer: PathHealer,
    tiers: CacheTierResolver,
    processor: MediaProcessor,
    config: AttachmentConfig,
}

struct FetchedBytes {
    bytes: Bytes,
    origin: MediaOrigin,
    key: String,
}

impl AttachmentMediaService {
    pub fn new(
        cache: MediaByteCacheRef,
        local: LocalMediaSourceRef,
        remote: Option<RemoteMediaSourceRef>,
        store: Option<AttachmentStoreRef>,
        poster_provider: Option<PosterFrameProviderRef>,
        config: AttachmentConfig,
    ) -> Self {
        let healer = PathHealer::new(local.clone(), config.search_roots.clone());
        let tiers = CacheTierResolver::new(cache.clone());

        Self {
            cache,
            local,
            remote,
            store,
            poster_provider,
            healer,
            tiers,
            processor: MediaProcessor::new(),
            config,
        }
    }

    pub fn config(&self) -> &AttachmentConfig {
        &self.config
    }

    pub fn tiers(&self) -> &CacheTierResolver {
        &self.tiers
    }

    /// 选定加载来源，每次展示尝试恰好产出一种
    ///
    /// 优先级：修复成功的本地文件；全尺寸缓存或显式全尺寸请求；
    /// 缩略图请求（可复用大图缓存）；大图请求；按展示边界的默认计划。
    #[instrument(skip(self, request))]
    pub async fn resolve_source(&self, request: &LoadRequest) -> ResolvedSource {
        let attachment = &request.attachment;

        if let Some(path) = self
            .healer
            .heal(
                attachment.stored_local_path.as_deref(),
                attachment.file_name.as_deref(),
            )
            .await
        {
            return ResolvedSource::Local { path };
        }

        let Some(remote_id) = attachment.remote_id.as_deref().filter(|id| !id.is_empty()) else {
            return ResolvedSource::NoSource;
        };

        let url = remote_id.to_string();
        let full_key = MediaTier::Full.cache_key(remote_id);

        if request.tier == Some(MediaTier::Full) || self.tiers.is_full_size_cached(remote_id).await
        {
            return ResolvedSource::Remote(RemotePlan {
                url,
                read_keys: vec![full_key.clone()],
                store_key: full_key,
                target: None,
                tier: MediaTier::Full,
            });
        }

        if request.tier == Some(MediaTier::Thumbnail) {
            let thumbnail_key = MediaTier::Thumbnail.cache_key(remote_id);
            let target = Some(TargetSize::square(self.config.thumbnail_max_edge));
            if self.tiers.is_large_cached(remote_id).await {
                // 复用已缓存的大图字节，避免第二次回源，解码后再降采样
                return ResolvedSource::Remote(RemotePlan {
                    url,
                    read_keys: vec![MediaTier::Large.cache_key(remote_id), full_key],
                    store_key: thumbnail_key,
                    target,
                    tier: MediaTier::Thumbnail,
                });
            }
            return ResolvedSource::Remote(RemotePlan {
                url,
                read_keys: vec![thumbnail_key.clone()],
                store_key: thumbnail_key,
                target,
                tier: MediaTier::Thumbnail,
            });
        }

        if request.tier == Some(MediaTier::Large) {
            let large_key = MediaTier::Large.cache_key(remote_id);
            return ResolvedSource::Remote(RemotePlan {
                url,
                read_keys: vec![large_key.clone(), full_key],
                store_key: large_key,
                target: Some(TargetSize::square(self.config.large_max_edge)),
                tier: MediaTier::Large,
            });
        }

        // 未指明层级时按展示边界取默认尺寸，缓存键不带后缀
        ResolvedSource::Remote(RemotePlan {
            url,
            read_keys: vec![full_key.clone()],
            store_key: full_key,
            target: request.surface_bounds,
            tier: MediaTier::Full,
        })
    }

    /// 执行一次媒体加载，返回单一终态
    #[instrument(skip(self, request, progress))]
    pub async fn load_media(
        &self,
        request: &LoadRequest,
        progress: Option<ProgressSink>,
    ) -> LoadOutcome {
        let cache_only = request.cache_only || self.config.cache_only;

        match self.resolve_source(request).await {
            ResolvedSource::NoSource => {
                debug!(attachment_id = %request.attachment.id, "attachment has no loadable source");
                LoadOutcome::NoSource
            }
            ResolvedSource::Local { path } => self.load_local(request, path).await,
            ResolvedSource::Remote(plan) => {
                self.load_remote(&plan, cache_only, progress).await
            }
        }
    }

    /// 加载视频海报帧，抽帧结果缓存在 `_poster` 键下
    #[instrument(skip(self, request))]
    pub async fn load_poster(&self, request: &LoadRequest) -> LoadOutcome {
        let cache_only = request.cache_only || self.config.cache_only;
        let source = self.resolve_source(request).await;
        if matches!(source, ResolvedSource::NoSource) {
            return LoadOutcome::NoSource;
        }

        let poster_key = request
            .attachment
            .remote_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(poster_cache_key);

        if let Some(key) = &poster_key {
            if let Some(bytes) = self.cache.fetch(key).await {
                match self.processor.decode(&bytes) {
                    Ok(image) => {
                        return LoadOutcome::Loaded(LoadedMedia {
                            image,
                            origin: MediaOrigin::Cache,
                            tier: request.tier.unwrap_or(MediaTier::Full),
                            byte_len: bytes.len(),
                        });
                    }
                    Err(err) => {
                        self.cache.invalidate(key).await;
                        warn!(key = %key, error = %err, "cached poster decode failed");
                    }
                }
            }
        }

        // 远端视频的抽帧需要网络访问，仅缓存模式下按未命中处理
        if cache_only {
            if let ResolvedSource::Remote(plan) = &source {
                return LoadOutcome::Failed(LoadError::CacheOnlyMiss {
                    key: poster_key.unwrap_or_else(|| plan.store_key.clone()),
                });
            }
        }

        let Some(provider) = &self.poster_provider else {
            return LoadOutcome::Failed(LoadError::Transport(
                "poster frame provider is not configured".to_string(),
            ));
        };

        match provider.poster_frame(&source, self.tier_target(request)).await {
            Ok(image) => {
                let origin = match &source {
                    ResolvedSource::Local { .. } => MediaOrigin::LocalFile,
                    _ => MediaOrigin::Network,
                };
                let mut byte_len = 0;
                if let Some(key) = &poster_key {
                    match self.processor.encode(&image, ImageFormat::Png) {
                        Ok(encoded) => {
                            byte_len = encoded.len();
                            self.cache.store(key, Bytes::from(encoded)).await;
                        }
                        Err(err) => {
                            debug!(key = %key, error = %err, "poster frame not cached");
                        }
                    }
                }
                LoadOutcome::Loaded(LoadedMedia {
                    image,
                    origin,
                    tier: request.tier.unwrap_or(MediaTier::Full),
                    byte_len,
                })
            }
            Err(err) => {
                warn!(
                    attachment_id = %request.attachment.id,
                    error = %err,
                    "poster frame extraction failed"
                );
                LoadOutcome::Failed(LoadError::Transport(err.to_string()))
            }
        }
    }

    async fn load_local(&self, request: &LoadRequest, path: PathBuf) -> LoadOutcome {
        let bytes = match self.local.read(&path).await {
            Ok(bytes) => bytes,
            Err(err) => return LoadOutcome::Failed(LoadError::Transport(err.to_string())),
        };

        match self.processor.decode(&bytes) {
            Ok(image) => {
                self.write_back_healed_path(&request.attachment, &path).await;
                let image = self.processor.downsample(image, self.tier_target(request));
                LoadOutcome::Loaded(LoadedMedia {
                    image,
                    origin: MediaOrigin::LocalFile,
                    tier: request.tier.unwrap_or(MediaTier::Full),
                    byte_len: bytes.len(),
                })
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "local image decode failed");
                LoadOutcome::Failed(LoadError::Decode(err.to_string()))
            }
        }
    }

    async fn load_remote(
        &self,
        plan: &RemotePlan,
        cache_only: bool,
        progress: Option<ProgressSink>,
    ) -> LoadOutcome {
        let fetched = match self.fetch_plan(plan, cache_only, progress).await {
            Ok(fetched) => fetched,
            Err(err) => return LoadOutcome::Failed(err),
        };

        match self.processor.decode(&fetched.bytes) {
            Ok(decoded) => {
                let source_dims = (decoded.width(), decoded.height());
                let image = self.processor.downsample(decoded, plan.target);
                let byte_len = match fetched.origin {
                    // 回源字节解码成功后才入缓存，坏字节不落盘
                    MediaOrigin::Network => {
                        self.store_network_bytes(&fetched, &image, source_dims).await
                    }
                    _ => fetched.bytes.len(),
                };
                LoadOutcome::Loaded(LoadedMedia {
                    image,
                    origin: fetched.origin,
                    tier: plan.tier,
                    byte_len,
                })
            }
            Err(err) => {
                // 坏条目立即失效，避免后续请求反复解码失败
                if fetched.origin == MediaOrigin::Cache {
                    self.cache.invalidate(&fetched.key).await;
                }
                warn!(key = %fetched.key, error = %err, "image decode failed");
                LoadOutcome::Failed(LoadError::Decode(err.to_string()))
            }
        }
    }

    /// 回源结果写缓存；发生过降采样时改存降采样后的编码，
    /// 缓存条目不大于展示所需
    async fn store_network_bytes(
        &self,
        fetched: &FetchedBytes,
        image: &DynamicImage,
        source_dims: (u32, u32),
    ) -> usize {
        if (image.width(), image.height()) == source_dims {
            self.cache.store(&fetched.key, fetched.bytes.clone()).await;
            debug!(key = %fetched.key, bytes = fetched.bytes.len(), "remote media cached");
            return fetched.bytes.len();
        }

        let format = self.processor.storage_format(&fetched.bytes);
        match self.processor.encode(image, format) {
            Ok(encoded) => {
                let byte_len = encoded.len();
                self.cache.store(&fetched.key, Bytes::from(encoded)).await;
                debug!(key = %fetched.key, bytes = byte_len, "downsampled remote media cached");
                byte_len
            }
            Err(err) => {
                // 编码失败时退回存原始字节
                debug!(key = %fetched.key, error = %err, "downsample encode failed");
                self.cache.store(&fetched.key, fetched.bytes.clone()).await;
                fetched.bytes.len()
            }
        }
    }

    /// 按序探测缓存键，未命中且允许联网时回源
    async fn fetch_plan(
        &self,
        plan: &RemotePlan,
        cache_only: bool,
        progress: Option<ProgressSink>,
    ) -> Result<FetchedBytes, LoadError> {
        for key in &plan.read_keys {
            if let Some(bytes) = self.cache.fetch(key).await {
                debug!(key = %key, "media cache hit");
                return Ok(FetchedBytes {
                    bytes,
                    origin: MediaOrigin::Cache,
                    key: key.clone(),
                });
            }
        }

        if cache_only {
            return Err(LoadError::CacheOnlyMiss {
                key: plan.store_key.clone(),
            });
        }

        let Some(remote) = &self.remote else {
            return Err(LoadError::Transport(
                "no remote media source configured".to_string(),
            ));
        };

        let bytes = remote
            .fetch(&plan.url, progress)
            .await
            .map_err(|err| LoadError::Transport(err.to_string()))?;

        Ok(FetchedBytes {
            bytes,
            origin: MediaOrigin::Network,
            key: plan.store_key.clone(),
        })
    }

    async fn write_back_healed_path(&self, attachment: &Attachment, healed: &Path) {
        let Some(store) = &self.store else {
            return;
        };
        let healed_str = healed.to_string_lossy();
        if attachment.stored_local_path.as_deref() == Some(healed_str.as_ref()) {
            return;
        }
        // 修复结果回写是尽力而为的修正
        store
            .update_local_path(&attachment.id, healed_str.as_ref())
            .await
            .ok();
    }

    fn tier_target(&self, request: &LoadRequest) -> Option<TargetSize> {
        match request.tier {
            Some(MediaTier::Thumbnail) => Some(TargetSize::square(self.config.thumbnail_max_edge)),
            Some(MediaTier::Large) => Some(TargetSize::square(self.config.large_max_edge)),
            Some(MediaTier::Full) => None,
            None => request.surface_bounds,
        }
    }
}
