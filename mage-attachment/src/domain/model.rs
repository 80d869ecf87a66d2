use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

pub const THUMBNAIL_KEY_SUFFIX: &str = "_thumbnail";
pub const LARGE_KEY_SUFFIX: &str = "_large";
pub const POSTER_KEY_SUFFIX: &str = "_poster";

/// 附件记录的只读投影
///
/// 所属持久层拥有完整记录，本管线仅按展示请求读取这些字段。
#[derive(Debug, Clone, Default)]
pub struct Attachment {
    /// 持久层记录标识
    pub id: String,
    /// 服务端分配的 URL/标识，作为稳定缓存键；未上传的附件为空
    pub remote_id: Option<String>,
    /// 创建时记录的本地路径，容器迁移后可能失效
    pub stored_local_path: Option<String>,
    /// 原始文件名
    pub file_name: Option<String>,
    /// MIME 风格的内容类型
    pub content_type: Option<String>,
    /// 字节大小，仅用于下载提示
    pub size_bytes: Option<u64>,
}

impl Attachment {
    /// 创建尚未上传的本地附件投影
    pub fn new_local(file_name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            remote_id: None,
            stored_local_path: None,
            file_name: Some(file_name.into()),
            content_type: Some(content_type.into()),
            size_bytes: None,
        }
    }

    /// 由裸 URL 构造投影，供非附件场景直接加载
    pub fn from_remote_url(url: impl Into<String>, content_type: Option<String>) -> Self {
        let url = url.into();
        Self {
            id: url.clone(),
            remote_id: Some(url),
            stored_local_path: None,
            file_name: None,
            content_type,
            size_bytes: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.file_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or("attachment")
    }
}

/// 缓存层级，按目标分辨率区分缓存桶
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaTier {
    Thumbnail,
    Large,
    Full,
}

impl MediaTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaTier::Thumbnail => "thumbnail",
            MediaTier::Large => "large",
            MediaTier::Full => "full",
        }
    }

    pub fn key_suffix(&self) -> &'static str {
        match self {
            MediaTier::Thumbnail => THUMBNAIL_KEY_SUFFIX,
            MediaTier::Large => LARGE_KEY_SUFFIX,
            MediaTier::Full => "",
        }
    }

    /// 按远端标识与层级后缀组合缓存键
    pub fn cache_key(&self, remote_id: &str) -> String {
        format!("{}{}", remote_id, self.key_suffix())
    }
}

/// 视频海报帧的缓存键
pub fn poster_cache_key(remote_id: &str) -> String {
    format!("{}{}", remote_id, POSTER_KEY_SUFFIX)
}

/// 展示分派用的内容大类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Image,
    Video,
    Audio,
    Other,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Image => "image",
            ContentKind::Video => "video",
            ContentKind::Audio => "audio",
            ContentKind::Other => "other",
        }
    }
}

/// 从内容类型推断内容大类，类型缺失或无信息量时按文件扩展名兜底
pub fn infer_content_kind(content_type: Option<&str>, file_name: Option<&str>) -> ContentKind {
    let normalized = content_type
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default();

    // application/octet-stream 等于没说，走扩展名
    if !normalized.is_empty() && normalized != "application/octet-stream" {
        return kind_from_mime_prefix(&normalized);
    }

    if let Some(name) = file_name {
        if let Some(guess) = mime_guess::from_path(name).first() {
            return kind_from_mime_prefix(guess.essence_str());
        }
    }

    ContentKind::Other
}

fn kind_from_mime_prefix(mime: &str) -> ContentKind {
    if mime.starts_with("image") {
        ContentKind::Image
    } else if mime.starts_with("video") {
        ContentKind::Video
    } else if mime.starts_with("audio") {
        ContentKind::Audio
    } else {
        ContentKind::Other
    }
}

/// 展示面的像素边界，已含设备像素密度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn square(edge: u32) -> Self {
        Self::new(edge, edge)
    }

    /// 由逻辑点尺寸与像素密度换算像素边界
    pub fn from_points(width: f64, height: f64, scale: f64) -> Self {
        let scale = if scale > 0.0 { scale } else { 1.0 };
        Self::new(
            (width * scale).round() as u32,
            (height * scale).round() as u32,
        )
    }

    pub fn max_edge(&self) -> u32 {
        self.width.max(self.height)
    }
}

/// 一次展示请求
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub attachment: Attachment,
    /// 请求的缓存层级，None 表示按展示边界取默认尺寸
    pub tier: Option<MediaTier>,
    pub surface_bounds: Option<TargetSize>,
    /// 仅缓存模式：禁止任何网络访问
    pub cache_only: bool,
}

impl LoadRequest {
    pub fn new(attachment: Attachment) -> Self {
        Self {
            attachment,
            tier: None,
            surface_bounds: None,
            cache_only: false,
        }
    }
}

/// 远端读取计划：先按序探测缓存键，未命中再回源
#[derive(Debug, Clone)]
pub struct RemotePlan {
    pub url: String,
    /// 回源前按序探测的缓存键
    pub read_keys: Vec<String>,
    /// 结果字节写入的缓存键
    pub store_key: String,
    /// 降采样目标，None 表示不设上限
    pub target: Option<TargetSize>,
    pub tier: MediaTier,
}

/// 来源优先级判定结果，每次展示尝试恰好选中一种
#[derive(Debug, Clone)]
pub enum ResolvedSource {
    /// 修复校验过的本地文件
    Local { path: PathBuf },
    /// 远端获取或纯缓存读取
    Remote(RemotePlan),
    /// 无可用来源
    NoSource,
}

/// 媒体字节的实际来历
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaOrigin {
    LocalFile,
    Cache,
    Network,
}

impl MediaOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaOrigin::LocalFile => "local_file",
            MediaOrigin::Cache => "cache",
            MediaOrigin::Network => "network",
        }
    }
}

/// 加载成功交付的媒体
pub struct LoadedMedia {
    pub image: image::DynamicImage,
    pub origin: MediaOrigin,
    pub tier: MediaTier,
    pub byte_len: usize,
}

/// 单次加载的终态，每次加载恰好交付一次
pub enum LoadOutcome {
    Loaded(LoadedMedia),
    /// 既无本地文件也无远端 URL
    NoSource,
    Failed(LoadError),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded(_))
    }
}

/// 加载失败的类别
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// 仅缓存模式下未命中任何层级，属策略拒绝而非瞬时故障
    #[error("cache miss for {key} in cache-only mode")]
    CacheOnlyMiss { key: String },
    /// 网络或磁盘读取失败
    #[error("transport failure: {0}")]
    Transport(String),
    /// 字节无法解码为图像
    #[error("decode failure: {0}")]
    Decode(String),
}
