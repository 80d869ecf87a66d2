//! 附件管线配置
//!
//! 从全局配置的 `[attachments]` 段构建，远端源按命名 profile 选择，
//! 缺失的字段落到内置默认值。

use std::path::PathBuf;

use mage_mobile_core::{
    AttachmentPipelineConfig, ConfigManager, MageAppConfig, RemoteSourceConfig,
};

pub const DEFAULT_CACHE_BUDGET_BYTES: usize = 64 * 1024 * 1024;
pub const MIN_CACHE_BUDGET_BYTES: usize = 1024 * 1024;
pub const DEFAULT_THUMBNAIL_MAX_EDGE: u32 = 240;
pub const DEFAULT_LARGE_MAX_EDGE: u32 = 1920;
pub const DEFAULT_PLACEHOLDER_EDGE: u32 = 120;
pub const MIN_PLACEHOLDER_EDGE: u32 = 16;
pub const DEFAULT_LABEL_MAX_CHARS: usize = 32;

const DEFAULT_REMOTE_PROFILE: &str = "default";

#[derive(Debug, Clone)]
pub struct AttachmentConfig {
    /// 媒体字节缓存预算
    pub cache_budget_bytes: usize,
    /// 缩略图层级最长边（像素）
    pub thumbnail_max_edge: u32,
    /// 大图层级最长边（像素）
    pub large_max_edge: u32,
    /// 占位图边长（像素）
    pub default_placeholder_edge: u32,
    /// 文件标签的最大字符数，超出部分以省略号截断
    pub label_max_chars: usize,
    /// 路径修复的额外搜索根目录
    pub search_roots: Vec<PathBuf>,
    /// 全局仅缓存模式，禁止一切网络请求
    pub cache_only: bool,
    /// 选中的远端源，None 表示离线部署
    pub remote_source: Option<RemoteSourceConfig>,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            cache_budget_bytes: DEFAULT_CACHE_BUDGET_BYTES,
            thumbnail_max_edge: DEFAULT_THUMBNAIL_MAX_EDGE,
            large_max_edge: DEFAULT_LARGE_MAX_EDGE,
            default_placeholder_edge: DEFAULT_PLACEHOLDER_EDGE,
            label_max_chars: DEFAULT_LABEL_MAX_CHARS,
            search_roots: Vec::new(),
            cache_only: false,
            remote_source: None,
        }
    }
}

impl AttachmentConfig {
    /// 从全局应用配置构建管线配置
    pub fn from_app_config(app: &MageAppConfig) -> Self {
        let pipeline = app.attachment_pipeline();
        let profile = pipeline
            .remote_source
            .clone()
            .unwrap_or_else(|| DEFAULT_REMOTE_PROFILE.to_string());
        let remote_source = ConfigManager::select_remote_source_config(app, &profile);
        Self::from_pipeline(pipeline, remote_source)
    }

    fn from_pipeline(
        pipeline: AttachmentPipelineConfig,
        remote_source: Option<RemoteSourceConfig>,
    ) -> Self {
        let defaults = Self::default();
        let thumbnail_max_edge = pipeline
            .thumbnail_max_edge
            .unwrap_or(defaults.thumbnail_max_edge)
            .max(1);

        Self {
            cache_budget_bytes: pipeline
                .cache_budget_bytes
                .map(|value| value as usize)
                .unwrap_or(defaults.cache_budget_bytes)
                .max(MIN_CACHE_BUDGET_BYTES),
            thumbnail_max_edge,
            // 大图边长不允许小于缩略图边长
            large_max_edge: pipeline
                .large_max_edge
                .unwrap_or(defaults.large_max_edge)
                .max(thumbnail_max_edge),
            default_placeholder_edge: pipeline
                .default_placeholder_edge
                .unwrap_or(defaults.default_placeholder_edge)
                .max(MIN_PLACEHOLDER_EDGE),
            label_max_chars: defaults.label_max_chars,
            search_roots: pipeline
                .search_roots
                .unwrap_or_default()
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            cache_only: pipeline.cache_only.unwrap_or(false),
            remote_source,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn app_config_with(attachments: AttachmentPipelineConfig) -> MageAppConfig {
        let mut remote_sources = HashMap::new();
        remote_sources.insert(
            "default".to_string(),
            RemoteSourceConfig {
                base_url: "https://mage.example.com/api".to_string(),
                ..Default::default()
            },
        );
        MageAppConfig {
            remote_sources,
            attachments,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_values() {
        let config = AttachmentConfig::default();
        assert_eq!(config.cache_budget_bytes, DEFAULT_CACHE_BUDGET_BYTES);
        assert_eq!(config.thumbnail_max_edge, DEFAULT_THUMBNAIL_MAX_EDGE);
        assert_eq!(config.large_max_edge, DEFAULT_LARGE_MAX_EDGE);
        assert!(!config.cache_only);
        assert!(config.remote_source.is_none());
    }

    #[test]
    fn test_from_app_config_applies_section_and_profile() {
        let app = app_config_with(AttachmentPipelineConfig {
            cache_budget_bytes: Some(8 * 1024 * 1024),
            thumbnail_max_edge: Some(160),
            search_roots: Some(vec!["/tmp/shared".to_string()]),
            cache_only: Some(true),
            ..Default::default()
        });

        let config = AttachmentConfig::from_app_config(&app);
        assert_eq!(config.cache_budget_bytes, 8 * 1024 * 1024);
        assert_eq!(config.thumbnail_max_edge, 160);
        assert_eq!(config.search_roots, vec![PathBuf::from("/tmp/shared")]);
        assert!(config.cache_only);
        let remote = config.remote_source.expect("default profile selected");
        assert_eq!(remote.base_url, "https://mage.example.com/api");
    }

    #[test]
    fn test_budget_floor_is_enforced() {
        let app = app_config_with(AttachmentPipelineConfig {
            cache_budget_bytes: Some(1),
            ..Default::default()
        });
        let config = AttachmentConfig::from_app_config(&app);
        assert_eq!(config.cache_budget_bytes, MIN_CACHE_BUDGET_BYTES);
    }

    #[test]
    fn test_inverted_edges_are_clamped() {
        let app = app_config_with(AttachmentPipelineConfig {
            thumbnail_max_edge: Some(512),
            large_max_edge: Some(256),
            ..Default::default()
        });
        let config = AttachmentConfig::from_app_config(&app);
        assert_eq!(config.large_max_edge, config.thumbnail_max_edge);
    }

    #[test]
    fn test_missing_profile_leaves_remote_source_unset() {
        let app = MageAppConfig {
            attachments: AttachmentPipelineConfig {
                remote_source: Some("field-server".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = AttachmentConfig::from_app_config(&app);
        assert!(config.remote_source.is_none());
    }
}
