//! MAGE Mobile Core 配置模块
//!
//! 该模块提供了完整的客户端核心配置管理功能，包括：
//! - 配置文件加载和解析
//! - 环境特定配置覆盖
//! - 附件管线与远端源配置定义

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use toml::Value;
use tracing::warn;

use crate::error::{CoreError, CoreResult};

// 导入配置管理器模块
mod manager;
pub use manager::ConfigManager;

/// 全局应用配置实例，使用 OnceLock 确保只初始化一次
static APP_CONFIG: OnceLock<MageAppConfig> = OnceLock::new();

/// 服务标识配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServiceIdentityConfig {
    /// 应用名称
    #[serde(default)]
    pub name: String,
    /// 应用版本
    #[serde(default)]
    pub version: String,
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（trace/debug/info/warn/error）
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    /// 是否输出 target
    #[serde(default = "LoggingConfig::default_true")]
    pub with_target: bool,
    /// 是否输出线程 ID
    #[serde(default = "LoggingConfig::default_true")]
    pub with_thread_ids: bool,
    /// 是否输出文件名
    #[serde(default = "LoggingConfig::default_true")]
    pub with_file: bool,
    /// 是否输出行号
    #[serde(default = "LoggingConfig::default_true")]
    pub with_line_number: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "debug".to_string()
    }

    fn default_true() -> bool {
        true
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            with_target: true,
            with_thread_ids: true,
            with_file: true,
            with_line_number: true,
        }
    }
}

/// 远端附件源配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RemoteSourceConfig {
    /// 服务基础 URL
    pub base_url: String,
    /// 认证令牌写入的请求头名称
    #[serde(default)]
    pub token_header: Option<String>,
    /// 请求超时时间（秒）
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    /// 自定义 User-Agent
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// 附件管线配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AttachmentPipelineConfig {
    /// 媒体字节缓存预算（字节）
    #[serde(default)]
    pub cache_budget_bytes: Option<u64>,
    /// 缩略图最长边（像素）
    #[serde(default)]
    pub thumbnail_max_edge: Option<u32>,
    /// 大图变体最长边（像素）
    #[serde(default)]
    pub large_max_edge: Option<u32>,
    /// 占位图默认边长（像素）
    #[serde(default)]
    pub default_placeholder_edge: Option<u32>,
    /// 使用的远端源配置名称
    #[serde(default)]
    pub remote_source: Option<String>,
    /// 本地路径修复的额外搜索根目录
    #[serde(default)]
    pub search_roots: Option<Vec<String>>,
    /// 是否启用仅缓存模式（不发起网络请求）
    #[serde(default)]
    pub cache_only: Option<bool>,
}

/// MAGE 应用配置主结构体
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MageAppConfig {
    /// 服务标识
    #[serde(default)]
    pub service: ServiceIdentityConfig,
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 远端附件源配置映射
    #[serde(default)]
    pub remote_sources: HashMap<String, RemoteSourceConfig>,
    /// 附件管线配置
    #[serde(default)]
    pub attachments: AttachmentPipelineConfig,
}

impl MageAppConfig {
    /// 获取远端源配置
    pub fn remote_source_profile(&self, name: &str) -> Option<&RemoteSourceConfig> {
        self.remote_sources.get(name)
    }

    /// 获取附件管线配置
    pub fn attachment_pipeline(&self) -> AttachmentPipelineConfig {
        self.attachments.clone()
    }

    /// 校验配置内容
    pub fn validate(&self) -> CoreResult<()> {
        if self.logging.level.is_empty() {
            return Err(CoreError::InvalidConfig(
                "logging.level must not be empty".to_string(),
            ));
        }

        for (name, source) in &self.remote_sources {
            if source.base_url.is_empty() {
                return Err(CoreError::InvalidConfig(format!(
                    "remote source '{name}' has an empty base_url"
                )));
            }
        }

        let atts = &self.attachments;
        if atts.cache_budget_bytes == Some(0) {
            return Err(CoreError::InvalidConfig(
                "attachments.cache_budget_bytes must be greater than zero".to_string(),
            ));
        }
        if atts.thumbnail_max_edge == Some(0) {
            return Err(CoreError::InvalidConfig(
                "attachments.thumbnail_max_edge must be greater than zero".to_string(),
            ));
        }
        if atts.large_max_edge == Some(0) {
            return Err(CoreError::InvalidConfig(
                "attachments.large_max_edge must be greater than zero".to_string(),
            ));
        }
        if let (Some(large), Some(thumb)) = (atts.large_max_edge, atts.thumbnail_max_edge) {
            if large < thumb {
                return Err(CoreError::InvalidConfig(
                    "attachments.large_max_edge must not be smaller than thumbnail_max_edge"
                        .to_string(),
                ));
            }
        }
        if let Some(profile) = atts.remote_source.as_deref() {
            if !self.remote_sources.contains_key(profile) {
                return Err(CoreError::InvalidConfig(format!(
                    "attachments.remote_source references unknown profile '{profile}'"
                )));
            }
        }

        Ok(())
    }

    /// 确保配置有默认值
    fn ensure_defaults(&mut self) {
        if self.service.name.is_empty() {
            self.service.name = "mage-mobile-core".to_string();
        }
        if self.service.version.is_empty() {
            self.service.version = env!("CARGO_PKG_VERSION").to_string();
        }
        if self.logging.level.is_empty() {
            self.logging.level = LoggingConfig::default_level();
        }
    }
}

/// 加载配置
pub fn load_config(path: Option<&str>) -> &'static MageAppConfig {
    let candidates: Vec<PathBuf> = match path {
        Some(p) => vec![PathBuf::from(p)],
        None => vec![PathBuf::from("config"), PathBuf::from("config.toml")],
    };

    APP_CONFIG.get_or_init(|| {
        let mut cfg = load_with_fallback(&candidates);
        // 加载环境特定配置
        if let Err(e) = manager::ConfigManager::load_environment_config(&mut cfg) {
            warn!("failed to load environment config: {}", e);
        }
        cfg
    })
}

/// 加载配置并校验内容
pub fn load_config_with_validation(path: Option<&str>) -> CoreResult<&'static MageAppConfig> {
    let cfg = load_config(path);
    cfg.validate()?;
    Ok(cfg)
}

/// 获取应用配置
pub fn app_config() -> &'static MageAppConfig {
    APP_CONFIG.get().expect("configuration not initialised")
}

/// 使用备选方案加载配置
fn load_with_fallback(candidates: &[PathBuf]) -> MageAppConfig {
    for path in candidates {
        match load_config_from_source(path) {
            Ok(mut cfg) => {
                cfg.ensure_defaults();
                return cfg;
            }
            Err(err) => {
                warn!("failed to load config from {}: {err}", path.display());
            }
        }
    }

    warn!("no configuration source succeeded, falling back to defaults");
    default_config()
}

/// 从源加载配置
fn load_config_from_source(path: &Path) -> Result<MageAppConfig> {
    if !path.exists() {
        return Err(anyhow!(
            "configuration path {} does not exist",
            path.display()
        ));
    }

    let metadata = path
        .metadata()
        .with_context(|| format!("unable to read metadata for {}", path.display()))?;

    if metadata.is_dir() {
        load_config_from_directory(path)
    } else {
        load_config_from_file(path)
    }
}

/// 从文件加载配置
fn load_config_from_file(path: &Path) -> Result<MageAppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config file: {}", path.display()))?;
    let mut cfg: MageAppConfig = toml::from_str(&content)
        .with_context(|| format!("invalid config format: {}", path.display()))?;
    cfg.ensure_defaults();
    Ok(cfg)
}

/// 从目录加载配置
fn load_config_from_directory(path: &Path) -> Result<MageAppConfig> {
    let base_file = path.join("base.toml");
    if !base_file.exists() {
        return Err(anyhow!(
            "missing base configuration: {}",
            base_file.display()
        ));
    }

    let mut merged = load_toml_value(&base_file)?;

    if !merged.is_table() {
        return Err(anyhow!(
            "base configuration must be a table: {}",
            base_file.display()
        ));
    }

    merge_directory(&mut merged, &path.join("shared"))?;
    merge_directory(&mut merged, &path.join("modules"))?;
    merge_directory(&mut merged, &path.join("overrides"))?;

    let cfg: MageAppConfig = merged
        .try_into()
        .with_context(|| format!("invalid configuration after merging {}", path.display()))?;

    Ok(cfg)
}

/// 合并目录中的配置
fn merge_directory(root: &mut Value, dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("unable to read config directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(OsStr::to_str)
                .map(|ext| ext.eq_ignore_ascii_case("toml"))
                .unwrap_or(false)
        })
        .collect::<Vec<_>>();

    entries.sort_by_key(|entry| entry.path());

    for entry in entries {
        let value = load_toml_value(&entry.path())?;
        merge_value(root, value);
    }

    Ok(())
}

/// 加载 TOML 值
fn load_toml_value(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config fragment {}", path.display()))?;
    let value: Value = toml::from_str(&content)
        .with_context(|| format!("invalid TOML content in fragment {}", path.display()))?;
    Ok(value)
}

/// 合并值
fn merge_value(base: &mut Value, overlay: Value) {
    match overlay {
        Value::Table(overlay_table) => {
            if let Value::Table(base_table) = base {
                for (key, overlay_value) in overlay_table.into_iter() {
                    match base_table.get_mut(&key) {
                        Some(base_value) => merge_value(base_value, overlay_value),
                        None => {
                            base_table.insert(key, overlay_value);
                        }
                    }
                }
            } else {
                *base = Value::Table(overlay_table);
            }
        }
        other => {
            *base = other;
        }
    }
}

/// 默认配置
fn default_config() -> MageAppConfig {
    MageAppConfig {
        service: ServiceIdentityConfig {
            name: "mage-mobile-core".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        logging: LoggingConfig::default(),
        remote_sources: HashMap::new(),
        attachments: AttachmentPipelineConfig::default(),
    }
}
