//! MAGE Mobile Core 公共库
//!
//! 提供统一的配置加载和日志初始化功能

pub mod config;
pub mod error;
pub mod tracing;

pub use config::{
    AttachmentPipelineConfig, ConfigManager, LoggingConfig, MageAppConfig, RemoteSourceConfig,
    ServiceIdentityConfig, app_config, load_config, load_config_with_validation,
};
pub use error::*;
