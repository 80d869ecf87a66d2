//! MAGE Mobile Core 错误工具模块
//!
//! 为配置加载与校验提供统一的错误类型

use thiserror::Error;

/// 核心层错误
#[derive(Debug, Error)]
pub enum CoreError {
    /// 配置内容缺失或非法
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// 配置来源读取失败
    #[error("config source error: {0}")]
    ConfigSource(#[from] std::io::Error),
    /// TOML 解析失败
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// 核心层统一 Result 别名
pub type CoreResult<T> = Result<T, CoreError>;
