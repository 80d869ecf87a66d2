//! 配置管理器 - 负责处理不同环境下的配置选择和覆盖
//!
//! 该模块提供了配置管理功能，包括：
//! - 根据环境变量选择远端附件源配置
//! - 加载环境特定配置
//! - 合并配置值

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use toml::Value;

use super::{MageAppConfig, RemoteSourceConfig};

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 根据环境变量或配置选择远端附件源配置
    ///
    /// 优先级：
    /// 1. 环境变量 MAGE_REMOTE_SOURCE_PROFILE 指定的配置
    /// 2. 配置文件中指定的配置
    ///
    /// # 参数
    /// * `config` - 应用配置
    /// * `profile_name` - 配置文件中指定的配置名称
    ///
    /// # 返回
    /// 返回选中的远端源配置，如果未找到则返回 None
    pub fn select_remote_source_config(
        config: &MageAppConfig,
        profile_name: &str,
    ) -> Option<RemoteSourceConfig> {
        // 首先检查环境变量中是否指定了远端源配置
        if let Ok(env_profile) = env::var("MAGE_REMOTE_SOURCE_PROFILE") {
            if let Some(source_config) = config.remote_source_profile(&env_profile) {
                return Some(source_config.clone());
            }
        }

        // 如果环境变量未设置或无效，则使用配置文件中指定的配置
        config.remote_source_profile(profile_name).cloned()
    }

    /// 获取当前环境名称
    ///
    /// 从环境变量 MAGE_ENV 获取当前环境名称，
    /// 如果未设置则默认为 "development"
    ///
    /// # 返回
    /// 返回当前环境名称
    pub fn get_environment() -> String {
        env::var("MAGE_ENV").unwrap_or_else(|_| "development".to_string())
    }

    /// 根据环境加载特定配置
    ///
    /// 加载 config/environments/{environment}.toml 文件中的配置，
    /// 并将其合并到基础配置中
    ///
    /// # 参数
    /// * `base_config` - 基础配置，将被修改以包含环境特定配置
    ///
    /// # 返回
    /// 成功时返回 Ok(())，失败时返回错误信息
    pub fn load_environment_config(base_config: &mut MageAppConfig) -> Result<()> {
        let env = Self::get_environment();
        let env_config_path = format!("config/environments/{}.toml", env);

        if Path::new(&env_config_path).exists() {
            let env_config_content = fs::read_to_string(&env_config_path)
                .with_context(|| format!("无法读取环境配置文件: {}", env_config_path))?;
            let env_config: Value = toml::from_str(&env_config_content)
                .with_context(|| format!("无效的环境配置格式: {}", env_config_path))?;

            // 合并环境配置到基础配置中
            Self::merge_config_values(&mut base_config.remote_sources, &env_config);
        }

        Ok(())
    }

    /// 合并配置值
    ///
    /// 将环境配置中的远端源配置合并到基础配置中
    ///
    /// # 参数
    /// * `remote_sources` - 基础远端源配置映射，将被修改
    /// * `env_config` - 环境配置值
    fn merge_config_values(
        remote_sources: &mut HashMap<String, RemoteSourceConfig>,
        env_config: &Value,
    ) {
        if let Some(env_remote_sources) = env_config.get("remote_sources") {
            if let Some(tables) = env_remote_sources.as_table() {
                for (key, value) in tables {
                    // 只有当配置包含 base_url 时才处理
                    if let Some(base_url) = value.get("base_url").and_then(|v| v.as_str()) {
                        let mut config = RemoteSourceConfig::default();
                        config.base_url = base_url.to_string();

                        // 逐个字段处理配置值
                        if let Some(token_header) =
                            value.get("token_header").and_then(|v| v.as_str())
                        {
                            config.token_header = Some(token_header.to_string());
                        }
                        if let Some(timeout_seconds) =
                            value.get("timeout_seconds").and_then(|v| v.as_integer())
                        {
                            config.timeout_seconds = Some(timeout_seconds as u64);
                        }
                        if let Some(user_agent) = value.get("user_agent").and_then(|v| v.as_str()) {
                            config.user_agent = Some(user_agent.to_string());
                        }

                        remote_sources.insert(key.clone(), config);
                    }
                }
            }
        }
    }
}
