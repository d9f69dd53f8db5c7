//! 配置管理命令
//!
//! 配置文件查找顺序：
//! 1. `--config <path>`
//! 2. `<config_dir>/ee543/config.toml`（存在时）
//! 3. 默认配置
//!
//! `--port` / `--baud` 始终覆盖文件中的值。

use crate::GlobalArgs;
use anyhow::{Context, Result};
use clap::Subcommand;
use ee543_client::ArmConfig;
use std::path::PathBuf;
use tracing::debug;

/// 默认配置文件路径
pub fn default_config_file() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;
    path.push("ee543");
    path.push("config.toml");
    Ok(path)
}

/// 本次运行实际使用的配置文件（可能不存在）
fn config_path(global: &GlobalArgs) -> Result<PathBuf> {
    match &global.config {
        Some(path) => Ok(path.clone()),
        None => default_config_file(),
    }
}

/// 加载配置并应用命令行覆盖
pub fn resolve(global: &GlobalArgs) -> Result<ArmConfig> {
    let mut config = match &global.config {
        Some(path) => ArmConfig::load_from_file(path)
            .with_context(|| format!("加载配置文件失败: {}", path.display()))?,
        None => {
            let path = default_config_file()?;
            if path.exists() {
                ArmConfig::load_from_file(&path)
                    .with_context(|| format!("加载配置文件失败: {}", path.display()))?
            } else {
                debug!("No config file at {}, using defaults", path.display());
                ArmConfig::default()
            }
        },
    };

    if let Some(port) = &global.port {
        config.link.port = port.clone();
    }
    if let Some(baud) = global.baud {
        config.link.baud_rate = baud;
    }
    config.validate().context("配置无效")?;
    Ok(config)
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示生效的配置（TOML）
    Show,

    /// 写入默认配置文件
    Init {
        /// 覆盖已有文件
        #[arg(long)]
        force: bool,
    },

    /// 显示配置文件路径
    Path,
}

impl ConfigCommand {
    pub fn execute(self, global: &GlobalArgs) -> Result<()> {
        match self {
            ConfigCommand::Show => {
                let config = resolve(global)?;
                print!("{}", config.to_toml_string()?);
                Ok(())
            },

            ConfigCommand::Init { force } => {
                let path = config_path(global)?;
                if path.exists() && !force {
                    anyhow::bail!("配置文件已存在: {}（使用 --force 覆盖）", path.display());
                }
                let mut config = ArmConfig::default();
                if let Some(port) = &global.port {
                    config.link.port = port.clone();
                }
                if let Some(baud) = global.baud {
                    config.link.baud_rate = baud;
                }
                config
                    .save_to_file(&path)
                    .with_context(|| format!("写入配置文件失败: {}", path.display()))?;
                println!("✅ 已写入配置: {}", path.display());
                Ok(())
            },

            ConfigCommand::Path => {
                let path = config_path(global)?;
                println!("{}", path.display());
                Ok(())
            },
        }
    }
}
