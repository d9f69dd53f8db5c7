//! # EE543 CLI
//!
//! Command-line interface for the EE543 servo arm.
//!
//! ## 双模式架构
//!
//! ### One-shot 模式（推荐用于脚本）
//!
//! ```bash
//! # 生成默认配置
//! ee543-cli config init
//!
//! # 执行操作（内部：握手 -> 运动 -> 关闭串口）
//! ee543-cli --port /dev/ttyACM0 move --joints 10,-10,0,5 --speed 80
//! ee543-cli gripper close
//! ```
//!
//! ### Shell 模式（键盘点动）
//!
//! ```bash
//! $ ee543-cli shell
//! ee543> j1+
//! ee543> goto 10,-10,0,5
//! ee543> close
//! ee543> exit
//! ```

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use ee543_client::CancelToken;
use std::path::PathBuf;

mod commands;
mod modes;
mod utils;

use commands::{ConfigCommand, GripperCommand, MoveCommand};
use modes::oneshot::OneShotMode;
use modes::repl::run_shell;

/// EE543 CLI - 舵机机械臂命令行工具
#[derive(Parser, Debug)]
#[command(name = "ee543-cli")]
#[command(about = "Command-line interface for the EE543 servo arm", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// 所有命令共用的参数
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// 配置文件路径（默认 <config_dir>/ee543/config.toml）
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 串口（覆盖配置）
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    /// 波特率（覆盖配置）
    #[arg(short, long, global = true)]
    pub baud: Option<u32>,

    /// 输出所有 crate 的 debug 日志
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 以恒速斜坡移动到目标关节角度
    Move {
        #[command(flatten)]
        args: MoveCommand,
    },

    /// 直接跳到回零位姿（无斜坡）
    Home,

    /// 夹爪控制
    Gripper {
        #[command(subcommand)]
        action: GripperCommand,
    },

    /// 显示启动时的指令位姿
    State {
        /// 以 JSON 输出
        #[arg(long)]
        json: bool,
    },

    /// 列出可用串口
    Ports,

    /// 启动交互式点动 Shell
    Shell {
        /// 每次点动的角度（度）
        #[arg(short, long, default_value_t = 0.5)]
        increment: f64,
    },
}

fn init_tracing(verbose: bool) -> Result<()> {
    let directive = if verbose { "debug" } else { "ee543_cli=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.parse()?),
        )
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose)?;

    // Ctrl+C 只能注册一次：所有模式共用同一个取消令牌
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || {
            eprintln!("\n🛑 收到 Ctrl+C，停止运动...");
            cancel.cancel();
        })?;
    }

    match cli.command {
        Commands::Config(cmd) => cmd.execute(&cli.global),

        Commands::Move { args } => {
            let mut mode = OneShotMode::connect(&cli.global, cancel)?;
            mode.move_to(&args)
        },

        Commands::Home => {
            let mut mode = OneShotMode::connect(&cli.global, cancel)?;
            mode.home()
        },

        Commands::Gripper { action } => {
            let mut mode = OneShotMode::connect(&cli.global, cancel)?;
            mode.gripper(action)
        },

        Commands::State { json } => commands::state::execute(&cli.global, json),

        Commands::Ports => commands::ports::execute(),

        Commands::Shell { increment } => run_shell(&cli.global, cancel, increment),
    }
}
