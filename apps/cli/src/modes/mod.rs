//! 运行模式
//!
//! 支持两种模式：
//! - One-shot 模式：每次命令独立握手
//! - Shell 模式：保持链路，键盘点动

pub mod oneshot;
pub mod repl;

use crate::GlobalArgs;
use crate::commands::config::resolve;
use anyhow::{Context, Result};
use ee543_client::{ArmController, CancelToken, MotionReport};
use ee543_serial::SerialPortAdapter;

/// 打开串口并完成握手
pub fn connect(
    global: &GlobalArgs,
    cancel: CancelToken,
) -> Result<ArmController<SerialPortAdapter>> {
    let config = resolve(global)?;
    let port = config.link.port.clone();

    println!("🔌 连接到 {} @ {} bps...", port, config.link.baud_rate);
    let adapter = SerialPortAdapter::open(&port, config.link.baud_rate)
        .with_context(|| format!("打开串口失败: {}", port))?;
    let mut arm = ArmController::with_cancel_token(config, adapter, cancel)?;

    arm.open_link().context("握手失败")?;
    println!("✅ 已连接");
    Ok(arm)
}

pub fn print_report(report: &MotionReport) {
    println!(
        "✅ 到达 {}（{} 个周期，发送 {}，丢弃 {}，耗时 {:.2?}）",
        report.final_pose, report.ticks, report.frames_sent, report.frames_skipped, report.elapsed
    );
}
