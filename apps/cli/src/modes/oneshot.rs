//! One-shot 模式
//!
//! 每个命令独立执行：
//! 1. 读取配置
//! 2. 打开串口并握手
//! 3. 执行操作
//! 4. 关闭串口

use crate::GlobalArgs;
use crate::commands::{GripperCommand, MoveCommand};
use crate::modes::{connect, print_report};
use anyhow::Result;
use ee543_client::{ArmController, CancelToken};
use ee543_serial::SerialPortAdapter;
use tracing::warn;

/// One-shot 模式
pub struct OneShotMode {
    arm: ArmController<SerialPortAdapter>,
}

impl OneShotMode {
    pub fn connect(global: &GlobalArgs, cancel: CancelToken) -> Result<Self> {
        Ok(Self {
            arm: connect(global, cancel)?,
        })
    }

    /// 移动命令
    pub fn move_to(&mut self, args: &MoveCommand) -> Result<()> {
        let config = self.arm.config().clone();
        let goal = args.goal(&config)?;
        let speed = args.speed(&config)?;

        let clamped = self.arm.clamp_goal(&goal);
        if clamped != goal {
            warn!("Goal {} clamped to {}", goal, clamped);
        }

        println!("⏳ 移动到 {}，速度 {} °/s...", clamped, speed);
        let report = self.arm.goto(&clamped, &speed)?;
        print_report(&report);
        self.finish()
    }

    /// 回零（直接跳变）
    pub fn home(&mut self) -> Result<()> {
        println!("⚠️  回零不做斜坡，舵机将全速运动");
        self.arm.home()?;
        println!("✅ 已回零: {}", self.arm.current_state().joint_poses);
        self.finish()
    }

    /// 夹爪
    pub fn gripper(&mut self, action: GripperCommand) -> Result<()> {
        match action {
            GripperCommand::Open => self.arm.gripper_open()?,
            GripperCommand::Close => self.arm.gripper_close()?,
        };
        println!("✅ 夹爪已{}", if action == GripperCommand::Close { "闭合" } else { "张开" });
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        let metrics = self.arm.metrics();
        if metrics.cycles_skipped > 0 {
            warn!(
                "{} cycle(s) dropped on unexpected bytes from the controller",
                metrics.cycles_skipped
            );
        }
        self.arm.close_link();
        Ok(())
    }
}
