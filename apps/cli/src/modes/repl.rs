//! Shell 模式（键盘点动）
//!
//! 保持串口链路，逐行读取命令：
//!
//! | 命令 | 作用 |
//! |------|------|
//! | `j<k>+` / `j<k>-` | 关节 k 点动一个增量 |
//! | `goto a,b,c,d` | 斜坡移动到目标 |
//! | `home` | 斜坡回到回零位姿 |
//! | `open` / `close` | 夹爪 |
//! | `speed <dps>` | 设置所有关节速度 |
//! | `state` | 显示指令位姿 |
//! | `metrics` | 显示链路计数 |
//! | `exit` | 退出 |
//!
//! 每次运动前目标都会被钳位到关节限位。Ctrl+C 只中断当前运动，不退出 Shell。

use crate::GlobalArgs;
use crate::modes::{connect, print_report};
use crate::utils::parse_list;
use anyhow::Result;
use ee543_client::{ArmController, CancelToken, JointVector, SpeedVector};
use ee543_serial::SerialPortAdapter;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// Shell 命令
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    /// 关节索引（从 0 开始）和方向
    Jog { joint: usize, positive: bool },
    Goto(Vec<f64>),
    Home,
    Open,
    Close,
    Speed(f64),
    State,
    Metrics,
    Help,
    Exit,
}

impl ShellCommand {
    /// 解析一行输入
    pub fn parse(line: &str, joint_count: usize) -> Result<Self> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (line, ""),
        };

        match head {
            "home" | "h" => Ok(ShellCommand::Home),
            "open" | "o" => Ok(ShellCommand::Open),
            "close" | "c" => Ok(ShellCommand::Close),
            "state" | "s" => Ok(ShellCommand::State),
            "metrics" => Ok(ShellCommand::Metrics),
            "help" | "?" => Ok(ShellCommand::Help),
            "exit" | "quit" | "q" => Ok(ShellCommand::Exit),
            "goto" | "g" => Ok(ShellCommand::Goto(parse_list(rest, joint_count)?)),
            "speed" => {
                let speed: f64 = rest
                    .parse()
                    .map_err(|_| anyhow::anyhow!("无法解析速度: {:?}", rest))?;
                if !speed.is_finite() || speed <= 0.0 {
                    anyhow::bail!("速度必须为正数");
                }
                Ok(ShellCommand::Speed(speed))
            },
            jog if jog.starts_with('j') && rest.is_empty() => Self::parse_jog(jog, joint_count),
            _ => anyhow::bail!("未知命令: {}（输入 help 查看帮助）", line),
        }
    }

    fn parse_jog(token: &str, joint_count: usize) -> Result<Self> {
        let body = &token[1..];
        let (index, positive) = if let Some(index) = body.strip_suffix('+') {
            (index, true)
        } else if let Some(index) = body.strip_suffix('-') {
            (index, false)
        } else {
            anyhow::bail!("点动命令格式: j<k>+ 或 j<k>-");
        };

        let joint: usize = index
            .parse()
            .map_err(|_| anyhow::anyhow!("无效关节编号: {:?}", index))?;
        if joint == 0 || joint > joint_count {
            anyhow::bail!("关节编号必须在 1..={}", joint_count);
        }
        Ok(ShellCommand::Jog {
            joint: joint - 1,
            positive,
        })
    }
}

/// Shell 会话（持有控制器）
pub struct ShellSession {
    arm: ArmController<SerialPortAdapter>,
    speed: SpeedVector,
    increment: f64,
}

impl ShellSession {
    fn execute(&mut self, command: ShellCommand) -> Result<bool> {
        // 上一次 Ctrl+C 只作用于被中断的那次运动
        self.arm.cancel_token().reset();

        match command {
            ShellCommand::Jog { joint, positive } => {
                let mut goal = self.arm.current_state().joint_poses;
                goal[joint] += if positive { self.increment } else { -self.increment };
                self.move_to(goal)?;
            },
            ShellCommand::Goto(values) => self.move_to(JointVector::from(values))?,
            ShellCommand::Home => {
                let goal = self.arm.config().homing_pose();
                self.move_to(goal)?;
            },
            ShellCommand::Open => {
                self.arm.gripper_open()?;
            },
            ShellCommand::Close => {
                self.arm.gripper_close()?;
            },
            ShellCommand::Speed(dps) => {
                self.speed = SpeedVector::splat(dps, self.arm.joint_count());
                println!("速度: {} °/s", dps);
            },
            ShellCommand::State => {
                let state = self.arm.current_state();
                println!(
                    "关节: {}  夹爪: {}",
                    state.joint_poses,
                    if state.gripper_closed { "闭合" } else { "张开" }
                );
            },
            ShellCommand::Metrics => println!("{:?}", self.arm.metrics()),
            ShellCommand::Help => print_help(),
            ShellCommand::Exit => return Ok(false),
        }
        Ok(true)
    }

    fn move_to(&mut self, goal: JointVector) -> Result<()> {
        let goal = self.arm.clamp_goal(&goal);
        let report = self.arm.goto(&goal, &self.speed)?;
        print_report(&report);
        Ok(())
    }
}

fn print_help() {
    println!("命令:");
    println!("  j<k>+ / j<k>-     关节 k 点动");
    println!("  goto a,b,c,d      斜坡移动到目标（度）");
    println!("  home              斜坡回零");
    println!("  open / close      夹爪");
    println!("  speed <dps>       设置速度（度/秒）");
    println!("  state             显示指令位姿");
    println!("  metrics           显示链路计数");
    println!("  exit              退出");
}

/// 运行点动 Shell
pub fn run_shell(global: &GlobalArgs, cancel: CancelToken, increment: f64) -> Result<()> {
    if !increment.is_finite() || increment <= 0.0 {
        anyhow::bail!("点动增量必须为正数");
    }

    let arm = connect(global, cancel)?;
    let speed = arm.config().default_speed();
    let joint_count = arm.joint_count();
    let mut session = ShellSession {
        arm,
        speed,
        increment,
    };

    let mut rl = DefaultEditor::new()?;
    println!("EE543 CLI v{} - 点动 Shell", env!("CARGO_PKG_VERSION"));
    println!("输入 'help' 查看帮助，'exit' 退出");

    loop {
        let line = match rl.readline("ee543> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        if line.trim().is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line.as_str());

        let command = match ShellCommand::parse(&line, joint_count) {
            Ok(command) => command,
            Err(err) => {
                eprintln!("❌ {}", err);
                continue;
            },
        };

        match session.execute(command) {
            Ok(true) => {},
            Ok(false) => break,
            Err(err) => {
                eprintln!("❌ Error: {}", err);
                if !session.arm.is_link_open() {
                    anyhow::bail!("串口链路已断开");
                }
            },
        }
    }

    session.arm.close_link();
    println!("👋 再见！");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_jog() {
        assert_eq!(
            ShellCommand::parse("j1+", 4).unwrap(),
            ShellCommand::Jog {
                joint: 0,
                positive: true
            }
        );
        assert_eq!(
            ShellCommand::parse(" j4- ", 4).unwrap(),
            ShellCommand::Jog {
                joint: 3,
                positive: false
            }
        );
        assert!(ShellCommand::parse("j5+", 4).is_err());
        assert!(ShellCommand::parse("j0+", 4).is_err());
        assert!(ShellCommand::parse("j1", 4).is_err());
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            ShellCommand::parse("goto 10,-10,0,5", 4).unwrap(),
            ShellCommand::Goto(vec![10.0, -10.0, 0.0, 5.0])
        );
        assert_eq!(ShellCommand::parse("speed 40", 4).unwrap(), ShellCommand::Speed(40.0));
        assert_eq!(ShellCommand::parse("home", 4).unwrap(), ShellCommand::Home);
        assert_eq!(ShellCommand::parse("close", 4).unwrap(), ShellCommand::Close);
        assert_eq!(ShellCommand::parse("exit", 4).unwrap(), ShellCommand::Exit);
        assert!(ShellCommand::parse("speed 0", 4).is_err());
        assert!(ShellCommand::parse("goto 1,2", 4).is_err());
        assert!(ShellCommand::parse("dance", 4).is_err());
    }
}
