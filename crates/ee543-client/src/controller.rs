//! 机械臂控制器
//!
//! 显式构造、显式持有的控制器对象，拥有串口链路和指令位姿。
//! 同一时刻只有一条轨迹在执行：所有运动方法都需要 `&mut self`。
//!
//! # 示例
//!
//! ```rust,no_run
//! use ee543_client::{ArmConfig, ArmController, JointVector};
//! use ee543_serial::SerialPortAdapter;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ArmConfig::default();
//! let adapter = SerialPortAdapter::open(&config.link.port, config.link.baud_rate)?;
//! let mut arm = ArmController::new(config, adapter)?;
//!
//! arm.open_link()?;
//! arm.home()?;
//! let report = arm.goto_default_speed(&JointVector::from([10.0, -10.0, 0.0, 5.0]))?;
//! println!("reached {} in {} ticks", report.final_pose, report.ticks);
//! arm.gripper_close()?;
//! arm.close_link();
//! # Ok(())
//! # }
//! ```

use crate::config::ArmConfig;
use crate::control::{RampPlanner, TickPacer};
use crate::error::ControlError;
use crate::state::RobotState;
use crate::types::{JointVector, SpeedVector};
use ee543_driver::{CancelToken, DriverError, Link, MetricsSnapshot, SendOutcome};
use ee543_protocol::{PulseFrame, ServoLimits};
use ee543_serial::SerialAdapter;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// 一次 `goto` 的执行结果
#[derive(Debug, Clone, PartialEq)]
pub struct MotionReport {
    /// 执行的控制周期数
    pub ticks: u32,
    /// 被应答并发出的帧数
    pub frames_sent: u32,
    /// 因收到非应答字节而丢弃的周期数
    pub frames_skipped: u32,
    /// 结束时的指令位姿
    pub final_pose: JointVector,
    /// 总耗时
    pub elapsed: Duration,
}

/// 机械臂控制器
pub struct ArmController<A: SerialAdapter> {
    config: ArmConfig,
    limits: Vec<ServoLimits>,
    link: Link<A>,
    state: RobotState,
    cancel: CancelToken,
}

impl<A: SerialAdapter> ArmController<A> {
    /// 创建控制器（不打开链路）
    ///
    /// 初始指令位姿为回零位姿、夹爪张开。
    pub fn new(config: ArmConfig, adapter: A) -> Result<Self, ControlError> {
        Self::with_cancel_token(config, adapter, CancelToken::new())
    }

    /// 使用外部取消令牌创建（例如由 Ctrl+C 处理器持有）
    pub fn with_cancel_token(
        config: ArmConfig,
        adapter: A,
        cancel: CancelToken,
    ) -> Result<Self, ControlError> {
        config.validate()?;
        let limits = config.joint_limits();
        let state = RobotState::new(config.homing_pose());
        let link = Link::new(adapter, config.link_config(), cancel.clone());

        Ok(Self {
            config,
            limits,
            link,
            state,
            cancel,
        })
    }

    pub fn config(&self) -> &ArmConfig {
        &self.config
    }

    pub fn joint_count(&self) -> usize {
        self.limits.len()
    }

    /// 执行初始握手
    pub fn open_link(&mut self) -> Result<(), ControlError> {
        info!("Opening link on {}", self.config.link.port);
        self.link.open().map_err(map_driver_error)
    }

    /// 关闭链路（幂等，关闭后不能重新打开）
    pub fn close_link(&mut self) {
        self.link.close();
    }

    pub fn is_link_open(&self) -> bool {
        self.link.is_open()
    }

    /// 指令位姿快照
    pub fn current_state(&self) -> RobotState {
        self.state.clone()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.link.metrics().snapshot()
    }

    /// 将目标钳位到各关节限位
    pub fn clamp_goal(&self, goal: &JointVector) -> JointVector {
        goal.iter()
            .zip(self.limits.iter())
            .map(|(&angle, limits)| limits.clamp_angle(angle))
            .collect()
    }

    /// 直接跳到回零位姿
    ///
    /// ⚠️ 不做斜坡：舵机会以最快速度运动。需要平滑回零请用
    /// `goto(&config.homing_pose(), ..)`。
    pub fn home(&mut self) -> Result<SendOutcome, ControlError> {
        self.state.joint_poses = self.config.homing_pose();
        self.state.gripper_closed = false;
        info!("Homing to {}", self.state.joint_poses);
        let pose = self.state.joint_poses.clone();
        self.transmit(&pose)
    }

    /// 张开夹爪（关节位姿不变）
    pub fn gripper_open(&mut self) -> Result<SendOutcome, ControlError> {
        self.set_gripper(false)
    }

    /// 闭合夹爪（关节位姿不变）
    pub fn gripper_close(&mut self) -> Result<SendOutcome, ControlError> {
        self.set_gripper(true)
    }

    fn set_gripper(&mut self, closed: bool) -> Result<SendOutcome, ControlError> {
        self.state.gripper_closed = closed;
        debug!("Gripper {}", if closed { "close" } else { "open" });
        let pose = self.state.joint_poses.clone();
        self.transmit(&pose)
    }

    /// 以默认速度移动到目标
    pub fn goto_default_speed(&mut self, goal: &JointVector) -> Result<MotionReport, ControlError> {
        let speed = self.config.default_speed();
        self.goto(goal, &speed)
    }

    /// 恒速斜坡移动到目标
    ///
    /// 每个周期：计算候选位姿 → 检查取消 → 等待应答并发送 →
    /// 发送成功才提交位姿 → 到位判定 → 睡眠到周期结束。
    ///
    /// 至少执行一个周期，即使目标与当前位姿相同。
    ///
    /// # 错误
    ///
    /// - `ControlError::DimensionMismatch`: 向量长度与关节数不符
    /// - `ControlError::Cancelled`: 被取消，位姿保持最后一次被应答的值
    /// - `ControlError::Driver`: 链路故障
    pub fn goto(
        &mut self,
        goal: &JointVector,
        speed: &SpeedVector,
    ) -> Result<MotionReport, ControlError> {
        let planner = RampPlanner::new(
            &self.state.joint_poses,
            goal,
            speed,
            self.config.motion.control_rate_hz,
            &self.limits,
        )?;
        let tolerance = self.config.motion.tolerance_deg;
        let mut pacer = TickPacer::new(self.config.control_period());

        debug!(
            "goto {} -> {} (step {})",
            planner.start(),
            planner.goal(),
            planner.step()
        );

        let started = Instant::now();
        let mut ticks = 0u32;
        let mut frames_sent = 0u32;
        let mut frames_skipped = 0u32;

        loop {
            pacer.begin();
            let candidate = planner.advance(&self.state.joint_poses);

            if self.cancel.is_cancelled() {
                info!("goto cancelled at {}", self.state.joint_poses);
                return Err(ControlError::Cancelled);
            }

            let outcome = self.transmit(&candidate)?;
            ticks += 1;
            match outcome {
                SendOutcome::Sent => {
                    self.state.joint_poses = candidate;
                    frames_sent += 1;
                },
                SendOutcome::Skipped { .. } => frames_skipped += 1,
            }
            trace!("tick {}: {}", ticks, self.state.joint_poses);

            if planner.reached(&self.state.joint_poses, tolerance) {
                break;
            }
            pacer.finish();
        }

        let report = MotionReport {
            ticks,
            frames_sent,
            frames_skipped,
            final_pose: self.state.joint_poses.clone(),
            elapsed: started.elapsed(),
        };
        debug!(
            "goto finished: {} ticks, {} sent, {} skipped, {} overruns, {:?}",
            report.ticks,
            report.frames_sent,
            report.frames_skipped,
            pacer.overruns(),
            report.elapsed
        );
        Ok(report)
    }

    /// 将位姿和当前夹爪状态编码为一帧并发送
    fn transmit(&mut self, pose: &JointVector) -> Result<SendOutcome, ControlError> {
        if pose.len() != self.limits.len() {
            return Err(ControlError::DimensionMismatch {
                expected: self.limits.len(),
                actual: pose.len(),
            });
        }
        let gripper = if self.state.gripper_closed {
            self.config.gripper.pulse_close
        } else {
            self.config.gripper.pulse_open
        };
        let frame = PulseFrame::from_angles(&self.limits, pose.as_slice(), gripper)?;
        self.link.send_frame(&frame).map_err(map_driver_error)
    }
}

fn map_driver_error(error: DriverError) -> ControlError {
    match error {
        DriverError::Cancelled => ControlError::Cancelled,
        other => ControlError::Driver(other),
    }
}
