//! 机械臂状态
//!
//! 上位机唯一的运动状态来源：下位机不回传位置，
//! 这里记录的是最后一次被应答并发出的指令位姿。

use crate::types::JointVector;
use serde::{Deserialize, Serialize};

/// 指令位姿快照
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct RobotState {
    /// 各关节角度（度）
    pub joint_poses: JointVector,
    /// 夹爪是否闭合
    pub gripper_closed: bool,
}

impl RobotState {
    /// 以给定位姿、夹爪张开创建
    pub fn new(joint_poses: JointVector) -> Self {
        Self {
            joint_poses,
            gripper_closed: false,
        }
    }

    pub fn joint_count(&self) -> usize {
        self.joint_poses.len()
    }
}
