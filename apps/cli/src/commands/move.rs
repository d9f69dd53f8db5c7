//! 移动命令
//!
//! 目标超出限位时按关节钳位，并提示用户。

use crate::utils::parse_list;
use anyhow::Result;
use clap::Args;
use ee543_client::{ArmConfig, JointVector, SpeedVector};

/// 移动命令参数
#[derive(Args, Debug)]
pub struct MoveCommand {
    /// 目标关节角度（度），逗号分隔
    /// 例如：10,-10,0,5
    #[arg(short, long, allow_hyphen_values = true)]
    pub joints: String,

    /// 关节速度（度/秒）：一个值用于所有关节，或逗号分隔的逐关节速度
    #[arg(short, long)]
    pub speed: Option<String>,
}

impl MoveCommand {
    /// 解析目标
    pub fn goal(&self, config: &ArmConfig) -> Result<JointVector> {
        Ok(JointVector::from(parse_list(&self.joints, config.motion.joint_count)?))
    }

    /// 解析速度，未指定时使用配置的默认速度
    pub fn speed(&self, config: &ArmConfig) -> Result<SpeedVector> {
        let n = config.motion.joint_count;
        match &self.speed {
            None => Ok(config.default_speed()),
            Some(text) if !text.contains(',') => {
                Ok(SpeedVector::splat(parse_list(text, 1)?[0], n))
            },
            Some(text) => Ok(SpeedVector::from(parse_list(text, n)?)),
        }
    }
}
