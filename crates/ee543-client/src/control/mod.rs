//! 运动控制模块
//!
//! - `RampPlanner` - 恒速斜坡规划（纯计算，无 IO）
//! - `TickPacer` - 固定周期节拍

pub mod pacer;
pub mod ramp;

pub use pacer::TickPacer;
pub use ramp::{RampPlanner, RampPoses};
