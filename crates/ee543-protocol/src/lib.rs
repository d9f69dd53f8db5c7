//! # EE543 Protocol
//!
//! 机械臂串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 握手哨兵字节与设备常量
//! - `units`: 关节角度 ↔ 舵机脉宽计数换算
//! - `frame`: 脉宽帧 (`PulseFrame`) 及其线格式编码
//!
//! ## 字节序
//!
//! 每个脉宽值编码为 16 位大端（高字节在前），关节在前，末端执行器通道在最后。

pub mod constants;
pub mod frame;
pub mod units;

// 重新导出常用类型
pub use constants::*;
pub use frame::{PulseFrame, decode, encode};
pub use units::{ServoLimits, angles_to_pulses};

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Invalid payload length: {actual} bytes (must be a non-zero multiple of 2)")]
    InvalidLength { actual: usize },

    #[error("Pulse value {value} exceeds device maximum {max}")]
    PulseOutOfRange { value: u16, max: u16 },

    #[error("Invalid servo limits: {0}")]
    InvalidLimits(String),

    #[error("Unknown sentinel byte: 0x{0:02X}")]
    UnknownSentinel(u8),
}
