//! # EE543 Client
//!
//! EE543 舵机机械臂的关节空间运动控制。
//!
//! 分层：
//!
//! ```text
//! ArmController  (本 crate：位姿状态、斜坡规划、节拍)
//!      │
//!   Link         (ee543-driver：'I'/'S'/'A' 握手)
//!      │
//! SerialAdapter  (ee543-serial：真实串口或 MockSerial)
//! ```
//!
//! 下位机不回传位置，[`RobotState`] 记录的是最后一次被应答的指令位姿。
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use ee543_client::{ArmConfig, ArmController, JointVector, SpeedVector};
//! use ee543_serial::SerialPortAdapter;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ArmConfig::default();
//! let adapter = SerialPortAdapter::open(&config.link.port, config.link.baud_rate)?;
//! let mut arm = ArmController::new(config, adapter)?;
//! arm.open_link()?;
//! arm.goto(
//!     &JointVector::from([10.0, -10.0, 0.0, 5.0]),
//!     &SpeedVector::splat(80.0, 4),
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod control;
mod controller;
mod error;
mod state;
pub mod types;

pub use config::{ArmConfig, ConfigError, GripperSettings, LinkSettings, MotionSettings};
pub use controller::{ArmController, MotionReport};
pub use error::ControlError;
pub use state::RobotState;
pub use types::{JointVec, JointVector, SpeedVector};

// 常用的下层类型
pub use ee543_driver::{CancelToken, MetricsSnapshot, SendOutcome};
pub use ee543_protocol::ServoLimits;
