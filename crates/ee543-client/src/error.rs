//! 控制层错误类型

use crate::config::ConfigError;
use ee543_driver::DriverError;
use ee543_protocol::ProtocolError;
use thiserror::Error;

/// 控制层错误
///
/// 越界角度、越界速度和被丢弃的周期都不是错误，
/// 只能通过 [`crate::RobotState`]、[`crate::MotionReport`] 或日志观察。
#[derive(Error, Debug)]
pub enum ControlError {
    /// 链路/串口错误
    #[error("Link error: {0}")]
    Driver(#[from] DriverError),

    /// 帧构建失败
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 配置错误
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 目标或速度向量长度与关节数不符
    #[error("Dimension mismatch: expected {expected} joints, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// 运动被取消
    #[error("Motion cancelled")]
    Cancelled,
}

impl ControlError {
    /// 是否为链路故障（需要重新连接）
    pub fn is_link_failure(&self) -> bool {
        match self {
            ControlError::Driver(e) => e.is_fatal() || matches!(e, DriverError::NotOpen),
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ControlError::Cancelled | ControlError::Driver(DriverError::Cancelled)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ee543_serial::SerialError;

    #[test]
    fn test_link_failure_classification() {
        let err: ControlError = DriverError::Serial(SerialError::Disconnected).into();
        assert!(err.is_link_failure());
        assert!(!err.is_cancelled());

        let err: ControlError = DriverError::NotOpen.into();
        assert!(err.is_link_failure());

        assert!(!ControlError::Cancelled.is_link_failure());
        assert!(ControlError::Cancelled.is_cancelled());
        assert!(ControlError::from(DriverError::Cancelled).is_cancelled());
    }

    #[test]
    fn test_display() {
        let err = ControlError::DimensionMismatch {
            expected: 4,
            actual: 3,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 4 joints, got 3");
    }
}
