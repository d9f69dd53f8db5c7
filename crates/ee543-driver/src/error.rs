//! 驱动层错误类型定义

use ee543_serial::SerialError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口错误
    #[error("Serial link error: {0}")]
    Serial(#[from] SerialError),

    /// 阻塞等待被取消（Ctrl+C 或调用方主动取消）
    #[error("Operation cancelled")]
    Cancelled,

    /// 链路已关闭，不能再发送
    #[error("Link closed")]
    LinkClosed,

    /// 尚未完成初始握手
    #[error("Link not open (handshake not completed)")]
    NotOpen,

    /// 重复打开
    #[error("Link already open")]
    AlreadyOpen,

    /// 无效输入（如空负载）
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DriverError {
    /// 链路是否已不可用
    ///
    /// 取消、空负载等错误不影响链路本身。
    pub fn is_fatal(&self) -> bool {
        match self {
            DriverError::Serial(e) => e.is_fatal(),
            DriverError::LinkClosed => true,
            DriverError::Cancelled
            | DriverError::NotOpen
            | DriverError::AlreadyOpen
            | DriverError::InvalidInput(_) => false,
        }
    }
}
