//! # EE543 Serial Adapter Layer
//!
//! 串口硬件抽象层，为握手协议提供统一的字节流接口。
//!
//! - `port`: 基于 `serialport` 的真实串口（feature `hardware`）
//! - `mock`: 脚本化的内存下位机（feature `mock`，测试使用）

use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "hardware")]
pub mod port;

#[cfg(feature = "hardware")]
pub use port::{SerialPortAdapter, available_ports};

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockEvent, MockPeer, MockSerial};

/// 串口适配层统一错误类型
#[derive(Error, Debug)]
pub enum SerialError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] SerialDeviceError),
    #[error("Write timeout")]
    Timeout,
    #[error("Serial device disconnected")]
    Disconnected,
    #[error("Serial port already closed")]
    Closed,
}

impl SerialError {
    /// 是否为不可恢复的链路错误（需要重新打开串口）
    pub fn is_fatal(&self) -> bool {
        match self {
            SerialError::Device(e) => e.is_fatal(),
            SerialError::Disconnected | SerialError::Closed => true,
            SerialError::Io(_) | SerialError::Timeout => false,
        }
    }
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialDeviceErrorKind {
    Unknown,
    NotFound,
    NoDevice,
    AccessDenied,
    InvalidConfig,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct SerialDeviceError {
    pub kind: SerialDeviceErrorKind,
    pub message: String,
}

impl SerialDeviceError {
    pub fn new(kind: SerialDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            SerialDeviceErrorKind::NoDevice
                | SerialDeviceErrorKind::AccessDenied
                | SerialDeviceErrorKind::NotFound
        )
    }
}

impl From<String> for SerialDeviceError {
    fn from(message: String) -> Self {
        Self::new(SerialDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for SerialDeviceError {
    fn from(message: &str) -> Self {
        Self::new(SerialDeviceErrorKind::Unknown, message)
    }
}

/// 半双工字节流适配器
///
/// 握手协议只需要以下原语：
/// - 查询可读字节数（非阻塞）
/// - 带超时读取单字节（有界阻塞）
/// - 整块写入 + flush
/// - 清空收发缓冲
pub trait SerialAdapter {
    /// 当前输入缓冲中可读的字节数
    fn bytes_to_read(&mut self) -> Result<u32, SerialError>;

    /// 读取一个字节，最多阻塞 `timeout`
    ///
    /// 超时返回 `Ok(None)`；`Duration::ZERO` 表示仅检查缓冲。
    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>, SerialError>;

    /// 写入全部字节
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError>;

    /// 刷新输出缓冲
    fn flush(&mut self) -> Result<(), SerialError>;

    /// 丢弃收发缓冲中尚未处理的数据
    fn clear_buffers(&mut self) -> Result<(), SerialError>;

    /// 非阻塞读取
    fn try_read_byte(&mut self) -> Result<Option<u8>, SerialError> {
        if self.bytes_to_read()? == 0 {
            return Ok(None);
        }
        self.read_byte(Duration::ZERO)
    }
}

impl<T: SerialAdapter + ?Sized> SerialAdapter for Box<T> {
    fn bytes_to_read(&mut self) -> Result<u32, SerialError> {
        (**self).bytes_to_read()
    }

    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>, SerialError> {
        (**self).read_byte(timeout)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        (**self).write_all(bytes)
    }

    fn flush(&mut self) -> Result<(), SerialError> {
        (**self).flush()
    }

    fn clear_buffers(&mut self) -> Result<(), SerialError> {
        (**self).clear_buffers()
    }
}
