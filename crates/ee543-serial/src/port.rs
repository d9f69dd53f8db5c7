//! 基于 `serialport` 的串口适配器
//!
//! 下位机（Arduino + PCA9685）通过 USB-CDC 直连，默认 115200 bps。

use crate::{SerialAdapter, SerialDeviceError, SerialDeviceErrorKind, SerialError};
use serialport::{ClearBuffer, SerialPort};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::{debug, trace};

/// 默认读超时（仅在未显式指定时使用）
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10);

/// 真实串口
pub struct SerialPortAdapter {
    port: Box<dyn SerialPort>,
    name: String,
    /// 当前生效的读超时，避免每次读取都重新设置
    read_timeout: Duration,
}

impl SerialPortAdapter {
    /// 打开串口（8N1，无流控）
    ///
    /// # 错误
    ///
    /// - `SerialError::Device`: 设备不存在、无权限或参数非法
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self, SerialError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(DEFAULT_READ_TIMEOUT)
            .open()
            .map_err(|e| SerialError::Device(map_serialport_error(port_name, e)))?;

        debug!("Opened serial port {} @ {} bps", port_name, baud_rate);

        Ok(Self {
            port,
            name: port_name.to_string(),
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    /// 串口名称（如 `/dev/ttyACM0`、`COM3`）
    pub fn name(&self) -> &str {
        &self.name
    }

    fn ensure_timeout(&mut self, timeout: Duration) -> Result<(), SerialError> {
        // serialport 不接受 0 超时作为"立即返回"，最少 1ms
        let timeout = timeout.max(Duration::from_millis(1));
        if timeout != self.read_timeout {
            self.port
                .set_timeout(timeout)
                .map_err(|e| SerialError::Device(map_serialport_error(&self.name, e)))?;
            self.read_timeout = timeout;
        }
        Ok(())
    }
}

impl SerialAdapter for SerialPortAdapter {
    fn bytes_to_read(&mut self) -> Result<u32, SerialError> {
        self.port
            .bytes_to_read()
            .map_err(|e| SerialError::Device(map_serialport_error(&self.name, e)))
    }

    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>, SerialError> {
        self.ensure_timeout(timeout)?;

        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(1) => {
                trace!("RX 0x{:02X}", buf[0]);
                Ok(Some(buf[0]))
            },
            // 0 字节读取意味着对端已关闭（USB 拔出）
            Ok(_) => Err(SerialError::Disconnected),
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                Ok(None)
            },
            Err(e) if is_disconnect(e.kind()) => Err(SerialError::Disconnected),
            Err(e) => Err(SerialError::Io(e)),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        match self.port.write_all(bytes) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::TimedOut => Err(SerialError::Timeout),
            Err(e) if is_disconnect(e.kind()) => Err(SerialError::Disconnected),
            Err(e) => Err(SerialError::Io(e)),
        }
    }

    fn flush(&mut self) -> Result<(), SerialError> {
        self.port.flush().map_err(|e| {
            if is_disconnect(e.kind()) {
                SerialError::Disconnected
            } else {
                SerialError::Io(e)
            }
        })
    }

    fn clear_buffers(&mut self) -> Result<(), SerialError> {
        self.port
            .clear(ClearBuffer::All)
            .map_err(|e| SerialError::Device(map_serialport_error(&self.name, e)))
    }
}

impl Drop for SerialPortAdapter {
    fn drop(&mut self) {
        debug!("Closing serial port {}", self.name);
    }
}

/// 枚举系统中可用的串口
pub fn available_ports() -> Result<Vec<String>, SerialError> {
    serialport::available_ports()
        .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
        .map_err(|e| SerialError::Device(map_serialport_error("<enumerate>", e)))
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
            | ErrorKind::NotConnected
            | ErrorKind::ConnectionReset
    )
}

fn map_serialport_error(port_name: &str, error: serialport::Error) -> SerialDeviceError {
    let kind = match error.kind() {
        serialport::ErrorKind::NoDevice => SerialDeviceErrorKind::NoDevice,
        serialport::ErrorKind::InvalidInput => SerialDeviceErrorKind::InvalidConfig,
        serialport::ErrorKind::Io(ErrorKind::NotFound) => SerialDeviceErrorKind::NotFound,
        serialport::ErrorKind::Io(ErrorKind::PermissionDenied) => {
            SerialDeviceErrorKind::AccessDenied
        },
        serialport::ErrorKind::Io(_) => SerialDeviceErrorKind::Backend,
        _ => SerialDeviceErrorKind::Unknown,
    };
    SerialDeviceError::new(kind, format!("{}: {}", port_name, error.description))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_serialport_error_kinds() {
        let err = serialport::Error::new(serialport::ErrorKind::NoDevice, "busy");
        let mapped = map_serialport_error("/dev/ttyACM0", err);
        assert_eq!(mapped.kind, SerialDeviceErrorKind::NoDevice);
        assert!(mapped.is_fatal());
        assert!(mapped.message.contains("/dev/ttyACM0"));

        let err = serialport::Error::new(
            serialport::ErrorKind::Io(ErrorKind::PermissionDenied),
            "denied",
        );
        assert_eq!(
            map_serialport_error("COM3", err).kind,
            SerialDeviceErrorKind::AccessDenied
        );

        let err = serialport::Error::new(serialport::ErrorKind::InvalidInput, "bad baud");
        assert_eq!(
            map_serialport_error("COM3", err).kind,
            SerialDeviceErrorKind::InvalidConfig
        );
    }

    #[test]
    fn test_open_missing_port_fails() {
        let result = SerialPortAdapter::open("/dev/ee543-does-not-exist", 115_200);
        assert!(matches!(result, Err(SerialError::Device(_))));
    }

    #[test]
    fn test_is_disconnect() {
        assert!(is_disconnect(ErrorKind::BrokenPipe));
        assert!(!is_disconnect(ErrorKind::TimedOut));
    }
}
