//! 协议常量定义
//!
//! 握手使用单字节哨兵，不携带其他负载。

/// 舵机驱动板（PCA9685）脉宽计数上限，12 位分辨率
pub const PULSE_DEVICE_MAX: u16 = 4095;

/// 单帧最多支持的关节数（不含末端执行器通道）
pub const MAX_JOINTS: usize = 8;

/// 下位机就绪信号 'I'
pub const SENTINEL_READY: u8 = b'I';

/// 上位机启动信号 'S'
pub const SENTINEL_START: u8 = b'S';

/// 下位机应答信号 'A'
pub const SENTINEL_ACK: u8 = b'A';

/// 握手哨兵字节
///
/// 协议方向：
/// - `Ready` (0x49): 下位机 → 上位机，上电初始化完成
/// - `Start` (0x53): 上位机 → 下位机，开始发送控制帧
/// - `Ack`   (0x41): 下位机 → 上位机，可以接收下一帧
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, num_enum::TryFromPrimitive, num_enum::IntoPrimitive,
)]
#[repr(u8)]
pub enum Sentinel {
    Ready = 0x49,
    Start = 0x53,
    Ack = 0x41,
}

impl Sentinel {
    /// 解析单个字节，未知字节返回 `ProtocolError::UnknownSentinel`
    pub fn parse(byte: u8) -> Result<Self, crate::ProtocolError> {
        Self::try_from(byte).map_err(|e| crate::ProtocolError::UnknownSentinel(e.number))
    }

    pub fn as_byte(self) -> u8 {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_values() {
        assert_eq!(Sentinel::Ready.as_byte(), 0x49);
        assert_eq!(Sentinel::Start.as_byte(), 0x53);
        assert_eq!(Sentinel::Ack.as_byte(), 0x41);
    }

    #[test]
    fn test_sentinel_parse() {
        assert_eq!(Sentinel::parse(b'A').unwrap(), Sentinel::Ack);
        assert_eq!(Sentinel::parse(b'I').unwrap(), Sentinel::Ready);
        assert!(matches!(
            Sentinel::parse(b'x'),
            Err(crate::ProtocolError::UnknownSentinel(b'x'))
        ));
    }
}
