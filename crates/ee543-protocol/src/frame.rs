//! 脉宽帧与线格式编码
//!
//! 一帧包含 N 个关节脉宽 + 1 个末端执行器（夹爪）通道，
//! 每个值编码为 2 字节大端，总长度 `2 * (N + 1)`：
//!
//! ```text
//! J1_H J1_L J2_H J2_L ... JN_H JN_L G_H G_L
//! ```
//!
//! 12 位的脉宽值不会用满高字节，这是下位机固件约定的格式。

use crate::{MAX_JOINTS, PULSE_DEVICE_MAX, ProtocolError, ServoLimits, units::angles_to_pulses};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use smallvec::SmallVec;

/// 将脉宽序列编码为大端字节流
///
/// 输出长度恰好为 `2 * pulses.len()`。
pub fn encode(pulses: &[u16]) -> Bytes {
    let mut buf = BytesMut::with_capacity(pulses.len() * 2);
    for &pulse in pulses {
        buf.put_u16(pulse);
    }
    buf.freeze()
}

/// 将大端字节流解码为脉宽序列
///
/// 控制链路是单向的，上位机本身不需要解码；
/// 此函数供下位机仿真和测试使用。
pub fn decode(bytes: &[u8]) -> Result<SmallVec<[u16; 9]>, ProtocolError> {
    if bytes.is_empty() || bytes.len() % 2 != 0 {
        return Err(ProtocolError::InvalidLength {
            actual: bytes.len(),
        });
    }

    let mut buf = bytes;
    let mut pulses = SmallVec::with_capacity(bytes.len() / 2);
    while buf.has_remaining() {
        pulses.push(buf.get_u16());
    }
    Ok(pulses)
}

/// 一个控制周期发送给下位机的完整脉宽帧
///
/// 不变量：所有值都在 `[0, PULSE_DEVICE_MAX]` 内，且至少包含夹爪通道。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PulseFrame {
    /// 关节脉宽，末尾追加夹爪通道
    pulses: SmallVec<[u16; 9]>,
}

impl PulseFrame {
    /// 由关节脉宽和夹爪脉宽构建帧
    ///
    /// # 错误
    ///
    /// - 任一值超过 `PULSE_DEVICE_MAX`
    /// - 关节数超过 `MAX_JOINTS`
    pub fn new(joint_pulses: &[u16], gripper_pulse: u16) -> Result<Self, ProtocolError> {
        if joint_pulses.len() > MAX_JOINTS {
            return Err(ProtocolError::InvalidLength {
                actual: (joint_pulses.len() + 1) * 2,
            });
        }

        let mut pulses: SmallVec<[u16; 9]> = SmallVec::with_capacity(joint_pulses.len() + 1);
        for &value in joint_pulses.iter().chain(std::iter::once(&gripper_pulse)) {
            if value > PULSE_DEVICE_MAX {
                return Err(ProtocolError::PulseOutOfRange {
                    value,
                    max: PULSE_DEVICE_MAX,
                });
            }
            pulses.push(value);
        }

        Ok(Self { pulses })
    }

    /// 由关节角度构建帧（经过 `ServoLimits` 钳位和换算）
    pub fn from_angles(
        limits: &[ServoLimits],
        angles: &[f64],
        gripper_pulse: u16,
    ) -> Result<Self, ProtocolError> {
        let joint_pulses = angles_to_pulses(limits, angles);
        Self::new(&joint_pulses, gripper_pulse)
    }

    /// 解析完整帧（最后一个值为夹爪通道）
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let pulses = decode(bytes)?;
        let (gripper, joints) = pulses
            .split_last()
            .ok_or(ProtocolError::InvalidLength { actual: 0 })?;
        Self::new(joints, *gripper)
    }

    /// 关节脉宽（不含夹爪通道）
    pub fn joint_pulses(&self) -> &[u16] {
        &self.pulses[..self.pulses.len() - 1]
    }

    /// 夹爪通道脉宽
    pub fn gripper_pulse(&self) -> u16 {
        self.pulses[self.pulses.len() - 1]
    }

    /// 全部通道（关节 + 夹爪）
    pub fn as_slice(&self) -> &[u16] {
        &self.pulses
    }

    /// 关节数 N
    pub fn joint_count(&self) -> usize {
        self.pulses.len() - 1
    }

    /// 编码后的字节数 `2 * (N + 1)`
    pub fn encoded_len(&self) -> usize {
        self.pulses.len() * 2
    }

    /// 编码为线格式
    pub fn encode(&self) -> Bytes {
        encode(&self.pulses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_big_endian() {
        let bytes = encode(&[255, 440, 70, 0, 4095]);
        assert_eq!(
            bytes.as_ref(),
            &[0x00, 0xFF, 0x01, 0xB8, 0x00, 0x46, 0x00, 0x00, 0x0F, 0xFF]
        );
    }

    #[test]
    fn test_encode_empty() {
        assert!(encode(&[]).is_empty());
    }

    #[test]
    fn test_decode_invalid_length() {
        assert_eq!(decode(&[]), Err(ProtocolError::InvalidLength { actual: 0 }));
        assert_eq!(
            decode(&[0x01, 0x02, 0x03]),
            Err(ProtocolError::InvalidLength { actual: 3 })
        );
    }

    #[test]
    fn test_frame_layout() {
        let frame = PulseFrame::new(&[255, 255, 255, 255], 4095).unwrap();
        assert_eq!(frame.joint_count(), 4);
        assert_eq!(frame.joint_pulses(), &[255, 255, 255, 255]);
        assert_eq!(frame.gripper_pulse(), 4095);
        assert_eq!(frame.encoded_len(), 10);
        assert_eq!(frame.encode().len(), 10);
    }

    #[test]
    fn test_frame_rejects_out_of_range() {
        assert_eq!(
            PulseFrame::new(&[255, 4096], 0),
            Err(ProtocolError::PulseOutOfRange {
                value: 4096,
                max: PULSE_DEVICE_MAX
            })
        );
        assert!(PulseFrame::new(&[255], 5000).is_err());
    }

    #[test]
    fn test_frame_rejects_too_many_joints() {
        let joints = [255u16; MAX_JOINTS + 1];
        assert!(matches!(
            PulseFrame::new(&joints, 0),
            Err(ProtocolError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_frame_from_angles() {
        let limits = [ServoLimits::mg996r(); 4];
        let frame = PulseFrame::from_angles(&limits, &[0.0, -90.0, 90.0, 200.0], 0).unwrap();
        assert_eq!(frame.joint_pulses(), &[255, 70, 440, 440]);
        assert_eq!(frame.gripper_pulse(), 0);
    }

    #[test]
    fn test_frame_from_bytes() {
        let original = PulseFrame::new(&[70, 255, 440, 300, 100], 4095).unwrap();
        let parsed = PulseFrame::from_bytes(&original.encode()).unwrap();
        assert_eq!(parsed, original);
        assert_eq!(parsed.joint_count(), 5);
    }

    proptest! {
        #[test]
        fn prop_encode_len_and_decode(pulses in proptest::collection::vec(0u16..=4095, 1..10)) {
            let bytes = encode(&pulses);
            prop_assert_eq!(bytes.len(), 2 * pulses.len());
            for (i, pair) in bytes.chunks(2).enumerate() {
                prop_assert_eq!(pair[0], 0x0F & pair[0]);
                prop_assert_eq!(u16::from_be_bytes([pair[0], pair[1]]), pulses[i]);
            }
        }
    }
}
