//! 角度 ↔ 脉宽换算
//!
//! 舵机位置由脉宽计数控制，与关节角度之间是线性仿射关系：
//!
//! ```text
//! pulse = (clamp(angle) - angle_min) * (pulse_max - pulse_min) / (angle_max - angle_min) + pulse_min
//! ```
//!
//! 超出范围的角度会被静默钳位，不会返回错误。
//!
//! # 示例
//!
//! ```rust
//! use ee543_protocol::ServoLimits;
//!
//! let limits = ServoLimits::mg996r();
//! assert_eq!(limits.angle_to_pulse(-90.0), 70);
//! assert_eq!(limits.angle_to_pulse(90.0), 440);
//! assert_eq!(limits.angle_to_pulse(120.0), 440); // 钳位
//! ```

use crate::{PULSE_DEVICE_MAX, ProtocolError};
use smallvec::SmallVec;

/// 单个舵机的机械/电气限位
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ServoLimits {
    /// 最小关节角度（度）
    pub angle_min: f64,
    /// 最大关节角度（度）
    pub angle_max: f64,
    /// 对应 `angle_min` 的脉宽计数
    pub pulse_min: u16,
    /// 对应 `angle_max` 的脉宽计数
    pub pulse_max: u16,
}

impl Default for ServoLimits {
    fn default() -> Self {
        Self::mg996r()
    }
}

impl ServoLimits {
    /// MG996R 舵机参数：-90° ~ +90° 对应 70 ~ 440（4096 计数）
    pub const fn mg996r() -> Self {
        Self {
            angle_min: -90.0,
            angle_max: 90.0,
            pulse_min: 70,
            pulse_max: 440,
        }
    }

    /// 检查限位是否可用于换算
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if !self.angle_min.is_finite() || !self.angle_max.is_finite() {
            return Err(ProtocolError::InvalidLimits(format!(
                "angle range [{}, {}] is not finite",
                self.angle_min, self.angle_max
            )));
        }
        if self.angle_min >= self.angle_max {
            return Err(ProtocolError::InvalidLimits(format!(
                "angle_min ({}) must be less than angle_max ({})",
                self.angle_min, self.angle_max
            )));
        }
        if self.pulse_min >= self.pulse_max {
            return Err(ProtocolError::InvalidLimits(format!(
                "pulse_min ({}) must be less than pulse_max ({})",
                self.pulse_min, self.pulse_max
            )));
        }
        if self.pulse_max > PULSE_DEVICE_MAX {
            return Err(ProtocolError::PulseOutOfRange {
                value: self.pulse_max,
                max: PULSE_DEVICE_MAX,
            });
        }
        Ok(())
    }

    /// 将角度钳位到 `[angle_min, angle_max]`
    ///
    /// NaN 视为 `angle_min`。
    pub fn clamp_angle(&self, angle: f64) -> f64 {
        if angle.is_nan() {
            return self.angle_min;
        }
        angle.clamp(self.angle_min, self.angle_max)
    }

    /// 每个脉宽计数对应的角度（度）
    pub fn degrees_per_pulse(&self) -> f64 {
        (self.angle_max - self.angle_min) / f64::from(self.pulse_max - self.pulse_min)
    }

    /// 角度 → 脉宽计数（截断取整）
    ///
    /// 输出保证落在 `[pulse_min, pulse_max]`。
    pub fn angle_to_pulse(&self, angle: f64) -> u16 {
        let clamped = self.clamp_angle(angle);
        let span = f64::from(self.pulse_max - self.pulse_min);
        let raw = (clamped - self.angle_min) * span / (self.angle_max - self.angle_min)
            + f64::from(self.pulse_min);

        // 截断（值非负，等价于向零取整）
        (raw.trunc() as u16).clamp(self.pulse_min, self.pulse_max)
    }

    /// 脉宽计数 → 角度
    ///
    /// 超出 `[pulse_min, pulse_max]` 的输入先被钳位。
    pub fn pulse_to_angle(&self, pulse: u16) -> f64 {
        let clamped = pulse.clamp(self.pulse_min, self.pulse_max);
        f64::from(clamped - self.pulse_min) * (self.angle_max - self.angle_min)
            / f64::from(self.pulse_max - self.pulse_min)
            + self.angle_min
    }
}

/// 批量换算：每个关节使用自己的限位
///
/// `limits` 与 `angles` 按索引一一对应，多出的部分被忽略。
pub fn angles_to_pulses(limits: &[ServoLimits], angles: &[f64]) -> SmallVec<[u16; 8]> {
    limits
        .iter()
        .zip(angles.iter())
        .map(|(limit, &angle)| limit.angle_to_pulse(angle))
        .collect()
}
