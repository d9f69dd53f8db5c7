//! 机械臂配置
//!
//! TOML 格式，所有字段都有默认值，空文件即为默认配置：
//!
//! ```toml
//! [link]
//! port = "/dev/ttyACM0"
//! baud_rate = 115200
//!
//! [motion]
//! joint_count = 4
//! control_rate_hz = 30.0
//! tolerance_deg = 0.01
//!
//! [servo]
//! angle_min = -90.0
//! angle_max = 90.0
//! pulse_min = 70
//! pulse_max = 440
//!
//! [gripper]
//! pulse_open = 0
//! pulse_close = 4095
//! ```
//!
//! 如需逐关节限位，写 `joint_count` 个 `[[joint]]` 表覆盖 `[servo]`。

use crate::types::JointVector;
use ee543_driver::LinkConfig;
use ee543_protocol::{MAX_JOINTS, PULSE_DEVICE_MAX, ServoLimits};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 串口链路设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    /// 串口名（如 `/dev/ttyACM0`、`COM3`）
    pub port: String,
    pub baud_rate: u32,
    /// 打开串口后等待 Arduino 复位的时间
    pub reset_delay_ms: u64,
    /// 发送 'S' 之后的稳定时间
    pub settle_delay_ms: u64,
    /// 等待下位机字节的轮询粒度
    pub poll_interval_ms: u64,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 115_200,
            reset_delay_ms: 1000,
            settle_delay_ms: 100,
            poll_interval_ms: 2,
        }
    }
}

/// 运动设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionSettings {
    /// 关节数 N（不含夹爪）
    pub joint_count: usize,
    /// 控制频率（Hz）
    pub control_rate_hz: f64,
    /// 到位判定容差（度）
    pub tolerance_deg: f64,
    /// 回零位姿；缺省为 N 个 0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homing_pose: Option<Vec<f64>>,
    /// 未指定速度时使用的关节速度（度/秒）
    pub default_speed_dps: f64,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            joint_count: 4,
            control_rate_hz: 30.0,
            tolerance_deg: 0.01,
            homing_pose: None,
            default_speed_dps: 80.0,
        }
    }
}

/// 夹爪脉宽常量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GripperSettings {
    pub pulse_open: u16,
    pub pulse_close: u16,
}

impl Default for GripperSettings {
    fn default() -> Self {
        Self {
            pulse_open: 0,
            pulse_close: PULSE_DEVICE_MAX,
        }
    }
}

/// 完整配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmConfig {
    pub link: LinkSettings,
    pub motion: MotionSettings,
    /// 所有关节共用的舵机限位
    pub servo: ServoLimits,
    /// 逐关节覆盖（为空时使用 `servo`）
    #[serde(rename = "joint", skip_serializing_if = "Vec::is_empty")]
    pub joints: Vec<ServoLimits>,
    pub gripper: GripperSettings,
}

impl ArmConfig {
    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ArmConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载并校验
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 保存到文件（自动创建父目录）
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// 校验配置
    ///
    /// 越界的目标角度和速度不在这里处理（运行时钳位），
    /// 这里只拒绝无法换算或无法控制的参数。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = self.motion.joint_count;
        if n == 0 || n > MAX_JOINTS {
            return Err(ConfigError::Invalid(format!(
                "joint_count must be in 1..={}, got {}",
                MAX_JOINTS, n
            )));
        }

        let rate = self.motion.control_rate_hz;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "control_rate_hz must be positive, got {}",
                rate
            )));
        }
        if Duration::try_from_secs_f64(1.0 / rate).is_err() {
            return Err(ConfigError::Invalid(format!(
                "control_rate_hz {} gives a control period out of range",
                rate
            )));
        }

        let tolerance = self.motion.tolerance_deg;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "tolerance_deg must be non-negative, got {}",
                tolerance
            )));
        }

        if let Some(pose) = &self.motion.homing_pose {
            if pose.len() != n {
                return Err(ConfigError::Invalid(format!(
                    "homing_pose has {} values, expected {}",
                    pose.len(),
                    n
                )));
            }
            if pose.iter().any(|v| !v.is_finite()) {
                return Err(ConfigError::Invalid("homing_pose must be finite".to_string()));
            }
        }

        self.servo
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("[servo]: {}", e)))?;

        if !self.joints.is_empty() {
            if self.joints.len() != n {
                return Err(ConfigError::Invalid(format!(
                    "{} [[joint]] entries, expected {}",
                    self.joints.len(),
                    n
                )));
            }
            for (i, limits) in self.joints.iter().enumerate() {
                limits
                    .validate()
                    .map_err(|e| ConfigError::Invalid(format!("[[joint]] #{}: {}", i + 1, e)))?;
            }
        }

        if self.gripper.pulse_open > PULSE_DEVICE_MAX || self.gripper.pulse_close > PULSE_DEVICE_MAX
        {
            return Err(ConfigError::Invalid(format!(
                "gripper pulses must be <= {}",
                PULSE_DEVICE_MAX
            )));
        }

        if self.link.port.is_empty() {
            return Err(ConfigError::Invalid("link.port is empty".to_string()));
        }
        if self.link.baud_rate == 0 {
            return Err(ConfigError::Invalid("link.baud_rate must be non-zero".to_string()));
        }

        Ok(())
    }

    /// 每个关节的限位（长度 N）
    pub fn joint_limits(&self) -> Vec<ServoLimits> {
        if self.joints.is_empty() {
            vec![self.servo; self.motion.joint_count]
        } else {
            self.joints.clone()
        }
    }

    /// 回零位姿（长度 N）
    pub fn homing_pose(&self) -> JointVector {
        match &self.motion.homing_pose {
            Some(pose) => JointVector::from(pose.as_slice()),
            None => JointVector::zeros(self.motion.joint_count),
        }
    }

    /// 所有关节使用默认速度
    pub fn default_speed(&self) -> crate::SpeedVector {
        crate::SpeedVector::splat(self.motion.default_speed_dps, self.motion.joint_count)
    }

    /// 控制周期
    ///
    /// 未经 [`validate`](Self::validate) 的频率若无法换算，返回 `Duration::MAX`。
    pub fn control_period(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.motion.control_rate_hz).unwrap_or(Duration::MAX)
    }

    /// 换算为驱动层时序
    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            reset_delay: Duration::from_millis(self.link.reset_delay_ms),
            settle_delay: Duration::from_millis(self.link.settle_delay_ms),
            poll_interval: Duration::from_millis(self.link.poll_interval_ms.max(1)),
        }
    }
}
