//! 驱动层模块
//!
//! 本模块提供 EE543 机械臂串口链路的驱动功能，包括：
//! - 握手状态机（就绪 'I' → 启动 'S' → 每帧等待应答 'A'）
//! - 可取消的阻塞等待（`CancelToken`）
//! - 链路指标（原子计数器）
//!
//! # 使用场景
//!
//! 适用于需要直接发送脉宽帧的场景。
//! 大多数用户应该使用 `ee543-client` 提供的 `ArmController`。

pub mod cancel;
mod error;
pub mod link;
pub mod metrics;

pub use cancel::CancelToken;
pub use error::DriverError;
pub use link::{Link, LinkConfig, LinkState, SendOutcome};
pub use metrics::{LinkMetrics, MetricsSnapshot};
