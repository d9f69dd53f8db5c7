//! 链路指标模块
//!
//! 原子计数器，用于观察握手链路的健康状态。
//! 被丢弃的周期（收到非 'A' 字节）不会返回错误，只能通过这里或日志观察到。

use std::sync::atomic::{AtomicU64, Ordering};

/// 链路实时指标
///
/// # 使用示例
///
/// ```rust
/// use ee543_driver::LinkMetrics;
/// use std::sync::Arc;
/// use std::sync::atomic::Ordering;
///
/// let metrics = Arc::new(LinkMetrics::default());
/// metrics.frames_sent.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.frames_sent, 1);
/// ```
#[derive(Debug, Default)]
pub struct LinkMetrics {
    /// 成功发送的帧数
    pub frames_sent: AtomicU64,

    /// 发送的负载字节数（不含握手字节）
    pub bytes_sent: AtomicU64,

    /// 收到的应答 'A' 数
    pub acks_received: AtomicU64,

    /// 因收到非应答字节而丢弃的周期数
    ///
    /// 如果这个值持续增长，说明上下位机失步。
    pub cycles_skipped: AtomicU64,

    /// 等待就绪 'I' 时丢弃的杂散字节数
    pub ready_bytes_discarded: AtomicU64,

    /// 应答轮询中超时（无数据）的轮询次数
    pub ack_poll_timeouts: AtomicU64,
}

impl LinkMetrics {
    /// 创建新的指标实例（所有计数器初始化为 0）
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            acks_received: self.acks_received.load(Ordering::Relaxed),
            cycles_skipped: self.cycles_skipped.load(Ordering::Relaxed),
            ready_bytes_discarded: self.ready_bytes_discarded.load(Ordering::Relaxed),
            ack_poll_timeouts: self.ack_poll_timeouts.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.frames_sent.store(0, Ordering::Relaxed);
        self.bytes_sent.store(0, Ordering::Relaxed);
        self.acks_received.store(0, Ordering::Relaxed);
        self.cycles_skipped.store(0, Ordering::Relaxed);
        self.ready_bytes_discarded.store(0, Ordering::Relaxed);
        self.ack_poll_timeouts.store(0, Ordering::Relaxed);
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub acks_received: u64,
    pub cycles_skipped: u64,
    pub ready_bytes_discarded: u64,
    pub ack_poll_timeouts: u64,
}
