//! 协作式取消令牌
//!
//! 握手中的两处阻塞等待（初始 'I'、每帧 'A'）没有超时，
//! 由令牌在每个轮询间隔检查一次，使 Ctrl+C 能干净地退出。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 可跨线程共享的取消标志
///
/// 触发后保持触发状态，直到调用 [`CancelToken::reset`]。
///
/// ```rust
/// use ee543_driver::CancelToken;
///
/// let token = CancelToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// token.reset();
/// assert!(!handle.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求取消
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// 是否已请求取消
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// 清除取消标志（开始新的操作前调用）
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
