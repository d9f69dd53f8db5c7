//! 固定周期节拍器
//!
//! 每个周期结束时睡眠 `period - elapsed`；超时则立即进入下一周期，
//! 不追赶也不累积延迟（尽力而为的节拍）。

use spin_sleep::SpinSleeper;
use std::time::{Duration, Instant};
use tracing::trace;

pub struct TickPacer {
    period: Duration,
    sleeper: SpinSleeper,
    tick_start: Instant,
    overruns: u64,
}

impl TickPacer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            sleeper: SpinSleeper::default(),
            tick_start: Instant::now(),
            overruns: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 标记周期开始
    pub fn begin(&mut self) {
        self.tick_start = Instant::now();
    }

    /// 睡眠到周期结束
    pub fn finish(&mut self) {
        let elapsed = self.tick_start.elapsed();
        if elapsed < self.period {
            self.sleeper.sleep(self.period - elapsed);
        } else {
            self.overruns += 1;
            trace!("Tick overrun: {:?} > {:?}", elapsed, self.period);
        }
    }

    /// 超时周期数
    pub fn overruns(&self) -> u64 {
        self.overruns
    }
}
