//! 握手链路状态机
//!
//! 上位机与下位机（Arduino）之间是严格交替的请求/应答协议：
//!
//! ```text
//!            clear buffers, wait reset_delay
//!   Init ───────────────────────────────────► (wait 'I') ──write 'S'──► Idle
//!                                                                        │
//!        ┌───────────────────────────────────────────────────────────────┘
//!        ▼
//!   AwaitingAck ──read 'A'──► write payload + flush ──► Idle
//!        │
//!        └──read other byte──► drop payload (skipped cycle) ──► Idle
//!
//!   close() ──► Closed（终态，不能重新打开）
//! ```
//!
//! 下位机只在复位后发送一次 'I'，握手被取消后无法在同一串口上重试，
//! 因此握手阶段的任何错误都会关闭链路。
//!
//! 两处等待（'I' 和 'A'）都没有超时；它们以 `poll_interval` 为粒度阻塞读取，
//! 每次轮询前检查 [`CancelToken`]。

use crate::{CancelToken, DriverError, LinkMetrics};
use ee543_protocol::{PulseFrame, Sentinel};
use ee543_serial::SerialAdapter;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// 链路时序配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// 清空缓冲后等待下位机复位的时间
    pub reset_delay: Duration,
    /// 发送 'S' 后的稳定时间
    pub settle_delay: Duration,
    /// 等待下位机字节时单次阻塞读取的上限
    pub poll_interval: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            reset_delay: Duration::from_secs(1),
            settle_delay: Duration::from_millis(100),
            poll_interval: Duration::from_millis(2),
        }
    }
}

impl LinkConfig {
    /// 无延时配置（测试/仿真使用）
    pub fn immediate() -> Self {
        Self {
            reset_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
            poll_interval: Duration::from_millis(1),
        }
    }
}

/// 链路状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// 已获得串口，尚未完成初始握手
    Init,
    /// 握手完成，可以发送
    Idle,
    /// 正在等待应答字节
    AwaitingAck,
    /// 已关闭（终态）
    Closed,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Init => "Init",
            LinkState::Idle => "Idle",
            LinkState::AwaitingAck => "AwaitingAck",
            LinkState::Closed => "Closed",
        };
        f.write_str(name)
    }
}

/// 单次发送的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// 收到 'A'，负载已写出
    Sent,
    /// 收到非应答字节，本周期负载被丢弃（不重试）
    Skipped { byte: u8 },
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, SendOutcome::Sent)
    }
}

/// 应答门控的串口链路
///
/// 串口由链路独占持有；`close()` 或 `Drop` 时释放。
pub struct Link<A: SerialAdapter> {
    adapter: Option<A>,
    state: LinkState,
    config: LinkConfig,
    cancel: CancelToken,
    metrics: Arc<LinkMetrics>,
}

impl<A: SerialAdapter> Link<A> {
    /// 包装一个已打开的串口，状态为 `Init`
    pub fn new(adapter: A, config: LinkConfig, cancel: CancelToken) -> Self {
        Self {
            adapter: Some(adapter),
            state: LinkState::Init,
            config,
            cancel,
            metrics: Arc::new(LinkMetrics::new()),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// 是否可以发送（握手已完成且未关闭）
    pub fn is_open(&self) -> bool {
        matches!(self.state, LinkState::Idle | LinkState::AwaitingAck)
    }

    pub fn metrics(&self) -> Arc<LinkMetrics> {
        self.metrics.clone()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// 执行初始握手：清空缓冲 → 等待复位 → 等待 'I' → 发送 'S' → 稳定等待
    ///
    /// # 错误
    ///
    /// - `DriverError::AlreadyOpen` / `DriverError::LinkClosed`: 状态不是 `Init`
    /// - `DriverError::Cancelled`: 等待期间被取消
    /// - `DriverError::Serial`: 串口故障
    ///
    /// 出错后链路进入 `Closed`，需要重新打开串口。
    pub fn open(&mut self) -> Result<(), DriverError> {
        match self.state {
            LinkState::Init => {},
            LinkState::Closed => return Err(DriverError::LinkClosed),
            LinkState::Idle | LinkState::AwaitingAck => return Err(DriverError::AlreadyOpen),
        }

        match self.handshake() {
            Ok(()) => {
                self.state = LinkState::Idle;
                info!("Serial link ready");
                Ok(())
            },
            Err(e) => {
                warn!("Handshake failed, closing link: {}", e);
                self.close();
                Err(e)
            },
        }
    }

    fn handshake(&mut self) -> Result<(), DriverError> {
        let config = self.config;
        let adapter = self.adapter.as_mut().ok_or(DriverError::LinkClosed)?;

        adapter.clear_buffers()?;
        sleep_cancellable(config.reset_delay, config.poll_interval, &self.cancel)?;

        debug!("Waiting for ready byte 'I'");
        let started = Instant::now();
        loop {
            if self.cancel.is_cancelled() {
                return Err(DriverError::Cancelled);
            }
            let Some(byte) = adapter.read_byte(config.poll_interval)? else {
                continue;
            };
            match Sentinel::parse(byte) {
                Ok(Sentinel::Ready) => break,
                Ok(other) => {
                    self.metrics.ready_bytes_discarded.fetch_add(1, Ordering::Relaxed);
                    debug!("Discarding {:?} while waiting for ready", other);
                },
                Err(e) => {
                    self.metrics.ready_bytes_discarded.fetch_add(1, Ordering::Relaxed);
                    debug!("Discarding byte while waiting for ready: {}", e);
                },
            }
        }
        debug!("Peer ready after {:?}", started.elapsed());

        adapter.write_all(&[Sentinel::Start.as_byte()])?;
        adapter.flush()?;
        sleep_cancellable(config.settle_delay, config.poll_interval, &self.cancel)?;
        Ok(())
    }

    /// 应答门控发送
    ///
    /// 阻塞直到下位机发出一个字节：
    /// - 'A': 写出 `payload` 并 flush，返回 `SendOutcome::Sent`
    /// - 其他: 丢弃本周期，返回 `SendOutcome::Skipped`
    ///
    /// 在消费应答字节之前不会写出任何负载字节。
    pub fn send_payload(&mut self, payload: &[u8]) -> Result<SendOutcome, DriverError> {
        match self.state {
            LinkState::Idle | LinkState::AwaitingAck => {},
            LinkState::Init => return Err(DriverError::NotOpen),
            LinkState::Closed => return Err(DriverError::LinkClosed),
        }
        if payload.is_empty() {
            return Err(DriverError::InvalidInput("empty payload".to_string()));
        }

        self.state = LinkState::AwaitingAck;
        match self.exchange(payload) {
            Ok(outcome) => {
                self.state = LinkState::Idle;
                Ok(outcome)
            },
            Err(e) => Err(self.on_error(e)),
        }
    }

    /// 编码并发送一帧
    pub fn send_frame(&mut self, frame: &PulseFrame) -> Result<SendOutcome, DriverError> {
        self.send_payload(&frame.encode())
    }

    fn exchange(&mut self, payload: &[u8]) -> Result<SendOutcome, DriverError> {
        let poll_interval = self.config.poll_interval;
        let adapter = self.adapter.as_mut().ok_or(DriverError::LinkClosed)?;

        let byte = loop {
            if self.cancel.is_cancelled() {
                return Err(DriverError::Cancelled);
            }
            match adapter.read_byte(poll_interval)? {
                Some(byte) => break byte,
                None => {
                    self.metrics.ack_poll_timeouts.fetch_add(1, Ordering::Relaxed);
                },
            }
        };

        match Sentinel::parse(byte) {
            Ok(Sentinel::Ack) => {},
            Ok(other) => {
                self.metrics.cycles_skipped.fetch_add(1, Ordering::Relaxed);
                warn!("Expected ack, got {:?}; dropping this cycle", other);
                return Ok(SendOutcome::Skipped { byte });
            },
            Err(e) => {
                self.metrics.cycles_skipped.fetch_add(1, Ordering::Relaxed);
                warn!("Expected ack, {}; dropping this cycle", e);
                return Ok(SendOutcome::Skipped { byte });
            },
        }
        self.metrics.acks_received.fetch_add(1, Ordering::Relaxed);

        adapter.write_all(payload)?;
        adapter.flush()?;

        self.metrics.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .bytes_sent
            .fetch_add(payload.len() as u64, Ordering::Relaxed);
        trace!("TX {}", hex::encode(payload));

        Ok(SendOutcome::Sent)
    }

    /// 关闭链路并释放串口（幂等）
    pub fn close(&mut self) {
        if self.state == LinkState::Closed {
            return;
        }
        self.state = LinkState::Closed;
        if self.adapter.take().is_some() {
            info!("Serial link closed");
        }
    }

    /// 错误后的状态收敛：致命错误关闭链路，其余回到可重试状态
    fn on_error(&mut self, error: DriverError) -> DriverError {
        if error.is_fatal() {
            warn!("Fatal link error, closing: {}", error);
            self.close();
        } else if self.state == LinkState::AwaitingAck {
            self.state = LinkState::Idle;
        }
        error
    }
}

impl<A: SerialAdapter> Drop for Link<A> {
    fn drop(&mut self) {
        self.close();
    }
}

/// 分段睡眠，每段不超过 `slice`，期间检查取消
fn sleep_cancellable(
    total: Duration,
    slice: Duration,
    cancel: &CancelToken,
) -> Result<(), DriverError> {
    let deadline = Instant::now() + total;
    let slice = slice.max(Duration::from_millis(1));
    loop {
        if cancel.is_cancelled() {
            return Err(DriverError::Cancelled);
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        std::thread::sleep((deadline - now).min(slice));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ee543_serial::{MockEvent, MockSerial, SerialError};

    fn open_link() -> (Link<MockSerial>, ee543_serial::MockPeer) {
        let (serial, peer) = MockSerial::with_auto_ack();
        let mut link = Link::new(serial, LinkConfig::immediate(), CancelToken::new());
        link.open().unwrap();
        (link, peer)
    }

    #[test]
    fn test_open_handshake_sequence() {
        let (link, peer) = open_link();
        assert_eq!(link.state(), LinkState::Idle);
        assert_eq!(
            peer.events(),
            vec![
                MockEvent::Clear,
                MockEvent::Read(b'I'),
                MockEvent::Write(vec![b'S']),
                MockEvent::Flush,
            ]
        );
    }

    #[test]
    fn test_open_discards_noise_before_ready() {
        let (serial, peer) = MockSerial::pair();
        peer.set_responder(|event| match event {
            MockEvent::Clear => b"\x00?I".to_vec(),
            _ => Vec::new(),
        });
        let mut link = Link::new(serial, LinkConfig::immediate(), CancelToken::new());
        link.open().unwrap();
        assert_eq!(link.metrics().snapshot().ready_bytes_discarded, 2);
    }

    #[test]
    fn test_open_twice_fails() {
        let (mut link, _peer) = open_link();
        assert!(matches!(link.open(), Err(DriverError::AlreadyOpen)));
    }

    #[test]
    fn test_send_before_open_fails() {
        let (serial, _peer) = MockSerial::with_auto_ack();
        let mut link = Link::new(serial, LinkConfig::immediate(), CancelToken::new());
        assert!(matches!(
            link.send_payload(&[0, 1]),
            Err(DriverError::NotOpen)
        ));
    }

    #[test]
    fn test_send_after_ack() {
        let (mut link, peer) = open_link();
        let payload = [0x00, 0xFF, 0x01, 0xB8];

        let outcome = link.send_payload(&payload).unwrap();
        assert_eq!(outcome, SendOutcome::Sent);

        let events = peer.events();
        let tail = &events[events.len() - 3..];
        assert_eq!(
            tail,
            &[
                MockEvent::Read(b'A'),
                MockEvent::Write(payload.to_vec()),
                MockEvent::Flush,
            ]
        );

        let metrics = link.metrics().snapshot();
        assert_eq!(metrics.frames_sent, 1);
        assert_eq!(metrics.bytes_sent, 4);
        assert_eq!(metrics.acks_received, 1);
    }

    #[test]
    fn test_unexpected_byte_skips_cycle() {
        let (mut link, peer) = open_link();
        // 丢掉 'S' 引发的 'A'，换成一个杂散字节
        peer.clear_responder();
        let _ = link.adapter.as_mut().unwrap().try_read_byte();
        peer.push_rx(b"Z");

        let writes_before = peer.writes().len();
        let outcome = link.send_payload(&[0x00, 0x46]).unwrap();
        assert_eq!(outcome, SendOutcome::Skipped { byte: b'Z' });
        assert_eq!(peer.writes().len(), writes_before);
        assert_eq!(link.state(), LinkState::Idle);
        assert_eq!(link.metrics().snapshot().cycles_skipped, 1);
    }

    #[test]
    fn test_cancel_while_awaiting_ack() {
        let (mut link, peer) = open_link();
        peer.clear_responder();
        let _ = link.adapter.as_mut().unwrap().try_read_byte();

        let token = link.cancel_token().clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            token.cancel();
        });

        let result = link.send_payload(&[0x00, 0x46]);
        canceller.join().unwrap();

        assert!(matches!(result, Err(DriverError::Cancelled)));
        assert_eq!(link.state(), LinkState::Idle);
        assert!(link.metrics().snapshot().ack_poll_timeouts > 0);
    }

    #[test]
    fn test_cancel_while_waiting_for_ready() {
        let (serial, _peer) = MockSerial::pair();
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut link = Link::new(serial, LinkConfig::immediate(), cancel.clone());

        assert!(matches!(link.open(), Err(DriverError::Cancelled)));
        assert_eq!(link.state(), LinkState::Closed);

        cancel.reset();
        assert!(matches!(link.open(), Err(DriverError::LinkClosed)));
    }

    #[test]
    fn test_cancel_during_reset_delay_closes_link() {
        let (serial, peer) = MockSerial::with_auto_ack();
        let cancel = CancelToken::new();
        let config = LinkConfig {
            reset_delay: Duration::from_secs(5),
            ..LinkConfig::immediate()
        };
        let mut link = Link::new(serial, config, cancel.clone());

        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            cancel.cancel();
        });
        let result = link.open();
        canceller.join().unwrap();

        assert!(matches!(result, Err(DriverError::Cancelled)));
        assert_eq!(link.state(), LinkState::Closed);
        // 'I' 未被消费，也不会再有机会被读取
        assert!(!peer.events().iter().any(|e| matches!(e, MockEvent::Read(_))));
    }

    #[test]
    fn test_ready_sentinel_while_awaiting_ack_skips_cycle() {
        let (mut link, peer) = open_link();
        peer.clear_responder();
        let _ = link.adapter.as_mut().unwrap().try_read_byte();
        peer.push_rx(b"I");

        let outcome = link.send_payload(&[0x00, 0x46]).unwrap();
        assert_eq!(outcome, SendOutcome::Skipped { byte: b'I' });
        assert_eq!(link.metrics().snapshot().cycles_skipped, 1);
    }

    #[test]
    fn test_disconnect_closes_link() {
        let (mut link, peer) = open_link();
        peer.disconnect();

        let result = link.send_payload(&[0x00, 0x46]);
        assert!(matches!(
            result,
            Err(DriverError::Serial(SerialError::Disconnected))
        ));
        assert_eq!(link.state(), LinkState::Closed);
        assert!(matches!(
            link.send_payload(&[0x00, 0x46]),
            Err(DriverError::LinkClosed)
        ));
    }

    #[test]
    fn test_close_is_terminal() {
        let (mut link, _peer) = open_link();
        link.close();
        link.close();
        assert_eq!(link.state(), LinkState::Closed);
        assert!(matches!(link.open(), Err(DriverError::LinkClosed)));
    }

    #[test]
    fn test_empty_payload_rejected() {
        let (mut link, _peer) = open_link();
        assert!(matches!(
            link.send_payload(&[]),
            Err(DriverError::InvalidInput(_))
        ));
        assert_eq!(link.state(), LinkState::Idle);
    }

    #[test]
    fn test_send_frame_encodes() {
        let (mut link, peer) = open_link();
        let frame = PulseFrame::new(&[255, 255, 255, 255], 4095).unwrap();
        link.send_frame(&frame).unwrap();
        assert_eq!(peer.writes().last().unwrap(), &frame.encode().to_vec());
    }
}
