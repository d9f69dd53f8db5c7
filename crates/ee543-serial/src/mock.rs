//! Mock 串口
//!
//! 内存中的下位机模拟，用于无硬件测试：
//! - 记录上位机的每一次读/写/flush/清缓冲（`MockEvent`）
//! - 通过 responder 回调对事件作出应答（例如收到帧后回 'A'）
//! - 可注入断连、写失败等故障

use crate::{SerialAdapter, SerialError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// 上位机在串口上的一次操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    /// 上位机消费了一个字节
    Read(u8),
    /// 上位机写入了一段数据
    Write(Vec<u8>),
    /// 上位机 flush 输出
    Flush,
    /// 上位机清空收发缓冲
    Clear,
}

/// 事件应答回调：返回值追加到接收队列
type Responder = Box<dyn FnMut(&MockEvent) -> Vec<u8> + Send>;

#[derive(Default)]
struct MockState {
    rx: VecDeque<u8>,
    events: Vec<MockEvent>,
    responder: Option<Responder>,
    disconnected: bool,
    fail_writes: bool,
}

/// 上位机侧的 mock 串口（实现 `SerialAdapter`）
pub struct MockSerial {
    shared: Arc<Mutex<MockState>>,
}

/// 测试侧句柄，用于注入数据和检查上位机行为
#[derive(Clone)]
pub struct MockPeer {
    shared: Arc<Mutex<MockState>>,
}

impl MockSerial {
    /// 创建一对 (串口, 下位机句柄)
    pub fn pair() -> (MockSerial, MockPeer) {
        let shared = Arc::new(Mutex::new(MockState::default()));
        (
            MockSerial {
                shared: shared.clone(),
            },
            MockPeer { shared },
        )
    }

    /// 行为与固件一致的下位机：
    /// - 清空缓冲（对应 Arduino 上电复位）后发送 'I'
    /// - 每收到一次写入（'S' 或控制帧）回一个 'A'
    pub fn with_auto_ack() -> (MockSerial, MockPeer) {
        let (serial, peer) = Self::pair();
        peer.set_responder(|event| match event {
            MockEvent::Clear => vec![b'I'],
            MockEvent::Write(_) => vec![b'A'],
            _ => Vec::new(),
        });
        (serial, peer)
    }

    fn record(&self, event: MockEvent) {
        let responder = {
            let mut state = self.shared.lock();
            state.events.push(event.clone());
            state.responder.take()
        };

        // 回调在锁外执行，避免回调中访问 MockPeer 时死锁
        if let Some(mut responder) = responder {
            let reply = responder(&event);
            let mut state = self.shared.lock();
            state.rx.extend(reply);
            if state.responder.is_none() {
                state.responder = Some(responder);
            }
        }
    }
}

impl SerialAdapter for MockSerial {
    fn bytes_to_read(&mut self) -> Result<u32, SerialError> {
        let state = self.shared.lock();
        if state.disconnected {
            return Err(SerialError::Disconnected);
        }
        Ok(state.rx.len() as u32)
    }

    fn read_byte(&mut self, timeout: Duration) -> Result<Option<u8>, SerialError> {
        for attempt in 0..2 {
            {
                let mut state = self.shared.lock();
                if state.disconnected {
                    return Err(SerialError::Disconnected);
                }
                if let Some(byte) = state.rx.pop_front() {
                    state.events.push(MockEvent::Read(byte));
                    return Ok(Some(byte));
                }
            }
            if attempt == 0 && !timeout.is_zero() {
                std::thread::sleep(timeout.min(Duration::from_millis(1)));
            }
        }
        Ok(None)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        {
            let state = self.shared.lock();
            if state.disconnected {
                return Err(SerialError::Disconnected);
            }
            if state.fail_writes {
                return Err(SerialError::Io(std::io::Error::other("injected write failure")));
            }
        }
        self.record(MockEvent::Write(bytes.to_vec()));
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SerialError> {
        if self.shared.lock().disconnected {
            return Err(SerialError::Disconnected);
        }
        self.record(MockEvent::Flush);
        Ok(())
    }

    fn clear_buffers(&mut self) -> Result<(), SerialError> {
        {
            let mut state = self.shared.lock();
            if state.disconnected {
                return Err(SerialError::Disconnected);
            }
            state.rx.clear();
        }
        self.record(MockEvent::Clear);
        Ok(())
    }
}

impl MockPeer {
    /// 下位机发送字节
    pub fn push_rx(&self, bytes: &[u8]) {
        self.shared.lock().rx.extend(bytes.iter().copied());
    }

    /// 设置事件应答回调（替换已有回调）
    pub fn set_responder<F>(&self, responder: F)
    where
        F: FnMut(&MockEvent) -> Vec<u8> + Send + 'static,
    {
        self.shared.lock().responder = Some(Box::new(responder));
    }

    /// 移除应答回调
    pub fn clear_responder(&self) {
        self.shared.lock().responder = None;
    }

    /// 模拟 USB 断开：之后所有操作返回 `SerialError::Disconnected`
    pub fn disconnect(&self) {
        self.shared.lock().disconnected = true;
    }

    /// 注入写失败
    pub fn fail_writes(&self, fail: bool) {
        self.shared.lock().fail_writes = fail;
    }

    /// 全部事件（按发生顺序）
    pub fn events(&self) -> Vec<MockEvent> {
        self.shared.lock().events.clone()
    }

    /// 所有写入操作
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.shared
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                MockEvent::Write(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    /// 所有写入字节拼接后的结果
    pub fn written_bytes(&self) -> Vec<u8> {
        self.writes().concat()
    }

    /// 接收队列中尚未被上位机读取的字节数
    pub fn pending_rx(&self) -> usize {
        self.shared.lock().rx.len()
    }
}
