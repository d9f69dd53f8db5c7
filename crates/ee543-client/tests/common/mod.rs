//! 模拟下位机
//!
//! 在 `MockSerial` 之上模拟 Arduino 固件：
//! - 清空缓冲（上电复位）后发送 'I'
//! - 每收到一次写入回一个应答；应答内容可以按周期编排（用于注入失步字节）
//! - 解码收到的每一帧

#![allow(dead_code)]

use ee543_client::ArmConfig;
use ee543_protocol::{PulseFrame, SENTINEL_ACK, SENTINEL_READY, SENTINEL_START};
use ee543_serial::{MockEvent, MockPeer, MockSerial};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct PeerState {
    frames: Vec<PulseFrame>,
    /// 按写入顺序编排的应答，耗尽后回 'A'
    replies: VecDeque<Vec<u8>>,
    /// 收到第 n 帧后断开
    disconnect_after: Option<usize>,
    started: bool,
}

#[derive(Clone)]
pub struct SimulatedPeer {
    mock: MockPeer,
    state: Arc<Mutex<PeerState>>,
}

impl SimulatedPeer {
    pub fn new() -> (MockSerial, SimulatedPeer) {
        let (serial, mock) = MockSerial::pair();
        let peer = SimulatedPeer {
            mock: mock.clone(),
            state: Arc::new(Mutex::new(PeerState::default())),
        };

        let state = peer.state.clone();
        let handle = mock.clone();
        mock.set_responder(move |event| {
            let mut state = state.lock().unwrap();
            match event {
                MockEvent::Clear => vec![SENTINEL_READY],
                MockEvent::Write(bytes) => {
                    if !state.started && bytes.as_slice() == [SENTINEL_START] {
                        state.started = true;
                    } else {
                        let frame = PulseFrame::from_bytes(bytes).expect("host sent a malformed frame");
                        state.frames.push(frame);
                        if state.disconnect_after == Some(state.frames.len()) {
                            handle.disconnect();
                            return Vec::new();
                        }
                    }
                    state.replies.pop_front().unwrap_or_else(|| vec![SENTINEL_ACK])
                },
                _ => Vec::new(),
            }
        });

        (serial, peer)
    }

    /// 下一次写入后回复 `bytes` 而不是 'A'
    pub fn script_reply(&self, bytes: &[u8]) {
        self.state.lock().unwrap().replies.push_back(bytes.to_vec());
    }

    pub fn disconnect_after(&self, frames: usize) {
        self.state.lock().unwrap().disconnect_after = Some(frames);
    }

    pub fn frames(&self) -> Vec<PulseFrame> {
        self.state.lock().unwrap().frames.clone()
    }

    pub fn handshake_done(&self) -> bool {
        self.state.lock().unwrap().started
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.mock.events()
    }

    pub fn mock(&self) -> &MockPeer {
        &self.mock
    }
}

/// 无复位等待的配置，控制频率保持 30Hz
pub fn test_config() -> ArmConfig {
    let mut config = ArmConfig::default();
    config.link.reset_delay_ms = 0;
    config.link.settle_delay_ms = 0;
    config.link.poll_interval_ms = 1;
    config
}

/// 每次写入载荷之前，自上一次写入以来必须已经消费过一个 'A'
pub fn assert_ack_gated(events: &[MockEvent]) {
    let mut ack_pending = false;
    let mut started = false;
    for event in events {
        match event {
            MockEvent::Read(byte) => {
                if started {
                    ack_pending = *byte == SENTINEL_ACK;
                }
            },
            MockEvent::Write(bytes) if !started => {
                assert_eq!(bytes.as_slice(), [SENTINEL_START]);
                started = true;
            },
            MockEvent::Write(bytes) => {
                assert!(ack_pending, "payload {:02X?} written without a consumed ack", bytes);
                ack_pending = false;
            },
            _ => {},
        }
    }
}
