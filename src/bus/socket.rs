//! Linux SocketCAN transport.
//!
//! Uses [`socketcan`](https://crates.io/crates/socketcan) with the socket in
//! non-blocking mode: `try_recv` returns `None` on `WouldBlock`. `send`
//! retries while the transmit queue is full and gives up with `TimedOut`
//! after [`SEND_TIMEOUT`], e.g. when nothing on the bus acknowledges.
//!
//! The bitrate is a property of the network device (`ip link set can0 type
//! can bitrate 500000`) and is only recorded here.

use std::io;
use std::time::{Duration, Instant};

use socketcan::{CanFrame, CanSocket, EmbeddedFrame, Socket};

use crate::core::error::{BridgeError, Result};
use crate::core::frame::CanMessage;
use crate::core::traits::CanBus;

/// Longest time `send` waits for transmit-queue space.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause between send attempts while the queue is full.
const SEND_RETRY_INTERVAL: Duration = Duration::from_millis(1);

/// SocketCAN bus handle.
pub struct SocketCanBus {
    socket: CanSocket,
    name: String,
    bitrate: u32,
}

impl SocketCanBus {
    /// Open `channel` (a CAN network device such as `can0`).
    pub fn open(channel: &str, bitrate: u32) -> Result<Self> {
        let bus_open_error = |source: io::Error| BridgeError::BusOpen {
            interface: channel.to_string(),
            source,
        };

        let socket = CanSocket::open(channel).map_err(bus_open_error)?;
        socket.set_nonblocking(true).map_err(bus_open_error)?;

        #[cfg(feature = "tracing-support")]
        tracing::info!(
            channel = channel,
            bitrate = bitrate,
            "CAN socket opened (bitrate is configured on the device)"
        );

        Ok(Self {
            socket,
            name: format!("socketcan:{}", channel),
            bitrate,
        })
    }

    /// Bitrate requested at open time, in bit/s.
    pub fn bitrate(&self) -> u32 {
        self.bitrate
    }
}

fn to_socketcan(frame: &CanMessage) -> Option<CanFrame> {
    if frame.is_remote_frame() {
        CanFrame::new_remote(frame.id(), frame.dlc())
    } else {
        CanFrame::new(frame.id(), frame.data())
    }
}

fn from_socketcan(frame: &CanFrame) -> Option<CanMessage> {
    match frame {
        CanFrame::Data(_) => {
            CanMessage::new(EmbeddedFrame::id(frame), EmbeddedFrame::data(frame))
        }
        CanFrame::Remote(_) => {
            CanMessage::new_remote(EmbeddedFrame::id(frame), EmbeddedFrame::dlc(frame))
        }
        CanFrame::Error(_) => None,
    }
}

impl CanBus for SocketCanBus {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, frame: &CanMessage) -> Result<()> {
        let out = to_socketcan(frame).ok_or_else(|| {
            BridgeError::Send(io::Error::new(
                io::ErrorKind::InvalidInput,
                "frame not representable on SocketCAN",
            ))
        })?;

        let deadline = Instant::now() + SEND_TIMEOUT;
        loop {
            match self.socket.write_frame(&out) {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Err(BridgeError::Send(io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("transmit queue of {} full for {:?}", self.name, SEND_TIMEOUT),
                        )));
                    }
                    std::thread::sleep(SEND_RETRY_INTERVAL);
                }
                Err(e) => return Err(BridgeError::Send(e)),
            }
        }
    }

    fn try_recv(&self) -> Result<Option<CanMessage>> {
        loop {
            match self.socket.read_frame() {
                Ok(frame) => match from_socketcan(&frame) {
                    Some(msg) => return Ok(Some(msg)),
                    None => {
                        #[cfg(feature = "tracing-support")]
                        tracing::debug!("Skipping CAN error frame on {}", self.name);
                    }
                },
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(BridgeError::Receive(e)),
            }
        }
    }
}
