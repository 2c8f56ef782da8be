//! CAN frame model and the reserved console channel IDs.
//!
//! The console uses two 29-bit extended arbitration IDs as a private
//! channel. Payloads carry opaque console bytes with no header: the frame's
//! own DLC is the only length information.

use embedded_can::{ExtendedId, Frame, Id, StandardId};

/// Maximum payload of a classic CAN frame.
pub const MAX_PAYLOAD: usize = 8;

/// Extended ID of frames carrying console output from the device.
pub const FROM_DEVICE_ID: u32 = 0x1FFF_FFFE;

/// Extended ID of frames carrying console input to the device.
pub const TO_DEVICE_ID: u32 = 0x1FFF_FFFD;

/// Direction of a console frame relative to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleChannel {
    /// Device → host (`FROM_DEVICE_ID`).
    FromDevice,
    /// Host → device (`TO_DEVICE_ID`).
    ToDevice,
}

impl ConsoleChannel {
    /// Raw extended arbitration ID of this channel.
    pub const fn raw_id(self) -> u32 {
        match self {
            Self::FromDevice => FROM_DEVICE_ID,
            Self::ToDevice => TO_DEVICE_ID,
        }
    }

    /// Arbitration ID of this channel.
    pub fn id(self) -> Id {
        // Both reserved values are below ExtendedId::MAX.
        match ExtendedId::new(self.raw_id()) {
            Some(id) => Id::Extended(id),
            None => unreachable!("reserved console IDs are valid 29-bit IDs"),
        }
    }

    /// Classify an arbitration ID.
    pub fn classify(id: Id) -> Option<Self> {
        match id {
            Id::Extended(ext) if ext.as_raw() == FROM_DEVICE_ID => Some(Self::FromDevice),
            Id::Extended(ext) if ext.as_raw() == TO_DEVICE_ID => Some(Self::ToDevice),
            _ => None,
        }
    }
}

/// A classic CAN frame with at most 8 bytes of payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanMessage {
    id: Id,
    data: [u8; MAX_PAYLOAD],
    len: usize,
    remote: bool,
}

impl CanMessage {
    /// Build a data frame with a 29-bit extended ID.
    ///
    /// Returns `None` if the ID does not fit 29 bits or the payload exceeds
    /// 8 bytes.
    pub fn extended(raw_id: u32, data: &[u8]) -> Option<Self> {
        Self::new(ExtendedId::new(raw_id)?, data)
    }

    /// Build a data frame with an 11-bit standard ID.
    pub fn standard(raw_id: u16, data: &[u8]) -> Option<Self> {
        Self::new(StandardId::new(raw_id)?, data)
    }

    /// Build a console frame for `channel`.
    pub fn console(channel: ConsoleChannel, data: &[u8]) -> Option<Self> {
        Self::new(channel.id(), data)
    }

    /// Raw numeric arbitration ID (without IDE flag).
    pub fn raw_id(&self) -> u32 {
        match self.id {
            Id::Standard(id) => u32::from(id.as_raw()),
            Id::Extended(id) => id.as_raw(),
        }
    }

    /// Console channel this frame belongs to, if any.
    pub fn console_channel(&self) -> Option<ConsoleChannel> {
        ConsoleChannel::classify(self.id)
    }

    /// Whether this frame carries console output from the device.
    pub fn is_from_device(&self) -> bool {
        self.console_channel() == Some(ConsoleChannel::FromDevice)
    }
}

impl Frame for CanMessage {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > MAX_PAYLOAD {
            return None;
        }
        let mut buf = [0u8; MAX_PAYLOAD];
        buf[..data.len()].copy_from_slice(data);
        Some(Self {
            id: id.into(),
            data: buf,
            len: data.len(),
            remote: false,
        })
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > MAX_PAYLOAD {
            return None;
        }
        Some(Self {
            id: id.into(),
            data: [0u8; MAX_PAYLOAD],
            len: dlc,
            remote: true,
        })
    }

    fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.len
    }

    fn data(&self) -> &[u8] {
        if self.remote {
            &[]
        } else {
            &self.data[..self.len]
        }
    }
}
