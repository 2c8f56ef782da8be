//! In-process virtual CAN bus.
//!
//! A virtual bus does not touch any hardware. Every bus opened on the same
//! channel name joins one process-wide group; a frame sent on one bus is
//! queued on every other bus of the group. By default a bus does not
//! receive its own frames.
//!
//! # Example
//!
//! ```rust
//! use cc16_console::bus::VirtualBus;
//! use cc16_console::core::{CanBus, CanMessage, ConsoleChannel};
//!
//! let host = VirtualBus::open("doc-example");
//! let device = VirtualBus::open("doc-example");
//!
//! let frame = CanMessage::console(ConsoleChannel::ToDevice, b"hi").unwrap();
//! host.send(&frame).unwrap();
//! assert_eq!(device.try_recv().unwrap(), Some(frame));
//! assert_eq!(host.try_recv().unwrap(), None);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::core::error::Result;
use crate::core::frame::CanMessage;
use crate::core::traits::CanBus;

type FrameQueue = Arc<Mutex<VecDeque<CanMessage>>>;

/// Buses sharing one channel name: bus id -> receive queue.
#[derive(Default)]
struct Group {
    members: DashMap<u64, FrameQueue>,
}

static GROUPS: Lazy<DashMap<String, Arc<Group>>> = Lazy::new(DashMap::new);
static NEXT_BUS_ID: AtomicU64 = AtomicU64::new(1);

/// Virtual bus handle.
pub struct VirtualBus {
    id: u64,
    channel: String,
    name: String,
    group: Arc<Group>,
    queue: FrameQueue,
    receive_own: bool,
}

impl VirtualBus {
    /// Join the group for `channel`, creating it if needed.
    pub fn open(channel: &str) -> Self {
        let id = NEXT_BUS_ID.fetch_add(1, Ordering::Relaxed);
        let queue: FrameQueue = Arc::new(Mutex::new(VecDeque::new()));

        // Register while holding the group entry so a concurrent drop of the
        // last member cannot remove the group under us.
        let group = {
            let entry = GROUPS
                .entry(channel.to_string())
                .or_insert_with(|| Arc::new(Group::default()));
            entry.members.insert(id, Arc::clone(&queue));
            Arc::clone(entry.value())
        };

        Self {
            id,
            channel: channel.to_string(),
            name: format!("virtual:{}", channel),
            group,
            queue,
            receive_own: false,
        }
    }

    /// Also deliver frames sent on this bus to itself.
    pub fn with_receive_own(mut self, receive_own: bool) -> Self {
        self.receive_own = receive_own;
        self
    }

    /// Channel (group) name.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Frames waiting to be received on this bus.
    pub fn pending(&self) -> usize {
        lock(&self.queue).len()
    }
}

fn lock(queue: &FrameQueue) -> std::sync::MutexGuard<'_, VecDeque<CanMessage>> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CanBus for VirtualBus {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, frame: &CanMessage) -> Result<()> {
        for member in self.group.members.iter() {
            if *member.key() != self.id || self.receive_own {
                lock(member.value()).push_back(*frame);
            }
        }
        Ok(())
    }

    fn try_recv(&self) -> Result<Option<CanMessage>> {
        Ok(lock(&self.queue).pop_front())
    }
}

impl Drop for VirtualBus {
    fn drop(&mut self) {
        let id = self.id;
        GROUPS.remove_if(&self.channel, |_, group| {
            group.members.remove(&id);
            group.members.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::{ConsoleChannel, FROM_DEVICE_ID};
    use embedded_can::Frame;

    #[test]
    fn test_frames_reach_other_members_only() {
        let a = VirtualBus::open("vbus-members");
        let b = VirtualBus::open("vbus-members");
        let c = VirtualBus::open("vbus-members");

        let frame = CanMessage::extended(FROM_DEVICE_ID, &[0xAA]).unwrap();
        a.send(&frame).unwrap();

        assert_eq!(a.pending(), 0);
        assert_eq!(b.try_recv().unwrap(), Some(frame));
        assert_eq!(c.try_recv().unwrap(), Some(frame));
        assert_eq!(b.try_recv().unwrap(), None);
    }

    #[test]
    fn test_channels_are_isolated() {
        let a = VirtualBus::open("vbus-iso-1");
        let b = VirtualBus::open("vbus-iso-2");

        let frame = CanMessage::standard(0x123, &[1]).unwrap();
        a.send(&frame).unwrap();
        assert_eq!(b.try_recv().unwrap(), None);
    }

    #[test]
    fn test_receive_own() {
        let a = VirtualBus::open("vbus-own").with_receive_own(true);
        let frame = CanMessage::console(ConsoleChannel::ToDevice, b"x").unwrap();
        a.send(&frame).unwrap();
        assert_eq!(a.try_recv().unwrap(), Some(frame));
    }

    #[test]
    fn test_order_is_preserved() {
        let a = VirtualBus::open("vbus-order");
        let b = VirtualBus::open("vbus-order");

        for i in 0..5u8 {
            a.send(&CanMessage::standard(0x100, &[i]).unwrap()).unwrap();
        }
        for i in 0..5u8 {
            assert_eq!(b.try_recv().unwrap().unwrap().data(), &[i]);
        }
    }

    #[test]
    fn test_group_removed_after_last_drop() {
        let a = VirtualBus::open("vbus-drop");
        assert!(GROUPS.contains_key("vbus-drop"));
        drop(a);
        assert!(!GROUPS.contains_key("vbus-drop"));
    }
}
