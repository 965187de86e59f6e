//! Packet hand-off from the timing thread to the transport thread.
//!
//! Packets travel over a lock-free SPSC queue so the timing thread never
//! blocks on transport I/O.
//!
//! All entries are:
//! - Fixed-size (no heap allocation)
//! - Copy (can be sent across threads)
//! - Self-contained (no references or pointers)

use crate::pulse::CoyotePacket;
use rtrb::{Consumer, Producer, RingBuffer};

/// Capacity of the packet queue: 6.4 s of packets at the 100 ms cadence.
pub const PACKET_QUEUE_CAPACITY: usize = 64;

/// A packet with the tick time it was generated at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedPacket {
    pub time_s: f64,
    pub packet: CoyotePacket,
}

/// Creates a new packet queue pair.
///
/// Returns (producer for the timing thread, consumer for the transport).
pub fn new_packet_queue() -> (Producer<TimedPacket>, Consumer<TimedPacket>) {
    RingBuffer::new(PACKET_QUEUE_CAPACITY)
}

/// Push without blocking. A full queue drops the packet and returns `false`.
#[inline]
pub fn push_packet(tx: &mut Producer<TimedPacket>, packet: TimedPacket) -> bool {
    tx.push(packet).is_ok()
}

/// Drains every pending packet, oldest first.
pub fn drain_packets(rx: &mut Consumer<TimedPacket>) -> Vec<TimedPacket> {
    let mut packets = Vec::with_capacity(rx.slots());
    while let Ok(packet) = rx.pop() {
        packets.push(packet);
    }
    packets
}
