//! # Radio Packet Header
//!
//! Fixed 15-byte header carried by every AeroLink packet.
//!
//! ```text
//!  0        1        2        3..6     7..10    11..12   13..14
//! +--------+--------+--------+--------+--------+--------+--------+
//! | comp   | type   | stream | src id | dst id | eflags | length |
//! +--------+--------+--------+--------+--------+--------+--------+
//! ```
//!
//! `eflags` carries the capacity-class routing bits: a packet flagged
//! high-capacity-only must never be scheduled onto a serial telemetry
//! radio, and vice versa.

use bytes::{Buf, BufMut, BytesMut};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Largest payload a single radio packet may carry. Packets that would
/// exceed this are dropped at build time; there is no fragmentation at
/// this layer.
pub const MAX_PACKET_PAYLOAD: usize = 1250;

/// Header plus maximum payload.
pub const MAX_PACKET_TOTAL_SIZE: usize = RadioPacketHeader::ENCODED_LEN + MAX_PACKET_PAYLOAD;

/// Extended-flags bit: send only over links that can carry full-size packets.
pub const FLAG_HIGH_CAPACITY_ONLY: u16 = 1 << 0;

/// Extended-flags bit: send only over low-capacity (serial telemetry) links.
pub const FLAG_LOW_CAPACITY_ONLY: u16 = 1 << 1;

/// Stream id for the shared data stream (telemetry, stats, commands).
pub const STREAM_ID_DATA: u8 = 0;

// ─── Component / Packet Type ────────────────────────────────────────────────

/// Subsystem that originated a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Component {
    Control = 0x01,
    Telemetry = 0x02,
    Video = 0x03,
}

impl Component {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Component::Control),
            0x02 => Some(Component::Telemetry),
            0x03 => Some(Component::Video),
            _ => None,
        }
    }
}

/// Packet type: full multi-interface radio stats report.
pub const PACKET_TYPE_RADIO_STATS_FULL: u8 = 0x21;

/// Packet type: compact single-interface radio stats report.
pub const PACKET_TYPE_RADIO_STATS_COMPACT: u8 = 0x22;

// ─── Header ─────────────────────────────────────────────────────────────────

/// Decoded radio packet header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioPacketHeader {
    /// Originating subsystem.
    pub component: Component,
    /// Packet type within the component's namespace.
    pub packet_type: u8,
    /// Stream the packet belongs to.
    pub stream_id: u8,
    /// Sender id (vehicle or controller id).
    pub source_id: u32,
    /// Destination id (0 = broadcast).
    pub destination_id: u32,
    /// Extended flags carrying the capacity-class routing bits.
    pub flags_extended: u16,
    /// Total packet length including this header.
    pub total_length: u16,
}

impl RadioPacketHeader {
    /// Encoded size: 1 + 1 + 1 + 4 + 4 + 2 + 2.
    pub const ENCODED_LEN: usize = 15;

    /// Create a telemetry header with no capacity flags set.
    pub fn telemetry(packet_type: u8, source_id: u32, destination_id: u32) -> Self {
        RadioPacketHeader {
            component: Component::Telemetry,
            packet_type,
            stream_id: STREAM_ID_DATA,
            source_id,
            destination_id,
            flags_extended: 0,
            total_length: 0,
        }
    }

    /// Restrict this packet to high-capacity links, clearing the
    /// low-capacity bit.
    pub fn high_capacity_only(mut self) -> Self {
        self.flags_extended |= FLAG_HIGH_CAPACITY_ONLY;
        self.flags_extended &= !FLAG_LOW_CAPACITY_ONLY;
        self
    }

    /// Restrict this packet to low-capacity links, clearing the
    /// high-capacity bit.
    pub fn low_capacity_only(mut self) -> Self {
        self.flags_extended |= FLAG_LOW_CAPACITY_ONLY;
        self.flags_extended &= !FLAG_HIGH_CAPACITY_ONLY;
        self
    }

    /// Set the total packet length (header + payload).
    pub fn with_total_length(mut self, len: usize) -> Self {
        self.total_length = len as u16;
        self
    }

    /// Encode the header into a buffer.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.component as u8);
        buf.put_u8(self.packet_type);
        buf.put_u8(self.stream_id);
        buf.put_u32(self.source_id);
        buf.put_u32(self.destination_id);
        buf.put_u16(self.flags_extended);
        buf.put_u16(self.total_length);
    }

    /// Decode a header. Returns `None` if the buffer is too short or the
    /// component byte is unknown.
    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if buf.remaining() < Self::ENCODED_LEN {
            return None;
        }
        let component = Component::from_byte(buf.get_u8())?;
        Some(RadioPacketHeader {
            component,
            packet_type: buf.get_u8(),
            stream_id: buf.get_u8(),
            source_id: buf.get_u32(),
            destination_id: buf.get_u32(),
            flags_extended: buf.get_u16(),
            total_length: buf.get_u16(),
        })
    }

    /// Whether this packet must travel over a high-capacity link.
    pub fn is_high_capacity_only(&self) -> bool {
        self.flags_extended & FLAG_HIGH_CAPACITY_ONLY != 0
    }

    /// Whether this packet must travel over a low-capacity link.
    pub fn is_low_capacity_only(&self) -> bool {
        self.flags_extended & FLAG_LOW_CAPACITY_ONLY != 0
    }
}
