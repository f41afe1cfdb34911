//! # Radio Stats Records
//!
//! Fixed-size per-interface link-quality records, serialized field by
//! field with explicit widths.
//!
//! Two variants exist because the links they travel over differ by two
//! orders of magnitude in payload budget:
//!
//! - [`FullRadioStats`]: everything about one interface, repeated per
//!   interface inside a single high-capacity packet.
//! - [`CompactRadioStats`]: the quality/counter core for exactly one
//!   interface, small enough for a serial telemetry radio; the sender
//!   round-robins through interfaces one per report.

use bytes::{Buf, BufMut, BytesMut};

/// Number of history slices kept per interface for receive-quality graphs.
pub const STATS_HISTORY_SLICES: usize = 40;

// ─── Compact Record ─────────────────────────────────────────────────────────

/// Link-quality core for a single interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactRadioStats {
    /// Last signal strength over any stream, dBm.
    pub last_dbm: i16,
    /// Last signal strength on video packets, dBm.
    pub last_dbm_video: i16,
    /// Last signal strength on data packets, dBm.
    pub last_dbm_data: i16,
    /// Last receive data rate, bps. Negative values are MCS indices.
    pub last_recv_rate_bps: i32,
    pub last_recv_rate_video_bps: i32,
    pub last_recv_rate_data_bps: i32,
    pub total_rx_bytes: u32,
    pub total_tx_bytes: u32,
    pub rx_bytes_per_sec: u32,
    pub tx_bytes_per_sec: u32,
    pub total_rx_packets: u32,
    pub total_rx_packets_bad: u32,
    pub total_rx_packets_lost: u32,
    pub total_tx_packets: u32,
    pub rx_packets_per_sec: u32,
    pub tx_packets_per_sec: u32,
    /// Timestamp of the last received packet, ms.
    pub time_last_rx_ms: u32,
    /// Timestamp of the last transmitted packet, ms.
    pub time_last_tx_ms: u32,
    /// Sender's clock at serialization time, ms.
    pub time_now_ms: u32,
    /// Receive quality score, 0-100.
    pub rx_quality: u8,
    /// Quality relative to the best interface, signed.
    pub rx_relative_quality: i8,
    /// Packets received per history slice.
    pub hist_rx_packets: [u8; STATS_HISTORY_SLICES],
    /// Packets lost per history slice.
    pub hist_rx_lost: [u8; STATS_HISTORY_SLICES],
    /// Longest receive gap per history slice, ms (0xFF = no packet).
    pub hist_rx_gap_ms: [u8; STATS_HISTORY_SLICES],
}

impl Default for CompactRadioStats {
    fn default() -> Self {
        CompactRadioStats {
            last_dbm: 0,
            last_dbm_video: 0,
            last_dbm_data: 0,
            last_recv_rate_bps: 0,
            last_recv_rate_video_bps: 0,
            last_recv_rate_data_bps: 0,
            total_rx_bytes: 0,
            total_tx_bytes: 0,
            rx_bytes_per_sec: 0,
            tx_bytes_per_sec: 0,
            total_rx_packets: 0,
            total_rx_packets_bad: 0,
            total_rx_packets_lost: 0,
            total_tx_packets: 0,
            rx_packets_per_sec: 0,
            tx_packets_per_sec: 0,
            time_last_rx_ms: 0,
            time_last_tx_ms: 0,
            time_now_ms: 0,
            rx_quality: 0,
            rx_relative_quality: 0,
            hist_rx_packets: [0; STATS_HISTORY_SLICES],
            hist_rx_lost: [0; STATS_HISTORY_SLICES],
            hist_rx_gap_ms: [0xFF; STATS_HISTORY_SLICES],
        }
    }
}

impl CompactRadioStats {
    /// Encoded size: 6 + 12 + 32 + 8 + 12 + 2 + 3 × history.
    pub const ENCODED_LEN: usize = 72 + 3 * STATS_HISTORY_SLICES;

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_i16(self.last_dbm);
        buf.put_i16(self.last_dbm_video);
        buf.put_i16(self.last_dbm_data);
        buf.put_i32(self.last_recv_rate_bps);
        buf.put_i32(self.last_recv_rate_video_bps);
        buf.put_i32(self.last_recv_rate_data_bps);
        buf.put_u32(self.total_rx_bytes);
        buf.put_u32(self.total_tx_bytes);
        buf.put_u32(self.rx_bytes_per_sec);
        buf.put_u32(self.tx_bytes_per_sec);
        buf.put_u32(self.total_rx_packets);
        buf.put_u32(self.total_rx_packets_bad);
        buf.put_u32(self.total_rx_packets_lost);
        buf.put_u32(self.total_tx_packets);
        buf.put_u32(self.rx_packets_per_sec);
        buf.put_u32(self.tx_packets_per_sec);
        buf.put_u32(self.time_last_rx_ms);
        buf.put_u32(self.time_last_tx_ms);
        buf.put_u32(self.time_now_ms);
        buf.put_u8(self.rx_quality);
        buf.put_i8(self.rx_relative_quality);
        buf.put_slice(&self.hist_rx_packets);
        buf.put_slice(&self.hist_rx_lost);
        buf.put_slice(&self.hist_rx_gap_ms);
    }

    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if buf.remaining() < Self::ENCODED_LEN {
            return None;
        }
        let mut rec = CompactRadioStats {
            last_dbm: buf.get_i16(),
            last_dbm_video: buf.get_i16(),
            last_dbm_data: buf.get_i16(),
            last_recv_rate_bps: buf.get_i32(),
            last_recv_rate_video_bps: buf.get_i32(),
            last_recv_rate_data_bps: buf.get_i32(),
            total_rx_bytes: buf.get_u32(),
            total_tx_bytes: buf.get_u32(),
            rx_bytes_per_sec: buf.get_u32(),
            tx_bytes_per_sec: buf.get_u32(),
            total_rx_packets: buf.get_u32(),
            total_rx_packets_bad: buf.get_u32(),
            total_rx_packets_lost: buf.get_u32(),
            total_tx_packets: buf.get_u32(),
            rx_packets_per_sec: buf.get_u32(),
            tx_packets_per_sec: buf.get_u32(),
            time_last_rx_ms: buf.get_u32(),
            time_last_tx_ms: buf.get_u32(),
            time_now_ms: buf.get_u32(),
            rx_quality: buf.get_u8(),
            rx_relative_quality: buf.get_i8(),
            hist_rx_packets: [0; STATS_HISTORY_SLICES],
            hist_rx_lost: [0; STATS_HISTORY_SLICES],
            hist_rx_gap_ms: [0; STATS_HISTORY_SLICES],
        };
        buf.copy_to_slice(&mut rec.hist_rx_packets);
        buf.copy_to_slice(&mut rec.hist_rx_lost);
        buf.copy_to_slice(&mut rec.hist_rx_gap_ms);
        Some(rec)
    }
}

// ─── Full Record ────────────────────────────────────────────────────────────

/// Everything the controller wants to know about one interface.
///
/// A superset of [`CompactRadioStats`] carrying the interface's identity
/// within the link topology alongside the quality core.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FullRadioStats {
    /// Interface index within the inventory.
    pub index: u8,
    /// Controller-local radio link id.
    pub local_link: u8,
    /// Vehicle-declared radio link id.
    pub vehicle_link: u8,
    pub opened_for_read: bool,
    pub opened_for_write: bool,
    /// Current tuned frequency, kHz.
    pub frequency_khz: u32,
    pub stats: CompactRadioStats,
}

impl FullRadioStats {
    /// Encoded size: 3 id bytes + 1 flags byte + 4 frequency + quality core.
    pub const ENCODED_LEN: usize = 8 + CompactRadioStats::ENCODED_LEN;

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.index);
        buf.put_u8(self.local_link);
        buf.put_u8(self.vehicle_link);
        let open_flags = (self.opened_for_read as u8) | ((self.opened_for_write as u8) << 1);
        buf.put_u8(open_flags);
        buf.put_u32(self.frequency_khz);
        self.stats.encode(buf);
    }

    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if buf.remaining() < Self::ENCODED_LEN {
            return None;
        }
        let index = buf.get_u8();
        let local_link = buf.get_u8();
        let vehicle_link = buf.get_u8();
        let open_flags = buf.get_u8();
        let frequency_khz = buf.get_u32();
        let stats = CompactRadioStats::decode(buf)?;
        Some(FullRadioStats {
            index,
            local_link,
            vehicle_link,
            opened_for_read: open_flags & 1 != 0,
            opened_for_write: open_flags & 2 != 0,
            frequency_khz,
            stats,
        })
    }
}
