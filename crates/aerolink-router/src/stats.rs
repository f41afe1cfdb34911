//! # Radio Stats Table & Broadcaster
//!
//! The stats table holds one live record per interface, updated in place
//! by the RX/TX collaborators and never reallocated. The broadcaster
//! snapshots it on a throttled cadence into two wire packets: a full
//! multi-interface report for high-capacity links and a compact
//! single-interface report round-robined over interfaces for serial
//! telemetry links.

use bytes::{BufMut, Bytes, BytesMut};

use aerolink_hw::{Inventory, RadioClass, VehicleModel};
use aerolink_wire::header::{
    RadioPacketHeader, MAX_PACKET_PAYLOAD, PACKET_TYPE_RADIO_STATS_COMPACT,
    PACKET_TYPE_RADIO_STATS_FULL,
};
use aerolink_wire::stats::{CompactRadioStats, FullRadioStats, STATS_HISTORY_SLICES};

use crate::assignment::LinkAssignmentTable;
use crate::config::RouterConfig;

/// Outbound packet queue. Fire-and-forget: the broadcaster never learns
/// whether a packet made it out.
pub trait PacketQueue {
    fn enqueue(&mut self, packet: Bytes);
}

// ─── Stats Table ────────────────────────────────────────────────────────────

/// Live stats for one interface plus the accumulators behind the
/// derived fields.
#[derive(Debug, Clone, Default)]
pub struct InterfaceStats {
    pub record: CompactRadioStats,
    pub frequency_khz: u32,
    rx_bytes_at_refresh: u32,
    tx_bytes_at_refresh: u32,
    rx_packets_at_refresh: u32,
    tx_packets_at_refresh: u32,
    rx_lost_at_refresh: u32,
    slice_rx_packets: u32,
    slice_rx_lost: u32,
    slice_max_gap_ms: u32,
}

/// Per-interface live counters, refreshed on a fixed cadence.
///
/// Update methods are called continuously by the RX/TX paths;
/// `periodic_update` derives per-second rates and advances the history
/// slices. All of it runs on the main loop, except `set_frequency`
/// which the recovery path also calls after a successful reconfigure.
#[derive(Debug)]
pub struct RadioStatsTable {
    entries: Vec<InterfaceStats>,
    refresh_interval_ms: u64,
    graph_interval_ms: u64,
    last_refresh_ms: Option<u64>,
    last_graph_ms: Option<u64>,
}

impl RadioStatsTable {
    pub fn new(interface_count: usize, config: &RouterConfig) -> Self {
        RadioStatsTable {
            entries: vec![InterfaceStats::default(); interface_count],
            refresh_interval_ms: config.stats_refresh_ms.max(1),
            graph_interval_ms: config.graph_refresh_ms.max(1),
            last_refresh_ms: None,
            last_graph_ms: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, interface: usize) -> Option<&InterfaceStats> {
        self.entries.get(interface)
    }

    pub fn entry_mut(&mut self, interface: usize) -> Option<&mut InterfaceStats> {
        self.entries.get_mut(interface)
    }

    pub fn frequency_khz(&self, interface: usize) -> u32 {
        self.entries
            .get(interface)
            .map(|e| e.frequency_khz)
            .unwrap_or(0)
    }

    pub fn set_frequency(&mut self, interface: usize, khz: u32) {
        if let Some(e) = self.entries.get_mut(interface) {
            e.frequency_khz = khz;
        }
    }

    pub fn on_rx_packet(&mut self, interface: usize, bytes: u32, dbm: i16, now_ms: u64) {
        let gap_start = self
            .entries
            .get(interface)
            .map(|e| e.record.time_last_rx_ms)
            .unwrap_or(0);
        if let Some(e) = self.entries.get_mut(interface) {
            e.record.total_rx_bytes = e.record.total_rx_bytes.wrapping_add(bytes);
            e.record.total_rx_packets = e.record.total_rx_packets.wrapping_add(1);
            e.record.last_dbm = dbm;
            e.record.time_last_rx_ms = now_ms as u32;
            e.slice_rx_packets += 1;
            let gap = (now_ms as u32).saturating_sub(gap_start);
            e.slice_max_gap_ms = e.slice_max_gap_ms.max(gap);
        }
    }

    pub fn on_rx_lost(&mut self, interface: usize, count: u32) {
        if let Some(e) = self.entries.get_mut(interface) {
            e.record.total_rx_packets_lost = e.record.total_rx_packets_lost.wrapping_add(count);
            e.slice_rx_lost += count;
        }
    }

    pub fn on_rx_bad(&mut self, interface: usize) {
        if let Some(e) = self.entries.get_mut(interface) {
            e.record.total_rx_packets_bad = e.record.total_rx_packets_bad.wrapping_add(1);
        }
    }

    pub fn on_tx_packet(&mut self, interface: usize, bytes: u32, now_ms: u64) {
        if let Some(e) = self.entries.get_mut(interface) {
            e.record.total_tx_bytes = e.record.total_tx_bytes.wrapping_add(bytes);
            e.record.total_tx_packets = e.record.total_tx_packets.wrapping_add(1);
            e.record.time_last_tx_ms = now_ms as u32;
        }
    }

    /// Recompute per-second rates on the refresh interval and advance
    /// the history slices on the graph interval. Returns whether a rate
    /// refresh happened this call.
    pub fn periodic_update(&mut self, now_ms: u64) -> bool {
        let mut refreshed = false;

        let due_refresh = match self.last_refresh_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.refresh_interval_ms,
        };
        if due_refresh {
            let elapsed_ms = self
                .last_refresh_ms
                .map(|last| now_ms.saturating_sub(last))
                .unwrap_or(self.refresh_interval_ms)
                .max(1);
            for e in &mut self.entries {
                let rate = |total: u32, at: u32| -> u32 {
                    (total.wrapping_sub(at) as u64 * 1000 / elapsed_ms) as u32
                };
                e.record.rx_bytes_per_sec = rate(e.record.total_rx_bytes, e.rx_bytes_at_refresh);
                e.record.tx_bytes_per_sec = rate(e.record.total_tx_bytes, e.tx_bytes_at_refresh);
                e.record.rx_packets_per_sec =
                    rate(e.record.total_rx_packets, e.rx_packets_at_refresh);
                e.record.tx_packets_per_sec =
                    rate(e.record.total_tx_packets, e.tx_packets_at_refresh);

                let got = e.record.total_rx_packets.wrapping_sub(e.rx_packets_at_refresh);
                let lost = e
                    .record
                    .total_rx_packets_lost
                    .wrapping_sub(e.rx_lost_at_refresh);
                if got + lost > 0 {
                    e.record.rx_quality = (got as u64 * 100 / (got + lost) as u64) as u8;
                }

                e.rx_bytes_at_refresh = e.record.total_rx_bytes;
                e.tx_bytes_at_refresh = e.record.total_tx_bytes;
                e.rx_packets_at_refresh = e.record.total_rx_packets;
                e.tx_packets_at_refresh = e.record.total_tx_packets;
                e.rx_lost_at_refresh = e.record.total_rx_packets_lost;
            }

            // Relative quality compares each interface against the best.
            let best = self
                .entries
                .iter()
                .map(|e| e.record.rx_quality)
                .max()
                .unwrap_or(0);
            for e in &mut self.entries {
                e.record.rx_relative_quality = e.record.rx_quality as i8 - best as i8;
            }

            self.last_refresh_ms = Some(now_ms);
            refreshed = true;
        }

        let due_graph = match self.last_graph_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.graph_interval_ms,
        };
        if due_graph {
            for e in &mut self.entries {
                // Newest slice at index 0, oldest falls off the end.
                e.record.hist_rx_packets.copy_within(0..STATS_HISTORY_SLICES - 1, 1);
                e.record.hist_rx_lost.copy_within(0..STATS_HISTORY_SLICES - 1, 1);
                e.record.hist_rx_gap_ms.copy_within(0..STATS_HISTORY_SLICES - 1, 1);
                e.record.hist_rx_packets[0] = e.slice_rx_packets.min(255) as u8;
                e.record.hist_rx_lost[0] = e.slice_rx_lost.min(255) as u8;
                e.record.hist_rx_gap_ms[0] = if e.slice_rx_packets == 0 {
                    0xFF
                } else {
                    e.slice_max_gap_ms.min(254) as u8
                };
                e.slice_rx_packets = 0;
                e.slice_rx_lost = 0;
                e.slice_max_gap_ms = 0;
            }
            self.last_graph_ms = Some(now_ms);
        }

        refreshed
    }
}

// ─── Broadcaster ────────────────────────────────────────────────────────────

/// Floor on how often stats packets go out, regardless of configuration.
pub const STATS_SEND_FLOOR_MS: u64 = 100;

/// Serializes the stats table into wire packets on a throttled cadence.
#[derive(Debug)]
pub struct StatsBroadcaster {
    source_id: u32,
    destination_id: u32,
    send_interval_ms: u64,
    last_send_ms: Option<u64>,
    compact_next_interface: usize,
}

impl StatsBroadcaster {
    pub fn new(source_id: u32, destination_id: u32, config: &RouterConfig) -> Self {
        let send_interval_ms = config
            .stats_refresh_ms
            .min(config.graph_refresh_ms)
            .max(STATS_SEND_FLOOR_MS);
        StatsBroadcaster {
            source_id,
            destination_id,
            send_interval_ms,
            last_send_ms: None,
            compact_next_interface: 0,
        }
    }

    pub fn send_interval_ms(&self) -> u64 {
        self.send_interval_ms
    }

    /// One broadcast tick: refresh derived rate fields from the bound
    /// model, then enqueue the full packet (high-capacity links) and,
    /// when a low-capacity link exists, one compact packet.
    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        now_ms: u64,
        inventory: &dyn Inventory,
        model: Option<&VehicleModel>,
        assignment: &LinkAssignmentTable,
        stats: &mut RadioStatsTable,
        queue: &mut dyn PacketQueue,
    ) {
        if let Some(last) = self.last_send_ms {
            if now_ms.saturating_sub(last) < self.send_interval_ms {
                return;
            }
        }
        self.last_send_ms = Some(now_ms);

        self.refresh_derived_rates(inventory, model, assignment, stats);
        for i in 0..stats.len() {
            if let Some(e) = stats.entry_mut(i) {
                e.record.time_now_ms = now_ms as u32;
            }
        }

        self.send_full(inventory, assignment, stats, queue);
        if inventory.has_low_capacity_links() && !stats.is_empty() {
            self.send_compact(stats, queue);
        }
    }

    /// Derived receive-rate fields come from configuration, not
    /// measurement: serial radios report their configured air rate, and
    /// links pinned to a fixed MCS for video split the configured rates
    /// into data and video components.
    fn refresh_derived_rates(
        &self,
        inventory: &dyn Inventory,
        model: Option<&VehicleModel>,
        assignment: &LinkAssignmentTable,
        stats: &mut RadioStatsTable,
    ) {
        let Some(model) = model else {
            return;
        };
        for i in 0..stats.len() {
            let Some(link) = assignment
                .entry(i)
                .and_then(|e| model.link(e.vehicle_link as usize))
            else {
                continue;
            };
            let is_serial = inventory
                .interface(i)
                .map(|info| info.class == RadioClass::Serial)
                .unwrap_or(false);
            let Some(e) = stats.entry_mut(i) else {
                continue;
            };
            if is_serial {
                e.record.last_recv_rate_bps = link.datarate_data_bps;
                e.record.last_recv_rate_data_bps = link.datarate_data_bps;
                e.record.last_recv_rate_video_bps = 0;
            } else if link.datarate_video_bps < 0 {
                // A fixed MCS pin dominates the link, so it is also the
                // overall rate.
                e.record.last_recv_rate_bps = link.datarate_video_bps;
                e.record.last_recv_rate_video_bps = link.datarate_video_bps;
                e.record.last_recv_rate_data_bps = link.datarate_data_bps;
            }
        }
    }

    fn send_full(
        &self,
        _inventory: &dyn Inventory,
        assignment: &LinkAssignmentTable,
        stats: &RadioStatsTable,
        queue: &mut dyn PacketQueue,
    ) {
        let count = stats.len().min(u8::MAX as usize);
        let payload_len = 1 + count * FullRadioStats::ENCODED_LEN;
        if payload_len > MAX_PACKET_PAYLOAD {
            // No fragmentation at this layer; skip the tick entirely.
            tracing::debug!(payload_len, "full stats packet exceeds payload budget, skipping");
            return;
        }

        let total_len = RadioPacketHeader::ENCODED_LEN + payload_len;
        let header =
            RadioPacketHeader::telemetry(PACKET_TYPE_RADIO_STATS_FULL, self.source_id, self.destination_id)
                .high_capacity_only()
                .with_total_length(total_len);

        let mut buf = BytesMut::with_capacity(total_len);
        header.encode(&mut buf);
        buf.put_u8(count as u8);
        for i in 0..count {
            let entry = stats.entry(i).cloned().unwrap_or_default();
            let assigned = assignment.entry(i).copied().unwrap_or_default();
            let rec = FullRadioStats {
                index: i as u8,
                local_link: assigned.local_link,
                vehicle_link: assigned.vehicle_link,
                opened_for_read: assigned.opened_for_read,
                opened_for_write: assigned.opened_for_write,
                frequency_khz: entry.frequency_khz,
                stats: entry.record,
            };
            rec.encode(&mut buf);
        }
        queue.enqueue(buf.freeze());
    }

    fn send_compact(&mut self, stats: &RadioStatsTable, queue: &mut dyn PacketQueue) {
        let interface = self.compact_next_interface % stats.len();
        // Advanced whenever this branch runs, whether or not the packet
        // survives the queue.
        self.compact_next_interface = (interface + 1) % stats.len();

        let Some(entry) = stats.entry(interface) else {
            return;
        };
        let payload_len = 1 + CompactRadioStats::ENCODED_LEN;
        let total_len = RadioPacketHeader::ENCODED_LEN + payload_len;
        let header = RadioPacketHeader::telemetry(
            PACKET_TYPE_RADIO_STATS_COMPACT,
            self.source_id,
            self.destination_id,
        )
        .low_capacity_only()
        .with_total_length(total_len);

        let mut buf = BytesMut::with_capacity(total_len);
        header.encode(&mut buf);
        buf.put_u8(interface as u8);
        entry.record.encode(&mut buf);
        queue.enqueue(buf.freeze());
    }
}
