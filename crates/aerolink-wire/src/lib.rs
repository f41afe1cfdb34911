//! # aerolink-wire
//!
//! Wire format for the AeroLink radio link layer.
//!
//! Every packet that travels over a radio link carries the fixed-size
//! [`header::RadioPacketHeader`]; periodic link-quality reports are encoded
//! as the fixed-size records in [`stats`]: a full multi-interface record
//! for high-capacity links and a compact single-interface record small
//! enough for serial telemetry radios.
//!
//! All records are built by field-by-field copy with explicit widths,
//! never by memory layout, so the format survives struct reordering and
//! cross-platform padding differences.

pub mod header;
pub mod stats;

pub use header::{RadioPacketHeader, MAX_PACKET_PAYLOAD, MAX_PACKET_TOTAL_SIZE};
pub use stats::{CompactRadioStats, FullRadioStats, STATS_HISTORY_SLICES};
