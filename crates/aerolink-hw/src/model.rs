//! # Vehicle Link Model
//!
//! What the paired vehicle declared about its radio links: how many
//! there are, what each one carries, on which frequency, and at which
//! rates. The orchestrator maps local interfaces onto these links when
//! opening for operation.

use serde::{Deserialize, Serialize};

use crate::flags::{CardCapabilities, RadioLinkFlags};
use crate::sik::{sanitize_air_rate, SikParams};

// ─── Firmware ───────────────────────────────────────────────────────────────

/// Flavor of firmware running on the vehicle's radios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FirmwareKind {
    /// Native AeroLink firmware. Uplink goes out through local packet
    /// radios, so at least one TX-capable interface is mandatory.
    Native,
    /// Third-party firmware reached through a side-band telemetry
    /// channel. Reads arrive tagged with the channel id and the station
    /// can operate without any local TX interface.
    SideBand,
}

impl FirmwareKind {
    pub fn requires_local_tx(&self) -> bool {
        matches!(self, FirmwareKind::Native)
    }

    pub fn uses_side_band(&self) -> bool {
        matches!(self, FirmwareKind::SideBand)
    }
}

// ─── Link Parameters ────────────────────────────────────────────────────────

/// One radio link as the vehicle declared it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioLinkParams {
    /// What the link carries. A link flagged disabled here is skipped
    /// even if local hardware could serve it.
    pub capabilities: CardCapabilities,
    pub flags: RadioLinkFlags,
    /// Link frequency, kHz.
    pub frequency_khz: u32,
    /// Downlink data rate, bps. Negative values are fixed MCS indices.
    pub datarate_data_bps: i32,
    /// Downlink video rate, bps. Negative values are fixed MCS indices.
    pub datarate_video_bps: i32,
    /// Uplink data rate, bps. Zero means reuse the downlink data rate.
    pub uplink_datarate_bps: i32,
}

impl Default for RadioLinkParams {
    fn default() -> Self {
        RadioLinkParams {
            capabilities: CardCapabilities::rx_tx_data_video(),
            flags: RadioLinkFlags::default(),
            frequency_khz: 0,
            datarate_data_bps: 0,
            datarate_video_bps: 0,
            uplink_datarate_bps: 0,
        }
    }
}

impl RadioLinkParams {
    /// Effective uplink rate after the zero-means-downlink fallback.
    pub fn effective_uplink_bps(&self) -> i32 {
        if self.uplink_datarate_bps != 0 {
            self.uplink_datarate_bps
        } else {
            self.datarate_data_bps
        }
    }
}

// ─── Vehicle Model ──────────────────────────────────────────────────────────

/// Radio-link view of the paired vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleModel {
    pub vehicle_id: u32,
    pub firmware: FirmwareKind,
    /// Links indexed by vehicle link id.
    pub links: Vec<RadioLinkParams>,
    /// Local interface index to vehicle link id. `None` means the
    /// interface is unassigned and stays closed.
    pub interface_links: Vec<Option<usize>>,
    /// Transmit power for SiK radios, dBm.
    pub sik_tx_power: u8,
    /// Packet size the transmit scheduler uses on SiK links.
    pub sik_packet_size: usize,
}

impl VehicleModel {
    pub fn link(&self, id: usize) -> Option<&RadioLinkParams> {
        self.links.get(id)
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Vehicle link id assigned to a local interface, if any.
    pub fn interface_link(&self, interface: usize) -> Option<usize> {
        self.interface_links.get(interface).copied().flatten()
    }

    /// Resolve the SiK parameter set for the link a serial interface is
    /// assigned to.
    ///
    /// When the interface has no assigned link, or the link carries no
    /// usable frequency, `fallback_frequency_khz` (the radio's current
    /// tuning) keeps the link alive on defaults. Unsupported air rates
    /// are replaced with the firmware default rather than rejected.
    pub fn resolve_sik_params(
        &self,
        interface: usize,
        fallback_frequency_khz: u32,
    ) -> SikParams {
        let link = self.interface_link(interface).and_then(|id| self.link(id));

        let mut params = SikParams {
            tx_power: self.sik_tx_power,
            ..SikParams::default()
        };

        match link {
            Some(link) => {
                params.frequency_khz = if link.frequency_khz != 0 {
                    link.frequency_khz
                } else {
                    fallback_frequency_khz
                };
                params.air_rate_bps = sanitize_air_rate(link.datarate_data_bps.max(0) as u32);
                params.ecc = link.flags.sik_ecc();
                params.lbt = link.flags.sik_lbt();
                params.mcs_training = link.flags.sik_mcs_training();
            }
            None => {
                params.frequency_khz = fallback_frequency_khz;
            }
        }
        params
    }
}

impl Default for VehicleModel {
    fn default() -> Self {
        VehicleModel {
            vehicle_id: 0,
            firmware: FirmwareKind::Native,
            links: Vec::new(),
            interface_links: Vec::new(),
            sik_tx_power: crate::sik::DEFAULT_SIK_TX_POWER,
            sik_packet_size: 64,
        }
    }
}
