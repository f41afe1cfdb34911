//! # Capability and Link Flags
//!
//! Bitflag newtypes shared between the interface inventory, the card
//! policy, and the vehicle link model. Kept as plain `u32` wrappers so
//! they serialize transparently in config files and travel unchanged
//! through pairing messages.

use serde::{Deserialize, Serialize};

// ─── Card Capabilities ──────────────────────────────────────────────────────

/// What an interface (or a vehicle link) is allowed to do.
///
/// The same flag word is used in two places: the inventory reports what
/// a card can physically do, and the vehicle model declares what each
/// link should be used for. The orchestrator intersects the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardCapabilities(pub u32);

impl CardCapabilities {
    pub const DISABLED: u32 = 1 << 0;
    pub const CAN_RX: u32 = 1 << 1;
    pub const CAN_TX: u32 = 1 << 2;
    pub const USE_FOR_DATA: u32 = 1 << 3;
    pub const USE_FOR_VIDEO: u32 = 1 << 4;
    pub const RELAY_ONLY: u32 = 1 << 5;

    /// Full-duplex card carrying both data and video.
    pub fn rx_tx_data_video() -> Self {
        CardCapabilities(Self::CAN_RX | Self::CAN_TX | Self::USE_FOR_DATA | Self::USE_FOR_VIDEO)
    }

    /// Full-duplex card carrying data only (the serial radio default).
    pub fn rx_tx_data() -> Self {
        CardCapabilities(Self::CAN_RX | Self::CAN_TX | Self::USE_FOR_DATA)
    }

    pub fn is_disabled(&self) -> bool {
        self.0 & Self::DISABLED != 0
    }

    pub fn can_rx(&self) -> bool {
        self.0 & Self::CAN_RX != 0
    }

    pub fn can_tx(&self) -> bool {
        self.0 & Self::CAN_TX != 0
    }

    pub fn use_for_data(&self) -> bool {
        self.0 & Self::USE_FOR_DATA != 0
    }

    pub fn use_for_video(&self) -> bool {
        self.0 & Self::USE_FOR_VIDEO != 0
    }

    pub fn is_relay_only(&self) -> bool {
        self.0 & Self::RELAY_ONLY != 0
    }

    /// Whether the card participates in any traffic at all.
    pub fn usable(&self) -> bool {
        !self.is_disabled() && (self.can_rx() || self.can_tx())
    }

    pub fn with(mut self, bits: u32) -> Self {
        self.0 |= bits;
        self
    }

    pub fn without(mut self, bits: u32) -> Self {
        self.0 &= !bits;
        self
    }
}

// ─── Radio Link Flags ───────────────────────────────────────────────────────

/// Per-link tuning flags declared by the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RadioLinkFlags(pub u32);

impl RadioLinkFlags {
    /// Use a 40 MHz channel instead of 20 MHz (Wi-Fi links only).
    pub const HT40: u32 = 1 << 0;
    /// Enable error-correcting coding on SiK radios.
    pub const SIK_ECC: u32 = 1 << 1;
    /// Enable listen-before-talk on SiK radios.
    pub const SIK_LBT: u32 = 1 << 2;
    /// Enable Manchester encoding training on SiK radios.
    pub const SIK_MCSTR: u32 = 1 << 3;

    pub fn uses_ht40(&self) -> bool {
        self.0 & Self::HT40 != 0
    }

    pub fn sik_ecc(&self) -> bool {
        self.0 & Self::SIK_ECC != 0
    }

    pub fn sik_lbt(&self) -> bool {
        self.0 & Self::SIK_LBT != 0
    }

    pub fn sik_mcs_training(&self) -> bool {
        self.0 & Self::SIK_MCSTR != 0
    }

    pub fn with(mut self, bits: u32) -> Self {
        self.0 |= bits;
        self
    }
}
