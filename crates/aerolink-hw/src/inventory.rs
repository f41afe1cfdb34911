//! # Radio Interface Inventory
//!
//! The set of radio interfaces the station currently knows about. Two
//! classes of hardware live side by side: Wi-Fi packet radios that carry
//! the high-capacity video/data streams, and SiK-style serial telemetry
//! radios that carry a low-capacity data channel.
//!
//! Enumeration itself is host-specific (udev, sysfs, serial probing) and
//! lives outside this crate. The [`Inventory`] trait is the seam the
//! orchestrator consumes; [`StaticInventory`] is the straightforward
//! snapshot implementation hosts and tests use.

use serde::{Deserialize, Serialize};

use crate::flags::CardCapabilities;

// ─── Driver / Class ─────────────────────────────────────────────────────────

/// Wi-Fi driver family, as far as link management cares.
///
/// Only Atheros and Ralink drivers accept a per-card fixed bitrate; the
/// rest ignore rate hints and pick their own MCS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverFamily {
    Atheros,
    Ralink,
    Realtek,
    Other,
}

impl DriverFamily {
    pub fn is_rate_adjustable(&self) -> bool {
        matches!(self, DriverFamily::Atheros | DriverFamily::Ralink)
    }
}

/// Broad hardware class of an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RadioClass {
    /// SiK-style serial telemetry radio. Low capacity, reconfigured
    /// through an external flashing/config tool.
    Serial,
    /// Wi-Fi card in monitor/injection mode.
    PacketRadio(DriverFamily),
}

impl RadioClass {
    pub fn is_serial(&self) -> bool {
        matches!(self, RadioClass::Serial)
    }
}

// ─── Interface Record ───────────────────────────────────────────────────────

/// One enumerated radio interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioInterfaceInfo {
    /// Stable identifier: MAC address for packet radios, device path for
    /// serial radios. Used as the card-policy lookup key.
    pub id: String,
    /// OS-level interface name (`wlan0`, `/dev/ttyUSB0`).
    pub name: String,
    pub class: RadioClass,
    pub capabilities: CardCapabilities,
    /// Currently tuned frequency, kHz. Zero if unknown.
    pub frequency_khz: u32,
    /// Frequency ranges the hardware can tune to, kHz, inclusive.
    pub supported_bands_khz: Vec<(u32, u32)>,
}

impl RadioInterfaceInfo {
    /// Whether the hardware can tune to `khz`. An empty band list means
    /// the capability is unknown and any frequency is accepted.
    pub fn supports_frequency(&self, khz: u32) -> bool {
        if self.supported_bands_khz.is_empty() {
            return true;
        }
        self.supported_bands_khz
            .iter()
            .any(|&(lo, hi)| khz >= lo && khz <= hi)
    }
}

// ─── Inventory ──────────────────────────────────────────────────────────────

/// Read access to the enumerated interface set.
pub trait Inventory {
    fn interface_count(&self) -> usize;

    fn interface(&self, index: usize) -> Option<&RadioInterfaceInfo>;

    /// Whether any usable low-capacity (serial) interface is present.
    /// Gates whether compact stats reports are ever emitted.
    fn has_low_capacity_links(&self) -> bool {
        (0..self.interface_count()).any(|i| {
            self.interface(i)
                .map(|info| info.class.is_serial() && info.capabilities.usable())
                .unwrap_or(false)
        })
    }
}

/// Inventory snapshot backed by a plain vector.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    interfaces: Vec<RadioInterfaceInfo>,
}

impl StaticInventory {
    pub fn new(interfaces: Vec<RadioInterfaceInfo>) -> Self {
        StaticInventory { interfaces }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RadioInterfaceInfo> {
        self.interfaces.iter()
    }
}

impl Inventory for StaticInventory {
    fn interface_count(&self) -> usize {
        self.interfaces.len()
    }

    fn interface(&self, index: usize) -> Option<&RadioInterfaceInfo> {
        self.interfaces.get(index)
    }
}
