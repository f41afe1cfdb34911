//! # SiK Serial Radio Parameters
//!
//! Parameter set applied to SiK-family serial telemetry radios, plus the
//! air-rate validation table. Applying parameters goes through an
//! external configuration tool and can take seconds, which is why the
//! router drives it from a worker thread; the [`SikConfigurator`] trait
//! is that seam.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Air data rates the SiK firmware accepts, bps.
pub const SIK_AIR_RATES: [u32; 13] = [
    2_000, 4_000, 8_000, 16_000, 19_200, 24_000, 32_000, 48_000, 64_000, 96_000, 128_000, 192_000,
    250_000,
];

/// Rate substituted when a requested rate is not in [`SIK_AIR_RATES`].
pub const DEFAULT_SIK_AIR_RATE: u32 = 64_000;

pub const DEFAULT_SIK_TX_POWER: u8 = 11;
pub const DEFAULT_SIK_NET_ID: u8 = 25;
pub const DEFAULT_SIK_CHANNELS: u8 = 5;
pub const DEFAULT_SIK_FREQ_SPREAD_KHZ: u32 = 1_000;

pub fn is_supported_air_rate(bps: u32) -> bool {
    SIK_AIR_RATES.contains(&bps)
}

/// Clamp a requested air rate to the supported table.
///
/// Rates the firmware does not accept would brick the link, so an
/// unsupported request falls back to [`DEFAULT_SIK_AIR_RATE`] with a
/// warning rather than failing the reconfiguration.
pub fn sanitize_air_rate(requested_bps: u32) -> u32 {
    if is_supported_air_rate(requested_bps) {
        requested_bps
    } else {
        tracing::warn!(
            requested_bps,
            fallback_bps = DEFAULT_SIK_AIR_RATE,
            "unsupported SiK air rate requested, using default"
        );
        DEFAULT_SIK_AIR_RATE
    }
}

// ─── Parameters ─────────────────────────────────────────────────────────────

/// Full parameter set pushed to a SiK radio in one tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SikParams {
    /// Base frequency, kHz.
    pub frequency_khz: u32,
    /// Hopping span above the base frequency, kHz.
    pub freq_spread_khz: u32,
    /// Number of hopping channels.
    pub channels: u8,
    /// Network id shared by both ends of the link.
    pub net_id: u8,
    /// Air data rate, bps. Must be one of [`SIK_AIR_RATES`].
    pub air_rate_bps: u32,
    /// Transmit power, dBm.
    pub tx_power: u8,
    pub ecc: bool,
    pub lbt: bool,
    pub mcs_training: bool,
}

impl Default for SikParams {
    fn default() -> Self {
        SikParams {
            frequency_khz: 0,
            freq_spread_khz: DEFAULT_SIK_FREQ_SPREAD_KHZ,
            channels: DEFAULT_SIK_CHANNELS,
            net_id: DEFAULT_SIK_NET_ID,
            air_rate_bps: DEFAULT_SIK_AIR_RATE,
            tx_power: DEFAULT_SIK_TX_POWER,
            ecc: false,
            lbt: false,
            mcs_training: false,
        }
    }
}

// ─── Configurator ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SikError {
    #[error("serial radio did not respond to command mode")]
    NotResponding,
    #[error("radio rejected parameters: {0}")]
    Rejected(String),
    #[error("configuration tool failed: {0}")]
    Tool(String),
}

/// Applies SiK parameters to a serial radio.
///
/// Implementations shell out to the radio configuration tool and block
/// until it finishes, so calls belong on a worker thread.
pub trait SikConfigurator: Send + Sync {
    /// Push `params` to the radio behind interface `index`. The port
    /// must be closed for normal traffic before calling.
    fn set_params(&self, index: usize, params: &SikParams) -> Result<(), SikError>;

    /// Re-enumerate serial devices after a failed configuration, in case
    /// the device node changed.
    fn reenumerate(&self) -> Result<(), SikError>;
}
