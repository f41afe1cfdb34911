//! # AeroLink Hardware Model
//!
//! Descriptions of the radio hardware an AeroLink station works with:
//! the interface inventory (serial telemetry radios and Wi-Fi packet
//! radios), capability flags, SiK serial radio parameters, the
//! operator's per-card policy overrides, and the vehicle link model
//! negotiated at pairing time.
//!
//! This crate is pure data and policy. Actually opening, tuning, or
//! reconfiguring hardware lives behind traits in `aerolink-router`.

pub mod flags;
pub mod inventory;
pub mod model;
pub mod policy;
pub mod sik;

pub use flags::{CardCapabilities, RadioLinkFlags};
pub use inventory::{DriverFamily, Inventory, RadioClass, RadioInterfaceInfo, StaticInventory};
pub use model::{FirmwareKind, RadioLinkParams, VehicleModel};
pub use policy::{CardOverride, CardPolicy};
pub use sik::{SikConfigurator, SikError, SikParams, DEFAULT_SIK_AIR_RATE, SIK_AIR_RATES};
