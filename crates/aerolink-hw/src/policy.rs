//! # Card Policy
//!
//! Operator overrides layered on top of the vehicle model, keyed by
//! interface id. Lets a ground station disable a flaky card, restrict a
//! card to one direction, or pin a card to a fixed bitrate regardless of
//! what the vehicle asks for. Loaded from a TOML file next to the rest
//! of the station configuration.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flags::CardCapabilities;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse policy file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Overrides for a single card.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CardOverride {
    /// Keep the card closed entirely.
    pub disabled: bool,
    /// Replace the capability flags the inventory reported.
    pub capabilities: Option<CardCapabilities>,
    /// Pin the uplink bitrate, bps. Negative values are MCS indices.
    pub forced_uplink_bps: Option<i32>,
}

/// All per-card overrides, keyed by interface id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardPolicy {
    #[serde(default)]
    cards: HashMap<String, CardOverride>,
}

impl CardPolicy {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, PolicyError> {
        Ok(toml::from_str(text)?)
    }

    pub fn is_card_disabled(&self, id: &str) -> bool {
        self.cards.get(id).map(|c| c.disabled).unwrap_or(false)
    }

    /// Capability flags for a card: the override if one exists, the
    /// inventory's flags otherwise.
    pub fn card_capabilities(&self, id: &str, reported: CardCapabilities) -> CardCapabilities {
        self.cards
            .get(id)
            .and_then(|c| c.capabilities)
            .unwrap_or(reported)
    }

    pub fn forced_uplink_bps(&self, id: &str) -> Option<i32> {
        self.cards.get(id).and_then(|c| c.forced_uplink_bps)
    }

    pub fn set_override(&mut self, id: impl Into<String>, card: CardOverride) {
        self.cards.insert(id.into(), card);
    }
}
