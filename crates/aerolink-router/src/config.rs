//! Router timing configuration, loadable from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Timing knobs for the periodic loop. Every field has a sane default;
/// a partial config file only overrides what it names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Stats refresh interval, ms. Per-second rates are recomputed on
    /// this cadence.
    pub stats_refresh_ms: u64,
    /// Graph history slice interval, ms. Also bounds how often stats
    /// packets go out.
    pub graph_refresh_ms: u64,
    /// Recovery recheck interval floor, ms.
    pub recovery_floor_ms: u64,
    /// Added to the recheck interval after each recovery attempt, ms.
    pub recovery_step_ms: u64,
    /// Recovery attempts before giving up on a break event.
    pub recovery_max_attempts: u32,
    /// Grace period after the external SiK tool starts before its
    /// completion is checked, ms.
    pub tool_grace_ms: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            stats_refresh_ms: 500,
            graph_refresh_ms: 100,
            recovery_floor_ms: 500,
            recovery_step_ms: 200,
            recovery_max_attempts: 3,
            tool_grace_ms: 500,
        }
    }
}

impl RouterConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&text)?)
    }
}
