//! # Error Taxonomy
//!
//! Only [`SubsystemError`] aborts the caller's control flow. Individual
//! interface failures are recorded and logged; per-link degradation goes
//! out through the alarm sink; recovery exhaustion clears recovery state
//! and raises an alarm. Nothing here crosses the main-loop/worker-thread
//! boundary as a panic.

use thiserror::Error;

/// The subsystem cannot operate at all. Triggers a full close and
/// propagates "stop" to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubsystemError {
    /// Not a single interface could be opened for receive.
    #[error("no radio interface opened for receive")]
    NoRxInterfaces,
    /// The active firmware requires local transmit and no interface
    /// could be opened for it.
    #[error("no radio interface opened for transmit")]
    NoTxInterfaces,
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("unknown radio link {0}")]
    UnknownLink(usize),
    #[error(transparent)]
    Subsystem(#[from] SubsystemError),
}

/// Diagnostic record of the most recent interface open failure.
///
/// At most one is retained; it never aborts other interfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardInterfaceFailure {
    pub interface: usize,
    /// What was being opened when it failed ("read", "write", "serial", "aux").
    pub mode: &'static str,
    pub detail: String,
}
