//! # AeroLink Radio Router
//!
//! The radio link orchestration core of an AeroLink station. It owns the
//! interface-to-link assignment table, the open/close state machine for
//! heterogeneous radio hardware, the SiK serial-radio recovery protocol,
//! the auxiliary telemetry channel poller, and the periodic stats
//! aggregation that feeds link-quality reports back over the link itself.
//!
//! A single-threaded periodic loop drives everything here. The one
//! exception is SiK recovery: hardware reconfiguration takes hundreds of
//! milliseconds, so it runs on a dedicated worker thread (at most one at
//! a time) and reports back over a channel the main loop drains on its
//! next tick.
//!
//! Hardware access sits behind the [`RadioBackend`], [`TxScheduler`],
//! `SikConfigurator` and [`SikToolWatch`] traits; this crate never
//! touches a device directly.

pub mod alarm;
pub mod assignment;
pub mod aux_poll;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod recovery;
pub mod router;
pub mod stats;

pub use alarm::{Alarm, AlarmSink};
pub use assignment::{InterfaceAssignment, LinkAssignmentTable};
pub use aux_poll::AuxChannelPoller;
pub use config::RouterConfig;
pub use error::{HardInterfaceFailure, OrchestratorError, SubsystemError};
pub use orchestrator::{
    CaptureMode, OpenSummary, RadioBackend, RadioOrchestrator, SearchParams, TxScheduler,
};
pub use recovery::{RetryBackoff, SikRecoveryState, SikToolWatch, WorkerReport};
pub use router::{RadioRouter, RouterDeps};
pub use stats::{PacketQueue, RadioStatsTable, StatsBroadcaster};
