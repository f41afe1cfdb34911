//! # SiK Recovery Protocol
//!
//! Serial radios break in ways only a reconfiguration or a full
//! re-enumeration fixes, and both take far too long for the control
//! loop. The recovery state machine schedules exactly one worker thread
//! at a time, retries with a growing recheck interval, and gives up
//! after a bounded number of attempts.
//!
//! The worker communicates exclusively through its result channel. The
//! main loop drains the channel on its next tick; every other field of
//! shared state stays main-loop-owned.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver, TryRecvError};

use aerolink_hw::{SikConfigurator, SikParams, VehicleModel};

use crate::alarm::{Alarm, AlarmSink};
use crate::config::RouterConfig;
use crate::orchestrator::{RadioBackend, RadioOrchestrator};
use crate::stats::RadioStatsTable;

// ─── Backoff Policy ─────────────────────────────────────────────────────────

/// Bounded retry with a monotonically growing recheck interval.
///
/// The interval only grows while recovery is outstanding and snaps back
/// to the floor when recovery completes or is abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryBackoff {
    attempts: u32,
    max_attempts: u32,
    interval_ms: u64,
    floor_ms: u64,
    step_ms: u64,
}

impl RetryBackoff {
    pub fn new(max_attempts: u32, floor_ms: u64, step_ms: u64) -> Self {
        RetryBackoff {
            attempts: 0,
            max_attempts,
            interval_ms: floor_ms,
            floor_ms,
            step_ms,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    pub fn note_attempt(&mut self) {
        self.attempts += 1;
        self.interval_ms += self.step_ms;
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
        self.interval_ms = self.floor_ms;
    }
}

// ─── Requests / Reports ─────────────────────────────────────────────────────

/// What kind of recovery the main loop asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecoveryRequest {
    /// Push fresh parameters to one specific serial radio.
    ReconfigureInterface(usize),
    /// Re-probe all serial radios generically.
    ReinitializeAll,
}

/// Everything the worker needs, resolved on the main loop at spawn time
/// so the thread never reads shared configuration.
#[derive(Debug, Clone)]
struct RecoveryJob {
    target: Option<usize>,
    params: SikParams,
}

/// Outcome a worker sends back before exiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerReport {
    Reconfigured { interface: usize, frequency_khz: u32 },
    Reinitialized,
    Failed { interface: Option<usize>, error: String },
}

/// Observes the external SiK configuration tool: whether its process is
/// still alive, and the numeric result it left behind on completion
/// (consuming the marker).
pub trait SikToolWatch {
    fn tool_running(&mut self) -> bool;
    fn take_result(&mut self) -> Option<i32>;
}

// ─── State Machine ──────────────────────────────────────────────────────────

/// Process-wide recovery state. One instance, owned by the main loop.
#[derive(Debug)]
pub struct SikRecoveryState {
    request: Option<RecoveryRequest>,
    broken_interface: Option<usize>,
    tool_pending: bool,
    tool_started_ms: u64,
    tool_grace_ms: u64,
    backoff: RetryBackoff,
    last_schedule_ms: Option<u64>,
    worker: Option<(JoinHandle<()>, Receiver<WorkerReport>)>,
}

impl SikRecoveryState {
    pub fn new(config: &RouterConfig) -> Self {
        SikRecoveryState {
            request: None,
            broken_interface: None,
            tool_pending: false,
            tool_started_ms: 0,
            tool_grace_ms: config.tool_grace_ms,
            backoff: RetryBackoff::new(
                config.recovery_max_attempts,
                config.recovery_floor_ms,
                config.recovery_step_ms,
            ),
            last_schedule_ms: None,
            worker: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.request.is_none() && !self.tool_pending && self.worker.is_none()
    }

    pub fn worker_active(&self) -> bool {
        self.worker.is_some()
    }

    pub fn attempts(&self) -> u32 {
        self.backoff.attempts()
    }

    pub fn pending_target(&self) -> Option<usize> {
        match self.request {
            Some(RecoveryRequest::ReconfigureInterface(i)) => Some(i),
            _ => None,
        }
    }

    pub fn reinit_all_requested(&self) -> bool {
        matches!(self.request, Some(RecoveryRequest::ReinitializeAll))
    }

    /// Ask for fresh parameters on one serial radio.
    pub fn request_reconfigure(&mut self, interface: usize) {
        if self.request.is_none() {
            tracing::info!(interface, "SiK reconfiguration requested");
        }
        self.request = Some(RecoveryRequest::ReconfigureInterface(interface));
    }

    /// Ask for a generic re-probe of all serial radios after a break.
    pub fn request_reinit_all(&mut self, broken_interface: Option<usize>) {
        if self.request.is_none() {
            tracing::info!(?broken_interface, "SiK reinitialization requested");
        }
        self.request = Some(RecoveryRequest::ReinitializeAll);
        self.broken_interface = broken_interface;
    }

    /// Note that the external configuration tool has been launched; the
    /// periodic check waits for it instead of scheduling workers.
    pub fn begin_tool_wait(&mut self, now_ms: u64) {
        self.tool_pending = true;
        self.tool_started_ms = now_ms;
    }

    fn clear(&mut self) {
        self.request = None;
        self.broken_interface = None;
        self.tool_pending = false;
        self.backoff.reset();
        self.last_schedule_ms = None;
    }

    /// Drive the state machine one step. Called from the periodic loop;
    /// never blocks beyond a channel try-receive and a thread join of an
    /// already-finished worker.
    #[allow(clippy::too_many_arguments)]
    pub fn check(
        &mut self,
        now_ms: u64,
        model: Option<&VehicleModel>,
        configurator: &Arc<dyn SikConfigurator>,
        watch: &mut dyn SikToolWatch,
        orchestrator: &mut RadioOrchestrator,
        backend: &mut dyn RadioBackend,
        stats: &mut RadioStatsTable,
        alarms: &mut dyn AlarmSink,
    ) {
        if self.tool_pending {
            self.check_tool(now_ms, watch, orchestrator, backend, alarms);
            return;
        }

        if self.worker.is_some() {
            if !self.consume_worker_report(orchestrator, backend, stats, alarms) {
                // Worker still running. A wedged worker simply blocks
                // further scheduling until it returns.
                return;
            }
        }

        let Some(request) = self.request else {
            return;
        };

        if let Some(last) = self.last_schedule_ms {
            if now_ms.saturating_sub(last) < self.backoff.interval_ms() {
                return;
            }
        }
        self.last_schedule_ms = Some(now_ms);

        // Resolve worker parameters here, on the main loop, so the
        // thread never touches the model.
        let job = match request {
            RecoveryRequest::ReconfigureInterface(interface) => {
                let fallback_khz = stats.frequency_khz(interface);
                let params = match model {
                    Some(model) => model.resolve_sik_params(interface, fallback_khz),
                    None => SikParams {
                        frequency_khz: fallback_khz,
                        ..SikParams::default()
                    },
                };
                orchestrator.close_serial_for_reconfigure(interface, backend);
                RecoveryJob {
                    target: Some(interface),
                    params,
                }
            }
            RecoveryRequest::ReinitializeAll => RecoveryJob {
                target: None,
                params: SikParams::default(),
            },
        };

        if self.backoff.attempts() == 0 {
            alarms.raise(Alarm::RadioReconfiguring, 1);
        }
        self.backoff.note_attempt();
        tracing::info!(
            attempt = self.backoff.attempts(),
            target = ?job.target,
            "spawning SiK recovery worker"
        );

        let (report_tx, report_rx) = bounded(1);
        let configurator = Arc::clone(configurator);
        let handle = std::thread::spawn(move || {
            let report = run_job(&job, configurator.as_ref());
            let _ = report_tx.send(report);
        });
        self.worker = Some((handle, report_rx));
    }

    fn check_tool(
        &mut self,
        now_ms: u64,
        watch: &mut dyn SikToolWatch,
        orchestrator: &mut RadioOrchestrator,
        backend: &mut dyn RadioBackend,
        alarms: &mut dyn AlarmSink,
    ) {
        if now_ms.saturating_sub(self.tool_started_ms) < self.tool_grace_ms {
            return;
        }
        if watch.tool_running() {
            return;
        }
        let Some(code) = watch.take_result() else {
            // Process gone but no result yet; keep waiting.
            return;
        };
        tracing::info!(code, "SiK configuration tool finished");
        orchestrator.reopen_marked(backend);
        alarms.raise(Alarm::RadioReconfigured, 1);
        self.clear();
    }

    /// Returns true once the worker slot is free again.
    fn consume_worker_report(
        &mut self,
        orchestrator: &mut RadioOrchestrator,
        backend: &mut dyn RadioBackend,
        stats: &mut RadioStatsTable,
        alarms: &mut dyn AlarmSink,
    ) -> bool {
        let report = {
            let Some((_, rx)) = &self.worker else {
                return true;
            };
            match rx.try_recv() {
                Ok(report) => report,
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => WorkerReport::Failed {
                    interface: None,
                    error: "recovery worker exited without reporting".to_string(),
                },
            }
        };

        if let Some((handle, _)) = self.worker.take() {
            let _ = handle.join();
        }

        match report {
            WorkerReport::Reconfigured {
                interface,
                frequency_khz,
            } => {
                tracing::info!(interface, frequency_khz, "SiK radio reconfigured");
                stats.set_frequency(interface, frequency_khz);
                orchestrator.reopen_marked(backend);
                alarms.raise(Alarm::RadioReconfigured, 1);
                self.clear();
            }
            WorkerReport::Reinitialized => {
                tracing::info!(
                    broken_interface = ?self.broken_interface,
                    "serial radios reinitialized"
                );
                orchestrator.reopen_marked(backend);
                alarms.raise(
                    Alarm::RadioReinitialized {
                        broken_interface: self.broken_interface,
                    },
                    1,
                );
                self.clear();
            }
            WorkerReport::Failed { interface, error } => {
                tracing::warn!(
                    ?interface,
                    attempt = self.backoff.attempts(),
                    error = %error,
                    "SiK recovery attempt failed"
                );
                if self.backoff.exhausted() {
                    tracing::error!("SiK recovery exhausted its retry budget, giving up");
                    alarms.raise(Alarm::RadioReconfigureFailed, 1);
                    orchestrator.reopen_marked(backend);
                    self.clear();
                }
                // Below the budget: keep the request, the next check past
                // the grown interval schedules another attempt.
            }
        }
        true
    }
}

fn run_job(job: &RecoveryJob, configurator: &dyn SikConfigurator) -> WorkerReport {
    match job.target {
        Some(interface) => match configurator.set_params(interface, &job.params) {
            Ok(()) => WorkerReport::Reconfigured {
                interface,
                frequency_khz: job.params.frequency_khz,
            },
            Err(err) => WorkerReport::Failed {
                interface: Some(interface),
                error: err.to_string(),
            },
        },
        None => match configurator.reenumerate() {
            Ok(()) => WorkerReport::Reinitialized,
            Err(err) => WorkerReport::Failed {
                interface: None,
                error: err.to_string(),
            },
        },
    }
}
