//! # Open/Close Orchestrator
//!
//! The state machine that opens interfaces for search or operation,
//! closes everything cleanly, and applies runtime link-setting changes.
//! All hardware access goes through [`RadioBackend`]; the transmit side
//! is signaled through [`TxScheduler`].
//!
//! Failure policy: an individual interface that fails to open is logged
//! and recorded as the last failed interface, nothing more. Only two
//! conditions abort: zero receive interfaces across the whole subsystem,
//! and zero transmit interfaces when the active firmware requires local
//! transmit. Both trigger a full close before returning.

use std::os::unix::io::RawFd;

use aerolink_hw::{
    CardPolicy, FirmwareKind, Inventory, RadioClass, RadioLinkParams, VehicleModel,
};

use crate::alarm::{Alarm, AlarmSink};
use crate::assignment::LinkAssignmentTable;
use crate::aux_poll::AuxChannelPoller;
use crate::error::{HardInterfaceFailure, OrchestratorError, SubsystemError};

// ─── Collaborator Traits ────────────────────────────────────────────────────

/// How a packet radio's receive path is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Direct monitor-mode receive.
    Direct,
    /// Side-band framing for third-party firmware; telemetry arrives on
    /// a separate auxiliary channel.
    SideBand,
}

/// Hardware access seam. Implementations wrap the capture drivers and
/// serial ports; every call is synchronous and cheap except the serial
/// open, which the host keeps fast by pre-enumerating ports.
pub trait RadioBackend {
    /// Open a serial radio bidirectionally over its single handle.
    fn open_serial(&mut self, interface: usize) -> anyhow::Result<()>;
    fn close_serial(&mut self, interface: usize);

    fn open_read(&mut self, interface: usize, mode: CaptureMode) -> anyhow::Result<()>;
    fn close_read(&mut self, interface: usize);

    fn open_write(&mut self, interface: usize) -> anyhow::Result<()>;
    fn close_write(&mut self, interface: usize);

    /// Open the auxiliary telemetry channel, returning its descriptor
    /// when the firmware mode provides one.
    fn open_aux(&mut self, interface: usize) -> anyhow::Result<Option<RawFd>>;
    fn close_aux(&mut self, interface: usize);

    /// Re-tune an open interface in place.
    fn set_frequency(&mut self, interface: usize, khz: u32) -> anyhow::Result<()>;

    /// Push a fixed uplink rate to a rate-adjustable card. Negative
    /// values are MCS indices.
    fn set_uplink_datarate(&mut self, interface: usize, bps: i32) -> anyhow::Result<()>;
}

/// Transmit scheduling collaborator.
pub trait TxScheduler {
    fn set_sik_packet_size(&mut self, bytes: usize);
    fn start(&mut self);
    /// Signal the TX thread to quit and wait for it to drain.
    fn mark_quit_and_stop(&mut self);
}

/// Parameters for search mode, before any vehicle is bound.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    pub frequency_khz: u32,
    pub firmware: FirmwareKind,
    pub sik_packet_size: usize,
}

/// Per-link and total open counts after an open-for-operation call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenSummary {
    pub total_rx: usize,
    pub total_tx: usize,
    /// (opened-RX, opened-TX) per vehicle link id.
    pub per_link: Vec<(usize, usize)>,
}

// ─── Orchestrator ───────────────────────────────────────────────────────────

/// Owns the assignment table, the auxiliary poller, and the open/close
/// state machine. Single-writer: every mutation happens on the main
/// loop thread.
#[derive(Debug)]
pub struct RadioOrchestrator {
    assignment: LinkAssignmentTable,
    aux: AuxChannelPoller,
    serial_open: Vec<bool>,
    marked_for_reopen: Vec<bool>,
    last_failure: Option<HardInterfaceFailure>,
    in_search_mode: bool,
}

impl RadioOrchestrator {
    pub fn new(interface_count: usize) -> Self {
        RadioOrchestrator {
            assignment: LinkAssignmentTable::new(interface_count),
            aux: AuxChannelPoller::new(interface_count),
            serial_open: vec![false; interface_count],
            marked_for_reopen: vec![false; interface_count],
            last_failure: None,
            in_search_mode: false,
        }
    }

    pub fn assignment(&self) -> &LinkAssignmentTable {
        &self.assignment
    }

    pub fn last_failure(&self) -> Option<&HardInterfaceFailure> {
        self.last_failure.as_ref()
    }

    pub fn in_search_mode(&self) -> bool {
        self.in_search_mode
    }

    fn record_failure(&mut self, interface: usize, mode: &'static str, err: &anyhow::Error) {
        tracing::warn!(interface, mode, error = %err, "interface failed to open");
        self.last_failure = Some(HardInterfaceFailure {
            interface,
            mode,
            detail: err.to_string(),
        });
    }

    // ─── Search ─────────────────────────────────────────────────────────────

    /// Open every capable interface as a search receiver on one target
    /// frequency. Individual open failures are recorded, never fatal:
    /// searching with a partial set still finds the vehicle.
    pub fn open_for_search(
        &mut self,
        inventory: &dyn Inventory,
        policy: &CardPolicy,
        backend: &mut dyn RadioBackend,
        tx: &mut dyn TxScheduler,
        params: &SearchParams,
    ) -> usize {
        self.in_search_mode = true;
        let mut opened = 0;
        let mut any_serial = false;

        for i in 0..inventory.interface_count() {
            let Some(info) = inventory.interface(i) else {
                continue;
            };
            if policy.is_card_disabled(&info.id) {
                tracing::debug!(interface = i, id = %info.id, "card disabled by policy, skipping");
                continue;
            }
            let caps = policy.card_capabilities(&info.id, info.capabilities);
            if caps.is_disabled() || !caps.can_rx() || !caps.use_for_data() {
                continue;
            }
            if !info.supports_frequency(params.frequency_khz) {
                tracing::debug!(
                    interface = i,
                    frequency_khz = params.frequency_khz,
                    "interface cannot tune to search frequency"
                );
                continue;
            }

            let result = match info.class {
                RadioClass::Serial => backend.open_serial(i).map(|()| {
                    self.serial_open[i] = true;
                    any_serial = true;
                    if let Some(e) = self.assignment.entry_mut(i) {
                        e.opened_for_read = true;
                        e.opened_for_write = true;
                    }
                }),
                RadioClass::PacketRadio(_) => {
                    let mode = if params.firmware.uses_side_band() {
                        CaptureMode::SideBand
                    } else {
                        CaptureMode::Direct
                    };
                    backend.open_read(i, mode).map(|()| {
                        if let Some(e) = self.assignment.entry_mut(i) {
                            e.opened_for_read = true;
                        }
                    })
                }
            };

            match result {
                Ok(()) => {
                    // Search has no per-link topology; every interface
                    // lands on the same synthetic link 0. The local link
                    // counter is deliberately not advanced here.
                    self.assignment.assign(i, 0, 0);
                    opened += 1;
                    tracing::info!(interface = i, class = ?info.class, "opened for search");
                }
                Err(err) => self.record_failure(i, "search", &err),
            }
        }

        if any_serial {
            tx.set_sik_packet_size(params.sik_packet_size);
            tx.start();
        }

        self.assignment.publish();
        opened
    }

    // ─── Operation ──────────────────────────────────────────────────────────

    /// Open every interface for its assigned vehicle link. See the
    /// module docs for the failure policy.
    pub fn open_for_operation(
        &mut self,
        inventory: &dyn Inventory,
        policy: &CardPolicy,
        model: &VehicleModel,
        backend: &mut dyn RadioBackend,
        tx: &mut dyn TxScheduler,
        alarms: &mut dyn AlarmSink,
    ) -> Result<OpenSummary, SubsystemError> {
        self.in_search_mode = false;
        let mut any_serial = false;

        for i in 0..inventory.interface_count() {
            let Some(info) = inventory.interface(i) else {
                continue;
            };
            let Some(link_id) = model.interface_link(i) else {
                continue;
            };
            let Some(link) = model.link(link_id) else {
                continue;
            };
            self.assignment.assign(i, link_id as u8, link_id as u8);

            if link.capabilities.is_disabled() || link.capabilities.is_relay_only() {
                continue;
            }
            if policy.is_card_disabled(&info.id) {
                tracing::debug!(interface = i, id = %info.id, "card disabled by policy, skipping");
                continue;
            }
            let caps = policy.card_capabilities(&info.id, info.capabilities);
            if caps.is_disabled() {
                continue;
            }
            let carries_traffic = caps.use_for_data() || caps.use_for_video();
            if !carries_traffic {
                continue;
            }

            match info.class {
                RadioClass::Serial => match backend.open_serial(i) {
                    Ok(()) => {
                        self.serial_open[i] = true;
                        any_serial = true;
                        if let Some(e) = self.assignment.entry_mut(i) {
                            e.opened_for_read = caps.can_rx();
                            e.opened_for_write = caps.can_tx();
                        }
                        tracing::info!(interface = i, link = link_id, "serial radio opened");
                    }
                    Err(err) => self.record_failure(i, "serial", &err),
                },
                RadioClass::PacketRadio(family) => {
                    // Rate-adjustable families get the negotiated uplink
                    // rate pushed before the port opens.
                    if family.is_rate_adjustable() {
                        let bps = policy
                            .forced_uplink_bps(&info.id)
                            .unwrap_or_else(|| link.effective_uplink_bps());
                        if bps != 0 {
                            if let Err(err) = backend.set_uplink_datarate(i, bps) {
                                tracing::warn!(interface = i, bps, error = %err, "uplink rate push failed");
                            }
                        }
                    }

                    if caps.can_rx() {
                        let mode = if model.firmware.uses_side_band() {
                            CaptureMode::SideBand
                        } else {
                            CaptureMode::Direct
                        };
                        match backend.open_read(i, mode) {
                            Ok(()) => {
                                if let Some(e) = self.assignment.entry_mut(i) {
                                    e.opened_for_read = true;
                                }
                                tracing::info!(interface = i, link = link_id, ?mode, "opened for read");
                                if model.firmware.uses_side_band() {
                                    match backend.open_aux(i) {
                                        Ok(Some(fd)) => self.aux.set_handle(i, fd),
                                        Ok(None) => {}
                                        Err(err) => self.record_failure(i, "aux", &err),
                                    }
                                }
                            }
                            Err(err) => self.record_failure(i, "read", &err),
                        }
                    }

                    if caps.can_tx() && model.firmware.requires_local_tx() {
                        match backend.open_write(i) {
                            Ok(()) => {
                                if let Some(e) = self.assignment.entry_mut(i) {
                                    e.opened_for_write = true;
                                }
                                tracing::info!(interface = i, link = link_id, "opened for write");
                            }
                            Err(err) => self.record_failure(i, "write", &err),
                        }
                    }
                }
            }
        }

        let total_rx = self.assignment.total_open_rx();
        let total_tx = self.assignment.total_open_tx();

        // No receive path at all: the vehicle cannot operate. Same for
        // transmit under firmware that mandates local TX.
        if total_rx == 0 {
            tracing::error!("no interface opened for receive, closing everything");
            self.close_all(backend, tx);
            return Err(SubsystemError::NoRxInterfaces);
        }
        if total_tx == 0 && model.firmware.requires_local_tx() {
            tracing::error!("no interface opened for transmit, closing everything");
            self.close_all(backend, tx);
            return Err(SubsystemError::NoTxInterfaces);
        }

        // Partial loss on individual links is tolerated but reported.
        let mut per_link = Vec::with_capacity(model.link_count());
        for (link_id, link) in model.links.iter().enumerate() {
            let counts = self.assignment.link_open_counts(link_id);
            per_link.push(counts);
            if link.capabilities.is_disabled() || link.capabilities.is_relay_only() {
                continue;
            }
            if counts.0 == 0 {
                tracing::warn!(link = link_id, "link has no receive interface");
                alarms.raise(Alarm::LinkHasNoRxInterfaces { link: link_id }, 1);
            }
            if counts.1 == 0 && model.firmware.requires_local_tx() {
                tracing::warn!(link = link_id, "link has no transmit interface");
                alarms.raise(Alarm::LinkHasNoTxInterfaces { link: link_id }, 1);
            }
        }

        if any_serial {
            tx.set_sik_packet_size(model.sik_packet_size);
        }
        tx.start();

        self.assignment.publish();
        Ok(OpenSummary {
            total_rx,
            total_tx,
            per_link,
        })
    }

    // ─── Close ──────────────────────────────────────────────────────────────

    /// Close every open handle and reset the table. Idempotent.
    pub fn close_all(&mut self, backend: &mut dyn RadioBackend, tx: &mut dyn TxScheduler) {
        tx.mark_quit_and_stop();

        for i in 0..self.assignment.len() {
            if self.serial_open[i] {
                backend.close_serial(i);
                self.serial_open[i] = false;
                continue;
            }
            let entry = self.assignment.entry(i).copied().unwrap_or_default();
            if entry.opened_for_read {
                backend.close_read(i);
            }
            if entry.opened_for_write {
                backend.close_write(i);
            }
            if self.aux.take_handle(i).is_some() {
                backend.close_aux(i);
            }
        }

        self.aux.clear();
        self.assignment.clear();
        self.marked_for_reopen.iter_mut().for_each(|m| *m = false);
        self.assignment.publish();
        tracing::info!("all radio interfaces closed");
    }

    // ─── Runtime Settings ───────────────────────────────────────────────────

    /// Apply changed per-link parameters in place, without a close and
    /// reopen. Per-interface push failures are logged, not propagated.
    pub fn apply_link_settings(
        &mut self,
        inventory: &dyn Inventory,
        policy: &CardPolicy,
        model: &VehicleModel,
        link_id: usize,
        old: &RadioLinkParams,
        new: &RadioLinkParams,
        backend: &mut dyn RadioBackend,
    ) -> Result<(), OrchestratorError> {
        if model.link(link_id).is_none() {
            return Err(OrchestratorError::UnknownLink(link_id));
        }

        let width_changed = old.flags.uses_ht40() != new.flags.uses_ht40();
        let uplink_changed = old.effective_uplink_bps() != new.effective_uplink_bps();

        for i in 0..self.assignment.len() {
            let Some(entry) = self.assignment.entry(i) else {
                continue;
            };
            if entry.vehicle_link as usize != link_id || !entry.is_open() {
                continue;
            }
            let Some(info) = inventory.interface(i) else {
                continue;
            };

            if width_changed {
                if let Err(err) = backend.set_frequency(i, new.frequency_khz) {
                    tracing::warn!(interface = i, khz = new.frequency_khz, error = %err, "retune failed");
                } else {
                    tracing::info!(interface = i, khz = new.frequency_khz, "retuned for channel width change");
                }
            }

            if uplink_changed {
                if let RadioClass::PacketRadio(family) = info.class {
                    if family.is_rate_adjustable() {
                        let bps = policy
                            .forced_uplink_bps(&info.id)
                            .unwrap_or_else(|| new.effective_uplink_bps());
                        if let Err(err) = backend.set_uplink_datarate(i, bps) {
                            tracing::warn!(interface = i, bps, error = %err, "uplink rate push failed");
                        }
                    }
                }
            }
        }
        Ok(())
    }

    // ─── Recovery Support ───────────────────────────────────────────────────

    /// Close a serial radio ahead of external reconfiguration and mark
    /// it for reopening once recovery finishes.
    pub fn close_serial_for_reconfigure(&mut self, interface: usize, backend: &mut dyn RadioBackend) {
        if self.serial_open.get(interface).copied().unwrap_or(false) {
            backend.close_serial(interface);
            self.serial_open[interface] = false;
            if let Some(e) = self.assignment.entry_mut(interface) {
                e.opened_for_read = false;
                e.opened_for_write = false;
            }
            self.assignment.publish();
        }
        if let Some(m) = self.marked_for_reopen.get_mut(interface) {
            *m = true;
        }
    }

    /// Reopen every interface marked during recovery. Failures are
    /// recorded like any other open failure.
    pub fn reopen_marked(&mut self, backend: &mut dyn RadioBackend) {
        for i in 0..self.marked_for_reopen.len() {
            if !self.marked_for_reopen[i] {
                continue;
            }
            self.marked_for_reopen[i] = false;
            match backend.open_serial(i) {
                Ok(()) => {
                    self.serial_open[i] = true;
                    if let Some(e) = self.assignment.entry_mut(i) {
                        e.opened_for_read = true;
                        e.opened_for_write = true;
                    }
                    tracing::info!(interface = i, "serial radio reopened after recovery");
                }
                Err(err) => self.record_failure(i, "serial", &err),
            }
        }
        self.assignment.publish();
    }

    // ─── Aux Poll Passthrough ───────────────────────────────────────────────

    pub fn check_aux_readable(&mut self, now_ms: u64) -> usize {
        self.aux.check_readable(now_ms)
    }

    pub fn aux_is_signaled(&self, interface: usize) -> bool {
        self.aux.is_signaled(interface)
    }
}
