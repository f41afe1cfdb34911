//! # Radio Router
//!
//! Ties the orchestrator, stats table, broadcaster, and recovery state
//! into one context object the host's periodic loop drives. Everything
//! the router touches outside its own state arrives through
//! [`RouterDeps`], which keeps the single-writer discipline visible at
//! the call site.

use std::sync::Arc;

use aerolink_hw::{Inventory, SikConfigurator, VehicleModel};

use crate::alarm::AlarmSink;
use crate::config::RouterConfig;
use crate::orchestrator::{RadioBackend, RadioOrchestrator};
use crate::recovery::{SikRecoveryState, SikToolWatch};
use crate::stats::{PacketQueue, RadioStatsTable, StatsBroadcaster};

/// External collaborators for one tick. Open/close calls take their own
/// collaborator set; the tick only needs what recovery and broadcasting
/// touch.
pub struct RouterDeps<'a> {
    pub inventory: &'a dyn Inventory,
    pub model: Option<&'a VehicleModel>,
    pub backend: &'a mut dyn RadioBackend,
    pub configurator: &'a Arc<dyn SikConfigurator>,
    pub tool_watch: &'a mut dyn SikToolWatch,
    pub alarms: &'a mut dyn AlarmSink,
    pub queue: &'a mut dyn PacketQueue,
}

/// The radio link layer of one station.
pub struct RadioRouter {
    pub orchestrator: RadioOrchestrator,
    pub stats: RadioStatsTable,
    pub recovery: SikRecoveryState,
    broadcaster: StatsBroadcaster,
}

impl RadioRouter {
    pub fn new(
        interface_count: usize,
        source_id: u32,
        destination_id: u32,
        config: &RouterConfig,
    ) -> Self {
        RadioRouter {
            orchestrator: RadioOrchestrator::new(interface_count),
            stats: RadioStatsTable::new(interface_count, config),
            recovery: SikRecoveryState::new(config),
            broadcaster: StatsBroadcaster::new(source_id, destination_id, config),
        }
    }

    /// One iteration of the periodic loop: poll auxiliary channels,
    /// drive recovery, refresh stats, broadcast reports. Never blocks
    /// beyond the auxiliary poll timeout.
    pub fn tick(&mut self, now_ms: u64, deps: &mut RouterDeps<'_>) {
        self.orchestrator.check_aux_readable(now_ms);

        self.recovery.check(
            now_ms,
            deps.model,
            deps.configurator,
            deps.tool_watch,
            &mut self.orchestrator,
            deps.backend,
            &mut self.stats,
            deps.alarms,
        );

        self.stats.periodic_update(now_ms);

        self.broadcaster.tick(
            now_ms,
            deps.inventory,
            deps.model,
            self.orchestrator.assignment(),
            &mut self.stats,
            deps.queue,
        );
    }
}
