//! # Link Assignment Table
//!
//! Maps each physical interface index to its local and vehicle radio
//! link ids together with the open flags. Mutated only on the main loop;
//! published as an immutable snapshot through `ArcSwap` so downstream
//! readers (TX scheduling, UI) get lock-free, eventually-consistent
//! reads.

use std::sync::Arc;

use arc_swap::ArcSwap;

/// Assignment and open state for one interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterfaceAssignment {
    /// Controller-local link id.
    pub local_link: u8,
    /// Vehicle-declared link id.
    pub vehicle_link: u8,
    pub opened_for_read: bool,
    pub opened_for_write: bool,
}

impl InterfaceAssignment {
    pub fn is_open(&self) -> bool {
        self.opened_for_read || self.opened_for_write
    }
}

/// The interface/link table plus its published snapshot.
#[derive(Debug)]
pub struct LinkAssignmentTable {
    entries: Vec<InterfaceAssignment>,
    shared: Arc<ArcSwap<Vec<InterfaceAssignment>>>,
}

impl LinkAssignmentTable {
    pub fn new(interface_count: usize) -> Self {
        let entries = vec![InterfaceAssignment::default(); interface_count];
        let shared = Arc::new(ArcSwap::from_pointee(entries.clone()));
        LinkAssignmentTable { entries, shared }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, interface: usize) -> Option<&InterfaceAssignment> {
        self.entries.get(interface)
    }

    pub fn entry_mut(&mut self, interface: usize) -> Option<&mut InterfaceAssignment> {
        self.entries.get_mut(interface)
    }

    pub fn assign(&mut self, interface: usize, local_link: u8, vehicle_link: u8) {
        if let Some(e) = self.entries.get_mut(interface) {
            e.local_link = local_link;
            e.vehicle_link = vehicle_link;
        }
    }

    /// Reset every entry's open flags and assignment.
    pub fn clear(&mut self) {
        for e in &mut self.entries {
            *e = InterfaceAssignment::default();
        }
    }

    /// Publish the current table to shared state. Call after every
    /// mutation batch, not after every field write.
    pub fn publish(&self) {
        self.shared.store(Arc::new(self.entries.clone()));
    }

    /// Handle downstream readers keep to observe published snapshots.
    pub fn watch(&self) -> Arc<ArcSwap<Vec<InterfaceAssignment>>> {
        Arc::clone(&self.shared)
    }

    pub fn total_open_rx(&self) -> usize {
        self.entries.iter().filter(|e| e.opened_for_read).count()
    }

    pub fn total_open_tx(&self) -> usize {
        self.entries.iter().filter(|e| e.opened_for_write).count()
    }

    /// (opened-RX, opened-TX) counts for one vehicle link.
    pub fn link_open_counts(&self, vehicle_link: usize) -> (usize, usize) {
        let mut rx = 0;
        let mut tx = 0;
        for e in &self.entries {
            if e.vehicle_link as usize == vehicle_link {
                if e.opened_for_read {
                    rx += 1;
                }
                if e.opened_for_write {
                    tx += 1;
                }
            }
        }
        (rx, tx)
    }
}
