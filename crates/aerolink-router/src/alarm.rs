//! # Alarm Sink
//!
//! Side-channel notifications toward the operator UI and the vehicle.
//! The router raises alarms for conditions it absorbs locally (partial
//! link loss, recovery progress); delivery is the host's problem.

/// Conditions the router reports without aborting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alarm {
    /// SiK reconfiguration started (raised on the first attempt only).
    RadioReconfiguring,
    /// A targeted SiK reconfiguration finished.
    RadioReconfigured,
    /// A generic serial-radio re-enumeration finished. Carries the
    /// interface that triggered the break, when one was identified.
    RadioReinitialized { broken_interface: Option<usize> },
    /// SiK reconfiguration gave up after the retry budget.
    RadioReconfigureFailed,
    /// A vehicle link ended up with no receive interface.
    LinkHasNoRxInterfaces { link: usize },
    /// A vehicle link ended up with no transmit interface under
    /// firmware that requires local transmit.
    LinkHasNoTxInterfaces { link: usize },
}

/// Receives alarms the router raises. `repeat` is how many times the
/// host should re-send the notification toward the counterpart.
pub trait AlarmSink {
    fn raise(&mut self, alarm: Alarm, repeat: u32);
}

/// Sink that drops everything. Useful for hosts without a UI channel
/// and for tests that don't assert on alarms.
#[derive(Debug, Default)]
pub struct NullAlarmSink;

impl AlarmSink for NullAlarmSink {
    fn raise(&mut self, alarm: Alarm, repeat: u32) {
        tracing::debug!(?alarm, repeat, "alarm raised (no sink attached)");
    }
}
