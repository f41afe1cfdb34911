//! End-to-end orchestration behavior: open/close state machine, failure
//! policy, SiK recovery bounds, and stats broadcasting over mock
//! hardware.

use std::collections::HashSet;
use std::os::unix::io::RawFd;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{Buf, Bytes};

use aerolink_hw::{
    CardCapabilities, CardPolicy, DriverFamily, FirmwareKind, RadioClass, RadioInterfaceInfo,
    RadioLinkParams, SikConfigurator, SikError, SikParams, StaticInventory, VehicleModel,
    DEFAULT_SIK_AIR_RATE,
};
use aerolink_router::{
    Alarm, AlarmSink, PacketQueue, RadioBackend, RadioOrchestrator, RadioStatsTable,
    RouterConfig, SikRecoveryState, SikToolWatch, StatsBroadcaster, SubsystemError, TxScheduler,
};
use aerolink_wire::header::{
    RadioPacketHeader, PACKET_TYPE_RADIO_STATS_COMPACT, PACKET_TYPE_RADIO_STATS_FULL,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ─── Mocks ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct MockBackend {
    ops: Vec<String>,
    fail_all_opens: bool,
    fail_interfaces: HashSet<usize>,
}

impl MockBackend {
    fn opened(&self, op: &str) -> usize {
        self.ops.iter().filter(|o| o.starts_with(op)).count()
    }
}

impl RadioBackend for MockBackend {
    fn open_serial(&mut self, interface: usize) -> anyhow::Result<()> {
        if self.fail_all_opens || self.fail_interfaces.contains(&interface) {
            anyhow::bail!("serial open refused");
        }
        self.ops.push(format!("open_serial:{interface}"));
        Ok(())
    }

    fn close_serial(&mut self, interface: usize) {
        self.ops.push(format!("close_serial:{interface}"));
    }

    fn open_read(
        &mut self,
        interface: usize,
        _mode: aerolink_router::CaptureMode,
    ) -> anyhow::Result<()> {
        if self.fail_all_opens || self.fail_interfaces.contains(&interface) {
            anyhow::bail!("read open refused");
        }
        self.ops.push(format!("open_read:{interface}"));
        Ok(())
    }

    fn close_read(&mut self, interface: usize) {
        self.ops.push(format!("close_read:{interface}"));
    }

    fn open_write(&mut self, interface: usize) -> anyhow::Result<()> {
        if self.fail_all_opens || self.fail_interfaces.contains(&interface) {
            anyhow::bail!("write open refused");
        }
        self.ops.push(format!("open_write:{interface}"));
        Ok(())
    }

    fn close_write(&mut self, interface: usize) {
        self.ops.push(format!("close_write:{interface}"));
    }

    fn open_aux(&mut self, _interface: usize) -> anyhow::Result<Option<RawFd>> {
        Ok(None)
    }

    fn close_aux(&mut self, interface: usize) {
        self.ops.push(format!("close_aux:{interface}"));
    }

    fn set_frequency(&mut self, interface: usize, khz: u32) -> anyhow::Result<()> {
        self.ops.push(format!("set_frequency:{interface}:{khz}"));
        Ok(())
    }

    fn set_uplink_datarate(&mut self, interface: usize, bps: i32) -> anyhow::Result<()> {
        self.ops.push(format!("set_rate:{interface}:{bps}"));
        Ok(())
    }
}

#[derive(Default)]
struct MockTx {
    started: usize,
    stopped: usize,
    sik_packet_size: Option<usize>,
}

impl TxScheduler for MockTx {
    fn set_sik_packet_size(&mut self, bytes: usize) {
        self.sik_packet_size = Some(bytes);
    }

    fn start(&mut self) {
        self.started += 1;
    }

    fn mark_quit_and_stop(&mut self) {
        self.stopped += 1;
    }
}

#[derive(Default)]
struct MockAlarms {
    raised: Vec<Alarm>,
}

impl AlarmSink for MockAlarms {
    fn raise(&mut self, alarm: Alarm, _repeat: u32) {
        self.raised.push(alarm);
    }
}

#[derive(Default)]
struct MockQueue {
    packets: Vec<Bytes>,
}

impl PacketQueue for MockQueue {
    fn enqueue(&mut self, packet: Bytes) {
        self.packets.push(packet);
    }
}

struct MockConfigurator {
    calls: Mutex<Vec<(usize, SikParams)>>,
    fail: bool,
}

impl MockConfigurator {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(MockConfigurator {
            calls: Mutex::new(Vec::new()),
            fail,
        })
    }

    fn calls(&self) -> Vec<(usize, SikParams)> {
        self.calls.lock().unwrap().clone()
    }
}

impl SikConfigurator for MockConfigurator {
    fn set_params(&self, index: usize, params: &SikParams) -> Result<(), SikError> {
        self.calls.lock().unwrap().push((index, *params));
        if self.fail {
            Err(SikError::NotResponding)
        } else {
            Ok(())
        }
    }

    fn reenumerate(&self) -> Result<(), SikError> {
        if self.fail {
            Err(SikError::Tool("enumeration failed".to_string()))
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
struct IdleToolWatch;

impl SikToolWatch for IdleToolWatch {
    fn tool_running(&mut self) -> bool {
        false
    }

    fn take_result(&mut self) -> Option<i32> {
        None
    }
}

// ─── Fixtures ───────────────────────────────────────────────────────────────

fn wifi_interface(id: &str) -> RadioInterfaceInfo {
    RadioInterfaceInfo {
        id: id.to_string(),
        name: "wlan".to_string(),
        class: RadioClass::PacketRadio(DriverFamily::Atheros),
        capabilities: CardCapabilities::rx_tx_data_video(),
        frequency_khz: 5_745_000,
        supported_bands_khz: vec![(5_170_000, 5_835_000)],
    }
}

fn serial_interface(id: &str) -> RadioInterfaceInfo {
    RadioInterfaceInfo {
        id: id.to_string(),
        name: "/dev/ttyUSB0".to_string(),
        class: RadioClass::Serial,
        capabilities: CardCapabilities::rx_tx_data(),
        frequency_khz: 868_000,
        supported_bands_khz: vec![],
    }
}

/// Two packet radios on link 0, one serial radio on link 1, firmware
/// that requires local transmit.
fn two_wifi_one_serial() -> (StaticInventory, VehicleModel) {
    let inventory = StaticInventory::new(vec![
        wifi_interface("aa:bb:cc:00:00:01"),
        wifi_interface("aa:bb:cc:00:00:02"),
        serial_interface("/dev/ttyUSB0"),
    ]);
    let model = VehicleModel {
        vehicle_id: 7,
        firmware: FirmwareKind::Native,
        links: vec![
            RadioLinkParams {
                frequency_khz: 5_745_000,
                datarate_data_bps: 18_000_000,
                ..RadioLinkParams::default()
            },
            RadioLinkParams {
                capabilities: CardCapabilities::rx_tx_data(),
                frequency_khz: 868_000,
                datarate_data_bps: 64_000,
                ..RadioLinkParams::default()
            },
        ],
        interface_links: vec![Some(0), Some(0), Some(1)],
        ..VehicleModel::default()
    };
    (inventory, model)
}

// ─── Open / Close ───────────────────────────────────────────────────────────

#[test]
fn operation_opens_every_capable_interface() {
    init_tracing();
    let (inventory, model) = two_wifi_one_serial();
    let mut orch = RadioOrchestrator::new(3);
    let mut backend = MockBackend::default();
    let mut tx = MockTx::default();
    let mut alarms = MockAlarms::default();
    let policy = CardPolicy::default();

    let summary = orch
        .open_for_operation(&inventory, &policy, &model, &mut backend, &mut tx, &mut alarms)
        .unwrap();

    assert_eq!(summary.total_rx, 3);
    assert_eq!(summary.total_tx, 3);
    assert_eq!(summary.per_link, vec![(2, 2), (1, 1)]);
    assert!(alarms.raised.is_empty());
    assert_eq!(tx.started, 1);
    assert_eq!(tx.sik_packet_size, Some(model.sik_packet_size));
    // Rate-adjustable cards got the uplink rate before opening.
    assert_eq!(backend.opened("set_rate:"), 2);
}

#[test]
fn disabled_and_relay_links_are_never_opened() {
    let (inventory, mut model) = two_wifi_one_serial();
    model.links[1].capabilities = model.links[1]
        .capabilities
        .with(CardCapabilities::RELAY_ONLY);

    let mut orch = RadioOrchestrator::new(3);
    let mut backend = MockBackend::default();
    let mut tx = MockTx::default();
    let mut alarms = MockAlarms::default();

    let summary = orch
        .open_for_operation(
            &inventory,
            &CardPolicy::default(),
            &model,
            &mut backend,
            &mut tx,
            &mut alarms,
        )
        .unwrap();

    assert_eq!(summary.per_link[1], (0, 0));
    assert_eq!(backend.opened("open_serial:"), 0);
    // Relay links are excluded from degradation alarms too.
    assert!(alarms.raised.is_empty());

    // Same with the disabled bit instead of relay-only.
    model.links[1].capabilities = CardCapabilities::rx_tx_data().with(CardCapabilities::DISABLED);
    let mut orch = RadioOrchestrator::new(3);
    let mut backend = MockBackend::default();
    let summary = orch
        .open_for_operation(
            &inventory,
            &CardPolicy::default(),
            &model,
            &mut backend,
            &mut tx,
            &mut alarms,
        )
        .unwrap();
    assert_eq!(summary.per_link[1], (0, 0));
    assert_eq!(backend.opened("open_serial:"), 0);
}

#[test]
fn disabled_serial_card_degrades_link_but_operation_succeeds() {
    let (_, model) = two_wifi_one_serial();
    let mut serial = serial_interface("/dev/ttyUSB0");
    serial.capabilities = serial.capabilities.with(CardCapabilities::DISABLED);
    let inventory = StaticInventory::new(vec![
        wifi_interface("aa:bb:cc:00:00:01"),
        wifi_interface("aa:bb:cc:00:00:02"),
        serial,
    ]);

    let mut orch = RadioOrchestrator::new(3);
    let mut backend = MockBackend::default();
    let mut tx = MockTx::default();
    let mut alarms = MockAlarms::default();

    let summary = orch
        .open_for_operation(
            &inventory,
            &CardPolicy::default(),
            &model,
            &mut backend,
            &mut tx,
            &mut alarms,
        )
        .unwrap();

    assert_eq!(summary.total_rx, 2);
    assert_eq!(summary.per_link[1], (0, 0));
    assert!(alarms
        .raised
        .contains(&Alarm::LinkHasNoRxInterfaces { link: 1 }));
    assert!(alarms
        .raised
        .contains(&Alarm::LinkHasNoTxInterfaces { link: 1 }));
}

#[test]
fn total_open_failure_closes_everything_and_stops() {
    let (inventory, model) = two_wifi_one_serial();
    let mut orch = RadioOrchestrator::new(3);
    let mut backend = MockBackend {
        fail_all_opens: true,
        ..MockBackend::default()
    };
    let mut tx = MockTx::default();
    let mut alarms = MockAlarms::default();

    let err = orch
        .open_for_operation(
            &inventory,
            &CardPolicy::default(),
            &model,
            &mut backend,
            &mut tx,
            &mut alarms,
        )
        .unwrap_err();

    assert_eq!(err, SubsystemError::NoRxInterfaces);
    assert_eq!(tx.stopped, 1);
    for i in 0..3 {
        let entry = orch.assignment().entry(i).unwrap();
        assert!(!entry.opened_for_read);
        assert!(!entry.opened_for_write);
    }
    assert!(orch.last_failure().is_some());
}

#[test]
fn reopen_after_close_is_idempotent() {
    let (inventory, model) = two_wifi_one_serial();
    let mut orch = RadioOrchestrator::new(3);
    let mut backend = MockBackend::default();
    let mut tx = MockTx::default();
    let mut alarms = MockAlarms::default();
    let policy = CardPolicy::default();

    let first = orch
        .open_for_operation(&inventory, &policy, &model, &mut backend, &mut tx, &mut alarms)
        .unwrap();
    let entries_first: Vec<_> = (0..3)
        .map(|i| *orch.assignment().entry(i).unwrap())
        .collect();

    orch.close_all(&mut backend, &mut tx);
    // Closing twice is harmless.
    orch.close_all(&mut backend, &mut tx);
    assert_eq!(orch.assignment().total_open_rx(), 0);

    let second = orch
        .open_for_operation(&inventory, &policy, &model, &mut backend, &mut tx, &mut alarms)
        .unwrap();
    let entries_second: Vec<_> = (0..3)
        .map(|i| *orch.assignment().entry(i).unwrap())
        .collect();

    assert_eq!(first, second);
    assert_eq!(entries_first, entries_second);
}

#[test]
fn search_assigns_everything_to_synthetic_link_zero() {
    let (inventory, _) = two_wifi_one_serial();
    let mut orch = RadioOrchestrator::new(3);
    let mut backend = MockBackend::default();
    let mut tx = MockTx::default();

    let opened = orch.open_for_search(
        &inventory,
        &CardPolicy::default(),
        &mut backend,
        &mut tx,
        &aerolink_router::SearchParams {
            frequency_khz: 5_745_000,
            firmware: FirmwareKind::Native,
            sik_packet_size: 64,
        },
    );

    // The two packet radios can tune to the search frequency; the
    // serial radio has no declared bands and is opened as well.
    assert_eq!(opened, 3);
    assert!(orch.in_search_mode());
    for i in 0..3 {
        let e = orch.assignment().entry(i).unwrap();
        assert_eq!(e.local_link, 0);
        assert_eq!(e.vehicle_link, 0);
        assert!(e.opened_for_read);
    }
    assert_eq!(tx.started, 1);
}

#[test]
fn card_policy_override_excludes_interface() {
    let (inventory, model) = two_wifi_one_serial();
    let mut policy = CardPolicy::default();
    policy.set_override(
        "aa:bb:cc:00:00:02",
        aerolink_hw::policy::CardOverride {
            disabled: true,
            ..Default::default()
        },
    );

    let mut orch = RadioOrchestrator::new(3);
    let mut backend = MockBackend::default();
    let mut tx = MockTx::default();
    let mut alarms = MockAlarms::default();

    let summary = orch
        .open_for_operation(&inventory, &policy, &model, &mut backend, &mut tx, &mut alarms)
        .unwrap();
    assert_eq!(summary.per_link[0], (1, 1));
}

#[test]
fn side_band_firmware_operates_without_local_tx_radios() {
    let (inventory, mut model) = two_wifi_one_serial();
    model.firmware = FirmwareKind::SideBand;

    let mut orch = RadioOrchestrator::new(3);
    let mut backend = MockBackend::default();
    let mut tx = MockTx::default();
    let mut alarms = MockAlarms::default();

    let summary = orch
        .open_for_operation(
            &inventory,
            &CardPolicy::default(),
            &model,
            &mut backend,
            &mut tx,
            &mut alarms,
        )
        .unwrap();

    // Packet radios are receive-only under side-band firmware; the
    // serial radio still opens bidirectionally.
    assert_eq!(summary.total_rx, 3);
    assert_eq!(summary.total_tx, 1);
    assert_eq!(backend.opened("open_write:"), 0);
    assert!(alarms.raised.is_empty());
}

#[test]
fn channel_width_change_retunes_link_interfaces_in_place() {
    let (inventory, model) = two_wifi_one_serial();
    let mut orch = RadioOrchestrator::new(3);
    let mut backend = MockBackend::default();
    let mut tx = MockTx::default();
    let mut alarms = MockAlarms::default();
    let policy = CardPolicy::default();

    orch.open_for_operation(&inventory, &policy, &model, &mut backend, &mut tx, &mut alarms)
        .unwrap();
    backend.ops.clear();

    let old = model.links[0];
    let mut new = old;
    new.flags = new.flags.with(aerolink_hw::RadioLinkFlags::HT40);
    new.frequency_khz = 5_765_000;
    new.uplink_datarate_bps = 12_000_000;

    orch.apply_link_settings(&inventory, &policy, &model, 0, &old, &new, &mut backend)
        .unwrap();

    // Both link-0 interfaces retuned and got the new uplink rate; the
    // serial radio on link 1 was untouched.
    assert_eq!(backend.opened("set_frequency:0:5765000"), 1);
    assert_eq!(backend.opened("set_frequency:1:5765000"), 1);
    assert_eq!(backend.opened("set_rate:0:12000000"), 1);
    assert_eq!(backend.opened("set_rate:1:12000000"), 1);
    assert_eq!(backend.opened("set_frequency:2"), 0);

    // Unknown link ids are the only hard failure.
    assert!(orch
        .apply_link_settings(&inventory, &policy, &model, 9, &old, &new, &mut backend)
        .is_err());
}

// ─── Recovery ───────────────────────────────────────────────────────────────

fn fast_recovery_config() -> RouterConfig {
    RouterConfig {
        recovery_floor_ms: 0,
        recovery_step_ms: 0,
        ..RouterConfig::default()
    }
}

fn drive_recovery_to_idle(
    state: &mut SikRecoveryState,
    model: &VehicleModel,
    configurator: &Arc<dyn SikConfigurator>,
    orch: &mut RadioOrchestrator,
    backend: &mut MockBackend,
    stats: &mut RadioStatsTable,
    alarms: &mut MockAlarms,
) {
    let mut watch = IdleToolWatch;
    let mut now = 1_000u64;
    for _ in 0..500 {
        state.check(
            now,
            Some(model),
            configurator,
            &mut watch,
            orch,
            backend,
            stats,
            alarms,
        );
        if state.is_idle() {
            return;
        }
        std::thread::sleep(Duration::from_millis(2));
        now += 1_000;
    }
    panic!("recovery never settled");
}

#[test]
fn recovery_gives_up_after_three_attempts() {
    init_tracing();
    let (_, model) = two_wifi_one_serial();
    let config = fast_recovery_config();
    let mut state = SikRecoveryState::new(&config);
    let mut orch = RadioOrchestrator::new(3);
    let mut backend = MockBackend::default();
    let mut stats = RadioStatsTable::new(3, &config);
    let mut alarms = MockAlarms::default();

    let mock = MockConfigurator::new(true);
    let configurator: Arc<dyn SikConfigurator> = mock.clone();

    state.request_reconfigure(2);
    drive_recovery_to_idle(
        &mut state,
        &model,
        &configurator,
        &mut orch,
        &mut backend,
        &mut stats,
        &mut alarms,
    );

    assert_eq!(mock.calls().len(), 3);
    assert!(state.is_idle());
    assert_eq!(state.pending_target(), None);
    assert_eq!(state.attempts(), 0);
    assert_eq!(
        alarms
            .raised
            .iter()
            .filter(|a| **a == Alarm::RadioReconfiguring)
            .count(),
        1
    );
    assert!(alarms.raised.contains(&Alarm::RadioReconfigureFailed));
}

#[test]
fn recovery_substitutes_default_air_rate_and_persists_frequency() {
    let (_, mut model) = two_wifi_one_serial();
    // A rate the SiK firmware does not accept.
    model.links[1].datarate_data_bps = 123_456;
    model.links[1].frequency_khz = 915_000;

    let config = fast_recovery_config();
    let mut state = SikRecoveryState::new(&config);
    let mut orch = RadioOrchestrator::new(3);
    let mut backend = MockBackend::default();
    let mut stats = RadioStatsTable::new(3, &config);
    let mut alarms = MockAlarms::default();

    let mock = MockConfigurator::new(false);
    let configurator: Arc<dyn SikConfigurator> = mock.clone();

    state.request_reconfigure(2);
    drive_recovery_to_idle(
        &mut state,
        &model,
        &configurator,
        &mut orch,
        &mut backend,
        &mut stats,
        &mut alarms,
    );

    let calls = mock.calls();
    assert_eq!(calls.len(), 1);
    let (interface, params) = &calls[0];
    assert_eq!(*interface, 2);
    assert_eq!(params.air_rate_bps, DEFAULT_SIK_AIR_RATE);
    assert_eq!(params.frequency_khz, 915_000);

    assert_eq!(stats.frequency_khz(2), 915_000);
    assert!(alarms.raised.contains(&Alarm::RadioReconfigured));
    // The marked serial interface came back after recovery.
    assert_eq!(backend.opened("open_serial:2"), 1);
    assert!(state.is_idle());
}

#[test]
fn generic_reinit_raises_reinitialized_alarm() {
    let (_, model) = two_wifi_one_serial();
    let config = fast_recovery_config();
    let mut state = SikRecoveryState::new(&config);
    let mut orch = RadioOrchestrator::new(3);
    let mut backend = MockBackend::default();
    let mut stats = RadioStatsTable::new(3, &config);
    let mut alarms = MockAlarms::default();

    let mock = MockConfigurator::new(false);
    let configurator: Arc<dyn SikConfigurator> = mock.clone();

    state.request_reinit_all(Some(2));
    drive_recovery_to_idle(
        &mut state,
        &model,
        &configurator,
        &mut orch,
        &mut backend,
        &mut stats,
        &mut alarms,
    );

    assert!(alarms.raised.contains(&Alarm::RadioReinitialized {
        broken_interface: Some(2)
    }));
    assert!(mock.calls().is_empty());
}

// ─── Stats Broadcasting ─────────────────────────────────────────────────────

fn stats_config() -> RouterConfig {
    RouterConfig {
        stats_refresh_ms: 100,
        graph_refresh_ms: 100,
        ..RouterConfig::default()
    }
}

fn compact_indices(packets: &[Bytes]) -> Vec<u8> {
    packets
        .iter()
        .filter_map(|p| {
            let mut buf = p.clone();
            let header = RadioPacketHeader::decode(&mut buf)?;
            (header.packet_type == PACKET_TYPE_RADIO_STATS_COMPACT).then(|| buf.get_u8())
        })
        .collect()
}

#[test]
fn compact_packets_round_robin_over_all_interfaces() {
    let (inventory, model) = two_wifi_one_serial();
    let config = stats_config();
    let mut broadcaster = StatsBroadcaster::new(1, 2, &config);
    let mut stats = RadioStatsTable::new(3, &config);
    let assignment = aerolink_router::LinkAssignmentTable::new(3);
    let mut queue = MockQueue::default();

    for tick in 0..3u64 {
        broadcaster.tick(
            tick * 100,
            &inventory,
            Some(&model),
            &assignment,
            &mut stats,
            &mut queue,
        );
    }

    let indices = compact_indices(&queue.packets);
    assert_eq!(indices.len(), 3);
    let unique: HashSet<u8> = indices.iter().copied().collect();
    assert_eq!(unique, HashSet::from([0, 1, 2]));
}

#[test]
fn no_compact_packets_without_low_capacity_links() {
    let inventory = StaticInventory::new(vec![
        wifi_interface("aa:bb:cc:00:00:01"),
        wifi_interface("aa:bb:cc:00:00:02"),
    ]);
    let (_, model) = two_wifi_one_serial();
    let config = stats_config();
    let mut broadcaster = StatsBroadcaster::new(1, 2, &config);
    let mut stats = RadioStatsTable::new(2, &config);
    let assignment = aerolink_router::LinkAssignmentTable::new(2);
    let mut queue = MockQueue::default();

    broadcaster.tick(0, &inventory, Some(&model), &assignment, &mut stats, &mut queue);

    assert!(compact_indices(&queue.packets).is_empty());
    // The full packet still goes out, flagged for high-capacity links.
    let mut buf = queue.packets[0].clone();
    let header = RadioPacketHeader::decode(&mut buf).unwrap();
    assert_eq!(header.packet_type, PACKET_TYPE_RADIO_STATS_FULL);
    assert!(header.is_high_capacity_only());
}

#[test]
fn oversized_full_packet_is_silently_skipped() {
    // Seven interfaces exceed the payload budget for full records.
    let interfaces: Vec<_> = (0..7)
        .map(|i| {
            let mut info = wifi_interface(&format!("aa:bb:cc:00:00:{i:02}"));
            if i == 6 {
                info = serial_interface("/dev/ttyUSB0");
            }
            info
        })
        .collect();
    let inventory = StaticInventory::new(interfaces);
    let (_, model) = two_wifi_one_serial();
    let config = stats_config();
    let mut broadcaster = StatsBroadcaster::new(1, 2, &config);
    let mut stats = RadioStatsTable::new(7, &config);
    let assignment = aerolink_router::LinkAssignmentTable::new(7);
    let mut queue = MockQueue::default();

    broadcaster.tick(0, &inventory, Some(&model), &assignment, &mut stats, &mut queue);

    for packet in &queue.packets {
        let mut buf = packet.clone();
        let header = RadioPacketHeader::decode(&mut buf).unwrap();
        assert_ne!(header.packet_type, PACKET_TYPE_RADIO_STATS_FULL);
    }
    // Compact reporting is unaffected by the full-packet skip.
    assert_eq!(compact_indices(&queue.packets).len(), 1);
}

#[test]
fn broadcast_is_throttled() {
    let (inventory, model) = two_wifi_one_serial();
    let config = stats_config();
    let mut broadcaster = StatsBroadcaster::new(1, 2, &config);
    let mut stats = RadioStatsTable::new(3, &config);
    let assignment = aerolink_router::LinkAssignmentTable::new(3);
    let mut queue = MockQueue::default();

    broadcaster.tick(0, &inventory, Some(&model), &assignment, &mut stats, &mut queue);
    let after_first = queue.packets.len();
    // Inside the send interval: nothing new.
    broadcaster.tick(50, &inventory, Some(&model), &assignment, &mut stats, &mut queue);
    assert_eq!(queue.packets.len(), after_first);

    broadcaster.tick(100, &inventory, Some(&model), &assignment, &mut stats, &mut queue);
    assert!(queue.packets.len() > after_first);
}

#[test]
fn mcs_pinned_links_report_the_pin_as_overall_rate() {
    let (inventory, mut model) = two_wifi_one_serial();
    // Video pinned to MCS-3; data keeps its configured bps rate.
    model.links[0].datarate_video_bps = -3;

    let config = stats_config();
    let mut broadcaster = StatsBroadcaster::new(1, 2, &config);
    let mut stats = RadioStatsTable::new(3, &config);
    let mut assignment = aerolink_router::LinkAssignmentTable::new(3);
    assignment.assign(0, 0, 0);
    assignment.assign(1, 0, 0);
    let mut queue = MockQueue::default();

    broadcaster.tick(0, &inventory, Some(&model), &assignment, &mut stats, &mut queue);

    for i in 0..2 {
        let record = &stats.entry(i).unwrap().record;
        assert_eq!(record.last_recv_rate_bps, -3);
        assert_eq!(record.last_recv_rate_video_bps, -3);
        assert_eq!(record.last_recv_rate_data_bps, 18_000_000);
    }
}

#[test]
fn serial_links_report_configured_rate() {
    let (inventory, model) = two_wifi_one_serial();
    let config = stats_config();
    let mut broadcaster = StatsBroadcaster::new(1, 2, &config);
    let mut stats = RadioStatsTable::new(3, &config);
    let mut assignment = aerolink_router::LinkAssignmentTable::new(3);
    assignment.assign(2, 1, 1);
    let mut queue = MockQueue::default();

    broadcaster.tick(0, &inventory, Some(&model), &assignment, &mut stats, &mut queue);

    assert_eq!(stats.entry(2).unwrap().record.last_recv_rate_bps, 64_000);
    assert_eq!(
        stats.entry(2).unwrap().record.last_recv_rate_data_bps,
        64_000
    );
}
