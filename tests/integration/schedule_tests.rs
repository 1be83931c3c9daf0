//! Scheduled delivery over the simulated link: daily wall-clock entries,
//! one-shot uptime entries and their arbitration against the hub.

use retrofit::app::events::{DeliveryState, LogEventKind};
use retrofit::clock::{WallClock, WallClockSnapshot};
use retrofit::config::BridgeConfig;
use retrofit::ir::command::Command;
use retrofit::scheduler::WeekdayMask;

use crate::mock_hw::Loopback;

const STEP_MS: u32 = 10;
/// 2024-03-11 06:00:00 UTC, a Monday.
const MONDAY_0600_UTC_MS: u64 = 1_710_136_800_000;

#[test]
fn daily_entry_fires_once_per_day() {
    let mut link = Loopback::new(&BridgeConfig::default());
    link.bridge
        .scheduler_mut()
        .add_daily_entry(7, 0, 0, Command::On, WeekdayMask::WEEKDAYS)
        .unwrap();

    link.wall = WallClockSnapshot::from_local(20240311, 1, 6, 59, 59);
    link.run(3, STEP_MS, None);
    assert_eq!(link.log.count_kind(LogEventKind::ScheduleCommand), 0);

    link.wall = WallClockSnapshot::from_local(20240311, 1, 7, 0, 0);
    link.run(2, STEP_MS, None);
    assert!(link.heater.heater().is_on);
    assert!(link.bridge.health().power_enabled);

    link.wall = WallClockSnapshot::from_local(20240311, 1, 7, 30, 0);
    link.run(3, STEP_MS, None);
    assert_eq!(link.log.count_kind(LogEventKind::ScheduleCommand), 1);

    // Tuesday: fires again and the log carries the new date.
    link.wall = WallClockSnapshot::from_local(20240312, 2, 7, 0, 1);
    link.run(2, STEP_MS, None);
    assert_eq!(link.log.count_kind(LogEventKind::ScheduleCommand), 2);
    let sched = link
        .log
        .iter()
        .filter(|e| e.kind == LogEventKind::ScheduleCommand)
        .last()
        .copied()
        .unwrap();
    assert_eq!(sched.date_key, 20240312);
    assert_eq!(sched.seconds_of_day, 7 * 3600 + 1);
}

#[test]
fn weekend_mask_skips_weekdays() {
    let mut link = Loopback::new(&BridgeConfig::default());
    link.bridge
        .scheduler_mut()
        .add_daily_entry(8, 0, 0, Command::On, WeekdayMask::WEEKEND)
        .unwrap();

    link.wall = WallClockSnapshot::from_local(20240311, 1, 9, 0, 0);
    link.run(3, STEP_MS, None);
    assert_eq!(link.log.count_kind(LogEventKind::ScheduleCommand), 0);

    link.wall = WallClockSnapshot::from_local(20240316, 6, 9, 0, 0);
    link.run(2, STEP_MS, None);
    assert_eq!(link.log.count_kind(LogEventKind::ScheduleCommand), 1);
    assert!(link.heater.heater().is_on);
}

#[test]
fn wall_clock_drives_schedule_with_utc_offset() {
    let mut link = Loopback::new(&BridgeConfig::default());
    link.bridge
        .scheduler_mut()
        .add_daily_entry(7, 0, 0, Command::On, WeekdayMask::ALL)
        .unwrap();

    // UTC+1: 05:59:59 UTC is 06:59:59 local.
    let mut clock = WallClock::new(3600);
    assert!(clock.set_unix_time_ms(MONDAY_0600_UTC_MS - 1_000, 0));

    for _ in 0..99 {
        link.wall = clock.now(link.now_ms + STEP_MS);
        link.step(STEP_MS, None);
    }
    assert_eq!(link.bridge.state(), DeliveryState::Idle);
    assert_eq!(link.log.count_kind(LogEventKind::ScheduleCommand), 0);

    // 1000 ms after the anchor: 07:00:00 local.
    link.wall = clock.now(link.now_ms + STEP_MS);
    assert_eq!((link.wall.hour, link.wall.minute, link.wall.second), (7, 0, 0));
    assert_eq!(link.wall.weekday, 1);
    link.step(STEP_MS, None);
    assert_eq!(link.bridge.state(), DeliveryState::WaitingAck);
    link.step(STEP_MS, None);
    assert!(link.heater.heater().is_on);
}

#[test]
fn hub_preempts_due_entry_which_follows_after_ack() {
    let mut link = Loopback::new(&BridgeConfig::default());
    link.bridge.scheduler_mut().add_entry(5, Command::On).unwrap();
    link.hub.push(Command::TempUp).unwrap();

    link.step(STEP_MS, None);
    assert_eq!(link.log.count_kind(LogEventKind::HubCommandRx), 1);
    assert_eq!(link.log.count_kind(LogEventKind::ScheduleCommand), 0);
    assert_eq!(link.bridge.scheduler().active_count(), 1, "entry stays pending");

    // Ack for TEMP_UP arrives and the entry goes out in the same tick.
    link.step(STEP_MS, None);
    assert_eq!(link.log.count_kind(LogEventKind::ScheduleCommand), 1);
    assert_eq!(link.bridge.scheduler().active_count(), 0);

    link.step(STEP_MS, None);
    assert_eq!(link.bridge.state(), DeliveryState::Idle);
    assert!(link.heater.heater().is_on);
    assert_eq!(link.heater.heater().target_temperature_c, 22.0);
}

#[test]
fn disabled_scheduler_holds_entries() {
    let config = BridgeConfig {
        scheduler_enabled: false,
        ..BridgeConfig::default()
    };
    let mut link = Loopback::new(&config);
    link.bridge.scheduler_mut().add_entry(0, Command::On).unwrap();

    link.run(5, STEP_MS, None);
    assert_eq!(link.log.count_kind(LogEventKind::ScheduleCommand), 0);
    assert_eq!(link.bridge.scheduler().active_count(), 1);

    link.bridge.scheduler_mut().set_enabled(true);
    link.run(2, STEP_MS, None);
    assert!(link.heater.heater().is_on);
}

#[test]
fn default_schedule_drives_heater_after_boot() {
    let config = BridgeConfig::default();
    let mut link = Loopback::new(&config);
    for spec in &config.default_schedule {
        link.bridge.scheduler_mut().add_spec(*spec, 0).unwrap();
    }

    // +2 s ON, +6 s TEMP_UP, +12 s OFF; dailies wait for a wall clock.
    link.run(201, STEP_MS, None);
    assert!(link.heater.heater().is_on);
    assert!(link.bridge.health().power_enabled);

    link.run(400, STEP_MS, None);
    assert_eq!(link.heater.heater().target_temperature_c, 22.0);

    link.run(600, STEP_MS, None);
    assert!(!link.heater.heater().is_on);
    assert_eq!(link.log.count_kind(LogEventKind::ScheduleCommand), 3);
    assert_eq!(link.log.count_kind(LogEventKind::AckReceived), 3);
    assert_eq!(link.bridge.scheduler().active_count(), 2, "daily entries remain");
}
