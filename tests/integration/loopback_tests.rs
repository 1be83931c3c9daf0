//! Bridge ⇄ heater over the simulated IR link: encode, pulse capture,
//! decode, apply, acknowledge, retry.

use retrofit::app::commands::CommandOrigin;
use retrofit::app::events::{BridgeEvent, DeliveryState, EventStamp, LogEventKind};
use retrofit::config::BridgeConfig;
use retrofit::ir::codec::ProtocolCodec;
use retrofit::ir::command::{Command, FrameKind};

use crate::mock_hw::Loopback;

const STEP_MS: u32 = 10;

fn link() -> Loopback {
    Loopback::new(&BridgeConfig::default())
}

#[test]
fn hub_command_is_acknowledged_end_to_end() {
    let mut link = link();
    link.hub.push(Command::On).unwrap();

    link.step(STEP_MS, None);
    assert_eq!(link.bridge.state(), DeliveryState::WaitingAck);

    link.step(STEP_MS, None);
    assert!(link.heater.heater().is_on);
    assert_eq!(link.bridge.state(), DeliveryState::Idle);
    assert!(link.bridge.health().heater_commanded_on);
    assert!(link.bridge.health().power_enabled);

    assert_eq!(link.log.count_kind(LogEventKind::HubCommandRx), 1);
    assert_eq!(link.log.count_kind(LogEventKind::CommandSent), 1);
    assert_eq!(link.log.count_kind(LogEventKind::AckReceived), 1);
    assert_eq!(link.heater_events.count(|e| matches!(e, BridgeEvent::AckSent { .. })), 1);
}

#[test]
fn lost_command_is_retransmitted() {
    let mut link = link();
    link.lose_to_heater = 1;
    link.hub.push(Command::TempUp).unwrap();

    // Sent at 10 ms, retransmitted at 130 ms, acked at 140 ms.
    link.run(13, STEP_MS, None);
    assert_eq!(link.bridge.state(), DeliveryState::WaitingAck);
    link.step(STEP_MS, None);

    assert_eq!(link.bridge.state(), DeliveryState::Idle);
    assert_eq!(link.heater.heater().target_temperature_c, 22.0);
    let ack = link.log.iter().find(|e| e.kind == LogEventKind::AckReceived).copied().unwrap();
    assert_eq!(ack.detail, 2, "acknowledged on the second attempt");
    assert_eq!(link.bridge.stats().retried, 1);
}

#[test]
fn lost_ack_reapplies_relative_step() {
    let mut link = link();
    link.lose_to_bridge = 1;
    link.hub.push(Command::TempUp).unwrap();

    link.run(14, STEP_MS, None);
    assert_eq!(link.bridge.state(), DeliveryState::Idle);
    // Heater saw the command twice; the bridge stepped its own setpoint once.
    assert_eq!(link.heater.heater().target_temperature_c, 23.0);
    assert_eq!(link.bridge.health().target_temperature_c, 22.0);
}

#[test]
fn silent_heater_drops_after_three_attempts() {
    let mut link = link();
    link.lose_to_heater = usize::MAX;
    link.hub.push(Command::Off).unwrap();

    link.run(40, STEP_MS, None);
    assert_eq!(link.bridge.state(), DeliveryState::Idle);
    assert_eq!(link.log.count_kind(LogEventKind::CommandSent), 3);
    assert_eq!(link.log.count_kind(LogEventKind::CommandDropped), 1);
    assert!(link.bridge.health().cooling_down);
}

#[test]
fn thermostat_cycles_heater_through_link() {
    let mut link = link();
    link.hub.push(Command::On).unwrap();
    link.run(2, STEP_MS, Some(21.0));
    assert!(link.heater.heater().is_on);

    // Room overshoots: thermostat turns the heater off, power stays enabled.
    link.run(2, STEP_MS, Some(22.0));
    assert!(!link.heater.heater().is_on);
    assert!(!link.bridge.health().heater_commanded_on);
    assert!(link.bridge.health().power_enabled);
    assert_eq!(link.log.count_kind(LogEventKind::ThermostatControl), 1);

    // Room falls to the lower edge: back on.
    link.run(2, STEP_MS, Some(20.5));
    assert!(link.heater.heater().is_on);
    assert_eq!(link.log.count_kind(LogEventKind::ThermostatControl), 2);
}

#[test]
fn learned_remote_frame_is_replayed() {
    let config = BridgeConfig::default();
    let mut link = Loopback::new(&config);
    let stamp = EventStamp::new(link.now_ms, &link.wall);
    assert!(link.bridge.start_learning(Command::On, &stamp, &mut link.log));

    let remote = ProtocolCodec::new(config.address())
        .encode(Command::On, FrameKind::Command)
        .unwrap()
        .to_pulses()
        .to_vec();
    link.remote_press(remote);
    link.step(STEP_MS, None);

    assert!(!link.bridge.is_learning());
    assert!(link.bridge.learned().get(Command::On).is_some());
    assert_eq!(link.log.count_kind(LogEventKind::LearningSuccess), 1);

    let stamp = EventStamp::new(link.now_ms, &link.wall);
    assert!(link.bridge.send_immediate(Command::On, CommandOrigin::Direct, &stamp, &mut link.log));
    link.step(STEP_MS, None);
    assert!(link.heater.heater().is_on);
    assert_eq!(link.bridge.state(), DeliveryState::Idle);
}

#[test]
fn bridge_ignores_foreign_address() {
    let mut link = link();
    link.hub.push(Command::On).unwrap();
    link.step(STEP_MS, None);

    // A different heater's ack must not complete our delivery.
    let foreign = ProtocolCodec::new(retrofit::ir::codec::DeviceAddress(0x1234))
        .encode(Command::On, FrameKind::Ack)
        .unwrap()
        .to_pulses()
        .to_vec();
    link.to_heater.borrow_mut().clear();
    link.remote_press(foreign);
    link.step(STEP_MS, None);
    assert_eq!(link.bridge.state(), DeliveryState::WaitingAck);
}
