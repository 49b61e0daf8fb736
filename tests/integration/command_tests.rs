//! Remote commands routed through the hub session.

use std::time::Duration;

use telemon::app::commands::CommandHandler;
use telemon::fsm::session::HubSession;

use crate::mock_hw::{
    MockDelay, MockHardware, Step, Timeline, TimelineDelay, TimelineRelay, dps_target,
    inject_method, mock_hub,
};

fn invoke(names: &[&str]) -> (Vec<(String, i32, Vec<u8>)>, MockHardware, MockDelay) {
    let (prov, hub) = mock_hub();
    let mut s = HubSession::new(prov, dps_target(), Duration::from_secs(10));
    s.provision().unwrap();
    for name in names {
        inject_method(&hub, name);
    }

    let mut hw = MockHardware::new();
    let mut delay = MockDelay::default();
    s.pump(&mut CommandHandler::new(&mut hw, &mut delay));

    let responses = hub.borrow().responses.clone();
    (responses, hw, delay)
}

#[test]
fn trigger_alarm_pulses_relay_and_answers_200() {
    let (responses, hw, delay) = invoke(&["TriggerAlarm"]);

    assert_eq!(
        responses,
        vec![("TriggerAlarm".to_owned(), 200, b"\"Alarm Triggered\"".to_vec())]
    );
    assert_eq!(hw.relay_history(), vec![true, false]);
    assert_eq!(delay.total(), Duration::from_secs(1));
}

#[test]
fn trigger_alarm_holds_relay_for_the_whole_second() {
    let (prov, hub) = mock_hub();
    let mut s = HubSession::new(prov, dps_target(), Duration::from_secs(10));
    s.provision().unwrap();
    inject_method(&hub, "TriggerAlarm");

    let timeline = Timeline::default();
    let mut relay = TimelineRelay(timeline.clone());
    let mut delay = TimelineDelay(timeline.clone());
    s.pump(&mut CommandHandler::new(&mut relay, &mut delay));

    assert_eq!(
        *timeline.borrow(),
        vec![
            Step::Relay(true),
            Step::Delay(Duration::from_millis(1000)),
            Step::Relay(false),
        ]
    );
}

#[test]
fn unknown_method_answers_minus_one_with_empty_object() {
    let (responses, hw, delay) = invoke(&["Reboot"]);

    assert_eq!(responses, vec![("Reboot".to_owned(), -1, b"{}".to_vec())]);
    assert!(hw.relay_history().is_empty());
    assert_eq!(delay.total_ns, 0);
}

#[test]
fn method_names_are_case_sensitive() {
    let (responses, hw, _) = invoke(&["triggeralarm", "TRIGGERALARM"]);

    assert!(responses.iter().all(|(_, status, body)| *status == -1 && body == b"{}"));
    assert!(hw.relay_history().is_empty());
}

#[test]
fn repeated_alarms_each_pulse() {
    let (responses, hw, delay) = invoke(&["TriggerAlarm", "TriggerAlarm"]);

    assert_eq!(responses.len(), 2);
    assert_eq!(hw.relay_history(), vec![true, false, true, false]);
    assert_eq!(delay.total(), Duration::from_secs(2));
}
