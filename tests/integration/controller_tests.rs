//! Controller against the simulated device over a loopback link.

use menulink::app::events::{ConnectionState, ControllerEvent};
use menulink::correlation::CorrelationId;
use menulink::edit::RenderingStatus;
use menulink::protocol::command::{
    AckStatus, BootstrapPhase, ChangeValue, Command, DialogButton, DialogMode, DialogUpdate,
    HeartbeatMode,
};
use menulink::protocol::transport::Transport;

use crate::mocks::{RecordingObserver, Rig};

use RenderingStatus::{CorrelationError, EditInProgress, Normal, RecentUpdate};

#[test]
fn join_brings_up_link_and_bootstraps_menu() {
    let mut rig = Rig::new();
    rig.controller.send_join().unwrap();
    rig.pump();

    assert_eq!(rig.controller.connection_state(), ConnectionState::Connected);

    let events = &rig.sink.events;
    assert_eq!(
        events[0],
        ControllerEvent::ConnectionChanged {
            from: ConnectionState::Disconnected,
            to: ConnectionState::Connected,
        }
    );
    assert!(matches!(&events[1], ControllerEvent::Joined { name, .. } if name == "amp-01"));
    assert_eq!(events[2], ControllerEvent::Bootstrap(BootstrapPhase::Start));
    assert_eq!(
        rig.sink.count(|e| matches!(e, ControllerEvent::ItemBooted(_))),
        5
    );
    assert_eq!(events.last(), Some(&ControllerEvent::Bootstrap(BootstrapPhase::End)));

    // The device saw our join and the opening heartbeat.
    assert!(matches!(rig.device.received()[0], Command::Join(_)));
    assert!(matches!(
        &rig.device.received()[1],
        Command::Heartbeat(hb) if hb.mode == HeartbeatMode::Start
    ));
}

#[test]
fn acknowledged_edit_shows_success_then_reverts() {
    let mut rig = Rig::new();
    let observer = RecordingObserver::new();
    let volume = rig.tracker().bind(1, observer.clone());

    let id = rig.controller.send_edit(&volume, ChangeValue::Delta(3)).unwrap();
    assert_eq!(volume.status(), EditInProgress);
    rig.pump();

    assert_eq!(volume.status(), RecentUpdate);
    assert_eq!(volume.pending(), None);
    match &rig.device.received()[0] {
        Command::ValueChange(vc) => {
            assert_eq!(vc.correlation, id);
            assert_eq!(vc.change, ChangeValue::Delta(3));
        }
        other => panic!("unexpected {other:?}"),
    }

    rig.clock.set(1001);
    rig.tracker().tick();
    assert_eq!(observer.statuses(), vec![EditInProgress, RecentUpdate, Normal]);
}

#[test]
fn rejected_edit_shows_error() {
    let mut rig = Rig::new();
    let session = rig.tracker().bind_unobserved(2);
    rig.device.set_ack_status(AckStatus::ValueRangeWarning);

    rig.controller
        .send_edit(&session, ChangeValue::Absolute("9".into()))
        .unwrap();
    rig.pump();
    assert_eq!(session.status(), CorrelationError);
}

#[test]
fn held_ack_for_orphaned_edit_is_ignored() {
    let mut rig = Rig::new();
    let session = rig.tracker().bind_unobserved(1);
    rig.device.hold_acks(true);

    let first = rig.controller.send_edit(&session, ChangeValue::Delta(1)).unwrap();
    let second = rig.controller.send_edit(&session, ChangeValue::Delta(1)).unwrap();
    rig.pump();
    assert_eq!(rig.device.held_acks().len(), 2);
    assert_eq!(rig.device.held_acks()[0].correlation, first);

    rig.device.release_acks().unwrap();
    rig.pump();

    assert_eq!(session.status(), RecentUpdate);
    let stats = rig.controller.stats().snapshot();
    assert_eq!(stats.acks_matched, 1);
    assert_eq!(stats.stale_acks, 1);
    assert_eq!(stats.orphaned, 1);
    assert_ne!(first, second);
}

#[test]
fn lost_ack_times_out_once() {
    let mut rig = Rig::new();
    let observer = RecordingObserver::new();
    let session = rig.tracker().bind(1, observer.clone());
    rig.device.hold_acks(true);

    rig.controller.send_edit(&session, ChangeValue::Delta(1)).unwrap();
    rig.pump();

    for t in (100..=6100).step_by(100) {
        rig.clock.set(t);
        rig.tracker().tick();
    }
    assert_eq!(
        observer.statuses(),
        vec![EditInProgress, CorrelationError, Normal]
    );

    // The ack arrives long after the timeout.
    rig.device.release_acks().unwrap();
    rig.pump();
    assert_eq!(session.status(), Normal);
    assert_eq!(rig.controller.stats().snapshot().correlation_timeouts, 1);
}

#[test]
fn device_push_marks_bound_sessions() {
    let mut rig = Rig::new();
    let session = rig.tracker().bind_unobserved(5);
    rig.device
        .push_value(5, ChangeValue::Absolute("amp-02".into()))
        .unwrap();
    rig.pump();

    assert_eq!(session.status(), RecentUpdate);
    assert!(rig.sink.events.contains(&ControllerEvent::RemoteUpdate {
        item_id: 5,
        change: ChangeValue::Absolute("amp-02".into()),
    }));
}

#[test]
fn binary_replies_are_understood() {
    let mut rig = Rig::new().with_binary_replies();
    let session = rig.tracker().bind_unobserved(1);

    rig.controller.send_edit(&session, ChangeValue::Delta(-1)).unwrap();
    rig.pump();
    assert_eq!(session.status(), RecentUpdate);
}

#[test]
fn unknown_message_changes_nothing() {
    let mut rig = Rig::new();
    let observer = RecordingObserver::new();
    let session = rig.tracker().bind(1, observer.clone());

    rig.device
        .transport_mut()
        .send(&[0x01, 0x01, b'N', b'M', b'=', b'V', b'o', b'l', b'~'])
        .unwrap();
    assert_eq!(rig.controller.poll(&mut rig.sink).unwrap(), 0);

    assert_eq!(session.status(), Normal);
    assert_eq!(observer.count(), 0);
    assert_eq!(rig.controller.connection_state(), ConnectionState::Disconnected);
    assert_eq!(rig.tracker().outstanding_count(), 0);
    assert_eq!(rig.controller.stats().snapshot().unknown_dropped, 1);
    assert_eq!(rig.sink.events.len(), 1);
}

#[test]
fn silent_device_loses_the_link() {
    let mut rig = Rig::new();
    rig.controller.send_join().unwrap();
    rig.pump();
    rig.sink.events.clear();

    // Heartbeats keep flowing while the device answers.
    rig.clock.set(1500);
    rig.controller.tick(&mut rig.sink).unwrap();
    rig.pump();
    assert_eq!(rig.controller.connection_state(), ConnectionState::Connected);

    // Stop answering: heartbeats go out, nothing comes back.
    rig.clock.set(6001);
    rig.controller.tick(&mut rig.sink).unwrap();
    assert_eq!(rig.controller.connection_state(), ConnectionState::Lost);
    assert_eq!(
        rig.sink.events,
        vec![ControllerEvent::ConnectionChanged {
            from: ConnectionState::Connected,
            to: ConnectionState::Lost,
        }]
    );

    // Any traffic restores it.
    rig.pump();
    assert_eq!(rig.controller.connection_state(), ConnectionState::Connected);
}

#[test]
fn dialog_is_forwarded_to_the_sink() {
    let mut rig = Rig::new();
    let dialog = DialogUpdate {
        mode: DialogMode::Show,
        header: "Reset?".into(),
        buffer: "All settings".into(),
        button1: DialogButton::Ok,
        button2: DialogButton::Cancel,
        correlation: CorrelationId::EMPTY,
    };
    rig.device.send(&Command::DialogUpdate(dialog.clone())).unwrap();
    rig.pump();
    assert!(rig.sink.events.contains(&ControllerEvent::Dialog(dialog)));
}

#[test]
fn close_sends_goodbye_and_disconnects() {
    let mut rig = Rig::new();
    rig.controller.send_join().unwrap();
    rig.pump();

    rig.controller.close(&mut rig.sink).unwrap();
    assert_eq!(rig.controller.connection_state(), ConnectionState::Disconnected);
    rig.pump();
    assert!(matches!(
        rig.device.received().last(),
        Some(Command::Heartbeat(hb)) if hb.mode == HeartbeatMode::End
    ));
}
