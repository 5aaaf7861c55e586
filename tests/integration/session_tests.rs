//! Edit-session lifecycle through the tracker, on a manual clock.

use menulink::correlation::CorrelationId;
use menulink::edit::{RenderingStatus, TrackedAck};
use menulink::protocol::command::AckStatus;
use menulink::scheduler::TickScheduler;

use crate::mocks::{RecordingObserver, tracker};

use RenderingStatus::{CorrelationError, EditInProgress, Normal, RecentUpdate};

#[test]
fn unanswered_edit_expires_exactly_once() {
    let (tracker, clock) = tracker();
    let observer = RecordingObserver::new();
    let session = tracker.bind(10, observer.clone());

    let id = tracker.begin_edit(session.id()).unwrap();
    assert_eq!(session.status(), EditInProgress);
    assert_eq!(session.pending(), Some(id));

    clock.set(4999);
    assert_eq!(tracker.tick().expired, 0);
    assert_eq!(session.status(), EditInProgress);

    clock.set(5000);
    assert_eq!(tracker.tick().expired, 1);
    assert_eq!(session.status(), CorrelationError);
    assert_eq!(session.pending(), None);

    clock.set(5001);
    let report = tracker.tick();
    assert_eq!((report.expired, report.reverted), (0, 0));

    assert_eq!(observer.statuses(), vec![EditInProgress, CorrelationError]);
    assert_eq!(tracker.stats().snapshot().correlation_timeouts, 1);
    assert_eq!(tracker.outstanding_count(), 0);
}

#[test]
fn second_ack_for_same_id_is_ignored() {
    let (tracker, _clock) = tracker();
    let observer = RecordingObserver::new();
    let session = tracker.bind(10, observer.clone());
    let id = tracker.begin_edit(session.id()).unwrap();

    assert!(matches!(
        tracker.on_acknowledgement(id, AckStatus::Success),
        TrackedAck::Matched {
            status: RecentUpdate,
            ..
        }
    ));
    assert_eq!(tracker.on_acknowledgement(id, AckStatus::IdNotFound), TrackedAck::Stale);

    assert_eq!(session.status(), RecentUpdate);
    assert_eq!(observer.statuses(), vec![EditInProgress, RecentUpdate]);
    let stats = tracker.stats().snapshot();
    assert_eq!((stats.acks_matched, stats.stale_acks), (1, 1));
}

#[test]
fn newer_edit_orphans_the_older_one() {
    let (tracker, _clock) = tracker();
    let observer = RecordingObserver::new();
    let session = tracker.bind(10, observer.clone());

    let c1 = tracker.begin_edit(session.id()).unwrap();
    let c2 = tracker.begin_edit(session.id()).unwrap();
    assert_ne!(c1, c2);
    assert_eq!(tracker.outstanding_count(), 1);

    assert_eq!(tracker.on_acknowledgement(c1, AckStatus::Success), TrackedAck::Stale);
    assert_eq!(session.status(), EditInProgress);
    assert_eq!(session.pending(), Some(c2));

    tracker.on_acknowledgement(c2, AckStatus::InvalidCredentials);
    assert_eq!(session.status(), CorrelationError);
    assert_eq!(
        observer.statuses(),
        vec![EditInProgress, EditInProgress, CorrelationError]
    );
    assert_eq!(tracker.stats().snapshot().orphaned, 1);
}

#[test]
fn recent_update_reverts_only_after_the_window() {
    let (tracker, clock) = tracker();
    let observer = RecordingObserver::new();
    let session = tracker.bind(10, observer.clone());
    let id = tracker.begin_edit(session.id()).unwrap();
    tracker.on_acknowledgement(id, AckStatus::Success);

    clock.set(999);
    tracker.tick();
    assert_eq!(session.status(), RecentUpdate);

    clock.set(1000);
    tracker.tick();
    assert_eq!(session.status(), RecentUpdate);

    clock.set(1001);
    assert_eq!(tracker.tick().reverted, 1);
    assert_eq!(session.status(), Normal);
    assert_eq!(observer.last(), Some(Normal));
}

#[test]
fn error_status_also_reverts() {
    let (tracker, clock) = tracker();
    let session = tracker.bind_unobserved(10);
    tracker.begin_edit(session.id()).unwrap();

    clock.set(5000);
    tracker.tick();
    assert_eq!(session.status(), CorrelationError);

    clock.set(6001);
    tracker.tick();
    assert_eq!(session.status(), Normal);
}

#[test]
fn late_ack_after_unbind_is_harmless() {
    let (tracker, clock) = tracker();
    let observer = RecordingObserver::new();
    let session = tracker.bind(10, observer.clone());
    let id = tracker.begin_edit(session.id()).unwrap();

    assert!(tracker.unbind(session.id()));
    assert!(!tracker.unbind(session.id()));
    assert_eq!(tracker.on_acknowledgement(id, AckStatus::Success), TrackedAck::Stale);

    clock.set(10_000);
    let report = TickScheduler::new(tracker.clone()).tick();
    assert_eq!(report.sessions, 0);
    assert_eq!(observer.statuses(), vec![EditInProgress]);
    assert_eq!(tracker.begin_edit(session.id()), None);
}

#[test]
fn remote_update_waits_for_pending_edit() {
    let (tracker, _clock) = tracker();
    let editing = tracker.bind_unobserved(10);
    let idle = tracker.bind_unobserved(10);
    let other = tracker.bind_unobserved(11);

    tracker.begin_edit(editing.id()).unwrap();
    assert_eq!(tracker.mark_external_update(10), 1);

    assert_eq!(editing.status(), EditInProgress);
    assert_eq!(idle.status(), RecentUpdate);
    assert_eq!(other.status(), Normal);
}

#[test]
fn empty_correlation_starts_nothing() {
    let (tracker, _clock) = tracker();
    let observer = RecordingObserver::new();
    let session = tracker.bind(10, observer.clone());

    assert!(tracker.edit_started(session.id(), CorrelationId::EMPTY));
    assert_eq!(session.status(), Normal);
    assert_eq!(observer.count(), 0);
    assert_eq!(
        tracker.on_acknowledgement(CorrelationId::EMPTY, AckStatus::Success),
        TrackedAck::Stale
    );
}

#[test]
fn observer_may_reenter_the_tracker() {
    use std::sync::Arc;

    use menulink::app::ports::StatusObserver;
    use menulink::edit::CorrelationTracker;
    use menulink::protocol::command::MenuItemId;
    use parking_lot::Mutex;

    let (tracker, _clock) = tracker();
    let slot: Arc<Mutex<Option<Arc<CorrelationTracker>>>> = Arc::new(Mutex::new(None));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let (slot_ref, seen_ref) = (slot.clone(), seen.clone());
    let observer: Arc<dyn StatusObserver> =
        Arc::new(move |_: MenuItemId, status: RenderingStatus| {
            if let Some(t) = slot_ref.lock().as_ref() {
                seen_ref.lock().push((status, t.outstanding_count(), t.session_count()));
            }
        });
    *slot.lock() = Some(tracker.clone());

    let session = tracker.bind(10, observer);
    let id = tracker.begin_edit(session.id()).unwrap();
    tracker.on_acknowledgement(id, AckStatus::Success);

    assert_eq!(
        *seen.lock(),
        vec![(EditInProgress, 1, 1), (RecentUpdate, 0, 1)]
    );
    slot.lock().take();
}

#[test]
fn ticker_and_io_threads_agree_on_final_status() {
    use std::thread;

    const ROUNDS: u32 = 2_000;

    let (tracker, clock) = tracker();
    let observer = RecordingObserver::new();
    let session = tracker.bind(10, observer.clone());

    let ticker = {
        let (tracker, clock) = (tracker.clone(), clock.clone());
        thread::spawn(move || {
            for _ in 0..ROUNDS {
                clock.advance(7);
                tracker.tick();
            }
        })
    };

    let io = {
        let (tracker, session) = (tracker.clone(), session.clone());
        thread::spawn(move || {
            for round in 0..ROUNDS {
                match (session.pending(), round % 5) {
                    (_, 4) => {
                        tracker.mark_external_update(10);
                    }
                    (Some(id), r) => {
                        let status = if r % 2 == 0 {
                            AckStatus::Success
                        } else {
                            AckStatus::UnknownError
                        };
                        tracker.on_acknowledgement(id, status);
                    }
                    (None, _) => {
                        tracker.begin_edit(session.id());
                    }
                }
            }
        })
    };

    ticker.join().unwrap();
    io.join().unwrap();

    assert_eq!(observer.last(), Some(session.status()));
    assert_eq!(session.status() == EditInProgress, session.pending().is_some());
    assert_eq!(tracker.outstanding_count(), usize::from(session.pending().is_some()));

    clock.advance(6_000);
    tracker.tick();
    clock.advance(1_001);
    tracker.tick();
    assert_eq!(session.status(), Normal);
    assert_eq!(observer.last(), Some(Normal));
    assert_eq!(tracker.outstanding_count(), 0);
}
