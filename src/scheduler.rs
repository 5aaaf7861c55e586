//! Periodic tick driver.
//!
//! Ages transient rendering statuses and expires unanswered correlations
//! by ticking every live session at a fixed period (100 ms by default).
//! The timing source is injected through [`Interval`], so the loop runs
//! on a real thread in production and on a scripted clock in tests.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Tick Sources                             │
//! │                                                              │
//! │  ┌────────────────┐   ┌──────────────────┐   ┌────────────┐  │
//! │  │ ThreadInterval │   │ scripted interval│   │ direct     │  │
//! │  │ (sleep period) │   │ (tests)          │   │ tick()     │  │
//! │  └───────┬────────┘   └────────┬─────────┘   └─────┬──────┘  │
//! │          │                     │                   │         │
//! │          ▼                     ▼                   ▼         │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                   TickScheduler                        │  │
//! │  └───────────────────────┬────────────────────────────────┘  │
//! │                          ▼                                   │
//! │              CorrelationTracker.tick()                       │
//! │              EditSession.tick_at(now) × N                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::edit::{CorrelationTracker, TickReport};

// ═══════════════════════════════════════════════════════════════
//  Intervals
// ═══════════════════════════════════════════════════════════════

/// Source of tick deadlines.
pub trait Interval: Send {
    /// Block until the next tick is due.
    fn wait(&mut self);
}

/// Fixed-rate interval on the calling thread.
///
/// Deadlines advance by exactly one period, so a slow tick does not
/// shift later ones. Ticks missed entirely are skipped, not replayed.
#[derive(Debug)]
pub struct ThreadInterval {
    period: Duration,
    next: Instant,
}

impl ThreadInterval {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
        }
    }
}

impl Interval for ThreadInterval {
    fn wait(&mut self) {
        let now = Instant::now();
        if self.next > now {
            thread::sleep(self.next - now);
            self.next += self.period;
        } else {
            self.next = now + self.period;
        }
    }
}

/// Cloneable stop flag for a running tick loop.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

pub struct TickScheduler {
    tracker: Arc<CorrelationTracker>,
}

impl TickScheduler {
    pub fn new(tracker: Arc<CorrelationTracker>) -> Self {
        Self { tracker }
    }

    /// One pass over every live session.
    pub fn tick(&self) -> TickReport {
        self.tracker.tick()
    }

    /// Tick on every interval deadline until `stop` is raised.
    /// Returns the number of ticks run.
    pub fn run(&self, interval: &mut dyn Interval, stop: &StopHandle) -> u64 {
        let mut ticks = 0;
        while !stop.is_stopped() {
            interval.wait();
            if stop.is_stopped() {
                break;
            }
            let report = self.tick();
            if report.reverted + report.expired > 0 {
                debug!(
                    "ticker: {} reverted, {} expired over {} sessions",
                    report.reverted, report.expired, report.sessions
                );
            }
            ticks += 1;
        }
        ticks
    }

    /// Run the loop on a dedicated thread.
    pub fn spawn<I>(self, mut interval: I) -> std::io::Result<TickerHandle>
    where
        I: Interval + 'static,
    {
        let stop = StopHandle::new();
        let flag = stop.clone();
        let thread = thread::Builder::new()
            .name("menulink-ticker".into())
            .spawn(move || {
                info!("ticker: started");
                let ticks = self.run(&mut interval, &flag);
                info!("ticker: stopped after {ticks} ticks");
                ticks
            })?;
        Ok(TickerHandle {
            stop,
            thread: Some(thread),
        })
    }
}

/// Owns the ticker thread. Dropping it stops and joins the thread.
#[derive(Debug)]
pub struct TickerHandle {
    stop: StopHandle,
    thread: Option<JoinHandle<u64>>,
}

impl TickerHandle {
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Stop the loop and wait for it. Returns the ticks run.
    pub fn stop(mut self) -> u64 {
        self.shutdown()
    }

    fn shutdown(&mut self) -> u64 {
        self.stop.stop();
        self.thread
            .take()
            .map_or(0, |t| t.join().unwrap_or_default())
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::time::ManualClock;
    use crate::app::ports::{Clock, StatusObserver};
    use crate::edit::{RenderingStatus, SessionTiming};
    use crate::protocol::command::MenuItemId;
    use parking_lot::Mutex;

    /// Advances a manual clock one period per wait and stops after a
    /// fixed number of waits.
    struct ScriptedInterval {
        clock: Arc<ManualClock>,
        period_ms: u64,
        remaining: u32,
        stop: StopHandle,
    }

    impl Interval for ScriptedInterval {
        fn wait(&mut self) {
            if self.remaining == 0 {
                self.stop.stop();
                return;
            }
            self.remaining -= 1;
            self.clock.advance(self.period_ms);
        }
    }

    #[test]
    fn scripted_run_expires_edit_once() {
        let clock = Arc::new(ManualClock::new(0));
        let tracker = Arc::new(CorrelationTracker::new(clock.clone(), SessionTiming::default()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer: Arc<dyn StatusObserver> =
            Arc::new(move |_: MenuItemId, s: RenderingStatus| sink.lock().push(s));
        let session = tracker.bind(1, observer);
        tracker.begin_edit(session.id()).unwrap();

        let stop = StopHandle::new();
        let mut interval = ScriptedInterval {
            clock: clock.clone(),
            period_ms: 100,
            remaining: 55,
            stop: stop.clone(),
        };
        let ticks = TickScheduler::new(tracker.clone()).run(&mut interval, &stop);

        assert_eq!(ticks, 55);
        assert_eq!(clock.now_ms(), 5500);
        assert_eq!(
            *seen.lock(),
            vec![RenderingStatus::EditInProgress, RenderingStatus::CorrelationError]
        );
        assert_eq!(tracker.stats().snapshot().correlation_timeouts, 1);
    }

    #[test]
    fn stopped_handle_runs_nothing() {
        let clock = Arc::new(ManualClock::new(0));
        let tracker = Arc::new(CorrelationTracker::new(clock.clone(), SessionTiming::default()));
        let stop = StopHandle::new();
        stop.stop();
        let mut interval = ScriptedInterval {
            clock,
            period_ms: 100,
            remaining: 10,
            stop: stop.clone(),
        };
        assert_eq!(TickScheduler::new(tracker).run(&mut interval, &stop), 0);
    }

    #[test]
    fn threaded_ticker_smoke() {
        let clock = Arc::new(crate::adapters::time::SystemClock::new());
        let tracker = Arc::new(CorrelationTracker::new(clock, SessionTiming::default()));
        let handle = TickScheduler::new(tracker)
            .spawn(ThreadInterval::new(Duration::from_millis(1)))
            .unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(handle.stop() > 0);
    }
}
