//! MenuLink demo: a controller talking to a simulated device.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  LoopbackTransport   SimulatedDevice   LogEventSink            │
//! │  (Transport)         (device peer)     (EventSink)             │
//! │  SystemClock         ThreadInterval                            │
//! │  (Clock)             (Interval)                                │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          RemoteController · CorrelationTracker         │    │
//! │  │          WireCodec · MessageTypeRegistry               │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  TickScheduler (dedicated thread)                              │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `menulink [config.json]`. Log level comes from `RUST_LOG`.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;

use menulink::adapters::log_sink::LogEventSink;
use menulink::adapters::loopback::{LoopbackTransport, loopback_pair};
use menulink::adapters::sim_device::{SimulatedDevice, demo_menu};
use menulink::adapters::time::SystemClock;
use menulink::app::ports::StatusObserver;
use menulink::app::service::RemoteController;
use menulink::config::SyncConfig;
use menulink::edit::{CorrelationTracker, RenderingStatus, SessionTiming};
use menulink::protocol::command::{AckStatus, ChangeValue, MenuItemId};
use menulink::protocol::registry::MessageTypeRegistry;
use menulink::scheduler::{ThreadInterval, TickScheduler};

type Controller = RemoteController<LoopbackTransport>;
type Device = SimulatedDevice<LoopbackTransport>;

/// Shuttle bytes both ways until neither side has anything left.
fn pump(ctl: &mut Controller, dev: &mut Device, sink: &mut LogEventSink) -> Result<()> {
    loop {
        let handled = dev.poll()?;
        let decoded = ctl.poll(sink)?;
        if handled == 0 && decoded == 0 {
            return Ok(());
        }
    }
}

fn main() -> Result<()> {
    // ── 1. Logging + config ───────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("╔══════════════════════════════════════╗");
    info!("║  MenuLink v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = match std::env::args().nth(1) {
        Some(path) => SyncConfig::load(Path::new(&path))
            .with_context(|| format!("loading config from {path}"))?,
        None => SyncConfig::default(),
    };
    config.validate()?;

    // ── 2. Core wiring ────────────────────────────────────────
    let registry = Arc::new(MessageTypeRegistry::standard()?);
    let clock = Arc::new(SystemClock::new());
    let tracker = Arc::new(CorrelationTracker::new(clock, SessionTiming::from(&config)));

    let (ctl_link, dev_link) = loopback_pair();
    let mut device = SimulatedDevice::new(dev_link, registry.clone(), "amp-01", "2b9d8f0e-demo")
        .with_menu(demo_menu());
    let mut controller = RemoteController::new(ctl_link, registry, tracker.clone(), config.clone());
    let mut sink = LogEventSink::new();

    let ticker = TickScheduler::new(tracker.clone())
        .spawn(ThreadInterval::new(config.tick_interval()))
        .context("spawning ticker")?;

    // ── 3. Join + bootstrap ───────────────────────────────────
    controller.send_join()?;
    pump(&mut controller, &mut device, &mut sink)?;

    // ── 4. Tracked edits ──────────────────────────────────────
    let observer: Arc<dyn StatusObserver> = Arc::new(|item: MenuItemId, status: RenderingStatus| {
        info!("UI    | item {item} -> {status:?}");
    });
    let volume = tracker.bind(1, observer);

    controller.send_edit(&volume, ChangeValue::Delta(5))?;
    pump(&mut controller, &mut device, &mut sink)?;

    device.set_ack_status(AckStatus::ValueRangeWarning);
    controller.send_edit(&volume, ChangeValue::Absolute("250".into()))?;
    pump(&mut controller, &mut device, &mut sink)?;
    device.set_ack_status(AckStatus::Success);

    // Let the error status age back to normal.
    thread::sleep(Duration::from_millis(config.recent_update_ms + 3 * config.tick_interval_ms));

    // ── 5. Device-originated change ───────────────────────────
    device.push_value(1, ChangeValue::Absolute("42".into()))?;
    pump(&mut controller, &mut device, &mut sink)?;
    controller.tick(&mut sink)?;

    // ── 6. Shutdown ───────────────────────────────────────────
    controller.close(&mut sink)?;
    tracker.unbind(volume.id());
    let ticks = ticker.stop();

    let stats = controller.stats().snapshot();
    info!("ticker ran {ticks} ticks, {} events emitted", sink.emitted());
    info!("stats {}", serde_json::to_string(&stats)?);
    Ok(())
}
