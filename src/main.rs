//! btserver firmware main entry point.
//!
//! Hexagonal layout with a single event-dispatch worker.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  Bluedroid callbacks ──▶ DispatchHandle ◀── HeartbeatTimer     │
//! │                               │                                │
//! │  ──────────────── Dispatcher queue (10) ─────────────────      │
//! │                               ▼                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │        AppService (worker "BtAppT", pure logic)        │    │
//! │  │   transport Fsm · media sub-machine · GattProfile      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                               │ ports                          │
//! │                       BluedroidAdapter                         │
//! │                                                                │
//! │  RmsProducer (own task) ── SharedState ──▶ NotifyPort          │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;

use anyhow::{Context, Result};
use core::time::Duration;
use log::{error, info};

use btserver::adapters::bluedroid::{self, BluedroidAdapter};
use btserver::adapters::nvs;
use btserver::app::ports::GattsPort;
use btserver::app::service::AppService;
use btserver::config::DeviceConfig;
use btserver::dispatcher::Dispatcher;
use btserver::drivers::hw_timer::HeartbeatTimer;
use btserver::error::Error;
use btserver::events::Event;
use btserver::oscillator::{Oscillator, SampleSource};
use btserver::producer::RmsProducer;
use btserver::shared::SharedState;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("btserver v{}", env!("CARGO_PKG_VERSION"));

    let config = DeviceConfig::default();
    config.validate().context("device config")?;

    // ── 2. Storage and Bluetooth host ─────────────────────────
    nvs::init_storage().context("nvs")?;
    bluedroid::init_stack().context("bluetooth stack")?;

    // ── 3. Shared state and audio source ──────────────────────
    let shared = Arc::new(SharedState::new());
    let source = Arc::new(SampleSource::new(Oscillator::new(
        config.tone_hz,
        config.sample_rate_hz,
        config.tone_amplitude,
    )));

    // ── 4. Dispatcher worker ──────────────────────────────────
    let adapter = BluedroidAdapter::new(&config.device_name);
    let mut service = AppService::new(
        &config,
        Arc::clone(&shared),
        Arc::clone(&source),
        adapter.clone(),
    );
    service.start();

    let send_timeout = embassy_time::Duration::from_millis(u64::from(config.dispatch_timeout_ms));
    let dispatcher = Dispatcher::start_with_timeout(service, send_timeout)
        .context("dispatcher worker spawn")?;
    bluedroid::install(dispatcher.handle(), Arc::clone(&source)).context("callback install")?;

    // The transport machine's first step runs on the worker.
    dispatcher
        .dispatch(Event::StackUp)
        .map_err(Error::from)
        .context("stack-up dispatch")?;

    // ── 5. Low-energy service registration ────────────────────
    bluedroid::register_le_callbacks().context("LE callbacks")?;
    let mut gatts = adapter.clone();
    gatts
        .register_app(config.app_id)
        .map_err(Error::from)
        .context("gatts app register")?;
    if let Err(e) = gatts.set_local_mtu(config.local_mtu) {
        log::warn!("GATTS: set local MTU {} failed: {}", config.local_mtu, e);
    }

    // ── 6. Heartbeat and telemetry ────────────────────────────
    let _heartbeat = HeartbeatTimer::start(
        Duration::from_millis(u64::from(config.heartbeat_period_ms)),
        dispatcher.handle(),
    )
    .context("heartbeat timer")?;

    // SAFETY: esp_random has no preconditions once the radio is up.
    let seed = unsafe { esp_idf_svc::sys::esp_random() };
    let producer = RmsProducer::new(&config, Arc::clone(&shared), adapter, seed)
        .spawn()
        .context("producer spawn")?;

    info!("btserver: bring-up complete");

    // Both tasks run forever; keep the dispatcher and timer alive with them.
    if producer.join().is_err() {
        error!("btserver: producer task panicked");
    }
    drop(dispatcher);
    Ok(())
}
