//! Periodic RMS telemetry producer.
//!
//! Runs on its own task.  Every period it draws a new RMS magnitude (1–10),
//! publishes it in [`SharedState`], and notifies the connected client when
//! the value is above the configured threshold.  The sleep is compensated
//! for the time the cycle itself took.
//!
//! This task and the dispatcher worker act independently; their relative
//! ordering is unspecified.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::info;

use crate::app::ports::NotifyPort;
use crate::config::DeviceConfig;
use crate::shared::SharedState;

/// Largest RMS magnitude produced.
pub const RMS_MAX: u8 = 10;

const TASK_NAME: &str = "rms_producer";
const TASK_STACK_SIZE: usize = 4 * 1024;

/// Time left to sleep so that a cycle taking `elapsed` still lands on
/// `period`.  Zero if the cycle overran.
pub fn pace(elapsed: Duration, period: Duration) -> Duration {
    period.saturating_sub(elapsed)
}

// ───────────────────────────────────────────────────────────────
// Random source
// ───────────────────────────────────────────────────────────────

/// Park–Miller "minimal standard" generator (multiplier 48271).
#[derive(Debug, Clone)]
pub struct MinStd {
    state: u32,
}

impl MinStd {
    const MODULUS: u64 = 2_147_483_647;
    const MULTIPLIER: u64 = 48_271;

    pub fn new(seed: u32) -> Self {
        let state = (u64::from(seed) % Self::MODULUS) as u32;
        Self {
            state: if state == 0 { 1 } else { state },
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = ((u64::from(self.state) * Self::MULTIPLIER) % Self::MODULUS) as u32;
        self.state
    }
}

// ───────────────────────────────────────────────────────────────
// RmsProducer
// ───────────────────────────────────────────────────────────────

pub struct RmsProducer<N: NotifyPort> {
    shared: Arc<SharedState>,
    port: N,
    rng: MinStd,
    period: Duration,
    threshold: u8,
    cycles: u64,
}

impl<N: NotifyPort> RmsProducer<N> {
    pub fn new(config: &DeviceConfig, shared: Arc<SharedState>, port: N, seed: u32) -> Self {
        Self {
            shared,
            port,
            rng: MinStd::new(seed),
            period: Duration::from_millis(u64::from(config.telemetry_period_ms)),
            threshold: config.notify_threshold,
            cycles: 0,
        }
    }

    /// One production cycle.  Returns the value produced.
    pub fn step(&mut self) -> u8 {
        let value = (self.rng.next_u32() % u32::from(RMS_MAX)) as u8 + 1;
        self.shared.set_telemetry(value);
        self.cycles += 1;
        info!("Telemetry: rms {} (cycle {})", value, self.cycles);

        if value > self.threshold {
            self.shared.notify(&mut self.port, value);
        }
        value
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn port(&self) -> &N {
        &self.port
    }

    /// Produce forever at the configured period.
    pub fn run(mut self) {
        loop {
            let started = Instant::now();
            self.step();
            std::thread::sleep(pace(started.elapsed(), self.period));
        }
    }
}

impl<N: NotifyPort + Send + 'static> RmsProducer<N> {
    /// Start the producer on its own task.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name(TASK_NAME.into())
            .stack_size(TASK_STACK_SIZE)
            .spawn(move || self.run())
    }
}
