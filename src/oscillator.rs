//! Lookup-table sine oscillator and the audio sample source.
//!
//! [`Oscillator`] produces interleaved 16-bit little-endian stereo PCM from
//! a 256-entry sine table with a 16.16 fixed-point phase accumulator.  The
//! phase advances once per frame and both channels carry the same sample.
//! Output depends only on the phase, so splitting a request on frame
//! boundaries never changes the bytes.
//!
//! [`SampleSource`] is what the transport's data callback talks to.  It must
//! never block the stack, so contention on the oscillator yields silence.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use log::info;

pub const TABLE_LEN: usize = 256;
/// Interleaved channels per frame (the A2DP source takes stereo).
pub const CHANNELS: usize = 2;
/// Bytes per stereo frame of 16-bit samples.
pub const FRAME_BYTES: usize = CHANNELS * 2;
const FRAC_BITS: u32 = 16;
/// Phase wraps at `TABLE_LEN` whole steps.
const PHASE_MASK: u32 = ((TABLE_LEN as u32) << FRAC_BITS) - 1;
/// Log cadence of the data callback, in packets.
pub const PACKET_LOG_INTERVAL: u32 = 256;

// ───────────────────────────────────────────────────────────────
// Oscillator
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Oscillator {
    table: [i16; TABLE_LEN],
    phase: u32,
    step: u32,
}

impl Oscillator {
    /// A tone of `tone_hz` at `sample_rate_hz`, peaking at `amplitude`.
    pub fn new(tone_hz: u32, sample_rate_hz: u32, amplitude: i16) -> Self {
        let mut table = [0i16; TABLE_LEN];
        for (i, slot) in table.iter_mut().enumerate() {
            let angle = 2.0 * core::f32::consts::PI * i as f32 / TABLE_LEN as f32;
            *slot = (angle.sin() * f32::from(amplitude)) as i16;
        }
        Self {
            table,
            phase: 0,
            step: step_for(tone_hz, sample_rate_hz),
        }
    }

    pub fn phase(&self) -> u32 {
        self.phase
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn next_sample(&mut self) -> i16 {
        let sample = self.table[(self.phase >> FRAC_BITS) as usize];
        self.phase = self.phase.wrapping_add(self.step) & PHASE_MASK;
        sample
    }

    /// Fill `buf` with the next `buf.len() / FRAME_BYTES` frames.  Bytes of
    /// a trailing partial frame are zeroed.
    pub fn fill(&mut self, buf: &mut [u8]) {
        let mut frames = buf.chunks_exact_mut(FRAME_BYTES);
        for frame in &mut frames {
            let sample = self.next_sample().to_le_bytes();
            for channel in frame.chunks_exact_mut(2) {
                channel.copy_from_slice(&sample);
            }
        }
        frames.into_remainder().fill(0);
    }
}

/// 16.16 phase increment per frame for `tone_hz` at `sample_rate_hz`.
pub fn step_for(tone_hz: u32, sample_rate_hz: u32) -> u32 {
    if sample_rate_hz == 0 {
        return 0;
    }
    let step = (u64::from(tone_hz) * TABLE_LEN as u64) << FRAC_BITS;
    ((step / u64::from(sample_rate_hz)) as u32) & PHASE_MASK
}

// ───────────────────────────────────────────────────────────────
// SampleSource
// ───────────────────────────────────────────────────────────────

/// Supplies outgoing audio on the transport's data context.
pub struct SampleSource {
    osc: Mutex<Oscillator>,
    packets: AtomicU32,
    bytes: AtomicU32,
}

impl SampleSource {
    pub fn new(osc: Oscillator) -> Self {
        Self {
            osc: Mutex::new(osc),
            packets: AtomicU32::new(0),
            bytes: AtomicU32::new(0),
        }
    }

    /// Fill all of `buf` and return the number of bytes written.
    ///
    /// Works whether or not streaming has started.  Never blocks: if the
    /// oscillator is busy the packet is silence.
    pub fn on_data_request(&self, buf: &mut [u8]) -> usize {
        match self.osc.try_lock() {
            Ok(mut osc) => osc.fill(buf),
            Err(_) => buf.fill(0),
        }

        let packets = self.packets.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let bytes = self
            .bytes
            .fetch_add(buf.len() as u32, Ordering::Relaxed)
            .wrapping_add(buf.len() as u32);
        if packets % PACKET_LOG_INTERVAL == 0 {
            info!("Audio: {} packets, {} bytes sent", packets, bytes);
        }
        buf.len()
    }

    pub fn reset_counters(&self) {
        self.packets.store(0, Ordering::Relaxed);
        self.bytes.store(0, Ordering::Relaxed);
    }

    pub fn packets(&self) -> u32 {
        self.packets.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u32 {
        self.bytes.load(Ordering::Relaxed)
    }
}
