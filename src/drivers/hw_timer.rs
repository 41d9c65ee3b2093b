//! Heartbeat timer.
//!
//! A periodic timer that dispatches [`Event::Heartbeat`] to the worker.
//! The transport machine uses it to poll the source, retry outbound
//! connections and time out stalled ones.
//!
//! On ESP-IDF this is an `esp_timer` dispatched from the timer task (not an
//! ISR), so the callback may block for the dispatcher's bounded send wait.
//! On simulation targets a plain thread sleeps between beats.

use core::time::Duration;

use log::{info, warn};

use crate::dispatcher::DispatchHandle;
use crate::error::Error;
use crate::events::Event;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Dispatch one heartbeat; a full queue only costs this beat.
fn beat(handle: &DispatchHandle) {
    if let Err(e) = handle.dispatch(Event::Heartbeat) {
        warn!("hw_timer: heartbeat dropped ({})", e);
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct HeartbeatTimer {
    timer: esp_timer_handle_t,
    /// Boxed so the callback argument has a stable address.
    handle: *mut DispatchHandle,
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn heartbeat_cb(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the boxed handle owned by the HeartbeatTimer, which
    // stops and deletes the timer before freeing it.
    let handle = unsafe { &*(arg as *const DispatchHandle) };
    beat(handle);
}

#[cfg(target_os = "espidf")]
impl HeartbeatTimer {
    /// Create and start the periodic heartbeat.
    pub fn start(period: Duration, handle: DispatchHandle) -> Result<Self, Error> {
        let handle = Box::into_raw(Box::new(handle));
        let args = esp_timer_create_args_t {
            callback: Some(heartbeat_cb),
            arg: handle.cast(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c"heartbeat".as_ptr(),
            skip_unhandled_events: true,
        };

        let mut timer: esp_timer_handle_t = core::ptr::null_mut();
        // SAFETY: `args` outlives the call; `timer` receives the new handle.
        let ret = unsafe { esp_timer_create(&args, &mut timer) };
        if ret != ESP_OK {
            log::error!("hw_timer: heartbeat create failed (rc={})", ret);
            // SAFETY: the timer was never created, so nothing else holds it.
            drop(unsafe { Box::from_raw(handle) });
            return Err(Error::Init("heartbeat timer create"));
        }

        let period_us = period.as_micros() as u64;
        // SAFETY: `timer` was just created and is not running.
        let ret = unsafe { esp_timer_start_periodic(timer, period_us) };
        if ret != ESP_OK {
            log::error!("hw_timer: heartbeat start failed (rc={})", ret);
            // SAFETY: never started, so no callback can be in flight.
            unsafe {
                esp_timer_delete(timer);
                drop(Box::from_raw(handle));
            }
            return Err(Error::Init("heartbeat timer start"));
        }

        info!("hw_timer: heartbeat every {} ms", period.as_millis());
        Ok(Self { timer, handle })
    }
}

#[cfg(target_os = "espidf")]
impl Drop for HeartbeatTimer {
    fn drop(&mut self) {
        // SAFETY: `timer` and `handle` were created in `start` and are
        // released exactly once, timer first.
        unsafe {
            esp_timer_stop(self.timer);
            esp_timer_delete(self.timer);
            drop(Box::from_raw(self.handle));
        }
        info!("hw_timer: heartbeat stopped");
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub struct HeartbeatTimer {
    stop: std::sync::Arc<std::sync::atomic::AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

#[cfg(not(target_os = "espidf"))]
impl HeartbeatTimer {
    pub fn start(period: Duration, handle: DispatchHandle) -> Result<Self, Error> {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, Ordering};

        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let thread = std::thread::Builder::new()
            .name("heartbeat".into())
            .spawn(move || {
                loop {
                    std::thread::sleep(period);
                    if flag.load(Ordering::Acquire) {
                        break;
                    }
                    beat(&handle);
                }
            })
            .map_err(|_| Error::Init("heartbeat thread spawn"))?;

        info!("hw_timer(sim): heartbeat every {} ms", period.as_millis());
        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }
}

#[cfg(not(target_os = "espidf"))]
impl Drop for HeartbeatTimer {
    fn drop(&mut self) {
        self.stop.store(true, std::sync::atomic::Ordering::Release);
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
        info!("hw_timer(sim): heartbeat stopped");
    }
}
