//! NVS (Non-Volatile Storage) bring-up.
//!
//! The Bluetooth controller keeps its calibration and bonding area in NVS,
//! so the partition has to be usable before the controller is initialised.
//! Nothing else in the firmware persists state.

use log::info;

use crate::error::Error;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::warn;

/// How the partition came up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageInit {
    /// Initialised as found.
    Ready,
    /// Erased first (no free pages or a newer layout version).
    Erased,
    /// Host build, nothing to initialise.
    Simulated,
}

/// Initialise the default NVS partition, erasing it once if it is full or
/// was written by a newer IDF.
#[cfg(target_os = "espidf")]
pub fn init_storage() -> Result<StorageInit, Error> {
    // SAFETY: called once from the main task before the controller starts,
    // so there is no concurrent NVS access.
    let ret = unsafe { nvs_flash_init() };
    if ret == ESP_OK {
        info!("NVS: partition ready");
        return Ok(StorageInit::Ready);
    }
    if ret != ESP_ERR_NVS_NO_FREE_PAGES && ret != ESP_ERR_NVS_NEW_VERSION_FOUND {
        log::error!("NVS: nvs_flash_init failed (rc={})", ret);
        return Err(Error::Init("nvs flash init"));
    }

    warn!("NVS: erasing and re-initialising flash partition (rc={})", ret);
    // SAFETY: same single-task context as above.
    if unsafe { nvs_flash_erase() } != ESP_OK {
        return Err(Error::Init("nvs flash erase"));
    }
    // SAFETY: same single-task context as above.
    if unsafe { nvs_flash_init() } != ESP_OK {
        return Err(Error::Init("nvs flash re-init"));
    }
    info!("NVS: partition erased and ready");
    Ok(StorageInit::Erased)
}

#[cfg(not(target_os = "espidf"))]
pub fn init_storage() -> Result<StorageInit, Error> {
    info!("NVS: simulation backend");
    Ok(StorageInit::Simulated)
}
