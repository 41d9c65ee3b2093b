//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements                  | Connects to             |
//! |-------------|-----------------------------|-------------------------|
//! | `bluedroid` | TransportPort, GapPort,     | ESP-IDF Bluedroid host  |
//! |             | GattsPort, NotifyPort       | (A2DP source, BLE GATT) |
//! | `nvs`       | (storage init only)         | NVS flash partition     |

pub mod bluedroid;
pub mod nvs;
