//! RMS service attribute table.
//!
//! | Index              | Attribute                     | UUID     | Perms      |
//! |--------------------|-------------------------------|----------|------------|
//! | `IDX_SERVICE`      | Primary service declaration   | `0x2800` | Read       |
//! | `IDX_CHAR_RMS`     | Characteristic declaration    | `0x2803` | Read       |
//! | `IDX_CHAR_VAL_RMS` | RMS value (`0xFF01`)          | `0xFF01` | Read       |
//! | `IDX_CHAR_CFG_RMS` | Client characteristic config  | `0x2902` | Read+Write |
//!
//! The descriptors are submitted to the stack as one unit; the stack answers
//! with one handle per descriptor, in the same order.

use crate::error::Error;

// ───────────────────────────────────────────────────────────────
// Layout
// ───────────────────────────────────────────────────────────────

pub const IDX_SERVICE: usize = 0;
pub const IDX_CHAR_RMS: usize = 1;
pub const IDX_CHAR_VAL_RMS: usize = 2;
pub const IDX_CHAR_CFG_RMS: usize = 3;

/// Number of descriptors in the table.
pub const ATTR_COUNT: usize = 4;

/// Service instance id passed at table creation.
pub const SERVICE_INST_ID: u8 = 0;

pub const SERVICE_UUID: u16 = 0x00FF;
pub const CHAR_RMS_UUID: u16 = 0xFF01;

pub const PRIMARY_SERVICE_UUID: u16 = 0x2800;
pub const CHAR_DECLARATION_UUID: u16 = 0x2803;
pub const CHAR_CLIENT_CONFIG_UUID: u16 = 0x2902;

// `esp_gatt_perm_t` / `esp_gatt_char_prop_t` bit values.
pub const PERM_READ: u16 = 1 << 0;
pub const PERM_WRITE: u16 = 1 << 4;
pub const PROP_READ: u8 = 1 << 1;
pub const PROP_NOTIFY: u8 = 1 << 4;

static SERVICE_VALUE: [u8; 2] = SERVICE_UUID.to_le_bytes();
static RMS_PROPERTIES: [u8; 1] = [PROP_READ | PROP_NOTIFY];
static RMS_INITIAL: [u8; 1] = [0];
static NOTIFICATIONS_DISABLED: [u8; 2] = [0, 0];

/// One attribute record, as handed to the attribute database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrDescriptor {
    /// 16-bit attribute type.
    pub uuid: u16,
    pub perm: u16,
    pub max_len: u16,
    /// Initial value; the stack copies it.
    pub value: &'static [u8],
}

/// The RMS service, in handle order.  All attributes use stack auto-response.
pub static RMS_SERVICE: [AttrDescriptor; ATTR_COUNT] = [
    AttrDescriptor {
        uuid: PRIMARY_SERVICE_UUID,
        perm: PERM_READ,
        max_len: 2,
        value: &SERVICE_VALUE,
    },
    AttrDescriptor {
        uuid: CHAR_DECLARATION_UUID,
        perm: PERM_READ,
        max_len: 1,
        value: &RMS_PROPERTIES,
    },
    AttrDescriptor {
        uuid: CHAR_RMS_UUID,
        perm: PERM_READ,
        max_len: 1,
        value: &RMS_INITIAL,
    },
    AttrDescriptor {
        uuid: CHAR_CLIENT_CONFIG_UUID,
        perm: PERM_READ | PERM_WRITE,
        max_len: 2,
        value: &NOTIFICATIONS_DISABLED,
    },
];

// ───────────────────────────────────────────────────────────────
// Handles
// ───────────────────────────────────────────────────────────────

/// Stack-assigned handles, indexed like [`RMS_SERVICE`].  Opaque apart from
/// their position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrHandles([u16; ATTR_COUNT]);

impl AttrHandles {
    /// Accept the handles from a table-created event.
    ///
    /// Anything other than exactly one handle per descriptor means the stack
    /// and the table disagree; that is a configuration error, never retried.
    pub fn from_created(handles: &[u16]) -> Result<Self, Error> {
        let table: [u16; ATTR_COUNT] = handles
            .try_into()
            .map_err(|_| Error::Fatal("attribute table handle count mismatch"))?;
        Ok(Self(table))
    }

    /// Handle of the service declaration, used to start the service.
    pub fn service(&self) -> u16 {
        self.0[IDX_SERVICE]
    }

    /// Handle notifications are sent on.
    pub fn value(&self) -> u16 {
        self.0[IDX_CHAR_VAL_RMS]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_in_index_order() {
        assert_eq!(RMS_SERVICE[IDX_SERVICE].uuid, PRIMARY_SERVICE_UUID);
        assert_eq!(RMS_SERVICE[IDX_CHAR_RMS].uuid, CHAR_DECLARATION_UUID);
        assert_eq!(RMS_SERVICE[IDX_CHAR_VAL_RMS].uuid, CHAR_RMS_UUID);
        assert_eq!(RMS_SERVICE[IDX_CHAR_CFG_RMS].uuid, CHAR_CLIENT_CONFIG_UUID);
        assert_eq!(RMS_SERVICE[IDX_SERVICE].value, &[0xFF, 0x00]);
    }

    #[test]
    fn handles_resolve_by_position() {
        let h = AttrHandles::from_created(&[40, 41, 42, 43]).unwrap();
        assert_eq!(h.service(), 40);
        assert_eq!(h.value(), 42);
    }

    #[test]
    fn short_handle_list_is_fatal() {
        assert_eq!(
            AttrHandles::from_created(&[40, 41, 42]),
            Err(Error::Fatal("attribute table handle count mismatch"))
        );
        assert!(AttrHandles::from_created(&[1, 2, 3, 4, 5]).is_err());
    }
}
