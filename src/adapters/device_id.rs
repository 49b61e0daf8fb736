//! Hardware device identity derived from the factory MAC address.
//!
//! The DPS registration ID is `telemon-xxyyzz` (last 3 bytes of the MAC,
//! lowercase hex).  It is deterministic across reboots and satisfies the
//! provisioning service's registration-ID alphabet (lowercase
//! alphanumerics and `-`).

use core::fmt::Write;

/// Registration ID string: "telemon-xxyyzz" (14 chars).
pub type RegistrationId = heapless::String<24>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: the buffer is exactly the 6 bytes the call writes.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

pub fn registration_id(mac: &MacAddress) -> RegistrationId {
    let mut id = RegistrationId::new();
    let _ = write!(id, "telemon-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    id
}
