//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                   |
//! |----------------|--------------------|-------------------------------|
//! | `hardware`     | SensorPort         | SHT31 + AD7992 over I²C       |
//! |                | DisplayPort        | SH1107 OLED over I²C          |
//! |                | RelayPort          | GPIO relay                    |
//! | `iot_hub`      | Provisioner        | DPS over MQTT/TLS             |
//! |                | HubClient          | IoT hub over MQTT/TLS         |
//! | `time`         | ClockPort          | System clock + UTC offset     |
//! | `wifi`         | ConnectivityPort   | ESP-IDF WiFi STA / Linux sysfs|
//! | `cert_store`   | -                  | X.509 identity (NVS / files)  |
//! | `device_id`    | -                  | Factory MAC                   |

pub mod cert_store;
pub mod device_id;
pub mod hardware;
pub mod iot_hub;
pub mod time;
pub mod wifi;
