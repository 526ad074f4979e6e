use crate::mac_address::MacAddress;
use crate::measurement::Measurement;
use std::time::SystemTime;

/// A stable MAC address for unit tests.
pub const TEST_MAC: MacAddress = MacAddress([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

/// A data format 5 advertisement from `FE1E8AADD7BF`, RSSI -79.
pub const DF5_LINE: &str = "> 04 3E 2B 02 01 00 01 BF D7 AD 8A 1E FE 1F 02 01 06 1B FF 99 04 05 11 17 34 AF CE E2 03 F8 FF E8 FF D8 B0 B6 4D 61 31 FE 1E 8A AD D7 BF B1";

/// Build a data format 5 dump line for `mac` (canonical order, bytes separated
/// by spaces) carrying the given temperature.
pub fn df5_line(mac: &str, temperature: f64) -> String {
    let raw = (temperature / 0.005).round() as i16;
    let [hi, lo] = raw.to_be_bytes();
    let mut wire: Vec<&str> = mac.split(' ').collect();
    wire.reverse();
    format!(
        "> 04 3E 2B 02 01 00 01 {} 1F 02 01 06 1B FF 99 04 05 {hi:02X} {lo:02X} 34 AF CE E2 03 F8 FF E8 FF D8 B0 B6 4D 61 31 {mac} B1",
        wire.join(" ")
    )
}

/// Build a `Measurement` with all optional fields set to `None`.
///
/// Tests can override just the fields they care about.
pub fn base_measurement(mac: MacAddress, timestamp: SystemTime) -> Measurement {
    Measurement {
        mac,
        timestamp,
        rssi: -70,
        name: None,
        receiver: None,
        data_format: 5,
        temperature: None,
        humidity: None,
        pressure: None,
        battery: None,
        tx_power: None,
        movement_counter: None,
        measurement_sequence: None,
        acceleration_x: None,
        acceleration_y: None,
        acceleration_z: None,
        pm2_5: None,
        co2: None,
        voc_index: None,
        nox_index: None,
        luminosity: None,
        derived: Default::default(),
    }
}

/// A measurement carrying only acceleration, `(x, 0, 1)`.
pub fn accelerated(mac: MacAddress, x: f64) -> Measurement {
    Measurement {
        acceleration_x: Some(x),
        acceleration_y: Some(0.0),
        acceleration_z: Some(1.0),
        ..base_measurement(mac, SystemTime::UNIX_EPOCH)
    }
}
