//! RuuviTag measurement data structures.

use crate::derived::DerivedValues;
use crate::mac_address::MacAddress;
use std::time::SystemTime;

/// Sensor values decoded from a manufacturer payload, before any frame
/// metadata is attached.
///
/// All values are in standard SI units:
/// - Temperature in Celsius
/// - Humidity in percent (0-100)
/// - Pressure in Pascals
/// - Battery voltage in Volts
/// - TX power in dBm
/// - Acceleration in g (standard gravity)
/// - PM2.5 in micrograms per cubic meter (ug/m3)
/// - CO2 in parts per million (ppm)
/// - VOC/NOx indexes are unitless scores
/// - Luminosity in lux
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SensorValues {
    /// Ruuvi data format the payload was encoded with
    pub data_format: u8,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub battery: Option<f64>,
    pub tx_power: Option<i8>,
    pub movement_counter: Option<u32>,
    pub measurement_sequence: Option<u32>,
    /// Acceleration per axis in g; each axis may be invalid on its own
    pub acceleration_x: Option<f64>,
    pub acceleration_y: Option<f64>,
    pub acceleration_z: Option<f64>,
    pub pm2_5: Option<f64>,
    pub co2: Option<f64>,
    pub voc_index: Option<f64>,
    pub nox_index: Option<f64>,
    pub luminosity: Option<f64>,
}

impl SensorValues {
    /// The full acceleration vector, if all three axes are valid.
    pub fn acceleration_vector(&self) -> Option<(f64, f64, f64)> {
        Some((self.acceleration_x?, self.acceleration_y?, self.acceleration_z?))
    }
}

/// A measurement from a RuuviTag, enriched with what the receiver knows about
/// the advertisement that carried it.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// MAC address of the RuuviTag, canonical order
    pub mac: MacAddress,
    /// Timestamp when the advertisement was processed
    pub timestamp: SystemTime,
    /// Received signal strength in dBm
    pub rssi: i8,
    /// Friendly name configured for the tag
    pub name: Option<String>,
    /// Tag identifying the receiver that picked up the advertisement
    pub receiver: Option<String>,
    pub data_format: u8,
    /// Temperature in Celsius
    pub temperature: Option<f64>,
    /// Relative humidity in percent (0-100)
    pub humidity: Option<f64>,
    /// Atmospheric pressure in Pascals
    pub pressure: Option<f64>,
    /// Battery voltage in Volts
    pub battery: Option<f64>,
    /// TX power in dBm
    pub tx_power: Option<i8>,
    /// Movement counter
    pub movement_counter: Option<u32>,
    /// Measurement sequence number
    pub measurement_sequence: Option<u32>,
    /// Acceleration along the X axis in g
    pub acceleration_x: Option<f64>,
    /// Acceleration along the Y axis in g
    pub acceleration_y: Option<f64>,
    /// Acceleration along the Z axis in g
    pub acceleration_z: Option<f64>,
    /// Particulate matter (PM2.5) concentration in ug/m3
    pub pm2_5: Option<f64>,
    /// Carbon dioxide concentration in ppm
    pub co2: Option<f64>,
    /// Volatile organic compound index
    pub voc_index: Option<f64>,
    /// Nitrogen oxides index
    pub nox_index: Option<f64>,
    /// Ambient luminosity in lux
    pub luminosity: Option<f64>,
    /// Quantities calculated from the sensor values
    pub derived: DerivedValues,
}

impl Measurement {
    /// Acceleration as `[x, y, z]`.
    pub fn acceleration(&self) -> [Option<f64>; 3] {
        [self.acceleration_x, self.acceleration_y, self.acceleration_z]
    }

    /// Attach frame metadata to decoded sensor values.
    pub fn new(
        values: SensorValues,
        mac: MacAddress,
        rssi: i8,
        name: Option<String>,
        receiver: Option<String>,
        timestamp: SystemTime,
    ) -> Self {
        let derived = DerivedValues::calculate(&values);
        Measurement {
            mac,
            timestamp,
            rssi,
            name,
            receiver,
            data_format: values.data_format,
            temperature: values.temperature,
            humidity: values.humidity,
            pressure: values.pressure,
            battery: values.battery,
            tx_power: values.tx_power,
            movement_counter: values.movement_counter,
            measurement_sequence: values.measurement_sequence,
            acceleration_x: values.acceleration_x,
            acceleration_y: values.acceleration_y,
            acceleration_z: values.acceleration_z,
            pm2_5: values.pm2_5,
            co2: values.co2,
            voc_index: values.voc_index,
            nox_index: values.nox_index,
            luminosity: values.luminosity,
            derived,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TEST_MAC;

    #[test]
    fn test_new_copies_values_and_metadata() {
        let values = SensorValues {
            data_format: 5,
            temperature: Some(24.3),
            humidity: Some(53.49),
            pressure: Some(100_044.0),
            movement_counter: Some(66),
            acceleration_x: Some(0.004),
            acceleration_y: Some(-0.004),
            acceleration_z: Some(1.036),
            ..SensorValues::default()
        };
        let m = Measurement::new(
            values,
            TEST_MAC,
            -79,
            Some("Sauna".to_string()),
            Some("pi".to_string()),
            SystemTime::UNIX_EPOCH,
        );

        assert_eq!(m.mac, TEST_MAC);
        assert_eq!(m.rssi, -79);
        assert_eq!(m.name.as_deref(), Some("Sauna"));
        assert_eq!(m.receiver.as_deref(), Some("pi"));
        assert_eq!(m.data_format, 5);
        assert_eq!(m.temperature, Some(24.3));
        assert_eq!(m.movement_counter, Some(66));
        assert!(m.derived.acceleration_total.is_some());
        assert!(m.derived.dew_point.is_some());
        assert!(m.derived.air_density.is_some());
    }
}
