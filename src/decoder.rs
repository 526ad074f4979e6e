//! Decoding of Ruuvi manufacturer payloads into sensor values.
//!
//! The selector hands over the manufacturer identifier and the bytes that
//! follow it; anything below that (bit layouts of the individual data formats)
//! is left to the `ruuvi-decoders` crate.

use crate::measurement::SensorValues;
use ruuvi_decoders::{v5, v6};
use thiserror::Error;

/// Ruuvi Innovations manufacturer ID.
pub const RUUVI_MANUFACTURER_ID: u16 = 0x0499;

/// Error types for decoding RuuviTag data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Unsupported RuuviTag data format (e.g., V2, V3, V4 when only V5 and V6 are supported)
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    /// Invalid or corrupted data that cannot be decoded
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// Decoder library returned an error
    #[error("Decoder error: {0}")]
    DecoderError(String),
}

/// Turns a manufacturer payload into sensor values.
pub trait PayloadDecoder: Send + Sync {
    /// # Arguments
    /// * `manufacturer_id` - Company identifier read from the advertisement
    /// * `payload` - The manufacturer-specific bytes following the identifier
    fn decode(&self, manufacturer_id: u16, payload: &[u8]) -> Result<SensorValues, DecodeError>;
}

/// Decoder for RuuviTag data formats 5 and 6.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuuviDecoder;

impl PayloadDecoder for RuuviDecoder {
    fn decode(&self, manufacturer_id: u16, payload: &[u8]) -> Result<SensorValues, DecodeError> {
        if manufacturer_id != RUUVI_MANUFACTURER_ID {
            return Err(DecodeError::UnsupportedFormat(format!(
                "manufacturer {manufacturer_id:#06x}"
            )));
        }
        decode_ruuvi_data(payload)
    }
}

/// Decode Ruuvi manufacturer data (without the company ID prefix).
///
/// # Unit Conversions
/// - Battery voltage: millivolts → Volts (divide by 1000)
/// - Acceleration: milli-g → g (divide by 1000)
/// - Pressure (V6): hPa → Pa
pub fn decode_ruuvi_data(data: &[u8]) -> Result<SensorValues, DecodeError> {
    if data.is_empty() {
        return Err(DecodeError::InvalidData("Empty data".into()));
    }

    match data[0] {
        5 => decode_v5(data),
        6 => decode_v6(data),
        _ => Err(DecodeError::UnsupportedFormat(format!(
            "RuuviTag data format {} (only V5 and V6 supported)",
            data[0]
        ))),
    }
}

fn decode_v5(data: &[u8]) -> Result<SensorValues, DecodeError> {
    let tag = v5::decode(data).map_err(|e| {
        DecodeError::DecoderError(format!("Failed to decode RuuviTag data: {e:?}"))
    })?;

    let g = |milli_g: Option<i16>| milli_g.map(|v| f64::from(v) / 1000.0);

    Ok(SensorValues {
        data_format: 5,
        temperature: tag.temperature,
        humidity: tag.humidity,
        pressure: tag.pressure,
        battery: tag.battery_voltage.map(|v| f64::from(v) / 1000.0),
        tx_power: tag.tx_power,
        movement_counter: tag.movement_counter.map(u32::from),
        measurement_sequence: tag.measurement_sequence.map(u32::from),
        acceleration_x: g(tag.acceleration_x),
        acceleration_y: g(tag.acceleration_y),
        acceleration_z: g(tag.acceleration_z),
        ..SensorValues::default()
    })
}

fn decode_v6(data: &[u8]) -> Result<SensorValues, DecodeError> {
    let tag = v6::decode(data).map_err(|e| {
        DecodeError::DecoderError(format!("Failed to decode RuuviTag data: {e:?}"))
    })?;

    Ok(SensorValues {
        data_format: 6,
        temperature: tag.temperature,
        humidity: tag.humidity,
        pressure: tag.pressure.map(|hpa| hpa * 100.0),
        measurement_sequence: tag.measurement_sequence.map(u32::from),
        pm2_5: tag.pm2_5,
        co2: tag.co2.map(f64::from),
        voc_index: tag.voc_index.map(f64::from),
        nox_index: tag.nox_index.map(f64::from),
        luminosity: tag.luminosity,
        ..SensorValues::default()
    })
}
