//! Picks the Ruuvi payload out of a decoded frame and turns it into a
//! [`Measurement`].

use crate::alias::NameLookup;
use crate::decoder::{DecodeError, PayloadDecoder};
use crate::hci::{AdvertisementData, Frame};
use crate::measurement::Measurement;
use std::time::SystemTime;
use thiserror::Error;

/// Manufacturer-specific data, carries the raw data formats.
pub const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;
/// Service data, used by Eddystone URL frames.
pub const AD_TYPE_SERVICE_DATA: u8 = 0x16;
/// Eddystone TLM.
pub const AD_TYPE_EDDYSTONE_TLM: u8 = 0x17;

/// AD types searched for a payload, most preferred first.
const BEACON_AD_TYPES: [u8; 3] = [
    AD_TYPE_MANUFACTURER_DATA,
    AD_TYPE_SERVICE_DATA,
    AD_TYPE_EDDYSTONE_TLM,
];

/// Ruuvi Innovations manufacturer ID as it appears in advertisements
/// (little-endian 0x0499).
pub const RUUVI_MANUFACTURER_ID_BYTES: [u8; 2] = [0x99, 0x04];

/// Why a frame produced no measurement.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectError {
    #[error("no manufacturer or service data in frame")]
    NoBeaconData,
    #[error("payload of AD type {ad_type:#04x} is not from Ruuvi")]
    ForeignManufacturer { ad_type: u8 },
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Locates Ruuvi payloads in frames and enriches the decoded values with the
/// frame's address, signal strength, configured name and receiver tag.
pub struct BeaconSelector {
    decoder: Box<dyn PayloadDecoder>,
    names: Box<dyn NameLookup>,
    receiver: Option<String>,
}

impl BeaconSelector {
    pub fn new(
        decoder: Box<dyn PayloadDecoder>,
        names: Box<dyn NameLookup>,
        receiver: Option<String>,
    ) -> Self {
        Self {
            decoder,
            names,
            receiver,
        }
    }

    /// Build a measurement from the frame, stamped with `timestamp`.
    pub fn select(&self, frame: &Frame, timestamp: SystemTime) -> Result<Measurement, SelectError> {
        let ad = beacon_data(frame).ok_or(SelectError::NoBeaconData)?;

        let payload = match ad.data.as_slice() {
            [a, b, payload @ ..] if [*a, *b] == RUUVI_MANUFACTURER_ID_BYTES => payload,
            _ => {
                return Err(SelectError::ForeignManufacturer { ad_type: ad.ad_type });
            }
        };

        let manufacturer_id = u16::from_le_bytes(RUUVI_MANUFACTURER_ID_BYTES);
        let values = self.decoder.decode(manufacturer_id, payload)?;

        Ok(Measurement::new(
            values,
            frame.mac,
            frame.rssi,
            self.names.name_for(&frame.mac),
            self.receiver.clone(),
            timestamp,
        ))
    }
}

fn beacon_data(frame: &Frame) -> Option<&AdvertisementData> {
    BEACON_AD_TYPES
        .iter()
        .find_map(|&ad_type| frame.find_advertisement(ad_type))
}
