//! `ruuvitag-collector` library.
//!
//! The binary (`src/main.rs`) is responsible for CLI parsing, logger setup and
//! process exit codes. The core logic lives in [`crate::app`] and
//! [`crate::pipeline`] where it can be tested deterministically with an
//! injected dump stream and sink.

pub mod alias;
pub mod app;
pub mod beacon;
pub mod decoder;
pub mod derived;
pub mod fields;
pub mod filter;
pub mod hci;
pub mod mac_address;
pub mod measurement;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod strategy;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types at the crate root
pub use alias::{Alias, AliasMap, NameLookup, parse_alias, to_map};
pub use beacon::{BeaconSelector, SelectError};
pub use decoder::{DecodeError, PayloadDecoder, RuuviDecoder, decode_ruuvi_data};
pub use fields::{FieldSelection, FieldValue};
pub use filter::{FilterMode, MacFilter};
pub use hci::{Frame, FrameAssembler, FrameError, parse_line};
pub use mac_address::MacAddress;
pub use measurement::{Measurement, SensorValues};
pub use output::influxdb::InfluxDbFormatter;
pub use output::{LineSink, OutputFormatter, Sink};
pub use pipeline::Pipeline;
pub use registry::StrategyRegistry;
pub use strategy::{Strategy, StrategyConfig, StrategyKind, parse_duration};
