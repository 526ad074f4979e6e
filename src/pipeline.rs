//! Wires the stages together: decode → MAC filter → beacon selector →
//! per-device strategy.

use crate::beacon::BeaconSelector;
use crate::filter::MacFilter;
use crate::hci::{self, Frame};
use crate::measurement::Measurement;
use crate::registry::StrategyRegistry;
use std::time::{Instant, SystemTime};

pub struct Pipeline {
    filter: MacFilter,
    selector: BeaconSelector,
    registry: StrategyRegistry,
}

impl Pipeline {
    pub fn new(filter: MacFilter, selector: BeaconSelector, registry: StrategyRegistry) -> Self {
        Self {
            filter,
            selector,
            registry,
        }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Decode one complete dump line and run it through the remaining stages.
    pub fn process_line(
        &self,
        line: &str,
        now: Instant,
        timestamp: SystemTime,
    ) -> Option<Measurement> {
        match hci::parse_line(line) {
            Ok(frame) => self.process_frame(&frame, now, timestamp),
            Err(e) => {
                log::trace!("Skipping line: {e}");
                None
            }
        }
    }

    /// Returns the measurement to store, if any. Rejections are logged at
    /// trace level.
    pub fn process_frame(
        &self,
        frame: &Frame,
        now: Instant,
        timestamp: SystemTime,
    ) -> Option<Measurement> {
        if !self.filter.allows(&frame.mac) {
            log::trace!("{}: filtered out", frame.mac);
            return None;
        }

        let measurement = match self.selector.select(frame, timestamp) {
            Ok(measurement) => measurement,
            Err(e) => {
                log::trace!("{}: {e}", frame.mac);
                return None;
            }
        };

        let accepted = self.registry.apply(measurement, now);
        if accepted.is_none() {
            log::trace!("{}: discarded by strategy", frame.mac);
        }
        accepted
    }
}
