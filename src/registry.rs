//! One filtering strategy per device, created on first sighting.

use crate::mac_address::MacAddress;
use crate::measurement::Measurement;
use crate::strategy::{Strategy, StrategyConfig};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Shared handle to a single device's strategy.
pub type StrategyHandle = Arc<Mutex<Strategy>>;

/// Maps device addresses to their strategies.
///
/// Entries are never removed. Lookups take the map lock only long enough to
/// find or insert the entry; applying a strategy locks just that device, so
/// different devices never contend.
#[derive(Debug)]
pub struct StrategyRegistry {
    config: StrategyConfig,
    strategies: Mutex<HashMap<MacAddress, StrategyHandle>>,
}

impl StrategyRegistry {
    pub fn new(config: StrategyConfig) -> Self {
        Self {
            config,
            strategies: Mutex::new(HashMap::new()),
        }
    }

    /// The strategy for `mac`, created from the registry's configuration if
    /// this is the first time the device is seen.
    pub fn get(&self, mac: MacAddress) -> StrategyHandle {
        let mut strategies = self
            .strategies
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match strategies.entry(mac) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                log::debug!("New device {mac}, using {:?} strategy", self.config.kind);
                let strategy = Arc::new(Mutex::new(Strategy::from_config(&self.config)));
                Arc::clone(entry.insert(strategy))
            }
        }
    }

    /// Run the measurement through its device's strategy.
    pub fn apply(&self, measurement: Measurement, now: Instant) -> Option<Measurement> {
        let handle = self.get(measurement.mac);
        let mut strategy = handle.lock().unwrap_or_else(PoisonError::into_inner);
        strategy.apply(measurement, now)
    }

    /// Number of devices seen so far.
    pub fn len(&self) -> usize {
        self.strategies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
