//! Device allow/deny filtering by MAC address.

use crate::alias::AliasMap;
use crate::mac_address::MacAddress;
use std::collections::HashSet;
use thiserror::Error;

/// Which devices are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FilterMode {
    /// Process every device
    #[default]
    None,
    /// Skip the listed devices
    Blacklist,
    /// Process only the listed devices
    Whitelist,
    /// Process only devices that have an alias
    Named,
}

#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
    #[error("filter mode 'named' requires at least one --alias")]
    NoNamedDevices,
}

#[derive(Debug, Clone)]
pub struct MacFilter {
    mode: FilterMode,
    macs: HashSet<MacAddress>,
}

impl MacFilter {
    /// Build a filter. In `Named` mode the aliased devices form the list and
    /// `macs` is ignored.
    pub fn new(
        mode: FilterMode,
        macs: impl IntoIterator<Item = MacAddress>,
        aliases: &AliasMap,
    ) -> Result<Self, FilterError> {
        let macs = match mode {
            FilterMode::Named if aliases.is_empty() => return Err(FilterError::NoNamedDevices),
            FilterMode::Named => aliases.keys().copied().collect(),
            _ => macs.into_iter().collect(),
        };
        Ok(Self { mode, macs })
    }

    pub fn allows(&self, mac: &MacAddress) -> bool {
        match self.mode {
            FilterMode::None => true,
            FilterMode::Blacklist => !self.macs.contains(mac),
            FilterMode::Whitelist | FilterMode::Named => self.macs.contains(mac),
        }
    }
}

impl Default for MacFilter {
    fn default() -> Self {
        Self {
            mode: FilterMode::None,
            macs: HashSet::new(),
        }
    }
}
