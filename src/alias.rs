//! MAC address aliasing for RuuviTag devices.
//!
//! This module maps MAC addresses to human-readable names, making it easier to
//! identify individual RuuviTag sensors in stored readings.

use crate::mac_address::MacAddress;
use std::collections::HashMap;

/// A type alias for MAC-to-name mappings.
pub type AliasMap = HashMap<MacAddress, String>;

/// Resolves the friendly name configured for a device.
pub trait NameLookup: Send + Sync {
    fn name_for(&self, mac: &MacAddress) -> Option<String>;
}

impl NameLookup for AliasMap {
    fn name_for(&self, mac: &MacAddress) -> Option<String> {
        self.get(mac).cloned()
    }
}

/// A parsed alias mapping a MAC address to a human-readable name.
#[derive(Debug, Clone)]
pub struct Alias {
    pub address: MacAddress,
    pub name: String,
}

/// Parse an alias from a string in the format "MAC=NAME".
///
/// The MAC may be written with or without colons. Blank names are rejected.
///
/// # Example
/// ```
/// use ruuvitag_collector::alias::parse_alias;
///
/// let alias = parse_alias("AA:BB:CC:DD:EE:FF=Kitchen").unwrap();
/// assert_eq!(alias.address.to_string(), "AABBCCDDEEFF");
/// assert_eq!(alias.name, "Kitchen");
/// ```
pub fn parse_alias(src: &str) -> Result<Alias, String> {
    let (address, name) = src
        .split_once('=')
        .ok_or_else(|| "invalid alias: expected format MAC=NAME".to_string())?;
    let name = name.trim();
    if name.is_empty() {
        return Err("invalid alias: name is empty".into());
    }
    let address = address
        .parse::<MacAddress>()
        .map_err(|e| format!("invalid alias: {e}"))?;
    Ok(Alias {
        address,
        name: name.to_string(),
    })
}

/// Convert a slice of Alias values into an AliasMap. Later entries win.
pub fn to_map(aliases: &[Alias]) -> AliasMap {
    aliases
        .iter()
        .map(|a| (a.address, a.name.clone()))
        .collect()
}
