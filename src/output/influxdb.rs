//! InfluxDB line protocol output formatter.

use crate::fields::{FieldSelection, FieldValue};
use crate::measurement::Measurement;
use crate::output::OutputFormatter;
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

/// Escape commas, equals signs and spaces in tag keys and values.
fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Float(num) => write!(f, "{num}"),
            FieldValue::Integer(num) => write!(f, "{num}i"),
            FieldValue::String(s) => {
                write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
            }
        }
    }
}

/// Data point in InfluxDB line protocol
#[derive(Debug)]
pub struct DataPoint {
    pub measurement: String,
    pub tag_set: BTreeMap<String, String>,
    pub field_set: Vec<(&'static str, FieldValue)>,
    pub timestamp: Option<SystemTime>,
}

fn fmt_tags(data_point: &DataPoint, fmt: &mut fmt::Formatter) -> fmt::Result {
    for (key, value) in data_point.tag_set.iter() {
        write!(fmt, ",{}={}", escape_tag(key), escape_tag(value))?;
    }
    Ok(())
}

fn fmt_fields(data_point: &DataPoint, fmt: &mut fmt::Formatter) -> fmt::Result {
    for (i, (key, value)) in data_point.field_set.iter().enumerate() {
        if i > 0 {
            write!(fmt, ",")?;
        }
        write!(fmt, "{}={}", key, value)?;
    }
    Ok(())
}

fn fmt_timestamp(data_point: &DataPoint, fmt: &mut fmt::Formatter) -> fmt::Result {
    // Clocks before the epoch have no line protocol timestamp; let the server assign one.
    if let Some(nanos) = data_point
        .timestamp
        .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
    {
        write!(fmt, " {}", nanos.as_nanos())?;
    }
    Ok(())
}

impl fmt::Display for DataPoint {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", escape_tag(&self.measurement))?;
        fmt_tags(self, fmt)?;
        write!(fmt, " ")?;
        fmt_fields(self, fmt)?;
        fmt_timestamp(self, fmt)
    }
}

/// InfluxDB line protocol formatter.
///
/// Tags are `mac`, `name` (alias, falling back to the MAC) and `receiver`
/// when configured. Fields come from the field table. Line protocol needs at
/// least one field, so a measurement without any selected field is not
/// formatted.
pub struct InfluxDbFormatter {
    measurement_name: String,
    fields: FieldSelection,
}

impl InfluxDbFormatter {
    pub fn new(measurement_name: String, fields: FieldSelection) -> Self {
        Self {
            measurement_name,
            fields,
        }
    }

    fn tag_set(&self, measurement: &Measurement) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        let mac = measurement.mac.to_string();
        let name = measurement.name.clone().unwrap_or_else(|| mac.clone());
        tags.insert("mac".to_string(), mac);
        tags.insert("name".to_string(), name);
        if let Some(receiver) = &measurement.receiver {
            tags.insert("receiver".to_string(), receiver.clone());
        }
        tags
    }

    fn to_data_point(&self, measurement: &Measurement) -> DataPoint {
        DataPoint {
            measurement: self.measurement_name.clone(),
            tag_set: self.tag_set(measurement),
            field_set: self.fields.values(measurement).collect(),
            timestamp: Some(measurement.timestamp),
        }
    }
}

impl OutputFormatter for InfluxDbFormatter {
    fn format(&self, measurement: &Measurement) -> Option<String> {
        let data_point = self.to_data_point(measurement);
        if data_point.field_set.is_empty() {
            return None;
        }
        Some(data_point.to_string())
    }
}
