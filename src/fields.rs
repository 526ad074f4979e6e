//! The closed set of storable measurement fields.
//!
//! Each field pairs its storage name with a function extracting a typed value
//! from a [`Measurement`]. Output backends iterate this table instead of
//! looking fields up by name at runtime.

use crate::measurement::Measurement;

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    #[allow(dead_code)] // Used in tests
    String(String),
}

/// A named, typed accessor into [`Measurement`].
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub extract: fn(&Measurement) -> Option<FieldValue>,
}

impl Field {
    const fn new(name: &'static str, extract: fn(&Measurement) -> Option<FieldValue>) -> Self {
        Field { name, extract }
    }

    pub fn value(&self, measurement: &Measurement) -> Option<FieldValue> {
        (self.extract)(measurement)
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

fn float(v: Option<f64>) -> Option<FieldValue> {
    v.map(FieldValue::Float)
}

fn integer<T: Into<i64>>(v: Option<T>) -> Option<FieldValue> {
    v.map(|v| FieldValue::Integer(v.into()))
}

/// Every field a measurement can carry, in output order.
pub const FIELDS: &[Field] = &[
    Field::new("temperature", |m| float(m.temperature)),
    Field::new("humidity", |m| float(m.humidity)),
    Field::new("pressure", |m| float(m.pressure)),
    Field::new("battery_potential", |m| float(m.battery)),
    Field::new("tx_power", |m| integer(m.tx_power)),
    Field::new("movement_counter", |m| integer(m.movement_counter)),
    Field::new("measurement_sequence_number", |m| {
        integer(m.measurement_sequence)
    }),
    Field::new("acceleration_x", |m| float(m.acceleration_x)),
    Field::new("acceleration_y", |m| float(m.acceleration_y)),
    Field::new("acceleration_z", |m| float(m.acceleration_z)),
    Field::new("pm2_5", |m| float(m.pm2_5)),
    Field::new("co2", |m| float(m.co2)),
    Field::new("voc_index", |m| float(m.voc_index)),
    Field::new("nox_index", |m| float(m.nox_index)),
    Field::new("luminosity", |m| float(m.luminosity)),
    Field::new("rssi", |m| integer(Some(m.rssi))),
    Field::new("data_format", |m| integer(Some(m.data_format))),
    Field::new("acceleration_total", |m| {
        float(m.derived.acceleration_total)
    }),
    Field::new("acceleration_angle_from_x", |m| {
        float(m.derived.acceleration_angle_from_x)
    }),
    Field::new("acceleration_angle_from_y", |m| {
        float(m.derived.acceleration_angle_from_y)
    }),
    Field::new("acceleration_angle_from_z", |m| {
        float(m.derived.acceleration_angle_from_z)
    }),
    Field::new("absolute_humidity", |m| float(m.derived.absolute_humidity)),
    Field::new("dew_point", |m| float(m.derived.dew_point)),
    Field::new("equilibrium_vapor_pressure", |m| {
        float(m.derived.equilibrium_vapor_pressure)
    }),
    Field::new("air_density", |m| float(m.derived.air_density)),
];

/// Look a field up by its storage name.
pub fn field(name: &str) -> Option<&'static Field> {
    FIELDS.iter().find(|f| f.name == name)
}

/// Parse one field name (for use as a clap value parser).
pub fn parse_field(src: &str) -> Result<&'static Field, String> {
    let name = src.trim();
    field(name).ok_or_else(|| format!("unknown field '{name}'"))
}

/// The fields to emit: a configured subset, or everything when empty.
#[derive(Debug, Clone, Default)]
pub struct FieldSelection {
    selected: Vec<&'static Field>,
}

impl FieldSelection {
    /// Keeps the first occurrence of each field, in the given order.
    pub fn new(selected: Vec<&'static Field>) -> Self {
        let mut unique: Vec<&'static Field> = Vec::with_capacity(selected.len());
        for field in selected {
            if !unique.contains(&field) {
                unique.push(field);
            }
        }
        Self { selected: unique }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static Field> + '_ {
        let all: &'static [Field] = if self.selected.is_empty() { FIELDS } else { &[] };
        all.iter().chain(self.selected.iter().copied())
    }

    /// Name/value pairs for every selected field present in `measurement`.
    pub fn values<'a>(
        &'a self,
        measurement: &'a Measurement,
    ) -> impl Iterator<Item = (&'static str, FieldValue)> + 'a {
        self.iter()
            .filter_map(move |f| f.value(measurement).map(|v| (f.name, v)))
    }
}
