//! Physical quantities derived from raw sensor values.

use crate::measurement::SensorValues;

/// Values calculated once when a measurement is built. Each is present only
/// when every input it depends on is present.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DerivedValues {
    /// Length of the acceleration vector in g
    pub acceleration_total: Option<f64>,
    /// Angle between the acceleration vector and the X axis, degrees
    pub acceleration_angle_from_x: Option<f64>,
    pub acceleration_angle_from_y: Option<f64>,
    pub acceleration_angle_from_z: Option<f64>,
    /// Absolute humidity in g/m3
    pub absolute_humidity: Option<f64>,
    /// Dew point in Celsius
    pub dew_point: Option<f64>,
    /// Saturation vapour pressure of water in Pascals
    pub equilibrium_vapor_pressure: Option<f64>,
    /// Density of air in kg/m3
    pub air_density: Option<f64>,
}

impl DerivedValues {
    pub fn calculate(values: &SensorValues) -> Self {
        let acceleration = values.acceleration_vector();
        let total = acceleration.map(|(x, y, z)| (x * x + y * y + z * z).sqrt());
        let vector = acceleration.zip(total);

        let t = values.temperature;
        let rh = values.humidity;

        DerivedValues {
            acceleration_total: total,
            acceleration_angle_from_x: vector.and_then(|((x, _, _), t)| angle_from_axis(x, t)),
            acceleration_angle_from_y: vector.and_then(|((_, y, _), t)| angle_from_axis(y, t)),
            acceleration_angle_from_z: vector.and_then(|((_, _, z), t)| angle_from_axis(z, t)),
            absolute_humidity: t.zip(rh).map(|(t, rh)| absolute_humidity(t, rh)),
            dew_point: t.zip(rh).and_then(|(t, rh)| dew_point(t, rh)),
            equilibrium_vapor_pressure: t.map(equilibrium_vapor_pressure),
            air_density: t
                .zip(rh)
                .zip(values.pressure)
                .map(|((t, rh), p)| air_density(t, rh, p)),
        }
    }
}

fn angle_from_axis(component: f64, total: f64) -> Option<f64> {
    (total != 0.0).then(|| (component / total).acos().to_degrees())
}

fn equilibrium_vapor_pressure(temperature: f64) -> f64 {
    611.2 * (17.67 * temperature / (243.5 + temperature)).exp()
}

fn absolute_humidity(temperature: f64, relative_humidity: f64) -> f64 {
    equilibrium_vapor_pressure(temperature) * relative_humidity * 0.021674
        / (273.15 + temperature)
}

// ln(0) at 0% humidity has no dew point.
fn dew_point(temperature: f64, relative_humidity: f64) -> Option<f64> {
    let v = (relative_humidity / 100.0 * equilibrium_vapor_pressure(temperature) / 611.2).ln();
    v.is_finite().then(|| -243.5 * v / (v - 17.67))
}

fn air_density(temperature: f64, relative_humidity: f64, pressure: f64) -> f64 {
    1.2929 * 273.15 / (temperature + 273.15)
        * (pressure - 0.3783 * relative_humidity / 100.0 * equilibrium_vapor_pressure(temperature))
        / 101_300.0
}
