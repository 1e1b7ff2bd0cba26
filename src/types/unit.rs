//! Temperature units and the slider bounds that go with each of them.

use std::fmt;
use std::str::FromStr;

use crate::types::threshold::ThresholdRange;

/// The unit a [`crate::TemperatureSeries`] is expressed in.
///
/// The string form matches the `temperature_unit` parameter of the Open-Meteo API.
///
/// # Examples
///
/// ```
/// use heatpump_counter::TemperatureUnit;
///
/// assert_eq!(TemperatureUnit::Celsius.to_string(), "celsius");
/// assert_eq!("fahrenheit".parse::<TemperatureUnit>(), Ok(TemperatureUnit::Fahrenheit));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TemperatureUnit {
    #[default]
    Fahrenheit,
    Celsius,
}

impl TemperatureUnit {
    pub(crate) fn api_name(&self) -> &'static str {
        match self {
            TemperatureUnit::Fahrenheit => "fahrenheit",
            TemperatureUnit::Celsius => "celsius",
        }
    }

    /// Short suffix used in table and plot labels.
    pub fn symbol(&self) -> &'static str {
        match self {
            TemperatureUnit::Fahrenheit => "°F",
            TemperatureUnit::Celsius => "°C",
        }
    }

    /// Converts `value`, expressed in `self`, to the `to` unit.
    ///
    /// This is the only place unit arithmetic happens in the crate.
    ///
    /// ```
    /// use heatpump_counter::TemperatureUnit;
    ///
    /// assert_eq!(TemperatureUnit::Celsius.convert(100.0, TemperatureUnit::Fahrenheit), 212.0);
    /// assert_eq!(TemperatureUnit::Fahrenheit.convert(32.0, TemperatureUnit::Celsius), 0.0);
    /// ```
    pub fn convert(self, value: f64, to: TemperatureUnit) -> f64 {
        match (self, to) {
            (TemperatureUnit::Fahrenheit, TemperatureUnit::Fahrenheit)
            | (TemperatureUnit::Celsius, TemperatureUnit::Celsius) => value,
            (TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius) => (value - 32.0) * 5.0 / 9.0,
            (TemperatureUnit::Celsius, TemperatureUnit::Fahrenheit) => value * 9.0 / 5.0 + 32.0,
        }
    }

    /// Slider limits and default selections for this unit.
    pub fn bounds(self) -> ThresholdBounds {
        let fahrenheit = ThresholdBounds::FAHRENHEIT;
        match self {
            TemperatureUnit::Fahrenheit => fahrenheit,
            TemperatureUnit::Celsius => {
                let to_c = |v: i32| TemperatureUnit::Fahrenheit.convert(v as f64, self);
                ThresholdBounds {
                    plot_min: to_c(fahrenheit.plot_min).floor() as i32,
                    plot_max: to_c(fahrenheit.plot_max).ceil() as i32,
                    table_min: to_c(fahrenheit.table_min).floor() as i32,
                    table_max: to_c(fahrenheit.table_max).ceil() as i32,
                    default_plot: to_c(fahrenheit.default_plot).round() as i32,
                    default_table: (
                        to_c(fahrenheit.default_table.0).round() as i32,
                        to_c(fahrenheit.default_table.1).round() as i32,
                    ),
                }
            }
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.api_name())
    }
}

/// Error returned when parsing an unknown unit name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown temperature unit '{0}', expected 'fahrenheit' or 'celsius'")]
pub struct ParseUnitError(pub String);

impl FromStr for TemperatureUnit {
    type Err = ParseUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fahrenheit" | "f" => Ok(TemperatureUnit::Fahrenheit),
            "celsius" | "c" => Ok(TemperatureUnit::Celsius),
            _ => Err(ParseUnitError(s.to_string())),
        }
    }
}

/// Limits of the threshold sliders and their initial values, in one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdBounds {
    pub plot_min: i32,
    pub plot_max: i32,
    pub table_min: i32,
    pub table_max: i32,
    pub default_plot: i32,
    pub default_table: (i32, i32),
}

impl ThresholdBounds {
    const FAHRENHEIT: ThresholdBounds = ThresholdBounds {
        plot_min: -15,
        plot_max: 50,
        table_min: -25,
        table_max: 60,
        default_plot: 5,
        default_table: (0, 15),
    };

    /// Clamps a plot threshold into the plot slider's limits.
    pub fn clamp_plot(&self, threshold: i32) -> i32 {
        threshold.clamp(self.plot_min, self.plot_max)
    }

    /// Clamps both ends of a table range into the table slider's limits.
    pub fn clamp_table(&self, range: ThresholdRange) -> ThresholdRange {
        ThresholdRange::spanning(
            range.low().clamp(self.table_min, self.table_max),
            range.high().clamp(self.table_min, self.table_max),
        )
    }

    /// The default table range as a [`ThresholdRange`].
    pub fn default_range(&self) -> ThresholdRange {
        let (low, high) = self.default_table;
        ThresholdRange::spanning(low, high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_is_identity_for_same_unit() {
        for unit in [TemperatureUnit::Fahrenheit, TemperatureUnit::Celsius] {
            assert_eq!(unit.convert(-12.5, unit), -12.5);
        }
    }

    #[test]
    fn test_convert_known_points() {
        let f = TemperatureUnit::Fahrenheit;
        let c = TemperatureUnit::Celsius;
        assert_eq!(f.convert(-40.0, c), -40.0);
        assert_eq!(c.convert(-40.0, f), -40.0);
        assert_eq!(f.convert(212.0, c), 100.0);
        assert!((c.convert(f.convert(50.0, c), f) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_unit() {
        assert_eq!("Celsius".parse(), Ok(TemperatureUnit::Celsius));
        assert_eq!(" f ".parse(), Ok(TemperatureUnit::Fahrenheit));
        assert!("kelvin".parse::<TemperatureUnit>().is_err());
    }

    #[test]
    fn test_celsius_bounds_cover_fahrenheit_bounds() {
        let f = TemperatureUnit::Fahrenheit.bounds();
        let c = TemperatureUnit::Celsius.bounds();
        assert_eq!(c.table_min, -32); // -25°F = -31.67°C
        assert_eq!(c.table_max, 16); // 60°F = 15.56°C
        assert_eq!(c.plot_min, -27); // -15°F = -26.11°C
        assert_eq!(c.plot_max, 10);
        assert_eq!(c.default_plot, -15);
        assert_eq!(c.default_table, (-18, -9));
        assert!(f.table_min < f.default_table.0 && f.default_table.1 < f.table_max);
    }

    #[test]
    fn test_clamp() {
        let bounds = TemperatureUnit::Fahrenheit.bounds();
        assert_eq!(bounds.clamp_plot(-100), -15);
        assert_eq!(bounds.clamp_plot(100), 50);
        assert_eq!(bounds.clamp_plot(10), 10);

        let range = bounds.clamp_table(ThresholdRange::new(-40, 20).unwrap());
        assert_eq!((range.low(), range.high()), (-25, 20));
    }
}
