//! Physical quantities and their unit tables.
//!
//! Every quantity is stored in SI base units. A value written without a unit
//! suffix is already in the base unit; a suffix scales it by the factor listed
//! in the quantity's table.

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// A unit symbol together with its factor to the SI base unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Unit {
    symbol: &'static str,
    factor: f64,
}

impl Unit {
    const fn new(symbol: &'static str, factor: f64) -> Self {
        Self { symbol, factor }
    }

    /// The suffix written after the number.
    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    /// Multiplier converting a value in this unit to the base unit.
    pub fn factor(&self) -> f64 {
        self.factor
    }
}

const DEGREE: f64 = std::f64::consts::PI / 180.0;

const LENGTH: &[Unit] = &[
    Unit::new("mm", 0.001),
    Unit::new("cm", 0.01),
    Unit::new("dm", 0.1),
    Unit::new("m", 1.0),
    Unit::new("km", 1000.0),
];

const VELOCITY: &[Unit] = &[
    Unit::new("mm/s", 0.001),
    Unit::new("cm/s", 0.01),
    Unit::new("dm/s", 0.1),
    Unit::new("m/s", 1.0),
    Unit::new("km/s", 1000.0),
    Unit::new("km/h", 1.0 / 3.6),
];

const ACCELERATION: &[Unit] = &[Unit::new("mm/s²", 0.001), Unit::new("m/s²", 1.0)];

const ANGLE: &[Unit] = &[Unit::new("degree", DEGREE), Unit::new("radian", 1.0)];

const ANGULAR_VELOCITY: &[Unit] = &[Unit::new("degree/s", DEGREE), Unit::new("radian/s", 1.0)];

const FORCE: &[Unit] = &[Unit::new("N", 1.0)];

const MASS: &[Unit] = &[Unit::new("g", 0.001), Unit::new("kg", 1.0)];

const MOMENT_OF_INERTIA: &[Unit] = &[Unit::new("g·mm²", 1e-9), Unit::new("kg·m²", 1.0)];

const TIME: &[Unit] = &[Unit::new("s", 1.0)];

/// A physical quantity an attribute value can denote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Length,
    Velocity,
    Acceleration,
    Angle,
    AngularVelocity,
    Force,
    Mass,
    MomentOfInertia,
    Time,
    /// A dimensionless scale factor expressed as a length unit
    /// (`mm` scales by 0.001); no suffix means a factor of 1.
    Scale,
}

impl Quantity {
    /// The units accepted for this quantity.
    pub fn units(self) -> &'static [Unit] {
        match self {
            Quantity::Length | Quantity::Scale => LENGTH,
            Quantity::Velocity => VELOCITY,
            Quantity::Acceleration => ACCELERATION,
            Quantity::Angle => ANGLE,
            Quantity::AngularVelocity => ANGULAR_VELOCITY,
            Quantity::Force => FORCE,
            Quantity::Mass => MASS,
            Quantity::MomentOfInertia => MOMENT_OF_INERTIA,
            Quantity::Time => TIME,
        }
    }

    /// Human readable name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Quantity::Length => "length",
            Quantity::Velocity => "velocity",
            Quantity::Acceleration => "acceleration",
            Quantity::Angle => "angle",
            Quantity::AngularVelocity => "angular velocity",
            Quantity::Force => "force",
            Quantity::Mass => "mass",
            Quantity::MomentOfInertia => "moment of inertia",
            Quantity::Time => "time",
            Quantity::Scale => "scale",
        }
    }

    /// Look up the conversion factor for a unit suffix.
    ///
    /// An empty suffix selects the base unit.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::UnknownUnit`] listing the accepted suffixes if
    /// `suffix` is not in this quantity's table.
    pub fn factor(self, suffix: &str) -> Result<f64, QuantityError> {
        if suffix.is_empty() {
            return Ok(1.0);
        }
        self.units()
            .iter()
            .find(|unit| unit.symbol == suffix)
            .map(Unit::factor)
            .ok_or_else(|| QuantityError::UnknownUnit {
                quantity: self,
                unit: suffix.to_string(),
            })
    }

    /// Convert `value` written in `suffix` units to the base unit.
    pub fn to_base(self, value: f64, suffix: &str) -> Result<f64, QuantityError> {
        self.factor(suffix).map(|factor| value * factor)
    }

    /// The accepted suffixes, quoted and comma separated.
    pub fn allowed_units(self) -> String {
        self.units()
            .iter()
            .map(|unit| format!("\"{}\"", unit.symbol))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors produced while converting quantities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("Unexpected unit \"{unit}\" for {quantity} (expected one of {})", quantity.allowed_units())]
    UnknownUnit { quantity: Quantity, unit: String },
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    const QUANTITIES: [Quantity; 10] = [
        Quantity::Length,
        Quantity::Velocity,
        Quantity::Acceleration,
        Quantity::Angle,
        Quantity::AngularVelocity,
        Quantity::Force,
        Quantity::Mass,
        Quantity::MomentOfInertia,
        Quantity::Time,
        Quantity::Scale,
    ];

    proptest! {
        #[test]
        fn every_listed_unit_is_accepted(index in 0..QUANTITIES.len()) {
            let quantity = QUANTITIES[index];
            for unit in quantity.units() {
                prop_assert!(quantity.factor(unit.symbol()).is_ok());
            }
        }

        #[test]
        fn base_unit_keeps_value(index in 0..QUANTITIES.len(), value in -1e6f64..1e6) {
            prop_assert_eq!(QUANTITIES[index].to_base(value, ""), Ok(value));
        }
    }
}
