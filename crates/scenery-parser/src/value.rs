//! Parsers for attribute values: booleans, numbers, physical quantities and
//! colors.
//!
//! Every parser requires the whole value to be consumed.

use color::Rgba8;
use thiserror::Error;
use winnow::{
    Parser as _,
    ascii::{dec_int, float, hex_digit1, multispace0},
    combinator::{alt, delimited, opt, preceded},
    error::ModalResult,
    token::rest,
};

use scenery_core::quantity::{Quantity, QuantityError};

/// Why a value could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("Invalid attribute format")]
    Format,

    #[error(transparent)]
    Unit(#[from] QuantityError),
}

fn number(input: &mut &str) -> ModalResult<f64> {
    float.parse_next(input)
}

fn integer(input: &mut &str) -> ModalResult<i32> {
    dec_int.parse_next(input)
}

fn boolean(input: &mut &str) -> ModalResult<bool> {
    alt((
        alt(("true", "1", "on")).value(true),
        alt(("false", "0", "off")).value(false),
    ))
    .parse_next(input)
}

fn quantity_literal<'a>(input: &mut &'a str) -> ModalResult<(f64, &'a str)> {
    (number, preceded(multispace0, rest)).parse_next(input)
}

/// Parse `true`, `1`, `on`, `false`, `0` or `off`.
pub fn parse_bool(value: &str) -> Result<bool, ValueError> {
    boolean.parse(value).map_err(|_| ValueError::Format)
}

pub fn parse_integer(value: &str) -> Result<i32, ValueError> {
    integer.parse(value).map_err(|_| ValueError::Format)
}

pub fn parse_float(value: &str) -> Result<f64, ValueError> {
    number.parse(value).map_err(|_| ValueError::Format)
}

/// Parse a number with an optional unit suffix and convert it to the base
/// unit of `quantity`.
///
/// ```
/// # use scenery_core::quantity::Quantity;
/// # use scenery_parser::value::parse_quantity;
/// let meters = parse_quantity("150 mm", Quantity::Length).unwrap();
/// assert!((meters - 0.15).abs() < 1e-12);
/// ```
pub fn parse_quantity(value: &str, quantity: Quantity) -> Result<f64, ValueError> {
    let (number, unit) = quantity_literal
        .parse(value)
        .map_err(|_| ValueError::Format)?;
    Ok(quantity.to_base(number, unit)?)
}

fn scale_component(value: f64, percent: bool) -> Option<u8> {
    let scaled = if percent {
        (0.0..=100.0).contains(&value).then(|| value * 255.0 / 100.0)?
    } else {
        (0.0..=255.0)
            .contains(&value)
            .then_some(value)
            .filter(|value| value.fract() == 0.0)?
    };
    Some(scaled.round() as u8)
}

fn component(input: &mut &str) -> ModalResult<u8> {
    delimited(multispace0, (number, opt('%')), multispace0)
        .verify_map(|(value, percent): (f64, Option<char>)| {
            scale_component(value, percent.is_some())
        })
        .parse_next(input)
}

fn alpha(input: &mut &str) -> ModalResult<u8> {
    delimited(multispace0, number, multispace0)
        .verify_map(|value| {
            (0.0..=1.0)
                .contains(&value)
                .then(|| (value * 255.0).round() as u8)
        })
        .parse_next(input)
}

fn expand_hex(digits: &str) -> Option<Rgba8> {
    let nibbles = digits
        .chars()
        .map(|c| c.to_digit(16).and_then(|d| u8::try_from(d).ok()))
        .collect::<Option<Vec<u8>>>()?;
    let rgba = |r, g, b, a| Rgba8 { r, g, b, a };
    match nibbles.as_slice() {
        &[r, g, b] => Some(rgba(r * 17, g * 17, b * 17, 255)),
        &[r, g, b, a] => Some(rgba(r * 17, g * 17, b * 17, a * 17)),
        &[r1, r2, g1, g2, b1, b2] => Some(rgba(r1 << 4 | r2, g1 << 4 | g2, b1 << 4 | b2, 255)),
        &[r1, r2, g1, g2, b1, b2, a1, a2] => Some(rgba(
            r1 << 4 | r2,
            g1 << 4 | g2,
            b1 << 4 | b2,
            a1 << 4 | a2,
        )),
        _ => None,
    }
}

fn hex_color(input: &mut &str) -> ModalResult<Rgba8> {
    preceded('#', hex_digit1)
        .verify_map(expand_hex)
        .parse_next(input)
}

fn rgb_color(input: &mut &str) -> ModalResult<Rgba8> {
    delimited(
        "rgb(",
        (component, preceded(',', component), preceded(',', component)),
        ')',
    )
    .map(|(r, g, b)| Rgba8 { r, g, b, a: 255 })
    .parse_next(input)
}

fn rgba_color(input: &mut &str) -> ModalResult<Rgba8> {
    delimited(
        "rgba(",
        (
            component,
            preceded(',', component),
            preceded(',', component),
            preceded(',', alpha),
        ),
        ')',
    )
    .map(|(r, g, b, a)| Rgba8 { r, g, b, a })
    .parse_next(input)
}

/// Parse `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)` or
/// `rgba(r, g, b, a)`.
///
/// Components of the functional forms are integers from 0 to 255 or
/// percentages; alpha is a number from 0 to 1.
pub fn parse_color(value: &str) -> Result<Rgba8, ValueError> {
    alt((hex_color, rgba_color, rgb_color))
        .parse(value)
        .map_err(|_| ValueError::Format)
}

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;

    use super::*;

    fn rgba(r: u8, g: u8, b: u8, a: u8) -> Rgba8 {
        Rgba8 { r, g, b, a }
    }

    #[test]
    fn test_parse_bool() {
        for value in ["true", "1", "on"] {
            assert_eq!(parse_bool(value), Ok(true), "{value}");
        }
        for value in ["false", "0", "off"] {
            assert_eq!(parse_bool(value), Ok(false), "{value}");
        }
        for value in ["yes", "True", "1 ", "onn", ""] {
            assert_eq!(parse_bool(value), Err(ValueError::Format), "{value}");
        }
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("42"), Ok(42));
        assert_eq!(parse_integer("-7"), Ok(-7));
        assert_eq!(parse_integer("4.2"), Err(ValueError::Format));
        assert_eq!(parse_integer("99999999999"), Err(ValueError::Format));
    }

    #[test]
    fn test_parse_float() {
        assert!(approx_eq!(f64, parse_float("2.5").unwrap(), 2.5));
        assert!(approx_eq!(f64, parse_float("-1e-3").unwrap(), -0.001));
        assert_eq!(parse_float("2.5m"), Err(ValueError::Format));
        assert_eq!(parse_float("abc"), Err(ValueError::Format));
    }

    #[test]
    fn test_parse_quantity() {
        let meters = parse_quantity("150mm", Quantity::Length).unwrap();
        assert!(approx_eq!(f64, meters, 0.15, epsilon = 1e-12));

        let meters = parse_quantity("2 km", Quantity::Length).unwrap();
        assert!(approx_eq!(f64, meters, 2000.0));

        let meters = parse_quantity("0.5", Quantity::Length).unwrap();
        assert!(approx_eq!(f64, meters, 0.5));

        let radians = parse_quantity("180degree", Quantity::Angle).unwrap();
        assert!(approx_eq!(f64, radians, std::f64::consts::PI, epsilon = 1e-12));
    }

    #[test]
    fn test_parse_quantity_errors() {
        assert_eq!(
            parse_quantity("mm", Quantity::Length),
            Err(ValueError::Format)
        );
        let err = parse_quantity("3lb", Quantity::Mass).unwrap_err();
        assert!(matches!(err, ValueError::Unit(_)));
        assert_eq!(
            err.to_string(),
            "Unexpected unit \"lb\" for mass (expected one of \"g\", \"kg\")"
        );
    }

    #[test]
    fn test_parse_hex_colors() {
        assert_eq!(parse_color("#F08"), Ok(rgba(255, 0, 136, 255)));
        assert_eq!(parse_color("#f08c"), Ok(rgba(255, 0, 136, 204)));
        assert_eq!(parse_color("#102030"), Ok(rgba(16, 32, 48, 255)));
        assert_eq!(parse_color("#10203040"), Ok(rgba(16, 32, 48, 64)));
        assert_eq!(parse_color("#12345"), Err(ValueError::Format));
        assert_eq!(parse_color("#xyz"), Err(ValueError::Format));
    }

    #[test]
    fn test_parse_functional_colors() {
        assert_eq!(parse_color("rgb(10, 20, 30)"), Ok(rgba(10, 20, 30, 255)));
        assert_eq!(parse_color("rgb(100%,0%,50%)"), Ok(rgba(255, 0, 128, 255)));
        assert_eq!(
            parse_color("rgba(0, 0, 255, 0.5)"),
            Ok(rgba(0, 0, 255, 128))
        );
        assert_eq!(parse_color("rgb(256, 0, 0)"), Err(ValueError::Format));
        assert_eq!(parse_color("rgb(1.5, 0, 0)"), Err(ValueError::Format));
        assert_eq!(parse_color("rgba(0, 0, 0, 2)"), Err(ValueError::Format));
        assert_eq!(parse_color("rgb(1, 2)"), Err(ValueError::Format));
        assert_eq!(parse_color("red"), Err(ValueError::Format));
    }
}
