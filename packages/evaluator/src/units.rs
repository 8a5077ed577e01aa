//! Static unit conversion table.
//!
//! Each unit belongs to one dimension and carries a multiplier relative to
//! that dimension's base unit. Units compare case-insensitively.

use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Length,
    Angle,
    Time,
    Frequency,
    Resolution,
}

fn lookup(unit: &str) -> Option<(Dimension, f64)> {
    let entry = match unit.to_ascii_lowercase().as_str() {
        "px" => (Dimension::Length, 1.0),
        "in" => (Dimension::Length, 96.0),
        "cm" => (Dimension::Length, 96.0 / 2.54),
        "mm" => (Dimension::Length, 96.0 / 25.4),
        "q" => (Dimension::Length, 96.0 / 101.6),
        "pt" => (Dimension::Length, 96.0 / 72.0),
        "pc" => (Dimension::Length, 16.0),
        "deg" => (Dimension::Angle, 1.0),
        "grad" => (Dimension::Angle, 0.9),
        "rad" => (Dimension::Angle, 180.0 / PI),
        "turn" => (Dimension::Angle, 360.0),
        "ms" => (Dimension::Time, 1.0),
        "s" => (Dimension::Time, 1000.0),
        "hz" => (Dimension::Frequency, 1.0),
        "khz" => (Dimension::Frequency, 1000.0),
        "dpi" => (Dimension::Resolution, 1.0),
        "dpcm" => (Dimension::Resolution, 2.54),
        "dppx" | "x" => (Dimension::Resolution, 96.0),
        _ => return None,
    };
    Some(entry)
}

/// Round to `precision` decimal digits, mapping `-0` to `0`.
pub fn round_to(value: f64, precision: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(precision as i32);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Convert `value` from one unit to another. Absent units convert to
/// anything unchanged.
pub fn convert(value: f64, from: Option<&str>, to: Option<&str>) -> Option<f64> {
    match (from, to) {
        (None, _) | (_, None) => Some(value),
        (Some(from), Some(to)) if from.eq_ignore_ascii_case(to) => Some(value),
        (Some(from), Some(to)) => {
            let (from_dim, from_factor) = lookup(from)?;
            let (to_dim, to_factor) = lookup(to)?;
            (from_dim == to_dim).then(|| value * from_factor / to_factor)
        }
    }
}

/// Whether two units can be combined.
pub fn compatible(a: Option<&str>, b: Option<&str>) -> bool {
    convert(1.0, a, b).is_some()
}
