//! Parsing the `key:value,key:value` argument string into a typed policy.
//!
//! Validation happens once here. The merge only ever sees an
//! [`InterleavePolicy`] whose values are already in range; anything that had
//! to be replaced by a default is reported as a [`ConfigWarning`].

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{ConfigError, ConfigResult, ConfigWarning};
use crate::gcode::{Factor, Mm, Seconds};
use crate::offset::AxisOffsets;

pub const KEY_GCODE1: &str = "G-code1";
pub const KEY_X_OFFSET: &str = "X_offset";
pub const KEY_Y_OFFSET: &str = "Y_offset";
pub const KEY_Z_OFFSET: &str = "Z_offset";
pub const KEY_FAN_CONTROL: &str = "fan_control";
pub const KEY_START_LAYER: &str = "start_layer";
pub const KEY_REST1_POSITION: &str = "rest1_position";
pub const KEY_REST1_TIME: &str = "rest1_time";
pub const KEY_REST2_POSITION: &str = "rest2_position";
pub const KEY_REST2_TIME: &str = "rest2_time";
pub const KEY_EXTRUSION_MULTIPLIER: &str = "extrusion_multiplier";
pub const KEY_RETRACTION: &str = "retraction";

#[derive(Debug, Clone, PartialEq)]
pub struct InterleavePolicy {
    /// Applied to the second toolpath only.
    pub offsets: AxisOffsets,
    pub extrusion_multiplier: Factor,
    // 0.0 disables retraction
    pub retraction_length: Mm,
    pub fan_control: bool,
    /// 1-based; layers before it come from the first toolpath only.
    pub start_layer: usize,
    /// Parking spot visited before each second-toolpath layer.
    pub rest1_position: Option<(Mm, Mm)>,
    pub rest1_time: Seconds,
    /// Parking spot visited after each second-toolpath layer.
    pub rest2_position: Option<(Mm, Mm)>,
    pub rest2_time: Seconds,
}

impl Default for InterleavePolicy {
    fn default() -> Self {
        InterleavePolicy {
            offsets: AxisOffsets::default(),
            extrusion_multiplier: 1.0,
            retraction_length: 0.0,
            fan_control: false,
            start_layer: 1,
            rest1_position: None,
            rest1_time: 0.0,
            rest2_position: None,
            rest2_time: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterleaveConfig {
    pub gcode1_path: PathBuf,
    pub policy: InterleavePolicy,
    /// Values that were replaced by their defaults, in key order.
    pub warnings: Vec<ConfigWarning>,
}

impl InterleaveConfig {
    /// Parses the argument string. `gcode1_prefix` is prepended verbatim to the
    /// `G-code1` value to form the first toolpath's path.
    ///
    /// Rest positions are two numbers joined by `_` (e.g. `rest1_position:10_200`),
    /// since `,` already separates the pairs.
    pub fn parse(arguments: &str, gcode1_prefix: &str) -> ConfigResult<InterleaveConfig> {
        let args = key_values(arguments);
        let mut warnings = vec![];

        let gcode1_path = match args.get(KEY_GCODE1) {
            Some(partial) if !partial.is_empty() => PathBuf::from(format!("{}{}", gcode1_prefix, partial)),
            _ => return Err(ConfigError::MissingKey(KEY_GCODE1.to_string())),
        };

        let offsets = AxisOffsets::new(
            parse_offset(&args, KEY_X_OFFSET)?,
            parse_offset(&args, KEY_Y_OFFSET)?,
            parse_offset(&args, KEY_Z_OFFSET)?,
        );

        let fan_control = args
            .get(KEY_FAN_CONTROL)
            .is_some_and(|v| v.eq_ignore_ascii_case("on"));

        let start_layer = keep(&mut warnings, parse_start_layer(args.get(KEY_START_LAYER).copied()));
        let rest1_position = keep(
            &mut warnings,
            parse_position(KEY_REST1_POSITION, args.get(KEY_REST1_POSITION).copied()),
        );
        let rest1_time = keep(
            &mut warnings,
            non_negative_or_default(KEY_REST1_TIME, args.get(KEY_REST1_TIME).copied(), 0.0),
        );
        let extrusion_multiplier = keep(
            &mut warnings,
            non_negative_or_default(KEY_EXTRUSION_MULTIPLIER, args.get(KEY_EXTRUSION_MULTIPLIER).copied(), 1.0),
        );
        let retraction_length = keep(
            &mut warnings,
            non_negative_or_default(KEY_RETRACTION, args.get(KEY_RETRACTION).copied(), 0.0),
        );
        let rest2_position = keep(
            &mut warnings,
            parse_position(KEY_REST2_POSITION, args.get(KEY_REST2_POSITION).copied()),
        );
        let rest2_time = keep(
            &mut warnings,
            non_negative_or_default(KEY_REST2_TIME, args.get(KEY_REST2_TIME).copied(), 0.0),
        );

        Ok(InterleaveConfig {
            gcode1_path,
            policy: InterleavePolicy {
                offsets,
                extrusion_multiplier,
                retraction_length,
                fan_control,
                start_layer,
                rest1_position,
                rest1_time,
                rest2_position,
                rest2_time,
            },
            warnings,
        })
    }
}

/// Splits on `,` then on the first `:`. Items without `:` are dropped; a repeated key keeps
/// its last value.
fn key_values(arguments: &str) -> HashMap<&str, &str> {
    arguments
        .split(',')
        .filter_map(|item| item.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect()
}

fn keep<T>(warnings: &mut Vec<ConfigWarning>, (value, warning): (T, Option<ConfigWarning>)) -> T {
    warnings.extend(warning);
    value
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_offset(args: &HashMap<&str, &str>, key: &str) -> ConfigResult<Mm> {
    match args.get(key) {
        None => Ok(0.0),
        Some(raw) => parse_finite(raw).ok_or_else(|| ConfigError::InvalidOffset {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Missing means `default` without complaint; malformed or negative means `default` plus a warning.
pub fn non_negative_or_default(key: &'static str, raw: Option<&str>, default: f64) -> (f64, Option<ConfigWarning>) {
    let Some(raw) = raw else {
        return (default, None);
    };
    match parse_finite(raw) {
        None => (
            default,
            Some(ConfigWarning::NotNumeric {
                key,
                value: raw.to_string(),
                default: format!("{:.1}", default),
            }),
        ),
        Some(value) if value < 0.0 => (
            default,
            Some(ConfigWarning::OutOfRange {
                key,
                value: raw.to_string(),
                default: format!("{:.1}", default),
            }),
        ),
        Some(value) => (value, None),
    }
}

pub fn parse_start_layer(raw: Option<&str>) -> (usize, Option<ConfigWarning>) {
    let Some(raw) = raw else {
        return (1, None);
    };
    match raw.parse::<i64>() {
        Err(_) => (
            1,
            Some(ConfigWarning::NotNumeric {
                key: KEY_START_LAYER,
                value: raw.to_string(),
                default: "1".to_string(),
            }),
        ),
        Ok(layer) if layer < 1 => (
            1,
            Some(ConfigWarning::OutOfRange {
                key: KEY_START_LAYER,
                value: raw.to_string(),
                default: "1".to_string(),
            }),
        ),
        Ok(layer) => (usize::try_from(layer).unwrap_or(usize::MAX), None),
    }
}

/// `x_y`, e.g. `10_200.5`. An empty value leaves the slot unset without a warning.
pub fn parse_position(key: &'static str, raw: Option<&str>) -> (Option<(Mm, Mm)>, Option<ConfigWarning>) {
    let raw = match raw {
        None | Some("") => return (None, None),
        Some(raw) => raw,
    };
    let coords: Vec<&str> = raw.split('_').collect();
    if let [x, y] = coords.as_slice() {
        if let (Some(x), Some(y)) = (parse_finite(x.trim()), parse_finite(y.trim())) {
            return (Some((x, y)), None);
        }
    }
    (
        None,
        Some(ConfigWarning::InvalidPosition {
            key,
            value: raw.to_string(),
        }),
    )
}
