//! Tolerant field extraction for the power-management query outputs.
//!
//! Each extractor returns `Option` per field: a key that is absent or
//! malformed yields `None` and never blocks the others. Unknown keys are
//! ignored, so new fields added by the OS simply pass through.
//!
//! The battery registry dump looks like:
//!
//! ```text
//! +-o AppleSmartBattery  <class AppleSmartBattery, id 0x100000254, ...>
//!     {
//!       "ExternalConnected" = Yes
//!       "CurrentCapacity" = 87
//!       "InstantAmperage" = 18446744073709550616
//!       "AdapterDetails" = {"AdapterVoltage"=20000,"Watts"=96,"Current"=4700}
//!       "BatteryData" = {"Voltage"=12800,"CycleCount"=5}
//!     }
//! ```
//!
//! Scalar keys are only read from their own top-level line, so the nested
//! `"Voltage"` inside `BatteryData` never shadows the real one.

use serde::Serialize;

use crate::snapshot::{TimeRemaining, round_to};

/// Offset between Kelvin and Celsius.
const KELVIN_OFFSET: f64 = 273.15;

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// Fields found in one battery registry dump.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrimaryReading {
    pub external_connected: Option<bool>,
    pub is_charging: Option<bool>,
    pub fully_charged: Option<bool>,
    pub current_capacity: Option<u64>,
    pub max_capacity: Option<u64>,
    pub time_remaining: Option<TimeRemaining>,
    /// Degrees Celsius, 1 decimal.
    pub temperature: Option<f64>,
    /// Volts.
    pub voltage: Option<f64>,
    /// Signed milliamps.
    pub amperage: Option<i64>,
    pub cycle_count: Option<u64>,
    pub design_capacity: Option<u64>,
    pub raw_max_capacity: Option<u64>,
    pub adapter: AdapterReading,
}

/// Fields from the adapter details group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdapterReading {
    /// Volts.
    pub voltage: Option<f64>,
    /// Milliamps.
    pub current: Option<u64>,
    pub watts: Option<u64>,
}

/// Slow-changing fields from the profiler and power settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SecondaryReading {
    pub condition: Option<String>,
    pub low_power_mode: Option<bool>,
}

impl PrimaryReading {
    /// True when nothing at all was recognised.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// Primary registry dump
// ---------------------------------------------------------------------------

/// Parse the battery registry dump.
pub fn parse_primary(text: &str) -> PrimaryReading {
    PrimaryReading {
        external_connected: flag(text, "ExternalConnected")
            .or_else(|| flag(text, "AppleRawExternalConnected")),
        is_charging: flag(text, "IsCharging"),
        fully_charged: flag(text, "FullyCharged"),
        current_capacity: unsigned(text, "CurrentCapacity"),
        max_capacity: unsigned(text, "MaxCapacity"),
        time_remaining: top_level_value(text, "TimeRemaining")
            .and_then(|v| v.parse::<u32>().ok())
            .map(TimeRemaining::from_minutes),
        temperature: unsigned(text, "Temperature").map(deci_kelvin_to_celsius),
        voltage: unsigned(text, "Voltage").map(millis_to_units),
        amperage: top_level_value(text, "InstantAmperage")
            .and_then(parse_amperage)
            .or_else(|| top_level_value(text, "Amperage").and_then(parse_amperage)),
        cycle_count: unsigned(text, "CycleCount"),
        design_capacity: unsigned(text, "DesignCapacity"),
        raw_max_capacity: unsigned(text, "AppleRawMaxCapacity"),
        adapter: brace_group(text, "AdapterDetails")
            .or_else(|| brace_group(text, "AppleRawAdapterDetails"))
            .map(parse_adapter)
            .unwrap_or_default(),
    }
}

fn parse_adapter(group: &str) -> AdapterReading {
    AdapterReading {
        voltage: group_value(group, "AdapterVoltage")
            .and_then(|v| v.parse::<u64>().ok())
            .map(millis_to_units),
        current: group_value(group, "Current").and_then(|v| v.parse().ok()),
        watts: group_value(group, "Watts").and_then(|v| v.parse().ok()),
    }
}

/// Parse a milliamp counter that may be a 64-bit two's-complement encoding.
pub fn parse_amperage(raw: &str) -> Option<i64> {
    if raw.starts_with('-') {
        return raw.parse::<i64>().ok();
    }
    let value = raw.parse::<u64>().ok()?;
    // Values >= 2^63 are negative quantities printed unsigned: subtract 2^64.
    Some(value as i64)
}

pub fn deci_kelvin_to_celsius(raw: u64) -> f64 {
    round_to(raw as f64 / 10.0 - KELVIN_OFFSET, 1)
}

fn millis_to_units(raw: u64) -> f64 {
    raw as f64 / 1000.0
}

// ---------------------------------------------------------------------------
// Secondary sources
// ---------------------------------------------------------------------------

/// Parse the profiler text and power settings text together.
pub fn parse_secondary(profile: &str, settings: &str) -> SecondaryReading {
    SecondaryReading {
        condition: parse_condition(profile),
        low_power_mode: parse_low_power_mode(settings),
    }
}

/// First word after `Condition:`.
pub fn parse_condition(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let (_, rest) = line.split_once("Condition:")?;
        let word: String = rest
            .trim_start()
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        (!word.is_empty()).then_some(word)
    })
}

/// `lowpowermode <digit>`; any digit other than `1` means off.
pub fn parse_low_power_mode(text: &str) -> Option<bool> {
    text.lines().find_map(|line| {
        let idx = line.find("lowpowermode")?;
        let rest = &line[idx + "lowpowermode".len()..];
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let digit = rest.trim_start().chars().next().filter(char::is_ascii_digit)?;
        Some(digit == '1')
    })
}

// ---------------------------------------------------------------------------
// Extraction primitives
// ---------------------------------------------------------------------------

/// Value text of a top-level `"key" = value` line.
///
/// Leading whitespace and `|` tree glyphs are skipped. For scalar values the
/// first whitespace-delimited token is returned; for groups the rest of the
/// line starting at the opening brace.
fn top_level_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines().find_map(|line| {
        let value = assignment_rhs(line, key)?;
        if value.starts_with('{') || value.starts_with('(') {
            Some(value)
        } else {
            value.split_whitespace().next()
        }
    })
}

fn assignment_rhs<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let trimmed = line.trim_start_matches(|c: char| c.is_whitespace() || c == '|');
    let rest = trimmed.strip_prefix('"')?.strip_prefix(key)?.strip_prefix('"')?;
    let rest = rest.trim_start().strip_prefix('=')?;
    Some(rest.trim())
}

fn flag(text: &str, key: &str) -> Option<bool> {
    match top_level_value(text, key)? {
        "Yes" | "1" => Some(true),
        "No" | "0" => Some(false),
        _ => None,
    }
}

fn unsigned(text: &str, key: &str) -> Option<u64> {
    top_level_value(text, key)?.parse().ok()
}

/// Contents of the brace-delimited group assigned to `key`, without braces.
///
/// The group may be wrapped in an array: `"key" = ({...})`.
fn brace_group<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let value = top_level_value(text, key)?;
    let value = value.strip_prefix('(').unwrap_or(value).trim_start();
    let body = value.strip_prefix('{')?;

    let mut depth = 1usize;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&body[..i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Value for `key` inside a group body like `"A"=1,"B"=2` or `A:1, B:2`.
fn group_value<'a>(group: &'a str, key: &str) -> Option<&'a str> {
    group.split(',').find_map(|entry| {
        let (k, v) = entry.split_once(['=', ':'])?;
        (k.trim().trim_matches('"') == key).then(|| v.trim().trim_matches('"'))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
