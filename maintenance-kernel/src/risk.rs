//! Threshold-additive risk scoring.
//!
//! Each sensor contributes independently when it strictly exceeds its limit;
//! the sum is clamped to [0, 1] and rounded to two decimals, half away from
//! zero. History is not an input.

use crate::document::fmt_number;
use crate::models::DeviceReading;

pub const TEMPERATURE_LIMIT: f64 = 85.0;
pub const PRESSURE_LIMIT: f64 = 7.5;
pub const CPU_LIMIT: f64 = 90.0;

pub const TEMPERATURE_WEIGHT: f64 = 0.4;
pub const PRESSURE_WEIGHT: f64 = 0.3;
pub const CPU_WEIGHT: f64 = 0.2;

/// Reported for every assessment, whichever limits fired.
pub const FAILURE_MODES: [&str; 3] = ["overheating", "bearing wear", "misalignment"];

pub fn score(temperature: f64, pressure: f64, cpu_usage: f64) -> f64 {
    let mut risk = 0.0;
    if temperature > TEMPERATURE_LIMIT {
        risk += TEMPERATURE_WEIGHT;
    }
    if pressure > PRESSURE_LIMIT {
        risk += PRESSURE_WEIGHT;
    }
    if cpu_usage > CPU_LIMIT {
        risk += CPU_WEIGHT;
    }
    round2(clamp_unit(risk))
}

pub fn score_reading(reading: &DeviceReading) -> f64 {
    score(reading.temperature, reading.pressure, reading.cpu_usage)
}

pub fn failure_modes() -> Vec<String> {
    FAILURE_MODES.iter().map(|m| m.to_string()).collect()
}

/// Human-readable explanation embedding previous risk, current risk and the
/// raw readings.
pub fn rationale(previous_risk: f64, risk: f64, reading: &DeviceReading) -> String {
    format!(
        "Heuristic thresholds → Prev risk={:.2}, Now={:.2} (T={}°C, P={}, CPU={}%).",
        previous_risk,
        risk,
        fmt_number(reading.temperature),
        fmt_number(reading.pressure),
        fmt_number(reading.cpu_usage),
    )
}

fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
