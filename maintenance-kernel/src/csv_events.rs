//! Tabular history adapter.
//!
//! Reads `DeviceID, Timestamp, Temperature, Pressure, CPU_Usage` rows and
//! turns each device's most recent row into a telemetry event.

use crate::config::{DEFAULT_ALERT_THRESHOLD, DEFAULT_TOP_K};
use crate::error::InputError;
use crate::models::TelemetryEvent;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

#[derive(Debug, Deserialize)]
struct HistoryRow {
    #[serde(rename = "DeviceID")]
    device_id: String,
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "Temperature")]
    temperature: f64,
    #[serde(rename = "Pressure")]
    pressure: f64,
    #[serde(rename = "CPU_Usage")]
    cpu_usage: f64,
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD HH:MM` and
/// `YYYY-MM-DD`. Naive timestamps are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, InputError> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(ts);
    }
    let seconds = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    if let Ok(ts) = PrimitiveDateTime::parse(raw, seconds) {
        return Ok(ts.assume_utc());
    }
    let minutes = format_description!("[year]-[month]-[day] [hour]:[minute]");
    if let Ok(ts) = PrimitiveDateTime::parse(raw, minutes) {
        return Ok(ts.assume_utc());
    }
    let day = format_description!("[year]-[month]-[day]");
    if let Ok(date) = Date::parse(raw, day) {
        return Ok(date.midnight().assume_utc());
    }
    Err(InputError::BadTimestamp(raw.to_string()))
}

pub fn latest_events_from_reader<R: std::io::Read>(reader: R, label: &str) -> Result<Vec<TelemetryEvent>, InputError> {
    let mut table = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    // device -> (timestamp, row); later rows win ties
    let mut latest: BTreeMap<String, (OffsetDateTime, HistoryRow)> = BTreeMap::new();
    for row in table.deserialize::<HistoryRow>() {
        let row = row?;
        let ts = parse_timestamp(&row.timestamp)?;
        let newer = latest.get(&row.device_id).map_or(true, |(seen, _)| ts >= *seen);
        if newer {
            latest.insert(row.device_id.clone(), (ts, row));
        }
    }

    if latest.is_empty() {
        return Err(InputError::EmptyTable(label.to_string()));
    }

    Ok(latest
        .into_values()
        .map(|(_, row)| TelemetryEvent {
            device_id: row.device_id,
            temperature: row.temperature,
            pressure: row.pressure,
            cpu_usage: row.cpu_usage,
            top_k: Some(DEFAULT_TOP_K),
            alert_threshold: Some(DEFAULT_ALERT_THRESHOLD),
        })
        .collect())
}

/// One event per device, sorted by device id.
pub fn latest_events(path: impl AsRef<Path>) -> Result<Vec<TelemetryEvent>, InputError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    latest_events_from_reader(file, &path.display().to_string())
}

/// The event of the first device (by id), built from its latest row.
pub fn last_row_event(path: impl AsRef<Path>) -> Result<TelemetryEvent, InputError> {
    let path = path.as_ref();
    latest_events(path)?
        .into_iter()
        .next()
        .ok_or_else(|| InputError::EmptyTable(path.display().to_string()))
}
