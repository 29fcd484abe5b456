use crate::error::InputError;
use serde::{Deserialize, Serialize};

/// Inbound telemetry event. Field names follow the wire contract
/// (`deviceId`, `Temperature`, `Pressure`, `CPU_Usage`, `topK`, `alert_threshold`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    #[serde(rename = "Temperature")]
    pub temperature: f64,
    #[serde(rename = "Pressure")]
    pub pressure: f64,
    #[serde(rename = "CPU_Usage")]
    pub cpu_usage: f64,
    #[serde(rename = "topK", default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_threshold: Option<f64>,
}

impl TelemetryEvent {
    pub fn new(device_id: impl Into<String>, temperature: f64, pressure: f64, cpu_usage: f64) -> Self {
        Self {
            device_id: device_id.into(),
            temperature,
            pressure,
            cpu_usage,
            top_k: None,
            alert_threshold: None,
        }
    }

    /// Parse and validate a JSON payload (HTTP body or MQTT message).
    pub fn from_json(payload: &[u8]) -> Result<Self, InputError> {
        let event: TelemetryEvent = serde_json::from_slice(payload)?;
        event.validate()?;
        Ok(event)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if self.device_id.trim().is_empty() {
            return Err(InputError::MissingDeviceId);
        }
        if !self.temperature.is_finite() {
            return Err(InputError::NonFinite("Temperature"));
        }
        if !self.pressure.is_finite() {
            return Err(InputError::NonFinite("Pressure"));
        }
        if !self.cpu_usage.is_finite() {
            return Err(InputError::NonFinite("CPU_Usage"));
        }
        if self.top_k == Some(0) {
            return Err(InputError::InvalidTopK);
        }
        if let Some(thr) = self.alert_threshold {
            if !thr.is_finite() {
                return Err(InputError::NonFinite("alert_threshold"));
            }
        }
        Ok(())
    }

    pub fn reading(&self) -> DeviceReading {
        DeviceReading {
            temperature: self.temperature,
            pressure: self.pressure,
            cpu_usage: self.cpu_usage,
        }
    }
}

/// The three raw sensor values of one event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceReading {
    pub temperature: f64,
    pub pressure: f64,
    pub cpu_usage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub temperature: f64,
    pub pressure: f64,
    pub cpu_usage: f64,
    pub risk: f64,
}

/// Per-device state: bounded history (oldest first) and the last risk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub history: Vec<HistoryEntry>,
    pub last_risk: f64,
}

/// A ranked document returned by the search backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceDocument {
    pub title: String,
    pub snippet: String,
    pub source: String,
    pub score: f64,
}

/// Output of the predict stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub device_id: String,
    pub risk: f64,
    pub previous_risk: f64,
    pub rationale: String,
    pub failure_modes: Vec<String>,
    pub history_length: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_field_names_with_defaults() {
        let evt = TelemetryEvent::from_json(
            br#"{"deviceId":"pump-17","Temperature":92.0,"Pressure":8.2,"CPU_Usage":88.0}"#,
        )
        .unwrap();
        assert_eq!(evt.device_id, "pump-17");
        assert_eq!(evt.cpu_usage, 88.0);
        assert_eq!(evt.top_k, None);
        assert_eq!(evt.alert_threshold, None);
    }

    #[test]
    fn parses_optional_knobs() {
        let evt = TelemetryEvent::from_json(
            br#"{"deviceId":"p","Temperature":1,"Pressure":2,"CPU_Usage":3,"topK":5,"alert_threshold":0.5}"#,
        )
        .unwrap();
        assert_eq!(evt.top_k, Some(5));
        assert_eq!(evt.alert_threshold, Some(0.5));
    }

    #[test]
    fn missing_reading_is_malformed() {
        let err = TelemetryEvent::from_json(br#"{"deviceId":"p","Temperature":1,"Pressure":2}"#)
            .unwrap_err();
        assert!(matches!(err, InputError::Malformed(_)));
    }

    #[test]
    fn rejects_blank_device_and_zero_top_k() {
        let mut evt = TelemetryEvent::new("  ", 1.0, 1.0, 1.0);
        assert!(matches!(evt.validate(), Err(InputError::MissingDeviceId)));

        evt.device_id = "pump-1".into();
        evt.top_k = Some(0);
        assert!(matches!(evt.validate(), Err(InputError::InvalidTopK)));
    }

    #[test]
    fn evidence_fields_default_to_empty() {
        let doc: EvidenceDocument = serde_json::from_str(r#"{"title":"Bearing guide"}"#).unwrap();
        assert_eq!(doc.title, "Bearing guide");
        assert!(doc.snippet.is_empty());
        assert!(doc.source.is_empty());
        assert_eq!(doc.score, 0.0);
    }
}
