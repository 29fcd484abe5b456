use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Triggered,
    NoAlert,
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlertStatus::Triggered => "TRIGGERED",
            AlertStatus::NoAlert => "NO_ALERT",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertResult {
    pub status: AlertStatus,
    pub device_id: String,
    pub risk: f64,
    pub threshold: f64,
}

impl AlertResult {
    pub fn is_triggered(&self) -> bool {
        self.status == AlertStatus::Triggered
    }
}

/// TRIGGERED iff `risk >= threshold` (inclusive).
pub fn evaluate(device_id: &str, risk: f64, threshold: f64) -> AlertResult {
    let status = if risk >= threshold { AlertStatus::Triggered } else { AlertStatus::NoAlert };
    AlertResult { status, device_id: device_id.to_string(), risk, threshold }
}
