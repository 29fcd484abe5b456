/*!
Telemetry event builders

Fluent construction of inbound event payloads (wire field names) plus CSV
history fixtures for the tabular adapter.
*/

use serde_json::{json, Map, Value};

#[derive(Debug, Clone)]
pub struct EventBuilder {
    payload: Map<String, Value>,
}

impl EventBuilder {
    /// Nominal reading for `device_id`: every sensor under its limit.
    pub fn new(device_id: &str) -> Self {
        let mut payload = Map::new();
        payload.insert("deviceId".into(), json!(device_id));
        payload.insert("Temperature".into(), json!(50.0));
        payload.insert("Pressure".into(), json!(2.0));
        payload.insert("CPU_Usage".into(), json!(10.0));
        Self { payload }
    }

    /// pump-17 at 92 °C / 8.2 / 88 % CPU
    pub fn high_risk() -> Self {
        Self::new("pump-17").temperature(92.0).pressure(8.2).cpu(88.0)
    }

    /// pump-1 at 50 °C / 2.0 / 10 % CPU
    pub fn nominal() -> Self {
        Self::new("pump-1")
    }

    pub fn temperature(self, value: f64) -> Self {
        self.set("Temperature", json!(value))
    }

    pub fn pressure(self, value: f64) -> Self {
        self.set("Pressure", json!(value))
    }

    pub fn cpu(self, value: f64) -> Self {
        self.set("CPU_Usage", json!(value))
    }

    pub fn top_k(self, value: i64) -> Self {
        self.set("topK", json!(value))
    }

    pub fn threshold(self, value: f64) -> Self {
        self.set("alert_threshold", json!(value))
    }

    /// Drop a field, to build malformed events.
    pub fn without(mut self, field: &str) -> Self {
        self.payload.remove(field);
        self
    }

    pub fn set(mut self, field: &str, value: Value) -> Self {
        self.payload.insert(field.to_string(), value);
        self
    }

    pub fn build(&self) -> Value {
        Value::Object(self.payload.clone())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.build().to_string().into_bytes()
    }
}

/// CSV history text: `(device, timestamp, temperature, pressure, cpu)` rows.
pub fn history_csv(rows: &[(&str, &str, f64, f64, f64)]) -> String {
    let mut out = String::from("DeviceID,Timestamp,Temperature,Pressure,CPU_Usage\n");
    for (device, ts, t, p, c) in rows {
        out.push_str(&format!("{device},{ts},{t},{p},{c}\n"));
    }
    out
}
