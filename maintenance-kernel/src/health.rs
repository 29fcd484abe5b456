use crate::state::{new_state, DeviceStore, Shared};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Serialize, Deserialize)]
pub struct KernelHealth {
    pub uptime_seconds: u64,
    pub devices_tracked: u32,
    pub runs_total: u64,
    pub alerts_triggered: u64,
    pub retrieval_failures: u64,
    pub memory_usage_mb: f32,
    pub mqtt_status: String,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    runs: Arc<AtomicU64>,
    alerts: Arc<AtomicU64>,
    retrieval_failures: Arc<AtomicU64>,
    mqtt_status: Shared<String>,
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            runs: Arc::new(AtomicU64::new(0)),
            alerts: Arc::new(AtomicU64::new(0)),
            retrieval_failures: Arc::new(AtomicU64::new(0)),
            mqtt_status: new_state("disabled".to_string()),
        }
    }

    pub fn record_run(&self, alert_triggered: bool) {
        self.runs.fetch_add(1, Ordering::Relaxed);
        if alert_triggered {
            self.alerts.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_retrieval_failure(&self) {
        self.retrieval_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_mqtt_status(&self, status: &str) {
        *self.mqtt_status.lock() = status.to_string();
    }

    pub fn snapshot(&self, store: &DeviceStore) -> KernelHealth {
        KernelHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            devices_tracked: store.len() as u32,
            runs_total: self.runs.load(Ordering::Relaxed),
            alerts_triggered: self.alerts.load(Ordering::Relaxed),
            retrieval_failures: self.retrieval_failures.load(Ordering::Relaxed),
            memory_usage_mb: get_memory_usage_mb(),
            mqtt_status: self.mqtt_status.lock().clone(),
        }
    }
}

fn get_memory_usage_mb() -> f32 {
    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if let Some(rest) = line.strip_prefix("VmRSS:") {
                    if let Some(kb) = rest.split_whitespace().next().and_then(|v| v.parse::<u64>().ok()) {
                        return kb as f32 / 1024.0;
                    }
                }
            }
        }
    }

    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeviceReading;

    #[test]
    fn counters_and_devices_show_up_in_snapshot() {
        let tracker = HealthTracker::new();
        let store = DeviceStore::new();
        store.record_reading("pump-1", DeviceReading { temperature: 1.0, pressure: 1.0, cpu_usage: 1.0 }, 0.0);

        tracker.record_run(true);
        tracker.record_run(false);
        tracker.record_retrieval_failure();
        tracker.set_mqtt_status("connected");

        let h = tracker.snapshot(&store);
        assert_eq!(h.devices_tracked, 1);
        assert_eq!(h.runs_total, 2);
        assert_eq!(h.alerts_triggered, 1);
        assert_eq!(h.retrieval_failures, 1);
        assert_eq!(h.mqtt_status, "connected");
    }
}
