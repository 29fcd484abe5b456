/**
 * DEVICE STATE STORE - Per-device bounded history
 *
 * ROLE : keeps, for every device seen since start-up, the most recent
 * readings with their risk and the last computed risk.
 *
 * OPERATION :
 * - Records are created lazily on the first reading, never removed
 * - append-then-truncate: history keeps at most HISTORY_CAPACITY entries (FIFO)
 * - one parking_lot mutex guards the whole map; critical sections never await
 *
 * No persistence: the store lives for the process lifetime.
 */

use crate::models::{DeviceRecord, DeviceReading, HistoryEntry};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Maximum number of history entries kept per device.
pub const HISTORY_CAPACITY: usize = 100;

pub type DevicesMap = HashMap<String, DeviceRecord>;

#[derive(Clone)]
pub struct DeviceStore {
    devices: Shared<DevicesMap>,
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self { devices: new_state(HashMap::new()) }
    }
}

impl DeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reading with its risk, then drop the oldest entries above capacity.
    pub fn record_reading(&self, device_id: &str, reading: DeviceReading, risk: f64) {
        let mut devices = self.devices.lock();
        append(devices.entry(device_id.to_string()).or_default(), reading, risk);
    }

    /// Snapshot of a device record, or the zero record when unknown.
    pub fn read_last(&self, device_id: &str) -> DeviceRecord {
        self.devices.lock().get(device_id).cloned().unwrap_or_default()
    }

    /// Read the previous risk and record the new reading under one lock.
    /// Returns `(previous_risk, history_length_after_append)`.
    pub fn record_and_previous(&self, device_id: &str, reading: DeviceReading, risk: f64) -> (f64, usize) {
        let mut devices = self.devices.lock();
        let record = devices.entry(device_id.to_string()).or_default();
        let previous = record.last_risk;
        append(record, reading, risk);
        (previous, record.history.len())
    }

    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.devices.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.devices.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn append(record: &mut DeviceRecord, reading: DeviceReading, risk: f64) {
    record.history.push(HistoryEntry {
        temperature: reading.temperature,
        pressure: reading.pressure,
        cpu_usage: reading.cpu_usage,
        risk,
    });
    if record.history.len() > HISTORY_CAPACITY {
        let excess = record.history.len() - HISTORY_CAPACITY;
        record.history.drain(..excess);
    }
    record.last_risk = risk;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(t: f64) -> DeviceReading {
        DeviceReading { temperature: t, pressure: 1.0, cpu_usage: 10.0 }
    }

    #[test]
    fn unknown_device_reads_as_zero_record() {
        let store = DeviceStore::new();
        let rec = store.read_last("ghost");
        assert!(rec.history.is_empty());
        assert_eq!(rec.last_risk, 0.0);
        assert!(store.is_empty());
    }

    #[test]
    fn history_is_capped_fifo() {
        let store = DeviceStore::new();
        for i in 0..101 {
            store.record_reading("pump-1", reading(i as f64), 0.0);
        }
        let rec = store.read_last("pump-1");
        assert_eq!(rec.history.len(), HISTORY_CAPACITY);
        assert_eq!(rec.history.first().unwrap().temperature, 1.0);
        assert_eq!(rec.history.last().unwrap().temperature, 100.0);
        assert!(rec.history.iter().all(|e| e.temperature != 0.0));
        assert!(rec.history.windows(2).all(|w| w[0].temperature < w[1].temperature));
    }

    #[test]
    fn last_risk_tracks_last_entry() {
        let store = DeviceStore::new();
        store.record_reading("pump-1", reading(90.0), 0.4);
        store.record_reading("pump-1", reading(50.0), 0.0);
        let rec = store.read_last("pump-1");
        assert_eq!(rec.last_risk, 0.0);
        assert_eq!(rec.history.last().unwrap().risk, rec.last_risk);
    }

    #[test]
    fn record_and_previous_returns_prior_risk() {
        let store = DeviceStore::new();
        assert_eq!(store.record_and_previous("a", reading(90.0), 0.4), (0.0, 1));
        assert_eq!(store.record_and_previous("a", reading(90.0), 0.7), (0.4, 2));
        assert_eq!(store.record_and_previous("b", reading(20.0), 0.0), (0.0, 1));
        assert_eq!(store.device_ids(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn concurrent_record_and_previous_forms_one_chain() {
        let store = DeviceStore::new();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    (0..20)
                        .map(|i| {
                            let risk = (t * 100 + i + 1) as f64;
                            let (previous, len) = store.record_and_previous("shared", reading(50.0), risk);
                            (len, previous, risk)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut calls: Vec<(usize, f64, f64)> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        calls.sort_by_key(|c| c.0);

        // every writer saw exactly the risk written just before it
        let lens: Vec<usize> = calls.iter().map(|c| c.0).collect();
        assert_eq!(lens, (1..=80).collect::<Vec<_>>());
        assert_eq!(calls[0].1, 0.0);
        for pair in calls.windows(2) {
            assert_eq!(pair[1].1, pair[0].2);
        }
        assert_eq!(store.read_last("shared").last_risk, calls[79].2);
    }

    #[test]
    fn concurrent_writers_keep_the_cap() {
        let store = DeviceStore::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.record_reading("shared", reading(i as f64), 0.2);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.read_last("shared").history.len(), HISTORY_CAPACITY);
    }
}
