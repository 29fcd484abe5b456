//! Smart maintenance kernel.
//!
//! One telemetry event goes through a fixed pipeline: risk scoring and
//! recording ([`state`], [`risk`]), threshold-gated evidence retrieval
//! ([`retriever`], [`search`]), a deterministic repair plan ([`plan`]), an
//! alert check ([`alert`]) and a final text report ([`coordinator`]).
//!
//! The surrounding modules carry the service around it: configuration,
//! the HTTP API, the MQTT listener, health counters and the CSV adapter.

pub mod alert;
pub mod config;
pub mod coordinator;
pub mod csv_events;
pub mod document;
pub mod error;
pub mod health;
pub mod http;
pub mod models;
pub mod mqtt;
pub mod plan;
pub mod retriever;
pub mod risk;
pub mod search;
pub mod state;

pub use coordinator::{Coordinator, RunOutcome};
pub use error::MaintenanceError;
pub use models::TelemetryEvent;
