/**
 * MAINTENANCE KERNEL - Entry point
 *
 * MODES :
 * - `serve` (default) : HTTP API + optional MQTT telemetry listener
 * - `run [--csv PATH]` : one coordinator run, report printed on stdout.
 *   The event comes from the CSV history (flag or CSV_PATH) or the sample
 *   pump-17 reading.
 */

use anyhow::{bail, Context, Result};
use maintenance_kernel::config::{load_config, MaintenanceConfig};
use maintenance_kernel::coordinator::Coordinator;
use maintenance_kernel::csv_events::last_row_event;
use maintenance_kernel::http::{build_router, AppState};
use maintenance_kernel::models::TelemetryEvent;
use maintenance_kernel::retriever::EvidenceRetriever;
use maintenance_kernel::search::AzureSearchClient;
use maintenance_kernel::state::DeviceStore;
use maintenance_kernel::mqtt;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // optional .env
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = load_config().await;
    let missing = cfg.missing_search_settings();
    if !missing.is_empty() {
        warn!("[kernel] {} missing, evidence retrieval will fail", missing.join(", "));
    }
    let coordinator = build_coordinator(&cfg);

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None | Some("serve") => serve(cfg, coordinator).await,
        Some("run") => {
            let csv = match (args.next().as_deref(), args.next()) {
                (Some("--csv"), Some(path)) => Some(path),
                (None, _) => cfg.csv_path.clone(),
                _ => bail!("usage: maintenance-kernel run [--csv PATH]"),
            };
            run_once(&coordinator, csv).await
        }
        Some(other) => bail!("unknown command '{other}' (expected serve or run)"),
    }
}

fn build_coordinator(cfg: &MaintenanceConfig) -> Coordinator {
    let backend = Arc::new(AzureSearchClient::new(cfg.search.clone()));
    let retriever = EvidenceRetriever::from_conf(backend, &cfg.search);
    Coordinator::new(DeviceStore::new(), retriever, cfg.pipeline.clone())
}

fn sample_event() -> TelemetryEvent {
    let mut event = TelemetryEvent::new("pump-17", 92.0, 8.2, 88.0);
    event.top_k = Some(3);
    event.alert_threshold = Some(0.7);
    event
}

async fn run_once(coordinator: &Coordinator, csv: Option<String>) -> Result<()> {
    let event = match csv {
        Some(path) => last_row_event(&path).with_context(|| format!("reading {path}"))?,
        None => sample_event(),
    };
    info!("[kernel] event: {}", serde_json::to_string(&event)?);

    let outcome = coordinator.run(&event).await?;
    println!("{}", outcome.report);
    Ok(())
}

async fn serve(cfg: MaintenanceConfig, coordinator: Coordinator) -> Result<()> {
    let api_key = std::env::var("MAINTENANCE_API_KEY").ok();
    if api_key.as_deref().unwrap_or("").is_empty() {
        warn!("[kernel] MAINTENANCE_API_KEY not set, API is open");
    }

    if let Some(mqtt_conf) = cfg.mqtt.clone() {
        mqtt::spawn_mqtt_listener(coordinator.clone(), mqtt_conf);
    }

    let app = build_router(AppState::new(coordinator, api_key));
    let listener = TcpListener::bind(&cfg.http.bind)
        .await
        .with_context(|| format!("binding {}", cfg.http.bind))?;
    info!("[kernel] listening on http://{}", cfg.http.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
