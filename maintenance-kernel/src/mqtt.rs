use crate::config::MqttConf;
use crate::coordinator::{Coordinator, RunOutcome};
use crate::models::TelemetryEvent;
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tracing::{error, info, warn};

pub const TELEMETRY_TOPIC: &str = "maintenance/telemetry@v1";
pub const ALERTS_TOPIC: &str = "maintenance/alerts@v1";
pub const REPORTS_TOPIC: &str = "maintenance/reports@v1";

pub fn create_mqtt_client(conf: &MqttConf, client_id: &str) -> (AsyncClient, EventLoop) {
    let mut opts = MqttOptions::new(client_id, &conf.host, conf.port);
    opts.set_keep_alive(Duration::from_secs(15));
    AsyncClient::new(opts, 10)
}

pub fn alert_payload(outcome: &RunOutcome) -> Value {
    json!({
        "run_id": outcome.run_id,
        "status": outcome.alert.status,
        "device_id": outcome.alert.device_id,
        "risk": outcome.alert.risk,
        "threshold": outcome.alert.threshold,
    })
}

pub fn report_payload(outcome: &RunOutcome) -> Value {
    json!({
        "run_id": outcome.run_id,
        "device_id": outcome.assessment.device_id,
        "risk": outcome.assessment.risk,
        "retrieval_error": outcome.retrieval_error,
        "report": outcome.report,
    })
}

pub async fn publish_outcome(client: &AsyncClient, outcome: &RunOutcome) -> anyhow::Result<()> {
    client
        .publish(ALERTS_TOPIC, QoS::AtLeastOnce, false, alert_payload(outcome).to_string())
        .await?;
    client
        .publish(REPORTS_TOPIC, QoS::AtLeastOnce, false, report_payload(outcome).to_string())
        .await?;
    Ok(())
}

/// Consumes telemetry events from the broker; each one runs in its own task
/// and its alert and report are published back.
pub fn spawn_mqtt_listener(coordinator: Coordinator, conf: MqttConf) -> JoinHandle<()> {
    task::spawn(async move {
        let (client, mut eventloop) = create_mqtt_client(&conf, "maintenance-kernel");
        let health = coordinator.health().clone();
        health.set_mqtt_status("connecting");

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    // clean session: subscribe again after every (re)connect
                    if let Err(e) = client.try_subscribe(TELEMETRY_TOPIC, QoS::AtLeastOnce) {
                        error!("[mqtt] subscribe failed: {e:?}");
                    }
                    health.set_mqtt_status("connected");
                    info!("[mqtt] connected to {}:{}", conf.host, conf.port);
                }
                Ok(Event::Incoming(Incoming::Publish(p))) if p.topic == TELEMETRY_TOPIC => {
                    let event = match TelemetryEvent::from_json(&p.payload) {
                        Ok(event) => event,
                        Err(e) => {
                            warn!("[mqtt] rejected telemetry payload: {e}");
                            continue;
                        }
                    };
                    let coordinator = coordinator.clone();
                    let client = client.clone();
                    task::spawn(async move {
                        match coordinator.run(&event).await {
                            Ok(outcome) => {
                                if let Err(e) = publish_outcome(&client, &outcome).await {
                                    error!("[mqtt] failed to publish outcome: {e}");
                                }
                            }
                            Err(e) => error!("[mqtt] run for {} failed: {e}", event.device_id),
                        }
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("[mqtt] connection error: {e:?}");
                    health.set_mqtt_status("reconnecting");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    })
}
