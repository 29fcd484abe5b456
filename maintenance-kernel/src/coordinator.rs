/**
 * COORDINATOR - Fixed five-stage pipeline per telemetry event
 *
 * ROLE : runs one event through predict -> (gated) retrieve -> plan -> alert
 * -> report, and hands back the report with its structured parts.
 *
 * ORDER :
 * 1. score + record        (committed before any await: cancelling or
 *                           failing later stages never rolls it back)
 * 2. retrieve if risk >= threshold, else empty evidence
 * 3. compose the repair plan
 * 4. evaluate the alert with the same risk and threshold
 * 5. assemble the report
 *
 * RETRIEVAL FAILURE : `pipeline.on_retrieval_error` decides between
 * degrading to empty evidence (default) and aborting the run.
 */

use crate::alert::{self, AlertResult};
use crate::config::{PipelineConf, RetrievalFailurePolicy};
use crate::document::{fmt_number, Document, Section};
use crate::error::MaintenanceError;
use crate::health::HealthTracker;
use crate::models::{EvidenceDocument, RiskAssessment, TelemetryEvent};
use crate::plan::{self, evidence_bullets, RepairPlan};
use crate::retriever::{build_query, EvidenceRetriever, SNIPPET_MAX_CHARS};
use crate::risk;
use crate::state::DeviceStore;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Everything one run produced; `report` is the rendered text.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub assessment: RiskAssessment,
    pub threshold: f64,
    pub top_k: usize,
    pub retrieval_attempted: bool,
    pub retrieval_error: Option<String>,
    pub evidence: Vec<EvidenceDocument>,
    pub eta_hours: f64,
    pub alert: AlertResult,
    pub report: String,
}

#[derive(Clone)]
pub struct Coordinator {
    store: DeviceStore,
    retriever: EvidenceRetriever,
    pipeline: PipelineConf,
    health: HealthTracker,
}

impl Coordinator {
    pub fn new(store: DeviceStore, retriever: EvidenceRetriever, pipeline: PipelineConf) -> Self {
        Self { store, retriever, pipeline, health: HealthTracker::new() }
    }

    pub fn store(&self) -> &DeviceStore {
        &self.store
    }

    pub fn health(&self) -> &HealthTracker {
        &self.health
    }

    /// Stage 1: score the reading and record it.
    pub fn predict(&self, event: &TelemetryEvent) -> RiskAssessment {
        let reading = event.reading();
        let risk = risk::score_reading(&reading);
        let (previous_risk, history_length) = self.store.record_and_previous(&event.device_id, reading, risk);
        let assessment = RiskAssessment {
            device_id: event.device_id.clone(),
            risk,
            previous_risk,
            rationale: risk::rationale(previous_risk, risk, &reading),
            failure_modes: risk::failure_modes(),
            history_length,
        };
        info!(
            "[predict] device={} risk={} prev={} history={}",
            assessment.device_id, assessment.risk, assessment.previous_risk, assessment.history_length
        );
        assessment
    }

    pub async fn run(&self, event: &TelemetryEvent) -> Result<RunOutcome, MaintenanceError> {
        event.validate()?;
        let threshold = event.alert_threshold.unwrap_or(self.pipeline.alert_threshold);
        let top_k = event.top_k.unwrap_or(self.pipeline.top_k).max(1);

        let assessment = self.predict(event);

        let retrieval_attempted = assessment.risk >= threshold;
        let mut retrieval_error = None;
        let evidence = if retrieval_attempted {
            let query = build_query(&assessment.failure_modes, event.pressure, event.temperature);
            match self.retriever.retrieve(&query, top_k).await {
                Ok(docs) => docs,
                Err(err) => {
                    self.health.record_retrieval_failure();
                    if self.pipeline.on_retrieval_error == RetrievalFailurePolicy::Abort {
                        return Err(err.into());
                    }
                    if err.is_configuration() {
                        warn!("[retrieve] {} search backend not configured, continuing without evidence", event.device_id);
                    } else {
                        warn!("[retrieve] {} continuing without evidence: {err}", event.device_id);
                    }
                    retrieval_error = Some(err.to_string());
                    Vec::new()
                }
            }
        } else {
            debug!("[retrieve] skipped, risk {} < threshold {threshold}", assessment.risk);
            Vec::new()
        };

        let plan = plan::compose(&event.device_id, assessment.risk, &assessment.failure_modes, &evidence);
        info!("[plan] {} ok", event.device_id);

        let alert = alert::evaluate(&event.device_id, assessment.risk, threshold);
        info!("[alert] {} {} (risk {}, threshold {threshold})", alert.device_id, alert.status, alert.risk);

        let report = compose_report(&assessment, &evidence, retrieval_error.as_deref(), &plan, &alert).to_string();
        self.health.record_run(alert.is_triggered());

        Ok(RunOutcome {
            run_id: Uuid::new_v4(),
            generated_at: OffsetDateTime::now_utc(),
            assessment,
            threshold,
            top_k,
            retrieval_attempted,
            retrieval_error,
            evidence,
            eta_hours: plan.eta_hours,
            alert,
            report,
        })
    }
}

/// Final report. Its evidence section lists every retrieved document with the
/// full (already 500-char) snippet, in the same line format as the plan.
pub fn compose_report(
    assessment: &RiskAssessment,
    evidence: &[EvidenceDocument],
    retrieval_error: Option<&str>,
    plan: &RepairPlan,
    alert: &AlertResult,
) -> Document {
    let mut evidence_lines = evidence_bullets(evidence, None, SNIPPET_MAX_CHARS);
    if let Some(err) = retrieval_error {
        evidence_lines.push(format!("Evidence retrieval unavailable: {err}"));
    }

    Document::new(format!("Smart Maintenance Report — {}", assessment.device_id))
        .with_section(Section::bullets(
            "Risk & Rationale",
            vec![
                format!("Risk score: **{}**", fmt_number(assessment.risk)),
                format!("Rationale: {}", assessment.rationale),
            ],
        ))
        .with_section(Section::bullets("Failure Modes", assessment.failure_modes.clone()))
        .with_section(Section::bullets("Evidence (summary)", evidence_lines))
        .with_section(Section::paragraph("Repair Plan", plan.to_string()))
        .with_section(Section::bullets(
            "Alert Status",
            vec![format!("{} (threshold: {})", alert.status, fmt_number(alert.threshold))],
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SectionBody;
    use crate::error::{RetrievalError, SearchError};
    use crate::search::{SearchBackend, SearchHit};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct Recording {
        queries: Mutex<Vec<(String, usize)>>,
        fail: bool,
    }

    #[async_trait]
    impl SearchBackend for Recording {
        async fn search(&self, query: &str, top: usize) -> Result<Vec<SearchHit>, SearchError> {
            self.queries.lock().push((query.to_string(), top));
            if self.fail {
                return Err(SearchError::Status { status: 503, body: "down".into() });
            }
            Ok(vec![SearchHit {
                title: "Pump bearing guide".into(),
                content: "Replace bearings when vibration exceeds baseline.".into(),
                source: "manuals/pump.pdf".into(),
                score: 3.2,
            }])
        }
    }

    struct Hanging;

    #[async_trait]
    impl SearchBackend for Hanging {
        async fn search(&self, _query: &str, _top: usize) -> Result<Vec<SearchHit>, SearchError> {
            std::future::pending().await
        }
    }

    fn coordinator(backend: Arc<Recording>, policy: RetrievalFailurePolicy) -> Coordinator {
        let retriever = EvidenceRetriever::new(backend, 2, Duration::from_secs(5));
        let pipeline = PipelineConf { on_retrieval_error: policy, ..PipelineConf::default() };
        Coordinator::new(DeviceStore::new(), retriever, pipeline)
    }

    #[tokio::test]
    async fn high_risk_run_retrieves_and_triggers() {
        let backend = Arc::new(Recording::default());
        let coord = coordinator(backend.clone(), RetrievalFailurePolicy::Degrade);
        let out = coord.run(&TelemetryEvent::new("pump-17", 92.0, 8.2, 88.0)).await.unwrap();

        assert_eq!(out.assessment.risk, 0.7);
        assert!(out.retrieval_attempted);
        assert!(out.alert.is_triggered());
        assert_eq!(out.eta_hours, 3.5);
        assert_eq!(
            backend.queries.lock().as_slice(),
            &[(
                "overheating bearing wear misalignment pump maintenance pressure:8.2 temperature:92.0".to_string(),
                3
            )]
        );
        assert!(out.report.contains("- Pump bearing guide: Replace bearings when vibration exceeds baseline. [manuals/pump.pdf]"));
        assert!(out.report.ends_with("## Alert Status\n- TRIGGERED (threshold: 0.7)"));
    }

    #[tokio::test]
    async fn low_risk_run_never_calls_the_backend() {
        let backend = Arc::new(Recording::default());
        let coord = coordinator(backend.clone(), RetrievalFailurePolicy::Degrade);
        let out = coord.run(&TelemetryEvent::new("pump-1", 50.0, 2.0, 10.0)).await.unwrap();

        assert_eq!(out.assessment.risk, 0.0);
        assert!(!out.retrieval_attempted);
        assert!(backend.queries.lock().is_empty());
        assert_eq!(out.alert.status, alert::AlertStatus::NoAlert);
        assert_eq!(out.eta_hours, 2.0);
        assert_eq!(out.report.matches("- No external evidence referenced in this run.").count(), 2);
    }

    #[tokio::test]
    async fn event_threshold_gates_retrieval_but_not_eta() {
        let backend = Arc::new(Recording::default());
        let coord = coordinator(backend.clone(), RetrievalFailurePolicy::Degrade);
        let mut event = TelemetryEvent::new("fan-3", 90.0, 1.0, 1.0);
        event.alert_threshold = Some(0.4);
        event.top_k = Some(5);
        let out = coord.run(&event).await.unwrap();

        assert_eq!(out.assessment.risk, 0.4);
        assert!(out.alert.is_triggered());
        assert_eq!(backend.queries.lock()[0].1, 5);
        assert_eq!(out.eta_hours, 2.0);
    }

    #[tokio::test]
    async fn degrade_policy_keeps_going() {
        let backend = Arc::new(Recording { fail: true, ..Recording::default() });
        let coord = coordinator(backend, RetrievalFailurePolicy::Degrade);
        let out = coord.run(&TelemetryEvent::new("pump-17", 92.0, 8.2, 88.0)).await.unwrap();

        assert!(out.evidence.is_empty());
        assert!(out.retrieval_error.as_deref().unwrap().contains("503"));
        assert!(out.report.contains("- Evidence retrieval unavailable:"));
        assert!(out.alert.is_triggered());
        assert_eq!(coord.health().snapshot(coord.store()).retrieval_failures, 1);
    }

    #[tokio::test]
    async fn abort_policy_fails_but_keeps_the_recorded_reading() {
        let backend = Arc::new(Recording { fail: true, ..Recording::default() });
        let coord = coordinator(backend, RetrievalFailurePolicy::Abort);
        let err = coord.run(&TelemetryEvent::new("pump-17", 92.0, 8.2, 88.0)).await.unwrap_err();

        assert!(matches!(err, MaintenanceError::Retrieval(RetrievalError::Search(_))));
        let rec = coord.store().read_last("pump-17");
        assert_eq!(rec.history.len(), 1);
        assert_eq!(rec.last_risk, 0.7);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_run_keeps_the_recorded_reading() {
        let retriever = EvidenceRetriever::new(Arc::new(Hanging), 1, Duration::from_secs(30));
        let coord = Coordinator::new(DeviceStore::new(), retriever, PipelineConf::default());

        let cancelled =
            tokio::time::timeout(Duration::from_secs(1), coord.run(&TelemetryEvent::new("pump-17", 92.0, 8.2, 88.0)))
                .await;

        assert!(cancelled.is_err());
        let rec = coord.store().read_last("pump-17");
        assert_eq!(rec.history.len(), 1);
        assert_eq!(rec.last_risk, 0.7);
        assert_eq!(coord.health().snapshot(coord.store()).runs_total, 0);
    }

    #[tokio::test]
    async fn rationale_carries_previous_risk() {
        let backend = Arc::new(Recording::default());
        let coord = coordinator(backend, RetrievalFailurePolicy::Degrade);
        coord.run(&TelemetryEvent::new("pump-17", 92.0, 8.2, 88.0)).await.unwrap();
        let out = coord.run(&TelemetryEvent::new("pump-17", 50.0, 2.0, 10.0)).await.unwrap();

        assert_eq!(out.assessment.previous_risk, 0.7);
        assert_eq!(out.assessment.history_length, 2);
        assert!(out.report.contains("Prev risk=0.70, Now=0.00 (T=50.0°C, P=2.0, CPU=10.0%)"));
    }

    #[tokio::test]
    async fn invalid_event_is_rejected_before_recording() {
        let backend = Arc::new(Recording::default());
        let coord = coordinator(backend, RetrievalFailurePolicy::Degrade);
        let err = coord.run(&TelemetryEvent::new("", 92.0, 8.2, 88.0)).await.unwrap_err();
        assert!(matches!(err, MaintenanceError::Input(_)));
        assert!(coord.store().is_empty());
    }

    #[test]
    fn report_sections_are_in_contract_order() {
        let assessment = RiskAssessment {
            device_id: "pump-1".into(),
            risk: 0.0,
            previous_risk: 0.0,
            rationale: "r".into(),
            failure_modes: risk::failure_modes(),
            history_length: 1,
        };
        let plan = plan::compose("pump-1", 0.0, &assessment.failure_modes, &[]);
        let alert = alert::evaluate("pump-1", 0.0, 0.7);
        let doc = compose_report(&assessment, &[], None, &plan, &alert);
        let titles: Vec<&str> = doc.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            ["Risk & Rationale", "Failure Modes", "Evidence (summary)", "Repair Plan", "Alert Status"]
        );
        assert!(doc.to_string().starts_with("# Smart Maintenance Report — pump-1\n## Risk & Rationale\n- Risk score: **0.0**"));
        assert_eq!(
            doc.section("Alert Status").map(|s| &s.body),
            Some(&SectionBody::Bullets(vec!["NO_ALERT (threshold: 0.7)".to_string()]))
        );
        assert!(doc.section("ETA (hours)").is_none());
    }
}
