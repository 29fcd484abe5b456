/**
 * REPAIR PLAN - Deterministic maintenance procedure
 *
 * ROLE : pure composition of a repair plan from risk, failure modes and
 * whatever evidence was retrieved. No I/O, no branching on failure mode.
 *
 * Only two parts vary with the input:
 * - evidence summary : first PLAN_EVIDENCE_LIMIT documents, or a placeholder
 * - ETA              : 3.5 h when risk >= PLAN_ETA_RISK_CUTOFF, else 2.0 h
 *
 * The ETA cutoff is independent of the alert threshold used by the
 * coordinator, even though both default to 0.7.
 */

use crate::document::{fmt_number, truncate_chars, Document, Section};
use crate::models::EvidenceDocument;
use std::fmt;

pub const PLAN_EVIDENCE_LIMIT: usize = 3;
pub const PLAN_SNIPPET_CHARS: usize = 300;
pub const PLAN_ETA_RISK_CUTOFF: f64 = 0.7;
pub const ETA_HIGH_RISK_HOURS: f64 = 3.5;
pub const ETA_LOW_RISK_HOURS: f64 = 2.0;

pub const NO_EVIDENCE_LINE: &str = "No external evidence referenced in this run.";

pub const STEPS: [&str; 8] = [
    "Apply Lockout/Tagout (LOTO) per site procedure; verify zero energy state.",
    "Visually inspect housing, inlet/outlet, mounts for looseness or damage.",
    "Measure bearing temperature and vibration; compare with baseline limits.",
    "Check shaft alignment and coupling; re-align if out of tolerance.",
    "Lubricate/replace bearings per OEM spec if play/noise detected.",
    "Clear cooling passages and filters; verify ventilation/airflow.",
    "Run controlled test (10–15 min); record temp/pressure/vibration trends.",
    "Update CMMS, attach readings, and trend risk for the next 7 days.",
];

pub const PARTS: [&str; 4] = [
    "Bearing kit (per BOM)",
    "Coupling shims",
    "Approved grease/lubricant",
    "Cleaning kit / filters",
];

pub const SAFETY_NOTES: [&str; 3] = [
    "LOTO enforced; arc-flash PPE as required",
    "Eye/hand protection at all times",
    "Follow confined-space rules if applicable",
];

pub const ROLLBACK: &str = "Restore original alignment and settings; reassemble with prior shims; \
remove LOTO only after verification and sign-off.";

/// `{title or "Doc i"}: {snippet}[ [source]]`, shared by the plan and the report.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceLine {
    pub title: String,
    pub snippet: String,
    pub source: String,
}

impl EvidenceLine {
    /// `index` is 1-based; `snippet_chars` caps the snippet before trimming.
    pub fn from_document(index: usize, doc: &EvidenceDocument, snippet_chars: usize) -> Self {
        let title = if doc.title.is_empty() { format!("Doc {index}") } else { doc.title.clone() };
        Self {
            title,
            snippet: truncate_chars(&doc.snippet, snippet_chars).trim().to_string(),
            source: doc.source.clone(),
        }
    }
}

impl fmt::Display for EvidenceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.snippet)?;
        if !self.source.is_empty() {
            write!(f, " [{}]", self.source)?;
        }
        Ok(())
    }
}

/// Evidence bullets, or the placeholder when there is nothing to show.
pub fn evidence_bullets(evidence: &[EvidenceDocument], limit: Option<usize>, snippet_chars: usize) -> Vec<String> {
    let take = limit.unwrap_or(evidence.len());
    let lines: Vec<String> = evidence
        .iter()
        .take(take)
        .enumerate()
        .map(|(i, doc)| EvidenceLine::from_document(i + 1, doc, snippet_chars).to_string())
        .collect();
    if lines.is_empty() {
        vec![NO_EVIDENCE_LINE.to_string()]
    } else {
        lines
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepairPlan {
    pub device_id: String,
    pub risk: f64,
    pub failure_modes: Vec<String>,
    pub evidence: Vec<String>,
    pub eta_hours: f64,
}

pub fn eta_hours(risk: f64) -> f64 {
    if risk >= PLAN_ETA_RISK_CUTOFF {
        ETA_HIGH_RISK_HOURS
    } else {
        ETA_LOW_RISK_HOURS
    }
}

pub fn compose(device_id: &str, risk: f64, failure_modes: &[String], evidence: &[EvidenceDocument]) -> RepairPlan {
    RepairPlan {
        device_id: device_id.to_string(),
        risk,
        failure_modes: failure_modes.to_vec(),
        evidence: evidence_bullets(evidence, Some(PLAN_EVIDENCE_LIMIT), PLAN_SNIPPET_CHARS),
        eta_hours: eta_hours(risk),
    }
}

impl RepairPlan {
    pub fn to_document(&self) -> Document {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Document::new(format!("Repair Plan for {}", self.device_id))
            .with_preamble(format!(
                "Risk: {} | Failure modes: {}",
                fmt_number(self.risk),
                self.failure_modes.join(", ")
            ))
            .with_section(Section::bullets("Evidence (summary)", self.evidence.clone()))
            .with_section(Section::numbered("Steps", owned(&STEPS)))
            .with_section(Section::bullets("Parts/Materials", owned(&PARTS)))
            .with_section(Section::bullets("Safety", owned(&SAFETY_NOTES)))
            .with_section(Section::paragraph("ETA (hours)", fmt_number(self.eta_hours)))
            .with_section(Section::paragraph("Rollback", ROLLBACK))
    }
}

impl fmt::Display for RepairPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_document().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::failure_modes;

    fn doc(title: &str, snippet: &str, source: &str) -> EvidenceDocument {
        EvidenceDocument { title: title.into(), snippet: snippet.into(), source: source.into(), score: 1.0 }
    }

    fn numbered_steps(text: &str) -> Vec<String> {
        text.lines()
            .filter(|l| l.chars().next().is_some_and(|c| c.is_ascii_digit()) && l.contains(". "))
            .map(|l| l.to_string())
            .collect()
    }

    #[test]
    fn empty_evidence_renders_placeholder() {
        let text = compose("pump-1", 0.0, &failure_modes(), &[]).to_string();
        assert!(text.contains("## Evidence (summary)\n- No external evidence referenced in this run.\n## Steps"));
    }

    #[test]
    fn evidence_is_capped_titled_and_trimmed() {
        let long = format!("{}   tail", "y".repeat(298));
        let evidence = vec![
            doc("Bearing manual", "  grease interval  ", "kb/bearings"),
            doc("", &long, ""),
            doc("Alignment", "laser", "kb/align"),
            doc("Ignored", "fourth", "kb"),
        ];
        let plan = compose("pump-17", 0.7, &failure_modes(), &evidence);
        assert_eq!(plan.evidence.len(), 3);
        assert_eq!(plan.evidence[0], "Bearing manual: grease interval [kb/bearings]");
        assert_eq!(plan.evidence[1], format!("Doc 2: {}", "y".repeat(298)));
        assert_eq!(plan.evidence[2], "Alignment: laser [kb/align]");
        assert!(!plan.to_string().contains("Ignored"));
    }

    #[test]
    fn always_eight_steps_in_fixed_order() {
        for risk in [0.0, 0.5, 0.9] {
            let text = compose("d", risk, &failure_modes(), &[]).to_string();
            let steps = numbered_steps(&text);
            assert_eq!(steps.len(), 8);
            for (i, (line, step)) in steps.iter().zip(STEPS.iter()).enumerate() {
                assert_eq!(line, &format!("{}. {}", i + 1, step));
            }
            assert!(text.ends_with(&format!("## Rollback\n{ROLLBACK}")));
        }
    }

    #[test]
    fn eta_follows_its_own_cutoff() {
        assert_eq!(eta_hours(0.69), 2.0);
        assert_eq!(eta_hours(0.7), 3.5);
        assert!(compose("d", 0.9, &failure_modes(), &[]).to_string().contains("## ETA (hours)\n3.5"));
        assert!(compose("d", 0.6, &failure_modes(), &[]).to_string().contains("## ETA (hours)\n2.0"));
    }

    #[test]
    fn header_lists_risk_and_modes() {
        let text = compose("pump-17", 0.7, &failure_modes(), &[]).to_string();
        assert!(text.starts_with(
            "# Repair Plan for pump-17\nRisk: 0.7 | Failure modes: overheating, bearing wear, misalignment\n"
        ));
    }
}
