/**
 * EVIDENCE RETRIEVER - Supporting documents for high-risk readings
 *
 * ROLE : turns a failure-mode query into at most `top_k` evidence documents
 * from the search backend, in the backend's own ranking.
 *
 * OPERATION :
 * - build_query() : failure modes + literal pressure/temperature values
 * - a semaphore bounds concurrent outstanding backend calls
 * - every call runs under a timeout; a hang becomes RetrievalError::Timeout
 * - snippets are cut to SNIPPET_MAX_CHARS
 *
 * Gating (only when risk >= threshold) belongs to the coordinator.
 */

use crate::config::SearchConf;
use crate::document::{fmt_number, truncate_chars};
use crate::error::RetrievalError;
use crate::models::EvidenceDocument;
use crate::search::SearchBackend;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::info;

pub const SNIPPET_MAX_CHARS: usize = 500;

#[derive(Clone)]
pub struct EvidenceRetriever {
    backend: Arc<dyn SearchBackend>,
    limiter: Arc<Semaphore>,
    timeout: Duration,
}

impl EvidenceRetriever {
    pub fn new(backend: Arc<dyn SearchBackend>, max_concurrent: usize, timeout: Duration) -> Self {
        Self {
            backend,
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout,
        }
    }

    pub fn from_conf(backend: Arc<dyn SearchBackend>, conf: &SearchConf) -> Self {
        Self::new(backend, conf.max_concurrent, Duration::from_secs(conf.timeout_secs))
    }

    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<EvidenceDocument>, RetrievalError> {
        let top_k = top_k.max(1);
        let _permit = self.limiter.acquire().await.map_err(|_| RetrievalError::Closed)?;

        let hits = tokio::time::timeout(self.timeout, self.backend.search(query, top_k))
            .await
            .map_err(|_| RetrievalError::Timeout(self.timeout))??;

        let docs: Vec<EvidenceDocument> = hits
            .into_iter()
            .take(top_k)
            .map(|hit| EvidenceDocument {
                title: hit.title,
                snippet: truncate_chars(&hit.content, SNIPPET_MAX_CHARS),
                source: hit.source,
                score: hit.score,
            })
            .collect();
        info!("[retrieve] {} docs", docs.len());
        Ok(docs)
    }
}

/// `"overheating bearing wear misalignment pump maintenance pressure:8.2 temperature:92.0"`
pub fn build_query(failure_modes: &[String], pressure: f64, temperature: f64) -> String {
    format!(
        "{} pump maintenance pressure:{} temperature:{}",
        failure_modes.join(" "),
        fmt_number(pressure),
        fmt_number(temperature)
    )
}
