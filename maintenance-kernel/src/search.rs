//! Search backend seam.
//!
//! `SearchBackend` is what the evidence retriever talks to. The production
//! implementation speaks the Azure AI Search REST API; tests plug in their
//! own implementations or point `AzureSearchClient` at the devkit stub.

use crate::config::SearchConf;
use crate::error::SearchError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// One raw hit, before snippet truncation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub content: String,
    pub source: String,
    pub score: f64,
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run a simple free-text query; hits come back in relevance order.
    async fn search(&self, query: &str, top: usize) -> Result<Vec<SearchHit>, SearchError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "@search.score", default)]
    score: Option<f64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    chunk: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

impl From<RawHit> for SearchHit {
    fn from(raw: RawHit) -> Self {
        // `content` wins unless empty, then `chunk`
        let content = raw
            .content
            .filter(|c| !c.is_empty())
            .or(raw.chunk)
            .unwrap_or_default();
        SearchHit {
            title: raw.title.unwrap_or_default(),
            content,
            source: raw.source.unwrap_or_default(),
            score: raw.score.unwrap_or(0.0),
        }
    }
}

/// Azure AI Search REST client. Credentials are checked on each call, so a
/// missing key only fails the runs that actually need evidence.
#[derive(Clone)]
pub struct AzureSearchClient {
    conf: SearchConf,
    http: reqwest::Client,
}

impl AzureSearchClient {
    pub fn new(conf: SearchConf) -> Self {
        Self { conf, http: reqwest::Client::new() }
    }

    /// `POST {endpoint}/indexes/{index}/docs/search?api-version=...`
    pub fn search_url(&self) -> Result<String, SearchError> {
        let missing = self.conf.missing();
        if !missing.is_empty() {
            return Err(SearchError::Configuration(missing.join(", ")));
        }
        let endpoint = match self.conf.endpoint.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!(
                "https://{}.search.windows.net",
                self.conf.service.as_deref().unwrap_or_default().trim()
            ),
        };
        let index = self.conf.index.as_deref().unwrap_or_default().trim();
        Ok(format!(
            "{endpoint}/indexes/{index}/docs/search?api-version={}",
            self.conf.api_version
        ))
    }
}

#[async_trait]
impl SearchBackend for AzureSearchClient {
    async fn search(&self, query: &str, top: usize) -> Result<Vec<SearchHit>, SearchError> {
        let url = self.search_url()?;
        let api_key = self.conf.api_key.as_deref().unwrap_or_default();

        let response = self
            .http
            .post(&url)
            .header("api-key", api_key)
            .json(&json!({ "search": query, "top": top, "queryType": "simple" }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status { status: status.as_u16(), body });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;
        debug!("[search] {} hits for '{query}'", parsed.value.len());
        Ok(parsed.value.into_iter().map(SearchHit::from).collect())
    }
}
