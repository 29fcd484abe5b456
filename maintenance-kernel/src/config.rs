use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::warn;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub search: SearchConf,
    pub pipeline: PipelineConf,
    pub mqtt: Option<MqttConf>,
    pub http: HttpConf,
    pub csv_path: Option<String>,
}

/// Azure AI Search connection. `endpoint` overrides the URL derived from
/// `service` (used against local stubs).
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConf {
    pub service: Option<String>,
    pub index: Option<String>,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub api_version: String,
    pub timeout_secs: u64,
    pub max_concurrent: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PipelineConf {
    pub alert_threshold: f64,
    pub top_k: usize,
    pub on_retrieval_error: RetrievalFailurePolicy,
}

/// What a run does when evidence retrieval fails.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalFailurePolicy {
    /// continue with empty evidence, keep the error in the outcome
    #[default]
    Degrade,
    /// fail the whole run
    Abort,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MqttConf {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConf {
    pub bind: String,
}

pub const DEFAULT_ALERT_THRESHOLD: f64 = 0.7;
pub const DEFAULT_TOP_K: usize = 3;

impl Default for SearchConf {
    fn default() -> Self {
        Self {
            service: None,
            index: None,
            api_key: None,
            endpoint: None,
            api_version: "2023-11-01".into(),
            timeout_secs: 10,
            max_concurrent: 4,
        }
    }
}

impl Default for PipelineConf {
    fn default() -> Self {
        Self {
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            top_k: DEFAULT_TOP_K,
            on_retrieval_error: RetrievalFailurePolicy::default(),
        }
    }
}

impl Default for HttpConf {
    fn default() -> Self {
        Self { bind: "0.0.0.0:8080".into() }
    }
}

impl SearchConf {
    /// Names of the settings that still prevent a search call.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.service) && is_blank(&self.endpoint) {
            missing.push("AZURE_SEARCH_SERVICE");
        }
        if is_blank(&self.api_key) {
            missing.push("AZURE_SEARCH_API_KEY");
        }
        if is_blank(&self.index) {
            missing.push("AZURE_SEARCH_INDEX");
        }
        missing
    }
}

impl MaintenanceConfig {
    pub fn missing_search_settings(&self) -> Vec<&'static str> {
        self.search.missing()
    }

    /// Environment variables win over the YAML file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("AZURE_SEARCH_SERVICE") {
            self.search.service = Some(v);
        }
        if let Some(v) = get("AZURE_SEARCH_API_KEY") {
            self.search.api_key = Some(v);
        }
        if let Some(v) = get("AZURE_SEARCH_INDEX") {
            self.search.index = Some(v);
        }
        if let Some(v) = get("AZURE_SEARCH_ENDPOINT") {
            self.search.endpoint = Some(v);
        }
        if let Some(v) = get("CSV_PATH") {
            self.csv_path = Some(v);
        }
        if let Some(v) = get("MAINTENANCE_HTTP_BIND") {
            self.http.bind = v;
        }
    }

    pub fn from_yaml(txt: &str) -> Result<Self, serde_yaml::Error> {
        if txt.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(txt)
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or("").is_empty()
}

/// YAML file (`MAINTENANCE_CONFIG`, default `maintenance.yaml`) then env
/// overrides. A missing or invalid file falls back to defaults.
pub async fn load_config() -> MaintenanceConfig {
    let path = std::env::var("MAINTENANCE_CONFIG").unwrap_or_else(|_| "maintenance.yaml".into());
    let mut cfg = if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        MaintenanceConfig::from_yaml(&txt).unwrap_or_else(|e| {
            warn!("[config] invalid {path}: {e}");
            MaintenanceConfig::default()
        })
    } else {
        warn!("[config] no {path}, using defaults");
        MaintenanceConfig::default()
    };
    cfg.apply_env_overrides(|key| std::env::var(key).ok());
    cfg
}
