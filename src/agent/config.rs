use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::descriptor::{AgentCatalog, AgentDescriptor};

/// Gateway configuration (`gateway` section of config.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL the function names are appended to
    pub base_url: String,
    /// Request timeout in seconds. None keeps the HTTP client default.
    pub timeout_secs: Option<u64>,
    /// Deployment stage, replaces the `-prod` suffix of default function names
    pub stage: String,
    /// Function name overrides keyed by agent name (VERA, ..., Sophie)
    pub functions: HashMap<String, String>,
    /// Where TPP exports are written
    pub export_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000/functions".into(),
            timeout_secs: None,
            stage: "prod".into(),
            functions: HashMap::new(),
            export_dir: None,
        }
    }
}

impl GatewayConfig {
    /// Load from `<config_dir>/config.json`, defaults if missing
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join("config.json");
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .context("Failed to read config.json")?;
            let config: serde_json::Value = serde_json::from_str(&content)
                .context("Failed to parse config.json")?;

            if let Some(gateway) = config.get("gateway") {
                return serde_json::from_value(gateway.clone())
                    .context("Failed to parse gateway config");
            }
        }
        Ok(Self::default())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Function name for a descriptor, after stage and overrides
    pub fn function_for(&self, descriptor: &AgentDescriptor) -> String {
        if let Some(name) = self.functions.get(&descriptor.name) {
            return name.clone();
        }
        match descriptor.function.strip_suffix("-prod") {
            Some(stem) => format!("{}-{}", stem, self.stage),
            None => descriptor.function.clone(),
        }
    }

    /// Catalog with function names resolved through this config
    pub fn catalog(&self) -> AgentCatalog {
        AgentCatalog::with_functions(|d| self.function_for(d))
    }

    /// Export directory: configured, else the download dir, else the working dir
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    use crate::agent::AgentId;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.stage, "prod");
        assert!(config.timeout().is_none());
        assert!(config.functions.is_empty());
    }

    #[test]
    fn test_load_returns_default_when_no_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = GatewayConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.base_url, GatewayConfig::default().base_url);
    }

    #[test]
    fn test_load_from_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_json = r#"{
            "gateway": {
                "base_url": "https://agents.example.com/",
                "timeout_secs": 90,
                "stage": "dev",
                "functions": { "FINN": "finn-canary" }
            }
        }"#;
        std::fs::write(temp_dir.path().join("config.json"), config_json).unwrap();

        let config = GatewayConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.base_url, "https://agents.example.com/");
        assert_eq!(config.timeout(), Some(Duration::from_secs(90)));

        let catalog = config.catalog();
        assert_eq!(catalog.agent(AgentId::Vera).function, "SocratIQ-VERA-Agent-dev");
        assert_eq!(catalog.agent(AgentId::Finn).function, "finn-canary");
        assert_eq!(catalog.orchestrator().function, "SocratIQ-Sophie-Orchestrator-dev");
    }

    #[test]
    fn test_load_without_gateway_section() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("config.json"), r#"{"other": 1}"#).unwrap();
        let config = GatewayConfig::load(temp_dir.path()).unwrap();
        assert_eq!(config.stage, "prod");
    }

    #[test]
    fn test_load_error_on_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("config.json"), "{ nope").unwrap();
        assert!(GatewayConfig::load(temp_dir.path()).is_err());
    }

    #[test]
    fn test_export_dir_prefers_configured() {
        let config = GatewayConfig {
            export_dir: Some(PathBuf::from("/tmp/tpp")),
            ..Default::default()
        };
        assert_eq!(config.export_dir(), PathBuf::from("/tmp/tpp"));
    }
}
