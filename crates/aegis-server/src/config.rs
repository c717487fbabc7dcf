//! Server configuration
//!
//! Loaded once at startup from YAML or TOML (selected by extension) and
//! passed into the wiring; nothing reads configuration afterwards. The
//! provider API key is sourced from an environment variable, never the
//! file.

use aegis_audit::AuditConfig;
use aegis_cache::{TierOneConfig, TierTwoConfig};
use aegis_optimize::OptimizerConfig;
use aegis_pii::{CustomPattern, RedactorConfig};
use aegis_routing::RoutingStrategy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ListenConfig,

    #[serde(default)]
    pub pii: PiiConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub optimization: OptimizerConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub routing: RoutingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PiiConfig {
    #[serde(default)]
    pub detection: DetectionConfig,

    #[serde(default)]
    pub redaction: RedactorConfig,

    #[serde(default)]
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Per-kind enable overrides, e.g. `SSN: true`.
    #[serde(default)]
    pub patterns: HashMap<String, bool>,

    #[serde(default)]
    pub custom_patterns: Vec<CustomPattern>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            patterns: HashMap::new(),
            custom_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheConfig {
    #[serde(default)]
    pub l1: TierOneConfig,

    #[serde(default)]
    pub l2: TierTwoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub openai: OpenAISettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAISettings {
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_model")]
    pub default_model: String,
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    200
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            default_model: default_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RoutingConfig {
    #[serde(default)]
    pub default_strategy: RoutingStrategy,
}

fn default_true() -> bool {
    true
}

impl ServerConfig {
    /// Load from a YAML or TOML file, chosen by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let config: ServerConfig = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)?
        } else {
            serde_yaml::from_str(&contents)?
        };
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.port, 8080);
        assert!(config.pii.detection.enabled);
        assert_eq!(config.cache.l1.max_size, 1000);
        assert_eq!(config.cache.l1.ttl_minutes, 60);
        assert!(!config.cache.l2.enabled);
        assert_eq!(config.provider.openai.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.provider.openai.timeout_seconds, 30);
        assert_eq!(config.routing.default_strategy, RoutingStrategy::Complexity);
    }

    #[test]
    fn test_yaml_roundtrip() {
        let yaml = r#"
server:
  host: 0.0.0.0
  port: 9090
pii:
  detection:
    patterns:
      SSN: true
      IP_ADDRESS: true
    custom_patterns:
      - name: employee-id
        regex: 'EMP-\d{6}'
        region: Universal
  redaction:
    token_generation: sequential
  audit:
    retention_days: 30
cache:
  l1:
    max_size: 500
  l2:
    enabled: true
    url: redis://cache.internal:6379
optimization:
  min_prompt_length: 80
provider:
  openai:
    max_retries: 5
routing:
  default_strategy: balanced
"#;
        let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.pii.detection.patterns["SSN"], true);
        assert_eq!(config.pii.detection.custom_patterns[0].name, "employee-id");
        assert_eq!(
            config.pii.redaction.token_generation,
            aegis_pii::TokenGeneration::Sequential
        );
        assert_eq!(config.pii.audit.retention_days, 30);
        assert_eq!(config.cache.l1.max_size, 500);
        assert!(config.cache.l2.enabled);
        assert_eq!(config.optimization.min_prompt_length, 80);
        assert_eq!(config.provider.openai.max_retries, 5);
        assert_eq!(config.routing.default_strategy, RoutingStrategy::Balanced);
    }

    #[test]
    fn test_toml_parse() {
        let toml_src = r#"
[server]
port = 7070

[cache.l1]
max_size = 64
"#;
        let config: ServerConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.server.port, 7070);
        assert_eq!(config.cache.l1.max_size, 64);
    }
}
