use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::limits::{RateLimitConfig, ServerConfig, SessionConfig};
use super::logging::LoggingConfig;
use super::security::{CredentialConfig, KeyConfig, TokenConfig};

/// Environment variable naming the YAML file to load.
pub const CONFIG_PATH_ENV: &str = "TOLLGATE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "./config.yaml";
const ENV_PREFIX: &str = "TOLLGATE_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    pub bind_address: String,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub keys: KeyConfig,
    #[serde(default)]
    pub tokens: TokenConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default)]
    pub credentials: CredentialConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl ConfigV1 {
    /// Extracts a versioned config from any figment, migrating older
    /// versions here when there are some.
    pub fn from_figment(figment: Figment) -> Result<Self, figment::Error> {
        match figment.extract::<Config>()? {
            Config::ConfigV1(c) => Ok(c),
        }
    }
}

/// Load config from the YAML file named by `TOLLGATE_CONFIG` (default
/// `./config.yaml`), with `TOLLGATE_`-prefixed environment variables on top.
/// Nested keys are separated by `__`, e.g. `TOLLGATE_RATE_LIMIT__MAX_REQUESTS`.
pub fn load_config() -> Result<ConfigV1, figment::Error> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let figment = Figment::new()
        .merge(Yaml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"));
    ConfigV1::from_figment(figment)
}

/// Render the JSON schema for the configuration.
pub fn schema_json() -> Result<String, serde_json::Error> {
    let schema = schema_for!(Config);
    serde_json::to_string_pretty(&schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;

    const MINIMAL: &str = r#"
version: "1.0.0"
bind_address: 127.0.0.1:3000
keys:
  private_key_path: private.pem
  public_key_path: public.pem
"#;

    #[test]
    fn minimal_config_takes_defaults() {
        let config = ConfigV1::from_figment(Figment::new().merge(Yaml::string(MINIMAL)))
            .expect("minimal config should parse");

        assert_eq!(config.rate_limit.max_requests, 10);
        assert_eq!(config.tokens.access_ttl_secs, 900);
        assert_eq!(config.tokens.refresh_ttl_secs, 604_800);
        assert!(!config.tokens.accept_body_token);
        assert_eq!(config.credentials.bcrypt_cost, 12);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn unknown_version_is_rejected() {
        let yaml = MINIMAL.replace("1.0.0", "9.9.9");
        assert!(ConfigV1::from_figment(Figment::new().merge(Yaml::string(&yaml))).is_err());
    }

    #[test]
    fn nested_overrides_apply() {
        let overrides = r#"
rate_limit:
  max_requests: 3
tokens:
  accept_body_token: true
"#;
        let config = ConfigV1::from_figment(
            Figment::new()
                .merge(Yaml::string(MINIMAL))
                .merge(Yaml::string(overrides)),
        )
        .expect("config should parse");

        assert_eq!(config.rate_limit.max_requests, 3);
        assert!(config.tokens.accept_body_token);
        assert_eq!(config.tokens.access_ttl_secs, 900);
    }

    #[test]
    fn example_config_parses() {
        let example = include_str!("../../config.example.yaml");
        let config = ConfigV1::from_figment(Figment::new().merge(Yaml::string(example)))
            .expect("example config should parse");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.server.request_timeout_ms, 10_000);
    }

    #[test]
    fn schema_renders() {
        let schema = schema_json().expect("schema should serialize");
        assert!(schema.contains("bind_address"));
    }
}
