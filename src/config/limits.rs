use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(default)]
pub struct ServerConfig {
    /// Deadline for one request chain; on expiry the client gets a 408.
    pub request_timeout_ms: u64,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Cumulative per-address request cap. Counters never reset.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { max_requests: 10 }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
#[serde(default)]
pub struct SessionConfig {
    /// Age after which a session is treated as gone, counted from its last
    /// creation or refresh.
    pub ttl_secs: i64,
    /// How often the background sweeper purges expired sessions and tokens.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
            sweep_interval_secs: 60,
        }
    }
}
