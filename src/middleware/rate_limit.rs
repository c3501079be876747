//! Cumulative per-address request cap.
//!
//! Counters only grow: once an address crosses the cap it stays rejected for
//! the rest of the process lifetime.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use parking_lot::Mutex;
use tracing::warn;

use crate::router::{Exchange, Flow, Handler, HandlerResult, Next};
use crate::utils::log_throttle::LogThrottle;

const REJECTION_LOG_WINDOW: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Rejected,
}

pub struct RateLimiter {
    counts: Mutex<HashMap<String, u64>>,
    max_requests: u64,
    rejection_log: LogThrottle,
}

impl RateLimiter {
    pub fn new(max_requests: u64) -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            max_requests,
            rejection_log: LogThrottle::new(REJECTION_LOG_WINDOW),
        }
    }

    /// Counts the request, then rejects if the count is over the cap.
    pub fn admit(&self, client: &str) -> Admission {
        let mut counts = self.counts.lock();
        let count = counts.entry(client.to_owned()).or_insert(0);
        *count = count.saturating_add(1);
        if *count > self.max_requests {
            Admission::Rejected
        } else {
            Admission::Allowed
        }
    }

    pub fn count(&self, client: &str) -> u64 {
        self.counts.lock().get(client).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Handler for RateLimiter {
    async fn call(&self, exchange: &mut Exchange, next: Next) -> HandlerResult {
        let client = exchange.request.client_key();
        match self.admit(&client) {
            Admission::Allowed => Ok(next.proceed()),
            Admission::Rejected => {
                if let Some(suppressed_count) = self.rejection_log.should_emit(&client) {
                    warn!(
                        event_name = "middleware.rate_limit.rejected",
                        event_domain = "middleware",
                        client = client.as_str(),
                        max_requests = self.max_requests,
                        suppressed_count,
                        "rate limit exceeded"
                    );
                }
                exchange.response.set_status(StatusCode::TOO_MANY_REQUESTS);
                exchange.response.send_text("Too Many Requests");
                Ok(Flow::halt())
            }
        }
    }
}
