//! One `request completed` event per request, emitted when the response is.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::router::{Exchange, Handler, HandlerResult, Next};

pub struct RequestLogger;

#[async_trait]
impl Handler for RequestLogger {
    async fn call(&self, exchange: &mut Exchange, next: Next) -> HandlerResult {
        let started = Instant::now();
        let method = exchange.request.method.to_string();
        let path = exchange.request.path.clone();
        let client = exchange.request.client_key();

        exchange.response.on_finish(move |response| {
            let status = response.status().as_u16();
            let duration_ms = started.elapsed().as_millis() as u64;
            if response.status().is_server_error() {
                warn!(
                    event_name = "http.request.completed",
                    event_domain = "http",
                    method = method.as_str(),
                    path = path.as_str(),
                    client = client.as_str(),
                    status,
                    duration_ms,
                    "request completed"
                );
            } else {
                info!(
                    event_name = "http.request.completed",
                    event_domain = "http",
                    method = method.as_str(),
                    path = path.as_str(),
                    client = client.as_str(),
                    status,
                    duration_ms,
                    "request completed"
                );
            }
        });

        Ok(next.proceed())
    }
}
