use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::{Method, StatusCode};
use tracing::{debug, info_span, warn, Instrument};

use super::chain::{run_chain, ChainOutcome, Flow, Handler, HandlerResult, Next, SharedHandler};
use super::exchange::{Exchange, Request, Response, TEXT_PLAIN};
use crate::utils::HTTPError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RouteKey {
    method: String,
    path: String,
}

impl RouteKey {
    fn new(method: &str, path: &str) -> Self {
        RouteKey {
            method: method.to_ascii_uppercase(),
            path: path.to_owned(),
        }
    }
}

/// Ends unmatched requests with a plain-text notice.
struct DefaultNotFound;

#[async_trait]
impl Handler for DefaultNotFound {
    async fn call(&self, exchange: &mut Exchange, _next: Next) -> HandlerResult {
        exchange.response.send_text("Path isn't found");
        Ok(Flow::halt())
    }
}

/// Exact-match dispatcher over (method, path) keys.
///
/// Global middlewares run first for every request, matched or not. Build the
/// table up front, then share it behind an `Arc`; `dispatch` takes `&self`.
pub struct Router {
    routes: HashMap<RouteKey, Vec<SharedHandler>>,
    middlewares: Vec<SharedHandler>,
    not_found: SharedHandler,
    deadline: Option<Duration>,
}

impl Router {
    pub fn new() -> Self {
        Router {
            routes: HashMap::new(),
            middlewares: Vec::new(),
            not_found: Arc::new(DefaultNotFound),
            deadline: None,
        }
    }

    /// Bounds every dispatch; an expired chain gets a 408.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Replaces any previous registration for the same method and path.
    pub fn register(
        &mut self,
        method: Method,
        path: &str,
        handlers: Vec<SharedHandler>,
    ) -> &mut Self {
        let key = RouteKey::new(method.as_str(), path);
        if self.routes.insert(key, handlers).is_some() {
            debug!(%method, path, "route registration overwritten");
        }
        self
    }

    pub fn get(&mut self, path: &str, handlers: Vec<SharedHandler>) -> &mut Self {
        self.register(Method::GET, path, handlers)
    }

    pub fn post(&mut self, path: &str, handlers: Vec<SharedHandler>) -> &mut Self {
        self.register(Method::POST, path, handlers)
    }

    pub fn use_middleware(&mut self, handler: SharedHandler) -> &mut Self {
        self.middlewares.push(handler);
        self
    }

    pub fn set_not_found(&mut self, handler: SharedHandler) -> &mut Self {
        self.not_found = handler;
        self
    }

    fn route(&self, method: &Method, path: &str) -> Option<&[SharedHandler]> {
        self.routes
            .get(&RouteKey::new(method.as_str(), path))
            .map(Vec::as_slice)
            .filter(|handlers| !handlers.is_empty())
    }

    pub fn has_route(&self, method: &Method, path: &str) -> bool {
        self.route(method, path).is_some()
    }

    /// Runs the request through its chain and returns the emitted response.
    /// Finish hooks have already run on the returned value.
    pub async fn dispatch(&self, request: Request) -> Response {
        let span = info_span!("dispatch", method = %request.method, path = %request.path);
        let mut exchange = Exchange::new(request);

        let tail = match self.route(&exchange.request.method, &exchange.request.path) {
            Some(handlers) => handlers.to_vec(),
            None => {
                exchange.response.set_status(StatusCode::NOT_FOUND);
                vec![self.not_found.clone()]
            }
        };
        exchange.response.set_content_type(TEXT_PLAIN);
        let chain: Vec<SharedHandler> = self.middlewares.iter().cloned().chain(tail).collect();

        match self.deadline {
            Some(deadline) => {
                let result = tokio::time::timeout(deadline, run_chain(&chain, &mut exchange))
                    .instrument(span)
                    .await;
                if result.is_err() {
                    warn!(
                        path = %exchange.request.path,
                        timeout_ms = deadline.as_millis() as u64,
                        "request chain exceeded its deadline"
                    );
                    if !exchange.response.is_ended() {
                        exchange.response.send_error(&HTTPError::new(
                            StatusCode::REQUEST_TIMEOUT,
                            "Request timed out",
                        ));
                    }
                }
            }
            None => {
                let outcome: ChainOutcome = run_chain(&chain, &mut exchange).instrument(span).await;
                debug!(?outcome, "chain finished");
            }
        }

        let mut response = exchange.response;
        response.finish();
        response
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
