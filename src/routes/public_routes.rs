//! Unauthenticated endpoints.

use http::Method;

use super::{endpoint, EndpointFuture};
use crate::router::{Exchange, Router};
use crate::state::AppState;

/// Registers the landing page and liveness check.
pub fn register(router: &mut Router, state: &AppState) {
    router.register(Method::GET, "/", vec![endpoint(state, landing)]);
    router.register(Method::GET, "/health", vec![endpoint(state, health_check)]);
}

fn landing<'a>(_state: &'a AppState, exchange: &'a mut Exchange) -> EndpointFuture<'a> {
    Box::pin(async move {
        exchange.response.send_text("Public content");
        Ok(())
    })
}

/// Returns 200 as long as the process is serving.
fn health_check<'a>(_state: &'a AppState, exchange: &'a mut Exchange) -> EndpointFuture<'a> {
    Box::pin(async move {
        exchange.response.send_text("OK");
        Ok(())
    })
}
