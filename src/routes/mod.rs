//! HTTP route definitions and the bridge from axum into the in-process router.
//!
//! axum only carries bytes here: every request lands in a single fallback
//! handler that builds an [`Exchange`](crate::router::Exchange) request and
//! hands it to [`Router::dispatch`].

mod auth_routes;
pub mod cookies;
mod profile_routes;
mod public_routes;
mod session_routes;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use futures::future::BoxFuture;
use http::StatusCode;
use tracing::warn;

use crate::middleware::RequestLogger;
use crate::router::{
    Exchange, Flow, Handler, HandlerResult, Next, Request, Response, Router, SharedHandler,
};
use crate::state::AppState;
use crate::utils::HTTPError;

pub(crate) type EndpointFuture<'a> = BoxFuture<'a, Result<(), HTTPError>>;
type EndpointFn = for<'a> fn(&'a AppState, &'a mut Exchange) -> EndpointFuture<'a>;

/// A terminal handler with access to the application state.
struct Endpoint {
    state: AppState,
    run: EndpointFn,
}

#[async_trait]
impl Handler for Endpoint {
    async fn call(&self, exchange: &mut Exchange, _next: Next) -> HandlerResult {
        (self.run)(&self.state, exchange).await?;
        Ok(Flow::halt())
    }
}

pub(crate) fn endpoint(state: &AppState, run: EndpointFn) -> SharedHandler {
    Arc::new(Endpoint {
        state: state.clone(),
        run,
    })
}

/// Builds the route table: request logging and rate limiting for every
/// request, then the per-route chains.
pub fn build_dispatcher(state: &AppState) -> Router {
    let mut router = Router::new().with_deadline(Duration::from_millis(
        state.config.server.request_timeout_ms,
    ));
    router.use_middleware(Arc::new(RequestLogger));
    router.use_middleware(state.limiter.clone());

    public_routes::register(&mut router, state);
    session_routes::register(&mut router, state);
    auth_routes::register(&mut router, state);
    profile_routes::register(&mut router, state);
    router
}

struct Dispatch {
    router: Router,
    max_body_bytes: usize,
}

/// Creates the axum application serving every path through the dispatcher.
pub fn create_router(state: AppState) -> axum::Router {
    let dispatch = Arc::new(Dispatch {
        router: build_dispatcher(&state),
        max_body_bytes: state.config.server.max_body_bytes,
    });
    axum::Router::new().fallback(forward).with_state(dispatch)
}

async fn forward(
    State(dispatch): State<Arc<Dispatch>>,
    request: axum::extract::Request,
) -> http::Response<Body> {
    let (parts, body) = request.into_parts();
    let client_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let body = match axum::body::to_bytes(body, dispatch.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(
                path = parts.uri.path(),
                limit = dispatch.max_body_bytes,
                error = %e,
                "request body rejected"
            );
            let mut response = Response::new();
            response.send_error(&HTTPError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large",
            ));
            return response.into_http();
        }
    };

    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| parts.uri.path());
    let mut request = Request::new(parts.method.clone(), target)
        .with_headers(parts.headers)
        .with_body(body);
    if let Some(addr) = client_addr {
        request = request.with_client_addr(addr);
    }

    dispatch.router.dispatch(request).await.into_http()
}
