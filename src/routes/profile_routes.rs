//! Endpoints behind the access-token guard.

use std::sync::Arc;

use http::Method;
use serde::Serialize;

use super::{endpoint, EndpointFuture};
use crate::middleware::{authenticated_claims, RequireAccessToken};
use crate::router::{Exchange, Router, SharedHandler};
use crate::state::AppState;

pub fn register(router: &mut Router, state: &AppState) {
    let guard: SharedHandler = Arc::new(RequireAccessToken::new(
        state.verifier(),
        state.config.tokens.accept_body_token,
    ));
    router.get("/profile", vec![guard.clone(), endpoint(state, profile)]);
    router.register(
        Method::GET,
        "/private",
        vec![guard.clone(), endpoint(state, private_get)],
    );
    router.register(
        Method::POST,
        "/private",
        vec![guard, endpoint(state, private_post)],
    );
}

#[derive(Serialize)]
struct ProfileBody<'a> {
    message: &'static str,
    user: &'a str,
}

fn profile<'a>(_state: &'a AppState, exchange: &'a mut Exchange) -> EndpointFuture<'a> {
    Box::pin(async move {
        let user = authenticated_claims(exchange)?.sub.clone();
        exchange.response.send_json(&ProfileBody {
            message: "Welcome to your profile",
            user: &user,
        })
    })
}

fn private_get<'a>(_state: &'a AppState, exchange: &'a mut Exchange) -> EndpointFuture<'a> {
    Box::pin(async move {
        exchange.response.send_text("Private content - get");
        Ok(())
    })
}

fn private_post<'a>(_state: &'a AppState, exchange: &'a mut Exchange) -> EndpointFuture<'a> {
    Box::pin(async move {
        exchange.response.send_text("Private content - post");
        Ok(())
    })
}
