//! Credential and token lifecycle endpoints.
//!
//! Sign-up and sign-in hand out a token pair: the access token in the JSON
//! body, the refresh token only as HttpOnly cookies scoped to `/refresh`
//! and `/logout`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::cookies::{
    clear_refresh_cookies, session_cookie, set_refresh_cookies, REFRESH_COOKIE, SESSION_COOKIE,
};
use super::{endpoint, EndpointFuture};
use crate::middleware::presented_access_token;
use crate::models::TokenPair;
use crate::router::{Exchange, Request, Router};
use crate::state::AppState;
use crate::utils::HTTPError;

pub fn register(router: &mut Router, state: &AppState) {
    router.post("/signup", vec![endpoint(state, signup)]);
    router.post("/signin", vec![endpoint(state, signin)]);
    router.post("/refresh", vec![endpoint(state, refresh)]);
    router.post("/logout", vec![endpoint(state, logout)]);
}

#[derive(Deserialize)]
struct CredentialsBody {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Deserialize)]
struct RefreshBody {
    email: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenBody<'a> {
    access_token: &'a str,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn credentials(request: &Request) -> Result<(String, String), HTTPError> {
    let body: CredentialsBody = request.json()?;
    match (non_empty(body.email), non_empty(body.password)) {
        (Some(email), Some(password)) => Ok((email.trim().to_owned(), password)),
        _ => Err(HTTPError::bad_request("email and password are required")),
    }
}

/// Rotates a live session id after a privilege change, then sends the pair.
fn grant(state: &AppState, exchange: &mut Exchange, pair: &TokenPair) -> Result<(), HTTPError> {
    if let Some(new_id) = exchange
        .request
        .cookie(SESSION_COOKIE)
        .and_then(|old| state.sessions.regenerate(&old))
    {
        debug!("session id regenerated after authentication");
        exchange.response.set_cookie(&session_cookie(&new_id))?;
    }
    set_refresh_cookies(
        &mut exchange.response,
        &pair.refresh_token,
        state.config.tokens.refresh_ttl_secs,
    )?;
    exchange.response.send_json(&AccessTokenBody {
        access_token: &pair.access_token,
    })
}

fn signup<'a>(state: &'a AppState, exchange: &'a mut Exchange) -> EndpointFuture<'a> {
    Box::pin(async move {
        let (email, password) = credentials(&exchange.request)?;
        state.credentials.register(&email, &password).await?;
        let pair = state.issuer.issue_pair(&email)?;
        info!(event_name = "auth.signup", event_domain = "auth", "account registered");
        grant(state, exchange, &pair)
    })
}

fn signin<'a>(state: &'a AppState, exchange: &'a mut Exchange) -> EndpointFuture<'a> {
    Box::pin(async move {
        let (email, password) = credentials(&exchange.request)?;
        let subject = state
            .credentials
            .verify(&email, &password)
            .await
            .inspect_err(|e| debug!(error = %e, "sign-in rejected"))?;
        let pair = state.issuer.issue_pair(&subject)?;
        info!(event_name = "auth.signin", event_domain = "auth", "signed in");
        grant(state, exchange, &pair)
    })
}

/// Exchanges the refresh cookie for a new pair. The old refresh token is
/// spent: presenting it again gets a 403.
fn refresh<'a>(state: &'a AppState, exchange: &'a mut Exchange) -> EndpointFuture<'a> {
    Box::pin(async move {
        let token = exchange
            .request
            .cookie(REFRESH_COOKIE)
            .ok_or_else(|| HTTPError::unauthorized("Refresh token missing"))?;
        let body: RefreshBody = exchange.request.json()?;
        let email =
            non_empty(body.email).ok_or_else(|| HTTPError::bad_request("email is required"))?;

        let claims = state.issuer.verify_refresh(&token)?;
        if claims.sub != email.trim() {
            warn!(
                event_name = "auth.refresh.subject_mismatch",
                event_domain = "auth",
                "refresh token presented for a different account"
            );
            return Err(HTTPError::forbidden("Invalid token"));
        }

        let pair = state.issuer.rotate_refresh(&token)?;
        set_refresh_cookies(
            &mut exchange.response,
            &pair.refresh_token,
            state.config.tokens.refresh_ttl_secs,
        )?;
        exchange.response.send_json(&AccessTokenBody {
            access_token: &pair.access_token,
        })
    })
}

/// Revokes whatever credentials were presented. Always succeeds.
fn logout<'a>(state: &'a AppState, exchange: &'a mut Exchange) -> EndpointFuture<'a> {
    Box::pin(async move {
        if let Some(access) = presented_access_token(&exchange.request, true) {
            state.issuer.revoke(&access);
        }
        if let Some(refresh) = exchange.request.cookie(REFRESH_COOKIE) {
            state.issuer.invalidate_refresh(&refresh);
        }
        clear_refresh_cookies(&mut exchange.response)?;
        info!(event_name = "auth.logout", event_domain = "auth", "logged out");
        exchange.response.send_text("Logged out");
        Ok(())
    })
}
