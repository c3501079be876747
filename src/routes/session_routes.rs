//! Cookie-backed session endpoints.

use http::StatusCode;

use super::cookies::{clear_session_cookie, session_cookie, SESSION_COOKIE};
use super::{endpoint, EndpointFuture};
use crate::models::{SessionProfile, SessionRecord};
use crate::router::{Exchange, Request, Router};
use crate::state::AppState;
use crate::utils::{html, HTTPError};

pub fn register(router: &mut Router, state: &AppState) {
    router.get("/create-session", vec![endpoint(state, create_session)]);
    router.get("/destroy-session", vec![endpoint(state, destroy_session)]);
    router.get("/set-theme", vec![endpoint(state, set_theme)]);
    router.get("/read-session", vec![endpoint(state, read_session)]);
}

fn profile_from_query(request: &Request) -> Result<SessionProfile, HTTPError> {
    let field = |key: &str| {
        request
            .query_param(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
    };
    match (field("name"), field("email")) {
        (Some(username), Some(email)) => Ok(SessionProfile { username, email }),
        _ => Err(HTTPError::bad_request("name and email are required")),
    }
}

fn live_session(state: &AppState, request: &Request) -> Option<SessionRecord> {
    request
        .cookie(SESSION_COOKIE)
        .and_then(|id| state.sessions.get(&id))
}

fn no_session_page(exchange: &mut Exchange) {
    exchange.response.set_status(StatusCode::UNAUTHORIZED);
    exchange.response.send_html(html::page(
        "Session",
        "    <h1>No active session</h1>\n    <p><a href=\"/create-session\">Create one</a> first.</p>",
    ));
}

/// Creates a session, or refreshes the one named by the cookie. A refresh
/// keeps the stored profile and only needs the cookie.
fn create_session<'a>(state: &'a AppState, exchange: &'a mut Exchange) -> EndpointFuture<'a> {
    Box::pin(async move {
        let cookie_id = exchange.request.cookie(SESSION_COOKIE);
        let profile = match live_session(state, &exchange.request) {
            Some(record) => SessionProfile {
                username: record.username,
                email: record.email,
            },
            None => profile_from_query(&exchange.request)?,
        };

        let session_id = state.sessions.create(cookie_id.as_deref(), profile);
        exchange.response.set_cookie(&session_cookie(&session_id))?;
        exchange
            .response
            .send_text(format!("Session created: {session_id}"));
        Ok(())
    })
}

fn destroy_session<'a>(state: &'a AppState, exchange: &'a mut Exchange) -> EndpointFuture<'a> {
    Box::pin(async move {
        let destroyed = exchange
            .request
            .cookie(SESSION_COOKIE)
            .is_some_and(|id| state.sessions.destroy(&id));
        clear_session_cookie(&mut exchange.response)?;
        if destroyed {
            exchange.response.send_text("Session destroyed");
        } else {
            exchange.response.send_text("No session found");
        }
        Ok(())
    })
}

fn set_theme<'a>(state: &'a AppState, exchange: &'a mut Exchange) -> EndpointFuture<'a> {
    Box::pin(async move {
        let theme = exchange
            .request
            .cookie(SESSION_COOKIE)
            .and_then(|id| state.sessions.toggle_theme(&id));
        match theme {
            Some(theme) => exchange.response.send_html(html::page(
                "Theme",
                &format!(
                    "    <h1>Theme updated</h1>\n    <p>Current theme: <strong>{}</strong></p>",
                    theme
                ),
            )),
            None => no_session_page(exchange),
        }
        Ok(())
    })
}

fn read_session<'a>(state: &'a AppState, exchange: &'a mut Exchange) -> EndpointFuture<'a> {
    Box::pin(async move {
        match live_session(state, &exchange.request) {
            Some(record) => {
                let body = format!(
                    "    <h1>Session</h1>\n    <p>Name: {}</p>\n    <p>Email: {}</p>\n    <p>Theme: {}</p>\n    <p>Created: {}</p>",
                    html::escape(&record.username),
                    html::escape(&record.email),
                    record.theme,
                    record.created_at.to_rfc3339(),
                );
                exchange.response.send_html(html::page("Session", &body));
            }
            None => no_session_page(exchange),
        }
        Ok(())
    })
}
