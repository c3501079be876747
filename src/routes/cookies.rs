//! Cookie shapes used by the session and token routes.
//!
//! Every cookie is HttpOnly, Secure and SameSite=Strict.

use cookie::time::Duration;
use cookie::{Cookie, SameSite};

use crate::router::Response;
use crate::utils::HTTPError;

pub const SESSION_COOKIE: &str = "sessionId";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// The refresh token is only ever sent to these two endpoints.
pub const REFRESH_COOKIE_PATHS: [&str; 2] = ["/refresh", "/logout"];

fn hardened(name: &'static str, value: String, path: &'static str) -> Cookie<'static> {
    Cookie::build((name, value))
        .path(path)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .build()
}

pub fn session_cookie(session_id: &str) -> Cookie<'static> {
    hardened(SESSION_COOKIE, session_id.to_owned(), "/")
}

pub fn set_refresh_cookies(
    response: &mut Response,
    token: &str,
    max_age_secs: i64,
) -> Result<(), HTTPError> {
    for path in REFRESH_COOKIE_PATHS {
        let mut cookie = hardened(REFRESH_COOKIE, token.to_owned(), path);
        cookie.set_max_age(Duration::seconds(max_age_secs));
        response.set_cookie(&cookie)?;
    }
    Ok(())
}

pub fn clear_refresh_cookies(response: &mut Response) -> Result<(), HTTPError> {
    for path in REFRESH_COOKIE_PATHS {
        let mut cookie = hardened(REFRESH_COOKIE, String::new(), path);
        cookie.make_removal();
        response.set_cookie(&cookie)?;
    }
    Ok(())
}

pub fn clear_session_cookie(response: &mut Response) -> Result<(), HTTPError> {
    let mut cookie = session_cookie("");
    cookie.make_removal();
    response.set_cookie(&cookie)
}
