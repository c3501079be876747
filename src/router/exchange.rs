//! The request/response pair a handler chain operates on.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use axum::body::{Body, Bytes};
use cookie::Cookie;
use http::header::{self, AsHeaderName, HeaderMap, HeaderValue};
use http::{Extensions, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

use crate::utils::HTTPError;

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
pub const TEXT_HTML: &str = "text/html; charset=utf-8";
pub const APPLICATION_JSON: &str = "application/json";

/// An incoming request as handlers see it: path and query already split.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    /// Path and query exactly as received.
    pub target: String,
    pub path: String,
    /// Decoded query parameters. Keys are unique; the last occurrence wins.
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub client_addr: Option<IpAddr>,
    /// Per-request values set by earlier handlers for later ones.
    pub extensions: Extensions,
}

impl Request {
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = split_target(target);
        Request {
            method,
            target: target.to_owned(),
            path,
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            client_addr: None,
            extensions: Extensions::new(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_client_addr(mut self, addr: IpAddr) -> Self {
        self.client_addr = Some(addr);
        self
    }

    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Value of the first cookie called `name` across all `Cookie` headers.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|raw| Cookie::split_parse(raw.to_owned()))
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_owned())
    }

    /// The credential from an `Authorization: Bearer <token>` header.
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.header(header::AUTHORIZATION)?;
        let (scheme, token) = value.trim().split_once(' ')?;
        let token = token.trim();
        (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
    }

    /// Parses the body as JSON. A malformed body is a 400, never a fault.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HTTPError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            warn!(path = %self.path, error = %e, "rejected malformed JSON body");
            HTTPError::bad_request("Invalid JSON body")
        })
    }

    /// Key for per-client accounting.
    pub fn client_key(&self) -> String {
        self.client_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

fn split_target(target: &str) -> (String, HashMap<String, String>) {
    match target.split_once('?') {
        Some((path, query)) => (
            path.to_owned(),
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        ),
        None => (target.to_owned(), HashMap::new()),
    }
}

type FinishHook = Box<dyn FnOnce(&Response) + Send>;

/// The response under construction. Once [`Response::end`] has been called
/// the body is fixed; later writes are ignored.
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    ended: bool,
    on_finish: Vec<FinishHook>,
}

impl Response {
    pub fn new() -> Self {
        Response {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            ended: false,
            on_finish: Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn set_content_type(&mut self, content_type: &'static str) {
        self.headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }

    /// Appends a `Set-Cookie` header; earlier cookies are kept.
    pub fn set_cookie(&mut self, cookie: &Cookie<'_>) -> Result<(), HTTPError> {
        let value = HeaderValue::from_str(&cookie.to_string()).map_err(|e| {
            error!(cookie = cookie.name(), error = %e, "cookie is not a valid header value");
            HTTPError::internal()
        })?;
        self.headers.append(header::SET_COOKIE, value);
        Ok(())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Emits the body. Only the first call counts.
    pub fn end(&mut self, body: impl Into<Bytes>) {
        if self.ended {
            warn!("response already ended; ignoring second body");
            return;
        }
        self.body = body.into();
        self.ended = true;
    }

    pub fn send_text(&mut self, text: impl Into<String>) {
        self.set_content_type(TEXT_PLAIN);
        self.end(text.into());
    }

    pub fn send_html(&mut self, html: impl Into<String>) {
        self.set_content_type(TEXT_HTML);
        self.end(html.into());
    }

    pub fn send_json<T: Serialize>(&mut self, value: &T) -> Result<(), HTTPError> {
        let body = serde_json::to_vec(value).map_err(|e| {
            error!(error = %e, "failed to serialize response body");
            HTTPError::internal()
        })?;
        self.set_content_type(APPLICATION_JSON);
        self.end(body);
        Ok(())
    }

    pub fn send_error(&mut self, err: &HTTPError) {
        self.set_status(err.status);
        self.set_content_type(APPLICATION_JSON);
        self.end(err.body());
    }

    /// Registers a callback to run once the response is handed to the transport.
    pub fn on_finish(&mut self, hook: impl FnOnce(&Response) + Send + 'static) {
        self.on_finish.push(Box::new(hook));
    }

    /// Runs the finish hooks; called exactly once per dispatched request.
    pub(crate) fn finish(&mut self) {
        for hook in std::mem::take(&mut self.on_finish) {
            hook(self);
        }
    }

    pub fn into_http(self) -> http::Response<Body> {
        let mut response = http::Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("ended", &self.ended)
            .finish()
    }
}

#[derive(Debug)]
pub struct Exchange {
    pub request: Request,
    pub response: Response,
}

impl Exchange {
    pub fn new(request: Request) -> Self {
        Exchange {
            request,
            response: Response::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_decodes_query() {
        let request = Request::new(
            Method::GET,
            "/create-session?name=Ann%20Lee&email=a%40b.com&name=Bo",
        );
        assert_eq!(request.path, "/create-session");
        assert_eq!(request.query_param("name"), Some("Bo"));
        assert_eq!(request.query_param("email"), Some("a@b.com"));
        assert_eq!(request.query.len(), 2);
    }

    #[test]
    fn path_without_query() {
        let request = Request::new(Method::GET, "/read-session");
        assert_eq!(request.path, "/read-session");
        assert!(request.query.is_empty());
    }

    #[test]
    fn reads_cookies_from_all_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; a=1"));
        headers.append(header::COOKIE, HeaderValue::from_static("refreshToken=abc.def"));
        let request = Request::new(Method::POST, "/refresh").with_headers(headers);

        assert_eq!(request.cookie("refreshToken").as_deref(), Some("abc.def"));
        assert_eq!(request.cookie("a").as_deref(), Some("1"));
        assert_eq!(request.cookie("missing"), None);
    }

    #[test]
    fn bearer_token_is_case_insensitive_on_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer tok"));
        let request = Request::new(Method::GET, "/profile").with_headers(headers);
        assert_eq!(request.bearer_token(), Some("tok"));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        let request = Request::new(Method::GET, "/profile").with_headers(headers);
        assert_eq!(request.bearer_token(), None);
    }

    #[test]
    fn malformed_json_is_bad_request() {
        let request = Request::new(Method::POST, "/signup").with_body("{not json");
        let err = request.json::<serde_json::Value>().unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn end_is_first_write_wins() {
        let mut response = Response::new();
        response.end("first");
        response.end("second");
        assert_eq!(response.body().as_ref(), b"first");
        assert!(response.is_ended());
    }

    #[test]
    fn finish_hooks_see_final_status() {
        let seen = std::sync::Arc::new(parking_lot::Mutex::new(None));
        let mut response = Response::new();
        let sink = seen.clone();
        response.on_finish(move |r| *sink.lock() = Some(r.status()));
        response.set_status(StatusCode::CREATED);
        response.finish();
        response.finish();
        assert_eq!(*seen.lock(), Some(StatusCode::CREATED));
    }
}
