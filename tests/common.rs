#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use cookie::Cookie;
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use serde_json::Value;
use tollgate::config::ConfigV1;
use tollgate::routes::create_router;
use tollgate::state::AppState;
use tollgate::tokens::KeyPair;
use tollgate::utils::{Clock, SystemClock};
use tower::ServiceExt;

pub fn test_config_yaml() -> String {
    let fixtures = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");
    format!(
        r#"
version: "1.0.0"
bind_address: 127.0.0.1:8081
logging:
  level: "debug"
  format: "console"
keys:
  private_key_path: "{fixtures}/private.pem"
  public_key_path: "{fixtures}/public.pem"
tokens:
  issuer: tollgate-test
credentials:
  bcrypt_cost: 4
rate_limit:
  max_requests: 1000
server:
  request_timeout_ms: 5000
  max_body_bytes: 4096
"#
    )
}

pub fn load_test_config() -> ConfigV1 {
    ConfigV1::from_figment(Figment::new().merge(Yaml::string(&test_config_yaml())))
        .expect("Failed to parse test config YAML")
}

pub fn build_state(config: ConfigV1, clock: Arc<dyn Clock>) -> AppState {
    let keys = KeyPair::load(&config.keys).expect("fixture keys should load");
    AppState::new(Arc::new(config), keys, clock)
}

pub fn build_app(config: ConfigV1) -> (Router, AppState) {
    let state = build_state(config, Arc::new(SystemClock));
    (create_router(state.clone()), state)
}

pub struct TestRequest {
    method: Method,
    uri: String,
    headers: Vec<(header::HeaderName, String)>,
    cookies: Vec<String>,
    body: Option<String>,
    client: IpAddr,
}

impl TestRequest {
    pub fn new(method: Method, uri: &str) -> Self {
        TestRequest {
            method,
            uri: uri.to_string(),
            headers: Vec::new(),
            cookies: Vec::new(),
            body: None,
            client: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.headers
            .push((header::AUTHORIZATION, format!("Bearer {}", token)));
        self
    }

    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push(format!("{}={}", name, value));
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.headers
            .push((header::CONTENT_TYPE, "application/json".to_string()));
        self.body = Some(value.to_string());
        self
    }

    pub fn raw_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn from_client(mut self, client: IpAddr) -> Self {
        self.client = client;
        self
    }

    pub fn build(self) -> Request<Body> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }
        if !self.cookies.is_empty() {
            builder = builder.header(header::COOKIE, self.cookies.join("; "));
        }
        let mut request = builder
            .body(self.body.map(Body::from).unwrap_or_else(Body::empty))
            .expect("failed to build request");

        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::new(self.client, 0)));
        request
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("response body should be JSON")
    }

    pub fn set_cookies(&self) -> Vec<Cookie<'static>> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|value| {
                Cookie::parse(value.to_str().expect("Set-Cookie not valid UTF-8").to_string())
                    .expect("Set-Cookie should parse")
            })
            .collect()
    }

    /// The value of the first `Set-Cookie` named `name`.
    pub fn cookie_value(&self, name: &str) -> Option<String> {
        self.set_cookies()
            .into_iter()
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_string())
    }

    pub fn access_token(&self) -> String {
        self.json()["accessToken"]
            .as_str()
            .expect("accessToken missing")
            .to_string()
    }
}

pub async fn send(app: &Router, request: TestRequest) -> TestResponse {
    let response = app
        .clone()
        .oneshot(request.build())
        .await
        .expect("request should succeed");

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    TestResponse {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).expect("body should be UTF-8"),
    }
}
