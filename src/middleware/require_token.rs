//! Access-token guard for protected routes.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::models::Claims;
use crate::router::{Exchange, Handler, HandlerResult, Next, Request};
use crate::tokens::TokenVerifier;
use crate::utils::HTTPError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BodyToken {
    access_token: Option<String>,
}

/// Accepts the request only with a live access token and stores its
/// [`Claims`] in the request extensions for later handlers.
pub struct RequireAccessToken {
    verifier: Arc<TokenVerifier>,
    accept_body_token: bool,
}

impl RequireAccessToken {
    pub fn new(verifier: Arc<TokenVerifier>, accept_body_token: bool) -> Self {
        Self {
            verifier,
            accept_body_token,
        }
    }
}

/// Bearer header first; the JSON body `accessToken` only when allowed.
pub fn presented_access_token(request: &Request, accept_body_token: bool) -> Option<String> {
    if let Some(token) = request.bearer_token() {
        return Some(token.to_owned());
    }
    if !accept_body_token || request.body.is_empty() {
        return None;
    }
    serde_json::from_slice::<BodyToken>(&request.body)
        .ok()
        .and_then(|body| body.access_token)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl Handler for RequireAccessToken {
    async fn call(&self, exchange: &mut Exchange, next: Next) -> HandlerResult {
        let token = presented_access_token(&exchange.request, self.accept_body_token)
            .ok_or_else(|| HTTPError::unauthorized("Unauthorized"))?;
        let claims = self.verifier.verify_access(&token).map_err(|e| {
            debug!(path = %exchange.request.path, error = %e, "access token rejected");
            HTTPError::from(e)
        })?;
        exchange.request.extensions.insert(claims);
        Ok(next.proceed())
    }
}

/// Claims placed by [`RequireAccessToken`]; a 401 if the guard did not run.
pub fn authenticated_claims(exchange: &Exchange) -> Result<&Claims, HTTPError> {
    exchange
        .request
        .extensions
        .get::<Claims>()
        .ok_or_else(|| HTTPError::unauthorized("Unauthorized"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenConfig;
    use crate::router::{handler_fn, Flow, Router};
    use crate::store::TokenRegistry;
    use crate::tokens::keys::fixtures::{PRIVATE_PEM, PUBLIC_PEM};
    use crate::tokens::{KeyPair, TokenIssuer};
    use crate::utils::SystemClock;
    use http::header::{self, HeaderMap, HeaderValue};
    use http::{Method, StatusCode};

    fn issuer() -> TokenIssuer {
        let keys = KeyPair::from_pem(PRIVATE_PEM.as_bytes(), PUBLIC_PEM.as_bytes()).unwrap();
        TokenIssuer::new(
            keys,
            &TokenConfig::default(),
            Arc::new(TokenRegistry::new()),
            Arc::new(SystemClock),
        )
    }

    fn router(issuer: &TokenIssuer, accept_body_token: bool) -> Router {
        let mut router = Router::new();
        router.get(
            "/private",
            vec![
                Arc::new(RequireAccessToken::new(issuer.verifier(), accept_body_token)),
                handler_fn(|ex, _next| {
                    Box::pin(async move {
                        let subject = authenticated_claims(ex)?.sub.clone();
                        ex.response.send_text(subject);
                        Ok(Flow::halt())
                    })
                }),
            ],
        );
        router
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn missing_token_is_401() {
        let issuer = issuer();
        let response = router(&issuer, false)
            .dispatch(Request::new(Method::GET, "/private"))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_bearer_reaches_handler() {
        let issuer = issuer();
        let pair = issuer.issue_pair("ann@example.com").unwrap();
        let response = router(&issuer, false)
            .dispatch(Request::new(Method::GET, "/private").with_headers(bearer(&pair.access_token)))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"ann@example.com");
    }

    #[tokio::test]
    async fn revoked_token_is_403() {
        let issuer = issuer();
        let pair = issuer.issue_pair("ann@example.com").unwrap();
        issuer.revoke(&pair.access_token);
        let response = router(&issuer, false)
            .dispatch(Request::new(Method::GET, "/private").with_headers(bearer(&pair.access_token)))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn refresh_token_is_not_an_access_token() {
        let issuer = issuer();
        let pair = issuer.issue_pair("ann@example.com").unwrap();
        let response = router(&issuer, false)
            .dispatch(Request::new(Method::GET, "/private").with_headers(bearer(&pair.refresh_token)))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn body_token_only_when_enabled() {
        let issuer = issuer();
        let pair = issuer.issue_pair("ann@example.com").unwrap();
        let body = serde_json::json!({ "accessToken": pair.access_token }).to_string();

        let denied = router(&issuer, false)
            .dispatch(Request::new(Method::GET, "/private").with_body(body.clone()))
            .await;
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let allowed = router(&issuer, true)
            .dispatch(Request::new(Method::GET, "/private").with_body(body))
            .await;
        assert_eq!(allowed.status(), StatusCode::OK);
    }
}
