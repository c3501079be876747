//! Sequential handler chains.
//!
//! A handler receives the exchange and a one-shot [`Next`]. Continuing the
//! chain is only possible by spending that token, so a handler cannot
//! advance twice, and the executor never runs two handlers of the same
//! request concurrently.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{error, warn};

use super::exchange::Exchange;
use crate::utils::HTTPError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    Halt,
}

/// What a handler decided. Build with [`Next::proceed`] or [`Flow::halt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flow(Step);

impl Flow {
    /// Stops the chain. The handler is expected to have emitted a response.
    pub fn halt() -> Self {
        Flow(Step::Halt)
    }

    pub fn is_continue(self) -> bool {
        self.0 == Step::Continue
    }
}

/// Permission to hand control to the next handler. Consumed on use.
#[derive(Debug)]
pub struct Next {
    _private: (),
}

impl Next {
    pub(crate) fn new() -> Self {
        Next { _private: () }
    }

    pub fn proceed(self) -> Flow {
        Flow(Step::Continue)
    }
}

pub type HandlerResult = Result<Flow, HTTPError>;

#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, exchange: &mut Exchange, next: Next) -> HandlerResult;
}

pub type SharedHandler = Arc<dyn Handler>;

struct FnHandler<F>(F);

#[async_trait]
impl<F> Handler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut Exchange, Next) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    async fn call(&self, exchange: &mut Exchange, next: Next) -> HandlerResult {
        (self.0)(exchange, next).await
    }
}

/// Wraps a closure as a handler:
///
/// ```ignore
/// handler_fn(|ex, next| Box::pin(async move {
///     ex.response.send_text("hi");
///     Ok(next.proceed())
/// }))
/// ```
pub fn handler_fn<F>(f: F) -> SharedHandler
where
    F: for<'a> Fn(&'a mut Exchange, Next) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    Arc::new(FnHandler(f))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every handler continued.
    Completed,
    /// A handler stopped the chain.
    Halted,
    /// A handler failed or panicked; an error response was emitted if possible.
    Faulted,
}

/// Runs `handlers` in order until one halts, fails, or the list is exhausted.
pub async fn run_chain(handlers: &[SharedHandler], exchange: &mut Exchange) -> ChainOutcome {
    for (index, handler) in handlers.iter().enumerate() {
        let result = AssertUnwindSafe(handler.call(exchange, Next::new()))
            .catch_unwind()
            .await;
        match result {
            Ok(Ok(flow)) if flow.is_continue() => continue,
            Ok(Ok(_)) => {
                if !exchange.response.is_ended() {
                    warn!(
                        path = %exchange.request.path,
                        handler = index,
                        "handler halted without responding"
                    );
                    exchange.response.send_error(&HTTPError::internal());
                }
                return ChainOutcome::Halted;
            }
            Ok(Err(err)) => {
                if err.status.is_server_error() {
                    error!(path = %exchange.request.path, handler = index, error = %err, "handler failed");
                }
                if exchange.response.is_ended() {
                    warn!(error = %err, "handler failed after responding; error not sent");
                } else {
                    exchange.response.send_error(&err);
                }
                return ChainOutcome::Faulted;
            }
            Err(payload) => {
                error!(
                    path = %exchange.request.path,
                    handler = index,
                    panic = panic_message(payload.as_ref()),
                    "handler panicked"
                );
                if !exchange.response.is_ended() {
                    exchange.response.send_error(&HTTPError::internal());
                }
                return ChainOutcome::Faulted;
            }
        }
    }
    ChainOutcome::Completed
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
