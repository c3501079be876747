//! In-process request routing and middleware chains.

pub mod chain;
pub mod exchange;
#[allow(clippy::module_inception)]
pub mod router;

pub use chain::{
    handler_fn, run_chain, ChainOutcome, Flow, Handler, HandlerResult, Next, SharedHandler,
};
pub use exchange::{Exchange, Request, Response};
pub use router::Router;
