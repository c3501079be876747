// This module re-exports important pieces for convenience,
// so we can "use crate::config::*" easily.
#[allow(clippy::module_inception)]
pub mod config;
pub mod limits;
pub mod logging;
pub mod security;

pub use config::*;
pub use limits::*;
pub use logging::*;
pub use security::*;
