//! Chain handlers shared by many routes.

pub mod rate_limit;
pub mod request_logger;
pub mod require_token;

pub use rate_limit::{Admission, RateLimiter};
pub use request_logger::RequestLogger;
pub use require_token::{authenticated_claims, presented_access_token, RequireAccessToken};
