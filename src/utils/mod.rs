pub mod clock;
pub mod html;
pub mod http_helpers;
pub mod log_throttle;
pub mod logger;

pub use clock::{Clock, ManualClock, SystemClock};
pub use http_helpers::HTTPError;
