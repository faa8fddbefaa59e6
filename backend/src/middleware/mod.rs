//! Request middleware.
//!
//! Order on the app, outermost first: [`Trace`], [`CatchPanic`],
//! [`RateLimit`], then the authentication stage from `inbound::http`.

pub mod catch_panic;
pub mod rate_limit;
pub mod trace;

pub use catch_panic::CatchPanic;
pub use rate_limit::{RateLimit, RateLimitConfig, RateLimiter};
pub use trace::Trace;
