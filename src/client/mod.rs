//! Client Module
//!
//! HTTP transport, admission control and error diagnostics.

pub mod diagnostics;
pub mod http;
pub mod rate_limiter;

pub use diagnostics::Diagnostic;
pub use http::HttpClient;
pub use rate_limiter::{RateLimiter, RetryState};
