//! Configuration Module
//!
//! Handles client and webhook configuration loading and validation.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::{ClientConfig, RateLimitPolicy, WacloudConfig, WebhookConfig};
