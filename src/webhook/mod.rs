//! Webhook Module
//!
//! Inbound side of the API: verification, dispatch and request handling.

pub mod dispatcher;
pub mod receiver;
pub mod verifier;

pub use dispatcher::{dispatch, DispatchReport, SkipReason, WebhookHandlers};
pub use receiver::{signature_from_headers, WebhookReceiver, WebhookResponse};
pub use verifier::{sign_body, SignatureVerifier};
