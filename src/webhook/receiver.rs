//! Webhook Receiver
//!
//! Framework-agnostic request handling for the webhook endpoint. Callers
//! pass in the query string, signature header and raw body from whatever
//! HTTP server they run and write back the returned [`WebhookResponse`].

use super::dispatcher::{dispatch, DispatchReport, WebhookHandlers};
use super::verifier::SignatureVerifier;
use crate::config::WebhookConfig;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Header carrying the body signature
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Status and body to send back to the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: StatusCode,
    pub body: String,

    /// Set for notifications that reached the dispatcher
    pub report: Option<DispatchReport>,
}

impl WebhookResponse {
    fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            report: None,
        }
    }
}

/// Verifier plus handlers for one webhook endpoint
#[derive(Debug, Clone)]
pub struct WebhookReceiver {
    verifier: SignatureVerifier,
    handlers: WebhookHandlers,
}

impl WebhookReceiver {
    pub fn new(config: WebhookConfig, handlers: WebhookHandlers) -> Self {
        Self {
            verifier: SignatureVerifier::new(config),
            handlers,
        }
    }

    pub fn verifier(&self) -> &SignatureVerifier {
        &self.verifier
    }

    /// Answer a `GET` subscription request.
    ///
    /// 200 with the challenge as body on success, 403 otherwise.
    pub fn handle_subscription(&self, query: &HashMap<String, String>) -> WebhookResponse {
        let param = |name: &str| query.get(name).map(String::as_str).unwrap_or_default();

        match self.verifier.verify_handshake(
            param("hub.mode"),
            param("hub.verify_token"),
            param("hub.challenge"),
        ) {
            Some(challenge) => {
                info!("Webhook subscription verified");
                WebhookResponse::new(StatusCode::OK, challenge)
            }
            None => {
                warn!(mode = param("hub.mode"), "Webhook subscription rejected");
                WebhookResponse::new(StatusCode::FORBIDDEN, "Forbidden")
            }
        }
    }

    /// Handle a `POST` notification.
    ///
    /// 403 on a bad signature, 400 when the body is not JSON, otherwise the
    /// body is dispatched and 200 is returned.
    ///
    /// Returns before handlers complete only when called inside a Tokio
    /// runtime; see [`dispatch`].
    pub fn handle_notification(&self, signature: Option<&str>, raw_body: &[u8]) -> WebhookResponse {
        if !self.verifier.validate_signature(signature, raw_body) {
            warn!(has_signature = signature.is_some(), "Rejecting webhook with invalid signature");
            return WebhookResponse::new(StatusCode::FORBIDDEN, "Invalid signature");
        }

        let envelope: serde_json::Value = match serde_json::from_slice(raw_body) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Rejecting webhook with unparseable body");
                return WebhookResponse::new(StatusCode::BAD_REQUEST, "Invalid JSON payload");
            }
        };

        let report = dispatch(&envelope, &self.handlers);
        debug!(
            messages = report.messages,
            statuses = report.statuses,
            skipped = report.skipped.len(),
            "Webhook dispatched"
        );

        WebhookResponse {
            status: StatusCode::OK,
            body: "OK".to_string(),
            report: Some(report),
        }
    }

    /// Same as [`handle_notification`](Self::handle_notification), reading
    /// the signature from request headers
    pub fn handle_notification_with_headers(
        &self,
        headers: &HeaderMap,
        raw_body: &[u8],
    ) -> WebhookResponse {
        self.handle_notification(signature_from_headers(headers), raw_body)
    }
}

/// Signature header value, if present and valid UTF-8
pub fn signature_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok())
}
