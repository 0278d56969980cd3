//! Event Dispatch
//!
//! Walks a webhook notification (`entry[] -> changes[] -> value`) and hands
//! every message and status to the registered handlers. Malformed branches
//! are skipped and reported, never fatal for the rest of the batch.

use crate::api::events::{InboundMessage, InboundStatus};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// `messaging_product` a change must carry to be dispatched
pub const EXPECTED_PRODUCT: &str = "whatsapp";

type MessageHandler = Arc<dyn Fn(InboundMessage) -> BoxFuture<'static, ()> + Send + Sync>;
type StatusHandler = Arc<dyn Fn(InboundStatus) -> BoxFuture<'static, ()> + Send + Sync>;

/// Caller-supplied callbacks for inbound events
#[derive(Clone, Default)]
pub struct WebhookHandlers {
    on_message: Option<MessageHandler>,
    on_status: Option<StatusHandler>,
}

impl WebhookHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the message callback
    pub fn on_message<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(InboundMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_message = Some(Arc::new(move |message| handler(message).boxed()));
        self
    }

    /// Register the status callback
    pub fn on_status<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(InboundStatus) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_status = Some(Arc::new(move |status| handler(status).boxed()));
        self
    }
}

impl fmt::Debug for WebhookHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookHandlers")
            .field("on_message", &self.on_message.is_some())
            .field("on_status", &self.on_status.is_some())
            .finish()
    }
}

/// Why part of a notification was not dispatched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The body is not a JSON object
    NotAnObject,
    MissingEntry,
    EntryNotArray,
    MissingChanges { entry: usize },
    ChangesNotArray { entry: usize },
    MissingValue { entry: usize, change: usize },
    /// `messaging_product` absent or not [`EXPECTED_PRODUCT`]
    WrongProduct {
        entry: usize,
        change: usize,
        product: Option<String>,
    },
    MessagesNotArray { entry: usize, change: usize },
    StatusesNotArray { entry: usize, change: usize },
    MalformedMessage {
        entry: usize,
        change: usize,
        index: usize,
        error: String,
    },
    MalformedStatus {
        entry: usize,
        change: usize,
        index: usize,
        error: String,
    },
}

/// Outcome of one dispatch pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Message handler invocations
    pub messages: usize,

    /// Status handler invocations
    pub statuses: usize,

    /// Branches that were skipped, in document order
    pub skipped: Vec<SkipReason>,
}

impl DispatchReport {
    fn skip(&mut self, reason: SkipReason) {
        debug!(?reason, "Skipping webhook branch");
        self.skipped.push(reason);
    }
}

/// Fan a notification out to `handlers`.
///
/// Handlers are invoked in entry, change, array order. Their futures are
/// spawned on the current Tokio runtime and not awaited.
///
/// Call this from inside a Tokio runtime to return without waiting on
/// handlers. Outside a runtime there is nowhere to spawn, so each handler
/// future is driven to completion inline and `dispatch` returns only after
/// all of them finish.
pub fn dispatch(envelope: &Value, handlers: &WebhookHandlers) -> DispatchReport {
    let mut report = DispatchReport::default();

    let Some(root) = envelope.as_object() else {
        report.skip(SkipReason::NotAnObject);
        return report;
    };

    let entries = match root.get("entry") {
        None => {
            report.skip(SkipReason::MissingEntry);
            return report;
        }
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            report.skip(SkipReason::EntryNotArray);
            return report;
        }
    };

    for (entry_idx, entry) in entries.iter().enumerate() {
        let changes = match entry.get("changes") {
            None => {
                report.skip(SkipReason::MissingChanges { entry: entry_idx });
                continue;
            }
            Some(Value::Array(changes)) => changes,
            Some(_) => {
                report.skip(SkipReason::ChangesNotArray { entry: entry_idx });
                continue;
            }
        };

        for (change_idx, change) in changes.iter().enumerate() {
            dispatch_change(entry_idx, change_idx, change, handlers, &mut report);
        }
    }

    report
}

fn dispatch_change(
    entry: usize,
    change: usize,
    raw: &Value,
    handlers: &WebhookHandlers,
    report: &mut DispatchReport,
) {
    let Some(value) = raw.get("value").filter(|v| v.is_object()) else {
        report.skip(SkipReason::MissingValue { entry, change });
        return;
    };

    let product = value.get("messaging_product").and_then(Value::as_str);
    if product != Some(EXPECTED_PRODUCT) {
        report.skip(SkipReason::WrongProduct {
            entry,
            change,
            product: product.map(String::from),
        });
        return;
    }

    if let Some(on_message) = &handlers.on_message {
        match value.get("messages") {
            None | Some(Value::Null) => {}
            Some(Value::Array(messages)) => {
                for (index, raw) in messages.iter().enumerate() {
                    match serde_json::from_value::<InboundMessage>(raw.clone()) {
                        Ok(message) => {
                            report.messages += 1;
                            run_detached(on_message(message));
                        }
                        Err(e) => report.skip(SkipReason::MalformedMessage {
                            entry,
                            change,
                            index,
                            error: e.to_string(),
                        }),
                    }
                }
            }
            Some(_) => report.skip(SkipReason::MessagesNotArray { entry, change }),
        }
    }

    if let Some(on_status) = &handlers.on_status {
        match value.get("statuses") {
            None | Some(Value::Null) => {}
            Some(Value::Array(statuses)) => {
                for (index, raw) in statuses.iter().enumerate() {
                    match serde_json::from_value::<InboundStatus>(raw.clone()) {
                        Ok(status) => {
                            report.statuses += 1;
                            run_detached(on_status(status));
                        }
                        Err(e) => report.skip(SkipReason::MalformedStatus {
                            entry,
                            change,
                            index,
                            error: e.to_string(),
                        }),
                    }
                }
            }
            Some(_) => report.skip(SkipReason::StatusesNotArray { entry, change }),
        }
    }
}

fn run_detached(task: BoxFuture<'static, ()>) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(task);
        }
        Err(_) => {
            debug!("No Tokio runtime, running webhook handler inline");
            futures::executor::block_on(task)
        }
    }
}
