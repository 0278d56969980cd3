//! Webhook Events
//!
//! Typed inbound messages and delivery status updates carried by webhook
//! notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One inbound user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Sender's WhatsApp id
    pub from: String,

    /// Message id (`wamid...`)
    pub id: String,

    /// Unix timestamp in seconds, as sent by the platform
    pub timestamp: String,

    /// Present when the user replied to or forwarded a message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<MessageContext>,

    /// Content, tagged by `type`
    #[serde(flatten)]
    pub content: MessageContent,
}

impl InboundMessage {
    /// When the platform received the message
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// The `type` tag of this message
    pub fn kind(&self) -> &'static str {
        self.content.kind()
    }

    /// Text of a text message, or the caption/title for other kinds
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text { text } => Some(&text.body),
            MessageContent::Image { image } | MessageContent::Video { video: image } => {
                image.caption.as_deref()
            }
            MessageContent::Button { button } => Some(&button.text),
            MessageContent::Interactive { interactive } => interactive.title(),
            _ => None,
        }
    }
}

/// Message being replied to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContext {
    #[serde(default)]
    pub from: Option<String>,
    pub id: String,
}

/// Message content variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    Image { image: MediaContent },
    Sticker { sticker: MediaContent },
    Audio { audio: AudioContent },
    Document { document: DocumentContent },
    Video { video: MediaContent },
    Button { button: ButtonContent },
    Contacts { contacts: Vec<serde_json::Value> },
    Location { location: LocationContent },
    Reaction { reaction: ReactionContent },
    System { system: SystemContent },
    Interactive { interactive: InteractiveReply },
    /// Any type this crate does not model, including the platform's own `unknown`
    #[serde(other)]
    Unknown,
}

impl MessageContent {
    pub fn kind(&self) -> &'static str {
        match self {
            MessageContent::Text { .. } => "text",
            MessageContent::Image { .. } => "image",
            MessageContent::Sticker { .. } => "sticker",
            MessageContent::Audio { .. } => "audio",
            MessageContent::Document { .. } => "document",
            MessageContent::Video { .. } => "video",
            MessageContent::Button { .. } => "button",
            MessageContent::Contacts { .. } => "contacts",
            MessageContent::Location { .. } => "location",
            MessageContent::Reaction { .. } => "reaction",
            MessageContent::System { .. } => "system",
            MessageContent::Interactive { .. } => "interactive",
            MessageContent::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaContent {
    pub id: String,

    #[serde(default)]
    pub mime_type: Option<String>,

    #[serde(default)]
    pub sha256: Option<String>,

    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioContent {
    pub id: String,

    #[serde(default)]
    pub mime_type: Option<String>,

    #[serde(default)]
    pub sha256: Option<String>,

    /// Voice note rather than an audio file
    #[serde(default)]
    pub voice: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentContent {
    pub id: String,

    #[serde(default)]
    pub filename: Option<String>,

    #[serde(default)]
    pub mime_type: Option<String>,

    #[serde(default)]
    pub sha256: Option<String>,

    #[serde(default)]
    pub caption: Option<String>,
}

/// Quick-reply button press on a template message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonContent {
    pub text: String,

    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationContent {
    pub latitude: f64,
    pub longitude: f64,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionContent {
    pub message_id: String,

    /// Empty when a reaction is removed
    #[serde(default)]
    pub emoji: Option<String>,
}

/// Account-level notices, e.g. the user changed their number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemContent {
    pub body: String,

    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub identity: Option<String>,

    #[serde(default)]
    pub new_wa_id: Option<String>,

    #[serde(default)]
    pub wa_id: Option<String>,

    #[serde(default)]
    pub customer: Option<String>,
}

/// User's answer to an interactive message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractiveReply {
    ButtonReply { button_reply: ReplyOption },
    ListReply { list_reply: ReplyOption },
    FlowResponse { flow_response: FlowResponse },
    /// WhatsApp Flows completion, sent as `nfm_reply`
    NfmReply { nfm_reply: FlowResponse },
    #[serde(other)]
    Other,
}

impl InteractiveReply {
    /// Title of the chosen button or row
    pub fn title(&self) -> Option<&str> {
        match self {
            InteractiveReply::ButtonReply { button_reply: option }
            | InteractiveReply::ListReply { list_reply: option } => Some(&option.title),
            _ => None,
        }
    }

    /// Id of the chosen button or row
    pub fn reply_id(&self) -> Option<&str> {
        match self {
            InteractiveReply::ButtonReply { button_reply: option }
            | InteractiveReply::ListReply { list_reply: option } => Some(&option.id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyOption {
    pub id: String,
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowResponse {
    #[serde(default)]
    pub name: Option<String>,

    /// JSON document encoded as a string
    pub response_json: String,

    #[serde(default)]
    pub body: Option<String>,
}

/// Delivery status update for a message this business sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundStatus {
    /// Id of the message the status refers to
    pub id: String,

    pub status: DeliveryStatus,

    pub timestamp: String,

    pub recipient_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<Conversation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<Pricing>,

    /// Populated for `failed` statuses
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<StatusError>,
}

impl InboundStatus {
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

/// Status tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Read,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<ConversationOrigin>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationOrigin {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub billable: bool,
    pub pricing_model: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusError {
    pub code: i64,
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_message() {
        let message: InboundMessage = serde_json::from_value(json!({
            "from": "16315551234",
            "id": "wamid.ABGGFlA5FpafAgo6EhgL",
            "timestamp": "1700000000",
            "type": "text",
            "text": { "body": "hello" }
        }))
        .unwrap();

        assert_eq!(message.kind(), "text");
        assert_eq!(message.text(), Some("hello"));
        assert_eq!(
            message.received_at().map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn test_interactive_button_reply_with_context() {
        let message: InboundMessage = serde_json::from_value(json!({
            "from": "16315551234",
            "id": "wamid.2",
            "timestamp": "1700000001",
            "context": { "from": "15550001111", "id": "wamid.1" },
            "type": "interactive",
            "interactive": {
                "type": "button_reply",
                "button_reply": { "id": "info", "title": "Get Information" }
            }
        }))
        .unwrap();

        assert_eq!(message.context.as_ref().map(|c| c.id.as_str()), Some("wamid.1"));
        match &message.content {
            MessageContent::Interactive { interactive } => {
                assert_eq!(interactive.reply_id(), Some("info"));
            }
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn test_location_message() {
        let message: InboundMessage = serde_json::from_value(json!({
            "from": "1", "id": "wamid.3", "timestamp": "1",
            "type": "location",
            "location": { "latitude": 52.52, "longitude": 13.405, "name": "Berlin" }
        }))
        .unwrap();

        match message.content {
            MessageContent::Location { location } => {
                assert_eq!(location.latitude, 52.52);
                assert_eq!(location.name.as_deref(), Some("Berlin"));
            }
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn test_unmodelled_type_is_unknown() {
        for kind in ["unknown", "order", "ephemeral"] {
            let message: InboundMessage = serde_json::from_value(json!({
                "from": "1", "id": "wamid.4", "timestamp": "1",
                "type": kind,
                "errors": [{ "code": 131051, "title": "Message type unknown" }]
            }))
            .unwrap();
            assert_eq!(message.content, MessageContent::Unknown);
        }
    }

    #[test]
    fn test_failed_status() {
        let status: InboundStatus = serde_json::from_value(json!({
            "id": "wamid.5",
            "status": "failed",
            "timestamp": "1700000002",
            "recipient_id": "16315551234",
            "errors": [{ "code": 131047, "title": "Re-engagement message" }]
        }))
        .unwrap();

        assert_eq!(status.status, DeliveryStatus::Failed);
        assert_eq!(status.errors[0].code, 131047);
        assert!(status.conversation.is_none());
    }

    #[test]
    fn test_delivered_status_with_pricing() {
        let status: InboundStatus = serde_json::from_value(json!({
            "id": "wamid.6",
            "status": "delivered",
            "timestamp": "1700000003",
            "recipient_id": "16315551234",
            "conversation": { "id": "conv-1", "origin": { "type": "service" } },
            "pricing": { "billable": true, "pricing_model": "CBP", "category": "service" }
        }))
        .unwrap();

        assert_eq!(status.status, DeliveryStatus::Delivered);
        assert_eq!(
            status.conversation.and_then(|c| c.origin).map(|o| o.kind),
            Some("service".to_string())
        );
        assert_eq!(status.pricing.map(|p| p.billable), Some(true));
    }

    #[test]
    fn test_unrecognised_status_tag() {
        let status: InboundStatus = serde_json::from_value(json!({
            "id": "wamid.7",
            "status": "deleted",
            "timestamp": "1",
            "recipient_id": "1"
        }))
        .unwrap();
        assert_eq!(status.status, DeliveryStatus::Unknown);
    }
}
