//! Outbound Messages
//!
//! Payloads for the `/{phone-number-id}/messages` endpoint.

use serde::{Deserialize, Serialize};

/// A message to send
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Always `"whatsapp"`
    pub messaging_product: String,

    /// Always `"individual"`
    pub recipient_type: String,

    /// Recipient phone number or WhatsApp id
    pub to: String,

    /// Message being replied to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ReplyContext>,

    /// Time-to-live for template messages, ISO 8601 duration (e.g. `PT10M`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,

    /// The typed message body
    #[serde(flatten)]
    pub body: MessageBody,
}

impl OutboundMessage {
    /// Create a message to `to`
    pub fn new(to: impl Into<String>, body: MessageBody) -> Self {
        Self {
            messaging_product: "whatsapp".to_string(),
            recipient_type: "individual".to_string(),
            to: to.into(),
            context: None,
            ttl: None,
            body,
        }
    }

    /// Send as a reply to an earlier message
    pub fn in_reply_to(mut self, message_id: impl Into<String>) -> Self {
        self.context = Some(ReplyContext {
            message_id: message_id.into(),
        });
        self
    }

    /// Set a time-to-live
    pub fn with_ttl(mut self, ttl: impl Into<String>) -> Self {
        self.ttl = Some(ttl.into());
        self
    }

    /// Plain text message
    pub fn text(to: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(
            to,
            MessageBody::Text {
                text: TextBody {
                    body: body.into(),
                    preview_url: None,
                },
            },
        )
    }
}

/// Reply context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyContext {
    pub message_id: String,
}

/// Message body, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageBody {
    Text { text: TextBody },
    Image { image: MediaObject },
    Audio { audio: MediaObject },
    Document { document: MediaObject },
    Sticker { sticker: MediaObject },
    Video { video: MediaObject },
    Location { location: Location },
    Template { template: Template },
    Interactive { interactive: serde_json::Value },
    Contacts { contacts: Vec<serde_json::Value> },
    Reaction { reaction: Reaction },
    Address { address: AddressRequest },
}

impl MessageBody {
    /// Media body of the given kind
    pub fn media(kind: MediaKind, media: MediaObject) -> Self {
        match kind {
            MediaKind::Image => MessageBody::Image { image: media },
            MediaKind::Audio => MessageBody::Audio { audio: media },
            MediaKind::Document => MessageBody::Document { document: media },
            MediaKind::Sticker => MessageBody::Sticker { sticker: media },
            MediaKind::Video => MessageBody::Video { video: media },
        }
    }
}

/// Text content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBody {
    pub body: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<bool>,
}

/// Kinds of media messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Document,
    Image,
    Sticker,
    Video,
}

/// Media reference, by uploaded id or public link
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,

    /// Only meaningful for documents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl MediaObject {
    /// Reference previously uploaded media
    pub fn from_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Reference media by URL
    pub fn from_link(link: impl Into<String>) -> Self {
        Self {
            link: Some(link.into()),
            ..Default::default()
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Location pin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Template message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub language: TemplateLanguage,

    /// Header/body/button parameter components
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<serde_json::Value>,
}

impl Template {
    pub fn new(name: impl Into<String>, language_code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: TemplateLanguage {
                code: language_code.into(),
            },
            components: Vec::new(),
        }
    }

    pub fn with_components(mut self, components: Vec<serde_json::Value>) -> Self {
        self.components = components;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateLanguage {
    pub code: String,
}

/// Emoji reaction to a message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub message_id: String,
    pub emoji: String,
}

/// Request the user's address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressRequest {
    pub request_address: AddressRequestDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressRequestDetails {
    /// `HOME` or `WORK`
    #[serde(rename = "type")]
    pub kind: String,
    pub button_text: String,
}

impl AddressRequest {
    pub fn new(kind: impl Into<String>, button_text: impl Into<String>) -> Self {
        Self {
            request_address: AddressRequestDetails {
                kind: kind.into(),
                button_text: button_text.into(),
            },
        }
    }
}

impl Default for AddressRequest {
    fn default() -> Self {
        Self::new("HOME", "Send Address")
    }
}

/// Builders for `interactive` bodies
pub mod interactive {
    use serde_json::{json, Value};

    /// Up to three quick-reply buttons, given as `(id, title)` pairs
    pub fn reply_buttons(body: &str, buttons: &[(&str, &str)]) -> Value {
        let buttons: Vec<Value> = buttons
            .iter()
            .map(|(id, title)| json!({ "type": "reply", "reply": { "id": id, "title": title } }))
            .collect();

        json!({
            "type": "button",
            "body": { "text": body },
            "action": { "buttons": buttons }
        })
    }

    /// Call-to-action URL button
    pub fn cta_url(
        body: &str,
        display_text: &str,
        url: &str,
        header_text: Option<&str>,
        footer_text: Option<&str>,
    ) -> Value {
        let mut interactive = json!({
            "type": "cta_url",
            "body": { "text": body },
            "action": {
                "name": "cta_url",
                "parameters": { "display_text": display_text, "url": url }
            }
        });
        if let Some(header) = header_text {
            interactive["header"] = json!({ "type": "text", "text": header });
        }
        if let Some(footer) = footer_text {
            interactive["footer"] = json!({ "text": footer });
        }
        interactive
    }

    /// Ask the user to share their location
    pub fn location_request(body: &str, footer_text: Option<&str>) -> Value {
        let mut interactive = json!({
            "type": "location_request_message",
            "body": { "text": body },
            "action": { "name": "send_location" }
        });
        if let Some(footer) = footer_text {
            interactive["footer"] = json!({ "text": footer });
        }
        interactive
    }
}

/// Read receipt for an inbound message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub messaging_product: String,
    pub status: String,
    pub message_id: String,
}

impl ReadReceipt {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            messaging_product: "whatsapp".to_string(),
            status: "read".to_string(),
            message_id: message_id.into(),
        }
    }
}

/// Response to a send
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub messaging_product: String,

    #[serde(default)]
    pub contacts: Vec<SentContact>,

    #[serde(default)]
    pub messages: Vec<SentMessage>,
}

impl SendMessageResponse {
    /// Id of the first accepted message
    pub fn message_id(&self) -> Option<&str> {
        self.messages.first().map(|m| m.id.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentContact {
    pub input: String,
    pub wa_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentMessage {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_status: Option<String>,
}

/// Generic `{"success": true}` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}
