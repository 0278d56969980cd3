//! API Module
//!
//! Request and response payloads for the Graph API plus inbound webhook events.

pub mod account;
pub mod events;
pub mod messages;

pub use account::{
    BusinessProfile, CreateTemplateResponse, MediaUpload, MediaUrl, MessageTemplate, NewTemplate,
    Page, PhoneNumber, TemplateCategory, TemplateQuery, UploadMediaResponse,
};
pub use events::{DeliveryStatus, InboundMessage, InboundStatus, InteractiveReply, MessageContent};
pub use messages::{
    AddressRequest, Location, MediaKind, MediaObject, MessageBody, OutboundMessage, Reaction,
    ReadReceipt, SendMessageResponse, SuccessResponse, Template, TemplateLanguage, TextBody,
};
