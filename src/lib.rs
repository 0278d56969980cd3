//! wacloud - WhatsApp Cloud API client
//!
//! An async client for the WhatsApp Business Cloud API with client-side
//! admission control, retry on throttling, enriched provider errors, and
//! webhook verification and dispatch.

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod webhook;

use api::account::{BusinessProfileEnvelope, BusinessProfileUpdate, BUSINESS_PROFILE_FIELDS};
use api::{
    AddressRequest, BusinessProfile, CreateTemplateResponse, Location, MediaKind, MediaObject,
    MediaUpload, MediaUrl, MessageBody, MessageTemplate, NewTemplate, OutboundMessage, Page,
    PhoneNumber, Reaction, ReadReceipt, SendMessageResponse, SuccessResponse, Template,
    TemplateQuery, UploadMediaResponse,
};
use client::{HttpClient, RateLimiter};
use config::{ClientConfig, ConfigLoader};

pub use error::{ProviderError, Result, WacloudError};
pub use webhook::{dispatch, SignatureVerifier, WebhookHandlers, WebhookReceiver};

/// Messaging product sent with every request that names one
const MESSAGING_PRODUCT: &str = "whatsapp";

/// The WhatsApp Cloud API client
pub struct WhatsAppClient {
    /// Client configuration
    config: ClientConfig,

    /// HTTP transport
    http: HttpClient,

    /// Admission control shared by every operation on this client
    rate_limiter: RateLimiter,
}

impl WhatsAppClient {
    /// Create a client from an explicit config
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let http = HttpClient::new(config.api_root(), config.access_token.clone())?;
        let rate_limiter = RateLimiter::new(config.rate_limit.clone())?;

        info!(
            api_root = %http.api_root(),
            phone_number_id = %config.phone_number_id,
            max_requests_per_minute = config.rate_limit.max_requests_per_minute,
            "WhatsApp client initialized"
        );

        Ok(Self {
            config,
            http,
            rate_limiter,
        })
    }

    /// Create a client from default config files and the environment
    pub fn from_env() -> Result<Self> {
        let loader = ConfigLoader::new()?;
        Self::new(loader.into_config().client)
    }

    /// Create a client from a specific config file
    pub fn from_config_path(path: impl AsRef<Path>) -> Result<Self> {
        let loader = ConfigLoader::from_path(path)?;
        Self::new(loader.into_config().client)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Replace the access token for subsequent requests
    pub fn update_access_token(&mut self, access_token: impl Into<String>) {
        let access_token = access_token.into();
        self.http.set_access_token(access_token.clone());
        self.config.access_token = access_token;
        info!("Access token updated");
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Send any outbound message
    pub async fn send_message(&self, message: &OutboundMessage) -> Result<SendMessageResponse> {
        let path = self.phone_path("messages");
        debug!(to = %message.to, "Sending message");
        self.post(&path, message).await
    }

    /// Send a plain text message
    pub async fn send_text(
        &self,
        to: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<SendMessageResponse> {
        self.send_message(&OutboundMessage::text(to, body)).await
    }

    /// Send an image, audio, document, sticker or video
    pub async fn send_media(
        &self,
        to: impl Into<String>,
        kind: MediaKind,
        media: MediaObject,
    ) -> Result<SendMessageResponse> {
        self.send_message(&OutboundMessage::new(to, MessageBody::media(kind, media)))
            .await
    }

    pub async fn send_location(
        &self,
        to: impl Into<String>,
        location: Location,
    ) -> Result<SendMessageResponse> {
        self.send_message(&OutboundMessage::new(to, MessageBody::Location { location }))
            .await
    }

    /// Send a pre-approved template message
    pub async fn send_template(
        &self,
        to: impl Into<String>,
        template: Template,
    ) -> Result<SendMessageResponse> {
        self.send_message(&OutboundMessage::new(to, MessageBody::Template { template }))
            .await
    }

    /// Send an interactive message; see [`api::messages::interactive`] for builders
    pub async fn send_interactive(
        &self,
        to: impl Into<String>,
        interactive: serde_json::Value,
    ) -> Result<SendMessageResponse> {
        self.send_message(&OutboundMessage::new(
            to,
            MessageBody::Interactive { interactive },
        ))
        .await
    }

    pub async fn send_contacts(
        &self,
        to: impl Into<String>,
        contacts: Vec<serde_json::Value>,
    ) -> Result<SendMessageResponse> {
        self.send_message(&OutboundMessage::new(to, MessageBody::Contacts { contacts }))
            .await
    }

    /// React to a message; an empty emoji removes the reaction
    pub async fn send_reaction(
        &self,
        to: impl Into<String>,
        message_id: impl Into<String>,
        emoji: impl Into<String>,
    ) -> Result<SendMessageResponse> {
        let reaction = Reaction {
            message_id: message_id.into(),
            emoji: emoji.into(),
        };
        self.send_message(&OutboundMessage::new(to, MessageBody::Reaction { reaction }))
            .await
    }

    /// Ask the user to share an address
    pub async fn request_address(
        &self,
        to: impl Into<String>,
        address: AddressRequest,
    ) -> Result<SendMessageResponse> {
        self.send_message(&OutboundMessage::new(to, MessageBody::Address { address }))
            .await
    }

    /// Mark an inbound message as read
    pub async fn mark_as_read(&self, message_id: impl Into<String>) -> Result<SuccessResponse> {
        let path = self.phone_path("messages");
        self.post(&path, &ReadReceipt::new(message_id)).await
    }

    // =========================================================================
    // Media
    // =========================================================================

    /// Upload media and return its id
    pub async fn upload_media(&self, upload: &MediaUpload) -> Result<UploadMediaResponse> {
        let path = self.phone_path("media");
        let path = path.as_str();
        let http = &self.http;

        debug!(file_name = %upload.file_name, bytes = upload.data.len(), "Uploading media");

        // Forms are consumed on send, so each attempt builds its own
        self.rate_limiter
            .execute(move || async move {
                let part = Part::bytes(upload.data.to_vec())
                    .file_name(upload.file_name.clone())
                    .mime_str(&upload.mime_type)?;
                let form = Form::new()
                    .text("messaging_product", MESSAGING_PRODUCT)
                    .text("type", upload.mime_type.clone())
                    .part("file", part);
                http.post_multipart(path, form).await
            })
            .await
    }

    /// Look up the download URL of a media id
    pub async fn retrieve_media_url(&self, media_id: &str) -> Result<MediaUrl> {
        self.get(media_id, &self.phone_query()).await
    }

    pub async fn delete_media(&self, media_id: &str) -> Result<SuccessResponse> {
        self.delete(media_id, &self.phone_query()).await
    }

    // =========================================================================
    // Business account
    // =========================================================================

    /// Fetch the business profile of the sending number
    pub async fn business_profile(&self) -> Result<BusinessProfile> {
        let path = self.phone_path("whatsapp_business_profile");
        let envelope: BusinessProfileEnvelope = self
            .get(&path, &[("fields", BUSINESS_PROFILE_FIELDS.to_string())])
            .await?;

        envelope
            .data
            .into_iter()
            .next()
            .ok_or_else(|| WacloudError::Response("Business profile response was empty".to_string()))
    }

    pub async fn update_business_profile(
        &self,
        profile: &BusinessProfile,
    ) -> Result<SuccessResponse> {
        let path = self.phone_path("whatsapp_business_profile");
        let body = BusinessProfileUpdate {
            messaging_product: MESSAGING_PRODUCT,
            profile,
        };
        self.post(&path, &body).await
    }

    /// List phone numbers registered to the business account
    pub async fn phone_numbers(&self) -> Result<Page<PhoneNumber>> {
        let path = self.account_path("phone_numbers")?;
        self.get(&path, &[]).await
    }

    pub async fn list_templates(&self, query: &TemplateQuery) -> Result<Page<MessageTemplate>> {
        let path = self.account_path("message_templates")?;
        self.get(&path, &query.to_query()).await
    }

    pub async fn create_template(&self, template: &NewTemplate) -> Result<CreateTemplateResponse> {
        let path = self.account_path("message_templates")?;
        info!(name = %template.name, "Creating message template");
        self.post(&path, template).await
    }

    /// Delete every language of the named template
    pub async fn delete_template(&self, name: &str) -> Result<SuccessResponse> {
        let path = self.account_path("message_templates")?;
        self.delete(&path, &[("name", name.to_string())]).await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn phone_path(&self, edge: &str) -> String {
        format!("{}/{}", self.config.phone_number_id, edge)
    }

    fn phone_query(&self) -> [(&'static str, String); 1] {
        [("phone_number_id", self.config.phone_number_id.clone())]
    }

    /// Path under the business account; the id is only required here
    fn account_path(&self, edge: &str) -> Result<String> {
        self.config
            .business_account_id
            .as_deref()
            .map(|id| format!("{}/{}", id, edge))
            .ok_or_else(|| {
                WacloudError::Config(format!(
                    "business_account_id is required to access {}",
                    edge
                ))
            })
    }

    async fn get<R>(&self, path: &str, query: &[(&str, String)]) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let http = &self.http;
        self.rate_limiter.execute(move || http.get(path, query)).await
    }

    async fn post<T, R>(&self, path: &str, body: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let http = &self.http;
        self.rate_limiter
            .execute(move || http.post_json(path, body))
            .await
    }

    async fn delete<R>(&self, path: &str, query: &[(&str, String)]) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let http = &self.http;
        self.rate_limiter
            .execute(move || http.delete(path, query))
            .await
    }
}
