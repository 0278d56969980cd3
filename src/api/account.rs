//! Account Resources
//!
//! Media, business profile, phone number and message template payloads.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A file to upload to `/{phone-number-id}/media`
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl MediaUpload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk
    pub async fn from_path(path: impl AsRef<Path>, mime_type: impl Into<String>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self::new(file_name, mime_type, data))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadMediaResponse {
    pub id: String,
}

/// Download information for uploaded or received media
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaUrl {
    #[serde(default)]
    pub messaging_product: String,
    pub url: String,
    pub mime_type: String,
    pub sha256: String,
    pub file_size: u64,
    pub id: String,
}

/// WhatsApp business profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub websites: Vec<String>,

    /// Industry, e.g. `RETAIL`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture_url: Option<String>,
}

/// Profile fields requested by [`crate::WhatsAppClient::business_profile`]
pub const BUSINESS_PROFILE_FIELDS: &str =
    "about,address,description,email,websites,profile_picture_url,vertical";

/// `GET` wraps the profile in a `data` array
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BusinessProfileEnvelope {
    #[serde(default)]
    pub data: Vec<BusinessProfile>,
}

/// Profile update body
#[derive(Debug, Clone, Serialize)]
pub(crate) struct BusinessProfileUpdate<'a> {
    pub messaging_product: &'static str,

    #[serde(flatten)]
    pub profile: &'a BusinessProfile,
}

/// A phone number registered to the business account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub id: String,

    #[serde(default)]
    pub display_phone_number: String,

    #[serde(default)]
    pub verified_name: String,

    #[serde(default)]
    pub quality_rating: Option<String>,
}

/// Paginated list wrapper used by account listing endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging: Option<Paging>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursors: Option<Cursors>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cursors {
    #[serde(default)]
    pub before: String,

    #[serde(default)]
    pub after: String,
}

/// A message template as listed by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub id: String,
    pub name: String,
    pub language: String,
    pub status: String,
    pub category: String,

    #[serde(default)]
    pub components: Vec<serde_json::Value>,
}

/// Template category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateCategory {
    Authentication,
    Marketing,
    Utility,
}

/// Body for creating a template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    pub category: TemplateCategory,
    pub language: String,
    pub components: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTemplateResponse {
    pub id: String,
    pub status: String,
    pub category: String,
}

/// Template listing options
#[derive(Debug, Clone, Default)]
pub struct TemplateQuery {
    /// Page size, 20 when unset
    pub limit: Option<u32>,

    /// Cursor from a previous page
    pub after: Option<String>,
}

impl TemplateQuery {
    pub(crate) fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("limit", self.limit.unwrap_or(20).to_string())];
        if let Some(after) = &self.after {
            query.push(("after", after.clone()));
        }
        query
    }
}
