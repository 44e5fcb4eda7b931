//! JSON shapes exchanged with the hosted platform's REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{
    AccountId, AccountInfo, AssetId, AssetRef, NewPost, PostId, PostRecord, SessionId,
    SessionToken, UserId, UserProfile,
};

/// One entry of the `queries[]` list accepted by the document listing endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformQuery {
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
}

impl PlatformQuery {
    pub fn equal(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            method: "equal".into(),
            attribute: Some(attribute.into()),
            values: vec![Value::String(value.into())],
        }
    }

    pub fn contains(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            method: "contains".into(),
            attribute: Some(attribute.into()),
            values: vec![Value::String(value.into())],
        }
    }

    pub fn order_desc(attribute: impl Into<String>) -> Self {
        Self {
            method: "orderDesc".into(),
            attribute: Some(attribute.into()),
            values: Vec::new(),
        }
    }

    pub fn limit(limit: u32) -> Self {
        Self {
            method: "limit".into(),
            attribute: None,
            values: vec![Value::from(limit)],
        }
    }

    pub fn to_query_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentList<T> {
    pub total: u64,
    pub documents: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDocumentRequest<T> {
    #[serde(rename = "documentId")]
    pub document_id: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileDocument {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "accountId")]
    pub account_id: String,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub avatar: String,
}

impl From<ProfileDocument> for UserProfile {
    fn from(value: ProfileDocument) -> Self {
        Self {
            user_id: UserId(value.id),
            account_id: AccountId(value.account_id),
            email: value.email,
            username: value.username,
            avatar_url: value.avatar,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileDocumentData {
    #[serde(rename = "accountId")]
    pub account_id: String,
    pub email: String,
    pub username: String,
    pub avatar: String,
}

/// Relationship attribute: a bare id, or the expanded profile document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreatorField {
    Id(String),
    Profile(ProfileDocument),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDocument {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "$createdAt")]
    pub created_at: DateTime<Utc>,
    pub title: String,
    #[serde(default)]
    pub prompt: String,
    pub thumbnail: String,
    pub video: String,
    pub creator: CreatorField,
}

impl From<PostDocument> for PostRecord {
    fn from(value: PostDocument) -> Self {
        let (creator_id, creator) = match value.creator {
            CreatorField::Id(id) => (UserId(id), None),
            CreatorField::Profile(profile) => {
                (UserId(profile.id.clone()), Some(UserProfile::from(profile)))
            }
        };
        Self {
            id: PostId(value.id),
            title: value.title,
            prompt: value.prompt,
            thumbnail_url: value.thumbnail,
            video_url: value.video,
            creator_id,
            creator,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDocumentData {
    pub title: String,
    pub prompt: String,
    pub thumbnail: String,
    pub video: String,
    pub creator: String,
}

impl From<NewPost> for PostDocumentData {
    fn from(value: NewPost) -> Self {
        Self {
            title: value.title,
            prompt: value.prompt,
            thumbnail: value.thumbnail_url,
            video: value.video_url,
            creator: value.creator_id.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

impl From<AccountResponse> for AccountInfo {
    fn from(value: AccountResponse) -> Self {
        Self {
            account_id: AccountId(value.id),
            email: value.email,
            display_name: value.name,
            profile: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default, rename = "expire")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<SessionResponse> for SessionToken {
    fn from(value: SessionResponse) -> Self {
        Self {
            session_id: SessionId(value.id),
            account_id: AccountId(value.user_id),
            secret: value.secret,
            expires_at: value.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResponse {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default, rename = "sizeOriginal")]
    pub size_original: u64,
    #[serde(default, rename = "mimeType")]
    pub mime_type: Option<String>,
}

impl From<FileResponse> for AssetRef {
    fn from(value: FileResponse) -> Self {
        Self {
            asset_id: AssetId(value.id),
            size_bytes: value.size_original,
            mime_type: value.mime_type,
        }
    }
}
