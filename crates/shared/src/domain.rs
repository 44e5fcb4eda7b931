use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(AccountId);
id_newtype!(UserId);
id_newtype!(PostId);
id_newtype!(AssetId);
id_newtype!(SessionId);

/// Generates a client-side document/file id accepted by the platform
/// (at most 36 chars of `[a-zA-Z0-9]`).
pub fn unique_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    Video,
}

impl AssetKind {
    pub const IMAGE_MIME_TYPES: &'static [&'static str] = &["image/png", "image/jpg", "image/jpeg"];
    pub const VIDEO_MIME_TYPES: &'static [&'static str] = &["video/mp4", "video/gif"];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Video => "video",
        }
    }

    pub fn accepted_mime_types(self) -> &'static [&'static str] {
        match self {
            AssetKind::Image => Self::IMAGE_MIME_TYPES,
            AssetKind::Video => Self::VIDEO_MIME_TYPES,
        }
    }

    pub fn accepts(self, mime_type: &str) -> bool {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        self.accepted_mime_types().contains(&mime_type.as_str())
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier handed back by the platform after a file upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    pub asset_id: AssetId,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageGravity {
    Center,
    Top,
    TopLeft,
    TopRight,
    Left,
    Right,
    Bottom,
    BottomLeft,
    BottomRight,
}

impl ImageGravity {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageGravity::Center => "center",
            ImageGravity::Top => "top",
            ImageGravity::TopLeft => "top-left",
            ImageGravity::TopRight => "top-right",
            ImageGravity::Left => "left",
            ImageGravity::Right => "right",
            ImageGravity::Bottom => "bottom",
            ImageGravity::BottomLeft => "bottom-left",
            ImageGravity::BottomRight => "bottom-right",
        }
    }
}

/// How an uploaded asset should be served back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssetVariant {
    /// Raw file as stored.
    View,
    /// Server-side resized image.
    Preview {
        width: u32,
        height: u32,
        gravity: ImageGravity,
        quality: u8,
    },
}

impl AssetVariant {
    pub const THUMBNAIL_PREVIEW: AssetVariant = AssetVariant::Preview {
        width: 2000,
        height: 2000,
        gravity: ImageGravity::Top,
        quality: 100,
    };

    /// Variant used for freshly uploaded post assets of the given kind.
    pub fn for_kind(kind: AssetKind) -> Self {
        match kind {
            AssetKind::Image => Self::THUMBNAIL_PREVIEW,
            AssetKind::Video => Self::View,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub session_id: SessionId,
    pub account_id: AccountId,
    /// Empty when the platform keeps the session in a cookie only.
    #[serde(default)]
    pub secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub account_id: AccountId,
    pub email: String,
    pub username: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account_id: AccountId,
    pub email: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
}

impl AccountInfo {
    /// Id that owns posts: the profile document id when the account has one.
    pub fn owner_id(&self) -> Option<&UserId> {
        self.profile.as_ref().map(|profile| &profile.user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: PostId,
    pub title: String,
    pub prompt: String,
    pub thumbnail_url: String,
    pub video_url: String,
    pub creator_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<UserProfile>,
    pub created_at: DateTime<Utc>,
}

/// Fields of a post about to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub prompt: String,
    pub thumbnail_url: String,
    pub video_url: String,
    pub creator_id: UserId,
}
