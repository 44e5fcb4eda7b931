use std::{fmt, path::PathBuf};

use shared::{
    domain::AssetKind,
    error::{ApiError, ErrorCode},
};
use thiserror::Error;

/// Failure of a single call against the content platform.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("network request failed: {0}")]
    Network(String),
    #[error("platform rejected request: {0}")]
    Platform(ApiError),
    #[error("unexpected platform response: {0}")]
    InvalidResponse(String),
    #[error("failed to read asset {}: {message}", path.display())]
    Asset { path: PathBuf, message: String },
}

impl GatewayError {
    pub fn is_auth(&self) -> bool {
        match self {
            GatewayError::Auth(_) => true,
            GatewayError::Platform(api) => api.code.is_auth(),
            _ => false,
        }
    }

    /// Reclassifies platform auth rejections for account/session calls.
    pub(crate) fn into_auth(self) -> Self {
        match self {
            GatewayError::Platform(api) if api.code.is_auth() => GatewayError::Auth(api.message),
            other => other,
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            GatewayError::Platform(api) => Some(api.code),
            GatewayError::Auth(_) => Some(ErrorCode::Unauthorized),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            GatewayError::InvalidResponse(value.to_string())
        } else {
            GatewayError::Network(value.to_string())
        }
    }
}

impl From<ApiError> for GatewayError {
    fn from(value: ApiError) -> Self {
        GatewayError::Platform(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Title,
    Prompt,
    Thumbnail,
    Video,
    Owner,
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormField::Title => "title",
            FormField::Prompt => "prompt",
            FormField::Thumbnail => "thumbnail",
            FormField::Video => "video",
            FormField::Owner => "owner",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required fields: {}", join_fields(.missing))]
pub struct ValidationError {
    pub missing: Vec<FormField>,
}

fn join_fields(fields: &[FormField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a submission is already in progress")]
    InFlight,
    #[error("{kind} upload failed: {source}")]
    Upload {
        kind: AssetKind,
        #[source]
        source: GatewayError,
    },
    #[error("failed to create post record: {0}")]
    Persistence(#[source] GatewayError),
}

impl SubmissionError {
    /// Whether the platform may hold uploaded assets that no record references.
    pub fn may_leave_orphans(&self) -> bool {
        matches!(
            self,
            SubmissionError::Upload { .. } | SubmissionError::Persistence(_)
        )
    }
}
