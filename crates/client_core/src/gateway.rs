//! Seam between the client core and the hosted content platform.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use shared::{
    domain::{AccountInfo, AssetKind, AssetRef, AssetVariant, NewPost, PostRecord, SessionToken},
    protocol::PlatformQuery,
};
use url::Url;

use crate::error::GatewayError;

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

pub const ATTR_TITLE: &str = "title";
pub const ATTR_CREATOR: &str = "creator";
pub const ATTR_CREATED_AT: &str = "$createdAt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Equal { attribute: String, value: String },
    Contains { attribute: String, value: String },
}

/// Parameters of a document listing against the posts collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub order_desc: Option<String>,
    pub limit: Option<u32>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equal(mut self, attribute: &str, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Equal {
            attribute: attribute.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn contains(mut self, attribute: &str, value: impl Into<String>) -> Self {
        self.filters.push(Filter::Contains {
            attribute: attribute.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn newest_first(mut self) -> Self {
        self.order_desc = Some(ATTR_CREATED_AT.to_string());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn to_platform_queries(&self) -> Vec<PlatformQuery> {
        let mut queries = self
            .filters
            .iter()
            .map(|filter| match filter {
                Filter::Equal { attribute, value } => PlatformQuery::equal(attribute, value),
                Filter::Contains { attribute, value } => PlatformQuery::contains(attribute, value),
            })
            .collect::<Vec<_>>();
        if let Some(attribute) = &self.order_desc {
            queries.push(PlatformQuery::order_desc(attribute));
        }
        if let Some(limit) = self.limit {
            queries.push(PlatformQuery::limit(limit));
        }
        queries
    }
}

/// A locally picked file. Owned by whoever picked it; the core only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetHandle {
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: String,
}

impl AssetHandle {
    pub fn new(
        path: impl Into<PathBuf>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Builds a handle for a file on disk, guessing the MIME type from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self::new(path, file_name, mime_type)
    }

    /// Like [`AssetHandle::from_path`], but resolves the MIME type for the slot
    /// the file was picked for. A `.gif` picked as a video uploads as `video/gif`.
    pub fn for_kind(path: impl AsRef<Path>, kind: AssetKind) -> Self {
        let mut handle = Self::from_path(path);
        if kind == AssetKind::Video && handle.mime_type == "image/gif" {
            handle.mime_type = "video/gif".to_string();
        }
        handle
    }

    pub async fn read_bytes(&self) -> GatewayResult<Vec<u8>> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|err| GatewayError::Asset {
                path: self.path.clone(),
                message: err.to_string(),
            })
    }
}

#[async_trait]
pub trait ContentGateway: Send + Sync {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> GatewayResult<SessionToken>;
    async fn create_session(&self, email: &str, password: &str) -> GatewayResult<SessionToken>;
    async fn current_account(&self) -> GatewayResult<AccountInfo>;
    async fn delete_session(&self) -> GatewayResult<()>;
    async fn list_records(&self, query: &ListQuery) -> GatewayResult<Vec<PostRecord>>;
    async fn create_record(&self, post: NewPost) -> GatewayResult<PostRecord>;
    async fn upload_asset(&self, asset: &AssetHandle) -> GatewayResult<AssetRef>;
    async fn resolve_asset_url(
        &self,
        asset: &AssetRef,
        kind: AssetKind,
        variant: AssetVariant,
    ) -> GatewayResult<Url>;
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
