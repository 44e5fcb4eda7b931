use std::sync::Arc;

use async_trait::async_trait;
use shared::domain::{PostRecord, UserId};
use tracing::debug;

use crate::{
    gateway::{ContentGateway, GatewayResult, ListQuery, ATTR_CREATOR, ATTR_TITLE},
    remote_query::FetchOperation,
};

/// Size of the "latest posts" strip on the home feed.
pub const DEFAULT_LATEST_LIMIT: u32 = 7;

/// Named listings of the posts collection.
#[derive(Clone)]
pub struct QueryCatalog {
    gateway: Arc<dyn ContentGateway>,
}

impl QueryCatalog {
    pub fn new(gateway: Arc<dyn ContentGateway>) -> Self {
        Self { gateway }
    }

    /// Every post, in whatever order the platform returns them.
    pub fn all(&self) -> PostQuery {
        self.build("all", ListQuery::new())
    }

    pub fn latest(&self, limit: u32) -> PostQuery {
        self.build("latest", ListQuery::new().newest_first().limit(limit))
    }

    pub fn by_owner(&self, owner_id: &UserId) -> PostQuery {
        self.build(
            "by_owner",
            ListQuery::new()
                .equal(ATTR_CREATOR, owner_id.as_str())
                .newest_first(),
        )
    }

    /// Title substring match; case handling is up to the platform.
    pub fn search(&self, substring: &str) -> PostQuery {
        self.build("search", ListQuery::new().contains(ATTR_TITLE, substring))
    }

    fn build(&self, name: &'static str, query: ListQuery) -> PostQuery {
        PostQuery {
            gateway: Arc::clone(&self.gateway),
            name,
            query,
        }
    }
}

/// A bound listing, usable as the fetch of a `RemoteQuery`.
#[derive(Clone)]
pub struct PostQuery {
    gateway: Arc<dyn ContentGateway>,
    name: &'static str,
    query: ListQuery,
}

impl PostQuery {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn list_query(&self) -> &ListQuery {
        &self.query
    }
}

#[async_trait]
impl FetchOperation for PostQuery {
    type Output = Vec<PostRecord>;

    async fn fetch(&self) -> GatewayResult<Vec<PostRecord>> {
        let posts = self.gateway.list_records(&self.query).await?;
        debug!(query = self.name, count = posts.len(), "catalog: posts listed");
        Ok(posts)
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
