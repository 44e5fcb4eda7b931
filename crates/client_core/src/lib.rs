//! Client core for the media-sharing app: observable remote queries over the
//! posts collection and the two-asset post upload transaction.

pub mod catalog;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http_gateway;
pub mod remote_query;
pub mod upload;

pub use catalog::{PostQuery, QueryCatalog, DEFAULT_LATEST_LIMIT};
pub use error::{FormField, GatewayError, SubmissionError, ValidationError};
pub use gateway::{AssetHandle, ContentGateway, Filter, GatewayResult, ListQuery};
pub use http_gateway::HttpContentGateway;
pub use remote_query::{fetch_fn, FetchOperation, FnFetch, QueryState, RemoteQuery};
pub use upload::{UploadForm, UploadTransaction};

#[cfg(test)]
#[path = "tests/fake_gateway.rs"]
mod fake_gateway;
