//! Async fetch results exposed as observable `{value, is_loading, error}` state.
//!
//! Every fetch is tagged with a sequence number when it is issued. A result is
//! applied only if its tag is still the newest one issued for that query, so
//! overlapping refetches settle on the most recently *requested* data rather
//! than whichever response arrived last.

use std::{future::Future, sync::Arc};

use async_trait::async_trait;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, warn};

use crate::{error::GatewayError, gateway::GatewayResult};

/// A zero-argument fetch. Captured parameters live in the implementing value.
#[async_trait]
pub trait FetchOperation: Send + Sync + 'static {
    type Output: Clone + Send + Sync + 'static;

    async fn fetch(&self) -> GatewayResult<Self::Output>;
}

/// Adapts a closure returning a future into a [`FetchOperation`].
pub struct FnFetch<F> {
    f: F,
}

pub fn fetch_fn<F, Fut, T>(f: F) -> FnFetch<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GatewayResult<T>> + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    FnFetch { f }
}

#[async_trait]
impl<F, Fut, T> FetchOperation for FnFetch<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GatewayResult<T>> + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    type Output = T;

    async fn fetch(&self) -> GatewayResult<T> {
        (self.f)().await
    }
}

#[derive(Debug, Clone)]
pub struct QueryState<T> {
    pub value: Option<T>,
    pub is_loading: bool,
    pub error: Option<GatewayError>,
    /// Tag of the newest fetch issued so far.
    pub request_seq: u64,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            value: None,
            is_loading: false,
            error: None,
            request_seq: 0,
        }
    }
}

struct QueryInner<F: FetchOperation> {
    operation: F,
    state: watch::Sender<QueryState<F::Output>>,
}

impl<F: FetchOperation> QueryInner<F> {
    fn issue(&self) -> u64 {
        let mut seq = 0;
        self.state.send_modify(|state| {
            state.request_seq += 1;
            state.is_loading = true;
            seq = state.request_seq;
        });
        seq
    }

    fn settle(&self, seq: u64, result: GatewayResult<F::Output>) -> bool {
        self.state.send_if_modified(|state| {
            if state.request_seq != seq {
                debug!(
                    seq,
                    latest = state.request_seq,
                    "query: discarding superseded result"
                );
                return false;
            }
            state.is_loading = false;
            match result {
                Ok(value) => {
                    state.value = Some(value);
                    state.error = None;
                }
                Err(err) => {
                    warn!(seq, "query: fetch failed: {err}");
                    state.error = Some(err);
                }
            }
            true
        })
    }
}

/// Observable result of a remote fetch.
///
/// Must be created inside a tokio runtime: construction immediately spawns the
/// first fetch. Fetches are never cancelled or timed out; superseded ones run
/// to completion and their results are dropped.
pub struct RemoteQuery<F: FetchOperation> {
    inner: Arc<QueryInner<F>>,
}

impl<F: FetchOperation> RemoteQuery<F> {
    pub fn new(operation: F) -> Self {
        let (state, _) = watch::channel(QueryState::default());
        let query = Self {
            inner: Arc::new(QueryInner { operation, state }),
        };
        let _initial = query.refetch();
        query
    }

    /// Issues a new fetch. The returned handle completes once the result has
    /// been applied or discarded.
    pub fn refetch(&self) -> JoinHandle<()> {
        let seq = self.inner.issue();
        debug!(seq, "query: fetch issued");
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = inner.operation.fetch().await;
            inner.settle(seq, result);
        })
    }

    pub fn state(&self) -> QueryState<F::Output> {
        self.inner.state.borrow().clone()
    }

    pub fn value(&self) -> Option<F::Output> {
        self.inner.state.borrow().value.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    pub fn error(&self) -> Option<GatewayError> {
        self.inner.state.borrow().error.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<F::Output>> {
        self.inner.state.subscribe()
    }

    /// Waits until the newest issued fetch has settled and returns that state.
    pub async fn settled(&self) -> QueryState<F::Output> {
        let mut rx = self.subscribe();
        let state = match rx.wait_for(|state| !state.is_loading).await {
            Ok(state) => state.clone(),
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => self.state(),
        };
        state
    }
}

#[cfg(test)]
#[path = "tests/remote_query_tests.rs"]
mod tests;
