//! Remote data-store contract for threads and posts.
//!
//! The board owns no persistence. Every read and write goes through a
//! [`RemoteStore`], which the application backs with the hosted REST service
//! and tests back with [`MemoryStore`].

mod memory;

pub use memory::{MemoryIdentity, MemoryStore};

use crate::board::{NewPost, NewThread, Post, Thread, ThreadId};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Remote failures (network, auth, query).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request failed with status {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Not authorized: {0}")]
    Unauthorized(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Store error: {0}")]
    Other(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Ordering by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first.
    Ascending,
    /// Newest first.
    Descending,
}

impl SortOrder {
    /// PostgREST `order=` suffix.
    pub fn as_query(self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// Trait for the remote board backend.
///
/// All calls run on the single UI control flow, so no `Send` bound is
/// required of the returned futures.
pub trait RemoteStore {
    /// List all threads by creation time.
    fn list_threads(&self, order: SortOrder) -> BoxFuture<'_, StoreResult<Vec<Thread>>>;

    /// Newest thread with exactly this title. `None` is a normal outcome.
    fn get_thread_by_title(&self, title: &str) -> BoxFuture<'_, StoreResult<Option<Thread>>>;

    /// Create a thread. Titles are validated by [`NewThread::validated`]
    /// before this is reachable.
    fn create_thread(&self, thread: &NewThread) -> BoxFuture<'_, StoreResult<Thread>>;

    /// List the posts of a thread by creation time.
    fn list_posts(&self, thread_id: ThreadId, order: SortOrder)
    -> BoxFuture<'_, StoreResult<Vec<Post>>>;

    /// Create a post.
    fn create_post(&self, post: &NewPost) -> BoxFuture<'_, StoreResult<Post>>;
}
