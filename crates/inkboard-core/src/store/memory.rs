//! In-memory store and identity provider.

use super::{BoxFuture, RemoteStore, SortOrder, StoreError, StoreResult};
use crate::board::{NewPost, NewThread, Post, Thread, ThreadId};
use crate::session::{Credentials, Identity, Session, User};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

fn lock_error(e: impl std::fmt::Display) -> StoreError {
    StoreError::Other(format!("Lock error: {}", e))
}

fn offline_error() -> StoreError {
    StoreError::Network("store is offline".to_string())
}

/// In-memory board backend for testing and offline use.
///
/// Counts every remote call so callers can assert that locally rejected
/// input never reaches the store.
#[derive(Default)]
pub struct MemoryStore {
    threads: RwLock<Vec<Thread>>,
    posts: RwLock<Vec<Post>>,
    next_id: AtomicI64,
    calls: AtomicUsize,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of contract calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// While offline every call fails with [`StoreError::Network`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Insert a thread directly, bypassing title validation (admin path).
    /// Does not count as a call.
    pub fn insert_thread(&self, title: &str, created_at: DateTime<Utc>) -> StoreResult<Thread> {
        let thread = Thread {
            id: self.allocate_id(),
            title: title.to_string(),
            created_at,
        };
        self.threads.write().map_err(lock_error)?.push(thread.clone());
        Ok(thread)
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn begin_call(&self) -> StoreResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(offline_error());
        }
        Ok(())
    }
}

fn sort_threads(threads: &mut [Thread], order: SortOrder) {
    threads.sort_by_key(|t| (t.created_at, t.id));
    if order == SortOrder::Descending {
        threads.reverse();
    }
}

impl RemoteStore for MemoryStore {
    fn list_threads(&self, order: SortOrder) -> BoxFuture<'_, StoreResult<Vec<Thread>>> {
        Box::pin(async move {
            self.begin_call()?;
            let mut threads = self.threads.read().map_err(lock_error)?.clone();
            sort_threads(&mut threads, order);
            Ok(threads)
        })
    }

    fn get_thread_by_title(&self, title: &str) -> BoxFuture<'_, StoreResult<Option<Thread>>> {
        let title = title.to_string();
        Box::pin(async move {
            self.begin_call()?;
            let mut matching: Vec<Thread> = self
                .threads
                .read()
                .map_err(lock_error)?
                .iter()
                .filter(|t| t.title == title)
                .cloned()
                .collect();
            sort_threads(&mut matching, SortOrder::Descending);
            Ok(matching.into_iter().next())
        })
    }

    fn create_thread(&self, thread: &NewThread) -> BoxFuture<'_, StoreResult<Thread>> {
        let title = thread.title.clone();
        Box::pin(async move {
            self.begin_call()?;
            self.insert_thread(&title, Utc::now())
        })
    }

    fn list_posts(
        &self,
        thread_id: ThreadId,
        order: SortOrder,
    ) -> BoxFuture<'_, StoreResult<Vec<Post>>> {
        Box::pin(async move {
            self.begin_call()?;
            let mut posts: Vec<Post> = self
                .posts
                .read()
                .map_err(lock_error)?
                .iter()
                .filter(|p| p.thread_id == thread_id)
                .cloned()
                .collect();
            posts.sort_by_key(|p| (p.created_at, p.id));
            if order == SortOrder::Descending {
                posts.reverse();
            }
            Ok(posts)
        })
    }

    fn create_post(&self, post: &NewPost) -> BoxFuture<'_, StoreResult<Post>> {
        let post = post.clone();
        Box::pin(async move {
            self.begin_call()?;
            let exists = self
                .threads
                .read()
                .map_err(lock_error)?
                .iter()
                .any(|t| t.id == post.thread_id);
            if !exists {
                return Err(StoreError::Http {
                    status: 409,
                    message: format!("thread {} does not exist", post.thread_id),
                });
            }
            let created = Post {
                id: self.allocate_id(),
                thread_id: post.thread_id,
                content: post.content,
                author_name: post.author_name,
                is_drawing: post.is_drawing,
                created_at: Utc::now(),
            };
            self.posts.write().map_err(lock_error)?.push(created.clone());
            Ok(created)
        })
    }
}

/// In-memory identity provider. Sign-up requires no confirmation step
/// beyond returning `None`, after which the account can sign in.
#[derive(Default)]
pub struct MemoryIdentity {
    users: RwLock<HashMap<String, (String, String)>>,
    current: RwLock<Option<Session>>,
    next_token: AtomicUsize,
    offline: AtomicBool,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(offline_error());
        }
        Ok(())
    }
}

impl Identity for MemoryIdentity {
    fn sign_up(&self, credentials: &Credentials) -> BoxFuture<'_, StoreResult<Option<Session>>> {
        let credentials = credentials.clone();
        Box::pin(async move {
            self.check_online()?;
            let mut users = self.users.write().map_err(lock_error)?;
            if users.contains_key(&credentials.email) {
                return Err(StoreError::Http {
                    status: 422,
                    message: "User already registered".to_string(),
                });
            }
            let user_id = format!("user-{}", users.len() + 1);
            users.insert(credentials.email, (user_id, credentials.password));
            Ok(None)
        })
    }

    fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> BoxFuture<'_, StoreResult<Session>> {
        let credentials = credentials.clone();
        Box::pin(async move {
            self.check_online()?;
            let users = self.users.read().map_err(lock_error)?;
            let (user_id, password) = users
                .get(&credentials.email)
                .ok_or_else(|| StoreError::Unauthorized("Invalid login credentials".to_string()))?;
            if *password != credentials.password {
                return Err(StoreError::Unauthorized("Invalid login credentials".to_string()));
            }
            let token = self.next_token.fetch_add(1, Ordering::SeqCst);
            let session = Session {
                access_token: format!("token-{}", token),
                refresh_token: None,
                expires_at: None,
                user: User {
                    id: user_id.clone(),
                    email: Some(credentials.email.clone()),
                },
            };
            *self.current.write().map_err(lock_error)? = Some(session.clone());
            Ok(session)
        })
    }

    fn sign_out(&self, _session: &Session) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            self.check_online()?;
            *self.current.write().map_err(lock_error)? = None;
            Ok(())
        })
    }

    fn current_session(&self) -> BoxFuture<'_, StoreResult<Option<Session>>> {
        Box::pin(async move {
            self.check_online()?;
            Ok(self.current.read().map_err(lock_error)?.clone())
        })
    }
}
