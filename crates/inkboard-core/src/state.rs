//! Board view state: pinned threads, the thread list, the selected thread
//! and its posts.
//!
//! Everything here is a cache of the remote store. A refresh builds a
//! [`BoardSnapshot`] and applies it; failed fetches are logged and leave
//! the affected part of the view as it was, except pinned slots, which are
//! cleared so a stale special thread is never shown.

use crate::board::{NewThread, Post, SpecialThread, Thread, ThreadId, ValidationError};
use crate::composer::{PostComposer, SubmitError};
use crate::store::{RemoteStore, SortOrder, StoreError, StoreResult};
use thiserror::Error;

/// Why creating a thread did not go through.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Could not create thread: {0}")]
    Remote(#[from] StoreError),
}

/// Latest thread for each special title, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinnedThreads {
    slots: [Option<Thread>; 3],
}

impl PinnedThreads {
    fn index(special: SpecialThread) -> usize {
        match special {
            SpecialThread::TheCase => 0,
            SpecialThread::TopNews => 1,
            SpecialThread::DrawIt => 2,
        }
    }

    pub fn get(&self, special: SpecialThread) -> Option<&Thread> {
        self.slots[Self::index(special)].as_ref()
    }

    pub fn set(&mut self, special: SpecialThread, thread: Option<Thread>) {
        self.slots[Self::index(special)] = thread;
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpecialThread, Option<&Thread>)> {
        SpecialThread::ALL.into_iter().map(|special| (special, self.get(special)))
    }
}

/// Result of one round of fetches, applied in a single step.
#[derive(Debug, Clone)]
pub struct BoardSnapshot {
    pub pinned: Vec<(SpecialThread, StoreResult<Option<Thread>>)>,
    pub threads: StoreResult<Vec<Thread>>,
}

impl BoardSnapshot {
    /// Fetch the pinned threads, then the thread list (newest first).
    pub async fn fetch<S: RemoteStore + ?Sized>(store: &S) -> Self {
        let mut pinned = Vec::with_capacity(SpecialThread::ALL.len());
        for special in SpecialThread::ALL {
            pinned.push((special, store.get_thread_by_title(special.title()).await));
        }
        let threads = store.list_threads(SortOrder::Descending).await;
        Self { pinned, threads }
    }
}

/// What the board view shows.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    pinned: PinnedThreads,
    threads: Vec<Thread>,
    selected: Option<ThreadId>,
    posts: Vec<Post>,
    /// Contents of the new-thread input.
    pub new_thread_title: String,
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pinned(&self) -> &PinnedThreads {
        &self.pinned
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn selected(&self) -> Option<ThreadId> {
        self.selected
    }

    /// The selected thread, looked up in the list and then the pinned slots.
    pub fn selected_thread(&self) -> Option<&Thread> {
        let id = self.selected?;
        self.threads
            .iter()
            .chain(self.pinned.iter().filter_map(|(_, thread)| thread))
            .find(|thread| thread.id == id)
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    /// Posts with their 1-based position in the thread.
    pub fn numbered_posts(&self) -> impl Iterator<Item = (usize, &Post)> {
        self.posts.iter().enumerate().map(|(i, post)| (i + 1, post))
    }

    pub fn apply(&mut self, snapshot: BoardSnapshot) {
        for (special, result) in snapshot.pinned {
            match result {
                Ok(thread) => self.pinned.set(special, thread),
                Err(e) => {
                    log::error!("Error fetching {} thread: {}", special.title(), e);
                    self.pinned.set(special, None);
                }
            }
        }
        match snapshot.threads {
            Ok(threads) => {
                log::debug!("Loaded {} threads", threads.len());
                self.threads = threads;
            }
            Err(e) => log::error!("Error fetching threads: {}", e),
        }
    }

    /// Re-fetch pinned threads and the thread list.
    pub async fn refresh<S: RemoteStore + ?Sized>(&mut self, store: &S) {
        let snapshot = BoardSnapshot::fetch(store).await;
        self.apply(snapshot);
    }

    /// Select a thread and load its posts (oldest first).
    pub async fn select_thread<S: RemoteStore + ?Sized>(
        &mut self,
        store: &S,
        thread_id: ThreadId,
    ) -> StoreResult<()> {
        if self.selected != Some(thread_id) {
            self.posts.clear();
        }
        self.selected = Some(thread_id);
        self.reload_posts(store).await
    }

    /// Reload the posts of the selected thread. On failure the current posts
    /// stay in place.
    pub async fn reload_posts<S: RemoteStore + ?Sized>(&mut self, store: &S) -> StoreResult<()> {
        let Some(thread_id) = self.selected else {
            return Ok(());
        };
        match store.list_posts(thread_id, SortOrder::Ascending).await {
            Ok(posts) => {
                self.posts = posts;
                Ok(())
            }
            Err(e) => {
                log::error!("Error fetching posts for thread {}: {}", thread_id, e);
                Err(e)
            }
        }
    }

    /// Create a thread from the new-thread input. Reserved and empty titles
    /// are refused without a remote call. On success the input is cleared
    /// and the thread list reloaded.
    pub async fn submit_thread<S: RemoteStore + ?Sized>(
        &mut self,
        store: &S,
    ) -> Result<Thread, BoardError> {
        let new_thread = NewThread::validated(&self.new_thread_title).inspect_err(|e| {
            log::warn!("Thread not created: {}", e);
        })?;
        let thread = store.create_thread(&new_thread).await.inspect_err(|e| {
            log::error!("Error creating thread: {}", e);
        })?;
        log::info!("Thread {} created: {}", thread.id, thread.title);
        self.new_thread_title.clear();

        match store.list_threads(SortOrder::Descending).await {
            Ok(threads) => self.threads = threads,
            Err(e) => log::error!("Error fetching threads: {}", e),
        }
        Ok(thread)
    }

    /// Submit the composer's reply to the selected thread, then reload posts.
    pub async fn submit_post<S: RemoteStore + ?Sized>(
        &mut self,
        store: &S,
        composer: &mut PostComposer,
    ) -> Result<Post, SubmitError> {
        let post = composer.submit(store, self.selected).await?;
        // The post exists remotely even if the reload fails.
        let _ = self.reload_posts(store).await;
        Ok(post)
    }
}
