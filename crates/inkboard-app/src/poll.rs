//! Background board refresh for the native shell.
//!
//! The task runs on the current thread's `LocalSet`. The board is shared
//! through `Rc<RefCell<_>>` and is only borrowed between awaits.

use inkboard_core::{BoardSnapshot, BoardState, RefreshSchedule, RemoteStore};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Handle to a running refresh task. Dropping it stops the task.
pub struct PollHandle {
    stop_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Stop ticking. A refresh already in flight is abandoned and its
    /// result never applied.
    pub fn stop(&mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(handle) = self.handle.take() {
            handle.abort();
            log::debug!("Refresh task stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Periodically re-fetches the pinned threads and the thread list into a
/// shared [`BoardState`].
pub struct PollTask<S> {
    store: Arc<S>,
    board: Rc<RefCell<BoardState>>,
    interval: Duration,
}

impl<S: RemoteStore + 'static> PollTask<S> {
    pub fn new(store: Arc<S>, board: Rc<RefCell<BoardState>>, interval: Duration) -> Self {
        Self {
            store,
            board,
            interval,
        }
    }

    /// Spawn onto the current `LocalSet`. `on_refresh` runs after every
    /// applied refresh.
    ///
    /// # Panics
    /// Panics if called outside a `LocalSet`.
    pub fn spawn<F>(self, mut on_refresh: F) -> PollHandle
    where
        F: FnMut(&BoardState) + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let PollTask {
            store,
            board,
            interval,
        } = self;

        let handle = tokio::task::spawn_local(async move {
            let mut schedule = RefreshSchedule::new(interval);
            schedule.start(Instant::now().into_std());

            // The next deadline counts from when the previous refresh finished.
            while let Some(due) = schedule.next_due() {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = tokio::time::sleep_until(Instant::from_std(due)) => {
                        if !schedule.is_due(Instant::now().into_std()) {
                            continue;
                        }
                        log::debug!("Refreshing board");
                        let snapshot = BoardSnapshot::fetch(store.as_ref()).await;
                        if *stop_rx.borrow() {
                            break;
                        }
                        let mut board = board.borrow_mut();
                        board.apply(snapshot);
                        schedule.mark_run(Instant::now().into_std());
                        on_refresh(&board);
                    }
                }
            }
            schedule.stop();
            log::debug!("Refresh loop exited after {} runs", schedule.runs());
        });

        PollHandle {
            stop_tx,
            handle: Some(handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use inkboard_core::MemoryStore;
    use tokio::task::LocalSet;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap()
    }

    #[test]
    fn test_poll_refreshes_board() {
        let store = Arc::new(MemoryStore::new());
        store.insert_thread("Cardiology", Utc::now()).unwrap();
        let board = Rc::new(RefCell::new(BoardState::new()));
        let ticks = Rc::new(RefCell::new(0));

        runtime().block_on(LocalSet::new().run_until(async {
            let sink = ticks.clone();
            let mut handle = PollTask::new(store.clone(), board.clone(), Duration::from_millis(10))
                .spawn(move |_| *sink.borrow_mut() += 1);
            assert!(handle.is_running());

            tokio::time::sleep(Duration::from_millis(60)).await;
            handle.stop();
            assert!(!handle.is_running());
        }));

        assert!(*ticks.borrow() >= 1);
        assert_eq!(board.borrow().threads().len(), 1);
    }

    #[test]
    fn test_stopped_task_makes_no_calls() {
        let store = Arc::new(MemoryStore::new());
        let board = Rc::new(RefCell::new(BoardState::new()));

        runtime().block_on(LocalSet::new().run_until(async {
            let handle = PollTask::new(store.clone(), board.clone(), Duration::from_millis(20))
                .spawn(|_| {});
            drop(handle);
            tokio::time::sleep(Duration::from_millis(80)).await;
        }));

        assert_eq!(store.call_count(), 0);
    }

    #[test]
    fn test_first_refresh_waits_one_interval() {
        let store = Arc::new(MemoryStore::new());
        let board = Rc::new(RefCell::new(BoardState::new()));
        let ticks = Rc::new(RefCell::new(0));

        runtime().block_on(LocalSet::new().run_until(async {
            let sink = ticks.clone();
            let mut handle = PollTask::new(store.clone(), board.clone(), Duration::from_millis(500))
                .spawn(move |_| *sink.borrow_mut() += 1);
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(handle.is_running());
            handle.stop();
        }));

        assert_eq!(*ticks.borrow(), 0);
        assert_eq!(store.call_count(), 0);
    }
}
