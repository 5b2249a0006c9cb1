//! Named scheduled tasks and per-panel in-flight flags.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tracing::debug;

/// A single delayed task owned by the component that scheduled it.
/// Rescheduling aborts the pending one.
pub struct TaskSlot {
    name: &'static str,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TaskSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handle: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn schedule<F>(&self, delay: Duration, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let name = self.name;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!(task = name, "scheduled task firing");
            work.await;
        });
        if let Some(previous) = self.handle.lock().await.replace(task) {
            if !previous.is_finished() {
                debug!(task = name, "rescheduled, aborting pending run");
                previous.abort();
            }
        }
    }

    pub async fn cancel(&self) {
        if let Some(handle) = self.handle.lock().await.take() {
            handle.abort();
        }
    }

    pub async fn is_pending(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}

/// Fire-and-forget tasks that still get aborted on teardown.
#[derive(Default)]
pub struct DetachedTasks {
    set: Mutex<JoinSet<()>>,
}

impl DetachedTasks {
    pub async fn spawn<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut set = self.set.lock().await;
        while set.try_join_next().is_some() {}
        set.spawn(work);
    }

    pub async fn abort_all(&self) {
        self.set.lock().await.abort_all();
    }
}

/// Loading flag that stays set while any load for its panel is in flight.
#[derive(Debug, Default)]
pub struct LoadingFlag(AtomicUsize);

impl LoadingFlag {
    pub fn enter(&self) -> LoadingGuard<'_> {
        self.0.fetch_add(1, Ordering::SeqCst);
        LoadingGuard(&self.0)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }
}

pub struct LoadingGuard<'a>(&'a AtomicUsize);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Guard flag admitting one holder at a time.
#[derive(Debug, Default)]
pub struct ExclusiveFlag(AtomicBool);

impl ExclusiveFlag {
    pub fn try_enter(&self) -> Option<ExclusiveGuard<'_>> {
        self.0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| ExclusiveGuard(&self.0))
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct ExclusiveGuard<'a>(&'a AtomicBool);

impl Drop for ExclusiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
