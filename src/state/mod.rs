//! Shared live state.
//!
//! Every published value lives in its own [`Published`] slot. Writers
//! replace the whole value; readers get an `Arc` to a value that some
//! `publish` call finished building, so a snapshot is never torn.

use crate::models::{CommitFeed, Status, Update};
use std::sync::{Arc, PoisonError, RwLock};

/// A single atomically replaceable value.
#[derive(Debug)]
pub struct Published<T> {
    current: RwLock<Arc<T>>,
}

impl<T> Published<T> {
    pub fn new(initial: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Replace the current value. Last writer wins.
    pub fn publish(&self, value: T) {
        let next = Arc::new(value);
        let previous = {
            // The guarded pointer is always whole, so a poisoned lock is still usable.
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, next)
        };
        drop(previous);
    }

    /// The most recently published value.
    pub fn snapshot(&self) -> Arc<T> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }
}

impl<T: Default> Default for Published<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// The status banner, latest update and commit feed currently served.
///
/// The three slots are independent: replacing one never waits on the
/// others, and no operation spans more than one.
#[derive(Debug, Default)]
pub struct LiveState {
    status: Published<Status>,
    update: Published<Option<Update>>,
    commits: Published<CommitFeed>,
}

impl LiveState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_status(&self, status: Status) {
        self.status.publish(status);
    }

    pub fn publish_update(&self, update: Update) {
        self.update.publish(Some(update));
    }

    pub fn publish_commits(&self, feed: CommitFeed) {
        self.commits.publish(feed);
    }

    pub fn status(&self) -> Arc<Status> {
        self.status.snapshot()
    }

    /// `None` until the first update has been published.
    pub fn update(&self) -> Arc<Option<Update>> {
        self.update.snapshot()
    }

    pub fn commits(&self) -> Arc<CommitFeed> {
        self.commits.snapshot()
    }
}
