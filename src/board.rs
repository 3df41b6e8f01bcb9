//! Shared board state: the task registry plus load status and the signed-in user.
//!
//! Readers (rendering, the drag tracker) only get snapshots. Writes go through the
//! crate-private methods used by the mutation coordinator and the bootstrap sequencer.

use std::sync::{Mutex, MutexGuard};

use crate::registry::TaskRegistry;
use crate::types::{CurrentUser, Task, TaskId, TaskStatus};

#[derive(Debug, Default)]
struct BoardInner {
    registry: TaskRegistry,
    loading: bool,
    load_error: Option<String>,
    user: Option<CurrentUser>,
    revision: u64,
}

#[derive(Debug, Default)]
pub struct Board {
    inner: Mutex<BoardInner>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BoardInner> {
        match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().registry.list().to_vec()
    }

    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.lock().registry.get(id).cloned()
    }

    pub fn column(&self, status: TaskStatus) -> Vec<Task> {
        self.lock()
            .registry
            .column(status)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn load_error(&self) -> Option<String> {
        self.lock().load_error.clone()
    }

    pub fn user(&self) -> Option<CurrentUser> {
        self.lock().user.clone()
    }

    /// Bumped on every registry write; a renderer redraws when it changes.
    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    /// Runs `f` against the registry under one lock so readers never observe a half-applied
    /// change. Nothing runs while signed out. `f` reports whether it changed anything; the
    /// revision only moves on `Some`.
    pub(crate) fn try_update<R>(&self, f: impl FnOnce(&mut TaskRegistry) -> Option<R>) -> Option<R> {
        let mut inner = self.lock();
        inner.user.as_ref()?;
        let result = f(&mut inner.registry)?;
        inner.revision += 1;
        Some(result)
    }

    pub(crate) fn begin_loading(&self) {
        let mut inner = self.lock();
        inner.loading = true;
        inner.load_error = None;
    }

    pub(crate) fn sign_in(&self, user: CurrentUser) {
        self.lock().user = Some(user);
    }

    pub(crate) fn finish_load(&self, tasks: Vec<Task>) {
        let mut inner = self.lock();
        inner.registry.load(tasks);
        inner.loading = false;
        inner.load_error = None;
        inner.revision += 1;
    }

    pub(crate) fn fail_load(&self, message: String) {
        let mut inner = self.lock();
        inner.loading = false;
        inner.load_error = Some(message);
    }

    /// Drops everything: no user, empty registry, not loading.
    pub(crate) fn reset(&self) {
        let mut inner = self.lock();
        inner.registry.clear();
        inner.user = None;
        inner.loading = false;
        inner.load_error = None;
        inner.revision += 1;
    }
}
