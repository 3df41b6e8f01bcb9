//! Ordered in-memory task collection backing the rendered board.

use crate::types::{Task, TaskId, TaskPatch, TaskStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    pub fn column(&self, status: TaskStatus) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| task.status == status)
            .collect()
    }

    /// Replaces the task in place, or appends it when the id is new.
    pub fn upsert(&mut self, task: Task) {
        match self.position(task.id) {
            Some(index) => self.tasks[index] = task,
            None => self.tasks.push(task),
        }
    }

    pub fn insert_front(&mut self, task: Task) {
        match self.position(task.id) {
            Some(index) => self.tasks[index] = task,
            None => self.tasks.insert(0, task),
        }
    }

    /// Puts a task back where it used to be. Indices past the end append.
    pub fn restore(&mut self, index: usize, task: Task) {
        match self.position(task.id) {
            Some(current) => self.tasks[current] = task,
            None => {
                let index = index.min(self.tasks.len());
                self.tasks.insert(index, task);
            }
        }
    }

    pub fn remove(&mut self, id: TaskId) -> Option<(usize, Task)> {
        let index = self.position(id)?;
        Some((index, self.tasks.remove(index)))
    }

    /// Returns `false` when the id is unknown; the registry is left unchanged.
    pub fn patch(&mut self, id: TaskId, patch: &TaskPatch) -> bool {
        match self.tasks.iter_mut().find(|task| task.id == id) {
            Some(task) => {
                patch.apply_to(task);
                true
            }
            None => false,
        }
    }

    pub fn load(&mut self, tasks: impl IntoIterator<Item = Task>) {
        self.tasks.clear();
        for task in tasks {
            self.upsert(task);
        }
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}
