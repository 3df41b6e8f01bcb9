//! Scripted in-process task store for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::store::{StoreError, TaskStore};
use crate::types::{CurrentUser, Priority, Task, TaskDraft, TaskId, TaskPatch, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    List,
    Create(TaskDraft),
    Update(TaskId, TaskPatch),
    Delete(TaskId),
    CurrentUser,
}

#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Task(Task),
    Tasks(Vec<Task>),
    User(CurrentUser),
    Deleted,
    Fail(StoreError),
}

struct Expectation {
    call: Call,
    reply: Reply,
    gate: Option<oneshot::Receiver<()>>,
}

/// Answers each call with the first matching expectation. A gated expectation holds its
/// reply until the paired sender fires (or is dropped), which lets a test pick the order in
/// which concurrent calls resolve.
#[derive(Default)]
pub(crate) struct ScriptedStore {
    expectations: Mutex<VecDeque<Expectation>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect(&self, call: Call, reply: Reply) {
        self.expectations
            .lock()
            .expect("expectations lock")
            .push_back(Expectation {
                call,
                reply,
                gate: None,
            });
    }

    pub fn expect_gated(&self, call: Call, reply: Reply) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.expectations
            .lock()
            .expect("expectations lock")
            .push_back(Expectation {
                call,
                reply,
                gate: Some(gate),
            });
        release
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    async fn answer(&self, call: Call) -> Reply {
        self.calls.lock().expect("calls lock").push(call.clone());
        let expectation = {
            let mut expectations = self.expectations.lock().expect("expectations lock");
            let index = expectations.iter().position(|entry| entry.call == call);
            index.and_then(|index| expectations.remove(index))
        };

        let Some(expectation) = expectation else {
            return Reply::Fail(StoreError::Network(format!("unexpected call {call:?}")));
        };
        if let Some(gate) = expectation.gate {
            let _ = gate.await;
        }
        expectation.reply
    }
}

impl TaskStore for ScriptedStore {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        match self.answer(Call::List).await {
            Reply::Tasks(tasks) => Ok(tasks),
            Reply::Fail(err) => Err(err),
            other => panic!("list_tasks scripted with {other:?}"),
        }
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<Task, StoreError> {
        match self.answer(Call::Create(draft.clone())).await {
            Reply::Task(task) => Ok(task),
            Reply::Fail(err) => Err(err),
            other => panic!("create_task scripted with {other:?}"),
        }
    }

    async fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, StoreError> {
        match self.answer(Call::Update(id, patch.clone())).await {
            Reply::Task(task) => Ok(task),
            Reply::Fail(err) => Err(err),
            other => panic!("update_task scripted with {other:?}"),
        }
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
        match self.answer(Call::Delete(id)).await {
            Reply::Deleted => Ok(()),
            Reply::Fail(err) => Err(err),
            other => panic!("delete_task scripted with {other:?}"),
        }
    }

    async fn current_user(&self) -> Result<CurrentUser, StoreError> {
        match self.answer(Call::CurrentUser).await {
            Reply::User(user) => Ok(user),
            Reply::Fail(err) => Err(err),
            other => panic!("current_user scripted with {other:?}"),
        }
    }
}

pub(crate) fn task(id: i64, title: &str, status: TaskStatus) -> Task {
    Task {
        id: TaskId::new(id),
        title: title.to_string(),
        description: None,
        priority: Priority::Medium,
        status,
        due_date: None,
    }
}

pub(crate) fn user(email: &str) -> CurrentUser {
    CurrentUser {
        email: email.to_string(),
        username: None,
    }
}

pub(crate) fn network_error() -> StoreError {
    StoreError::Network("connection reset".to_string())
}
