//! Remote task store contract.
//!
//! The board never talks to the network directly; everything goes through [`TaskStore`],
//! which keeps the synchronization logic testable against a scripted store.

pub mod http;

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use serde_json::Value;
use thiserror::Error;

use crate::types::{CurrentUser, Task, TaskDraft, TaskId, TaskPatch};

pub use http::{HttpStoreConfig, HttpTaskStore};

pub trait TaskStore {
    fn list_tasks(&self) -> impl Future<Output = Result<Vec<Task>, StoreError>> + Send;

    fn create_task(
        &self,
        draft: &TaskDraft,
    ) -> impl Future<Output = Result<Task, StoreError>> + Send;

    fn update_task(
        &self,
        id: TaskId,
        patch: &TaskPatch,
    ) -> impl Future<Output = Result<Task, StoreError>> + Send;

    fn delete_task(&self, id: TaskId) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn current_user(&self) -> impl Future<Output = Result<CurrentUser, StoreError>> + Send;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Rejected input; recoverable by editing and resubmitting.
    #[error("{0}")]
    Validation(FieldErrors),
    #[error("not found: {0}")]
    NotFound(String),
    /// The session is no longer valid.
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("network error: {0}")]
    Network(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Validation(_) => "VALIDATION_ERROR",
            StoreError::NotFound(_) => "NOT_FOUND",
            StoreError::Auth(_) => "AUTH_ERROR",
            StoreError::Network(_) => "NETWORK_ERROR",
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, StoreError::Auth(_))
    }
}

/// Validation failure details as returned by the store: an optional top-level detail plus
/// messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub detail: Option<String>,
    pub fields: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn detail(message: impl Into<String>) -> Self {
        Self {
            detail: Some(message.into()),
            fields: BTreeMap::new(),
        }
    }

    pub fn field(name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(name.into(), vec![message.into()]);
        Self {
            detail: None,
            fields,
        }
    }

    /// Accepts `{"detail": "..."}`, `{"field": ["msg", ...]}`, `{"field": "msg"}`,
    /// `{"non_field_errors": [...]}` or a bare list of messages.
    pub fn from_json(value: &Value) -> Self {
        let mut errors = FieldErrors::default();
        match value {
            Value::Object(map) => {
                for (key, entry) in map {
                    let messages = json_messages(entry);
                    if messages.is_empty() {
                        continue;
                    }
                    if key == "detail" || key == "non_field_errors" {
                        let joined = messages.join(" ");
                        errors.detail = Some(match errors.detail.take() {
                            Some(existing) => format!("{existing} {joined}"),
                            None => joined,
                        });
                    } else {
                        errors.fields.insert(key.clone(), messages);
                    }
                }
            }
            other => {
                let messages = json_messages(other);
                if !messages.is_empty() {
                    errors.detail = Some(messages.join(" "));
                }
            }
        }
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.detail.is_none() && self.fields.is_empty()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(detail) = &self.detail {
            parts.push(detail.clone());
        }
        for (field, messages) in &self.fields {
            parts.push(format!("{field}: {}", messages.join(" ")));
        }
        if parts.is_empty() {
            return f.write_str("invalid task data");
        }
        f.write_str(&parts.join("; "))
    }
}

fn json_messages(value: &Value) -> Vec<String> {
    match value {
        Value::String(message) => vec![message.clone()],
        Value::Array(items) => items.iter().flat_map(json_messages).collect(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}
