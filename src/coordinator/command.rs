use crate::types::{Task, TaskDraft, TaskId, TaskPatch, TaskStatus};

use super::{MutationError, MutationOutcome};

/// A user intent, decoupled from whatever gesture or form produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create(TaskDraft),
    Edit { task_id: TaskId, patch: TaskPatch },
    ChangeStatus { task_id: TaskId, status: TaskStatus },
    Delete { task_id: TaskId },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Create(_) => "create",
            Command::Edit { .. } => "edit",
            Command::ChangeStatus { .. } => "change-status",
            Command::Delete { .. } => "delete",
        }
    }

    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            Command::Create(_) => None,
            Command::Edit { task_id, .. }
            | Command::ChangeStatus { task_id, .. }
            | Command::Delete { task_id } => Some(*task_id),
        }
    }
}

/// Form-driven commands report errors back to their form; board interactions only report
/// how the registry was reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Form(Result<Task, MutationError>),
    Board(MutationOutcome),
}

impl CommandOutcome {
    /// Message to show next to the form that issued the command, if any.
    pub fn form_error(&self) -> Option<String> {
        match self {
            CommandOutcome::Form(Err(err)) => Some(err.to_string()),
            _ => None,
        }
    }
}
