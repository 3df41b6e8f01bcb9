//! Drag-and-drop gesture tracking.
//!
//! The tracker only turns a gesture into a [`Command`]; it never writes the board itself.

use tracing::debug;

use crate::board::Board;
use crate::coordinator::Command;
use crate::types::{TaskId, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(TaskId),
    DraggingOverColumn(TaskId, TaskStatus),
}

#[derive(Debug, Default)]
pub struct DragTracker {
    state: DragState,
}

impl DragTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn dragging_task_id(&self) -> Option<TaskId> {
        match self.state {
            DragState::Idle => None,
            DragState::Dragging(id) | DragState::DraggingOverColumn(id, _) => Some(id),
        }
    }

    pub fn drag_over_status(&self) -> Option<TaskStatus> {
        match self.state {
            DragState::DraggingOverColumn(_, status) => Some(status),
            _ => None,
        }
    }

    /// Whether `status` should be highlighted as the current drop target.
    pub fn is_drop_target(&self, status: TaskStatus) -> bool {
        self.drag_over_status() == Some(status)
    }

    /// Starts a drag and returns the payload the gesture carries to the drop site.
    pub fn drag_start(&mut self, id: TaskId) -> String {
        self.state = DragState::Dragging(id);
        id.to_string()
    }

    pub fn drag_enter(&mut self, status: TaskStatus) {
        if let Some(id) = self.dragging_task_id() {
            self.state = DragState::DraggingOverColumn(id, status);
        }
    }

    pub fn drag_leave(&mut self) {
        if let DragState::DraggingOverColumn(id, _) = self.state {
            self.state = DragState::Dragging(id);
        }
    }

    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }

    /// Ends the gesture over `status`. The tracked drag wins over `payload`; the payload is
    /// only consulted when the drag started somewhere this tracker did not see.
    pub fn drop_on(
        &mut self,
        board: &Board,
        status: TaskStatus,
        payload: Option<&str>,
    ) -> Option<Command> {
        let tracked = self.dragging_task_id();
        self.state = DragState::Idle;

        let Some(task_id) = tracked.or_else(|| payload.and_then(TaskId::from_payload)) else {
            debug!(payload = ?payload, "drop without a usable task id, ignoring");
            return None;
        };

        let task = board.task(task_id)?;
        if task.status == status {
            debug!(task_id = %task_id, status = %status, "dropped on own column");
            return None;
        }

        Some(Command::ChangeStatus { task_id, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::task;

    fn board() -> Board {
        let board = Board::new();
        board.finish_load(vec![
            task(7, "Ship report", TaskStatus::Todo),
            task(8, "Review PR", TaskStatus::Doing),
        ]);
        board
    }

    #[test]
    fn test_gesture_state_transitions() {
        let mut tracker = DragTracker::new();
        assert_eq!(tracker.state(), DragState::Idle);

        tracker.drag_enter(TaskStatus::Done);
        assert_eq!(tracker.state(), DragState::Idle);

        let payload = tracker.drag_start(TaskId::new(7));
        assert_eq!(payload, "7");
        assert_eq!(tracker.state(), DragState::Dragging(TaskId::new(7)));

        tracker.drag_enter(TaskStatus::Doing);
        assert_eq!(tracker.drag_over_status(), Some(TaskStatus::Doing));
        assert!(tracker.is_drop_target(TaskStatus::Doing));
        assert!(!tracker.is_drop_target(TaskStatus::Done));

        tracker.drag_enter(TaskStatus::Done);
        assert!(tracker.is_drop_target(TaskStatus::Done));

        tracker.drag_leave();
        assert_eq!(tracker.state(), DragState::Dragging(TaskId::new(7)));
        assert_eq!(tracker.dragging_task_id(), Some(TaskId::new(7)));

        tracker.cancel();
        assert_eq!(tracker.state(), DragState::Idle);
        assert_eq!(tracker.dragging_task_id(), None);
    }

    #[test]
    fn test_drop_on_other_column_issues_status_change() {
        let board = board();
        let mut tracker = DragTracker::new();
        tracker.drag_start(TaskId::new(7));
        tracker.drag_enter(TaskStatus::Doing);

        let command = tracker.drop_on(&board, TaskStatus::Doing, Some("7"));

        assert_eq!(
            command,
            Some(Command::ChangeStatus {
                task_id: TaskId::new(7),
                status: TaskStatus::Doing,
            })
        );
        assert_eq!(tracker.state(), DragState::Idle);
    }

    #[test]
    fn test_drop_on_own_column_is_noop() {
        let board = board();
        let revision = board.revision();
        let mut tracker = DragTracker::new();
        tracker.drag_start(TaskId::new(8));

        assert_eq!(tracker.drop_on(&board, TaskStatus::Doing, None), None);
        assert_eq!(tracker.state(), DragState::Idle);
        assert_eq!(board.revision(), revision);
    }

    #[test]
    fn test_drop_falls_back_to_payload() {
        let board = board();
        let mut tracker = DragTracker::new();

        let command = tracker.drop_on(&board, TaskStatus::Done, Some(" 8 "));

        assert_eq!(
            command,
            Some(Command::ChangeStatus {
                task_id: TaskId::new(8),
                status: TaskStatus::Done,
            })
        );
    }

    #[test]
    fn test_drop_with_bad_or_unknown_payload_is_noop() {
        let board = board();
        let mut tracker = DragTracker::new();

        assert_eq!(tracker.drop_on(&board, TaskStatus::Done, None), None);
        assert_eq!(tracker.drop_on(&board, TaskStatus::Done, Some("")), None);
        assert_eq!(tracker.drop_on(&board, TaskStatus::Done, Some("abc")), None);
        assert_eq!(tracker.drop_on(&board, TaskStatus::Done, Some("99")), None);
        assert_eq!(tracker.state(), DragState::Idle);
    }

    #[test]
    fn test_tracked_drag_wins_over_payload() {
        let board = board();
        let mut tracker = DragTracker::new();
        tracker.drag_start(TaskId::new(7));

        let command = tracker.drop_on(&board, TaskStatus::Done, Some("8"));

        assert_eq!(command.and_then(|command| command.task_id()), Some(TaskId::new(7)));
    }
}
