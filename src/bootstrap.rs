//! Session bootstrap: confirm who is signed in, then load the board.
//!
//! A failed user check always ends the session. Once the user is known, only an
//! authentication failure while listing tasks does; anything else leaves the user signed in
//! with an empty board and a load error to show.

use tracing::{info, warn};

use crate::board::Board;
use crate::session::AuthSession;
use crate::store::{StoreError, TaskStore};
use crate::types::CurrentUser;

const LOAD_FAILED: &str = "Unable to load tasks.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    SignedIn(CurrentUser),
    /// The caller should send the user back to sign-in.
    SignedOut { reason: String },
}

impl SessionState {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, SessionState::SignedIn(_))
    }

    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            SessionState::SignedIn(user) => Some(user),
            SessionState::SignedOut { .. } => None,
        }
    }
}

pub async fn bootstrap<S: TaskStore>(
    board: &Board,
    store: &S,
    session: &AuthSession,
) -> SessionState {
    board.begin_loading();

    let user = match store.current_user().await {
        Ok(user) => user,
        Err(err) => {
            warn!(error = %err, "user check failed during bootstrap; signing out");
            return sign_out_with(board, session, err.to_string());
        }
    };
    info!(email = %user.email, "signed in");
    board.sign_in(user.clone());

    load_tasks(board, store, session, user).await
}

/// Re-fetches the task list for the signed-in user with the same failure policy as
/// [`bootstrap`].
pub async fn reload<S: TaskStore>(
    board: &Board,
    store: &S,
    session: &AuthSession,
) -> SessionState {
    let Some(user) = board.user() else {
        return SessionState::SignedOut {
            reason: "not signed in".to_string(),
        };
    };
    board.begin_loading();
    load_tasks(board, store, session, user).await
}

pub fn sign_out(board: &Board, session: &AuthSession) {
    session.clear();
    board.reset();
    info!("signed out");
}

async fn load_tasks<S: TaskStore>(
    board: &Board,
    store: &S,
    session: &AuthSession,
    user: CurrentUser,
) -> SessionState {
    match store.list_tasks().await {
        Ok(tasks) => {
            info!(count = tasks.len(), "loaded tasks");
            board.finish_load(tasks);
            SessionState::SignedIn(user)
        }
        Err(err) if err.is_auth() => {
            warn!(error = %err, "task list rejected the session; signing out");
            sign_out_with(board, session, err.to_string())
        }
        Err(err) => {
            warn!(error = %err, "failed to load tasks");
            board.finish_load(Vec::new());
            board.fail_load(load_error_message(&err));
            SessionState::SignedIn(user)
        }
    }
}

fn sign_out_with(board: &Board, session: &AuthSession, reason: String) -> SessionState {
    sign_out(board, session);
    SessionState::SignedOut { reason }
}

fn load_error_message(err: &StoreError) -> String {
    let detail = match err {
        StoreError::Validation(errors) if errors.is_empty() => String::new(),
        StoreError::Validation(errors) => errors.to_string(),
        StoreError::NotFound(message) | StoreError::Auth(message) | StoreError::Network(message) => {
            message.trim().to_string()
        }
    };
    if detail.is_empty() {
        LOAD_FAILED.to_string()
    } else {
        detail
    }
}
