use std::sync::{Mutex, MutexGuard};

/// Holds the access token used to authenticate store requests.
///
/// Token storage and refresh live outside this crate; the session only carries whatever
/// token it was handed and forgets it when cleared.
#[derive(Debug, Default)]
pub struct AuthSession {
    access_token: Mutex<Option<String>>,
}

impl AuthSession {
    pub fn new(access_token: Option<String>) -> Self {
        let access_token = access_token
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());
        Self {
            access_token: Mutex::new(access_token),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        match self.access_token.lock() {
            Ok(token) => token,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.lock().is_some()
    }

    pub fn clear(&self) {
        if self.lock().take().is_some() {
            tracing::info!("cleared stored auth session");
        }
    }
}
