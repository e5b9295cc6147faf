//! Session store: who is using the app, for the life of the storage scope.
//!
//! The identity is persisted under [`AUTH_KEY`] as `{id, name, email, role}`
//! so a reopened store can restore it without asking for credentials again.

use crate::records::Role;
use crate::storage::StorageAdapter;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Storage key of the persisted identity
pub const AUTH_KEY: &str = "auth_user";

/// Where logout sends the user
pub const ENTRY_ROUTE: &str = "/";

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// The authenticated user, without any secret
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// An entry of the credential table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Credential {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password: String,
}

impl Credential {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Restore has not run yet; protected content stays hidden
    Loading,
    Unauthenticated,
    Authenticated(Identity),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Success(Identity),
    Failure { error: String },
}

/// What `restore_session` found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStatus {
    Restored,
    NoSession,
    /// The stored identity did not parse and was removed
    Discarded,
    /// Storage refused the read
    Unavailable,
    /// Restore already ran; nothing changed
    AlreadyRestored,
}

/// Navigation requested by a session change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
}

type Observer = Box<dyn Fn(&SessionState)>;

pub struct SessionStore {
    storage: Rc<dyn StorageAdapter>,
    credentials: Vec<Credential>,
    state: SessionState,
    restored: bool,
    observers: Vec<Observer>,
}

impl SessionStore {
    pub fn new(storage: Rc<dyn StorageAdapter>, credentials: Vec<Credential>) -> Self {
        Self {
            storage,
            credentials,
            state: SessionState::Loading,
            restored: false,
            observers: Vec::new(),
        }
    }

    /// Called with the new state after every identity change
    pub fn subscribe(&mut self, observer: impl Fn(&SessionState) + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        for observer in &self.observers {
            observer(&self.state);
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Loading
    }

    pub fn user(&self) -> Option<&Identity> {
        match &self.state {
            SessionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.user().map(|u| u.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    pub fn is_site_manager(&self) -> bool {
        self.role() == Some(Role::SiteManager)
    }

    /// Load the persisted identity; runs once, never fails
    pub fn restore_session(&mut self) -> RestoreStatus {
        if self.restored {
            return RestoreStatus::AlreadyRestored;
        }
        self.restored = true;

        let (state, status) = match self.storage.get(AUTH_KEY) {
            Ok(None) => (SessionState::Unauthenticated, RestoreStatus::NoSession),
            Ok(Some(raw)) => match serde_json::from_str::<Identity>(&raw) {
                Ok(identity) => {
                    tracing::debug!(user = %identity.email, "session restored");
                    (SessionState::Authenticated(identity), RestoreStatus::Restored)
                }
                Err(e) => {
                    tracing::warn!(key = AUTH_KEY, error = %e, "failed to parse stored user; discarding it");
                    if let Err(e) = self.storage.remove(AUTH_KEY) {
                        tracing::warn!(key = AUTH_KEY, error = %e, "failed to remove stored user");
                    }
                    (SessionState::Unauthenticated, RestoreStatus::Discarded)
                }
            },
            Err(e) => {
                tracing::warn!(key = AUTH_KEY, error = %e, "failed to read stored user");
                (SessionState::Unauthenticated, RestoreStatus::Unavailable)
            }
        };
        self.set_state(state);
        status
    }

    /// Check credentials against the table and start a session on a match
    ///
    /// Email comparison ignores case and surrounding whitespace; the
    /// password must match exactly.
    pub fn login(&mut self, email: &str, password: &str) -> LoginOutcome {
        let email = email.trim().to_lowercase();
        let found = self
            .credentials
            .iter()
            .find(|c| c.email.to_lowercase() == email && c.password == password);

        let Some(credential) = found else {
            tracing::info!(email = %email, "login rejected");
            return LoginOutcome::Failure {
                error: INVALID_CREDENTIALS.to_string(),
            };
        };

        let identity = credential.identity();
        match serde_json::to_string(&identity) {
            Ok(raw) => {
                if let Err(e) = self.storage.set(AUTH_KEY, &raw) {
                    // The session still works until the store is reopened
                    tracing::warn!(key = AUTH_KEY, error = %e, "failed to persist session");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize identity"),
        }

        tracing::info!(user = %identity.email, role = identity.role.as_str(), "logged in");
        self.set_state(SessionState::Authenticated(identity.clone()));
        LoginOutcome::Success(identity)
    }

    /// End the session and send the user back to the entry route
    pub fn logout(&mut self) -> Redirect {
        if let Err(e) = self.storage.remove(AUTH_KEY) {
            tracing::warn!(key = AUTH_KEY, error = %e, "failed to clear stored user");
        }
        if let Some(user) = self.user() {
            tracing::info!(user = %user.email, "logged out");
        }
        self.set_state(SessionState::Unauthenticated);
        Redirect {
            to: ENTRY_ROUTE.to_string(),
        }
    }
}
