//! Authentication session context.
//!
//! The signed-in session is held in an explicit [`SessionContext`] that is
//! created at startup, passed to whatever needs it, and torn down on
//! sign-out. Listeners receive `(event, session)` on every change.

use crate::store::{BoxFuture, StoreResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Email/password pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds).
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

/// Auth state transitions reported to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// Reported once by [`SessionContext::init`], with or without a session.
    InitialSession,
    SignedIn,
    SignedOut,
}

/// External identity collaborator.
pub trait Identity {
    /// Register an account. Returns `None` when the account still needs to
    /// be confirmed by email.
    fn sign_up(&self, credentials: &Credentials) -> BoxFuture<'_, StoreResult<Option<Session>>>;

    fn sign_in_with_password(&self, credentials: &Credentials)
    -> BoxFuture<'_, StoreResult<Session>>;

    fn sign_out(&self, session: &Session) -> BoxFuture<'_, StoreResult<()>>;

    /// Session persisted by the provider, if any.
    fn current_session(&self) -> BoxFuture<'_, StoreResult<Option<Session>>>;
}

/// Handle returned by [`SessionContext::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(usize);

type Listener = Box<dyn FnMut(AuthEvent, Option<&Session>)>;

/// Owns the current session and notifies listeners of changes.
pub struct SessionContext<I: Identity> {
    identity: Arc<I>,
    session: Option<Session>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: usize,
}

impl<I: Identity> SessionContext<I> {
    pub fn new(identity: Arc<I>) -> Self {
        Self {
            identity,
            session: None,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Restore any persisted session. Call once on app start.
    pub async fn init(&mut self) -> StoreResult<()> {
        self.session = self.identity.current_session().await?;
        match &self.session {
            Some(session) => log::info!("Restored session for user {}", session.user.id),
            None => log::info!("No stored session"),
        }
        self.emit(AuthEvent::InitialSession);
        Ok(())
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(AuthEvent, Option<&Session>) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false if the subscription was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    pub async fn sign_up(&mut self, credentials: &Credentials) -> StoreResult<Option<Session>> {
        let session = self.identity.sign_up(credentials).await?;
        match &session {
            Some(session) => self.set_session(session.clone()),
            None => log::info!("Sign-up for {} awaits email confirmation", credentials.email),
        }
        Ok(session)
    }

    pub async fn sign_in(&mut self, credentials: &Credentials) -> StoreResult<Session> {
        let session = self.identity.sign_in_with_password(credentials).await?;
        self.set_session(session.clone());
        Ok(session)
    }

    /// Sign out remotely, then tear down local state. Local state is torn
    /// down even if the remote call fails; the error is still returned.
    pub async fn sign_out(&mut self) -> StoreResult<()> {
        let result = match &self.session {
            Some(session) => self.identity.sign_out(session).await,
            None => Ok(()),
        };
        if let Err(e) = &result {
            log::error!("Remote sign-out failed: {}", e);
        }
        self.teardown();
        result
    }

    /// Drop the local session and notify listeners.
    pub fn teardown(&mut self) {
        if self.session.take().is_some() {
            log::info!("Session torn down");
            self.emit(AuthEvent::SignedOut);
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    pub fn identity(&self) -> &Arc<I> {
        &self.identity
    }

    fn set_session(&mut self, session: Session) {
        log::info!("Signed in as {}", session.user.email.as_deref().unwrap_or(&session.user.id));
        self.session = Some(session);
        self.emit(AuthEvent::SignedIn);
    }

    fn emit(&mut self, event: AuthEvent) {
        let session = self.session.as_ref();
        for (_, listener) in &mut self.listeners {
            listener(event, session);
        }
    }
}
