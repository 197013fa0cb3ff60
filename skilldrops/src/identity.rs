//! Authenticated identity, modeled as an observable.
//!
//! The real provider (sign-in UI, token refresh) is an external
//! collaborator; this module carries only what the stores and the migration
//! coordinator consume: a stable user id plus a display name, published
//! over a watch channel so components can read the current state or react
//! to transitions.

use tokio::sync::watch;

/// Current authentication state. Only `user_id` is consumed by the remote
/// store and the migration coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    SignedOut,
    SignedIn {
        user_id: String,
        display_name: Option<String>,
    },
}

impl AuthState {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, AuthState::SignedIn { .. })
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            AuthState::SignedOut => None,
            AuthState::SignedIn { user_id, .. } => Some(user_id),
        }
    }

    pub fn display_name(&self) -> Option<&str> {
        match self {
            AuthState::SignedOut => None,
            AuthState::SignedIn { display_name, .. } => display_name.as_deref(),
        }
    }
}

/// Publisher side of the identity channel. The provider (or the CLI acting
/// as one) holds this; every consumer holds a [`watch::Receiver`] from
/// [`IdentityProvider::subscribe`].
pub struct IdentityProvider {
    tx: watch::Sender<AuthState>,
}

impl IdentityProvider {
    pub fn new(initial: AuthState) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    pub fn sign_in(&self, user_id: impl Into<String>, display_name: Option<String>) {
        self.tx.send_replace(AuthState::SignedIn {
            user_id: user_id.into(),
            display_name,
        });
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(AuthState::SignedOut);
    }
}

impl Default for IdentityProvider {
    fn default() -> Self {
        Self::new(AuthState::SignedOut)
    }
}
