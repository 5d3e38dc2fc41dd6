//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionStore`: the single writer of session state, published through a
//!   watch channel
//! - `SessionManager`: boot-time restore, login and logout
//! - `Role` and its static route table
//! - `NavRoot`: which top-level screen group fits the session
//! - `CredentialStore`: saved passwords via the OS keychain
//!
//! Sessions never expire on the client; they end on logout or when the
//! backend answers 401.

pub mod credentials;
pub mod error;
pub mod navigation;
pub mod role;
pub mod session;
pub mod state;

pub use credentials::CredentialStore;
pub use error::SessionError;
pub use navigation::{redirect, NavRoot};
pub use role::{Role, RoleRoutes};
pub use session::SessionManager;
pub use state::{
    CorruptSession, PersistedSession, SessionState, SessionStore, KEY_LOGGED_IN, KEY_ROLE, KEY_TOKEN,
    KEY_USER, SESSION_KEYS,
};
