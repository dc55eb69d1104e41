//! Application layer for Gatekeep.
//!
//! Use cases that coordinate the identity API and the token store around
//! one explicitly owned session: bootstrap, login, logout, profile and
//! token refresh, and route guarding.

pub mod auth_service;
pub mod bootstrapper;
pub mod login_sequencer;
pub mod session;
pub mod verification;

#[cfg(test)]
mod test_support;

pub use auth_service::AuthService;
pub use bootstrapper::SessionBootstrapper;
pub use login_sequencer::LoginSequencer;
pub use session::SessionContext;
