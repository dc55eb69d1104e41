//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: Session value, token pair and the auth state machine
//! - `credentials`: Transient login credentials and their validation

mod credentials;
mod model;

pub use credentials::Credentials;
pub use model::{AuthState, Session, SessionTokens};
