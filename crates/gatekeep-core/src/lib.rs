//! Domain layer for Gatekeep.
//!
//! Types and contracts shared by every other crate: the session value and
//! its state machine, the token store and identity API traits, the route
//! guard, configuration shapes and the shared error type.

pub mod api;
pub mod config;
pub mod error;
pub mod route;
pub mod session;
pub mod token;
pub mod user;

pub use error::{GatekeepError, Result};
