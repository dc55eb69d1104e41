//! Session ownership.

mod context;

pub use context::SessionContext;
