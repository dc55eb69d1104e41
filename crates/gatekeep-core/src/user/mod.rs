//! User domain module.
//!
//! Holds the profile returned by the identity API's account info call.

mod model;

pub use model::{AccountId, UserProfile};
