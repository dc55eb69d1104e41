//! Token persistence and inspection.
//!
//! - `store`: the `TokenStore` trait and the persisted record
//! - `claims`: best-effort JWT expiry inspection for stored access tokens

mod claims;
mod store;

pub use claims::{DEFAULT_EXPIRY_SKEW_SECS, TokenExpiry, inspect_expiry};
pub use store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, StoredSession, TokenStore, USER_KEY};
