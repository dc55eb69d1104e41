//! Identity API transport.

pub mod http_identity_api;
pub mod pacer;

pub use crate::http_identity_api::HttpIdentityApi;
pub use crate::pacer::RequestPacer;
