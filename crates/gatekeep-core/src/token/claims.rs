//! JWT expiry inspection.
//!
//! Tokens are opaque to the session logic. When an access token happens to
//! be a JWT carrying an `exp` claim we can skip a pointless validation call
//! at startup; anything we cannot decode is reported as [`TokenExpiry::Opaque`]
//! and left for the identity API to judge. Signatures are not verified.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Tokens expiring within this many seconds are treated as expired.
pub const DEFAULT_EXPIRY_SKEW_SECS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenExpiry {
    /// `exp` is further away than the skew.
    Valid { expires_at: DateTime<Utc> },
    /// `exp` has passed or falls inside the skew window.
    Expired { expired_at: DateTime<Utc> },
    /// Not a JWT, or no usable `exp` claim.
    Opaque,
}

impl TokenExpiry {
    pub fn is_expired(&self) -> bool {
        matches!(self, TokenExpiry::Expired { .. })
    }
}

/// Reads the `exp` claim of `token` and compares it to `now`.
pub fn inspect_expiry(token: &str, now: DateTime<Utc>, skew_secs: i64) -> TokenExpiry {
    let Some(exp) = exp_claim(token) else {
        return TokenExpiry::Opaque;
    };
    let Some(at) = DateTime::<Utc>::from_timestamp(exp, 0) else {
        return TokenExpiry::Opaque;
    };

    if now.timestamp() >= exp.saturating_sub(skew_secs) {
        TokenExpiry::Expired { expired_at: at }
    } else {
        TokenExpiry::Valid { expires_at: at }
    }
}

fn exp_claim(token: &str) -> Option<i64> {
    let mut parts = token.split('.');
    let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;

    match claims.get("exp")? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}
