//! UserProfile domain model.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Account identifier as reported by the identity API.
///
/// Some deployments use numeric ids, others strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountId::Numeric(id) => write!(f, "{id}"),
            AccountId::Text(id) => f.write_str(id),
        }
    }
}

/// Cached user profile.
///
/// Only `id` is required; every other field is whatever the identity API
/// chose to send. `amount` and `status` are kept as raw JSON because their
/// types differ between deployments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: AccountId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Value>,
    #[serde(
        default,
        rename = "userType",
        alias = "user_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
}

impl UserProfile {
    /// A profile carrying nothing but its id.
    pub fn with_id(id: AccountId) -> Self {
        Self {
            id,
            nickname: None,
            email: None,
            phone: None,
            realname: None,
            avatar: None,
            amount: None,
            user_type: None,
            status: None,
            create_time: None,
        }
    }

    /// Best human-readable name: nickname, real name, email, then id.
    pub fn display_name(&self) -> String {
        self.nickname
            .as_deref()
            .or(self.realname.as_deref())
            .or(self.email.as_deref())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.id.to_string())
    }
}
