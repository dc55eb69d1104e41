//! In-memory token store.
//!
//! Used for ephemeral sessions (`--ephemeral` in the CLI) and as the store
//! behind most tests.

use async_trait::async_trait;
use gatekeep_core::Result;
use gatekeep_core::session::SessionTokens;
use gatekeep_core::token::{StoredSession, TokenStore};
use gatekeep_core::user::UserProfile;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: RwLock<StoredSession>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with `stored`.
    pub fn with_session(stored: StoredSession) -> Self {
        Self {
            inner: RwLock::new(stored),
        }
    }

    /// Copy of the current contents.
    pub async fn snapshot(&self) -> StoredSession {
        self.inner.read().await.clone()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<StoredSession> {
        Ok(self.inner.read().await.clone())
    }

    async fn save_tokens(&self, tokens: &SessionTokens) -> Result<()> {
        let mut stored = self.inner.write().await;
        stored.access_token = Some(tokens.access_token.clone());
        stored.refresh_token = Some(tokens.refresh_token.clone());
        stored.user = None;
        Ok(())
    }

    async fn save_user(&self, user: &UserProfile) -> Result<()> {
        self.inner.write().await.user = Some(user.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.inner.write().await = StoredSession::default();
        Ok(())
    }
}
