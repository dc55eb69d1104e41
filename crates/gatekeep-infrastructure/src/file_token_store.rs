//! File-backed token store.
//!
//! One JSON document per identity domain holding the `accessToken`,
//! `refreshToken` and `user` keys. Every write is atomic and the file is
//! kept at mode 0600 on Unix.

use crate::paths::GatekeepPaths;
use crate::storage::AtomicJsonFile;
use async_trait::async_trait;
use gatekeep_core::Result;
use gatekeep_core::session::SessionTokens;
use gatekeep_core::token::{StoredSession, TokenStore};
use gatekeep_core::user::UserProfile;
use std::path::{Path, PathBuf};

const TOKEN_FILE_MODE: u32 = 0o600;

pub struct FileTokenStore {
    file: AtomicJsonFile<StoredSession>,
}

impl FileTokenStore {
    /// Store for `domain` at the location resolved by `paths`.
    pub fn for_domain(paths: &GatekeepPaths, domain: &str) -> Result<Self> {
        Ok(Self::with_path(paths.session_file(domain)?))
    }

    /// Store at an explicit path.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            file: AtomicJsonFile::new(path).with_mode(TOKEN_FILE_MODE),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<StoredSession> {
        Ok(self.file.load()?.unwrap_or_default())
    }

    async fn save_tokens(&self, tokens: &SessionTokens) -> Result<()> {
        self.file.update(StoredSession::default(), |stored| {
            stored.access_token = Some(tokens.access_token.clone());
            stored.refresh_token = Some(tokens.refresh_token.clone());
            stored.user = None;
            Ok(())
        })?;
        tracing::debug!("[TokenStore] Tokens persisted to {:?}", self.file.path());
        Ok(())
    }

    async fn save_user(&self, user: &UserProfile) -> Result<()> {
        self.file.update(StoredSession::default(), |stored| {
            stored.user = Some(user.clone());
            Ok(())
        })?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.file.remove()?;
        tracing::debug!("[TokenStore] Cleared {:?}", self.file.path());
        Ok(())
    }
}
