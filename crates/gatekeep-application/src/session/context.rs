use gatekeep_core::Result;
use gatekeep_core::session::{AuthState, Session, SessionTokens};
use gatekeep_core::user::UserProfile;
use tokio::sync::{RwLock, watch};

/// Single owner of one identity domain's [`Session`].
///
/// Every mutation goes through the state machine on [`Session`]; accepted
/// state changes are published on a watch channel so that a navigation
/// layer can react without polling.
pub struct SessionContext {
    session: RwLock<Session>,
    state_tx: watch::Sender<AuthState>,
}

impl SessionContext {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(AuthState::Loading);
        Self {
            session: RwLock::new(Session::loading()),
            state_tx,
        }
    }

    /// Current authentication state.
    pub fn state(&self) -> AuthState {
        *self.state_tx.borrow()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    /// Copy of the current session.
    pub async fn snapshot(&self) -> Session {
        self.session.read().await.clone()
    }

    /// Commits a validated session.
    pub async fn authenticate(&self, tokens: SessionTokens, user: UserProfile) -> Result<()> {
        let mut session = self.session.write().await;
        session.authenticate(tokens, user)?;
        self.publish(session.state);
        Ok(())
    }

    /// Drops tokens and profile and marks the session unauthenticated.
    pub async fn clear(&self) -> Result<()> {
        let mut session = self.session.write().await;
        session.clear()?;
        self.publish(session.state);
        Ok(())
    }

    /// Replaces the cached profile of an authenticated session.
    ///
    /// Returns false, changing nothing, when the session is not authenticated.
    pub async fn update_user(&self, user: UserProfile) -> bool {
        let mut session = self.session.write().await;
        if !session.is_authenticated() {
            return false;
        }
        session.user = Some(user);
        true
    }

    /// Replaces the tokens of an authenticated session.
    ///
    /// Returns false, changing nothing, when the session is not authenticated.
    pub async fn update_tokens(&self, tokens: SessionTokens) -> bool {
        let mut session = self.session.write().await;
        if !session.is_authenticated() {
            return false;
        }
        session.tokens = Some(tokens);
        true
    }

    fn publish(&self, state: AuthState) {
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            tracing::debug!("[Session] {} -> {}", current, state);
            *current = state;
            true
        });
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeep_core::user::AccountId;

    fn tokens() -> SessionTokens {
        SessionTokens::new("T1", "R1").unwrap()
    }

    #[tokio::test]
    async fn test_starts_loading() {
        let context = SessionContext::new();
        assert_eq!(context.state(), AuthState::Loading);
        assert_eq!(context.snapshot().await, Session::loading());
    }

    #[tokio::test]
    async fn test_state_changes_are_published() {
        let context = SessionContext::new();
        let mut rx = context.subscribe();

        context
            .authenticate(tokens(), UserProfile::with_id(AccountId::Numeric(1)))
            .await
            .unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), AuthState::Authenticated);

        context.clear().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), AuthState::Unauthenticated);

        // Logout while unauthenticated is a no-op and publishes nothing.
        context.clear().await.unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_clear_drops_tokens_and_user() {
        let context = SessionContext::new();
        context
            .authenticate(tokens(), UserProfile::with_id(AccountId::Numeric(1)))
            .await
            .unwrap();
        context.clear().await.unwrap();

        let session = context.snapshot().await;
        assert!(session.tokens.is_none());
        assert!(session.user.is_none());
    }

    #[tokio::test]
    async fn test_updates_require_authenticated_session() {
        let context = SessionContext::new();
        assert!(!context.update_user(UserProfile::with_id(AccountId::Numeric(2))).await);
        assert!(!context.update_tokens(tokens()).await);

        context
            .authenticate(tokens(), UserProfile::with_id(AccountId::Numeric(1)))
            .await
            .unwrap();
        assert!(context.update_user(UserProfile::with_id(AccountId::Numeric(2))).await);
        assert!(context.update_tokens(SessionTokens::new("T2", "R1").unwrap()).await);

        let session = context.snapshot().await;
        assert_eq!(session.user.unwrap().id, AccountId::Numeric(2));
        assert_eq!(session.tokens.unwrap().access_token, "T2");
    }
}
