//! Route guarding between the public (sign-in) area and the protected area.
//!
//! The guard is pure: it never navigates by itself, it only tells the
//! caller where to go. It remembers the last redirect it issued so that a
//! router which re-evaluates on every render cannot loop.

use crate::session::AuthState;
use serde::{Deserialize, Serialize};

/// Default name of the public route group.
pub const DEFAULT_PUBLIC_GROUP: &str = "auth";
/// Default sign-in route.
pub const DEFAULT_SIGN_IN_ROUTE: &str = "/(auth)/signin";
/// Default landing route after login.
pub const DEFAULT_LANDING_ROUTE: &str = "/(tabs)/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteGroup {
    /// Sign-in, sign-up and friends.
    Public,
    /// Everything that needs an authenticated session.
    Protected,
}

/// Instruction to replace the current route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub to: String,
}

/// Redirect decisions for one navigation stack.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    public_group: String,
    sign_in_route: String,
    landing_route: String,
    last_redirect: Option<String>,
}

impl RouteGuard {
    pub fn new(
        public_group: impl Into<String>,
        sign_in_route: impl Into<String>,
        landing_route: impl Into<String>,
    ) -> Self {
        Self {
            public_group: public_group.into(),
            sign_in_route: sign_in_route.into(),
            landing_route: landing_route.into(),
            last_redirect: None,
        }
    }

    /// Classifies a path by its first segment. Expo-style group markers
    /// (`/(auth)/signin`) are accepted as well as plain segments.
    pub fn group_of(&self, path: &str) -> RouteGroup {
        let first = path
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default();
        let name = first.trim_start_matches('(').trim_end_matches(')');

        if !name.is_empty() && name == self.public_group {
            RouteGroup::Public
        } else {
            RouteGroup::Protected
        }
    }

    /// Decides the redirect for the current auth state and route group.
    ///
    /// Returns `None` while loading, when the current group already matches
    /// the state, or when the target equals the last redirect issued.
    ///
    /// The last target is never reset, not even on a state change. A caller
    /// that navigates on its own (e.g. straight from sign-in to the landing
    /// route after login) leaves the guard remembering the sign-in route, so
    /// a later logout on a protected page yields `None`. Such callers should
    /// route to the sign-in page themselves on logout, or use a fresh guard.
    pub fn evaluate(&mut self, state: AuthState, current: RouteGroup) -> Option<Redirect> {
        let target = match (state, current) {
            (AuthState::Loading, _) => return None,
            (AuthState::Authenticated, RouteGroup::Public) => &self.landing_route,
            (AuthState::Unauthenticated, RouteGroup::Protected) => &self.sign_in_route,
            _ => return None,
        };

        if self.last_redirect.as_deref() == Some(target.as_str()) {
            return None;
        }

        let to = target.clone();
        self.last_redirect = Some(to.clone());
        Some(Redirect { to })
    }

    /// Same as [`RouteGuard::evaluate`], classifying `path` first.
    pub fn evaluate_path(&mut self, state: AuthState, path: &str) -> Option<Redirect> {
        let group = self.group_of(path);
        self.evaluate(state, group)
    }

    /// The last redirect target issued, if any.
    pub fn last_redirect(&self) -> Option<&str> {
        self.last_redirect.as_deref()
    }

    pub fn sign_in_route(&self) -> &str {
        &self.sign_in_route
    }

    pub fn landing_route(&self) -> &str {
        &self.landing_route
    }
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLIC_GROUP, DEFAULT_SIGN_IN_ROUTE, DEFAULT_LANDING_ROUTE)
    }
}
