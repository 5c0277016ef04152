//! Navigation guard: the client's login gate.

use serde::Serialize;

use super::route_table::ResolvedRoute;

/// Path of the login view, the only route reachable without a token.
pub const LOGIN_PATH: &str = "/login";

/// Session state passed explicitly into every navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    token: Option<String>,
}

impl AuthContext {
    /// A context holding `token`.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// A context with no session.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The stored token, if any. An empty token counts as none.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    /// Returns `true` if a non-empty token is present.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }
}

impl From<Option<String>> for AuthContext {
    fn from(token: Option<String>) -> Self {
        Self { token }
    }
}

/// Result of running the guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "to", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Continue to the resolved route.
    Proceed,
    /// Navigate to this path instead.
    Redirect(String),
}

/// Redirects every route except the login path to the login path when
/// no token is held. Token contents are never inspected.
#[derive(Debug, Clone)]
pub struct NavigationGuard {
    login_path: String,
}

impl Default for NavigationGuard {
    fn default() -> Self {
        Self {
            login_path: LOGIN_PATH.to_string(),
        }
    }
}

impl NavigationGuard {
    /// A guard redirecting to `login_path`.
    #[must_use]
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }

    /// The path unauthenticated navigations are sent to.
    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Decides whether navigation to `to` may proceed.
    #[must_use]
    pub fn check(&self, to: &ResolvedRoute, auth: &AuthContext) -> GuardDecision {
        if to.path != self.login_path && !auth.has_token() {
            GuardDecision::Redirect(self.login_path.clone())
        } else {
            GuardDecision::Proceed
        }
    }
}
