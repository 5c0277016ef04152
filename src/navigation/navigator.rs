//! Navigation driver: resolve, guard, follow guard redirects.

use serde::Serialize;

use super::guard::{AuthContext, GuardDecision, NavigationGuard};
use super::route_table::{
    Location, MAX_REDIRECTS, NavigationError, ResolvedRoute, RouteTable, client_routes,
};

/// A completed navigation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Navigation {
    /// Where navigation ended.
    pub route: ResolvedRoute,
    /// Path originally requested, when the guard sent the user elsewhere.
    pub redirected_from: Option<String>,
}

/// Runs navigations against a route table and guard.
#[derive(Debug, Clone)]
pub struct Navigator {
    table: RouteTable,
    guard: NavigationGuard,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(client_routes(), NavigationGuard::default())
    }
}

impl Navigator {
    /// A navigator over `table` gated by `guard`.
    #[must_use]
    pub fn new(table: RouteTable, guard: NavigationGuard) -> Self {
        Self { table, guard }
    }

    /// The route table.
    #[must_use]
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Navigates to `location` with the session in `auth`.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError`] if resolution fails or guard redirects
    /// do not settle within [`MAX_REDIRECTS`] hops.
    pub fn navigate(
        &self,
        location: impl Into<Location>,
        auth: &AuthContext,
    ) -> Result<Navigation, NavigationError> {
        let mut location = location.into();
        let mut redirected_from: Option<String> = None;

        for _ in 0..=MAX_REDIRECTS {
            let route = self.table.resolve(&location)?;
            match self.guard.check(&route, auth) {
                GuardDecision::Proceed => {
                    return Ok(Navigation {
                        route,
                        redirected_from,
                    });
                }
                GuardDecision::Redirect(target) => {
                    tracing::debug!(from = %route.path, to = %target, "navigation redirected");
                    redirected_from.get_or_insert_with(|| route.path.clone());
                    location = Location::Path(target);
                }
            }
        }

        Err(NavigationError::TooManyRedirects(
            redirected_from.unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::navigation::route_table::{RouteParams, RouteRecord, View};

    const PATHS: &[&str] = &[
        "/",
        "/home",
        "/kb/abc",
        "/kb/abc?file=1",
        "/shared",
        "/recycle",
        "/shared-doc/xyz",
        "/unknown",
    ];

    fn go(nav: &Navigator, location: impl Into<Location>, auth: &AuthContext) -> Navigation {
        let Ok(navigation) = nav.navigate(location, auth) else {
            panic!("navigation failed");
        };
        navigation
    }

    #[test]
    fn without_token_everything_ends_at_login() {
        let nav = Navigator::default();
        for auth in [AuthContext::anonymous(), AuthContext::with_token("")] {
            for path in PATHS {
                let result = go(&nav, *path, &auth);
                assert_eq!(result.route.path, "/login", "{path}");
                assert_eq!(result.route.name.as_deref(), Some("login"));
                assert!(result.redirected_from.is_some());
            }
        }
    }

    #[test]
    fn with_any_token_routes_are_reached() {
        let nav = Navigator::default();
        let auth = AuthContext::with_token("not-even-a-jwt");
        assert_eq!(go(&nav, "/shared", &auth).route.name.as_deref(), Some("shared"));
        assert_eq!(go(&nav, "/kb/abc", &auth).route.path, "/kb/abc");
        assert_eq!(
            go(&nav, "/shared-doc/xyz", &auth).route.params.get("id").map(String::as_str),
            Some("xyz")
        );
        assert!(go(&nav, "/recycle", &auth).redirected_from.is_none());
    }

    #[test]
    fn root_goes_home() {
        let nav = Navigator::default();
        let result = go(&nav, "/", &AuthContext::with_token("t"));
        assert_eq!(result.route.path, "/home");
    }

    #[test]
    fn login_needs_no_token() {
        let nav = Navigator::default();
        let result = go(&nav, "/login", &AuthContext::anonymous());
        assert_eq!(result.route.path, "/login");
        assert!(result.redirected_from.is_none());
    }

    #[test]
    fn props_survive_navigation() {
        let nav = Navigator::default();
        let mut params = RouteParams::new();
        params.insert("index_id".to_string(), "k1".to_string());
        params.insert("file_id".to_string(), "f1".to_string());
        params.insert("file_name".to_string(), "draft".to_string());
        let location = Location::Named {
            name: "knowledge-base".to_string(),
            params: params.clone(),
        };

        let result = go(&nav, location, &AuthContext::with_token("t"));
        for (key, value) in &params {
            assert_eq!(
                result.route.props.get(key),
                Some(&serde_json::Value::String(value.clone()))
            );
        }
    }

    #[test]
    fn guard_redirect_loops_are_bounded() {
        let table = RouteTable::new(vec![
            RouteRecord::redirect("/login", "/home"),
            RouteRecord::new("/home", View::Home),
        ]);
        let nav = Navigator::new(table, NavigationGuard::default());
        assert!(matches!(
            nav.navigate("/home", &AuthContext::anonymous()),
            Err(NavigationError::TooManyRedirects(_))
        ));
    }
}
