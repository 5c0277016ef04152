//! Client navigation: route table, login guard and navigator.
//!
//! The single-page client's routing rules live here so they can be
//! exercised server-side (see `GET /client/resolve`). The session token
//! is always passed in through an [`AuthContext`]; nothing here reads
//! ambient state.

pub mod guard;
pub mod navigator;
pub mod route_table;

pub use guard::{AuthContext, GuardDecision, LOGIN_PATH, NavigationGuard};
pub use navigator::{Navigation, Navigator};
pub use route_table::{
    Location, NavigationError, ResolvedRoute, RouteParams, RouteRecord, RouteTable, View,
    client_routes,
};
