//! Client route table and path matching.
//!
//! The table is a tree of [`RouteRecord`]s defined once at startup. It is
//! flattened into matchers ordered as declared; a record with children is
//! only reachable through one of its children, and contributes its view
//! to the matched chain of each of them.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Route parameters (path params plus any extra named-location params).
pub type RouteParams = BTreeMap<String, String>;

/// Query string parameters.
pub type RouteQuery = BTreeMap<String, String>;

/// Props handed to the matched view.
pub type RouteProps = serde_json::Map<String, serde_json::Value>;

/// Maps the resolved params of a route to the props of its view.
pub type PropsFn = fn(&RouteParams) -> RouteProps;

/// Upper bound on chained record redirects within one resolution.
pub const MAX_REDIRECTS: usize = 10;

/// Client views a route can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Login form.
    Login,
    /// Application shell with sidebar; hosts the child views.
    Layout,
    /// Landing page listing knowledge bases and recent documents.
    Home,
    /// Knowledge base browser and editor.
    KnowledgeBase,
    /// The user's shared documents.
    SharedDocs,
    /// Recycle bin.
    RecycleBin,
    /// Read-only (or collaborative) view of a shared document.
    SharedDocView,
}

/// Errors raised while resolving a location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    /// No route has the requested name.
    #[error("no route named {0:?}")]
    UnknownName(String),

    /// A named location lacks a param required by the route path.
    #[error("route {name:?} requires param {param:?}")]
    MissingParam {
        /// Route name.
        name: String,
        /// Missing param.
        param: String,
    },

    /// Redirects did not settle within [`MAX_REDIRECTS`] hops.
    #[error("too many redirects starting at {0}")]
    TooManyRedirects(String),
}

/// One segment of a path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matches exactly this text.
    Static(String),
    /// Matches any non-empty segment and captures it under this name.
    Param(String),
}

/// A compiled absolute path pattern such as `/kb/:index_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compiles a pattern; `:name` segments are params.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        let segments = split_path(pattern)
            .map(|s| match s.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Static(s.to_string()),
            })
            .collect();
        Self { segments }
    }

    /// Matches a normalized path, returning the captured params.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let mut params = RouteParams::new();
        let mut parts = split_path(path);
        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Static(s) if s == part => {}
                Segment::Static(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }

    /// Builds a concrete path from params.
    ///
    /// # Errors
    ///
    /// Returns the name of the first param missing from `params`.
    pub fn build(&self, params: &RouteParams) -> Result<String, String> {
        if self.segments.is_empty() {
            return Ok("/".to_string());
        }
        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            match segment {
                Segment::Static(s) => path.push_str(s),
                Segment::Param(name) => match params.get(name) {
                    Some(value) if !value.is_empty() => path.push_str(value),
                    _ => return Err(name.clone()),
                },
            }
        }
        Ok(path)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            match segment {
                Segment::Static(s) => write!(f, "/{s}")?,
                Segment::Param(name) => write!(f, "/:{name}")?,
            }
        }
        Ok(())
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn join_paths(parent: &str, child: &str) -> String {
    if child.starts_with('/') {
        return child.to_string();
    }
    let parent = parent.trim_end_matches('/');
    if child.is_empty() {
        if parent.is_empty() {
            "/".to_string()
        } else {
            parent.to_string()
        }
    } else {
        format!("{parent}/{child}")
    }
}

/// A route declaration. Child paths are relative to their parent.
#[derive(Debug, Clone)]
pub struct RouteRecord {
    /// Path pattern (absolute at the top level, relative for children).
    pub path: String,
    /// Optional unique name for named navigation.
    pub name: Option<String>,
    /// View rendered by this record.
    pub view: Option<View>,
    /// Absolute path to redirect to when this record is matched.
    pub redirect: Option<String>,
    /// Props mapping for the view.
    pub props: Option<PropsFn>,
    /// Nested records rendered inside this record's view.
    pub children: Vec<RouteRecord>,
}

impl RouteRecord {
    /// A record rendering `view` at `path`.
    #[must_use]
    pub fn new(path: &str, view: View) -> Self {
        Self {
            path: path.to_string(),
            name: None,
            view: Some(view),
            redirect: None,
            props: None,
            children: Vec::new(),
        }
    }

    /// A record at `path` that redirects to `target`.
    #[must_use]
    pub fn redirect(path: &str, target: &str) -> Self {
        Self {
            path: path.to_string(),
            name: None,
            view: None,
            redirect: Some(target.to_string()),
            props: None,
            children: Vec::new(),
        }
    }

    /// Sets the route name.
    #[must_use]
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Sets the props mapping.
    #[must_use]
    pub fn with_props(mut self, props: PropsFn) -> Self {
        self.props = Some(props);
        self
    }

    /// Sets the child records.
    #[must_use]
    pub fn with_children(mut self, children: Vec<RouteRecord>) -> Self {
        self.children = children;
        self
    }
}

/// A navigation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A path, optionally with `?query` and `#hash`.
    Path(String),
    /// A named route with params. Params not used by the path are kept
    /// and passed through to props.
    Named {
        /// Route name.
        name: String,
        /// Route params.
        params: RouteParams,
    },
}

impl From<&str> for Location {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for Location {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

/// The outcome of resolving a [`Location`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRoute {
    /// Normalized path without query.
    pub path: String,
    /// Name of the matched route, if any.
    pub name: Option<String>,
    /// Views from the outermost record to the matched one. Empty when no
    /// route matches.
    pub matched: Vec<View>,
    /// Route params.
    pub params: RouteParams,
    /// Query params.
    pub query: RouteQuery,
    /// Props computed for the matched view (the params when the route
    /// defines no mapping).
    pub props: RouteProps,
    /// Path of the first location when record redirects were followed.
    pub redirected_from: Option<String>,
}

#[derive(Debug, Clone)]
struct FlatRoute {
    pattern: PathPattern,
    name: Option<String>,
    chain: Vec<View>,
    redirect: Option<String>,
    props: Option<PropsFn>,
}

/// Immutable, flattened route table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<FlatRoute>,
}

impl RouteTable {
    /// Flattens a record tree into a table.
    #[must_use]
    pub fn new(records: Vec<RouteRecord>) -> Self {
        let mut routes = Vec::new();
        for record in records {
            flatten(record, "", &[], &mut routes);
        }
        Self { routes }
    }

    /// Resolves `location`, following record redirects.
    ///
    /// Paths that match no route resolve to an empty matched chain.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError`] for unknown route names, missing params
    /// or redirect cycles.
    pub fn resolve(&self, location: &Location) -> Result<ResolvedRoute, NavigationError> {
        let (mut path, mut query, mut params) = self.locate(location)?;
        let mut redirected_from = None;

        for _ in 0..=MAX_REDIRECTS {
            let Some((route, path_params)) = self.match_path(&path) else {
                return Ok(ResolvedRoute {
                    path,
                    name: None,
                    matched: Vec::new(),
                    props: to_props(&params),
                    params,
                    query,
                    redirected_from,
                });
            };

            if let Some(target) = &route.redirect {
                redirected_from.get_or_insert_with(|| path.clone());
                let (target_path, target_query) = split_query(target);
                path = target_path;
                query = target_query;
                params = RouteParams::new();
                continue;
            }

            params.extend(path_params);
            let props = route
                .props
                .map_or_else(|| to_props(&params), |props| props(&params));
            return Ok(ResolvedRoute {
                path,
                name: route.name.clone(),
                matched: route.chain.clone(),
                params,
                query,
                props,
                redirected_from,
            });
        }

        Err(NavigationError::TooManyRedirects(
            redirected_from.unwrap_or(path),
        ))
    }

    /// Looks up a route by name and returns its path pattern.
    #[must_use]
    pub fn pattern_of(&self, name: &str) -> Option<&PathPattern> {
        self.routes
            .iter()
            .find(|r| r.name.as_deref() == Some(name))
            .map(|r| &r.pattern)
    }

    fn locate(
        &self,
        location: &Location,
    ) -> Result<(String, RouteQuery, RouteParams), NavigationError> {
        match location {
            Location::Path(raw) => {
                let (path, query) = split_query(raw);
                Ok((path, query, RouteParams::new()))
            }
            Location::Named { name, params } => {
                let pattern = self
                    .pattern_of(name)
                    .ok_or_else(|| NavigationError::UnknownName(name.clone()))?;
                let path = pattern
                    .build(params)
                    .map_err(|param| NavigationError::MissingParam {
                        name: name.clone(),
                        param,
                    })?;
                Ok((path, RouteQuery::new(), params.clone()))
            }
        }
    }

    fn match_path(&self, path: &str) -> Option<(&FlatRoute, RouteParams)> {
        self.routes
            .iter()
            .find_map(|route| route.pattern.matches(path).map(|params| (route, params)))
    }
}

fn flatten(record: RouteRecord, parent_path: &str, parent_chain: &[View], out: &mut Vec<FlatRoute>) {
    let full_path = join_paths(parent_path, &record.path);
    let mut chain = parent_chain.to_vec();
    chain.extend(record.view);

    if record.children.is_empty() {
        out.push(FlatRoute {
            pattern: PathPattern::parse(&full_path),
            name: record.name,
            chain,
            redirect: record.redirect,
            props: record.props,
        });
        return;
    }
    for child in record.children {
        flatten(child, &full_path, &chain, out);
    }
}

/// Splits `path?query#hash` into a normalized path and query map.
fn split_query(raw: &str) -> (String, RouteQuery) {
    let without_hash = raw.split_once('#').map_or(raw, |(p, _)| p);
    let (path, query) = without_hash
        .split_once('?')
        .unwrap_or((without_hash, ""));

    let mut normalized = String::from("/");
    normalized.push_str(&split_path(path).collect::<Vec<_>>().join("/"));

    let query = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect();
    (normalized, query)
}

fn to_props(params: &RouteParams) -> RouteProps {
    params
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
        .collect()
}

/// Props for the knowledge base view: every param, plus `file_id` and
/// `file_name` (null when absent).
#[must_use]
pub fn knowledge_base_props(params: &RouteParams) -> RouteProps {
    let mut props = to_props(params);
    for key in ["file_id", "file_name"] {
        let value = params
            .get(key)
            .map_or(serde_json::Value::Null, |v| serde_json::Value::String(v.clone()));
        props.insert(key.to_string(), value);
    }
    props
}

/// Builds the note client's route table.
#[must_use]
pub fn client_routes() -> RouteTable {
    RouteTable::new(vec![
        RouteRecord::new("/login", View::Login).named("login"),
        RouteRecord::new("/", View::Layout).with_children(vec![
            RouteRecord::redirect("", "/home"),
            RouteRecord::new("home", View::Home).named("home"),
            RouteRecord::new("kb/:index_id", View::KnowledgeBase)
                .named("knowledge-base")
                .with_props(knowledge_base_props),
            RouteRecord::new("shared", View::SharedDocs).named("shared"),
            RouteRecord::new("recycle", View::RecycleBin).named("recycle"),
        ]),
        RouteRecord::new("/shared-doc/:id", View::SharedDocView).named("shared-doc-view"),
    ])
}
