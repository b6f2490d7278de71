//! Route configuration records, the current-route value, and path helpers.
//!
//! The route tree is supplied externally (already filtered by role) and is
//! read-only for the shell. [`Route`] is what the router reports after a
//! navigation settles; the registry and menu projector consume it.

#![allow(missing_docs)]

pub mod router;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, ShellError};

pub use router::{MemoryRouter, Navigation, NavigationKind, Router};

/// Redirect marker for parent records that are not navigable themselves.
pub const NO_REDIRECT: &str = "noRedirect";

/// Query parameters. Ordered so `full_path` is deterministic.
pub type Query = BTreeMap<String, String>;

/// Per-route options recognised by the shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteMeta {
    pub title: Option<String>,
    pub icon: Option<String>,
    /// Pin in the tag strip; never closable.
    pub affix: bool,
    /// Exclude from menu and tag registry.
    pub hidden: bool,
    /// Path to highlight in the menu instead of this route's own path.
    #[serde(alias = "activeMenu")]
    pub active_menu: Option<String>,
    /// Render as a submenu even with a single visible child.
    #[serde(alias = "alwaysShow")]
    pub always_show: bool,
    /// Tag the route but never keep its component mounted.
    #[serde(alias = "noCache")]
    pub no_cache: bool,
    /// `false` hides the entry from breadcrumbs.
    pub breadcrumb: bool,
}

impl Default for RouteMeta {
    fn default() -> Self {
        Self {
            title: None,
            icon: None,
            affix: false,
            hidden: false,
            active_menu: None,
            always_show: false,
            no_cache: false,
            breadcrumb: true,
        }
    }
}

impl RouteMeta {
    #[must_use]
    pub fn titled(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Self::default()
        }
    }
}

/// One node of the static route tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub path: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(default)]
    pub meta: RouteMeta,
    #[serde(default)]
    pub children: Vec<RouteRecord>,
}

impl RouteRecord {
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            name: None,
            redirect: None,
            meta: RouteMeta::default(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn meta(mut self, meta: RouteMeta) -> Self {
        self.meta = meta;
        self
    }

    #[must_use]
    pub fn redirect(mut self, target: &str) -> Self {
        self.redirect = Some(target.to_string());
        self
    }

    #[must_use]
    pub fn children(mut self, children: Vec<Self>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug, Deserialize)]
struct RouteFile {
    #[serde(default)]
    routes: Vec<RouteRecord>,
}

/// Load a route tree from a `.toml` or `.json` file.
pub fn load_routes(path: &Path) -> Result<Vec<RouteRecord>> {
    let raw = fs::read_to_string(path).map_err(|source| ShellError::io(path, source))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        parse_routes_json(&raw)
    } else {
        parse_routes_toml(&raw)
    }
}

pub fn parse_routes_toml(raw: &str) -> Result<Vec<RouteRecord>> {
    toml::from_str::<RouteFile>(raw)
        .map(|file| file.routes)
        .map_err(|e| ShellError::RouteParse {
            details: e.to_string(),
        })
}

/// Accepts either `{"routes": [...]}` or a bare array.
pub fn parse_routes_json(raw: &str) -> Result<Vec<RouteRecord>> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| ShellError::RouteParse {
        details: e.to_string(),
    })?;
    let parsed = if value.is_array() {
        serde_json::from_value::<Vec<RouteRecord>>(value)
    } else {
        serde_json::from_value::<RouteFile>(value).map(|file| file.routes)
    };
    parsed.map_err(|e| ShellError::RouteParse {
        details: e.to_string(),
    })
}

/// A record on the path from the root of the tree to the current route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedRecord {
    pub path: String,
    pub name: Option<String>,
    pub redirect: Option<String>,
    pub meta: RouteMeta,
}

/// The settled location reported by the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub path: String,
    pub full_path: String,
    pub name: Option<String>,
    pub query: Query,
    pub params: BTreeMap<String, String>,
    pub meta: RouteMeta,
    pub matched: Vec<MatchedRecord>,
}

impl Route {
    /// A bare location with no matching record, e.g. before the first navigation.
    #[must_use]
    pub fn unmatched(path: &str) -> Self {
        Self {
            path: path.to_string(),
            full_path: path.to_string(),
            name: None,
            query: Query::new(),
            params: BTreeMap::new(),
            meta: RouteMeta::default(),
            matched: Vec::new(),
        }
    }

    #[must_use]
    pub fn new(path: &str, name: &str, meta: RouteMeta) -> Self {
        let mut route = Self::unmatched(path);
        route.name = Some(name.to_string());
        route.matched.push(MatchedRecord {
            path: path.to_string(),
            name: route.name.clone(),
            redirect: None,
            meta: meta.clone(),
        });
        route.meta = meta;
        route
    }

    #[must_use]
    pub fn with_query(mut self, query: Query) -> Self {
        self.full_path = full_path(&self.path, &query);
        self.query = query;
        self
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_path)
    }
}

/// Whether a menu path points outside the application.
#[must_use]
pub fn is_external(path: &str) -> bool {
    ["http://", "https://", "mailto:", "tel:"]
        .iter()
        .any(|scheme| path.starts_with(scheme))
}

/// Resolve `segment` against `base` the way nested route paths compose:
/// absolute segments replace the base, relative ones are appended, and
/// `.`/`..`/empty segments are folded.
#[must_use]
pub fn resolve_path(base: &str, segment: &str) -> String {
    if is_external(segment) {
        return segment.to_string();
    }
    if is_external(base) {
        return base.to_string();
    }
    let joined = if segment.starts_with('/') {
        segment.to_string()
    } else if segment.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{segment}")
    };
    normalize_path(&joined)
}

/// Collapse duplicate slashes and dot segments; always absolute, no trailing slash.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Split `"/kb/edit?id=3&tab=meta"` into a normalized path and its query.
#[must_use]
pub fn parse_location(location: &str) -> (String, Query) {
    let (path, raw_query) = location.split_once('?').unwrap_or((location, ""));
    let query = raw_query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (key.to_string(), value.to_string())
        })
        .collect();
    (normalize_path(path), query)
}

/// `path` plus its query string, if any.
#[must_use]
pub fn full_path(path: &str, query: &Query) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{path}?{}", pairs.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_joins_relative_segments() {
        assert_eq!(resolve_path("/kb", "list"), "/kb/list");
        assert_eq!(resolve_path("/", "dashboard"), "/dashboard");
        assert_eq!(resolve_path("/kb", ""), "/kb");
    }

    #[test]
    fn resolve_absolute_segment_replaces_base() {
        assert_eq!(resolve_path("/kb", "/dashboard"), "/dashboard");
    }

    #[test]
    fn resolve_folds_dot_segments_and_slashes() {
        assert_eq!(resolve_path("/kb//docs/", "./../files"), "/kb/files");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/a/b/"), "/a/b");
    }

    #[test]
    fn external_links_pass_through() {
        assert_eq!(
            resolve_path("/help", "https://docs.example.com"),
            "https://docs.example.com"
        );
        assert!(is_external("mailto:ops@example.com"));
        assert!(!is_external("/kb"));
    }

    #[test]
    fn location_parses_query_pairs() {
        let (path, query) = parse_location("/kb/edit/?id=3&tab=meta&flag");
        assert_eq!(path, "/kb/edit");
        assert_eq!(query.get("id").map(String::as_str), Some("3"));
        assert_eq!(query.get("flag").map(String::as_str), Some(""));
        assert_eq!(full_path(&path, &query), "/kb/edit?flag=&id=3&tab=meta");
    }

    #[test]
    fn full_path_without_query_is_path() {
        assert_eq!(full_path("/kb/list", &Query::new()), "/kb/list");
    }

    #[test]
    fn meta_defaults_keep_breadcrumb_visible() {
        let meta = RouteMeta::default();
        assert!(meta.breadcrumb);
        assert!(!meta.affix);
    }

    #[test]
    fn toml_route_file_parses_nested_children() {
        let routes = parse_routes_toml(
            r#"
            [[routes]]
            path = "/"
            redirect = "/dashboard"

            [[routes.children]]
            path = "dashboard"
            name = "Dashboard"
            meta = { title = "Dashboard", icon = "home", affix = true }

            [[routes]]
            path = "/kb"
            meta = { title = "Knowledge", alwaysShow = true }

            [[routes.children]]
            path = "edit"
            name = "KBEdit"
            meta = { title = "Edit", hidden = true, activeMenu = "/kb/list" }
            "#,
        )
        .unwrap();
        assert_eq!(routes.len(), 2);
        assert!(routes[0].children[0].meta.affix);
        assert!(routes[1].meta.always_show);
        assert_eq!(
            routes[1].children[0].meta.active_menu.as_deref(),
            Some("/kb/list")
        );
    }

    #[test]
    fn json_accepts_bare_array() {
        let routes =
            parse_routes_json(r#"[{"path": "/kb", "name": "KB", "meta": {"noCache": true}}]"#)
                .unwrap();
        assert!(routes[0].meta.no_cache);
    }

    #[test]
    fn malformed_routes_report_parse_error() {
        let err = parse_routes_toml("[[routes]]\nname = 3").unwrap_err();
        assert_eq!(err.code(), "CHR-2001");
    }
}
