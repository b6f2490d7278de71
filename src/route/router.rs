//! Router seam and an in-memory implementation.
//!
//! The shell never routes by itself: it asks a [`Router`] to push or replace a
//! location and reads back the settled [`Route`]. [`MemoryRouter`] resolves
//! locations against the flattened route tree and keeps a history of issued
//! navigations, which is what the CLI and the tests observe.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::{
    MatchedRecord, NO_REDIRECT, Query, Route, RouteRecord, full_path, parse_location, resolve_path,
};
use crate::core::errors::{Result, ShellError};

/// Redirect chains longer than this are treated as a misconfigured table.
const MAX_REDIRECT_HOPS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationKind {
    Push,
    Replace,
}

/// A navigation the shell wants the router to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub kind: NavigationKind,
    pub path: String,
    pub query: Query,
}

impl Navigation {
    #[must_use]
    pub fn push(path: &str, query: &Query) -> Self {
        Self {
            kind: NavigationKind::Push,
            path: path.to_string(),
            query: query.clone(),
        }
    }

    #[must_use]
    pub fn replace(path: &str, query: &Query) -> Self {
        Self {
            kind: NavigationKind::Replace,
            path: path.to_string(),
            query: query.clone(),
        }
    }

    /// Push to a location string such as `"/kb/edit?id=3"`.
    #[must_use]
    pub fn push_location(location: &str) -> Self {
        let (path, query) = parse_location(location);
        Self::push(&path, &query)
    }

    #[must_use]
    pub fn full_path(&self) -> String {
        full_path(&self.path, &self.query)
    }
}

impl fmt::Display for Navigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            NavigationKind::Push => "push",
            NavigationKind::Replace => "replace",
        };
        write!(f, "{verb} {}", self.full_path())
    }
}

/// Navigation capability consumed by the shell.
pub trait Router {
    fn navigate_to(&mut self, path: &str, query: &Query) -> Result<()>;
    fn replace_with(&mut self, path: &str, query: &Query) -> Result<()>;
    fn current(&self) -> &Route;

    fn perform(&mut self, navigation: &Navigation) -> Result<()> {
        match navigation.kind {
            NavigationKind::Push => self.navigate_to(&navigation.path, &navigation.query),
            NavigationKind::Replace => self.replace_with(&navigation.path, &navigation.query),
        }
    }
}

#[derive(Debug, Clone)]
struct FlatRoute {
    path: String,
    segments: Vec<String>,
    name: Option<String>,
    redirect: Option<String>,
    matched: Vec<MatchedRecord>,
}

impl FlatRoute {
    fn capture(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = BTreeMap::new();
        for (pattern, part) in self.segments.iter().zip(parts) {
            if let Some(param) = pattern.strip_prefix(':') {
                params.insert(param.to_string(), part.to_string());
            } else if pattern != part {
                return None;
            }
        }
        Some(params)
    }
}

/// Table-driven router with history, used headless.
#[derive(Debug, Clone)]
pub struct MemoryRouter {
    table: Vec<FlatRoute>,
    redirect_prefix: String,
    current: Route,
    history: Vec<Navigation>,
}

impl MemoryRouter {
    /// Build from a route tree; the redirect route lives under `redirect_prefix`.
    #[must_use]
    pub fn new(routes: &[RouteRecord], redirect_prefix: &str) -> Self {
        let mut table = Vec::new();
        flatten(routes, "/", &[], &mut table);
        Self {
            table,
            redirect_prefix: redirect_prefix.trim_end_matches('/').to_string(),
            current: Route::unmatched("/"),
            history: Vec::new(),
        }
    }

    /// Every navigation issued so far, in order, including redirect hops.
    #[must_use]
    pub fn history(&self) -> &[Navigation] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Resolve a location without navigating.
    pub fn resolve(&self, path: &str, query: &Query) -> Result<Route> {
        let mut target = resolve_path("/", path);
        for _ in 0..MAX_REDIRECT_HOPS {
            if let Some(inner) = self.strip_redirect(&target) {
                target = inner;
                continue;
            }
            let Some((flat, params)) = self.lookup(&target) else {
                return Err(ShellError::UnknownRoute { path: target });
            };
            if let Some(redirect) = &flat.redirect
                && redirect != NO_REDIRECT
            {
                target = resolve_path(&flat.path, redirect);
                continue;
            }
            let meta = flat
                .matched
                .last()
                .map(|record| record.meta.clone())
                .unwrap_or_default();
            return Ok(Route {
                full_path: full_path(&target, query),
                path: target,
                name: flat.name.clone(),
                query: query.clone(),
                params,
                meta,
                matched: flat.matched.clone(),
            });
        }
        Err(ShellError::UnknownRoute { path: target })
    }

    fn strip_redirect(&self, path: &str) -> Option<String> {
        let rest = path.strip_prefix(&self.redirect_prefix)?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(resolve_path("/", rest))
        } else {
            None
        }
    }

    fn lookup(&self, path: &str) -> Option<(&FlatRoute, BTreeMap<String, String>)> {
        // Deepest record wins: an empty child path shares its parent's path.
        if let Some(exact) = self.table.iter().rev().find(|flat| flat.path == path) {
            return Some((exact, BTreeMap::new()));
        }
        self.table
            .iter()
            .find_map(|flat| flat.capture(path).map(|params| (flat, params)))
    }

    fn settle(&mut self, navigation: Navigation) -> Result<()> {
        let route = self.resolve(&navigation.path, &navigation.query)?;
        self.history.push(navigation);
        self.current = route;
        Ok(())
    }
}

impl Router for MemoryRouter {
    fn navigate_to(&mut self, path: &str, query: &Query) -> Result<()> {
        self.settle(Navigation::push(path, query))
    }

    fn replace_with(&mut self, path: &str, query: &Query) -> Result<()> {
        self.settle(Navigation::replace(path, query))
    }

    fn current(&self) -> &Route {
        &self.current
    }
}

fn flatten(
    records: &[RouteRecord],
    base: &str,
    parents: &[MatchedRecord],
    out: &mut Vec<FlatRoute>,
) {
    for record in records {
        let path = resolve_path(base, &record.path);
        let mut matched = parents.to_vec();
        matched.push(MatchedRecord {
            path: path.clone(),
            name: record.name.clone(),
            redirect: record.redirect.clone(),
            meta: record.meta.clone(),
        });
        out.push(FlatRoute {
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            path: path.clone(),
            name: record.name.clone(),
            redirect: record.redirect.clone(),
            matched: matched.clone(),
        });
        flatten(&record.children, &path, &matched, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteMeta;

    fn routes() -> Vec<RouteRecord> {
        vec![
            RouteRecord::new("/").redirect("/dashboard").children(vec![
                RouteRecord::new("dashboard")
                    .named("Dashboard")
                    .meta(RouteMeta::titled("Dashboard")),
            ]),
            RouteRecord::new("/kb").redirect("list").children(vec![
                RouteRecord::new("list")
                    .named("KBList")
                    .meta(RouteMeta::titled("Knowledge Bases")),
                RouteRecord::new("edit/:id").named("KBEdit"),
            ]),
        ]
    }

    #[test]
    fn push_settles_on_named_route() {
        let mut router = MemoryRouter::new(&routes(), "/redirect");
        router.navigate_to("/kb/list", &Query::new()).unwrap();
        assert_eq!(router.current().name.as_deref(), Some("KBList"));
        assert_eq!(router.current().matched.len(), 2);
        assert_eq!(router.history().len(), 1);
    }

    #[test]
    fn record_redirects_are_followed() {
        let mut router = MemoryRouter::new(&routes(), "/redirect");
        router.navigate_to("/", &Query::new()).unwrap();
        assert_eq!(router.current().path, "/dashboard");
        router.navigate_to("/kb", &Query::new()).unwrap();
        assert_eq!(router.current().path, "/kb/list");
    }

    #[test]
    fn params_are_captured() {
        let router = MemoryRouter::new(&routes(), "/redirect");
        let route = router.resolve("/kb/edit/7", &Query::new()).unwrap();
        assert_eq!(route.name.as_deref(), Some("KBEdit"));
        assert_eq!(route.params.get("id").map(String::as_str), Some("7"));
    }

    #[test]
    fn redirect_prefix_resolves_to_target_and_is_recorded() {
        let mut router = MemoryRouter::new(&routes(), "/redirect");
        let mut query = Query::new();
        query.insert("id".into(), "3".into());
        router.replace_with("/redirect/kb/list", &query).unwrap();
        assert_eq!(router.current().full_path, "/kb/list?id=3");
        assert_eq!(router.history()[0].to_string(), "replace /redirect/kb/list?id=3");
    }

    #[test]
    fn unknown_location_is_rejected_without_moving() {
        let mut router = MemoryRouter::new(&routes(), "/redirect");
        router.navigate_to("/kb/list", &Query::new()).unwrap();
        let err = router.navigate_to("/nope", &Query::new()).unwrap_err();
        assert_eq!(err.code(), "CHR-2002");
        assert_eq!(router.current().path, "/kb/list");
        assert_eq!(router.history().len(), 1);
    }

    #[test]
    fn redirect_loops_are_bounded() {
        let looping = vec![
            RouteRecord::new("/a").redirect("/b"),
            RouteRecord::new("/b").redirect("/a"),
        ];
        let router = MemoryRouter::new(&looping, "/redirect");
        assert!(router.resolve("/a", &Query::new()).is_err());
    }

    #[test]
    fn empty_child_path_shadows_its_wrapper() {
        let routes = vec![RouteRecord::new("/chat").children(vec![
            RouteRecord::new("").named("Chat").meta(RouteMeta::titled("Chat")),
        ])];
        let router = MemoryRouter::new(&routes, "/redirect");
        let route = router.resolve("/chat", &Query::new()).unwrap();
        assert_eq!(route.name.as_deref(), Some("Chat"));
        assert_eq!(route.matched.len(), 2);
    }

    #[test]
    fn no_redirect_marker_is_not_followed() {
        let routes = vec![RouteRecord::new("/kb").redirect(NO_REDIRECT)];
        let router = MemoryRouter::new(&routes, "/redirect");
        assert_eq!(router.resolve("/kb", &Query::new()).unwrap().path, "/kb");
    }

    #[test]
    fn push_location_splits_query() {
        let nav = Navigation::push_location("/kb/edit?id=3");
        assert_eq!(nav.path, "/kb/edit");
        assert_eq!(nav.full_path(), "/kb/edit?id=3");
    }
}
