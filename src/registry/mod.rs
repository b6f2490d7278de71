//! Tags-view registry: the ordered strip of visited views and the set of
//! views whose component trees stay mounted.
//!
//! Operations are synchronous state edits. When an edit requires the app to
//! move elsewhere (closing the active tab, refreshing a page) the registry
//! returns a [`Navigation`] for the caller to hand to the router; it never
//! routes or waits on its own.
//!
//! Invariants:
//! - at most one visited view per `path`; insertion order is kept and is the
//!   only order that matters ("last" after a close is the final survivor);
//! - affixed views are never removed by any close operation;
//! - a name is cached only while some visited view carries it.

#![allow(missing_docs)]

pub mod view;

#[cfg(test)]
mod test_properties;

use serde::Serialize;

use crate::core::config::RoutingConfig;
use crate::core::errors::{Result, ShellError};
use crate::route::{Navigation, Query, Route, RouteRecord, resolve_path};
use crate::store::{Observers, SubscriptionId};

pub use view::VisitedView;

/// Change notifications for tab-strip and page-cache renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegistryEvent {
    Seeded { paths: Vec<String> },
    Registered { path: String, cached: bool },
    Updated { path: String },
    Closed { paths: Vec<String> },
    CacheEvicted { name: String },
}

#[derive(Debug)]
pub struct ViewRegistry {
    routing: RoutingConfig,
    visited: Vec<VisitedView>,
    cached: Vec<String>,
    seeded: bool,
    observers: Observers<RegistryEvent>,
}

impl ViewRegistry {
    #[must_use]
    pub fn new(routing: RoutingConfig) -> Self {
        Self {
            routing,
            visited: Vec::new(),
            cached: Vec::new(),
            seeded: false,
            observers: Observers::new(),
        }
    }

    // ──────────────────── reads ────────────────────

    #[must_use]
    pub fn visited(&self) -> &[VisitedView] {
        &self.visited
    }

    /// Cached route names, in the order they were first cached.
    #[must_use]
    pub fn cached(&self) -> &[String] {
        &self.cached
    }

    #[must_use]
    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.visited.iter().position(|v| v.path == path)
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&VisitedView> {
        self.visited.iter().find(|v| v.path == path)
    }

    #[must_use]
    pub fn is_cached(&self, name: &str) -> bool {
        self.cached.iter().any(|n| n == name)
    }

    #[must_use]
    pub fn is_affixed(&self, path: &str) -> bool {
        self.get(path).is_some_and(|v| v.affixed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.visited.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }

    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&RegistryEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    // ──────────────────── registration ────────────────────

    /// Seed the strip with every named `affix` route in the static tree.
    ///
    /// Runs once per session; returns the number of views added.
    pub fn init_affixed(&mut self, routes: &[RouteRecord]) -> Result<usize> {
        if self.seeded {
            return Err(ShellError::AffixAlreadySeeded);
        }
        self.seeded = true;

        let mut found = Vec::new();
        collect_affixed(routes, "/", &mut found);

        let mut paths = Vec::new();
        for view in found {
            if let Some(existing) = self.visited.iter_mut().find(|v| v.path == view.path) {
                existing.affixed = true;
            } else {
                paths.push(view.path.clone());
                self.visited.push(view);
            }
        }
        let added = paths.len();
        if added > 0 {
            self.observers.notify(&RegistryEvent::Seeded { paths });
        }
        Ok(added)
    }

    /// Record a freshly settled route. Returns whether anything changed.
    ///
    /// Unnamed and hidden routes are ignored; an existing path is left as is.
    pub fn register(&mut self, route: &Route) -> bool {
        if route.meta.hidden {
            return false;
        }
        let Some(view) = VisitedView::from_route(route) else {
            return false;
        };

        let mut changed = false;
        if self.index_of(&view.path).is_none() {
            self.visited.push(view.clone());
            changed = true;
        }
        if !route.meta.no_cache && !self.is_cached(&view.name) {
            self.cached.push(view.name.clone());
            changed = true;
        }
        if changed {
            let cached = self.is_cached(&view.name);
            self.observers.notify(&RegistryEvent::Registered {
                path: view.path,
                cached,
            });
        }
        changed
    }

    /// Refresh query/full path/title of an already tagged path.
    pub fn update_visited(&mut self, route: &Route) -> bool {
        let Some(existing) = self.visited.iter_mut().find(|v| v.path == route.path) else {
            return false;
        };
        if !existing.refresh_from(route) {
            return false;
        }
        self.observers.notify(&RegistryEvent::Updated {
            path: route.path.clone(),
        });
        true
    }

    // ──────────────────── closing ────────────────────

    /// Close one tab. Affixed or unknown views are left alone.
    ///
    /// Returns where to go when the closed tab was the active one.
    pub fn close_one(&mut self, view: &VisitedView, current: &Route) -> Option<Navigation> {
        let index = self.index_of(&view.path)?;
        if self.visited[index].affixed {
            return None;
        }
        let removed = self.visited.remove(index);
        self.prune_cache();
        self.observers.notify(&RegistryEvent::Closed {
            paths: vec![removed.path.clone()],
        });

        (removed.path == current.path)
            .then(|| self.to_last_view(Some(&removed.name), &removed.path, &removed.query))
    }

    /// Keep only `keep` and the affixed views.
    pub fn close_others(&mut self, keep: &VisitedView, current: &Route) -> Option<Navigation> {
        self.retain_views(|v| v.affixed || v.path == keep.path);
        (current.path != keep.path).then(|| Navigation::push(&keep.path, &keep.query))
    }

    /// Keep only the affixed views.
    pub fn close_all(&mut self, current: &Route) -> Option<Navigation> {
        self.retain_views(|v| v.affixed);
        if self.index_of(&current.path).is_some() {
            return None;
        }
        Some(self.to_last_view(current.name.as_deref(), &current.path, &current.query))
    }

    /// Close every non-affixed tab to the left of `view`.
    pub fn close_left(&mut self, view: &VisitedView, current: &Route) -> Option<Navigation> {
        let index = self.index_of(&view.path)?;
        self.close_side(view, current, |i| i < index)
    }

    /// Close every non-affixed tab to the right of `view`.
    pub fn close_right(&mut self, view: &VisitedView, current: &Route) -> Option<Navigation> {
        let index = self.index_of(&view.path)?;
        self.close_side(view, current, |i| i > index)
    }

    /// Drop the page cache for `view` and remount it through the redirect route.
    ///
    /// The tag itself stays where it is.
    pub fn refresh(&mut self, view: &VisitedView) -> Navigation {
        if self.evict(&view.name) {
            self.observers.notify(&RegistryEvent::CacheEvicted {
                name: view.name.clone(),
            });
        }
        Navigation::replace(&self.redirect_path(&view.path), &view.query)
    }

    // ──────────────────── internals ────────────────────

    fn close_side(
        &mut self,
        view: &VisitedView,
        current: &Route,
        in_range: impl Fn(usize) -> bool,
    ) -> Option<Navigation> {
        let mut index = 0;
        self.retain_views(|v| {
            let keep = v.affixed || !in_range(index);
            index += 1;
            keep
        });
        let current_closed = self.index_of(&current.path).is_none();
        (current_closed && current.path != view.path)
            .then(|| Navigation::push(&view.path, &view.query))
    }

    fn retain_views(&mut self, mut keep: impl FnMut(&VisitedView) -> bool) {
        let mut removed = Vec::new();
        self.visited.retain(|v| {
            let kept = keep(v);
            if !kept {
                removed.push(v.path.clone());
            }
            kept
        });
        self.prune_cache();
        if !removed.is_empty() {
            self.observers
                .notify(&RegistryEvent::Closed { paths: removed });
        }
    }

    /// Drop cached names no surviving view carries.
    fn prune_cache(&mut self) {
        let visited = &self.visited;
        self.cached
            .retain(|name| visited.iter().any(|v| &v.name == name));
    }

    fn evict(&mut self, name: &str) -> bool {
        let before = self.cached.len();
        self.cached.retain(|n| n != name);
        self.cached.len() != before
    }

    fn redirect_path(&self, path: &str) -> String {
        format!("{}{path}", self.routing.redirect_prefix)
    }

    /// Where to go once the active tab is gone: the last survivor, else a
    /// remount of home when home itself was closed, else the app root.
    fn to_last_view(&self, closed_name: Option<&str>, path: &str, query: &Query) -> Navigation {
        if let Some(last) = self.visited.last() {
            return Navigation::push(&last.path, &last.query);
        }
        if closed_name == Some(self.routing.home_name.as_str()) {
            Navigation::replace(&self.redirect_path(path), query)
        } else {
            Navigation::push(&self.routing.root_path, &Query::new())
        }
    }
}

fn collect_affixed(routes: &[RouteRecord], base: &str, out: &mut Vec<VisitedView>) {
    for record in routes {
        let path = resolve_path(base, &record.path);
        if record.meta.affix
            && let Some(name) = &record.name
        {
            out.push(VisitedView::affixed(
                &path,
                name,
                record.meta.title.as_deref(),
            ));
        }
        if !record.children.is_empty() {
            collect_affixed(&record.children, &path, out);
        }
    }
}
