//! Tag-strip entries.

use serde::Serialize;

use crate::route::{Query, Route, full_path};

/// Title shown for routes whose meta carries none.
pub const UNTITLED: &str = "no-name";

/// One entry in the tag strip, keyed by `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitedView {
    pub path: String,
    pub full_path: String,
    pub name: String,
    pub title: String,
    pub query: Query,
    pub affixed: bool,
}

impl VisitedView {
    /// Build from a settled route. Routes without a name cannot be tagged.
    #[must_use]
    pub fn from_route(route: &Route) -> Option<Self> {
        let name = route.name.clone()?;
        Some(Self {
            path: route.path.clone(),
            full_path: route.full_path.clone(),
            name,
            title: route
                .meta
                .title
                .clone()
                .unwrap_or_else(|| UNTITLED.to_string()),
            query: route.query.clone(),
            affixed: route.meta.affix,
        })
    }

    /// Seed entry for an affixed route found in the static tree.
    #[must_use]
    pub fn affixed(path: &str, name: &str, title: Option<&str>) -> Self {
        let query = Query::new();
        Self {
            path: path.to_string(),
            full_path: full_path(path, &query),
            name: name.to_string(),
            title: title.unwrap_or(UNTITLED).to_string(),
            query,
            affixed: true,
        }
    }

    /// Take over location details from a later visit to the same path.
    pub(crate) fn refresh_from(&mut self, route: &Route) -> bool {
        let title = route.meta.title.as_deref().unwrap_or(UNTITLED);
        let changed =
            self.full_path != route.full_path || self.query != route.query || self.title != title;
        if changed {
            self.full_path.clone_from(&route.full_path);
            self.query.clone_from(&route.query);
            self.title = title.to_string();
        }
        changed
    }
}
