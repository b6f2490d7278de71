//! Sidebar/header menu projection of the route tree.
//!
//! The projector is built once from the static tree; every read against the
//! current route (active key, open submenus, breadcrumbs, mixed split) is a
//! pure function and is recomputed on demand.

#![allow(missing_docs)]

use serde::Serialize;

use crate::core::config::RoutingConfig;
use crate::layout::LayoutResolver;
use crate::route::{NO_REDIRECT, Route, RouteRecord, is_external, resolve_path};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    /// Fully resolved path; doubles as the menu key.
    pub key: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuItem>,
    /// Opens outside the application instead of routing.
    pub external: bool,
}

impl MenuItem {
    #[must_use]
    pub fn is_submenu(&self) -> bool {
        !self.children.is_empty()
    }

    fn contains(&self, key: &str) -> bool {
        self.key == key || self.children.iter().any(|child| child.contains(key))
    }

    /// This item without its subtree.
    fn shallow(&self) -> Self {
        Self {
            children: Vec::new(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// How the menu widget should be configured for the current layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MenuPresentation {
    pub orientation: Orientation,
    pub collapsed: bool,
    /// Submenus pop out instead of expanding inline.
    pub flyout_submenus: bool,
}

/// Header sections plus the sidebar subtree of the active section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MixedMenu {
    pub top: Vec<MenuItem>,
    pub active_top: Option<String>,
    pub side: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breadcrumb {
    pub title: String,
    pub path: String,
    pub clickable: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MenuProjector {
    items: Vec<MenuItem>,
}

impl MenuProjector {
    /// Project the visible part of `routes` into menu items.
    #[must_use]
    pub fn project(routes: &[RouteRecord]) -> Self {
        Self {
            items: project_level(routes, "/"),
        }
    }

    #[must_use]
    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    /// Depth-first lookup by key.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&MenuItem> {
        fn walk<'a>(items: &'a [MenuItem], key: &str) -> Option<&'a MenuItem> {
            items.iter().find_map(|item| {
                if item.key == key {
                    Some(item)
                } else {
                    walk(&item.children, key)
                }
            })
        }
        walk(&self.items, key)
    }

    /// Highlighted key: the route's `active_menu` if set, else its path.
    #[must_use]
    pub fn active_key(route: &Route) -> String {
        route
            .meta
            .active_menu
            .clone()
            .unwrap_or_else(|| route.path.clone())
    }

    /// Keys of the submenus enclosing `active`, outermost first.
    #[must_use]
    pub fn open_keys(&self, active: &str) -> Vec<String> {
        fn walk(items: &[MenuItem], active: &str, trail: &mut Vec<String>) -> bool {
            for item in items {
                if item.key == active {
                    return true;
                }
                if item.is_submenu() {
                    trail.push(item.key.clone());
                    if walk(&item.children, active, trail) {
                        return true;
                    }
                    trail.pop();
                }
            }
            false
        }
        let mut trail = Vec::new();
        if walk(&self.items, active, &mut trail) {
            trail
        } else {
            Vec::new()
        }
    }

    #[must_use]
    pub fn presentation(resolver: LayoutResolver, sidebar_opened: bool) -> MenuPresentation {
        if resolver.is_top_bar() && !resolver.is_mobile() {
            return MenuPresentation {
                orientation: Orientation::Horizontal,
                collapsed: false,
                flyout_submenus: true,
            };
        }
        let collapsed = !sidebar_opened;
        MenuPresentation {
            orientation: Orientation::Vertical,
            collapsed,
            flyout_submenus: collapsed,
        }
    }

    /// Split for the mixed layout: top-level sections go to the header, the
    /// children of the section containing `active` go to the sidebar.
    #[must_use]
    pub fn mixed_split(&self, active: &str) -> MixedMenu {
        let section = self.items.iter().find(|item| item.contains(active));
        MixedMenu {
            top: self.items.iter().map(MenuItem::shallow).collect(),
            active_top: section.map(|item| item.key.clone()),
            side: section.map(|item| item.children.clone()).unwrap_or_default(),
        }
    }

    /// Titled chain from the root to `route`, with home prepended.
    #[must_use]
    pub fn breadcrumbs(route: &Route, routing: &RoutingConfig) -> Vec<Breadcrumb> {
        let mut crumbs: Vec<Breadcrumb> = route
            .matched
            .iter()
            .filter(|record| record.meta.breadcrumb)
            .filter_map(|record| {
                let title = record.meta.title.clone()?;
                let target = match record.redirect.as_deref() {
                    Some(NO_REDIRECT) | None => record.path.clone(),
                    Some(redirect) => resolve_path(&record.path, redirect),
                };
                Some(Breadcrumb {
                    title,
                    path: target,
                    clickable: record.redirect.as_deref() != Some(NO_REDIRECT),
                })
            })
            .collect();

        let starts_at_home = route
            .matched
            .iter()
            .find(|record| record.meta.breadcrumb && record.meta.title.is_some())
            .is_some_and(|record| {
                record.name.as_deref() == Some(routing.home_name.as_str())
                    || record.path == routing.home_path
            });
        if !starts_at_home {
            crumbs.insert(
                0,
                Breadcrumb {
                    title: routing.home_name.clone(),
                    path: routing.home_path.clone(),
                    clickable: true,
                },
            );
        }
        if let Some(last) = crumbs.last_mut() {
            last.clickable = false;
        }
        crumbs
    }
}

fn project_level(records: &[RouteRecord], base: &str) -> Vec<MenuItem> {
    records
        .iter()
        .filter(|record| !record.meta.hidden)
        .filter_map(|record| project_record(record, base))
        .collect()
}

fn project_record(record: &RouteRecord, base: &str) -> Option<MenuItem> {
    let key = resolve_path(base, &record.path);
    let children = project_level(&record.children, &key);

    // A bare layout wrapper whose children are all hidden has nothing to show.
    if children.is_empty() && !record.children.is_empty() && record.meta.title.is_none() {
        return None;
    }

    if !record.meta.always_show {
        if let [only] = children.as_slice()
            && !only.is_submenu()
        {
            let mut item = only.clone();
            if item.icon.is_none() {
                item.icon.clone_from(&record.meta.icon);
            }
            return Some(item);
        }
        if children.is_empty() {
            return Some(leaf(record, key));
        }
    }

    let mut item = leaf(record, key);
    item.children = children;
    Some(item)
}

fn leaf(record: &RouteRecord, key: String) -> MenuItem {
    let title = record
        .meta
        .title
        .clone()
        .or_else(|| record.name.clone())
        .unwrap_or_else(|| key.clone());
    MenuItem {
        external: is_external(&key),
        key,
        title,
        icon: record.meta.icon.clone(),
        children: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Device, LayoutMode, LayoutState};
    use crate::route::{MemoryRouter, Query, RouteMeta};

    fn meta(title: &str, icon: &str) -> RouteMeta {
        RouteMeta {
            icon: Some(icon.to_string()),
            ..RouteMeta::titled(title)
        }
    }

    fn tree() -> Vec<RouteRecord> {
        vec![
            RouteRecord::new("/").redirect("/dashboard").children(vec![
                RouteRecord::new("dashboard")
                    .named("Dashboard")
                    .meta(meta("Dashboard", "home")),
            ]),
            RouteRecord::new("/kb")
                .redirect(NO_REDIRECT)
                .meta(meta("Knowledge", "book"))
                .children(vec![
                    RouteRecord::new("list")
                        .named("KBList")
                        .meta(RouteMeta::titled("Bases")),
                    RouteRecord::new("files")
                        .named("KBFiles")
                        .meta(RouteMeta::titled("Files")),
                    RouteRecord::new("edit").named("KBEdit").meta(RouteMeta {
                        hidden: true,
                        active_menu: Some("/kb/list".to_string()),
                        ..RouteMeta::titled("Edit")
                    }),
                ]),
            RouteRecord::new("/system")
                .meta(RouteMeta {
                    always_show: true,
                    ..meta("System", "gear")
                })
                .children(vec![
                    RouteRecord::new("users")
                        .named("Users")
                        .meta(RouteMeta::titled("Users")),
                ]),
            RouteRecord::new("/login").named("Login").meta(RouteMeta {
                hidden: true,
                ..RouteMeta::default()
            }),
            RouteRecord::new("https://docs.example.com").meta(RouteMeta::titled("Docs")),
        ]
    }

    #[test]
    fn single_child_collapses_and_inherits_icon() {
        let projector = MenuProjector::project(&tree());
        let first = &projector.items()[0];
        assert_eq!(first.key, "/dashboard");
        assert_eq!(first.title, "Dashboard");
        assert_eq!(first.icon.as_deref(), Some("home"));
        assert!(!first.is_submenu());
    }

    #[test]
    fn hidden_routes_are_excluded() {
        let projector = MenuProjector::project(&tree());
        assert!(projector.find("/login").is_none());
        assert!(projector.find("/kb/edit").is_none());
        let kb = projector.find("/kb").unwrap();
        let keys: Vec<&str> = kb.children.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["/kb/list", "/kb/files"]);
    }

    #[test]
    fn always_show_keeps_submenu_for_one_child() {
        let projector = MenuProjector::project(&tree());
        let system = projector.find("/system").unwrap();
        assert!(system.is_submenu());
        assert_eq!(system.children[0].key, "/system/users");
    }

    #[test]
    fn external_links_are_flagged() {
        let projector = MenuProjector::project(&tree());
        let docs = projector.items().last().unwrap();
        assert!(docs.external);
        assert_eq!(docs.key, "https://docs.example.com");
    }

    #[test]
    fn active_menu_overrides_path() {
        let router = MemoryRouter::new(&tree(), "/redirect");
        let edit = router.resolve("/kb/edit", &Query::new()).unwrap();
        assert_eq!(MenuProjector::active_key(&edit), "/kb/list");
        let list = router.resolve("/kb/list", &Query::new()).unwrap();
        assert_eq!(MenuProjector::active_key(&list), "/kb/list");
    }

    #[test]
    fn open_keys_trace_enclosing_submenus() {
        let projector = MenuProjector::project(&tree());
        assert_eq!(projector.open_keys("/kb/files"), vec!["/kb".to_string()]);
        assert!(projector.open_keys("/dashboard").is_empty());
        assert!(projector.open_keys("/nowhere").is_empty());
    }

    #[test]
    fn presentation_follows_layout() {
        let top = LayoutState {
            layout_mode: LayoutMode::Top,
            ..LayoutState::default()
        };
        let p = MenuProjector::presentation(top.resolver(), false);
        assert_eq!(p.orientation, Orientation::Horizontal);
        assert!(!p.collapsed);

        let left = LayoutState::default();
        let p = MenuProjector::presentation(left.resolver(), false);
        assert_eq!(p.orientation, Orientation::Vertical);
        assert!(p.collapsed && p.flyout_submenus);
        assert!(!MenuProjector::presentation(left.resolver(), true).collapsed);

        let mobile_top = LayoutState {
            device: Device::Mobile,
            ..top
        };
        let p = MenuProjector::presentation(mobile_top.resolver(), true);
        assert_eq!(p.orientation, Orientation::Vertical);
    }

    #[test]
    fn mixed_split_puts_section_children_in_sidebar() {
        let projector = MenuProjector::project(&tree());
        let split = projector.mixed_split("/kb/files");
        assert_eq!(split.active_top.as_deref(), Some("/kb"));
        assert_eq!(split.side.len(), 2);
        assert!(split.top.iter().all(|item| item.children.is_empty()));
        assert_eq!(split.top.len(), projector.items().len());

        let on_leaf = projector.mixed_split("/dashboard");
        assert_eq!(on_leaf.active_top.as_deref(), Some("/dashboard"));
        assert!(on_leaf.side.is_empty());
    }

    #[test]
    fn breadcrumbs_prepend_home_and_skip_hidden_entries() {
        let router = MemoryRouter::new(&tree(), "/redirect");
        let routing = RoutingConfig::default();

        let files = router.resolve("/kb/files", &Query::new()).unwrap();
        let crumbs = MenuProjector::breadcrumbs(&files, &routing);
        let titles: Vec<&str> = crumbs.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Dashboard", "Knowledge", "Files"]);
        assert!(crumbs[0].clickable);
        assert!(!crumbs[1].clickable, "noRedirect parent");
        assert!(!crumbs[2].clickable, "current page");

        let home = router.resolve("/dashboard", &Query::new()).unwrap();
        let crumbs = MenuProjector::breadcrumbs(&home, &routing);
        assert_eq!(crumbs.len(), 1);
    }

    #[test]
    fn breadcrumb_false_hides_entry() {
        let routes = vec![
            RouteRecord::new("/settings")
                .meta(RouteMeta {
                    breadcrumb: false,
                    ..RouteMeta::titled("Settings")
                })
                .children(vec![
                    RouteRecord::new("profile")
                        .named("Profile")
                        .meta(RouteMeta::titled("Profile")),
                ]),
        ];
        let router = MemoryRouter::new(&routes, "/redirect");
        let route = router.resolve("/settings/profile", &Query::new()).unwrap();
        let crumbs = MenuProjector::breadcrumbs(&route, &RoutingConfig::default());
        let titles: Vec<&str> = crumbs.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Dashboard", "Profile"]);
    }
}
