//! Frame composition: which chrome is visible for the current layout.
//!
//! Each [`LayoutMode`] maps to one [`Arrangement`] strategy. On mobile the
//! strategies are overridden uniformly: the header menu goes away and the
//! full menu moves into an overlay drawer with a scrim while it is open.

#![allow(missing_docs)]

use serde::Serialize;

use crate::core::config::{RoutingConfig, ShellSettings};
use crate::layout::{Device, LayoutMode, LayoutState};
use crate::menu::{Breadcrumb, MenuItem, MenuPresentation, MenuProjector, Orientation};
use crate::registry::ViewRegistry;
use crate::route::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arrangement {
    LeftSidebar,
    TopBar,
    Mixed,
}

impl From<LayoutMode> for Arrangement {
    fn from(mode: LayoutMode) -> Self {
        match mode {
            LayoutMode::Left => Self::LeftSidebar,
            LayoutMode::Top => Self::TopBar,
            LayoutMode::Mixed => Self::Mixed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SidebarPlacement {
    Docked,
    /// Overlay drawer used on mobile.
    Drawer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuFrame {
    pub items: Vec<MenuItem>,
    pub active_key: String,
    pub open_keys: Vec<String>,
    pub presentation: MenuPresentation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SidebarFrame {
    pub placement: SidebarPlacement,
    pub opened: bool,
    pub logo: bool,
    pub menu: MenuFrame,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderFrame {
    pub fixed: bool,
    /// Sidebar toggle button.
    pub hamburger: bool,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub top_menu: Option<MenuFrame>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagFrame {
    pub path: String,
    pub full_path: String,
    pub title: String,
    pub active: bool,
    pub closable: bool,
}

/// Everything a renderer needs to draw the chrome around the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellFrame {
    pub arrangement: Arrangement,
    pub device: Device,
    pub wrapper_classes: Vec<&'static str>,
    pub header: HeaderFrame,
    pub sidebar: Option<SidebarFrame>,
    /// Click-to-close backdrop behind the mobile drawer.
    pub scrim: bool,
    /// `None` when the tag strip is switched off.
    pub tags: Option<Vec<TagFrame>>,
    /// Page components kept mounted.
    pub cached_views: Vec<String>,
}

/// Read-only inputs of a frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext<'a> {
    pub layout: LayoutState,
    pub route: &'a Route,
    pub menu: &'a MenuProjector,
    pub registry: &'a ViewRegistry,
    pub settings: &'a ShellSettings,
    pub routing: &'a RoutingConfig,
}

impl Arrangement {
    fn header(self, ctx: &FrameContext<'_>, active: &str) -> HeaderFrame {
        let presentation =
            MenuProjector::presentation(ctx.layout.resolver(), ctx.layout.sidebar_opened);
        let top_menu = match self {
            Self::LeftSidebar => None,
            Self::TopBar => Some(MenuFrame {
                items: ctx.menu.items().to_vec(),
                active_key: active.to_string(),
                open_keys: Vec::new(),
                presentation,
            }),
            Self::Mixed => {
                let split = ctx.menu.mixed_split(active);
                Some(MenuFrame {
                    items: split.top,
                    active_key: split.active_top.unwrap_or_default(),
                    open_keys: Vec::new(),
                    presentation: MenuPresentation {
                        orientation: Orientation::Horizontal,
                        collapsed: false,
                        flyout_submenus: true,
                    },
                })
            }
        };
        HeaderFrame {
            fixed: ctx.settings.fixed_header,
            hamburger: !matches!(self, Self::TopBar),
            breadcrumbs: if matches!(self, Self::TopBar) {
                Vec::new()
            } else {
                MenuProjector::breadcrumbs(ctx.route, ctx.routing)
            },
            top_menu,
        }
    }

    fn sidebar(self, ctx: &FrameContext<'_>, active: &str) -> Option<SidebarFrame> {
        let items = match self {
            Self::LeftSidebar => ctx.menu.items().to_vec(),
            Self::TopBar => return None,
            Self::Mixed => ctx.menu.mixed_split(active).side,
        };
        let open_keys = ctx.menu.open_keys(active);
        Some(SidebarFrame {
            placement: SidebarPlacement::Docked,
            opened: ctx.layout.sidebar_opened,
            logo: ctx.settings.sidebar_logo,
            menu: MenuFrame {
                items,
                active_key: active.to_string(),
                open_keys,
                presentation: MenuProjector::presentation(
                    ctx.layout.resolver(),
                    ctx.layout.sidebar_opened,
                ),
            },
        })
    }
}

/// Compose the frame for `ctx`.
#[must_use]
pub fn compose(ctx: &FrameContext<'_>) -> ShellFrame {
    let arrangement = Arrangement::from(ctx.layout.layout_mode);
    let active = MenuProjector::active_key(ctx.route);
    let mut header = arrangement.header(ctx, &active);
    let mut sidebar = arrangement.sidebar(ctx, &active);

    let mobile = ctx.layout.device == Device::Mobile;
    if mobile {
        header.top_menu = None;
        header.hamburger = true;
        sidebar = Some(SidebarFrame {
            placement: SidebarPlacement::Drawer,
            opened: ctx.layout.sidebar_opened,
            logo: ctx.settings.sidebar_logo,
            menu: MenuFrame {
                items: ctx.menu.items().to_vec(),
                open_keys: ctx.menu.open_keys(&active),
                active_key: active,
                presentation: MenuProjector::presentation(
                    ctx.layout.resolver(),
                    ctx.layout.sidebar_opened,
                ),
            },
        });
    }

    let tags = ctx.settings.tags_view.then(|| {
        ctx.registry
            .visited()
            .iter()
            .map(|view| TagFrame {
                path: view.path.clone(),
                full_path: view.full_path.clone(),
                title: view.title.clone(),
                active: view.path == ctx.route.path,
                closable: !view.affixed,
            })
            .collect()
    });

    ShellFrame {
        arrangement,
        device: ctx.layout.device,
        wrapper_classes: ctx.layout.wrapper_classes(),
        header,
        sidebar,
        scrim: mobile && ctx.layout.sidebar_opened,
        tags,
        cached_views: ctx.registry.cached().to_vec(),
    }
}
