//! Shell composition root.
//!
//! [`Shell`] owns every piece of chrome state (layout store, theme engine,
//! tag registry, menu projection) together with the router and the event
//! log. All user actions enter through its methods or [`Shell::dispatch`];
//! each one mutates state synchronously, then hands any resulting
//! [`Navigation`] to the router and runs the route-change pipeline.

#![allow(missing_docs)]

pub mod arrangement;
pub mod msg;

use std::sync::Arc;

use serde::Serialize;

use crate::core::config::ShellConfig;
use crate::core::errors::Result;
use crate::layout::{Device, LayoutMode, LayoutState};
use crate::logger::jsonl::{self, EventType, LogEntry, SharedEventLog};
use crate::menu::MenuProjector;
use crate::persistence::{self, SharedStorage};
use crate::registry::{RegistryEvent, ViewRegistry, VisitedView};
use crate::route::{Navigation, Route, RouteRecord, Router, parse_location};
use crate::store::Store;
use crate::theme::{Point, ThemeApplied, ThemeEngine, ThemeHost, ThemeName, Viewport};

pub use arrangement::{Arrangement, FrameContext, ShellFrame, compose};
pub use msg::{ShellMsg, parse_script};

/// Serializable summary of the shell, printed by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShellSnapshot {
    pub route: String,
    pub route_name: Option<String>,
    pub theme: ThemeName,
    pub layout: LayoutState,
    pub active_menu: String,
    pub open_menus: Vec<String>,
    pub visited: Vec<VisitedView>,
    pub cached: Vec<String>,
}

pub struct Shell<R, H> {
    config: ShellConfig,
    router: R,
    theme: ThemeEngine<H>,
    layout: Store<LayoutState>,
    registry: ViewRegistry,
    menu: MenuProjector,
    events: SharedEventLog,
}

impl<R, H> std::fmt::Debug for Shell<R, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell")
            .field("layout", &self.layout.get())
            .field("visited", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl<R: Router, H: ThemeHost> Shell<R, H> {
    /// Restore persisted preferences, bind persistence and logging, seed the
    /// affixed tags and register whatever route the router is already on.
    pub fn new(
        config: ShellConfig,
        routes: &[RouteRecord],
        router: R,
        host: H,
        storage: SharedStorage,
        events: SharedEventLog,
    ) -> Result<Self> {
        let stored = persistence::load_preferences(&storage, &events);

        let theme_store = Store::new(stored.theme.unwrap_or(config.theme.default_theme));
        persistence::bind_theme(&theme_store, Arc::clone(&storage), Arc::clone(&events));
        let theme = ThemeEngine::new(
            theme_store,
            host,
            config.theme.default_theme,
            config.theme.view_transitions,
        );

        // Start from the desktop view of the stored state so the layout
        // binding remembers the desktop sidebar choice, then detect the device.
        let layout = Store::new(LayoutState {
            sidebar_opened: stored
                .layout
                .map_or(config.layout.sidebar_opened_by_default, |p| p.sidebar_opened),
            sidebar_without_animation: false,
            layout_mode: stored
                .layout
                .map_or(config.layout.default_mode, |p| p.layout_mode),
            device: Device::Desktop,
        });
        persistence::bind_layout(&layout, storage, Arc::clone(&events));
        bind_layout_log(&layout, Arc::clone(&events));
        let width = viewport_px(theme.host().viewport().width);
        let breakpoint = config.layout.mobile_breakpoint_px;
        layout.update(|state| state.resize(width, breakpoint));

        let mut registry = ViewRegistry::new(config.routing.clone());
        bind_registry_log(&mut registry, Arc::clone(&events));
        registry.init_affixed(routes)?;

        let mut shell = Self {
            menu: MenuProjector::project(routes),
            config,
            router,
            theme,
            layout,
            registry,
            events,
        };
        shell.on_route_change();
        Ok(shell)
    }

    // ──────────────────── reads ────────────────────

    #[must_use]
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    #[must_use]
    pub fn router(&self) -> &R {
        &self.router
    }

    #[must_use]
    pub fn current(&self) -> &Route {
        self.router.current()
    }

    #[must_use]
    pub fn registry(&self) -> &ViewRegistry {
        &self.registry
    }

    /// Registry handle for attaching renderers.
    pub fn registry_mut(&mut self) -> &mut ViewRegistry {
        &mut self.registry
    }

    #[must_use]
    pub fn layout(&self) -> &Store<LayoutState> {
        &self.layout
    }

    #[must_use]
    pub fn theme(&self) -> &ThemeEngine<H> {
        &self.theme
    }

    #[must_use]
    pub fn host(&self) -> &H {
        self.theme.host()
    }

    pub fn host_mut(&mut self) -> &mut H {
        self.theme.host_mut()
    }

    #[must_use]
    pub fn menu(&self) -> &MenuProjector {
        &self.menu
    }

    #[must_use]
    pub fn events(&self) -> &SharedEventLog {
        &self.events
    }

    #[must_use]
    pub fn active_menu(&self) -> String {
        MenuProjector::active_key(self.router.current())
    }

    #[must_use]
    pub fn frame(&self) -> ShellFrame {
        compose(&FrameContext {
            layout: self.layout.get(),
            route: self.router.current(),
            menu: &self.menu,
            registry: &self.registry,
            settings: &self.config.settings,
            routing: &self.config.routing,
        })
    }

    #[must_use]
    pub fn snapshot(&self) -> ShellSnapshot {
        let route = self.router.current();
        let active_menu = self.active_menu();
        ShellSnapshot {
            route: route.full_path.clone(),
            route_name: route.name.clone(),
            theme: self.theme.active(),
            layout: self.layout.get(),
            open_menus: self.menu.open_keys(&active_menu),
            active_menu,
            visited: self.registry.visited().to_vec(),
            cached: self.registry.cached().to_vec(),
        }
    }

    // ──────────────────── navigation ────────────────────

    /// Push a location such as `/kb/edit?id=3`.
    pub fn navigate(&mut self, location: &str) -> Result<()> {
        self.perform(&Navigation::push_location(location))
    }

    /// Hand a navigation to the router, then run the route-change pipeline.
    pub fn perform(&mut self, navigation: &Navigation) -> Result<()> {
        if let Err(e) = self.router.perform(navigation) {
            let mut entry = LogEntry::failure(EventType::Navigation, &e);
            entry.navigation = Some(navigation.to_string());
            jsonl::record(&self.events, &entry);
            return Err(e);
        }
        let mut entry = LogEntry::info(EventType::Navigation);
        entry.navigation = Some(navigation.to_string());
        entry.path = Some(self.router.current().full_path.clone());
        entry.ok = Some(true);
        jsonl::record(&self.events, &entry);
        self.on_route_change();
        Ok(())
    }

    /// Settle-time bookkeeping for the router's current route.
    pub fn on_route_change(&mut self) {
        let route = self.router.current().clone();
        self.registry.register(&route);
        self.registry.update_visited(&route);
        let state = self.layout.get();
        if state.device == Device::Mobile && state.sidebar_opened {
            self.layout.update(|s| s.close_sidebar(false));
        }
    }

    fn follow(&mut self, navigation: Option<Navigation>) -> Result<Option<Navigation>> {
        if let Some(nav) = &navigation {
            self.perform(nav)?;
        }
        Ok(navigation)
    }

    /// Tags are keyed by path; accept the full path the strip displays too.
    fn view(&self, location: &str) -> Option<VisitedView> {
        let (path, _) = parse_location(location);
        self.registry.get(&path).cloned()
    }

    // ──────────────────── tag strip ────────────────────

    pub fn close_tag(&mut self, path: &str) -> Result<Option<Navigation>> {
        let Some(view) = self.view(path) else {
            return Ok(None);
        };
        let current = self.router.current().clone();
        let nav = self.registry.close_one(&view, &current);
        self.follow(nav)
    }

    pub fn close_others(&mut self, path: &str) -> Result<Option<Navigation>> {
        let Some(view) = self.view(path) else {
            return Ok(None);
        };
        let current = self.router.current().clone();
        let nav = self.registry.close_others(&view, &current);
        self.follow(nav)
    }

    pub fn close_all(&mut self) -> Result<Option<Navigation>> {
        let current = self.router.current().clone();
        let nav = self.registry.close_all(&current);
        self.follow(nav)
    }

    pub fn close_left(&mut self, path: &str) -> Result<Option<Navigation>> {
        let Some(view) = self.view(path) else {
            return Ok(None);
        };
        let current = self.router.current().clone();
        let nav = self.registry.close_left(&view, &current);
        self.follow(nav)
    }

    pub fn close_right(&mut self, path: &str) -> Result<Option<Navigation>> {
        let Some(view) = self.view(path) else {
            return Ok(None);
        };
        let current = self.router.current().clone();
        let nav = self.registry.close_right(&view, &current);
        self.follow(nav)
    }

    /// Remount the page behind a tag.
    pub fn refresh(&mut self, path: &str) -> Result<Option<Navigation>> {
        let Some(view) = self.view(path) else {
            return Ok(None);
        };
        let nav = self.registry.refresh(&view);
        self.follow(Some(nav))
    }

    // ──────────────────── layout ────────────────────

    pub fn toggle_sidebar(&mut self) {
        self.layout.update(LayoutState::toggle_sidebar);
    }

    /// Scrim click: close the mobile drawer.
    pub fn close_drawer(&mut self) {
        let state = self.layout.get();
        if state.device == Device::Mobile && state.sidebar_opened {
            self.layout.update(|s| s.close_sidebar(false));
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.theme.host_mut().set_viewport(Viewport {
            width: f64::from(width),
            height: f64::from(height),
        });
        let breakpoint = self.config.layout.mobile_breakpoint_px;
        self.layout.update(|s| s.resize(width, breakpoint));
    }

    pub fn set_layout_mode(&mut self, mode: LayoutMode) {
        self.layout.update(|s| s.layout_mode = mode);
    }

    // ──────────────────── theme ────────────────────

    pub fn apply_theme(&mut self, name: &str, origin: Option<Point>) -> ThemeApplied {
        let applied = self.theme.apply(name, origin);
        self.log_theme(&applied, name);
        applied
    }

    pub fn cycle_theme(&mut self, origin: Option<Point>) -> ThemeApplied {
        let applied = self.theme.cycle(origin);
        self.log_theme(&applied, applied.theme.as_str());
        applied
    }

    fn log_theme(&self, applied: &ThemeApplied, requested: &str) {
        let mut entry = LogEntry::info(EventType::ThemeApplied);
        entry.theme = Some(applied.theme.to_string());
        entry.details = Some(format!(
            "requested={requested} previous={} fell_back={} animated={}",
            applied.previous, applied.fell_back, applied.animated
        ));
        jsonl::record(&self.events, &entry);
    }

    // ──────────────────── messages ────────────────────

    /// Apply one user action. Returns the navigation it caused, if any.
    pub fn dispatch(&mut self, msg: ShellMsg) -> Result<Option<Navigation>> {
        match msg {
            ShellMsg::Navigate { location } => {
                let nav = Navigation::push_location(&location);
                self.follow(Some(nav))
            }
            ShellMsg::CloseTag { path } => self.close_tag(&path),
            ShellMsg::CloseOthers { path } => self.close_others(&path),
            ShellMsg::CloseAll => self.close_all(),
            ShellMsg::CloseLeft { path } => self.close_left(&path),
            ShellMsg::CloseRight { path } => self.close_right(&path),
            ShellMsg::Refresh { path } => self.refresh(&path),
            ShellMsg::ToggleSidebar => {
                self.toggle_sidebar();
                Ok(None)
            }
            ShellMsg::CloseDrawer => {
                self.close_drawer();
                Ok(None)
            }
            ShellMsg::Resize { width, height } => {
                self.resize(width, height);
                Ok(None)
            }
            ShellMsg::SetLayout { mode } => {
                self.set_layout_mode(mode);
                Ok(None)
            }
            ShellMsg::ApplyTheme { name, origin } => {
                self.apply_theme(&name, origin);
                Ok(None)
            }
            ShellMsg::CycleTheme => {
                self.cycle_theme(None);
                Ok(None)
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn viewport_px(width: f64) -> u32 {
    width.clamp(0.0, f64::from(u32::MAX)).round() as u32
}

/// Mirror registry changes into the event log.
fn bind_registry_log(registry: &mut ViewRegistry, events: SharedEventLog) {
    registry.subscribe(move |event| {
        let entry = match event {
            RegistryEvent::Seeded { paths } => {
                let mut entry = LogEntry::info(EventType::ViewRegistered);
                entry.paths = Some(paths.clone());
                entry.details = Some("affixed".to_string());
                entry
            }
            RegistryEvent::Registered { path, cached } => {
                let mut entry = LogEntry::info(EventType::ViewRegistered);
                entry.path = Some(path.clone());
                entry.details = Some(format!("cached={cached}"));
                entry
            }
            RegistryEvent::Closed { paths } if paths.len() == 1 => {
                let mut entry = LogEntry::info(EventType::ViewClosed);
                entry.path = paths.first().cloned();
                entry
            }
            RegistryEvent::Closed { paths } => {
                let mut entry = LogEntry::info(EventType::ViewsBulkClosed);
                entry.paths = Some(paths.clone());
                entry
            }
            RegistryEvent::CacheEvicted { name } => {
                let mut entry = LogEntry::info(EventType::ViewRefreshed);
                entry.name = Some(name.clone());
                entry
            }
            RegistryEvent::Updated { .. } => return,
        };
        jsonl::record(&events, &entry);
    });
}

/// Log layout-mode, sidebar and device transitions.
fn bind_layout_log(layout: &Store<LayoutState>, events: SharedEventLog) {
    let mut previous = layout.get();
    layout.subscribe(move |state| {
        if state.device != previous.device {
            let mut entry = LogEntry::info(EventType::DeviceChanged);
            entry.device = Some(state.device.to_string());
            jsonl::record(&events, &entry);
        }
        if state.layout_mode != previous.layout_mode
            || state.sidebar_opened != previous.sidebar_opened
        {
            let mut entry = LogEntry::info(EventType::LayoutChanged);
            entry.layout_mode = Some(state.layout_mode.to_string());
            entry.sidebar_opened = Some(state.sidebar_opened);
            entry.device = Some(state.device.to_string());
            jsonl::record(&events, &entry);
        }
        previous = *state;
    });
}
