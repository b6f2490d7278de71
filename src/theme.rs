//! Theme engine: one active theme class on the document root, persisted
//! through a store subscription, swapped behind a radial-reveal transition.
//!
//! State commits synchronously: by the time [`ThemeEngine::apply`] returns,
//! the store holds the new theme and the root carries exactly its class. The
//! reveal animation, when the host supports one, is scheduled afterwards and
//! never gates the commit.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::store::Store;

/// Root style variables carrying the reveal geometry.
pub const REVEAL_X_VAR: &str = "--theme-reveal-x";
pub const REVEAL_Y_VAR: &str = "--theme-reveal-y";
pub const REVEAL_R_VAR: &str = "--theme-reveal-r";

/// Registered themes. Anything else falls back to [`ThemeName::Normal`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ThemeName {
    #[default]
    Normal,
    Dark,
    DarkBlue,
}

impl ThemeName {
    pub const ALL: [Self; 3] = [Self::Normal, Self::Dark, Self::DarkBlue];

    /// Root class and persisted identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Dark => "dark",
            Self::DarkBlue => "dark-blue",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|theme| theme.as_str().eq_ignore_ascii_case(raw))
    }

    #[must_use]
    pub fn parse_or_default(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_default()
    }

    /// Header toggle order.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Normal => Self::Dark,
            Self::Dark => Self::DarkBlue,
            Self::DarkBlue => Self::Normal,
        }
    }
}

impl fmt::Display for ThemeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ThemeName {
    fn from(value: String) -> Self {
        Self::parse_or_default(&value)
    }
}

impl From<ThemeName> for String {
    fn from(value: ThemeName) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    #[must_use]
    pub fn center(self) -> Point {
        Point {
            x: self.width / 2.0,
            y: self.height / 2.0,
        }
    }
}

/// Distance from `origin` to the farthest viewport corner.
#[must_use]
pub fn reveal_radius(origin: Point, viewport: Viewport) -> f64 {
    let dx = origin.x.max(viewport.width - origin.x);
    let dy = origin.y.max(viewport.height - origin.y);
    dx.hypot(dy)
}

/// Model of the document root: its class list and inline style variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RootElement {
    classes: Vec<String>,
    style: BTreeMap<String, String>,
}

impl RootElement {
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.retain(|c| c != class);
    }

    pub fn set_style_var(&mut self, name: &str, value: String) {
        self.style.insert(name.to_string(), value);
    }

    #[must_use]
    pub fn style_var(&self, name: &str) -> Option<&str> {
        self.style.get(name).map(String::as_str)
    }

    /// Theme classes currently on the root.
    #[must_use]
    pub fn theme_classes(&self) -> Vec<ThemeName> {
        ThemeName::ALL
            .into_iter()
            .filter(|theme| self.has_class(theme.as_str()))
            .collect()
    }
}

/// A scheduled visual swap. Purely cosmetic; state has already changed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RevealTransition {
    pub from: ThemeName,
    pub to: ThemeName,
    pub origin: Point,
    pub radius: f64,
}

/// The environment the theme engine paints into.
pub trait ThemeHost {
    fn viewport(&self) -> Viewport;
    fn set_viewport(&mut self, viewport: Viewport);
    fn root(&self) -> &RootElement;
    fn root_mut(&mut self) -> &mut RootElement;
    fn supports_view_transition(&self) -> bool;
    /// Fire-and-forget; implementations must not block.
    fn start_view_transition(&mut self, transition: RevealTransition);
}

/// In-process host: records transitions instead of animating them.
#[derive(Debug, Clone)]
pub struct HeadlessHost {
    viewport: Viewport,
    root: RootElement,
    transitions_supported: bool,
    pending: Vec<RevealTransition>,
}

impl HeadlessHost {
    #[must_use]
    pub fn new(viewport: Viewport, transitions_supported: bool) -> Self {
        Self {
            viewport,
            root: RootElement::default(),
            transitions_supported,
            pending: Vec::new(),
        }
    }

    /// Transitions scheduled but not yet painted.
    #[must_use]
    pub fn pending_transitions(&self) -> &[RevealTransition] {
        &self.pending
    }

    /// Simulate the next paint: every scheduled animation completes.
    pub fn finish_transitions(&mut self) -> Vec<RevealTransition> {
        std::mem::take(&mut self.pending)
    }
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new(
            Viewport {
                width: 1440.0,
                height: 900.0,
            },
            false,
        )
    }
}

impl ThemeHost for HeadlessHost {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn root(&self) -> &RootElement {
        &self.root
    }

    fn root_mut(&mut self) -> &mut RootElement {
        &mut self.root
    }

    fn supports_view_transition(&self) -> bool {
        self.transitions_supported
    }

    fn start_view_transition(&mut self, transition: RevealTransition) {
        self.pending.push(transition);
    }
}

/// Outcome of [`ThemeEngine::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThemeApplied {
    pub theme: ThemeName,
    pub previous: ThemeName,
    /// The requested identifier was unknown and the default was used.
    pub fell_back: bool,
    pub origin: Point,
    pub radius: f64,
    pub animated: bool,
}

#[derive(Debug)]
pub struct ThemeEngine<H> {
    store: Store<ThemeName>,
    host: H,
    fallback: ThemeName,
    transitions_enabled: bool,
}

impl<H: ThemeHost> ThemeEngine<H> {
    /// Bind to `store` and paint its current theme onto the host root.
    pub fn new(store: Store<ThemeName>, host: H, fallback: ThemeName, transitions: bool) -> Self {
        let mut engine = Self {
            store,
            host,
            fallback,
            transitions_enabled: transitions,
        };
        let initial = engine.store.get();
        engine.swap_root_class(initial);
        engine
    }

    #[must_use]
    pub fn active(&self) -> ThemeName {
        self.store.get()
    }

    #[must_use]
    pub fn store(&self) -> &Store<ThemeName> {
        &self.store
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Switch themes. Never fails: unknown names resolve to the fallback.
    ///
    /// `origin` anchors the reveal; the viewport centre is used without one
    /// or when it is not a finite point.
    pub fn apply(&mut self, name: &str, origin: Option<Point>) -> ThemeApplied {
        let parsed = ThemeName::parse(name);
        let theme = parsed.unwrap_or(self.fallback);
        self.apply_theme(theme, origin, parsed.is_none())
    }

    /// Advance to the next registered theme.
    pub fn cycle(&mut self, origin: Option<Point>) -> ThemeApplied {
        let next = self.active().next();
        self.apply_theme(next, origin, false)
    }

    fn apply_theme(&mut self, theme: ThemeName, origin: Option<Point>, fell_back: bool) -> ThemeApplied {
        let viewport = self.host.viewport();
        let origin = origin
            .filter(|point| point.is_finite())
            .unwrap_or_else(|| viewport.center());
        let radius = reveal_radius(origin, viewport);

        let root = self.host.root_mut();
        root.set_style_var(REVEAL_X_VAR, format!("{}px", origin.x));
        root.set_style_var(REVEAL_Y_VAR, format!("{}px", origin.y));
        root.set_style_var(REVEAL_R_VAR, format!("{radius}px"));

        let previous = self.store.get();
        // Persistence subscribers run inside this call.
        self.store.set(theme);
        self.swap_root_class(theme);

        let animated = self.transitions_enabled
            && previous != theme
            && self.host.supports_view_transition();
        if animated {
            self.host.start_view_transition(RevealTransition {
                from: previous,
                to: theme,
                origin,
                radius,
            });
        }

        ThemeApplied {
            theme,
            previous,
            fell_back,
            origin,
            radius,
            animated,
        }
    }

    /// Remove every other theme class first, then add the new one.
    fn swap_root_class(&mut self, theme: ThemeName) {
        let root = self.host.root_mut();
        for other in ThemeName::ALL.into_iter().filter(|t| *t != theme) {
            root.remove_class(other.as_str());
        }
        root.add_class(theme.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(transitions: bool) -> ThemeEngine<HeadlessHost> {
        let host = HeadlessHost::new(
            Viewport {
                width: 1000.0,
                height: 800.0,
            },
            transitions,
        );
        ThemeEngine::new(Store::new(ThemeName::Normal), host, ThemeName::Normal, true)
    }

    #[test]
    fn radius_reaches_farthest_corner() {
        let viewport = Viewport {
            width: 1000.0,
            height: 800.0,
        };
        let r = reveal_radius(Point { x: 100.0, y: 200.0 }, viewport);
        assert!((r - 900.0_f64.hypot(600.0)).abs() < 1e-9);
        let centre = reveal_radius(viewport.center(), viewport);
        assert!((centre - 500.0_f64.hypot(400.0)).abs() < 1e-9);
    }

    #[test]
    fn construction_paints_initial_class() {
        let engine = engine(false);
        assert_eq!(engine.host().root().theme_classes(), vec![ThemeName::Normal]);
    }

    #[test]
    fn apply_leaves_exactly_one_theme_class() {
        let mut engine = engine(false);
        for name in ["dark", "dark-blue", "normal", "dark"] {
            let applied = engine.apply(name, None);
            assert!(!applied.fell_back);
            assert_eq!(engine.host().root().theme_classes(), vec![applied.theme]);
        }
        assert_eq!(engine.active(), ThemeName::Dark);
    }

    #[test]
    fn unknown_theme_falls_back_to_default() {
        let mut engine = engine(false);
        engine.apply("dark", None);
        let applied = engine.apply("bogus-theme", None);
        assert!(applied.fell_back);
        assert_eq!(applied.theme, ThemeName::Normal);
        assert_eq!(engine.host().root().classes(), ["normal".to_string()]);
    }

    #[test]
    fn non_finite_origin_reveals_from_centre() {
        let mut engine = engine(false);
        let applied = engine.apply(
            "dark",
            Some(Point {
                x: f64::NAN,
                y: f64::INFINITY,
            }),
        );
        assert_eq!(applied.origin, Point { x: 500.0, y: 400.0 });
        assert!(applied.radius.is_finite());
        let root = engine.host().root();
        assert_eq!(root.style_var(REVEAL_X_VAR), Some("500px"));
        assert_eq!(root.style_var(REVEAL_Y_VAR), Some("400px"));
    }

    #[test]
    fn reveal_geometry_lands_on_root_style() {
        let mut engine = engine(false);
        engine.apply("dark", Some(Point { x: 10.0, y: 20.0 }));
        let root = engine.host().root();
        assert_eq!(root.style_var(REVEAL_X_VAR), Some("10px"));
        assert_eq!(root.style_var(REVEAL_Y_VAR), Some("20px"));
        assert!(root.style_var(REVEAL_R_VAR).is_some());
    }

    #[test]
    fn transition_is_scheduled_after_commit() {
        let mut engine = engine(true);
        let applied = engine.apply("dark-blue", Some(Point { x: 0.0, y: 0.0 }));
        assert!(applied.animated);
        // State and class are already authoritative before the paint.
        assert_eq!(engine.active(), ThemeName::DarkBlue);
        assert!(engine.host().root().has_class("dark-blue"));
        let finished = engine.host_mut().finish_transitions();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].from, ThemeName::Normal);
    }

    #[test]
    fn no_transition_without_host_support_or_change() {
        let mut engine = engine(false);
        assert!(!engine.apply("dark", None).animated);

        let mut engine = self::engine(true);
        assert!(!engine.apply("normal", None).animated);
        assert!(engine.host().pending_transitions().is_empty());
    }

    #[test]
    fn cycle_walks_registered_order() {
        let mut engine = engine(false);
        assert_eq!(engine.cycle(None).theme, ThemeName::Dark);
        assert_eq!(engine.cycle(None).theme, ThemeName::DarkBlue);
        assert_eq!(engine.cycle(None).theme, ThemeName::Normal);
    }

    #[test]
    fn serde_falls_back_on_unknown_identifier() {
        let theme: ThemeName = serde_json::from_str("\"solarized\"").unwrap();
        assert_eq!(theme, ThemeName::Normal);
        assert_eq!(serde_json::to_string(&ThemeName::DarkBlue).unwrap(), "\"dark-blue\"");
    }
}
