//! Layout state (sidebar, device, arrangement) and its read-side resolver.

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Structural arrangement of the chrome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Sidebar menu on the left.
    #[default]
    Left,
    /// Horizontal menu in the header.
    Top,
    /// Top-level sections in the header, their children in the sidebar.
    Mixed,
}

impl LayoutMode {
    pub const ALL: [Self; 3] = [Self::Left, Self::Top, Self::Mixed];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Top => "top",
            Self::Mixed => "mixed",
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown layout mode {s:?} (expected left, top or mixed)"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    #[default]
    Desktop,
    Mobile,
}

impl Device {
    /// Classify a viewport width against the mobile breakpoint.
    #[must_use]
    pub const fn from_viewport_width(width: u32, breakpoint: u32) -> Self {
        if width.saturating_sub(1) < breakpoint {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Mobile => "mobile",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process-wide layout state, observed through a `Store<LayoutState>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutState {
    pub sidebar_opened: bool,
    /// Suppress the collapse transition (resize-triggered closes).
    pub sidebar_without_animation: bool,
    pub layout_mode: LayoutMode,
    pub device: Device,
}

impl Default for LayoutState {
    fn default() -> Self {
        Self {
            sidebar_opened: true,
            sidebar_without_animation: false,
            layout_mode: LayoutMode::Left,
            device: Device::Desktop,
        }
    }
}

impl LayoutState {
    pub fn toggle_sidebar(&mut self) {
        self.sidebar_opened = !self.sidebar_opened;
        self.sidebar_without_animation = false;
    }

    pub fn close_sidebar(&mut self, without_animation: bool) {
        self.sidebar_opened = false;
        self.sidebar_without_animation = without_animation;
    }

    /// Apply a viewport width. Becoming mobile closes the sidebar without animation.
    pub fn resize(&mut self, width: u32, breakpoint: u32) {
        self.device = Device::from_viewport_width(width, breakpoint);
        if self.device == Device::Mobile {
            self.close_sidebar(true);
        }
    }

    /// Wrapper classes the page shell carries for the current state.
    #[must_use]
    pub fn wrapper_classes(&self) -> Vec<&'static str> {
        let mut classes = vec![if self.sidebar_opened {
            "openSidebar"
        } else {
            "hideSidebar"
        }];
        if self.sidebar_without_animation {
            classes.push("withoutAnimation");
        }
        if self.device == Device::Mobile {
            classes.push("mobile");
        }
        classes
    }

    #[must_use]
    pub fn resolver(&self) -> LayoutResolver {
        LayoutResolver::from(self)
    }
}

/// Pure projection of [`LayoutState`] consumed by every shell component.
///
/// Cheap to build; recompute it on every render instead of caching it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutResolver {
    mode: LayoutMode,
    device: Device,
}

impl From<&LayoutState> for LayoutResolver {
    fn from(state: &LayoutState) -> Self {
        Self {
            mode: state.layout_mode,
            device: state.device,
        }
    }
}

impl LayoutResolver {
    #[must_use]
    pub const fn mode(self) -> LayoutMode {
        self.mode
    }

    #[must_use]
    pub const fn is_left_sidebar(self) -> bool {
        matches!(self.mode, LayoutMode::Left)
    }

    #[must_use]
    pub const fn is_top_bar(self) -> bool {
        matches!(self.mode, LayoutMode::Top)
    }

    #[must_use]
    pub const fn is_mixed(self) -> bool {
        matches!(self.mode, LayoutMode::Mixed)
    }

    #[must_use]
    pub const fn is_mobile(self) -> bool {
        matches!(self.device, Device::Mobile)
    }

    /// A sidebar (docked or drawer) is part of the chrome.
    #[must_use]
    pub const fn shows_sidebar(self) -> bool {
        self.is_mobile() || !self.is_top_bar()
    }

    /// A horizontal menu is rendered in the header.
    #[must_use]
    pub const fn shows_top_menu(self) -> bool {
        !self.is_mobile() && !self.is_left_sidebar()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakpoint_uses_width_minus_one() {
        assert_eq!(Device::from_viewport_width(992, 992), Device::Mobile);
        assert_eq!(Device::from_viewport_width(993, 992), Device::Desktop);
        assert_eq!(Device::from_viewport_width(0, 992), Device::Mobile);
    }

    #[test]
    fn toggle_clears_without_animation() {
        let mut state = LayoutState::default();
        state.close_sidebar(true);
        assert!(state.sidebar_without_animation);
        state.toggle_sidebar();
        assert!(state.sidebar_opened);
        assert!(!state.sidebar_without_animation);
    }

    #[test]
    fn resize_to_mobile_closes_without_animation() {
        let mut state = LayoutState::default();
        state.resize(375, 992);
        assert_eq!(state.device, Device::Mobile);
        assert!(!state.sidebar_opened);
        assert!(state.sidebar_without_animation);

        state.resize(1440, 992);
        assert_eq!(state.device, Device::Desktop);
        assert!(!state.sidebar_opened, "returning to desktop does not reopen");
    }

    #[test]
    fn resolver_predicates_are_exclusive() {
        for mode in LayoutMode::ALL {
            let state = LayoutState {
                layout_mode: mode,
                ..LayoutState::default()
            };
            let r = state.resolver();
            let flags = [r.is_left_sidebar(), r.is_top_bar(), r.is_mixed()];
            assert_eq!(flags.iter().filter(|f| **f).count(), 1, "{mode}");
        }
    }

    #[test]
    fn mobile_always_shows_sidebar_and_never_top_menu() {
        let state = LayoutState {
            layout_mode: LayoutMode::Top,
            device: Device::Mobile,
            ..LayoutState::default()
        };
        let r = state.resolver();
        assert!(r.shows_sidebar());
        assert!(!r.shows_top_menu());
    }

    #[test]
    fn mixed_desktop_shows_both_menus() {
        let r = LayoutState {
            layout_mode: LayoutMode::Mixed,
            ..LayoutState::default()
        }
        .resolver();
        assert!(r.shows_sidebar());
        assert!(r.shows_top_menu());
    }

    #[test]
    fn layout_mode_parses_case_insensitively() {
        assert_eq!("Mixed".parse::<LayoutMode>(), Ok(LayoutMode::Mixed));
        assert!("diagonal".parse::<LayoutMode>().is_err());
        assert_eq!(serde_json::to_string(&LayoutMode::Top).unwrap(), "\"top\"");
    }

    #[test]
    fn wrapper_classes_track_state() {
        let mut state = LayoutState::default();
        assert_eq!(state.wrapper_classes(), vec!["openSidebar"]);
        state.resize(400, 992);
        assert_eq!(
            state.wrapper_classes(),
            vec!["hideSidebar", "withoutAnimation", "mobile"]
        );
    }
}
