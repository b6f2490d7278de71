//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, ShellError};
use crate::core::paths;
use crate::layout::LayoutMode;
use crate::theme::ThemeName;

/// Full shell configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ShellConfig {
    pub routing: RoutingConfig,
    pub layout: LayoutConfig,
    pub theme: ThemeConfig,
    pub settings: ShellSettings,
    pub paths: PathsConfig,
}

/// Route names and paths the registry falls back to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RoutingConfig {
    /// Route name whose last-tab close forces a remount instead of a push to root.
    pub home_name: String,
    /// Path of the home page, prepended to breadcrumbs.
    pub home_path: String,
    /// Application root, the target when the last tab closes.
    pub root_path: String,
    /// Prefix of the redirect route used to remount a page.
    pub redirect_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutConfig {
    pub default_mode: LayoutMode,
    /// Viewports narrower than this (minus one pixel) are treated as mobile.
    pub mobile_breakpoint_px: u32,
    pub sidebar_opened_by_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ThemeConfig {
    pub default_theme: ThemeName,
    /// Allow animated theme swaps when the host supports view transitions.
    pub view_transitions: bool,
}

/// Chrome toggles that do not affect registry or layout semantics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShellSettings {
    pub tags_view: bool,
    pub fixed_header: bool,
    pub sidebar_logo: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub state_dir: PathBuf,
    pub event_log: PathBuf,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            home_name: "Dashboard".to_string(),
            home_path: "/dashboard".to_string(),
            root_path: "/".to_string(),
            redirect_prefix: "/redirect".to_string(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default_mode: LayoutMode::Left,
            mobile_breakpoint_px: 992,
            sidebar_opened_by_default: true,
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            default_theme: ThemeName::Normal,
            view_transitions: true,
        }
    }
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            tags_view: true,
            fixed_header: false,
            sidebar_logo: true,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let data = paths::data_dir();
        Self {
            config_file: paths::config_dir().join("config.toml"),
            state_dir: data.join("state"),
            event_log: data.join("events.jsonl"),
        }
    }
}

impl ShellConfig {
    /// Default configuration path, honoring `CHROME_CONFIG`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        env_var("CHROME_CONFIG")
            .map_or_else(|| PathsConfig::default().config_file, PathBuf::from)
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| ShellError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(ShellError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(|name| env_var(name))?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("CHROME_HOME_NAME") {
            self.routing.home_name = raw;
        }
        if let Some(raw) = lookup("CHROME_HOME_PATH") {
            self.routing.home_path = raw;
        }
        if let Some(raw) = lookup("CHROME_ROOT_PATH") {
            self.routing.root_path = raw;
        }
        if let Some(raw) = lookup("CHROME_REDIRECT_PREFIX") {
            self.routing.redirect_prefix = raw;
        }
        if let Some(raw) = lookup("CHROME_LAYOUT_MODE") {
            self.layout.default_mode = raw.parse().map_err(|details| ShellError::ConfigParse {
                context: "env",
                details: format!("CHROME_LAYOUT_MODE={raw:?}: {details}"),
            })?;
        }
        if let Some(raw) = lookup("CHROME_MOBILE_BREAKPOINT_PX") {
            self.layout.mobile_breakpoint_px = parse_env("CHROME_MOBILE_BREAKPOINT_PX", &raw)?;
        }
        if let Some(raw) = lookup("CHROME_THEME") {
            // Unknown names fall back like any other theme input.
            self.theme.default_theme = ThemeName::parse_or_default(&raw);
        }
        if let Some(raw) = lookup("CHROME_VIEW_TRANSITIONS") {
            self.theme.view_transitions = parse_env("CHROME_VIEW_TRANSITIONS", &raw)?;
        }
        if let Some(raw) = lookup("CHROME_TAGS_VIEW") {
            self.settings.tags_view = parse_env("CHROME_TAGS_VIEW", &raw)?;
        }
        if let Some(raw) = lookup("CHROME_STATE_DIR") {
            self.paths.state_dir = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("CHROME_EVENT_LOG") {
            self.paths.event_log = PathBuf::from(raw);
        }
        Ok(())
    }

    fn normalize(&mut self) {
        let home = paths::home_dir();
        self.paths.state_dir =
            paths::resolve_absolute_path(&paths::expand_tilde(&self.paths.state_dir, &home));
        self.paths.event_log =
            paths::resolve_absolute_path(&paths::expand_tilde(&self.paths.event_log, &home));

        let prefix = self.routing.redirect_prefix.trim_end_matches('/');
        self.routing.redirect_prefix = prefix.to_string();
    }

    fn validate(&self) -> Result<()> {
        let routing = &self.routing;
        if routing.home_name.trim().is_empty() {
            return Err(ShellError::InvalidConfig {
                details: "routing.home_name must not be empty".to_string(),
            });
        }
        for (name, value) in [
            ("home_path", &routing.home_path),
            ("root_path", &routing.root_path),
            ("redirect_prefix", &routing.redirect_prefix),
        ] {
            if !value.starts_with('/') {
                return Err(ShellError::InvalidConfig {
                    details: format!("routing.{name} must start with '/', got {value:?}"),
                });
            }
        }
        if routing.redirect_prefix == "/" || routing.redirect_prefix.is_empty() {
            return Err(ShellError::InvalidConfig {
                details: "routing.redirect_prefix must not be the root path".to_string(),
            });
        }
        if self.layout.mobile_breakpoint_px == 0 {
            return Err(ShellError::InvalidConfig {
                details: "layout.mobile_breakpoint_px must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|error| ShellError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
