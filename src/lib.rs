#![forbid(unsafe_code)]

//! Admin console shell engine (`shell_chrome`): the state machine behind a
//! multi-layout, multi-theme admin UI.
//!
//! Four cooperating parts, each owning its own state:
//! 1. **View registry**: the "tags view" strip of visited pages and the set of
//!    page components kept alive, with close/refresh navigation decisions
//! 2. **Layout**: left sidebar, top bar or mixed arrangement, device detection
//!    and the mobile drawer
//! 3. **Theme engine**: exactly one active theme, swapped with a radial reveal
//!    transition when the host supports it
//! 4. **Menu projector**: route tree to navigation menu, active item,
//!    breadcrumbs
//!
//! [`shell::Shell`] composes them around a [`route::Router`].
//!
//! # Library usage
//!
//! ```rust,no_run
//! use shell_chrome::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use shell_chrome::core::config::ShellConfig;
//! use shell_chrome::registry::ViewRegistry;
//! ```

pub mod prelude;

pub mod core;
pub mod layout;
pub mod logger;
pub mod menu;
pub mod persistence;
pub mod registry;
pub mod route;
pub mod shell;
pub mod store;
pub mod theme;
