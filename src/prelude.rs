//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use shell_chrome::prelude::*;
//! ```

// Core
pub use crate::core::config::ShellConfig;
pub use crate::core::errors::{Result, ShellError};

// State
pub use crate::store::{Store, SubscriptionId};

// Routing
pub use crate::route::{MemoryRouter, Navigation, Query, Route, RouteMeta, RouteRecord, Router};

// Chrome
pub use crate::layout::{Device, LayoutMode, LayoutResolver, LayoutState};
pub use crate::menu::{Breadcrumb, MenuItem, MenuProjector};
pub use crate::registry::{ViewRegistry, VisitedView};
pub use crate::theme::{HeadlessHost, Point, ThemeEngine, ThemeHost, ThemeName, Viewport};

// Composition
pub use crate::logger::jsonl::{JsonlWriter, SharedEventLog};
pub use crate::persistence::{FileStorage, KeyValueStorage, MemoryStorage, SharedStorage};
pub use crate::shell::{Shell, ShellFrame, ShellMsg};
