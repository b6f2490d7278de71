//! User actions as messages, and the line-oriented script format that
//! replays them.
//!
//! ```text
//! # comment
//! navigate /kb/list?page=2
//! close /kb/list
//! close-others /kb/edit
//! close-all
//! close-left /files
//! close-right /files
//! refresh /kb/edit
//! toggle-sidebar
//! close-drawer
//! resize 375 812
//! layout mixed
//! theme dark 120 40
//! cycle-theme
//! ```

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::core::errors::{Result, ShellError};
use crate::layout::LayoutMode;
use crate::theme::Point;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ShellMsg {
    Navigate { location: String },
    CloseTag { path: String },
    CloseOthers { path: String },
    CloseAll,
    CloseLeft { path: String },
    CloseRight { path: String },
    Refresh { path: String },
    ToggleSidebar,
    CloseDrawer,
    Resize { width: u32, height: u32 },
    SetLayout { mode: LayoutMode },
    ApplyTheme { name: String, origin: Option<Point> },
    CycleTheme,
}

/// Height assumed when a resize line gives only a width.
const DEFAULT_RESIZE_HEIGHT: u32 = 900;

impl FromStr for ShellMsg {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or("empty action")?;
        let args: Vec<&str> = words.collect();

        let path = |args: &[&str]| -> std::result::Result<String, String> {
            match args {
                [path] => Ok((*path).to_string()),
                _ => Err(format!("`{verb}` expects exactly one path")),
            }
        };
        let none = |args: &[&str], msg: Self| {
            if args.is_empty() {
                Ok(msg)
            } else {
                Err(format!("`{verb}` takes no arguments"))
            }
        };

        match verb {
            "navigate" | "go" => path(&args).map(|location| Self::Navigate { location }),
            "close" => path(&args).map(|path| Self::CloseTag { path }),
            "close-others" => path(&args).map(|path| Self::CloseOthers { path }),
            "close-left" => path(&args).map(|path| Self::CloseLeft { path }),
            "close-right" => path(&args).map(|path| Self::CloseRight { path }),
            "refresh" => path(&args).map(|path| Self::Refresh { path }),
            "close-all" => none(&args, Self::CloseAll),
            "toggle-sidebar" => none(&args, Self::ToggleSidebar),
            "close-drawer" => none(&args, Self::CloseDrawer),
            "cycle-theme" => none(&args, Self::CycleTheme),
            "resize" => match args.as_slice() {
                [width] => Ok(Self::Resize {
                    width: parse_number(width)?,
                    height: DEFAULT_RESIZE_HEIGHT,
                }),
                [width, height] => Ok(Self::Resize {
                    width: parse_number(width)?,
                    height: parse_number(height)?,
                }),
                _ => Err("`resize` expects WIDTH [HEIGHT]".to_string()),
            },
            "layout" => match args.as_slice() {
                [mode] => mode.parse().map(|mode| Self::SetLayout { mode }),
                _ => Err("`layout` expects left, top or mixed".to_string()),
            },
            "theme" => match args.as_slice() {
                [name] => Ok(Self::ApplyTheme {
                    name: (*name).to_string(),
                    origin: None,
                }),
                [name, x, y] => Ok(Self::ApplyTheme {
                    name: (*name).to_string(),
                    origin: Some(Point {
                        x: parse_coordinate(x)?,
                        y: parse_coordinate(y)?,
                    }),
                }),
                _ => Err("`theme` expects NAME [X Y]".to_string()),
            },
            other => Err(format!("unknown action `{other}`")),
        }
    }
}

impl fmt::Display for ShellMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigate { location } => write!(f, "navigate {location}"),
            Self::CloseTag { path } => write!(f, "close {path}"),
            Self::CloseOthers { path } => write!(f, "close-others {path}"),
            Self::CloseAll => f.write_str("close-all"),
            Self::CloseLeft { path } => write!(f, "close-left {path}"),
            Self::CloseRight { path } => write!(f, "close-right {path}"),
            Self::Refresh { path } => write!(f, "refresh {path}"),
            Self::ToggleSidebar => f.write_str("toggle-sidebar"),
            Self::CloseDrawer => f.write_str("close-drawer"),
            Self::Resize { width, height } => write!(f, "resize {width} {height}"),
            Self::SetLayout { mode } => write!(f, "layout {mode}"),
            Self::ApplyTheme { name, origin: None } => write!(f, "theme {name}"),
            Self::ApplyTheme {
                name,
                origin: Some(p),
            } => write!(f, "theme {name} {} {}", p.x, p.y),
            Self::CycleTheme => f.write_str("cycle-theme"),
        }
    }
}

fn parse_number<T>(raw: &str) -> std::result::Result<T, String>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse().map_err(|e| format!("{raw:?}: {e}"))
}

fn parse_coordinate(raw: &str) -> std::result::Result<f64, String> {
    let value: f64 = parse_number(raw)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{raw:?}: coordinate must be finite"))
    }
}

/// Parse a whole script. Blank lines and `#` comments are skipped.
pub fn parse_script(source: &str) -> Result<Vec<ShellMsg>> {
    source
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.split('#').next().unwrap_or("").trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(line, text)| {
            text.parse()
                .map_err(|details| ShellError::ScriptParse { line, details })
        })
        .collect()
}
