//! Top-level CLI definition and dispatch.

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use shell_chrome::core::config::ShellConfig;
use shell_chrome::core::errors::ShellError;
use shell_chrome::layout::LayoutMode;
use shell_chrome::logger::jsonl::{JsonlConfig, JsonlWriter, SharedEventLog};
use shell_chrome::menu::{Breadcrumb, MenuItem, MenuProjector};
use shell_chrome::persistence::{
    self, FileStorage, LoadOutcome, MemoryStorage, SharedStorage,
};
use shell_chrome::route::{self, MemoryRouter, RouteRecord};
use shell_chrome::shell::{Shell, ShellMsg, ShellSnapshot, parse_script};
use shell_chrome::theme::{HeadlessHost, Point, ThemeHost, Viewport};

/// Route tree used when `--routes` is not given.
const DEFAULT_ROUTES: &str = include_str!("../demos/routes.toml");

type HeadlessShell = Shell<MemoryRouter, HeadlessHost>;

/// Admin shell state engine: tags view, layout modes and live theming.
#[derive(Debug, Parser)]
#[command(
    name = "chrome",
    author,
    version,
    about = "Admin shell state engine - tags view, layouts and themes",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Route tree file (.toml or .json); defaults to the built-in demo tree.
    #[arg(long, global = true, value_name = "PATH")]
    routes: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Print the projected navigation menu for a location.
    Menu(MenuArgs),
    /// Replay actions and print the resulting tag strip.
    Tags(RunArgs),
    /// Replay actions and print the full shell state and frame.
    Simulate(RunArgs),
    /// Show or change the persisted theme.
    Theme(ThemeArgs),
    /// Show or change the persisted layout preferences.
    Layout(LayoutArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct MenuArgs {
    /// Location whose active item and breadcrumbs are shown.
    #[arg(long, default_value = "/", value_name = "LOCATION")]
    at: String,
    /// Layout mode used for the presentation hints.
    #[arg(long, value_name = "MODE")]
    layout: Option<LayoutMode>,
    /// Project with the sidebar collapsed.
    #[arg(long)]
    collapsed: bool,
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Action script, one action per line.
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,
    /// Inline action, e.g. `-a "navigate /kb/list"`. Runs after the script.
    #[arg(short = 'a', long = "action", value_name = "ACTION")]
    actions: Vec<String>,
    /// Location opened before any action runs.
    #[arg(long, default_value = "/", value_name = "LOCATION")]
    start: String,
    /// Initial viewport width in pixels.
    #[arg(long, default_value_t = 1440)]
    width: u32,
    /// Initial viewport height in pixels.
    #[arg(long, default_value_t = 900)]
    height: u32,
    /// Pretend the host supports view transitions.
    #[arg(long)]
    transitions: bool,
    /// Read and write preferences and events under the configured paths.
    #[arg(long)]
    persist: bool,
}

#[derive(Debug, Clone, Args)]
struct ThemeArgs {
    #[command(subcommand)]
    command: Option<ThemeCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ThemeCommand {
    /// Show the stored theme.
    Show,
    /// Apply and persist a theme.
    Set(ThemeSetArgs),
}

#[derive(Debug, Clone, Args)]
struct ThemeSetArgs {
    /// Theme identifier: normal, dark or dark-blue.
    name: String,
    /// Click position used as the reveal origin.
    #[arg(long, requires = "y", allow_hyphen_values = true)]
    x: Option<f64>,
    #[arg(long, requires = "x", allow_hyphen_values = true)]
    y: Option<f64>,
}

#[derive(Debug, Clone, Args)]
struct LayoutArgs {
    #[command(subcommand)]
    command: Option<LayoutCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum LayoutCommand {
    /// Show the stored layout preferences.
    Show,
    /// Change and persist the layout mode.
    Set(LayoutSetArgs),
}

#[derive(Debug, Clone, Args)]
struct LayoutSetArgs {
    /// Layout mode: left, top or mixed.
    mode: LayoutMode,
    /// Desktop sidebar state to persist alongside the mode.
    #[arg(long, value_enum)]
    sidebar: Option<SidebarArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SidebarArg {
    Open,
    Closed,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// Some replayed actions failed.
    #[error("{0}")]
    Partial(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
            Self::Partial(_) => 4,
        }
    }
}

impl From<ShellError> for CliError {
    fn from(err: ShellError) -> Self {
        match err {
            ShellError::InvalidConfig { .. }
            | ShellError::MissingConfig { .. }
            | ShellError::ConfigParse { .. }
            | ShellError::RouteParse { .. }
            | ShellError::UnknownRoute { .. }
            | ShellError::ScriptParse { .. } => Self::User(err.to_string()),
            ShellError::Io { .. } => Self::Runtime(err.to_string()),
            ShellError::AffixAlreadySeeded | ShellError::Serialization { .. } => {
                Self::Internal(err.to_string())
            }
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Menu(args) => run_menu(cli, args),
        Command::Tags(args) => run_replay(cli, args, "tags"),
        Command::Simulate(args) => run_replay(cli, args, "simulate"),
        Command::Theme(args) => run_theme(cli, args),
        Command::Layout(args) => run_layout(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── shell construction ────────────────────

fn load_config(cli: &Cli) -> Result<ShellConfig, CliError> {
    Ok(ShellConfig::load(cli.config.as_deref())?)
}

fn load_route_table(cli: &Cli) -> Result<Vec<RouteRecord>, CliError> {
    let routes = match &cli.routes {
        Some(path) => route::load_routes(path)?,
        None => route::parse_routes_toml(DEFAULT_ROUTES)?,
    };
    if routes.is_empty() {
        return Err(CliError::User("route tree is empty".to_string()));
    }
    Ok(routes)
}

/// Storage and event log: in-memory unless `persist` is set.
fn open_backends(config: &ShellConfig, persist: bool) -> (SharedStorage, SharedEventLog) {
    if persist {
        (
            persistence::shared(FileStorage::new(&config.paths.state_dir)),
            JsonlWriter::open(JsonlConfig::at(&config.paths.event_log)).shared(),
        )
    } else {
        (
            persistence::shared(MemoryStorage::new()),
            JsonlWriter::in_memory().shared(),
        )
    }
}

fn build_shell(
    config: ShellConfig,
    routes: &[RouteRecord],
    host: HeadlessHost,
    persist: bool,
) -> Result<HeadlessShell, CliError> {
    let (storage, events) = open_backends(&config, persist);
    let router = MemoryRouter::new(routes, &config.routing.redirect_prefix);
    Ok(Shell::new(config, routes, router, host, storage, events)?)
}

// ──────────────────── menu ────────────────────

fn run_menu(cli: &Cli, args: &MenuArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let routes = load_route_table(cli)?;
    let mut shell = build_shell(config, &routes, HeadlessHost::default(), false)?;
    shell.navigate(&args.at)?;
    if let Some(mode) = args.layout {
        shell.set_layout_mode(mode);
    }
    if args.collapsed && shell.layout().get().sidebar_opened {
        shell.toggle_sidebar();
    }

    let layout = shell.layout().get();
    let active = shell.active_menu();
    let open_keys = shell.menu().open_keys(&active);
    let presentation = MenuProjector::presentation(layout.resolver(), layout.sidebar_opened);
    let breadcrumbs = MenuProjector::breadcrumbs(shell.current(), &shell.config().routing);

    match output_mode(cli) {
        OutputMode::Json => {
            let payload = json!({
                "command": "menu",
                "route": shell.current().full_path,
                "layout_mode": layout.layout_mode,
                "active_key": active,
                "open_keys": open_keys,
                "presentation": presentation,
                "breadcrumbs": breadcrumbs,
                "items": shell.menu().items(),
            });
            write_json_line(&payload)?;
        }
        OutputMode::Human => {
            let mut out = io::stdout().lock();
            writeln!(
                out,
                "{} {}  ({} layout, {:?}{})",
                "Menu at".bold(),
                shell.current().full_path,
                layout.layout_mode,
                presentation.orientation,
                if presentation.collapsed { ", collapsed" } else { "" },
            )?;
            for item in shell.menu().items() {
                write_menu_item(&mut out, item, 1, &active, &open_keys)?;
            }
            writeln!(out, "{} {}", "Breadcrumbs:".bold(), format_breadcrumbs(&breadcrumbs))?;
        }
    }
    Ok(())
}

fn write_menu_item(
    out: &mut impl Write,
    item: &MenuItem,
    depth: usize,
    active: &str,
    open_keys: &[String],
) -> io::Result<()> {
    let marker = if item.is_submenu() {
        if open_keys.contains(&item.key) { "v" } else { ">" }
    } else {
        "-"
    };
    let label = format!("{} ({})", item.title, item.key);
    let label = if item.key == active {
        label.green().bold().to_string()
    } else if item.external {
        label.dimmed().to_string()
    } else {
        label
    };
    writeln!(out, "{}{marker} {label}", "  ".repeat(depth))?;
    for child in &item.children {
        write_menu_item(out, child, depth + 1, active, open_keys)?;
    }
    Ok(())
}

fn format_breadcrumbs(crumbs: &[Breadcrumb]) -> String {
    crumbs
        .iter()
        .map(|crumb| {
            if crumb.clickable {
                crumb.title.underline().to_string()
            } else {
                crumb.title.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" / ")
}

// ──────────────────── tags / simulate ────────────────────

fn collect_actions(args: &RunArgs) -> Result<Vec<ShellMsg>, CliError> {
    let mut msgs = Vec::new();
    if let Some(path) = &args.script {
        let source = fs::read_to_string(path).map_err(|e| {
            CliError::User(format!("failed to read script {}: {e}", path.display()))
        })?;
        msgs.extend(parse_script(&source)?);
    }
    for action in &args.actions {
        let msg = action
            .parse::<ShellMsg>()
            .map_err(|details| CliError::User(format!("--action {action:?}: {details}")))?;
        msgs.push(msg);
    }
    Ok(msgs)
}

/// Result of one replayed action.
#[derive(Debug, serde::Serialize)]
struct Step {
    action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    navigation: Option<String>,
    route: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn replay(shell: &mut HeadlessShell, msgs: Vec<ShellMsg>) -> Vec<Step> {
    msgs.into_iter()
        .map(|msg| {
            let action = msg.to_string();
            let (navigation, error) = match shell.dispatch(msg) {
                Ok(nav) => (nav.map(|n| n.to_string()), None),
                Err(e) => (None, Some(e.to_string())),
            };
            Step {
                action,
                navigation,
                route: shell.current().full_path.clone(),
                error,
            }
        })
        .collect()
}

fn run_replay(cli: &Cli, args: &RunArgs, command: &str) -> Result<(), CliError> {
    let msgs = collect_actions(args)?;
    let config = load_config(cli)?;
    let routes = load_route_table(cli)?;
    let host = HeadlessHost::new(
        Viewport {
            width: f64::from(args.width),
            height: f64::from(args.height),
        },
        args.transitions,
    );
    let mut shell = build_shell(config, &routes, host, args.persist)?;
    shell.navigate(&args.start)?;

    let steps = replay(&mut shell, msgs);
    let failed = steps.iter().filter(|step| step.error.is_some()).count();
    let snapshot = shell.snapshot();

    match (output_mode(cli), command) {
        (OutputMode::Json, "tags") => {
            let payload = json!({
                "command": "tags",
                "route": snapshot.route,
                "visited": snapshot.visited,
                "cached": snapshot.cached,
                "steps": steps,
            });
            write_json_line(&payload)?;
        }
        (OutputMode::Json, _) => {
            let events = shell.events().lock().entries().to_vec();
            let payload = json!({
                "command": "simulate",
                "snapshot": snapshot,
                "frame": shell.frame(),
                "root": shell.host().root(),
                "transitions": shell.host().pending_transitions(),
                "steps": steps,
                "events": events,
            });
            write_json_line(&payload)?;
        }
        (OutputMode::Human, "tags") => {
            let mut out = io::stdout().lock();
            write_steps(&mut out, &steps)?;
            write_tags(&mut out, &snapshot)?;
        }
        (OutputMode::Human, _) => {
            let mut out = io::stdout().lock();
            write_steps(&mut out, &steps)?;
            write_simulation(&mut out, &shell, &snapshot)?;
        }
    }

    if failed > 0 {
        return Err(CliError::Partial(format!(
            "{failed} of {} actions failed",
            steps.len()
        )));
    }
    Ok(())
}

fn write_steps(out: &mut impl Write, steps: &[Step]) -> io::Result<()> {
    for step in steps {
        match (&step.error, &step.navigation) {
            (Some(error), _) => writeln!(out, "{} {}: {error}", "x".red(), step.action)?,
            (None, Some(nav)) => writeln!(out, "{} {} -> {nav}", "+".green(), step.action)?,
            (None, None) => writeln!(out, "{} {}", "+".green(), step.action)?,
        }
    }
    Ok(())
}

fn write_tags(out: &mut impl Write, snapshot: &ShellSnapshot) -> io::Result<()> {
    writeln!(out, "{} {}", "Route:".bold(), snapshot.route)?;
    writeln!(out, "{}", "Tags:".bold())?;
    for view in &snapshot.visited {
        let label = format!("{} ({})", view.title, view.full_path);
        let label = if view.full_path == snapshot.route {
            label.green().bold().to_string()
        } else {
            label
        };
        let pin = if view.affixed { " [affix]" } else { "" };
        writeln!(out, "  {label}{}", pin.dimmed())?;
    }
    writeln!(out, "{} {}", "Cached:".bold(), snapshot.cached.join(", "))
}

fn write_simulation(
    out: &mut impl Write,
    shell: &HeadlessShell,
    snapshot: &ShellSnapshot,
) -> io::Result<()> {
    let frame = shell.frame();
    write_tags(out, snapshot)?;
    writeln!(out, "{} {}", "Theme:".bold(), snapshot.theme)?;
    writeln!(
        out,
        "{} {} on {} (sidebar {})",
        "Layout:".bold(),
        snapshot.layout.layout_mode,
        snapshot.layout.device,
        if snapshot.layout.sidebar_opened { "open" } else { "closed" },
    )?;
    writeln!(
        out,
        "{} {:?}  classes: {}",
        "Frame:".bold(),
        frame.arrangement,
        frame.wrapper_classes.join(" "),
    )?;
    if let Some(sidebar) = &frame.sidebar {
        writeln!(
            out,
            "  sidebar: {:?}, {} items{}",
            sidebar.placement,
            sidebar.menu.items.len(),
            if frame.scrim { ", scrim" } else { "" },
        )?;
    }
    if let Some(top) = &frame.header.top_menu {
        writeln!(out, "  top menu: {} items", top.items.len())?;
    }
    writeln!(
        out,
        "{} {} (open: {})",
        "Active menu:".bold(),
        snapshot.active_menu,
        snapshot.open_menus.join(", "),
    )?;
    writeln!(
        out,
        "{} {}",
        "Breadcrumbs:".bold(),
        format_breadcrumbs(&frame.header.breadcrumbs)
    )?;
    for transition in shell.host().pending_transitions() {
        writeln!(
            out,
            "{} {} -> {} from ({}, {}) r={:.1}",
            "Reveal:".bold(),
            transition.from,
            transition.to,
            transition.origin.x,
            transition.origin.y,
            transition.radius,
        )?;
    }
    Ok(())
}

// ──────────────────── theme / layout ────────────────────

fn state_dir_storage(config: &ShellConfig) -> FileStorage {
    FileStorage::new(&config.paths.state_dir)
}

fn outcome_json<T: serde::Serialize>(outcome: &LoadOutcome<T>) -> Value {
    match outcome {
        LoadOutcome::Loaded(value) => json!({ "outcome": outcome.label(), "value": value }),
        LoadOutcome::Missing => json!({ "outcome": outcome.label() }),
        LoadOutcome::Corrupt { details } | LoadOutcome::IoError { details } => {
            json!({ "outcome": outcome.label(), "details": details })
        }
    }
}

fn run_theme(cli: &Cli, args: &ThemeArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    match &args.command {
        None | Some(ThemeCommand::Show) => {
            let outcome = persistence::load_theme(&state_dir_storage(&config));
            let effective = match &outcome {
                LoadOutcome::Loaded(theme) => *theme,
                _ => config.theme.default_theme,
            };
            match output_mode(cli) {
                OutputMode::Json => {
                    let payload = json!({
                        "command": "theme show",
                        "theme": effective,
                        "stored": outcome_json(&outcome),
                        "state_dir": config.paths.state_dir,
                    });
                    write_json_line(&payload)?;
                }
                OutputMode::Human => {
                    println!("{} {effective} ({})", "Theme:".bold(), outcome.label());
                }
            }
        }
        Some(ThemeCommand::Set(set)) => {
            let routes = load_route_table(cli)?;
            let mut shell = build_shell(config, &routes, HeadlessHost::default(), true)?;
            let origin = set.x.zip(set.y).map(|(x, y)| Point { x, y });
            let applied = shell.apply_theme(&set.name, origin);
            shell.events().lock().flush();
            match output_mode(cli) {
                OutputMode::Json => {
                    let payload = json!({
                        "command": "theme set",
                        "applied": applied,
                        "root": shell.host().root(),
                    });
                    write_json_line(&payload)?;
                }
                OutputMode::Human => {
                    let note = if applied.fell_back {
                        format!(" (unknown theme {:?}, using default)", set.name)
                    } else {
                        String::new()
                    };
                    println!(
                        "{} {} -> {}{}",
                        "Theme:".bold(),
                        applied.previous,
                        applied.theme.to_string().green(),
                        note.yellow()
                    );
                }
            }
        }
    }
    Ok(())
}

fn run_layout(cli: &Cli, args: &LayoutArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    match &args.command {
        None | Some(LayoutCommand::Show) => {
            let outcome = persistence::load_layout(&state_dir_storage(&config));
            let (mode, opened) = match &outcome {
                LoadOutcome::Loaded(prefs) => (prefs.layout_mode, prefs.sidebar_opened),
                _ => (
                    config.layout.default_mode,
                    config.layout.sidebar_opened_by_default,
                ),
            };
            match output_mode(cli) {
                OutputMode::Json => {
                    let payload = json!({
                        "command": "layout show",
                        "layout_mode": mode,
                        "sidebar_opened": opened,
                        "stored": outcome_json(&outcome),
                        "state_dir": config.paths.state_dir,
                    });
                    write_json_line(&payload)?;
                }
                OutputMode::Human => {
                    println!(
                        "{} {mode} (sidebar {}, {})",
                        "Layout:".bold(),
                        if opened { "open" } else { "closed" },
                        outcome.label()
                    );
                }
            }
        }
        Some(LayoutCommand::Set(set)) => {
            let routes = load_route_table(cli)?;
            let mut shell = build_shell(config, &routes, HeadlessHost::default(), true)?;
            shell.set_layout_mode(set.mode);
            if let Some(sidebar) = set.sidebar {
                let want_open = sidebar == SidebarArg::Open;
                if shell.layout().get().sidebar_opened != want_open {
                    shell.toggle_sidebar();
                }
            }
            shell.events().lock().flush();
            let state = shell.layout().get();
            match output_mode(cli) {
                OutputMode::Json => {
                    let payload = json!({
                        "command": "layout set",
                        "layout": state,
                        "wrapper_classes": state.wrapper_classes(),
                    });
                    write_json_line(&payload)?;
                }
                OutputMode::Human => {
                    println!(
                        "{} {} (sidebar {})",
                        "Layout:".bold(),
                        state.layout_mode.to_string().green(),
                        if state.sidebar_opened { "open" } else { "closed" }
                    );
                }
            }
        }
    }
    Ok(())
}

// ──────────────────── output ────────────────────

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("CHROME_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
