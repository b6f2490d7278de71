//! Durable client-side preferences: the active theme and the layout settings.
//!
//! Storage is a flat key/value seam. Writes happen from store subscriptions
//! and are best-effort: a failed write is reported to stderr and the event
//! log, never surfaced to the caller that changed the state.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, ShellError};
use crate::layout::{Device, LayoutMode, LayoutState};
use crate::logger::jsonl::{self, EventType, LogEntry, SharedEventLog};
use crate::store::{Store, SubscriptionId};
use crate::theme::ThemeName;

pub const THEME_KEY: &str = "theme";
pub const LAYOUT_KEY: &str = "layout";

/// Current on-disk layout schema.
pub const LAYOUT_SCHEMA_VERSION: u32 = 1;

/// Flat string key/value store.
pub trait KeyValueStorage: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

pub type SharedStorage = Arc<Mutex<Box<dyn KeyValueStorage>>>;

/// Wrap a storage backend for use from subscriptions.
pub fn shared(storage: impl KeyValueStorage + 'static) -> SharedStorage {
    Arc::new(Mutex::new(Box::new(storage)))
}

// ──────────────────── backends ────────────────────

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: BTreeMap<String, String>,
    read_only: bool,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage whose writes always fail, e.g. a browser with storage disabled.
    #[must_use]
    pub fn read_only() -> Self {
        Self {
            values: BTreeMap::new(),
            read_only: true,
        }
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    fn check_writable(&self, key: &str) -> Result<()> {
        if self.read_only {
            return Err(ShellError::io(
                key,
                io::Error::new(io::ErrorKind::PermissionDenied, "storage is read-only"),
            ));
        }
        Ok(())
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.check_writable(key)?;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.check_writable(key)?;
        self.values.remove(key);
        Ok(())
    }
}

/// One file per key inside a state directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ShellError::InvalidConfig {
                details: format!("storage key {key:?} must be [A-Za-z0-9_-]+"),
            });
        }
        Ok(self.dir.join(key))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ShellError::io(&path, source)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key)?;
        write_atomic(&path, value.as_bytes()).map_err(|source| ShellError::io(&path, source))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ShellError::io(&path, source)),
        }
    }
}

/// Atomic write: temp file → fsync → rename. The temp file is removed on failure.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    let result = (|| {
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

// ──────────────────── stored values ────────────────────

/// Persisted subset of [`LayoutState`]. Device is always re-detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutPreferences {
    pub schema_version: u32,
    pub sidebar_opened: bool,
    pub layout_mode: LayoutMode,
}

impl Default for LayoutPreferences {
    fn default() -> Self {
        Self {
            schema_version: LAYOUT_SCHEMA_VERSION,
            sidebar_opened: true,
            layout_mode: LayoutMode::Left,
        }
    }
}

/// Load outcome for one persisted key.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome<T> {
    Loaded(T),
    /// Nothing stored yet (first launch).
    Missing,
    /// Stored value could not be understood; defaults apply.
    Corrupt { details: String },
    /// Storage could not be read; defaults apply.
    IoError { details: String },
}

impl<T> LoadOutcome<T> {
    /// The loaded value, if any.
    pub fn value(self) -> Option<T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }

    /// Loaded or first-launch missing.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Loaded(_) | Self::Missing)
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Loaded(_) => "loaded",
            Self::Missing => "missing",
            Self::Corrupt { .. } => "corrupt",
            Self::IoError { .. } => "io_error",
        }
    }

    fn details(&self) -> Option<&str> {
        match self {
            Self::Corrupt { details } | Self::IoError { details } => Some(details),
            _ => None,
        }
    }
}

fn load_raw(storage: &dyn KeyValueStorage, key: &str) -> LoadOutcome<String> {
    match storage.get(key) {
        Ok(Some(raw)) => LoadOutcome::Loaded(raw),
        Ok(None) => LoadOutcome::Missing,
        Err(e) => LoadOutcome::IoError {
            details: e.to_string(),
        },
    }
}

pub fn load_theme(storage: &dyn KeyValueStorage) -> LoadOutcome<ThemeName> {
    match load_raw(storage, THEME_KEY) {
        LoadOutcome::Loaded(raw) => ThemeName::parse(&raw).map_or_else(
            || LoadOutcome::Corrupt {
                details: format!("unknown theme {:?}", raw.trim()),
            },
            LoadOutcome::Loaded,
        ),
        LoadOutcome::Missing => LoadOutcome::Missing,
        LoadOutcome::Corrupt { details } => LoadOutcome::Corrupt { details },
        LoadOutcome::IoError { details } => LoadOutcome::IoError { details },
    }
}

pub fn load_layout(storage: &dyn KeyValueStorage) -> LoadOutcome<LayoutPreferences> {
    match load_raw(storage, LAYOUT_KEY) {
        LoadOutcome::Loaded(raw) => match serde_json::from_str::<LayoutPreferences>(&raw) {
            Ok(prefs) => LoadOutcome::Loaded(prefs),
            Err(e) => LoadOutcome::Corrupt {
                details: e.to_string(),
            },
        },
        LoadOutcome::Missing => LoadOutcome::Missing,
        LoadOutcome::Corrupt { details } => LoadOutcome::Corrupt { details },
        LoadOutcome::IoError { details } => LoadOutcome::IoError { details },
    }
}

pub fn save_theme(storage: &mut dyn KeyValueStorage, theme: ThemeName) -> Result<()> {
    storage.set(THEME_KEY, theme.as_str())
}

pub fn save_layout(storage: &mut dyn KeyValueStorage, prefs: &LayoutPreferences) -> Result<()> {
    let json = serde_json::to_string(prefs).map_err(|e| ShellError::Serialization {
        context: "layout preferences",
        details: e.to_string(),
    })?;
    storage.set(LAYOUT_KEY, &json)
}

/// Everything restored at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoredPreferences {
    pub theme: Option<ThemeName>,
    pub layout: Option<LayoutPreferences>,
}

/// Load both keys, logging how each load went.
pub fn load_preferences(storage: &SharedStorage, events: &SharedEventLog) -> StoredPreferences {
    let (theme, layout) = {
        let guard = storage.lock();
        (load_theme(guard.as_ref()), load_layout(guard.as_ref()))
    };

    if let Some(details) = theme.details() {
        eprintln!("[CHR-PERSIST] ignoring stored {THEME_KEY} ({}): {details}", theme.label());
    }
    if let Some(details) = layout.details() {
        eprintln!("[CHR-PERSIST] ignoring stored {LAYOUT_KEY} ({}): {details}", layout.label());
    }

    let mut entry = LogEntry::info(EventType::PreferencesLoaded);
    entry.ok = Some(theme.is_ok() && layout.is_ok());
    entry.details = Some(format!(
        "{THEME_KEY}={} {LAYOUT_KEY}={}",
        theme.label(),
        layout.label()
    ));
    jsonl::record(events, &entry);

    StoredPreferences {
        theme: theme.value(),
        layout: layout.value(),
    }
}

// ──────────────────── store bindings ────────────────────

fn report_persist_failure(events: &SharedEventLog, key: &str, error: &ShellError) {
    eprintln!("[CHR-PERSIST] failed to save {key}: {error}");
    let mut entry = LogEntry::failure(EventType::PersistFailed, error);
    entry.details = Some(format!("key={key}"));
    jsonl::record(events, &entry);
}

/// Persist the active theme whenever it changes.
pub fn bind_theme(
    store: &Store<ThemeName>,
    storage: SharedStorage,
    events: SharedEventLog,
) -> SubscriptionId {
    store.subscribe(move |theme| {
        let result = save_theme(storage.lock().as_mut(), *theme);
        if let Err(e) = result {
            report_persist_failure(&events, THEME_KEY, &e);
        }
    })
}

/// Persist layout mode and the desktop sidebar state whenever they change.
///
/// Only a sidebar toggle made on desktop is written. Changes on mobile, and
/// the forced close that comes with a device switch, keep the stored value.
pub fn bind_layout(
    store: &Store<LayoutState>,
    storage: SharedStorage,
    events: SharedEventLog,
) -> SubscriptionId {
    let initial = store.get();
    let mut written = LayoutPreferences {
        sidebar_opened: initial.sidebar_opened,
        layout_mode: initial.layout_mode,
        ..LayoutPreferences::default()
    };
    let mut previous = initial;
    store.subscribe(move |state| {
        let toggled_on_desktop = previous.device == Device::Desktop
            && state.device == Device::Desktop
            && previous.sidebar_opened != state.sidebar_opened;
        previous = *state;
        let sidebar_opened = if toggled_on_desktop {
            state.sidebar_opened
        } else {
            written.sidebar_opened
        };
        let next = LayoutPreferences {
            sidebar_opened,
            layout_mode: state.layout_mode,
            ..written
        };
        if next == written {
            return;
        }
        let result = save_layout(storage.lock().as_mut(), &next);
        match result {
            Ok(()) => written = next,
            Err(e) => report_persist_failure(&events, LAYOUT_KEY, &e),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::JsonlWriter;

    fn memory_log() -> SharedEventLog {
        JsonlWriter::in_memory().shared()
    }

    #[test]
    fn file_storage_round_trips_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(&dir.path().join("state"));
        assert_eq!(storage.get(THEME_KEY).unwrap(), None);
        storage.set(THEME_KEY, "dark").unwrap();
        assert_eq!(storage.get(THEME_KEY).unwrap().as_deref(), Some("dark"));
        assert!(!dir.path().join("state").join("theme.tmp").exists());
        storage.remove(THEME_KEY).unwrap();
        storage.remove(THEME_KEY).unwrap();
        assert_eq!(storage.get(THEME_KEY).unwrap(), None);
    }

    #[test]
    fn file_storage_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path());
        assert!(storage.set("../escape", "x").is_err());
        assert!(storage.get("a/b").is_err());
    }

    #[test]
    fn unknown_stored_theme_is_corrupt() {
        let storage = MemoryStorage::new().with(THEME_KEY, "solarized");
        assert!(matches!(load_theme(&storage), LoadOutcome::Corrupt { .. }));
        let storage = MemoryStorage::new().with(THEME_KEY, "dark-blue\n");
        assert_eq!(load_theme(&storage), LoadOutcome::Loaded(ThemeName::DarkBlue));
    }

    #[test]
    fn layout_missing_fields_take_defaults() {
        let storage = MemoryStorage::new().with(LAYOUT_KEY, r#"{"layout_mode":"top"}"#);
        let prefs = load_layout(&storage).value().unwrap();
        assert_eq!(prefs.layout_mode, LayoutMode::Top);
        assert!(prefs.sidebar_opened);
        assert_eq!(prefs.schema_version, LAYOUT_SCHEMA_VERSION);
    }

    #[test]
    fn corrupt_layout_is_reported_not_fatal() {
        let storage = shared(MemoryStorage::new().with(LAYOUT_KEY, "{not json"));
        let events = memory_log();
        let prefs = load_preferences(&storage, &events);
        assert_eq!(prefs, StoredPreferences::default());
        let log = events.lock();
        let entry = &log.entries()[0];
        assert_eq!(entry.event, EventType::PreferencesLoaded);
        assert_eq!(entry.ok, Some(false));
        assert!(entry.details.as_deref().unwrap().contains("layout=corrupt"));
    }

    #[test]
    fn theme_binding_writes_on_change() {
        let storage = shared(MemoryStorage::new());
        let store = Store::new(ThemeName::Normal);
        bind_theme(&store, Arc::clone(&storage), memory_log());
        store.set(ThemeName::Dark);
        assert_eq!(
            storage.lock().get(THEME_KEY).unwrap().as_deref(),
            Some("dark")
        );
    }

    #[test]
    fn theme_write_failure_is_logged_not_raised() {
        let storage = shared(MemoryStorage::read_only());
        let events = memory_log();
        let store = Store::new(ThemeName::Normal);
        bind_theme(&store, storage, Arc::clone(&events));
        assert!(store.set(ThemeName::Dark));
        assert_eq!(store.get(), ThemeName::Dark);
        let log = events.lock();
        assert_eq!(log.entries()[0].event, EventType::PersistFailed);
        assert_eq!(log.entries()[0].error_code.as_deref(), Some("CHR-3002"));
    }

    #[test]
    fn mobile_sidebar_toggles_are_not_persisted() {
        let storage = shared(MemoryStorage::new());
        let store = Store::new(LayoutState::default());
        bind_layout(&store, Arc::clone(&storage), memory_log());

        store.update(|s| s.resize(500, 992));
        store.update(LayoutState::toggle_sidebar);
        store.update(|s| s.layout_mode = LayoutMode::Mixed);

        let stored = load_layout(storage.lock().as_ref()).value().unwrap();
        assert_eq!(stored.layout_mode, LayoutMode::Mixed);
        assert!(stored.sidebar_opened, "desktop choice survives mobile toggles");

        store.update(|s| s.resize(1400, 992));
        store.update(LayoutState::toggle_sidebar);
        let stored = load_layout(storage.lock().as_ref()).value().unwrap();
        assert_eq!(stored.sidebar_opened, store.get().sidebar_opened);
    }

    #[test]
    fn device_round_trip_keeps_desktop_sidebar_choice() {
        let storage = shared(MemoryStorage::new());
        let store = Store::new(LayoutState::default());
        bind_layout(&store, Arc::clone(&storage), memory_log());

        store.update(|s| s.resize(375, 992));
        store.update(|s| s.resize(1440, 992));
        assert!(!store.get().sidebar_opened);
        store.update(|s| s.layout_mode = LayoutMode::Top);

        let stored = load_layout(storage.lock().as_ref()).value().unwrap();
        assert_eq!(stored.layout_mode, LayoutMode::Top);
        assert!(stored.sidebar_opened, "forced mobile close is not a desktop choice");
    }
}
