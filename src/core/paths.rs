//! Filesystem locations for config, persisted state and the event log.

use std::env;
use std::path::{Component, Path, PathBuf};

/// Application directory name under `~/.config` and `~/.local/share`.
pub const APP_DIR: &str = "chrome";

/// The user's home directory, or `/tmp` with a warning when `HOME` is unset.
pub fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[CHR-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

/// `~/.config/chrome`
pub fn config_dir() -> PathBuf {
    home_dir().join(".config").join(APP_DIR)
}

/// `~/.local/share/chrome`
pub fn data_dir() -> PathBuf {
    home_dir().join(".local").join("share").join(APP_DIR)
}

/// Expand a leading `~/` against `home`.
pub fn expand_tilde(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Make `path` absolute against the CWD and fold `.`/`..` syntactically.
///
/// The path does not need to exist; state directories are created lazily.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    };
    normalize_syntactic(&absolute)
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tilde_expands_against_home() {
        let home = Path::new("/home/ops");
        assert_eq!(
            expand_tilde(Path::new("~/state/chrome"), home),
            PathBuf::from("/home/ops/state/chrome")
        );
        assert_eq!(
            expand_tilde(Path::new("/var/lib/chrome"), home),
            PathBuf::from("/var/lib/chrome")
        );
    }

    #[test]
    fn dot_segments_fold_without_touching_disk() {
        let input = Path::new("/srv/chrome/./state/../log/events.jsonl");
        assert_eq!(
            resolve_absolute_path(input),
            PathBuf::from("/srv/chrome/log/events.jsonl")
        );
    }

    #[test]
    fn parent_at_root_is_dropped() {
        assert_eq!(normalize_syntactic(Path::new("/../x")), PathBuf::from("/x"));
    }

    #[test]
    fn relative_paths_become_absolute() {
        assert!(resolve_absolute_path(Path::new("state")).is_absolute());
    }
}
