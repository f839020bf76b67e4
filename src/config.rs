//! Configuration loading and management
//!
//! Handles parsing of `config.toml` from the platform config directory
//! (e.g. `~/.config/daytask/config.toml`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};

use crate::archive::ArchiveOptions;
use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::storage::Storage;
use crate::sync::{SyncMode, SyncOptions, DEFAULT_TASK_SECTION};

const CONFIG_FILE: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root of the `<YYYY>/<MM>/<YYYY-MM-DD>.md` daily note tree
    #[serde(default = "default_diary_root")]
    pub diary_root: PathBuf,

    /// Canonical to-do list
    #[serde(default = "default_todo_file")]
    pub todo_file: PathBuf,

    /// Where monthly archive documents go (default: `archive/` beside the list)
    #[serde(default)]
    pub archive_dir: Option<PathBuf>,

    /// Daily-note heading that holds actionable items
    #[serde(default = "default_task_section")]
    pub task_section: String,

    /// How long to wait for the list lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Keep `<list>.backup` before each rewrite
    #[serde(default = "default_true")]
    pub backup: bool,

    /// Sync behaviour
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            diary_root: default_diary_root(),
            todo_file: default_todo_file(),
            archive_dir: None,
            task_section: default_task_section(),
            lock_timeout_ms: default_lock_timeout_ms(),
            backup: default_true(),
            sync: SyncConfig::default(),
        }
    }
}

fn default_diary_root() -> PathBuf {
    PathBuf::from("~/diary")
}

fn default_todo_file() -> PathBuf {
    PathBuf::from("~/diary/todo.md")
}

fn default_task_section() -> String {
    DEFAULT_TASK_SECTION.to_string()
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

fn default_true() -> bool {
    true
}

/// Sync-related configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// `one-way` or `bidirectional`
    #[serde(default)]
    pub mode: SyncMode,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_op("read config", path, e))?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, falling back to defaults when it is missing or invalid
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Platform config file location, if a home directory can be found
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "daytask").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    pub fn validate(&self) -> Result<()> {
        if self.task_section.trim().is_empty() {
            return Err(Error::InvalidConfig("task_section must not be empty".to_string()));
        }
        if self.todo_file.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("todo_file must not be empty".to_string()));
        }
        Ok(())
    }

    /// Path layout with `~/` expanded
    pub fn storage(&self) -> Storage {
        let storage = Storage::new(expand_home(&self.diary_root), expand_home(&self.todo_file));
        match &self.archive_dir {
            Some(dir) => storage.with_archive_dir(expand_home(dir)),
            None => storage,
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            task_section: self.task_section.clone(),
            lock_timeout: self.lock_timeout(),
            mode: self.sync.mode,
            backup: self.backup,
        }
    }

    pub fn archive_options(&self) -> ArchiveOptions {
        ArchiveOptions {
            lock_timeout: self.lock_timeout(),
            backup: self.backup,
        }
    }
}

/// Expand a leading `~/` against the user's home directory
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.task_section, "Tasks");
        assert_eq!(config.lock_timeout_ms, 5000);
        assert!(config.backup);
        assert_eq!(config.sync.mode, SyncMode::OneWay);
    }

    #[test]
    fn load_parses_overrides() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
diary_root = "/notes"
todo_file = "/notes/todo.md"
archive_dir = "/notes/done"
task_section = "Todo"
lock_timeout_ms = 250
backup = false

[sync]
mode = "bidirectional"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.diary_root, PathBuf::from("/notes"));
        assert_eq!(config.task_section, "Todo");
        assert_eq!(config.lock_timeout(), Duration::from_millis(250));
        assert!(!config.backup);
        assert_eq!(config.sync.mode, SyncMode::Bidirectional);

        let storage = config.storage();
        assert_eq!(storage.archive_dir(), Path::new("/notes/done"));
        assert_eq!(storage.state_file(), PathBuf::from("/notes/.todo.state.json"));

        let options = config.sync_options();
        assert_eq!(options.task_section, "Todo");
        assert!(!options.backup);
    }

    #[test]
    fn load_rejects_unknown_mode() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[sync]\nmode = \"sideways\"\n").unwrap();

        assert!(matches!(Config::load(&path), Err(Error::TomlParse(_))));
        assert_eq!(Config::load_or_default(&path).sync.mode, SyncMode::OneWay);
    }

    #[test]
    fn load_rejects_empty_section() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "task_section = \"  \"\n").unwrap();

        assert!(matches!(Config::load(&path), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn expand_home_leaves_other_paths_alone() {
        assert_eq!(expand_home(Path::new("/abs/todo.md")), PathBuf::from("/abs/todo.md"));
        assert_eq!(expand_home(Path::new("rel/todo.md")), PathBuf::from("rel/todo.md"));
        if let Some(dirs) = BaseDirs::new() {
            assert_eq!(
                expand_home(Path::new("~/diary")),
                dirs.home_dir().join("diary")
            );
        }
    }
}
