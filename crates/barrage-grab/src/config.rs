//! Pipeline configuration.
//!
//! Stored as JSON. Every field has a default, so a partial file (or none at
//! all) is valid:
//!
//! ```json
//! {
//!   "process_filter": ["直播伴侣", "chrome"],
//!   "dedup_capacity": 300,
//!   "max_inflate_size": 16777216,
//!   "print_filter": [1, 5]
//! }
//! ```
//!
//! `print_filter` holds pack type codes (chat = 1 … live-end = 9).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use barrage_core::{PackMsgType, DEFAULT_DEDUP_CAPACITY, DEFAULT_MAX_INFLATE_SIZE};

use crate::error::{GrabError, Result};
use crate::filter::{AllowList, DEFAULT_PROCESSES};

/// Name of the configuration file in the config directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabConfig {
    /// Processes whose frames are decoded.
    pub process_filter: Vec<String>,
    /// Message ids remembered per type identifier.
    pub dedup_capacity: usize,
    /// Ceiling on inflated payload size in bytes.
    pub max_inflate_size: usize,
    /// Event kinds the console host prints.
    pub print_filter: Vec<PackMsgType>,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self {
            process_filter: DEFAULT_PROCESSES.iter().map(|p| p.to_string()).collect(),
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
            max_inflate_size: DEFAULT_MAX_INFLATE_SIZE,
            print_filter: PackMsgType::EVENTS.to_vec(),
        }
    }
}

impl GrabConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the platform config directory.
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "barrage", "Barrage").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
    }

    /// Loads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::debug!("Loaded config from {:?}", path.as_ref());
        Ok(config)
    }

    /// Loads the configuration from the platform config directory.
    ///
    /// Returns the default configuration when no file exists there.
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.dedup_capacity == 0 {
            return Err(GrabError::Config("dedup_capacity must be at least 1".into()));
        }
        if self.max_inflate_size == 0 {
            return Err(GrabError::Config(
                "max_inflate_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Builds the allow-list described by `process_filter`.
    pub fn allow_list(&self) -> AllowList {
        AllowList::from_names(self.process_filter.iter().cloned())
    }

    /// Returns true if events of `kind` should be printed.
    pub fn prints(&self, kind: PackMsgType) -> bool {
        self.print_filter.contains(&kind)
    }

    /// Sets the process allow-list.
    pub fn with_process_filter<I, S>(mut self, processes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.process_filter = processes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the dedup window size.
    pub fn with_dedup_capacity(mut self, capacity: usize) -> Self {
        self.dedup_capacity = capacity;
        self
    }

    /// Sets the inflate ceiling.
    pub fn with_max_inflate_size(mut self, size: usize) -> Self {
        self.max_inflate_size = size;
        self
    }

    /// Sets the printed event kinds.
    pub fn with_print_filter(mut self, kinds: Vec<PackMsgType>) -> Self {
        self.print_filter = kinds;
        self
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::filter::ProcessFilter;

    #[test]
    fn defaults() {
        let config = GrabConfig::default();
        assert_eq!(config.dedup_capacity, 300);
        assert_eq!(config.max_inflate_size, 16 * 1024 * 1024);
        assert_eq!(config.print_filter.len(), 9);
        assert!(config.allow_list().is_enabled("直播伴侣"));
    }

    #[test]
    fn partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{"process_filter":["live.exe"],"print_filter":[1,5]}"#).unwrap();

        let config = GrabConfig::load(&path).unwrap();
        assert_eq!(config.process_filter, vec!["live.exe"]);
        assert_eq!(config.dedup_capacity, 300);
        assert!(config.prints(PackMsgType::Gift));
        assert!(!config.prints(PackMsgType::Like));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        std::fs::write(&path, r#"{"dedup_capacity":0}"#).unwrap();
        assert!(matches!(GrabConfig::load(&path), Err(GrabError::Config(_))));

        std::fs::write(&path, r#"{"print_filter":[12]}"#).unwrap();
        assert!(matches!(GrabConfig::load(&path), Err(GrabError::Json(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = GrabConfig::load(dir.path().join("absent.json"));
        assert!(matches!(result, Err(GrabError::Io(_))));
    }

    #[test]
    fn builder_setters() {
        let config = GrabConfig::new()
            .with_process_filter(["a", "b"])
            .with_dedup_capacity(10)
            .with_max_inflate_size(1024)
            .with_print_filter(vec![PackMsgType::Chat]);

        assert_eq!(config.allow_list().len(), 2);
        assert_eq!(config.dedup_capacity, 10);
        assert_eq!(config.max_inflate_size, 1024);
        assert!(config.prints(PackMsgType::Chat));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn serializes_round_trip() {
        let config = GrabConfig::default().with_print_filter(vec![PackMsgType::Share]);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"print_filter\":[8]"));
        assert_eq!(serde_json::from_str::<GrabConfig>(&json).unwrap(), config);
    }
}
