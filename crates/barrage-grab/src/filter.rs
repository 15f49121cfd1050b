//! Process allow-list.

use std::collections::HashSet;

use parking_lot::RwLock;

/// Processes captured by default: the desktop live companion and common browsers.
pub const DEFAULT_PROCESSES: &[&str] = &[
    "直播伴侣",
    "douyin",
    "chrome",
    "msedge",
    "firefox",
    "QQBrowser",
    "360se",
    "2345explorer",
    "iexplore",
];

/// Membership test deciding which processes' frames are decoded.
pub trait ProcessFilter: Send + Sync {
    /// Returns true if frames from `process` should be processed.
    fn is_enabled(&self, process: &str) -> bool;
}

impl<F> ProcessFilter for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_enabled(&self, process: &str) -> bool {
        self(process)
    }
}

/// Mutable set of allowed process names.
#[derive(Debug, Default)]
pub struct AllowList {
    processes: RwLock<HashSet<String>>,
}

impl AllowList {
    /// Creates an empty allow-list; every process is rejected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allow-list with the default processes.
    pub fn with_defaults() -> Self {
        Self::from_names(DEFAULT_PROCESSES.iter().copied())
    }

    /// Creates an allow-list from process names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            processes: RwLock::new(names.into_iter().map(Into::into).collect()),
        }
    }

    /// Adds a process. Returns false if it was already present.
    pub fn add(&self, process: impl Into<String>) -> bool {
        self.processes.write().insert(process.into())
    }

    /// Removes a process. Returns false if it was absent.
    pub fn remove(&self, process: &str) -> bool {
        self.processes.write().remove(process)
    }

    pub fn len(&self) -> usize {
        self.processes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.read().is_empty()
    }

    /// Returns the process names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.processes.read().iter().cloned().collect();
        names.sort();
        names
    }
}

impl ProcessFilter for AllowList {
    fn is_enabled(&self, process: &str) -> bool {
        self.processes.read().contains(process)
    }
}
