//! Placeholder classification: is a path cloud-backed, and is it resident?
//!
//! Two tiers decide whether a path is cloud-related:
//!   1. prefix match against the [`CloudRootRegistry`]
//!   2. well-known sync folder names anywhere in the path
//!
//! The registry can be incomplete (new accounts, unreadable configuration),
//! so the name heuristics act as a safety net. Only cloud-related paths have
//! their attributes inspected.

use hfp_core::MaterializationState;
use regex::Regex;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::roots::{fold_path, CloudRootRegistry};

/// Content is not fully present locally and is fetched when data is read.
pub const FILE_ATTRIBUTE_RECALL_ON_DATA_ACCESS: u32 = 0x0040_0000;
/// The entry has no local representation until opened.
pub const FILE_ATTRIBUTE_RECALL_ON_OPEN: u32 = 0x0004_0000;
pub const FILE_ATTRIBUTE_OFFLINE: u32 = 0x0000_1000;
pub const FILE_ATTRIBUTE_SPARSE_FILE: u32 = 0x0000_0200;

/// Sync-folder name patterns, matched against folded (`/`, lowercase) paths.
static CLOUD_PATH_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("onedrive segment", r"/onedrive/"),
        ("business folder", r"/onedrive - "),
        ("one drive segment", r"/one drive/"),
        ("user folder", r"users/[^/]+/onedrive"),
        ("documents folder", r"documents/onedrive"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("valid cloud path regex")))
    .collect()
});

/// Metadata needed to tell a resident file from a placeholder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileAttributes {
    pub len: u64,
    pub recall_on_data_access: bool,
    pub recall_on_open: bool,
    pub offline: bool,
    pub sparse: bool,
}

impl FileAttributes {
    /// Decode Windows `FILE_ATTRIBUTE_*` bits.
    pub fn from_bits(bits: u32, len: u64) -> Self {
        FileAttributes {
            len,
            recall_on_data_access: bits & FILE_ATTRIBUTE_RECALL_ON_DATA_ACCESS != 0,
            recall_on_open: bits & FILE_ATTRIBUTE_RECALL_ON_OPEN != 0,
            offline: bits & FILE_ATTRIBUTE_OFFLINE != 0,
            sparse: bits & FILE_ATTRIBUTE_SPARSE_FILE != 0,
        }
    }

    /// True when content must be fetched on access.
    pub fn needs_fetch(&self) -> bool {
        self.recall_on_data_access
            || self.recall_on_open
            || self.offline
            || (self.len == 0 && self.sparse)
    }
}

/// Reads [`FileAttributes`] for a path without reading its content.
pub trait AttributeProbe: Send + Sync {
    fn attributes(&self, path: &Path) -> io::Result<FileAttributes>;
}

/// Probe backed by `std::fs::metadata`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsProbe;

impl AttributeProbe for FsProbe {
    #[cfg(target_os = "windows")]
    fn attributes(&self, path: &Path) -> io::Result<FileAttributes> {
        use std::os::windows::fs::MetadataExt;
        let meta = std::fs::metadata(path)?;
        Ok(FileAttributes::from_bits(meta.file_attributes(), meta.len()))
    }

    // No placeholder attribute bits outside Windows
    #[cfg(not(target_os = "windows"))]
    fn attributes(&self, path: &Path) -> io::Result<FileAttributes> {
        let meta = std::fs::metadata(path)?;
        Ok(FileAttributes {
            len: meta.len(),
            ..FileAttributes::default()
        })
    }
}

/// Why a path was considered cloud-related.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudMatch {
    /// Under a discovered or configured root
    Root(PathBuf),
    /// Matched a sync-folder name pattern
    Heuristic(&'static str),
}

/// Decides the [`MaterializationState`] of a path.
pub struct Classifier {
    registry: Arc<CloudRootRegistry>,
    probe: Box<dyn AttributeProbe>,
    heuristics: bool,
}

impl Classifier {
    pub fn new(registry: Arc<CloudRootRegistry>) -> Self {
        Self::with_probe(registry, FsProbe)
    }

    pub fn with_probe(registry: Arc<CloudRootRegistry>, probe: impl AttributeProbe + 'static) -> Self {
        Classifier {
            registry,
            probe: Box::new(probe),
            heuristics: true,
        }
    }

    /// Enable or disable the folder-name tier.
    pub fn heuristics(mut self, enabled: bool) -> Self {
        self.heuristics = enabled;
        self
    }

    pub fn registry(&self) -> &CloudRootRegistry {
        &self.registry
    }

    /// Why `path` is cloud-related, or `None` if it is not.
    pub fn cloud_match(&self, path: &Path) -> Option<CloudMatch> {
        let absolute = collapse_dots(&std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()));

        if let Some(root) = self.registry.find(&absolute) {
            return Some(CloudMatch::Root(root.path.clone()));
        }
        if !self.heuristics {
            return None;
        }

        let folded = fold_path(&absolute);
        CLOUD_PATH_PATTERNS
            .iter()
            .find(|(_, re)| re.is_match(&folded))
            .map(|(name, _)| CloudMatch::Heuristic(name))
    }

    pub fn is_cloud_path(&self, path: &Path) -> bool {
        self.cloud_match(path).is_some()
    }

    pub fn classify(&self, path: &Path) -> MaterializationState {
        let Some(matched) = self.cloud_match(path) else {
            return MaterializationState::NotCloud;
        };

        let state = match self.probe.attributes(path) {
            Ok(attrs) if attrs.needs_fetch() => MaterializationState::Placeholder,
            Ok(_) => MaterializationState::Resident,
            Err(e) => {
                debug!(path = %path.display(), "attribute lookup failed: {e}");
                MaterializationState::Unknown
            }
        };

        debug!(path = %path.display(), ?matched, %state, "classified");
        state
    }
}

/// Resolve `.` and `..` lexically. `..` at the root stays at the root.
fn collapse_dots(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("registry", &self.registry)
            .field("heuristics", &self.heuristics)
            .finish()
    }
}
