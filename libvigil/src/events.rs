//! Semantic filesystem events emitted by a watcher.
//!
//! The watcher translates raw kernel records into four event kinds. Paths are
//! composed from the watch root as supplied by the caller: an absolute root
//! yields absolute event paths, a `"."` root yields paths relative to the
//! working directory.

use std::fmt;

/// An event observed somewhere under the watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A file or directory was created.
    Create { path: String, is_dir: bool },

    /// A file or directory was removed.
    Delete { path: String, is_dir: bool },

    /// A file was written and closed.
    Modify { path: String },

    /// A file or directory was moved. An empty `old_path` means it arrived
    /// from outside the watched subtree; an empty `new_path` means it left.
    Rename {
        old_path: String,
        new_path: String,
        is_dir: bool,
    },
}

impl Event {
    /// The event item's path. For renames this is the new path, which may be
    /// empty when the item moved outside the watched subtree.
    pub fn path(&self) -> &str {
        match self {
            Self::Create { path, .. } => path,
            Self::Delete { path, .. } => path,
            Self::Modify { path } => path,
            Self::Rename { new_path, .. } => new_path,
        }
    }

    /// Whether the event item is a directory. Modifications are only
    /// reported for files.
    pub fn is_dir(&self) -> bool {
        match self {
            Self::Create { is_dir, .. } => *is_dir,
            Self::Delete { is_dir, .. } => *is_dir,
            Self::Modify { .. } => false,
            Self::Rename { is_dir, .. } => *is_dir,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { path, .. } => write!(f, "CREATE {}", path),
            Self::Delete { path, .. } => write!(f, "DELETE {}", path),
            Self::Modify { path } => write!(f, "MODIFY {}", path),
            Self::Rename {
                old_path, new_path, ..
            } => match (old_path.is_empty(), new_path.is_empty()) {
                (false, false) => write!(f, "RENAME {} to {}", old_path, new_path),
                (false, true) => write!(f, "RENAME {}", old_path),
                (true, false) => write!(f, "RENAME to {}", new_path),
                (true, true) => Ok(()),
            },
        }
    }
}
