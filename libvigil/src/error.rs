//! Error types for Vigil
//!
//! This module defines the error kinds surfaced by the watcher: bootstrap
//! failures from the constructor, the single terminal error delivered on the
//! error channel, and the tree-invariant violations that replace panics.

use std::fmt;
use std::io;

/// Result type for Vigil - convenience wrapper around Result<T, Error>
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the watcher.
#[derive(Debug)]
pub enum Error {
    /// The kernel inotify handle could not be created
    Init(io::Error),

    /// Adding a directory to the kernel watch failed
    Enroll { path: String, source: io::Error },

    /// Enumerating a directory during recursive enrollment failed
    List { path: String, source: io::Error },

    /// Reading from the kernel handle failed
    Read(io::Error),

    /// Closing the kernel handle failed
    Close(io::Error),

    /// The kernel event queue overflowed and records were lost
    Overflow,

    /// A watch-tree invariant was violated
    Tree(TreeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(err) => write!(f, "creating inotify instance: {}", err),
            Self::Enroll { path, source } => {
                write!(f, "adding directory {} to inotify instance: {}", path, source)
            }
            Self::List { path, source } => write!(f, "reading {} dir: {}", path, source),
            Self::Read(err) => write!(f, "reading from inotify instance: {}", err),
            Self::Close(err) => write!(f, "closing inotify instance: {}", err),
            Self::Overflow => write!(f, "inotify event queue overflowed"),
            Self::Tree(err) => write!(f, "watch tree: {}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<TreeError> for Error {
    fn from(err: TreeError) -> Self {
        Self::Tree(err)
    }
}

/// Failure modes of watch-tree operations.
///
/// These reflect broken invariants rather than runtime conditions; the engine
/// surfaces them as terminal errors instead of panicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// `set_root` was called on a tree that already has a root
    AlreadyInitialized,

    /// `add` referenced a parent descriptor that is not in the tree
    ParentMissing(i32),

    /// `move_to` referenced a target parent that is not in the tree
    TargetParentMissing(i32),

    /// The root cannot be removed
    CannotRemoveRoot,

    /// The root cannot be moved
    CannotMoveRoot,

    /// The descriptor is not in the tree
    NotFound(i32),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInitialized => write!(f, "there is already a root"),
            Self::ParentMissing(wd) => write!(f, "parent {} not found", wd),
            Self::TargetParentMissing(wd) => write!(f, "target parent {} not found", wd),
            Self::CannotRemoveRoot => write!(f, "cannot remove root"),
            Self::CannotMoveRoot => write!(f, "cannot move root"),
            Self::NotFound(wd) => write!(f, "descriptor {} not found", wd),
        }
    }
}

impl std::error::Error for TreeError {}
