//! Mirror of the watched directory subtree.
//!
//! Nodes live in an arena keyed by their kernel watch descriptor; parent
//! links and child maps store descriptors, never references, so the tree has
//! no ownership cycles. Path composition walks parent links and is memoized
//! through [`PathCache`]; every mutation that could change a composed path
//! invalidates the affected subtree first.
//!
//! The tree is owned by the engine task exclusively. `get`/`has` are pure
//! reads; `path` may populate the cache and is therefore `&mut`.

use std::collections::HashMap;

use crate::cache::PathCache;
use crate::error::TreeError;

/// A watched directory. The root's `name` is the cleaned root path; every
/// other node's `name` is a single path segment.
#[derive(Debug)]
pub struct Node {
    wd: i32,
    name: String,
    parent: Option<i32>,
    children: HashMap<String, i32>,
}

impl Node {
    pub fn wd(&self) -> i32 {
        self.wd
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<i32> {
        self.parent
    }

    pub fn child(&self, name: &str) -> Option<i32> {
        self.children.get(name).copied()
    }
}

#[derive(Debug, Default)]
pub struct WatchTree {
    root: Option<i32>,
    items: HashMap<i32, Node>,
    cache: PathCache,
}

impl WatchTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root_wd(&self) -> Option<i32> {
        self.root
    }

    /// Install the single root. Its name is `clean_path(path)`, so a `"."`
    /// root composes paths relative to the working directory.
    pub fn set_root(&mut self, path: &str, wd: i32) -> Result<(), TreeError> {
        if self.root.is_some() {
            return Err(TreeError::AlreadyInitialized);
        }

        self.items.insert(
            wd,
            Node {
                wd,
                name: clean_path(path),
                parent: None,
                children: HashMap::new(),
            },
        );
        self.root = Some(wd);

        Ok(())
    }

    /// Create a child under `parent_wd`. An existing child of the same name
    /// is overwritten; that cannot happen while the mirror is in step with
    /// the kernel stream.
    pub fn add(&mut self, wd: i32, name: &str, parent_wd: i32) -> Result<(), TreeError> {
        let Some(parent) = self.items.get_mut(&parent_wd) else {
            return Err(TreeError::ParentMissing(parent_wd));
        };
        parent.children.insert(name.to_owned(), wd);

        self.items.insert(
            wd,
            Node {
                wd,
                name: name.to_owned(),
                parent: Some(parent_wd),
                children: HashMap::new(),
            },
        );

        Ok(())
    }

    pub fn get(&self, wd: i32) -> Option<&Node> {
        self.items.get(&wd)
    }

    pub fn has(&self, wd: i32) -> bool {
        self.items.contains_key(&wd)
    }

    /// Remove the subtree rooted at `wd`, returning every descriptor that was
    /// evicted (deepest first) so the caller can detach kernel watches where
    /// the kernel has not already done so.
    pub fn remove(&mut self, wd: i32) -> Result<Vec<i32>, TreeError> {
        let node = self.items.get(&wd).ok_or(TreeError::NotFound(wd))?;
        let Some(parent_wd) = node.parent else {
            return Err(TreeError::CannotRemoveRoot);
        };
        let name = node.name.clone();

        if let Some(parent) = self.items.get_mut(&parent_wd) {
            parent.children.remove(&name);
        }

        let mut removed = Vec::new();
        self.remove_subtree(wd, &mut removed);

        Ok(removed)
    }

    fn remove_subtree(&mut self, wd: i32, removed: &mut Vec<i32>) {
        let children: Vec<i32> = match self.items.get(&wd) {
            Some(node) => node.children.values().copied().collect(),
            None => return,
        };
        for child in children {
            self.remove_subtree(child, removed);
        }

        self.cache.remove_by_wd(wd);
        self.items.remove(&wd);
        removed.push(wd);
    }

    /// Re-parent and/or rename. `None` keeps the current parent or name.
    /// Parent links and the name-in-parent entry are updated together, so
    /// the child never appears under two parents or a stale name.
    pub fn move_to(
        &mut self,
        wd: i32,
        new_parent: Option<i32>,
        new_name: Option<&str>,
    ) -> Result<(), TreeError> {
        let node = self.items.get(&wd).ok_or(TreeError::NotFound(wd))?;
        let Some(old_parent_wd) = node.parent else {
            return Err(TreeError::CannotMoveRoot);
        };
        let old_name = node.name.clone();

        let target_parent = new_parent.unwrap_or(old_parent_wd);
        if !self.items.contains_key(&target_parent) {
            return Err(TreeError::TargetParentMissing(target_parent));
        }
        let target_name = match new_name {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => old_name.clone(),
        };

        if let Some(parent) = self.items.get_mut(&old_parent_wd) {
            parent.children.remove(&old_name);
        }
        if let Some(parent) = self.items.get_mut(&target_parent) {
            parent.children.insert(target_name.clone(), wd);
        }
        if let Some(node) = self.items.get_mut(&wd) {
            node.parent = Some(target_parent);
            node.name = target_name;
        }

        self.invalidate(wd);

        Ok(())
    }

    /// Compose the path from the root to `wd`, memoizing through the cache.
    /// The root yields its name unchanged (empty for a `"."` root).
    pub fn path(&mut self, wd: i32) -> Option<String> {
        let node = self.items.get(&wd)?;
        let Some(parent_wd) = node.parent else {
            return Some(node.name.clone());
        };

        if let Some(path) = self.cache.path_of(wd) {
            return Some(path.to_owned());
        }

        let name = node.name.clone();
        let parent_path = self.path(parent_wd)?;
        let full = join_path(&parent_path, &name);
        self.cache.put(wd, full.clone());

        Some(full)
    }

    /// Locate a node by its composed path. Cache hits short-circuit; misses
    /// strip the root prefix and walk children segment by segment.
    pub fn find(&self, path: &str) -> Option<i32> {
        let root_wd = self.root?;
        let root = self.items.get(&root_wd)?;

        if root.name == path {
            return Some(root_wd);
        }
        if path.is_empty() {
            return None;
        }

        if let Some(wd) = self.cache.wd_of(path) {
            return Some(wd);
        }

        let relative = if root.name.is_empty() {
            path
        } else {
            path.strip_prefix(&format!("{}/", root.name))?
        };

        let mut current = root_wd;
        for segment in relative.split('/') {
            current = self.items.get(&current)?.child(segment)?;
        }

        Some(current)
    }

    /// Drop cache entries for `wd` and its entire descendant subtree.
    fn invalidate(&mut self, wd: i32) {
        let children: Vec<i32> = match self.items.get(&wd) {
            Some(node) => node.children.values().copied().collect(),
            None => return,
        };
        for child in children {
            self.invalidate(child);
        }

        self.cache.remove_by_wd(wd);
    }

    #[cfg(test)]
    pub(crate) fn cache(&self) -> &PathCache {
        &self.cache
    }
}

/// Lexically normalize `p`, with the special case that `"."` becomes the
/// empty string (so composed paths under a `"."` root carry no `./` prefix).
pub fn clean_path(p: &str) -> String {
    if p == "." {
        return String::new();
    }

    let rooted = p.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in p.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            segment => segments.push(segment),
        }
    }

    let joined = segments.join("/");
    if rooted {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_owned()
    } else {
        joined
    }
}

/// Join two path fragments, ignoring empty sides.
pub fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_owned()
    } else if name.is_empty() {
        base.to_owned()
    } else {
        format!("{}/{}", base, name)
    }
}
