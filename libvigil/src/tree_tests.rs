//! Tests for the watch tree and its path cache.

#[cfg(test)]
mod tests {
    use crate::error::TreeError;
    use crate::tree::{clean_path, join_path, WatchTree};

    fn sample_tree() -> WatchTree {
        // - root (".")
        //   - some (1)
        //     - foo (2)
        //     - bar (3)
        //       - fourth (4)
        let mut tree = WatchTree::new();
        tree.set_root(".", 0).unwrap();
        tree.add(1, "some", 0).unwrap();
        tree.add(2, "foo", 1).unwrap();
        tree.add(3, "bar", 1).unwrap();
        tree.add(4, "fourth", 3).unwrap();
        tree
    }

    #[test]
    fn set_root_installs_single_root() {
        let mut tree = WatchTree::new();
        tree.set_root(".", 0).unwrap();

        assert_eq!(tree.root_wd(), Some(0));
        let root = tree.get(0).expect("root is present in items");
        assert_eq!(root.name(), "");
        assert_eq!(root.parent(), None);

        assert_eq!(tree.set_root("elsewhere", 1), Err(TreeError::AlreadyInitialized));
    }

    #[test]
    fn add_then_has_and_get() {
        let mut tree = WatchTree::new();
        tree.set_root(".", 0).unwrap();
        tree.add(1, "some", 0).unwrap();

        assert!(tree.has(1));
        let node = tree.get(1).expect("child is present");
        assert_eq!(node.wd(), 1);
        assert_eq!(node.name(), "some");
        assert_eq!(node.parent(), Some(0));
        assert_eq!(tree.get(0).unwrap().child("some"), Some(1));
    }

    #[test]
    fn add_requires_parent() {
        let mut tree = WatchTree::new();
        tree.set_root(".", 0).unwrap();

        assert_eq!(tree.add(1, "some", 42), Err(TreeError::ParentMissing(42)));
    }

    #[test]
    fn add_overwrites_same_name() {
        let mut tree = WatchTree::new();
        tree.set_root(".", 0).unwrap();
        tree.add(1, "some", 0).unwrap();
        tree.add(2, "some", 0).unwrap();

        assert_eq!(tree.get(0).unwrap().child("some"), Some(2));
    }

    #[test]
    fn remove_forgets_node() {
        let mut tree = WatchTree::new();
        tree.set_root(".", 0).unwrap();
        tree.add(1, "some", 0).unwrap();

        let removed = tree.remove(1).unwrap();
        assert_eq!(removed, vec![1]);
        assert!(!tree.has(1));
        assert!(tree.get(1).is_none());
        assert_eq!(tree.get(0).unwrap().child("some"), None);
    }

    #[test]
    fn remove_forgets_descendants() {
        let mut tree = sample_tree();
        let _ = tree.path(4); // populate the cache

        let mut removed = tree.remove(1).unwrap();
        removed.sort();
        assert_eq!(removed, vec![1, 2, 3, 4]);
        for wd in [1, 2, 3, 4] {
            assert!(!tree.has(wd));
            assert!(tree.get(wd).is_none());
        }
        assert!(tree.cache().is_empty());
    }

    #[test]
    fn remove_rejects_root() {
        let mut tree = sample_tree();
        assert_eq!(tree.remove(0), Err(TreeError::CannotRemoveRoot));
    }

    #[test]
    fn move_reparents() {
        let mut tree = sample_tree();
        let _ = tree.path(4); // populate the cache

        tree.move_to(4, Some(2), None).unwrap();

        assert_eq!(tree.path(4).as_deref(), Some("some/foo/fourth"));
        assert_eq!(tree.get(3).unwrap().child("fourth"), None);
        assert_eq!(tree.get(2).unwrap().child("fourth"), Some(4));
        assert_eq!(tree.get(4).unwrap().parent(), Some(2));
    }

    #[test]
    fn move_renames_in_place() {
        let mut tree = sample_tree();
        let _ = tree.path(4);

        tree.move_to(4, None, Some("the_fourth")).unwrap();

        assert_eq!(tree.path(4).as_deref(), Some("some/bar/the_fourth"));
        assert_eq!(tree.get(3).unwrap().child("fourth"), None);
        assert_eq!(tree.get(3).unwrap().child("the_fourth"), Some(4));
    }

    #[test]
    fn move_reparents_and_renames() {
        let mut tree = sample_tree();
        let _ = tree.path(4);

        tree.move_to(4, Some(2), Some("the_fourth")).unwrap();

        assert_eq!(tree.path(4).as_deref(), Some("some/foo/the_fourth"));
        assert_eq!(tree.get(3).unwrap().child("fourth"), None);
        assert_eq!(tree.get(2).unwrap().child("the_fourth"), Some(4));
    }

    #[test]
    fn move_invalidates_descendant_cache() {
        let mut tree = sample_tree();
        let _ = tree.path(4);
        assert_eq!(tree.cache().wd_of("some/bar/fourth"), Some(4));

        tree.move_to(3, Some(2), None).unwrap();

        assert_eq!(tree.cache().wd_of("some/bar/fourth"), None);
        assert_eq!(tree.cache().path_of(4), None);
        assert_eq!(tree.path(4).as_deref(), Some("some/foo/bar/fourth"));
    }

    #[test]
    fn move_rejects_root_and_missing_target() {
        let mut tree = sample_tree();
        assert_eq!(tree.move_to(0, Some(1), None), Err(TreeError::CannotMoveRoot));
        assert_eq!(
            tree.move_to(4, Some(42), None),
            Err(TreeError::TargetParentMissing(42))
        );
    }

    #[test]
    fn path_composes_under_relative_root() {
        let mut tree = sample_tree();
        assert_eq!(tree.path(4).as_deref(), Some("some/bar/fourth"));
        // second call hits the cache
        assert_eq!(tree.path(4).as_deref(), Some("some/bar/fourth"));
        assert_eq!(tree.path(0).as_deref(), Some(""));
    }

    #[test]
    fn path_composes_under_absolute_root() {
        let mut tree = WatchTree::new();
        tree.set_root("/home/usr", 0).unwrap();
        tree.add(1, "some", 0).unwrap();
        tree.add(2, "foo", 1).unwrap();

        assert_eq!(tree.path(2).as_deref(), Some("/home/usr/some/foo"));
        assert_eq!(tree.path(0).as_deref(), Some("/home/usr"));
    }

    #[test]
    fn find_round_trips_every_descriptor() {
        let mut tree = sample_tree();
        for wd in [0, 1, 2, 3, 4] {
            let path = tree.path(wd).unwrap();
            assert_eq!(tree.find(&path), Some(wd), "round trip for {}", path);
        }
    }

    #[test]
    fn find_walks_without_cache() {
        let tree = sample_tree();
        // nothing cached yet; find falls back to the child walk
        assert_eq!(tree.find("some/bar/fourth"), Some(4));
        assert_eq!(tree.find("some/foo"), Some(2));
    }

    #[test]
    fn find_under_absolute_root() {
        let mut tree = WatchTree::new();
        tree.set_root("/home/user", 0).unwrap();
        tree.add(1, "some", 0).unwrap();
        tree.add(2, "foo", 1).unwrap();

        assert_eq!(tree.find("/home/user/some/foo"), Some(2));
        assert_eq!(tree.find("/home/user"), Some(0));
    }

    #[test]
    fn find_missing_path_is_none() {
        let tree = sample_tree();
        assert_eq!(tree.find("some/bar/fourth/aa"), None);
        assert_eq!(tree.find("elsewhere"), None);
    }

    #[test]
    fn clean_path_cases() {
        assert_eq!(clean_path("."), "");
        assert_eq!(clean_path("./a/b"), "a/b");
        assert_eq!(clean_path("a//b/"), "a/b");
        assert_eq!(clean_path("/a//b/../c"), "/a/c");
        assert_eq!(clean_path("/home/usr"), "/home/usr");
        assert_eq!(clean_path("a/.."), ".");
    }

    #[test]
    fn join_path_skips_empty_sides() {
        assert_eq!(join_path("", "a.txt"), "a.txt");
        assert_eq!(join_path("a/b", ""), "a/b");
        assert_eq!(join_path("a/b", "c"), "a/b/c");
    }
}
