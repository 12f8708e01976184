//! End-to-end tests driving a live watcher against a scratch tree.
//!
//! Every test roots the watcher in a temporary directory and serialises on
//! the cwd mutex, since event paths are composed relative to the root the
//! watcher was given.

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::thread;
    use std::time::Duration;

    use crossbeam_channel::RecvTimeoutError;
    use regex::Regex;
    use tempfile::TempDir;

    use crate::events::Event;
    use crate::test_utils::CWD_MUTEX;
    use crate::Watcher;

    const EVENT_TIMEOUT: Duration = Duration::from_millis(1500);
    const QUIET_TIMEOUT: Duration = Duration::from_millis(400);

    /// Scratch tree with the two deep branches the scenarios rename across.
    /// The prefix keeps the path free of dot segments, which the default
    /// ignore rule would otherwise suppress wholesale.
    fn workspace() -> TempDir {
        let tmp = tempfile::Builder::new()
            .prefix("vigil-")
            .tempdir()
            .expect("creating scratch directory");
        fs::create_dir_all(tmp.path().join("a/b/c/d/e")).unwrap();
        fs::create_dir_all(tmp.path().join("f/g/h/i/j")).unwrap();
        tmp
    }

    struct CwdGuard {
        original: PathBuf,
    }

    impl CwdGuard {
        fn enter(dir: &Path) -> Self {
            let original = env::current_dir().unwrap();
            env::set_current_dir(dir).unwrap();
            Self { original }
        }
    }

    impl Drop for CwdGuard {
        fn drop(&mut self) {
            let _ = env::set_current_dir(&self.original);
        }
    }

    fn next_event(watcher: &Watcher, timeout: Duration) -> Event {
        if let Ok(err) = watcher.errs().try_recv() {
            panic!("unexpected watcher error: {}", err);
        }
        watcher
            .events()
            .recv_timeout(timeout)
            .expect("timed out waiting for event")
    }

    fn assert_quiet(watcher: &Watcher) {
        match watcher.events().recv_timeout(QUIET_TIMEOUT) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(event) => panic!("unexpected event: {}", event),
            Err(RecvTimeoutError::Disconnected) => panic!("watcher stopped unexpectedly"),
        }
    }

    fn ignore(patterns: &[&str]) -> Vec<Regex> {
        patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
    }

    #[test]
    fn create_file_in_precreated_tree() {
        let _lock = CWD_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let tmp = workspace();
        let _cwd = CwdGuard::enter(tmp.path());
        let root = env::current_dir().unwrap();

        let watcher = Watcher::new(&root, Vec::new()).unwrap();

        let file = fs::File::create("a/b/c/d/e/a.txt").unwrap();

        let expected = Event::Create {
            path: format!("{}/a/b/c/d/e/a.txt", root.display()),
            is_dir: false,
        };
        assert_eq!(next_event(&watcher, EVENT_TIMEOUT), expected);

        drop(file);
    }

    #[test]
    fn create_dir_is_enrolled_before_its_contents() {
        let _lock = CWD_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let tmp = workspace();
        let _cwd = CwdGuard::enter(tmp.path());

        let watcher = Watcher::new(".", Vec::new()).unwrap();

        fs::create_dir("a/b/c/d/e/z").unwrap();
        assert_eq!(
            next_event(&watcher, EVENT_TIMEOUT),
            Event::Create {
                path: "a/b/c/d/e/z".into(),
                is_dir: true,
            }
        );

        // give the engine a beat to finish enrolling the new directory
        thread::sleep(Duration::from_millis(50));

        let file = fs::File::create("a/b/c/d/e/z/a.txt").unwrap();
        assert_eq!(
            next_event(&watcher, EVENT_TIMEOUT),
            Event::Create {
                path: "a/b/c/d/e/z/a.txt".into(),
                is_dir: false,
            }
        );

        drop(file);
    }

    #[test]
    fn write_emits_modify() {
        let _lock = CWD_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let tmp = workspace();
        let _cwd = CwdGuard::enter(tmp.path());
        fs::write("a/b/c/d/e/a.txt", "before").unwrap();

        let watcher = Watcher::new(".", Vec::new()).unwrap();

        fs::write("a/b/c/d/e/a.txt", "foo").unwrap();

        assert_eq!(
            next_event(&watcher, EVENT_TIMEOUT),
            Event::Modify {
                path: "a/b/c/d/e/a.txt".into(),
            }
        );
    }

    #[test]
    fn rename_within_watch_pairs_into_one_event() {
        let _lock = CWD_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let tmp = workspace();
        let _cwd = CwdGuard::enter(tmp.path());
        fs::write("a/b/c/d/e/a.txt", "contents").unwrap();

        let watcher = Watcher::new(".", Vec::new()).unwrap();

        fs::rename("a/b/c/d/e/a.txt", "f/g/h/i/j/b.txt").unwrap();

        assert_eq!(
            next_event(&watcher, EVENT_TIMEOUT),
            Event::Rename {
                old_path: "a/b/c/d/e/a.txt".into(),
                new_path: "f/g/h/i/j/b.txt".into(),
                is_dir: false,
            }
        );
        assert_quiet(&watcher);
    }

    #[test]
    fn renamed_directory_keeps_its_subtree_watched() {
        let _lock = CWD_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let tmp = workspace();
        let _cwd = CwdGuard::enter(tmp.path());

        let watcher = Watcher::new(".", Vec::new()).unwrap();

        fs::rename("a/b/c/d/e", "f/g/h/i/j/e").unwrap();

        assert_eq!(
            next_event(&watcher, EVENT_TIMEOUT),
            Event::Rename {
                old_path: "a/b/c/d/e".into(),
                new_path: "f/g/h/i/j/e".into(),
                is_dir: true,
            }
        );

        // the mirror followed the move: events inside the directory now
        // compose against its new path
        let file = fs::File::create("f/g/h/i/j/e/a.txt").unwrap();
        assert_eq!(
            next_event(&watcher, EVENT_TIMEOUT),
            Event::Create {
                path: "f/g/h/i/j/e/a.txt".into(),
                is_dir: false,
            }
        );

        drop(file);
    }

    #[test]
    fn rename_into_ignored_subtree_is_one_sided() {
        let _lock = CWD_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let tmp = workspace();
        let _cwd = CwdGuard::enter(tmp.path());
        fs::write("a/b/c/d/e/a.txt", "contents").unwrap();

        let watcher = Watcher::new(".", ignore(&["^f.*"])).unwrap();

        fs::rename("a/b/c/d/e/a.txt", "f/g/h/i/j/b.txt").unwrap();

        // the MOVED_TO half lands in the ignored subtree, so the pairing
        // window has to elapse before the one-sided rename appears
        assert_eq!(
            next_event(&watcher, EVENT_TIMEOUT),
            Event::Rename {
                old_path: "a/b/c/d/e/a.txt".into(),
                new_path: String::new(),
                is_dir: false,
            }
        );
        assert_quiet(&watcher);
    }

    #[test]
    fn ignored_file_stays_silent() {
        let _lock = CWD_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let tmp = workspace();
        let _cwd = CwdGuard::enter(tmp.path());

        let watcher = Watcher::new(".", ignore(&[r"^a/b/c/d/e/a\.txt$"])).unwrap();

        fs::write("a/b/c/d/e/a.txt", "contents").unwrap();
        fs::remove_file("a/b/c/d/e/a.txt").unwrap();

        assert_quiet(&watcher);
        assert!(watcher.errs().try_recv().is_err());
    }
}
