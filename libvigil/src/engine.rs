//! Event engine.
//!
//! Single consumer of the kernel-record stream. Interprets records against
//! the watch tree and the ignore rules, enrolls new subdirectories and prunes
//! removed ones, drives the move correlator, and is the sole writer to the
//! public event and error channels. Terminal errors are surfaced exactly
//! once, then the engine closes the watcher and exits.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{at, never, select, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, TreeError};
use crate::events::Event;
use crate::ignore::IgnoreRules;
use crate::moves::{MoveCorrelator, MoveEnd, UnifiedMove};
use crate::sys::{self, RawRecord, WatchHandle};
use crate::tree::{clean_path, join_path, WatchTree};
use crate::Closer;

use walkdir::WalkDir;

enum Flow {
    Continue,
    Shutdown,
}

pub struct Engine {
    handle: Arc<WatchHandle>,
    closer: Closer,
    tree: WatchTree,
    rules: IgnoreRules,
    correlator: MoveCorrelator,
    events_tx: Sender<Event>,
    errs_tx: Sender<Error>,
    done_rx: Receiver<()>,
    records_rx: Receiver<RawRecord>,
    read_errs_rx: Receiver<Error>,
}

impl Engine {
    /// Enroll the root and every descendant directory, building the mirror
    /// tree. The caller releases the kernel handle if this fails.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn bootstrap(
        handle: Arc<WatchHandle>,
        closer: Closer,
        root_path: &str,
        rules: IgnoreRules,
        config: &Config,
        events_tx: Sender<Event>,
        errs_tx: Sender<Error>,
        done_rx: Receiver<()>,
        records_rx: Receiver<RawRecord>,
        read_errs_rx: Receiver<Error>,
    ) -> Result<Self, Error> {
        let root_wd = handle.add_watch(root_path).map_err(|source| Error::Enroll {
            path: root_path.to_owned(),
            source,
        })?;

        let mut tree = WatchTree::new();
        tree.set_root(root_path, root_wd)?;

        let mut engine = Self {
            handle,
            closer,
            tree,
            rules,
            correlator: MoveCorrelator::new(Duration::from_millis(config.move_window_ms)),
            events_tx,
            errs_tx,
            done_rx,
            records_rx,
            read_errs_rx,
        };
        engine.add_dirs_starting_at(root_path)?;

        info!(root = %root_path, "watching directory tree");

        Ok(engine)
    }

    /// Multiplex over shutdown, reader errors, raw records, and the pairing
    /// window until one of them ends the watcher.
    pub(crate) fn run(mut self) {
        enum Wake {
            Done,
            ReadErr(Option<Error>),
            Record(Option<RawRecord>),
            Timer,
        }

        loop {
            let timer = match self.correlator.next_deadline() {
                Some(deadline) => at(deadline),
                None => never(),
            };

            let wake = select! {
                recv(self.done_rx) -> _ => Wake::Done,
                recv(self.read_errs_rx) -> msg => Wake::ReadErr(msg.ok()),
                recv(self.records_rx) -> msg => Wake::Record(msg.ok()),
                recv(timer) -> _ => Wake::Timer,
            };

            let flow = match wake {
                Wake::Done => Flow::Shutdown,
                Wake::ReadErr(Some(err)) => self.fail(err),
                Wake::ReadErr(None) => Flow::Shutdown,
                Wake::Record(Some(record)) => self.handle_record(record),
                Wake::Record(None) => {
                    // the reader may have died with an error in flight
                    match self.read_errs_rx.try_recv() {
                        Ok(err) => self.fail(err),
                        Err(_) => Flow::Shutdown,
                    }
                }
                Wake::Timer => {
                    let mut flow = Flow::Continue;
                    for mv in self.correlator.take_expired(Instant::now()) {
                        flow = self.handle_move(mv);
                        if matches!(flow, Flow::Shutdown) {
                            break;
                        }
                    }
                    flow
                }
            };

            if matches!(flow, Flow::Shutdown) {
                break;
            }
        }

        if let Err(err) = self.closer.close() {
            warn!("closing watcher after engine exit: {}", err);
        }
        debug!("event engine stopped");
    }

    fn handle_record(&mut self, record: RawRecord) -> Flow {
        if record.mask & sys::IN_Q_OVERFLOW != 0 {
            return self.fail(Error::Overflow);
        }

        // IN_IGNORED records arrive for subtrees the engine already forgot
        if !self.tree.has(record.wd) {
            return Flow::Continue;
        }

        let is_dir = record.mask & sys::IN_ISDIR != 0;
        let parent_path = match self.tree.path(record.wd) {
            Some(path) => path,
            None => return Flow::Continue,
        };
        let full_path = join_path(&parent_path, &record.name);

        if self.rules.matches(&full_path, is_dir) {
            return Flow::Continue;
        }

        if record.mask & sys::IN_IGNORED != 0 {
            // only meaningful on the root: any other directory's watch is
            // detached after its parent already saw an IN_DELETE
            if Some(record.wd) == self.tree.root_wd() {
                debug!("root directory left the watch; shutting down");
                return Flow::Shutdown;
            }
            Flow::Continue
        } else if record.mask & sys::IN_CREATE != 0 {
            if is_dir {
                match self.add_dir(&record.name, record.wd) {
                    Ok(Some(_)) => {
                        if let Err(err) = self.add_dirs_starting_at(&full_path) {
                            return self.fail(err);
                        }
                    }
                    Ok(None) => {}
                    Err(err) => return self.fail(err),
                }
            }
            self.emit(Event::Create {
                path: full_path,
                is_dir,
            })
        } else if record.mask & sys::IN_DELETE != 0 {
            if is_dir {
                // the record can race a subtree the engine already forgot
                let Some(wd) = self.tree.find(&full_path) else {
                    return Flow::Continue;
                };
                // the kernel dropped these watches with the directory
                if let Err(err) = self.tree.remove(wd) {
                    return self.fail(Error::Tree(err));
                }
            }
            self.emit(Event::Delete {
                path: full_path,
                is_dir,
            })
        } else if record.mask & sys::IN_CLOSE_WRITE != 0 {
            self.emit(Event::Modify { path: full_path })
        } else if record.mask & sys::IN_MOVED_FROM != 0 {
            self.correlator
                .record_from(record.cookie, record.wd, record.name, is_dir, Instant::now());
            Flow::Continue
        } else if record.mask & sys::IN_MOVED_TO != 0 {
            let mv = self
                .correlator
                .record_to(record.cookie, record.wd, record.name, is_dir);
            self.handle_move(mv)
        } else {
            Flow::Continue
        }
    }

    fn handle_move(&mut self, mv: UnifiedMove) -> Flow {
        let UnifiedMove { from, to, is_dir } = mv;

        let old_path = match &from {
            Some(end) => match self.compose(end) {
                Some(path) => path,
                // the old parent vanished before the window expired
                None => return Flow::Continue,
            },
            None => String::new(),
        };
        let new_path = match &to {
            Some(end) => match self.compose(end) {
                Some(path) => path,
                None => return Flow::Continue,
            },
            None => String::new(),
        };

        if is_dir {
            match (&from, &to) {
                (Some(_), Some(end)) => {
                    if let Some(wd) = self.tree.find(&old_path) {
                        if let Err(err) =
                            self.tree
                                .move_to(wd, Some(end.parent_wd), Some(end.name.as_str()))
                        {
                            return self.fail(Error::Tree(err));
                        }
                    }
                }
                (Some(_), None) => {
                    // moved outside the watch: the kernel keeps watching the
                    // inode, so detach each evicted descriptor explicitly
                    if let Some(wd) = self.tree.find(&old_path) {
                        match self.tree.remove(wd) {
                            Ok(removed) => {
                                for wd in removed {
                                    if let Err(err) = self.handle.rm_watch(wd) {
                                        debug!(wd, "detaching moved-out watch: {}", err);
                                    }
                                }
                            }
                            Err(err) => return self.fail(Error::Tree(err)),
                        }
                    }
                }
                (None, Some(end)) => match self.add_dir(&end.name, end.parent_wd) {
                    Ok(Some(_)) => {
                        if let Err(err) = self.add_dirs_starting_at(&new_path) {
                            return self.fail(err);
                        }
                    }
                    Ok(None) => {}
                    Err(err) => return self.fail(err),
                },
                (None, None) => {}
            }
        }

        self.emit(Event::Rename {
            old_path,
            new_path,
            is_dir,
        })
    }

    fn compose(&mut self, end: &MoveEnd) -> Option<String> {
        self.tree
            .path(end.parent_wd)
            .map(|path| join_path(&path, &end.name))
    }

    /// Enroll one directory under `parent_wd`, honoring the ignore rules.
    /// `Ok(None)` means the candidate matched a rule and was skipped.
    fn add_dir(&mut self, name: &str, parent_wd: i32) -> Result<Option<i32>, Error> {
        let parent_path = self
            .tree
            .path(parent_wd)
            .ok_or(Error::Tree(TreeError::NotFound(parent_wd)))?;
        let dir_path = join_path(&parent_path, name);

        if self.rules.matches(&dir_path, true) {
            return Ok(None);
        }

        let wd = self.handle.add_watch(&dir_path).map_err(|source| Error::Enroll {
            path: dir_path.clone(),
            source,
        })?;
        self.tree.add(wd, name, parent_wd)?;

        debug!(path = %dir_path, wd, "directory enrolled");

        Ok(Some(wd))
    }

    /// Enroll every directory below `walk_path` recursively, pruning ignored
    /// subtrees. The walk yields parents before children, so each entry's
    /// parent is already in the tree.
    fn add_dirs_starting_at(&mut self, walk_path: &str) -> Result<(), Error> {
        let rules = self.rules.clone();
        let walker = WalkDir::new(walk_path)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_entry(move |entry| {
                entry.depth() == 0
                    || (entry.file_type().is_dir()
                        && !rules.matches(&clean_path(&entry.path().to_string_lossy()), true))
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(|p| p.to_string_lossy().into_owned())
                        .unwrap_or_else(|| walk_path.to_owned());
                    return Err(Error::List {
                        path,
                        source: err.into(),
                    });
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            let parent_path = entry
                .path()
                .parent()
                .map(|p| clean_path(&p.to_string_lossy()))
                .unwrap_or_default();
            let Some(parent_wd) = self.tree.find(&parent_path) else {
                // parent enrollment was skipped; leave the subtree alone
                continue;
            };

            self.add_dir(&name, parent_wd)?;
        }

        Ok(())
    }

    /// Forward an event, yielding to shutdown if the watcher closes while
    /// the consumer lags.
    fn emit(&self, event: Event) -> Flow {
        select! {
            send(self.events_tx, event) -> res => match res {
                Ok(()) => Flow::Continue,
                Err(_) => Flow::Shutdown,
            },
            recv(self.done_rx) -> _ => Flow::Shutdown,
        }
    }

    /// Surface the single terminal error and shut down.
    fn fail(&self, err: Error) -> Flow {
        let _ = self.errs_tx.send(err);
        Flow::Shutdown
    }
}
