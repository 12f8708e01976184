//! libvigil – recursive inotify directory watcher for Linux.
//!
//! Given a root directory and a set of ignore patterns, a [`Watcher`] emits a
//! live stream of semantic filesystem events (Create, Delete, Modify,
//! Rename) for every file and subdirectory under the root, following new
//! subdirectories as they appear and forgetting subtrees as they disappear.
//! Down-stream crates (`cli-bin`, tests) should depend only on the types
//! re-exported here, never on internal modules directly.

#![deny(warnings)]

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod ignore;
pub mod logging;
pub mod moves;
pub mod reader;
pub mod sys;
pub mod tree;

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod tree_tests;
#[cfg(test)]
mod watcher_tests;

pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::events::Event;

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use regex::Regex;
use tracing::warn;

use crate::engine::Engine;
use crate::ignore::IgnoreRules;
use crate::sys::WatchHandle;

/// Shared teardown state: flips the closed flag, closes the kernel handle,
/// and disconnects `done` so every task observes shutdown.
#[derive(Clone)]
pub(crate) struct Closer {
    handle: Arc<WatchHandle>,
    done_tx: Arc<Mutex<Option<Sender<()>>>>,
}

impl Closer {
    pub(crate) fn close(&self) -> Result<()> {
        let result = self.handle.close();
        if let Ok(mut slot) = self.done_tx.lock() {
            slot.take();
        }

        result.map_err(Error::Close)
    }
}

/// Main handle for watching a directory tree.
///
/// Constructed ready to emit; emits until the caller closes it or an
/// unrecoverable kernel error occurs, after which the error channel yields
/// the single terminal error and [`wait`] unblocks.
///
/// [`wait`]: Watcher::wait
pub struct Watcher {
    closer: Closer,
    events_rx: Receiver<Event>,
    errs_rx: Receiver<Error>,
    done_rx: Receiver<()>,
}

impl Watcher {
    /// Watch `root` with the default configuration.
    ///
    /// `ignore_rules` are tested against paths as this watcher composes them
    /// (directories with a trailing `/` appended): an absolute `root` yields
    /// absolute candidates, a `"."` root yields relative ones, so anchored
    /// expressions must be written for the root form actually passed. An
    /// empty list enables the default dotfile rule.
    pub fn new<P: AsRef<Path>>(root: P, ignore_rules: Vec<Regex>) -> Result<Self> {
        Self::with_config(root, ignore_rules, Config::default())
    }

    /// Watch `root`, overriding the tunables in [`Config`].
    pub fn with_config<P: AsRef<Path>>(
        root: P,
        ignore_rules: Vec<Regex>,
        config: Config,
    ) -> Result<Self> {
        let root = root.as_ref().to_string_lossy().into_owned();
        let rules = IgnoreRules::new(ignore_rules);

        let handle = Arc::new(WatchHandle::init().map_err(Error::Init)?);

        let (events_tx, events_rx) = bounded(0);
        let (errs_tx, errs_rx) = bounded(1);
        let (records_tx, records_rx) = bounded(config.record_capacity);
        let (read_errs_tx, read_errs_rx) = bounded(1);
        let (done_tx, done_rx) = bounded::<()>(0);

        let closer = Closer {
            handle: handle.clone(),
            done_tx: Arc::new(Mutex::new(Some(done_tx))),
        };

        let engine = match Engine::bootstrap(
            handle.clone(),
            closer.clone(),
            &root,
            rules,
            &config,
            events_tx,
            errs_tx,
            done_rx.clone(),
            records_rx,
            read_errs_rx,
        ) {
            Ok(engine) => engine,
            Err(err) => {
                let _ = handle.close();
                return Err(err);
            }
        };

        reader::spawn(handle, records_tx, read_errs_tx, done_rx.clone());
        let _ = thread::spawn(move || engine.run());

        Ok(Self {
            closer,
            events_rx,
            errs_rx,
            done_rx,
        })
    }

    /// The semantic event stream. Unbuffered: a consumer that falls behind
    /// backpressures the pipeline.
    pub fn events(&self) -> &Receiver<Event> {
        &self.events_rx
    }

    /// The error channel. Yields at most one terminal error, after which the
    /// watcher is closed.
    pub fn errs(&self) -> &Receiver<Error> {
        &self.errs_rx
    }

    /// Block until the watcher is closed.
    pub fn wait(&self) {
        let _ = self.done_rx.recv();
    }

    /// Close the watcher. If it is already closed, this is a no-op.
    pub fn close(&self) -> Result<()> {
        self.closer.close()
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("closing watcher on drop: {}", err);
        }
    }
}
