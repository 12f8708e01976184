//! Pairing of `MOVED_FROM` / `MOVED_TO` records by kernel cookie.
//!
//! The kernel guarantees the same cookie on both halves of an intra-watch
//! rename; it is the only reliable correlator. A `MOVED_FROM` waits up to the
//! pairing window for its partner, then surfaces as a one-sided move. The
//! correlator keeps deadlines instead of spawning a timer task per cookie:
//! the engine loop asks for [`next_deadline`] and drains [`take_expired`]
//! from its timer arm.
//!
//! [`next_deadline`]: MoveCorrelator::next_deadline
//! [`take_expired`]: MoveCorrelator::take_expired

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// One endpoint of a move: the watched parent directory plus the entry name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveEnd {
    pub parent_wd: i32,
    pub name: String,
}

/// A paired (or timed-out) move. A missing side lies outside the watched
/// subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedMove {
    pub from: Option<MoveEnd>,
    pub to: Option<MoveEnd>,
    pub is_dir: bool,
}

#[derive(Debug)]
struct PendingMove {
    parent_wd: i32,
    name: String,
    is_dir: bool,
    deadline: Instant,
}

#[derive(Debug)]
pub struct MoveCorrelator {
    pending: HashMap<u32, PendingMove>,
    window: Duration,
}

impl MoveCorrelator {
    pub fn new(window: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            window,
        }
    }

    /// Register a `MOVED_FROM` half. It stays pending until a matching
    /// `MOVED_TO` consumes it or the window elapses. At most one entry per
    /// cookie; a duplicate cookie replaces the stale entry.
    pub fn record_from(&mut self, cookie: u32, parent_wd: i32, name: String, is_dir: bool, now: Instant) {
        self.pending.insert(
            cookie,
            PendingMove {
                parent_wd,
                name,
                is_dir,
                deadline: now + self.window,
            },
        );
    }

    /// Resolve a `MOVED_TO` half. A matching pending entry yields a
    /// two-sided move; otherwise the item arrived from outside the watched
    /// subtree and the unknown source carries no directory flag.
    pub fn record_to(&mut self, cookie: u32, parent_wd: i32, name: String, is_dir: bool) -> UnifiedMove {
        let to = Some(MoveEnd { parent_wd, name });

        match self.pending.remove(&cookie) {
            Some(from) => UnifiedMove {
                from: Some(MoveEnd {
                    parent_wd: from.parent_wd,
                    name: from.name,
                }),
                to,
                is_dir,
            },
            None => UnifiedMove {
                from: None,
                to,
                is_dir: false,
            },
        }
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Drain every entry whose window has elapsed, as one-sided moves.
    pub fn take_expired(&mut self, now: Instant) -> Vec<UnifiedMove> {
        let cookies: Vec<u32> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(cookie, _)| *cookie)
            .collect();

        cookies
            .into_iter()
            .filter_map(|cookie| self.pending.remove(&cookie))
            .map(|from| UnifiedMove {
                from: Some(MoveEnd {
                    parent_wd: from.parent_wd,
                    name: from.name,
                }),
                to: None,
                is_dir: from.is_dir,
            })
            .collect()
    }

    /// Number of moves still waiting for a pair.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
