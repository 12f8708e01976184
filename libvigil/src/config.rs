//! Watcher tunables.

/// Configuration for a watcher instance.
#[derive(Debug, Clone)]
pub struct Config {
    /// How long a `MOVED_FROM` record waits for its `MOVED_TO` pair before
    /// it is reported as a one-sided move, in milliseconds.
    pub move_window_ms: u64,

    /// Capacity of the internal channel carrying raw kernel records from
    /// the reader to the engine.
    pub record_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            move_window_ms: 100,
            record_capacity: 64,
        }
    }
}
