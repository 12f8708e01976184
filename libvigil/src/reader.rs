//! Kernel reader task.
//!
//! Blocks in the kernel read, reassembles the byte stream into records, and
//! forwards them to the engine. Exactly one error may be surfaced, after
//! which the task exits; a disconnected `done` channel ends the task silently
//! before the next read.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use tracing::debug;

use crate::error::Error;
use crate::sys::{self, RawRecord, WatchHandle};

pub(crate) fn spawn(
    handle: Arc<WatchHandle>,
    records_tx: Sender<RawRecord>,
    errs_tx: Sender<Error>,
    done_rx: Receiver<()>,
) {
    let _ = thread::spawn(move || {
        let mut buf = [0u8; sys::READ_BUFFER_LEN];

        loop {
            if matches!(done_rx.try_recv(), Err(TryRecvError::Disconnected)) {
                break;
            }

            let n = match handle.read(&mut buf) {
                Ok(n) => n,
                Err(err) => {
                    let _ = errs_tx.send(Error::Read(err));
                    break;
                }
            };

            for record in sys::parse_records(&buf[..n]) {
                if records_tx.send(record).is_err() {
                    // engine is gone
                    return;
                }
            }
        }

        debug!("kernel reader stopped");
    });
}
