//! Kernel inotify interface.
//!
//! Thin wrapper over the Linux inotify syscalls plus the record framing the
//! kernel uses on the read side: a fixed 16-byte header `{ wd, mask, cookie,
//! name_len }` followed by `name_len` bytes of null-padded name. Everything
//! above this module works with parsed [`RawRecord`]s and never touches the
//! file descriptor directly.

use std::ffi::CString;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

/// Fixed portion of a kernel record.
pub const EVENT_HEADER_LEN: usize = 16;

/// Maximum length of a single name component on Linux.
pub const NAME_MAX: usize = 255;

/// Read-buffer size: room for 64 maximal records, so a single read returns
/// whole records whenever the kernel can deliver them contiguously.
///
/// (16 + 255 + 1) * 64 = 17408
pub const READ_BUFFER_LEN: usize = (EVENT_HEADER_LEN + NAME_MAX + 1) * 64;

pub const IN_CREATE: u32 = libc::IN_CREATE;
pub const IN_DELETE: u32 = libc::IN_DELETE;
pub const IN_CLOSE_WRITE: u32 = libc::IN_CLOSE_WRITE;
pub const IN_MOVED_FROM: u32 = libc::IN_MOVED_FROM;
pub const IN_MOVED_TO: u32 = libc::IN_MOVED_TO;
pub const IN_IGNORED: u32 = libc::IN_IGNORED;
pub const IN_ISDIR: u32 = libc::IN_ISDIR;
pub const IN_Q_OVERFLOW: u32 = libc::IN_Q_OVERFLOW;

/// Subscription mask applied to every enrolled directory.
pub const WATCH_MASK: u32 = IN_CREATE | IN_DELETE | IN_CLOSE_WRITE | IN_MOVED_FROM | IN_MOVED_TO;

/// A parsed kernel record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub wd: i32,
    pub mask: u32,
    pub cookie: u32,
    /// Name of the affected entry relative to the watched directory; empty
    /// for records about the watched directory itself.
    pub name: String,
}

/// Handle to a kernel inotify instance.
///
/// The reader task is the only reader of the descriptor; [`close`] is
/// idempotent and may be called from any task.
///
/// [`close`]: WatchHandle::close
#[derive(Debug)]
pub struct WatchHandle {
    fd: i32,
    closed: AtomicBool,
}

impl WatchHandle {
    /// Create a new inotify instance.
    pub fn init() -> io::Result<Self> {
        let fd = unsafe { libc::inotify_init1(libc::IN_CLOEXEC) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self {
            fd,
            closed: AtomicBool::new(false),
        })
    }

    /// Subscribe `path` with [`WATCH_MASK`] and return its watch descriptor.
    pub fn add_watch(&self, path: &str) -> io::Result<i32> {
        let c_path = CString::new(path)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL"))?;

        let wd = unsafe { libc::inotify_add_watch(self.fd, c_path.as_ptr(), WATCH_MASK) };
        if wd < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(wd)
    }

    /// Unsubscribe a watch descriptor.
    pub fn rm_watch(&self, wd: i32) -> io::Result<()> {
        let rc = unsafe { libc::inotify_rm_watch(self.fd, wd as _) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Blocking read of queued records into `buf`. Returns the number of
    /// bytes filled.
    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(n as usize)
    }

    /// Close the descriptor. Subsequent calls are no-ops.
    pub fn close(&self) -> io::Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let rc = unsafe { libc::close(self.fd) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Split a filled read buffer into records.
///
/// Records are packed back-to-back; any partial suffix simply means no more
/// records this read. Trailing null padding is trimmed from names.
pub fn parse_records(buf: &[u8]) -> Vec<RawRecord> {
    let mut records = Vec::new();
    let mut offset = 0;

    while offset + EVENT_HEADER_LEN <= buf.len() {
        let wd = read_i32(buf, offset);
        let mask = read_u32(buf, offset + 4);
        let cookie = read_u32(buf, offset + 8);
        let name_len = read_u32(buf, offset + 12) as usize;

        let name_start = offset + EVENT_HEADER_LEN;
        if name_start + name_len > buf.len() {
            break;
        }

        let name_bytes = &buf[name_start..name_start + name_len];
        let trimmed = name_bytes
            .iter()
            .position(|&b| b == 0)
            .map_or(name_bytes, |end| &name_bytes[..end]);

        records.push(RawRecord {
            wd,
            mask,
            cookie,
            name: String::from_utf8_lossy(trimmed).into_owned(),
        });

        offset = name_start + name_len;
    }

    records
}

fn read_i32(buf: &[u8], at: usize) -> i32 {
    i32::from_ne_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_ne_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}
