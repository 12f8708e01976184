use std::sync::Mutex;

use once_cell::sync::Lazy;

/// Global mutex serialising tests that change the process working directory.
pub static CWD_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
