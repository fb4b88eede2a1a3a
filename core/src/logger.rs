// Global logging system for Phoenix

use spin::Mutex;

const MAX_LOG_ENTRIES: usize = 64;

struct LogRing {
    entries: [Option<&'static str>; MAX_LOG_ENTRIES],
    count: usize,
}

static LOG: Mutex<LogRing> = Mutex::new(LogRing {
    entries: [None; MAX_LOG_ENTRIES],
    count: 0,
});

pub fn log(message: &'static str) {
    let mut ring = LOG.lock();
    let idx = ring.count;
    if idx < MAX_LOG_ENTRIES {
        ring.entries[idx] = Some(message);
    }
    ring.count = idx + 1;
}

/// Visit every retained entry in arrival order.
pub fn for_each(mut visit: impl FnMut(&'static str)) {
    let ring = LOG.lock();
    let retained = ring.count.min(MAX_LOG_ENTRIES);
    for entry in ring.entries[..retained].iter().flatten() {
        visit(*entry);
    }
}

/// Total messages logged, including any dropped past capacity.
pub fn log_count() -> usize {
    LOG.lock().count
}

pub fn clear() {
    let mut ring = LOG.lock();
    ring.entries = [None; MAX_LOG_ENTRIES];
    ring.count = 0;
}

// Macro for easier logging
#[macro_export]
macro_rules! log_info {
    ($msg:expr) => {
        $crate::logger::log($msg)
    };
}
