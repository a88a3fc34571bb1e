use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

/// Handle for an active document watch. Dropping it signals the polling
/// thread to stop; `cancel` additionally waits for it to exit.
pub struct Subscription {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn cancel(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

type Signature = Option<(SystemTime, u64)>;

fn signature(path: &Path) -> Signature {
    let meta = std::fs::metadata(path).ok()?;
    Some((meta.modified().ok()?, meta.len()))
}

/// Watches `path` by polling its metadata signature (mtime and length) at
/// `poll_interval`. The callback fires on any observed change, including
/// creation and deletion; rapid successive edits may coalesce into a
/// single call.
pub fn watch<F>(path: PathBuf, poll_interval: Duration, on_change: F) -> Subscription
where
    F: Fn() + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop);

    let handle = thread::spawn(move || {
        let mut last = signature(&path);
        while !thread_stop.load(Ordering::Relaxed) {
            thread::sleep(poll_interval);
            let current = signature(&path);
            if current != last {
                last = current;
                on_change();
            }
        }
    });

    Subscription {
        stop,
        handle: Some(handle),
    }
}
