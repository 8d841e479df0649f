// Background decode-ahead
// Keeps the ring buffer topped up so the render callback rarely decodes.

use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, trace};

use super::stream::StreamState;
use crate::error::{EngineError, Result};

pub struct Prefetcher {
    stop_signal: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Prefetcher {
    /// Spawn the prefetch thread. It runs decode-steps while the buffer has
    /// room for a whole step, taking the stream lock once per step, and
    /// sleeps for `interval` when there is nothing to do.
    pub fn spawn(stream: Arc<Mutex<StreamState>>, interval: Duration) -> Result<Self> {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let signal = Arc::clone(&stop_signal);

        let handle = thread::Builder::new()
            .name("ringplay-prefetch".to_string())
            .spawn(move || {
                debug!("Prefetch thread started");
                let mut steps = 0usize;
                while !signal.load(Ordering::Acquire) {
                    let mut guard = stream.lock();
                    let stepped = guard.fill_step();
                    // Hand the lock straight to a waiting render call
                    MutexGuard::unlock_fair(guard);

                    if stepped {
                        steps += 1;
                        continue;
                    }
                    if steps > 0 {
                        trace!("Prefetched {} decode-steps", steps);
                        steps = 0;
                    }
                    thread::sleep(interval);
                }
                debug!("Prefetch thread exiting");
            })
            .map_err(EngineError::Io)?;

        Ok(Self {
            stop_signal,
            handle: Some(handle),
        })
    }

    /// Signal the thread and wait for it to exit
    pub fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Prefetch thread panicked");
            }
        }
    }
}

impl Drop for Prefetcher {
    fn drop(&mut self) {
        self.stop();
    }
}
