//! Logging setup and interrupt handling shared by both binaries

use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};

/// Install the fmt subscriber. INFO by default, DEBUG when `verbose`.
/// A subscriber installed earlier (tests, embedders) is left in place.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

/// Longest single sleep before re-checking a token
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Sleep up to `duration` on the current thread, waking early once `token`
/// is cancelled. Returns false if the sleep was cut short.
pub fn sleep_or_cancel(token: &CancellationToken, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if token.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(POLL_INTERVAL));
    }
}

/// Cancel `token` on Ctrl-C.
///
/// The binaries stay synchronous, so the signal future runs on its own
/// thread with a current-thread runtime. The thread exits once the token is
/// cancelled by either side.
pub fn cancel_on_ctrl_c(token: CancellationToken) -> io::Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("fabrique-signal".to_string())
        .spawn(move || {
            runtime.block_on(async {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => match result {
                        Ok(()) => {
                            info!("Interrupt received, shutting down");
                            token.cancel();
                        }
                        Err(e) => warn!(error = %e, "Cannot listen for Ctrl-C"),
                    },
                    _ = token.cancelled() => {}
                }
            });
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watcher_exits_on_cancel() {
        let token = CancellationToken::new();
        let handle = cancel_on_ctrl_c(token.clone()).unwrap();

        thread::sleep(Duration::from_millis(20));
        token.cancel();
        handle.join().unwrap();
    }

    #[test]
    fn test_sleep_wakes_on_cancel() {
        let token = CancellationToken::new();
        assert!(sleep_or_cancel(&token, Duration::from_millis(5)));

        let canceller = {
            let token = token.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(30));
                token.cancel();
            })
        };
        let start = Instant::now();
        assert!(!sleep_or_cancel(&token, Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(5));
        canceller.join().unwrap();
    }

    #[test]
    fn test_init_logging_twice() {
        init_logging(false);
        init_logging(true);
    }
}
