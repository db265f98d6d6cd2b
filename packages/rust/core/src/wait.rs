//! Waiting for the external tool's artifact to appear.

use std::path::Path;
use std::time::{Duration, SystemTime};

use tokio::time::{Instant, sleep};
use tracing::{debug, instrument, warn};

use inputbuilder_shared::WaitPolicy;

/// Wait according to `policy`, then report whether `artifact` exists.
///
/// In poll mode the artifact must also stop changing (size and mtime) for
/// the policy's settle period before it is reported.
#[instrument(skip_all, fields(artifact = %artifact.display()))]
pub async fn await_artifact(artifact: &Path, policy: &WaitPolicy) -> bool {
    match *policy {
        WaitPolicy::Fixed { wait } => {
            debug!(wait_secs = wait.as_secs_f64(), "fixed wait before artifact check");
            sleep(wait).await;
            artifact.is_file()
        }
        WaitPolicy::Poll {
            initial,
            max_interval,
            factor,
            timeout,
            settle,
        } => {
            let deadline = Instant::now() + timeout;
            let mut interval = initial;
            let mut last_seen: Option<(FileState, Instant)> = None;
            loop {
                let now = Instant::now();
                match file_state(artifact) {
                    Some(state) => match last_seen {
                        Some((prev, since)) if prev == state => {
                            if now.duration_since(since) >= settle {
                                return true;
                            }
                        }
                        _ => {
                            debug!(size = state.size, "artifact present, waiting for it to settle");
                            if settle.is_zero() {
                                return true;
                            }
                            last_seen = Some((state, now));
                        }
                    },
                    None => last_seen = None,
                }

                if now >= deadline {
                    if last_seen.is_some() {
                        warn!("artifact still changing at poll timeout");
                    }
                    return false;
                }
                let nap = interval.min(deadline - now);
                debug!(interval_ms = nap.as_millis() as u64, "polling for artifact");
                sleep(nap).await;
                interval = next_interval(interval, factor, max_interval);
            }
        }
    }
}

/// Exponential backoff step, capped at `max`.
pub fn next_interval(current: Duration, factor: f64, max: Duration) -> Duration {
    Duration::try_from_secs_f64(current.as_secs_f64() * factor).map_or(max, |d| d.min(max))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileState {
    size: u64,
    modified: Option<SystemTime>,
}

fn file_state(path: &Path) -> Option<FileState> {
    let metadata = std::fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }
    Some(FileState {
        size: metadata.len(),
        modified: metadata.modified().ok(),
    })
}
