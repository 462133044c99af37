use std::time::Duration;

const MAX_ABORT_GRACE: Duration = Duration::from_secs(5);

/// How long to wait for timed-out blocking work to stop before detaching it
pub fn abort_grace(timeout: Duration) -> Duration {
    timeout.min(MAX_ABORT_GRACE)
}
