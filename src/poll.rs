use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::PollError;

/// Lifecycle reported by a status probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Queued,
    InProgress,
    Ready,
    Failed,
}

/// One probe response from an asynchronous generation job.
#[derive(Debug, Clone)]
pub struct PollStatus {
    pub state: PollState,
    pub progress: u8,
    pub message: String,
    /// Result reference, populated only once the job is ready.
    pub result: Option<String>,
}

/// Bring an asynchronous job to a terminal result by periodic probing.
///
/// The probe fires at a fixed `interval`, starting one interval after the
/// call. `on_progress` is invoked with the reported percentage and message
/// for every probe response, regardless of state. The loop resolves the
/// instant a `Ready` status carries a result reference, fails the instant
/// `Failed` is observed, and fails with [`PollError::Timeout`] once the
/// deadline elapses; no probe is issued at or after the deadline.
///
/// A `Ready` status without a result reference is treated as still in
/// progress: the service marks images ready a beat before the download link
/// appears, so the loop keeps polling until the link shows up.
pub async fn poll_until_ready<P, Fut, F, E>(
    mut probe: P,
    interval: Duration,
    timeout: Duration,
    mut on_progress: F,
) -> Result<String, PollError<E>>
where
    P: FnMut() -> Fut,
    Fut: Future<Output = Result<PollStatus, E>>,
    F: FnMut(u8, &str),
    E: std::error::Error + 'static,
{
    let started = Instant::now();
    loop {
        tokio::time::sleep(interval).await;
        if started.elapsed() >= timeout {
            return Err(PollError::Timeout(timeout));
        }

        let status = probe().await.map_err(PollError::Probe)?;
        on_progress(status.progress, &status.message);

        match status.state {
            PollState::Failed => return Err(PollError::Failed(status.message)),
            PollState::Ready => {
                if let Some(result) = status.result {
                    return Ok(result);
                }
            }
            PollState::Queued | PollState::InProgress => {}
        }
    }
}
