use locksmith::LocksmithApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep_until, timeout_at, Instant, MissedTickBehavior};
use unlock_dash_core::models::Job;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    pub interval: Duration,
    /// Wall-clock ceiling after which polling stops for good.
    pub timeout: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            timeout: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Completed,
    TimedOut,
    /// Polling was not requested; a single fetch was made.
    NotPolling,
}

#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
    pub job: Option<Job>,
    pub error: Option<String>,
    pub polls: usize,
    pub stopped: Option<StopReason>,
}

/// Handle to a running receipts status poller. Dropping it stops the poller.
pub struct StatusWatch {
    receiver: watch::Receiver<StatusSnapshot>,
    handle: JoinHandle<()>,
}

impl StatusWatch {
    pub(crate) fn spawn(
        api: Arc<dyn LocksmithApi + 'static>,
        network: u64,
        lock: String,
        condition: bool,
        config: PollingConfig,
    ) -> Self {
        let (tx, receiver) = watch::channel(StatusSnapshot::default());
        let handle = tokio::spawn(poll_status(api, network, lock, condition, config, tx));
        Self { receiver, handle }
    }

    pub fn latest(&self) -> StatusSnapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next update. Returns `false` once the poller has gone away.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    pub async fn wait_until_stopped(&mut self) -> StatusSnapshot {
        loop {
            let snapshot = self.latest();
            if snapshot.stopped.is_some() || !self.changed().await {
                return self.latest();
            }
        }
    }
}

impl Drop for StatusWatch {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn poll_status(
    api: Arc<dyn LocksmithApi + 'static>,
    network: u64,
    lock: String,
    condition: bool,
    config: PollingConfig,
    tx: watch::Sender<StatusSnapshot>,
) {
    if !condition {
        fetch(&*api, network, &lock, &tx).await;
        tx.send_modify(|s| s.stopped = Some(StopReason::NotPolling));
        return;
    }

    let deadline = Instant::now() + config.timeout;
    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = sleep_until(deadline) => break,
            _ = ticker.tick() => {
                // A request still in flight at the deadline is abandoned.
                match timeout_at(deadline, fetch(&*api, network, &lock, &tx)).await {
                    Ok(true) => {
                        tracing::info!(network, lock = %lock, "Receipts export completed");
                        tx.send_modify(|s| s.stopped = Some(StopReason::Completed));
                        return;
                    }
                    Ok(false) => {}
                    Err(_) => break,
                }
            }
        }
    }
    tracing::info!(network, lock = %lock, "Receipts status polling timed out");
    tx.send_modify(|s| s.stopped = Some(StopReason::TimedOut));
}

/// One status request. Returns whether the job reached a terminal status.
async fn fetch(
    api: &dyn LocksmithApi,
    network: u64,
    lock: &str,
    tx: &watch::Sender<StatusSnapshot>,
) -> bool {
    match api.get_receipts_status(network, lock).await {
        Ok(job) => {
            let terminal = job.as_ref().map(Job::is_terminal).unwrap_or(false);
            tx.send_modify(|s| {
                s.job = job;
                s.error = None;
                s.polls += 1;
            });
            terminal
        }
        Err(err) => {
            tracing::warn!(network, lock, error = %err, "Receipts status request failed");
            tx.send_modify(|s| {
                s.error = Some(err.to_string());
                s.polls += 1;
            });
            false
        }
    }
}
