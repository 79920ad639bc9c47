//! Push Notifier
//!
//! Best-effort, debounced "available jobs" signal per connected runner.
//! Transport agnostic: subscribers get an mpsc receiver; the SSE endpoint is
//! one way to drain it. Missing a ping is harmless since `request()` polling
//! remains the source of truth.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reel_core::domain::job::JobType;
use tokio::sync::mpsc;

const PING_CHANNEL_CAPACITY: usize = 8;

/// Debounced per-runner notification hub
pub struct JobNotifier {
    debounce: Duration,
    subscribers: Mutex<HashMap<i64, Subscriber>>,
}

struct Subscriber {
    job_types: HashSet<JobType>,
    tx: mpsc::Sender<()>,
    /// Set while a ping is scheduled; further notifies coalesce into it.
    pending_ping: Arc<AtomicBool>,
}

impl JobNotifier {
    pub fn new(debounce: Duration) -> JobNotifier {
        JobNotifier {
            debounce,
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Register a runner's interest in the given job types.
    /// A second subscription for the same runner replaces the first.
    pub fn subscribe(&self, runner_id: i64, job_types: Vec<JobType>) -> mpsc::Receiver<()> {
        let (tx, rx) = mpsc::channel(PING_CHANNEL_CAPACITY);

        let subscriber = Subscriber {
            job_types: job_types.into_iter().collect(),
            tx,
            pending_ping: Arc::new(AtomicBool::new(false)),
        };

        self.subscribers
            .lock()
            .expect("notifier lock poisoned")
            .insert(runner_id, subscriber);

        rx
    }

    pub fn unsubscribe(&self, runner_id: i64) {
        self.subscribers
            .lock()
            .expect("notifier lock poisoned")
            .remove(&runner_id);
    }

    /// Signal that a job of the given type just became claimable.
    ///
    /// Fire-and-forget: schedules one debounced, empty ping per interested
    /// runner; bursts within the debounce window coalesce.
    pub fn notify_pending(&self, job_type: JobType) {
        let mut subscribers = self.subscribers.lock().expect("notifier lock poisoned");

        // Drop subscribers whose receiver side is gone
        subscribers.retain(|_, sub| !sub.tx.is_closed());

        for (runner_id, sub) in subscribers.iter() {
            if !sub.job_types.contains(&job_type) {
                continue;
            }

            if sub.pending_ping.swap(true, Ordering::SeqCst) {
                continue;
            }

            let tx = sub.tx.clone();
            let pending_ping = Arc::clone(&sub.pending_ping);
            let debounce = self.debounce;
            let runner_id = *runner_id;

            tokio::spawn(async move {
                tokio::time::sleep(debounce).await;
                pending_ping.store(false, Ordering::SeqCst);

                if tx.try_send(()).is_err() {
                    tracing::debug!("Dropped available-jobs ping for runner {}", runner_id);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_burst_coalesces_into_one_ping() {
        let notifier = JobNotifier::new(Duration::from_millis(50));
        let mut rx = notifier.subscribe(1, vec![JobType::WebVideoTranscoding]);

        for _ in 0..5 {
            notifier.notify_pending(JobType::WebVideoTranscoding);
        }

        timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("expected a ping")
            .expect("channel closed");

        // No second ping behind the first
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_ping_filtered_by_job_type() {
        let notifier = JobNotifier::new(Duration::from_millis(10));
        let mut rx = notifier.subscribe(1, vec![JobType::VideoTranscription]);

        notifier.notify_pending(JobType::WebVideoTranscoding);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err());

        notifier.notify_pending(JobType::VideoTranscription);

        timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("expected a ping")
            .expect("channel closed");
    }

    #[tokio::test]
    async fn test_new_burst_after_flush_pings_again() {
        let notifier = JobNotifier::new(Duration::from_millis(10));
        let mut rx = notifier.subscribe(1, vec![JobType::HlsTranscoding]);

        notifier.notify_pending(JobType::HlsTranscoding);
        timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("expected first ping")
            .expect("channel closed");

        notifier.notify_pending(JobType::HlsTranscoding);
        timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("expected second ping")
            .expect("channel closed");
    }
}
