//! Debouncer - Runs only the latest of a burst of triggers.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Delays work until `delay` has passed without a newer trigger.
///
/// A new trigger aborts the previous task whether it is still waiting or
/// already running its work, so a stale fetch can never land after a newer
/// one.
pub struct Debouncer {
    name: &'static str,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(name: &'static str, delay: Duration) -> Self {
        Self {
            name,
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules `work`, replacing anything scheduled before.
    ///
    /// Must be called from within a tokio runtime.
    pub fn trigger<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            work.await;
        });

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            if !previous.is_finished() {
                tracing::debug!(debouncer = self.name, "superseded pending work");
            }
            previous.abort();
        }
    }

    /// Cancels pending or running work. Returns true if something was cancelled.
    pub fn cancel(&self) -> bool {
        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match previous {
            Some(task) if !task.is_finished() => {
                task.abort();
                true
            }
            _ => false,
        }
    }

    /// True while work is waiting or running.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(task) = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder() -> Arc<Mutex<Vec<u32>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn burst_runs_only_latest() {
        let debouncer = Debouncer::new("test", Duration::from_millis(300));
        let fired = recorder();

        for n in 1..=3 {
            let fired = Arc::clone(&fired);
            debouncer.trigger(async move {
                fired.lock().unwrap().push(n);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(*fired.lock().unwrap(), vec![3]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_trigger_aborts_running_work() {
        let debouncer = Debouncer::new("test", Duration::from_millis(10));
        let fired = recorder();

        let slow = Arc::clone(&fired);
        debouncer.trigger(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            slow.lock().unwrap().push(1);
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(debouncer.is_pending());

        let fast = Arc::clone(&fired);
        debouncer.trigger(async move {
            fast.lock().unwrap().push(2);
        });
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(*fired.lock().unwrap(), vec![2]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_pending_work() {
        let debouncer = Debouncer::new("test", Duration::from_millis(300));
        let fired = recorder();

        let f = Arc::clone(&fired);
        debouncer.trigger(async move {
            f.lock().unwrap().push(1);
        });
        assert!(debouncer.cancel());
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(fired.lock().unwrap().is_empty());
        assert!(!debouncer.cancel());
    }
}
