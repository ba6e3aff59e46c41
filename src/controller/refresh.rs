use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Events fed back into the controller's event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// Periodic dashboard refresh
    Refresh { generation: u64 },
    /// One-shot refresh after an enrollment command
    FollowUpRefresh { generation: u64 },
}

impl AppEvent {
    pub fn generation(&self) -> u64 {
        match self {
            AppEvent::Refresh { generation } | AppEvent::FollowUpRefresh { generation } => *generation,
        }
    }
}

/// Periodic refresh bound to one dashboard visit.
///
/// Every `start` opens a new generation; ticks from an older generation are
/// stale and must be dropped by the receiver.
pub struct RefreshTimer {
    interval: Duration,
    events: UnboundedSender<AppEvent>,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl RefreshTimer {
    pub fn new(interval: Duration, events: UnboundedSender<AppEvent>) -> Self {
        Self {
            interval,
            events,
            generation: 0,
            task: None,
        }
    }

    /// (Re)start ticking. Must be called from within a Tokio runtime.
    pub fn start(&mut self) {
        self.stop();
        self.generation += 1;

        let generation = self.generation;
        let period = self.interval;
        let events = self.events.clone();
        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if events.send(AppEvent::Refresh { generation }).is_err() {
                    break;
                }
            }
        }));
        debug!(generation, interval_ms = period.as_millis() as u64, "Refresh timer started");
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // Invalidate ticks already queued
            self.generation += 1;
            debug!(generation = self.generation, "Refresh timer stopped");
        }
    }

    /// Send a single refresh after `delay`, tied to the current generation
    pub fn schedule_once(&self, delay: Duration) {
        if self.task.is_none() {
            return;
        }
        let generation = self.generation;
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(AppEvent::FollowUpRefresh { generation });
        });
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True if `event` belongs to the running generation
    pub fn is_current(&self, event: &AppEvent) -> bool {
        self.is_running() && event.generation() == self.generation
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_ticks_while_running() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = RefreshTimer::new(Duration::from_millis(10), tx);
        timer.start();

        let event = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert_eq!(event, AppEvent::Refresh { generation: 1 });
        assert!(timer.is_current(&event));
    }

    #[tokio::test]
    async fn test_stop_invalidates_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = RefreshTimer::new(Duration::from_millis(10), tx);
        timer.start();
        let event = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();

        timer.stop();
        assert!(!timer.is_running());
        assert!(!timer.is_current(&event));

        timer.start();
        assert!(!timer.is_current(&event));
        assert_eq!(timer.generation(), 3);
    }

    #[tokio::test]
    async fn test_schedule_once_requires_running_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timer = RefreshTimer::new(Duration::from_secs(3600), tx);

        timer.schedule_once(Duration::from_millis(1));
        assert!(timeout(Duration::from_millis(50), rx.recv()).await.is_err());

        timer.start();
        timer.schedule_once(Duration::from_millis(1));
        let event = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        assert_eq!(event, AppEvent::FollowUpRefresh { generation: timer.generation() });
    }
}
