// Round Scheduler - Fixed-interval trigger for anti-entropy rounds

use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Fires once per period, starting one full period after creation
///
/// Ticks missed while the node was busy are delayed, not bursted.
pub struct RoundScheduler {
    interval: Interval,
    period: Duration,
}

impl RoundScheduler {
    /// Create a scheduler; must be called inside a tokio runtime
    pub fn new(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval, period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait for the next round
    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}

/// Next tick of an optional scheduler; never resolves without one
pub(crate) async fn next_tick(scheduler: &mut Option<RoundScheduler>) {
    match scheduler {
        Some(scheduler) => {
            scheduler.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
