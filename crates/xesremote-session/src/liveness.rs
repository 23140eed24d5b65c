use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Periodic tick for liveness frames.
///
/// Exists only while the session is open: the session creates it on the
/// transition into `Open` and drops it on the transition out, so holding
/// one is the same as "liveness frames are due".
#[derive(Debug)]
pub struct LivenessTimer {
    interval: Interval,
}

impl LivenessTimer {
    /// Start ticking. The first tick fires one full `period` from now.
    pub fn start(period: Duration) -> Self {
        let period = period.max(MIN_INTERVAL);
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    /// Wait for the next tick. Cancel-safe.
    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

/// Resolves on the next tick of `timer`, or never when there is none.
pub(crate) async fn next_tick(timer: Option<&mut LivenessTimer>) {
    match timer {
        Some(timer) => timer.tick().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_tick_after_one_period() {
        let start = Instant::now();
        let mut timer = LivenessTimer::start(Duration::from_secs(10));
        timer.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(10));
        timer.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_timer_never_ticks() {
        let result = time::timeout(Duration::from_secs(60), next_tick(None)).await;
        assert!(result.is_err());
    }

    #[test]
    fn zero_period_is_clamped() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            let timer = LivenessTimer::start(Duration::ZERO);
            assert_eq!(timer.period(), MIN_INTERVAL);
        });
    }
}
