use std::time::Duration;

use rand::{thread_rng, Rng};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use super::error::{BrowserError, BrowserResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct HumanPacer;

impl HumanPacer {
    pub fn new() -> Self {
        Self
    }

    pub fn random_duration(&self, bounds: [u64; 2]) -> Duration {
        let lower = bounds[0].min(bounds[1]);
        let upper = bounds[0].max(bounds[1]);
        if upper == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(thread_rng().gen_range(lower..=upper))
    }

    pub async fn pause(
        &self,
        bounds: [u64; 2],
        cancel: &CancellationToken,
    ) -> BrowserResult<Duration> {
        let delay = self.random_duration(bounds);
        self.wait(delay, cancel).await?;
        Ok(delay)
    }

    pub async fn wait(&self, delay: Duration, cancel: &CancellationToken) -> BrowserResult<()> {
        if delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BrowserError::Cancelled),
            _ = sleep(delay) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_duration_stays_within_bounds() {
        let pacer = HumanPacer::new();
        for _ in 0..200 {
            let delay = pacer.random_duration([1_500, 3_000]);
            assert!(delay >= Duration::from_millis(1_500));
            assert!(delay <= Duration::from_millis(3_000));
        }
        assert_eq!(pacer.random_duration([0, 0]), Duration::ZERO);
        let swapped = pacer.random_duration([400, 200]);
        assert!(swapped >= Duration::from_millis(200) && swapped <= Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_on_cancel() {
        let pacer = HumanPacer::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = pacer.pause([8_000, 15_000], &cancel).await;
        assert!(matches!(result, Err(BrowserError::Cancelled)));
    }
}
