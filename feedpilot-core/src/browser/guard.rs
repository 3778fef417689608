use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::error::{BrowserError, BrowserResult};

pub async fn bounded<T, F>(
    label: &str,
    limit: Duration,
    cancel: &CancellationToken,
    operation: F,
) -> BrowserResult<T>
where
    F: Future<Output = BrowserResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BrowserError::Cancelled),
        outcome = timeout(limit, operation) => match outcome {
            Ok(result) => result,
            Err(_) => Err(BrowserError::Timeout(label.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn times_out_slow_operations() {
        let cancel = CancellationToken::new();
        let result: BrowserResult<()> = bounded("author", Duration::from_secs(5), &cancel, async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(BrowserError::Timeout(label)) if label == "author"));
    }

    #[tokio::test]
    async fn passes_through_results() {
        let cancel = CancellationToken::new();
        let value = bounded("noop", Duration::from_secs(1), &cancel, async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
