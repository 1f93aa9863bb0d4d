//! Recurring timer as a scoped resource.
//!
//! A [`Ticker`] publishes a `Tick` report once per period until cancelled.
//! Cancellation consumes the handle, so it happens exactly once; the
//! continuation that triggers it owns the cleanup.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::boundary::Value;
use crate::report::{Report, ReportBus, ReportKind};

#[derive(Debug, Clone, Error)]
pub enum TickerError {
    #[error("Tick period must be greater than 0")]
    ZeroPeriod,
}

/// Handle to a running recurring timer.
pub struct Ticker {
    cancel_tx: oneshot::Sender<()>,
    ticks: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl Ticker {
    /// Starts a timer publishing `Tick` reports on `bus` every `period`.
    pub fn start(bus: Arc<ReportBus>, period: Duration) -> Result<Self, TickerError> {
        if period.is_zero() {
            return Err(TickerError::ZeroPeriod);
        }

        let ticks = Arc::new(AtomicU64::new(0));
        let counter = ticks.clone();
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            // The first interval tick completes immediately; consume it so
            // every published tick sits one full period after the last.
            timer.tick().await;
            loop {
                tokio::select! {
                    _ = &mut cancel_rx => break,
                    _ = timer.tick() => {
                        let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
                        let report =
                            Report::new(ReportKind::Tick).with("count", Value::from(count as i64));
                        if let Err(e) = bus.publish(report).await {
                            debug!("Tick publication failed: {}", e);
                            break;
                        }
                    }
                }
            }
        });

        Ok(Self {
            cancel_tx,
            ticks,
            task,
        })
    }

    /// Ticks fired so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }

    /// Stops the timer and returns the number of ticks fired. Consuming
    /// the handle makes cancellation a once-only action.
    pub async fn cancel(self) -> u64 {
        let Ticker {
            cancel_tx,
            ticks,
            task,
        } = self;
        let _ = cancel_tx.send(());
        let _ = task.await;
        ticks.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_zero_period_is_rejected() {
        let bus = Arc::new(ReportBus::new(16));
        assert!(matches!(
            Ticker::start(bus, Duration::ZERO),
            Err(TickerError::ZeroPeriod)
        ));
    }

    #[tokio::test]
    async fn test_ticker_fires_about_once_per_period() {
        let bus = Arc::new(ReportBus::new(64));
        let ticker = Ticker::start(bus.clone(), Duration::from_millis(20)).unwrap();

        sleep(Duration::from_millis(110)).await;
        let ticks = ticker.cancel().await;

        // 110ms at a 20ms period, with one tick of scheduling tolerance.
        assert!((4..=6).contains(&ticks), "got {} ticks", ticks);
    }

    #[tokio::test]
    async fn test_ticks_are_published_as_reports() {
        let bus = Arc::new(ReportBus::new(64));
        let (mut report_rx, _) = bus.subscribe();
        let ticker = Ticker::start(bus.clone(), Duration::from_millis(10)).unwrap();

        let first = report_rx.recv().await.unwrap();
        assert_eq!(first.kind, ReportKind::Tick);
        assert_eq!(first.parameters.get("count"), Some(&Value::from(1)));

        ticker.cancel().await;
    }

    #[tokio::test]
    async fn test_cancel_stops_the_timer() {
        let bus = Arc::new(ReportBus::new(64));
        let ticker = Ticker::start(bus.clone(), Duration::from_millis(10)).unwrap();

        sleep(Duration::from_millis(35)).await;
        let ticks = ticker.cancel().await;

        let (mut report_rx, _) = bus.subscribe();
        sleep(Duration::from_millis(30)).await;
        // Nothing published after cancellation.
        assert!(report_rx.receiver.try_recv().is_err());
        assert!(ticks >= 1);
    }
}
