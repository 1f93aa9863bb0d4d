//! # Report Bus
//!
//! The report bus is the observable channel of the harness: every boundary
//! observation is published as a [`Report`], and failures that are handled
//! rather than propagated travel on a separate error channel. The CLI
//! subscribes and renders reports to standard output; tests subscribe and
//! assert on them.
//!
//! The implementation is a broadcast-based publish/subscribe hub. Receivers
//! that fall behind resubscribe and surface the lag as an error instead of
//! silently losing their subscription.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::trace;

use crate::boundary::Value;

/// Discriminant for harness observations.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, strum::Display, strum::EnumString, Default, PartialOrd, Ord,
)]
pub enum ReportKind {
    #[default]
    RunStarted,
    ValueProduced,
    RecordProduced,
    TextAccepted,
    ListConsumed,
    RecordInspected,
    ActionFired,
    CallbackInvoked,
    DeferredSettled,
    Tick,
    DelayElapsed,
    InstanceCreated,
    RunFinished,
}

/// A single harness observation: a kind plus a payload of key-value pairs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Report {
    pub kind: ReportKind,
    pub parameters: HashMap<String, Value>,
}

impl Report {
    pub fn new(kind: ReportKind) -> Self {
        Self {
            kind,
            parameters: HashMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        // Sorted for a deterministic rendering.
        let mut keys: Vec<&String> = self.parameters.keys().collect();
        keys.sort();
        for key in keys {
            write!(f, " {}={}", key, self.parameters[key])?;
        }
        Ok(())
    }
}

/// Handled failure surfaced on the error channel instead of propagating.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ErrorReport {
    pub source: String,
    pub message: String,
    pub severity: ErrorSeverity,
}

#[derive(Debug, Clone, PartialEq, Default, strum::Display)]
pub enum ErrorSeverity {
    #[default]
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Error)]
pub enum ReportError {
    #[error("Report send failed: {message}")]
    SendFailed { message: String },
    #[error("Report receive failed: {message}")]
    ReceiveFailed { message: String },
    #[error("Receiver lagged, skipped {count} reports")]
    Lagged { count: u64 },
}

pub type ReportResult<T> = Result<T, ReportError>;

/// Broadcast hub carrying reports and error reports on separate channels.
///
/// Internal receivers keep both channels open while no subscriber is
/// attached, so publishing before the first subscribe does not fail.
pub struct ReportBus {
    report_sender: broadcast::Sender<Report>,
    error_sender: broadcast::Sender<ErrorReport>,
    capacity: usize,
    _internal_receiver: broadcast::Receiver<Report>,
    _internal_error_receiver: broadcast::Receiver<ErrorReport>,
}

impl ReportBus {
    pub fn new(capacity: usize) -> Self {
        let (report_sender, report_receiver) = broadcast::channel(capacity);
        let (error_sender, error_receiver) = broadcast::channel(capacity);
        Self {
            report_sender,
            error_sender,
            capacity,
            _internal_receiver: report_receiver,
            _internal_error_receiver: error_receiver,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscribe(&self) -> (ReportReceiver, ErrorReceiver) {
        let report_rx = self.report_sender.subscribe();
        let error_rx = self.error_sender.subscribe();
        (ReportReceiver::new(report_rx), ErrorReceiver::new(error_rx))
    }

    pub async fn publish(&self, report: Report) -> ReportResult<()> {
        trace!("Publishing report: {:?}", report);
        self.report_sender
            .send(report)
            .map_err(|e| ReportError::SendFailed {
                message: e.to_string(),
            })?;
        Ok(())
    }

    /// Publishes from a synchronous context without awaiting. Same
    /// behavior as the async version; callbacks crossing the boundary
    /// use this.
    pub fn sync_publish(&self, report: Report) -> ReportResult<()> {
        trace!("Sync publishing report: {:?}", report);
        self.report_sender
            .send(report)
            .map_err(|e| ReportError::SendFailed {
                message: e.to_string(),
            })?;
        Ok(())
    }

    pub async fn publish_error(&self, error: ErrorReport) -> ReportResult<()> {
        self.error_sender
            .send(error)
            .map_err(|e| ReportError::SendFailed {
                message: e.to_string(),
            })?;
        Ok(())
    }

    pub fn sync_publish_error(&self, error: ErrorReport) -> ReportResult<()> {
        self.error_sender
            .send(error)
            .map_err(|e| ReportError::SendFailed {
                message: e.to_string(),
            })?;
        Ok(())
    }
}

pub struct ReportReceiver {
    pub receiver: broadcast::Receiver<Report>,
}

impl ReportReceiver {
    fn new(receiver: broadcast::Receiver<Report>) -> Self {
        Self { receiver }
    }

    /// Receives the next report. On lag the receiver resubscribes and
    /// returns the lag as an error; callers should call `recv` again
    /// promptly.
    pub async fn recv(&mut self) -> ReportResult<Report> {
        match self.receiver.recv().await {
            Ok(report) => Ok(report),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                self.receiver = self.receiver.resubscribe();
                Err(ReportError::Lagged { count: n })
            }
            Err(e) => Err(ReportError::ReceiveFailed {
                message: e.to_string(),
            }),
        }
    }
}

pub struct ErrorReceiver {
    pub receiver: broadcast::Receiver<ErrorReport>,
}

impl ErrorReceiver {
    fn new(receiver: broadcast::Receiver<ErrorReport>) -> Self {
        Self { receiver }
    }

    pub async fn recv(&mut self) -> ReportResult<ErrorReport> {
        self.receiver
            .recv()
            .await
            .map_err(|e| ReportError::ReceiveFailed {
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_basic_publish_subscribe() {
        let bus = ReportBus::new(16);
        assert_eq!(bus.capacity(), 16);
        let (mut report_rx, _) = bus.subscribe();

        bus.publish(Report::new(ReportKind::ValueProduced).with("value", Value::from("v")))
            .await
            .unwrap();

        let received = report_rx.recv().await.unwrap();
        assert_eq!(received.kind, ReportKind::ValueProduced);
        assert_eq!(received.parameters.get("value"), Some(&Value::from("v")));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = ReportBus::new(16);
        let (mut rx1, _) = bus.subscribe();
        let (mut rx2, _) = bus.subscribe();

        bus.publish(Report::new(ReportKind::Tick)).await.unwrap();

        assert_eq!(rx1.recv().await.unwrap().kind, ReportKind::Tick);
        assert_eq!(rx2.recv().await.unwrap().kind, ReportKind::Tick);
    }

    #[tokio::test]
    async fn test_publish_without_subscriber_succeeds() {
        let bus = ReportBus::new(16);
        bus.publish(Report::new(ReportKind::RunStarted))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_error_channel() {
        let bus = ReportBus::new(16);
        let (_, mut error_rx) = bus.subscribe();

        bus.publish_error(ErrorReport {
            source: "produce_deferred".to_string(),
            message: "rejected".to_string(),
            severity: ErrorSeverity::Warning,
        })
        .await
        .unwrap();

        let received = error_rx.recv().await.unwrap();
        assert_eq!(received.source, "produce_deferred");
        assert_eq!(received.severity, ErrorSeverity::Warning);
    }

    #[tokio::test]
    async fn test_sync_publish_from_callback_context() {
        let bus = ReportBus::new(16);
        let (mut report_rx, _) = bus.subscribe();

        let publish = move |b: &ReportBus| {
            b.sync_publish(Report::new(ReportKind::CallbackInvoked).with("number", Value::from(7)))
                .unwrap();
        };
        publish(&bus);

        let received = report_rx.recv().await.unwrap();
        assert_eq!(received.kind, ReportKind::CallbackInvoked);
    }

    #[test]
    fn test_report_display_sorted_parameters() {
        let report = Report::new(ReportKind::DelayElapsed)
            .with("value", Value::from("done"))
            .with("elapsed", Value::Duration(std::time::Duration::from_millis(5000)));
        assert_eq!(report.to_string(), "DelayElapsed elapsed=5000ms value=done");
    }
}
