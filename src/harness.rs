//! The interop harness: drives the scripted sequence of boundary
//! operations against an injected module and publishes every observation
//! on the report bus.
//!
//! Control flow is linear. Synchronous calls are issued in exact textual
//! order; the two deferred continuations are scheduled as tasks on the
//! same cooperative executor. The harness transitions `Running → Done`
//! once everything synchronous has been issued and both continuations are
//! scheduled, then stays alive until the delay continuation fires and
//! cancels the ticker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::boundary::{HostCallback, NativeModule, Settlement, SharedRecord, Value};
use crate::config::HarnessConfig;
use crate::error::GangwayResult;
use crate::report::{ErrorReport, ErrorSeverity, Report, ReportBus, ReportKind};
use crate::ticker::Ticker;

/// Numeric field of the record probe.
const RECORD_MAGNITUDE: f64 = std::f64::consts::PI;

#[derive(Debug, Clone, PartialEq, strum::Display, Default)]
pub enum HarnessState {
    #[default]
    Running,
    Done,
}

#[derive(Debug, Clone, Error)]
pub enum HarnessError {
    #[error("Continuation failed: {message}")]
    ContinuationFailed { message: String },
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Branch the handled deferred settled on.
    pub deferred_settlement: Settlement,
    pub delay_value: Value,
    pub delay_elapsed: Duration,
    /// Ticks fired before the delay continuation cancelled the ticker.
    pub ticks: u64,
    pub instance_rendering: String,
    pub instance_count: Value,
}

pub struct Harness {
    module: Arc<dyn NativeModule>,
    bus: Arc<ReportBus>,
    config: HarnessConfig,
    state: RwLock<HarnessState>,
}

impl Harness {
    pub fn new(module: Arc<dyn NativeModule>, bus: Arc<ReportBus>, config: HarnessConfig) -> Self {
        Self {
            module,
            bus,
            config,
            state: RwLock::new(HarnessState::Running),
        }
    }

    pub async fn state(&self) -> HarnessState {
        self.state.read().await.clone()
    }

    async fn set_state(&self, state: HarnessState) {
        *self.state.write().await = state;
    }

    /// Runs the full scripted sequence. Returns once both continuations
    /// have completed and the ticker is cancelled.
    pub async fn run(&self) -> GangwayResult<RunSummary> {
        let started_at = Utc::now();
        debug!("Harness run starting against module: {}", self.module.name());
        self.bus.publish(Report::new(ReportKind::RunStarted)).await?;

        self.module.hello().await;

        let value = self.module.produce_value().await;
        self.bus
            .publish(Report::new(ReportKind::ValueProduced).with("value", value))
            .await?;

        let record = self.module.produce_record().await;
        self.bus
            .publish(Report::new(ReportKind::RecordProduced).with("record", record))
            .await?;

        self.module.accept_text(&self.config.probe_text).await?;
        self.bus
            .publish(
                Report::new(ReportKind::TextAccepted)
                    .with("text", Value::from(self.config.probe_text.as_str())),
            )
            .await?;

        self.module.consume_list(&self.config.probe_list).await?;
        self.bus
            .publish(
                Report::new(ReportKind::ListConsumed)
                    .with("count", Value::from(self.config.probe_list.len() as i64)),
            )
            .await?;

        let action_bus = self.bus.clone();
        let probe = SharedRecord::new(
            RECORD_MAGNITUDE,
            Arc::new(move || {
                let _ = action_bus.sync_publish(Report::new(ReportKind::ActionFired));
            }),
        );
        let magnitude = self.module.inspect_record(&probe).await?;
        self.bus
            .publish(Report::new(ReportKind::RecordInspected).with("magnitude", Value::from(magnitude)))
            .await?;

        let callback_bus = self.bus.clone();
        let callback: HostCallback = Arc::new(move |text, number| {
            let _ = callback_bus.sync_publish(
                Report::new(ReportKind::CallbackInvoked)
                    .with("text", Value::from(text))
                    .with("number", Value::from(number)),
            );
        });
        self.module.invoke_callback(callback).await?;

        // The one handled rejection path: log it, never rethrow.
        let deferred = self.module.produce_deferred().await;
        let settle_bus = self.bus.clone();
        let reject_bus = self.bus.clone();
        let deferred_task = tokio::spawn(async move {
            deferred
                .observe(
                    move |value| {
                        let _ = settle_bus
                            .sync_publish(Report::new(ReportKind::DeferredSettled).with("value", value));
                    },
                    move |error| {
                        let _ = reject_bus.sync_publish_error(ErrorReport {
                            source: "produce_deferred".to_string(),
                            message: error.to_string(),
                            severity: ErrorSeverity::Warning,
                        });
                    },
                )
                .await
        });

        let ticker = Ticker::start(self.bus.clone(), self.config.tick_period)?;
        let delay = self.module.wait(self.config.wait_duration).await;
        let delay_bus = self.bus.clone();
        let delay_started = Instant::now();
        let delay_task = tokio::spawn(async move {
            let outcome = delay.settled().await;
            let elapsed = delay_started.elapsed();
            // Cancellation is tied to the continuation's completion path,
            // settled or not.
            let ticks = ticker.cancel().await;
            let value = outcome?;
            let _ = delay_bus.sync_publish(
                Report::new(ReportKind::DelayElapsed)
                    .with("elapsed", Value::Duration(elapsed))
                    .with("value", value.clone())
                    .with("ticks", Value::from(ticks as i64)),
            );
            Ok::<(Duration, Value, u64), crate::boundary::ModuleError>((elapsed, value, ticks))
        });

        let instance = self.module.create_instance().await?;
        let instance_count = instance.bump().await?;
        let instance_rendering = instance.to_string();
        self.bus
            .publish(
                Report::new(ReportKind::InstanceCreated)
                    .with("instance", Value::from(instance_rendering.as_str()))
                    .with("count", instance_count.clone()),
            )
            .await?;

        // Everything synchronous issued, both continuations scheduled.
        self.set_state(HarnessState::Done).await;

        let deferred_settlement =
            deferred_task
                .await
                .map_err(|e| HarnessError::ContinuationFailed {
                    message: e.to_string(),
                })?;
        let (delay_elapsed, delay_value, ticks) =
            delay_task
                .await
                .map_err(|e| HarnessError::ContinuationFailed {
                    message: e.to_string(),
                })??;

        self.bus
            .publish(Report::new(ReportKind::RunFinished))
            .await?;

        Ok(RunSummary {
            started_at,
            finished_at: Utc::now(),
            deferred_settlement,
            delay_value,
            delay_elapsed,
            ticks,
            instance_rendering,
            instance_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{Deferred, MockNativeModule, ModuleInstance};
    use crate::module::sample::{SampleInstance, SampleModule};
    use mockall::Sequence;
    use std::collections::HashMap;

    fn fast_config() -> HarnessConfig {
        HarnessConfig {
            tick_period: Duration::from_millis(10),
            wait_duration: Duration::from_millis(40),
            ..HarnessConfig::default()
        }
    }

    #[tokio::test]
    async fn test_run_issues_operations_in_textual_order() {
        let mut module = MockNativeModule::new();
        let mut seq = Sequence::new();

        module.expect_name().return_const("mock".to_string());
        module
            .expect_hello()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| ());
        module
            .expect_produce_value()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Value::from("v"));
        module
            .expect_produce_record()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Value::Map(HashMap::new()));
        module
            .expect_accept_text()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|text| text.contains("Double quote"))
            .returning(|_| Ok(()));
        module
            .expect_consume_list()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|items| items.len() == 4)
            .returning(|_| Ok(()));
        module
            .expect_inspect_record()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|record| Ok(record.magnitude));
        module
            .expect_invoke_callback()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|callback| {
                callback("mock", 1);
                Ok(())
            });
        module
            .expect_produce_deferred()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Deferred::fulfilled(Value::Null));
        module
            .expect_wait()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|duration| *duration == Duration::from_millis(40))
            .returning(|_| Deferred::fulfilled(Value::from("w")));
        module
            .expect_create_instance()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| {
                Ok(Arc::new(SampleInstance::new("mock-instance", Duration::from_millis(10)))
                    as Arc<dyn ModuleInstance>)
            });

        let bus = Arc::new(ReportBus::new(64));
        let harness = Harness::new(Arc::new(module), bus, fast_config());

        let summary = harness.run().await.unwrap();
        assert_eq!(summary.deferred_settlement, Settlement::Fulfilled);
        assert_eq!(summary.delay_value, Value::from("w"));
    }

    #[tokio::test]
    async fn test_run_transitions_to_done() {
        let bus = Arc::new(ReportBus::new(64));
        let harness = Harness::new(Arc::new(SampleModule::new()), bus, fast_config());

        assert_eq!(harness.state().await, HarnessState::Running);
        harness.run().await.unwrap();
        assert_eq!(harness.state().await, HarnessState::Done);
    }

    #[tokio::test]
    async fn test_rejected_deferred_is_logged_not_propagated() {
        let bus = Arc::new(ReportBus::new(64));
        let (_, mut error_rx) = bus.subscribe();
        let harness = Harness::new(Arc::new(SampleModule::rejecting()), bus, fast_config());

        let summary = harness.run().await.unwrap();

        assert_eq!(summary.deferred_settlement, Settlement::Rejected);
        let report = error_rx.recv().await.unwrap();
        assert_eq!(report.source, "produce_deferred");
        assert_eq!(report.severity, ErrorSeverity::Warning);
    }

    #[tokio::test]
    async fn test_delay_continuation_cancels_ticker() {
        let bus = Arc::new(ReportBus::new(256));
        let harness = Harness::new(Arc::new(SampleModule::new()), bus, fast_config());

        let summary = harness.run().await.unwrap();

        // 40ms delay at a 10ms tick period, one tick of tolerance.
        assert!(
            (3..=5).contains(&summary.ticks),
            "got {} ticks",
            summary.ticks
        );
        assert!(summary.delay_elapsed >= Duration::from_millis(40));
    }
}
