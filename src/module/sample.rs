//! Deterministic reference implementation of the boundary contract.
//!
//! Used by the binary as the default capability bundle and by tests as the
//! conforming module. Every behavior is fixed: the callback fires exactly
//! once with a known pair, the deferred settles with a known string, the
//! delay fulfills after at least the requested duration.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::boundary::{
    Deferred, HostCallback, ModuleError, ModuleInstance, NativeModule, SharedRecord, Value,
};

pub const SAMPLE_MODULE_NAME: &str = "sample";

const GREETING_VALUE: &str = "greetings from the sample module";
const DEFERRED_VALUE: &str = "ready";
const DELAYED_VALUE: &str = "delayed value from the sample module";
const CHECK_IN_TEXT: &str = "the sample module checking in";
const CHECK_IN_NUMBER: i64 = 42;

const INSTANCE_LABEL: &str = "sample-instance";
const WORKER_PERIOD: Duration = Duration::from_millis(1000);

pub struct SampleModule {
    reject_deferred: bool,
    received_text: RwLock<Option<String>>,
    consumed_items: AtomicU64,
}

impl SampleModule {
    pub fn new() -> Self {
        Self {
            reject_deferred: false,
            received_text: RwLock::new(None),
            consumed_items: AtomicU64::new(0),
        }
    }

    /// A module whose deferred rejects, for exercising the rejection path.
    pub fn rejecting() -> Self {
        Self {
            reject_deferred: true,
            ..Self::new()
        }
    }

    /// The last text handed to `accept_text`, verbatim.
    pub async fn received_text(&self) -> Option<String> {
        self.received_text.read().await.clone()
    }

    /// Total items handed to `consume_list` so far.
    pub fn consumed_items(&self) -> u64 {
        self.consumed_items.load(Ordering::SeqCst)
    }
}

impl Default for SampleModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NativeModule for SampleModule {
    fn name(&self) -> &str {
        SAMPLE_MODULE_NAME
    }

    async fn hello(&self) {
        info!("The sample module says hello");
    }

    async fn produce_value(&self) -> Value {
        Value::from(GREETING_VALUE)
    }

    async fn produce_record(&self) -> Value {
        let mut map = HashMap::new();
        map.insert("name".to_string(), Value::from(SAMPLE_MODULE_NAME));
        map.insert(
            "version".to_string(),
            Value::from(env!("CARGO_PKG_VERSION")),
        );
        Value::Map(map)
    }

    async fn accept_text(&self, text: &str) -> Result<(), ModuleError> {
        debug!("Text accepted ({} bytes)", text.len());
        *self.received_text.write().await = Some(text.to_string());
        Ok(())
    }

    async fn consume_list(&self, items: &[String]) -> Result<(), ModuleError> {
        for item in items {
            debug!("Consuming item: {}", item);
        }
        self.consumed_items
            .fetch_add(items.len() as u64, Ordering::SeqCst);
        Ok(())
    }

    async fn inspect_record(&self, record: &SharedRecord) -> Result<f64, ModuleError> {
        (record.action)();
        Ok(record.magnitude)
    }

    async fn invoke_callback(&self, callback: HostCallback) -> Result<(), ModuleError> {
        callback(CHECK_IN_TEXT, CHECK_IN_NUMBER);
        Ok(())
    }

    async fn produce_deferred(&self) -> Deferred<Value> {
        if self.reject_deferred {
            Deferred::rejected(ModuleError::Operation {
                operation: "produce_deferred",
                message: "rejection requested".to_string(),
            })
        } else {
            Deferred::fulfilled(Value::from(DEFERRED_VALUE))
        }
    }

    async fn wait(&self, duration: Duration) -> Deferred<Value> {
        let (settler, deferred) = Deferred::pending();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            settler.fulfill(Value::from(DELAYED_VALUE));
        });
        deferred
    }

    async fn create_instance(&self) -> Result<Arc<dyn ModuleInstance>, ModuleError> {
        Ok(Arc::new(SampleInstance::new(INSTANCE_LABEL, WORKER_PERIOD)))
    }
}

/// Module-owned state behind the opaque instance handle: a label, a bump
/// counter, and an optional periodic worker.
pub struct SampleInstance {
    id: String,
    label: String,
    counter: AtomicU64,
    worker_running: Arc<AtomicBool>,
    worker_handle: Mutex<Option<JoinHandle<()>>>,
    worker_period: Duration,
}

impl SampleInstance {
    pub fn new(label: &str, worker_period: Duration) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            label: label.to_string(),
            counter: AtomicU64::new(0),
            worker_running: Arc::new(AtomicBool::new(false)),
            worker_handle: Mutex::new(None),
            worker_period,
        }
    }

    pub fn count(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

impl fmt::Display for SampleInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.label, &self.id[..8])
    }
}

#[async_trait]
impl ModuleInstance for SampleInstance {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    async fn bump(&self) -> Result<Value, ModuleError> {
        let count = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Value::Integer(count as i64))
    }

    async fn start(&self, callback: HostCallback) -> Result<(), ModuleError> {
        if self.worker_period.is_zero() {
            return Err(ModuleError::Operation {
                operation: "start",
                message: "worker period must be greater than 0".to_string(),
            });
        }
        if self.worker_running.swap(true, Ordering::SeqCst) {
            return Err(ModuleError::Operation {
                operation: "start",
                message: "worker already running".to_string(),
            });
        }

        debug!("Worker started: {}", self.label);
        let running = self.worker_running.clone();
        let label = self.label.clone();
        let period = self.worker_period;
        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            // The first interval tick completes immediately.
            timer.tick().await;
            let mut count: i64 = 0;
            while running.load(Ordering::SeqCst) {
                timer.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                count += 1;
                callback(&label, count);
            }
        });
        *self.worker_handle.lock().await = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ModuleError> {
        if !self.worker_running.swap(false, Ordering::SeqCst) {
            return Err(ModuleError::Operation {
                operation: "stop",
                message: "worker not running".to_string(),
            });
        }
        if let Some(handle) = self.worker_handle.lock().await.take() {
            handle.abort();
        }
        debug!("Worker stopped: {}", self.label);
        Ok(())
    }
}
