//! The capability contract a loaded module bundle exposes.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;

use super::deferred::Deferred;
use super::types::{HostCallback, ModuleError, SharedRecord, Value};

/// The capability set the harness depends on: nine function-like
/// operations and one constructor-like operation.
///
/// Synchronous portions of an operation run to completion before the call
/// returns; deferred operations hand back a [`Deferred`] that settles
/// later. No operation is invoked concurrently with itself by the harness.
#[automock]
#[async_trait]
pub trait NativeModule: Send + Sync {
    fn name(&self) -> &str;

    /// May emit diagnostic output; guarantees nothing else.
    async fn hello(&self);

    /// Returns a primitive value deterministically.
    async fn produce_value(&self) -> Value;

    /// Returns a structured object.
    async fn produce_record(&self) -> Value;

    /// Accepts an arbitrary string, embedded quote characters included,
    /// without truncation or escaping alteration.
    async fn accept_text(&self, text: &str) -> Result<(), ModuleError>;

    /// Accepts an ordered sequence of strings of any length.
    async fn consume_list(&self, items: &[String]) -> Result<(), ModuleError>;

    /// Reads the record's numeric field without mutating it and may run
    /// its action a bounded number of times. Returns the numeric read.
    async fn inspect_record(&self, record: &SharedRecord) -> Result<f64, ModuleError>;

    /// Invokes the callback at least once with a module-chosen string and
    /// integer, synchronously or deferred.
    async fn invoke_callback(&self, callback: HostCallback) -> Result<(), ModuleError>;

    /// Returns a deferred that eventually fulfills or rejects.
    async fn produce_deferred(&self) -> Deferred<Value>;

    /// Returns a deferred fulfilling no earlier than `duration` elapsed,
    /// carrying a value.
    async fn wait(&self, duration: Duration) -> Deferred<Value>;

    /// Constructs an opaque instance owned by the module.
    async fn create_instance(&self) -> Result<Arc<dyn ModuleInstance>, ModuleError>;
}

/// Handle to module-owned state, manipulated only through its exposed
/// methods. Supports a human-readable string conversion via [`Display`].
///
/// [`Display`]: fmt::Display
#[async_trait]
pub trait ModuleInstance: Send + Sync + fmt::Display {
    fn id(&self) -> &str;

    fn label(&self) -> &str;

    /// Bumps the instance counter and returns the new count.
    async fn bump(&self) -> Result<Value, ModuleError>;

    /// Starts the periodic worker. The worker invokes the callback with
    /// the instance label and a monotonically increasing counter until
    /// [`stop`] is called. Starting a running worker is an error.
    ///
    /// [`stop`]: ModuleInstance::stop
    async fn start(&self, callback: HostCallback) -> Result<(), ModuleError>;

    /// Halts the periodic worker. Stopping a stopped worker is an error.
    async fn stop(&self) -> Result<(), ModuleError>;
}
