pub mod deferred;
pub mod module;
pub mod types;

pub use deferred::{Deferred, Settlement, Settler};
pub use module::{MockNativeModule, ModuleInstance, NativeModule};
pub use types::{HostCallback, ModuleError, RecordAction, SharedRecord, Value};
