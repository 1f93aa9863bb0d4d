//! # Gangway: a native-module interop harness
//!
//! Gangway drives a fixed sequence of boundary operations against a loaded
//! native-module capability bundle and reports every observation on a
//! broadcast channel.
//!
//! ## Architecture
//!
//! - Boundary contract ([`boundary`]): the capability set a module
//!   exposes, covering value marshalling, callback invocation, deferred
//!   results, and opaque instance construction.
//! - Module layer ([`module`]): a named registry resolving capability
//!   bundles, plus the deterministic reference module.
//! - Harness ([`harness`]): the scripted driver. Issues every synchronous
//!   call in textual order, schedules the two deferred continuations, and
//!   owns the recurring ticker.
//! - Report bus ([`report`]): the observable channel. The CLI renders
//!   reports to standard output; tests subscribe and assert on them.
//! - Ticker ([`ticker`]): the recurring timer as a scoped resource with a
//!   consume-once cancel.
//!
//! ## Control flow
//!
//! ```text
//! load module → run scripted sequence → schedule continuations → Done
//!                                  └─ delay continuation cancels ticker
//! ```

pub mod boundary;
pub mod config;
pub mod error;
pub mod harness;
pub mod module;
pub mod report;
pub mod ticker;

// Re-exports
pub use boundary::*;
pub use error::*;
pub use report::*;

#[cfg(test)]
mod tests {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    #[ctor::ctor]
    fn init_tests() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .expect("Failed to set tracing subscriber");
    }
}
