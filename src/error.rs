use thiserror::Error;

use crate::boundary::ModuleError;
use crate::harness::HarnessError;
use crate::report::ReportError;
use crate::ticker::TickerError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Module error: {0}")]
    Module(#[from] ModuleError),
    #[error("Report error: {0}")]
    Report(#[from] ReportError),
    #[error("Harness error: {0}")]
    Harness(#[from] HarnessError),
    #[error("Ticker error: {0}")]
    Ticker(#[from] TickerError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type GangwayResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
