use thiserror::Error;

use crate::ir::{ParseError, VerifyError};
use crate::opt::PipelineError;

/// Any failure between reading IR text and printing the optimized result.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Verify(#[from] VerifyError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}
