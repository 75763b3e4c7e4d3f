//! Error types for accelerator session and dispatch operations.

use std::{fmt, time::Duration};

use thiserror::Error;

/// Which bounded wait expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadbackStage {
    Submission,
    Mapping(&'static str),
}

impl fmt::Display for ReadbackStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadbackStage::Submission => f.write_str("submission completion"),
            ReadbackStage::Mapping(buffer) => write!(f, "mapping of {buffer}"),
        }
    }
}

/// Errors that can occur while initializing or using the accelerator session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AcceleratorError {
    /// No compatible adapter or device could be acquired.
    #[error("no compatible accelerator available: {0}")]
    Unavailable(String),

    /// The expression kernel failed to build.
    #[error("kernel compilation failed: {0}")]
    KernelCompilation(String),

    /// Dispatch was attempted before `initialize` or after `shutdown`.
    #[error("accelerator session is not initialized")]
    NotInitialized,

    /// Command submission was rejected.
    #[error("dispatch failed: {0}")]
    Dispatch(String),

    /// A completion or mapping signal did not arrive within the bounded wait.
    #[error("timed out after {timeout:?} waiting for {stage}")]
    ReadbackTimeout {
        stage: ReadbackStage,
        timeout: Duration,
    },

    /// A result buffer could not be mapped or read.
    #[error("failed to map {buffer}: {reason}")]
    BufferMap {
        buffer: &'static str,
        reason: String,
    },
}
