use thiserror::Error;

use crate::code::CodeId;

/// Errors raised while configuring or running an acquisition
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// Sample buffer does not hold a whole number of code periods
    #[error("sample buffer has {got} samples, expected {expected}")]
    BufferLength { expected: usize, got: usize },

    /// Coherent integration depth out of range
    #[error("chip window {chip_window} must be in 1..={num_periods}")]
    ChipWindow {
        chip_window: usize,
        num_periods: usize,
    },

    #[error("sample rate {got} Hz does not match configured {expected} Hz")]
    SampleRateMismatch { expected: f64, got: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reference code length differs from the samples per code period
    #[error("prn {prn}: reference code has {got} samples, expected {expected}")]
    CodeLength {
        prn: CodeId,
        expected: usize,
        got: usize,
    },

    #[error("prn {prn}: invalid reference code: {reason}")]
    InvalidCode { prn: CodeId, reason: String },

    #[error("prn {0} not present in code table")]
    UnknownCode(CodeId),

    #[error("short read: wanted {expected} samples, got {got}")]
    ShortRead { expected: usize, got: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AcquisitionError {
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::BufferLength { .. }
                | Self::ChipWindow { .. }
                | Self::SampleRateMismatch { .. }
                | Self::InvalidConfig(_)
        )
    }

    pub fn is_input(&self) -> bool {
        matches!(
            self,
            Self::CodeLength { .. }
                | Self::InvalidCode { .. }
                | Self::UnknownCode(_)
                | Self::ShortRead { .. }
        )
    }

    /// Identifier the error is attached to, if it is a per-code failure.
    pub fn prn(&self) -> Option<CodeId> {
        match self {
            Self::CodeLength { prn, .. } | Self::InvalidCode { prn, .. } => Some(*prn),
            Self::UnknownCode(prn) => Some(*prn),
            _ => None,
        }
    }
}
