// Domain errors - Error taxonomy shared by builders, executor and toolkits

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Category of a domain failure, independent of its message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    UnreadableAsset,
    UnsupportedFormat,
    EmptyAssetSet,
    InvalidParameter,
    IncompatibleAssets,
    OutputNotProduced,
    NativeOperationFailed,
    SessionBusy,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::UnreadableAsset => "unreadable asset",
            ErrorKind::UnsupportedFormat => "unsupported format",
            ErrorKind::EmptyAssetSet => "empty asset set",
            ErrorKind::InvalidParameter => "invalid parameter",
            ErrorKind::IncompatibleAssets => "incompatible assets",
            ErrorKind::OutputNotProduced => "output not produced",
            ErrorKind::NativeOperationFailed => "native operation failed",
            ErrorKind::SessionBusy => "session busy",
        };
        f.write_str(name)
    }
}

/// Domain-specific error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Handle could not be opened or demuxed
    #[error("Unreadable asset: {0}")]
    UnreadableAsset(String),
    /// No recognizable codec in the asset
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    /// Operation was given no assets
    #[error("Empty asset set: {0}")]
    EmptyAssetSet(String),
    /// Out-of-range position, dimension or other setting
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Assets cannot be combined without re-encoding
    #[error("Incompatible assets: {0}")]
    IncompatibleAssets(String),
    /// Toolkit reported success but the output is not readable
    #[error("Output not produced: {0}")]
    OutputNotProduced(String),
    /// Opaque failure reported by the native toolkit
    #[error("Native operation failed: {0}")]
    NativeOperationFailed(String),
    /// An interactive launch is already outstanding
    #[error("Session busy: {0}")]
    SessionBusy(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::UnreadableAsset(_) => ErrorKind::UnreadableAsset,
            DomainError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            DomainError::EmptyAssetSet(_) => ErrorKind::EmptyAssetSet,
            DomainError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            DomainError::IncompatibleAssets(_) => ErrorKind::IncompatibleAssets,
            DomainError::OutputNotProduced(_) => ErrorKind::OutputNotProduced,
            DomainError::NativeOperationFailed(_) => ErrorKind::NativeOperationFailed,
            DomainError::SessionBusy(_) => ErrorKind::SessionBusy,
        }
    }

    /// Message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            DomainError::UnreadableAsset(msg)
            | DomainError::UnsupportedFormat(msg)
            | DomainError::EmptyAssetSet(msg)
            | DomainError::InvalidParameter(msg)
            | DomainError::IncompatibleAssets(msg)
            | DomainError::OutputNotProduced(msg)
            | DomainError::NativeOperationFailed(msg)
            | DomainError::SessionBusy(msg) => msg,
        }
    }

    /// Rebuild an error from its kind and message
    pub fn from_parts(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::UnreadableAsset => DomainError::UnreadableAsset(message),
            ErrorKind::UnsupportedFormat => DomainError::UnsupportedFormat(message),
            ErrorKind::EmptyAssetSet => DomainError::EmptyAssetSet(message),
            ErrorKind::InvalidParameter => DomainError::InvalidParameter(message),
            ErrorKind::IncompatibleAssets => DomainError::IncompatibleAssets(message),
            ErrorKind::OutputNotProduced => DomainError::OutputNotProduced(message),
            ErrorKind::NativeOperationFailed => DomainError::NativeOperationFailed(message),
            ErrorKind::SessionBusy => DomainError::SessionBusy(message),
        }
    }

    /// Collapse anything the toolkit should not report at runtime into a native failure
    pub fn into_runtime(self) -> Self {
        match self {
            DomainError::UnreadableAsset(_)
            | DomainError::UnsupportedFormat(_)
            | DomainError::OutputNotProduced(_)
            | DomainError::NativeOperationFailed(_) => self,
            other => DomainError::NativeOperationFailed(other.to_string()),
        }
    }
}
