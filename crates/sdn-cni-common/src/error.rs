//! Unified error types for the sdn-cni workspace.
//!
//! Every failure the plugin can hit is expressed as a [`CniError`]. The
//! invocation layer maps each variant onto the numeric error codes that
//! container runtimes expect from a network plugin.

use std::path::PathBuf;

use thiserror::Error;

/// CNI error code for an unsupported `cniVersion`.
pub const CODE_INCOMPATIBLE_VERSION: u32 = 1;
/// CNI error code for missing or malformed `CNI_*` environment variables.
pub const CODE_INVALID_ENVIRONMENT: u32 = 4;
/// CNI error code for I/O failures.
pub const CODE_IO_FAILURE: u32 = 5;
/// CNI error code for content that could not be decoded.
pub const CODE_DECODING_FAILURE: u32 = 6;
/// CNI error code for an invalid network configuration.
pub const CODE_INVALID_NETWORK_CONFIG: u32 = 7;
/// Generic plugin failure.
pub const CODE_PLUGIN_FAILURE: u32 = 100;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CniError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required `CNI_*` variable is missing or malformed.
    #[error("invalid environment: {message}")]
    InvalidEnvironment {
        /// Description of the problem.
        message: String,
    },

    /// Input bytes could not be decoded.
    #[error("failed to decode {what}: {message}")]
    Decode {
        /// What was being decoded.
        what: &'static str,
        /// Decoder diagnostic, including the offending input where useful.
        message: String,
    },

    /// The requested result version is not one this plugin speaks.
    #[error("incompatible CNI version {version} (supported: {supported})")]
    IncompatibleVersion {
        /// The requested version.
        version: String,
        /// Comma-separated list of supported versions.
        supported: String,
    },

    /// The request could not be delivered or its response could not be read.
    #[error("failed to send CNI request: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("CNI request failed with status {status}: '{body}'")]
    ServerStatus {
        /// HTTP status code returned by the server.
        status: u16,
        /// Response body, kept verbatim for diagnostics.
        body: String,
    },

    /// A result could not be converted between schema versions.
    #[error("cannot convert result: {message}")]
    Conversion {
        /// Description of the conversion failure.
        message: String,
    },

    /// Entering or leaving a network namespace failed.
    #[error("network namespace {path}: {source}")]
    Namespace {
        /// Namespace file path.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// A kernel network operation failed.
    #[error("failed to {operation}: {message}")]
    Kernel {
        /// Operation that failed, phrased as a verb clause.
        operation: String,
        /// Diagnostic output of the failing primitive.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl CniError {
    /// Returns the CNI error code reported to the invoking runtime.
    pub const fn code(&self) -> u32 {
        match self {
            Self::IncompatibleVersion { .. } => CODE_INCOMPATIBLE_VERSION,
            Self::InvalidEnvironment { .. } => CODE_INVALID_ENVIRONMENT,
            Self::Io { .. } => CODE_IO_FAILURE,
            Self::Decode { .. } | Self::Serialization { .. } => CODE_DECODING_FAILURE,
            Self::Config { .. } => CODE_INVALID_NETWORK_CONFIG,
            Self::Transport { .. }
            | Self::ServerStatus { .. }
            | Self::Conversion { .. }
            | Self::Namespace { .. }
            | Self::Kernel { .. } => CODE_PLUGIN_FAILURE,
        }
    }

    /// Wraps a kernel-operation failure.
    pub fn kernel(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::Kernel {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CniError>;
