//! Error types for `degenscore`
//!
//! One `thiserror` enum per concern, aggregated by [`DegenScoreError`],
//! which also maps every failure to a process exit code.

use std::path::PathBuf;
use thiserror::Error;

use crate::flow::Stage;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `degenscore` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Sequencer misuse (start while running, invalid timing)
    pub const SEQUENCER_ERROR: i32 = 5;

    /// Flow error (stage locked, corrupt stored context)
    pub const FLOW_ERROR: i32 = 6;

    /// External connector error (provider unavailable, connection rejected)
    pub const CONNECT_ERROR: i32 = 7;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `degenscore` operations.
#[derive(Debug, Error)]
pub enum DegenScoreError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Sequencer misuse
    #[error(transparent)]
    Sequencer(#[from] SequencerError),

    /// Flow gating or storage error
    #[error(transparent)]
    Flow(#[from] FlowError),

    /// External connector error
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DegenScoreError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => ExitCode::CONFIG_ERROR,
            Self::Sequencer(_) => ExitCode::SEQUENCER_ERROR,
            Self::Flow(_) | Self::Json(_) => ExitCode::FLOW_ERROR,
            Self::Connect(_) => ExitCode::CONNECT_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}")]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// Environment variable referenced in configuration is not set
    #[error("environment variable '{var}' not set ({message})")]
    EnvVarNotSet {
        /// Name of the environment variable
        var: String,
        /// Message supplied with `${VAR:?message}`
        message: String,
    },
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "stages[2].target_score")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Prevents the configuration from being used
    Error,
    /// Informational, loading continues
    Warning,
}

// ============================================================================
// Sequencer Errors
// ============================================================================

/// Errors raised when a sequencer run cannot be started.
///
/// A running sequence itself never fails; these cover caller misuse only.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SequencerError {
    /// `start` was called while a previous run is still active
    #[error("sequence {run_id} is already running")]
    AlreadyRunning {
        /// Identifier of the run that is still active
        run_id: u64,
    },

    /// The run configuration cannot be scheduled
    #[error("invalid sequence configuration: {0}")]
    InvalidConfig(String),
}

// ============================================================================
// Flow Errors
// ============================================================================

/// Errors from stage gating and host storage.
#[derive(Debug, Error)]
pub enum FlowError {
    /// A stage was mounted before the stage it depends on was connected
    #[error("{stage} is locked until {requires} is connected")]
    PrerequisiteMissing {
        /// Stage that was requested
        stage: Stage,
        /// Stage the caller should redirect to
        requires: Stage,
    },

    /// The requested stage is not part of the configured flow
    #[error("stage {0} is not configured")]
    UnknownStage(Stage),

    /// Host storage could not be read or written
    #[error("storage error: {0}")]
    Storage(String),

    /// A stored value could not be decoded
    #[error("corrupt stored value for '{key}': {message}")]
    CorruptState {
        /// Storage key
        key: String,
        /// Decoder message
        message: String,
    },

    /// The sequence ended without reaching `Done` (cancelled or stalled)
    #[error("{0} sequence ended before completion")]
    Interrupted(Stage),

    /// The scorecard was requested before every stage was connected
    #[error("flow incomplete: connect {missing} first")]
    Incomplete {
        /// First stage still to connect
        missing: Stage,
    },
}

// ============================================================================
// Connector Errors
// ============================================================================

/// Errors from the external connector.
///
/// Neither variant is retried automatically; the user must re-trigger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// The requested provider capability is not offered by the environment
    #[error("{}", unavailable_message(.provider, .suggestion.as_deref()))]
    ConnectorUnavailable {
        /// Provider that was requested
        provider: String,
        /// Closest offered provider, if any is similar
        suggestion: Option<String>,
    },

    /// The connector call failed or the user rejected it
    #[error("connection to '{provider}' rejected: {reason}")]
    ConnectionRejected {
        /// Provider that was called
        provider: String,
        /// Reason reported by the connector
        reason: String,
    },
}

fn unavailable_message(provider: &str, suggestion: Option<&str>) -> String {
    suggestion.map_or_else(
        || format!("connector '{provider}' is not available"),
        |s| format!("connector '{provider}' is not available (did you mean '{s}'?)"),
    )
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `degenscore` operations.
pub type Result<T> = std::result::Result<T, DegenScoreError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::SUCCESS, 0);
        assert_eq!(ExitCode::CONFIG_ERROR, 2);
        assert_eq!(ExitCode::IO_ERROR, 3);
        assert_eq!(ExitCode::SEQUENCER_ERROR, 5);
        assert_eq!(ExitCode::FLOW_ERROR, 6);
        assert_eq!(ExitCode::CONNECT_ERROR, 7);
        assert_eq!(ExitCode::INTERRUPTED, 130);
        assert_eq!(ExitCode::TERMINATED, 143);
    }

    #[test]
    fn test_sequencer_error_exit_code() {
        let err: DegenScoreError = SequencerError::AlreadyRunning { run_id: 1 }.into();
        assert_eq!(err.exit_code(), ExitCode::SEQUENCER_ERROR);
    }

    #[test]
    fn test_config_error_exit_code() {
        let err: DegenScoreError = ConfigError::MissingFile {
            path: PathBuf::from("/test"),
        }
        .into();
        assert_eq!(err.exit_code(), ExitCode::CONFIG_ERROR);
    }

    #[test]
    fn test_flow_error_exit_code() {
        let err: DegenScoreError = FlowError::PrerequisiteMissing {
            stage: Stage::Wallet,
            requires: Stage::Telegram,
        }
        .into();
        assert_eq!(err.exit_code(), ExitCode::FLOW_ERROR);
        assert_eq!(
            err.to_string(),
            "wallet is locked until telegram is connected"
        );
    }

    #[test]
    fn test_connect_error_exit_code() {
        let err: DegenScoreError = ConnectError::ConnectionRejected {
            provider: "metamask".to_string(),
            reason: "user closed the prompt".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), ExitCode::CONNECT_ERROR);
    }

    #[test]
    fn test_io_error_exit_code() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: DegenScoreError = io_err.into();
        assert_eq!(err.exit_code(), ExitCode::IO_ERROR);
    }

    #[test]
    fn test_unavailable_with_suggestion() {
        let err = ConnectError::ConnectorUnavailable {
            provider: "metamsk".to_string(),
            suggestion: Some("metamask".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "connector 'metamsk' is not available (did you mean 'metamask'?)"
        );
    }

    #[test]
    fn test_unavailable_without_suggestion() {
        let err = ConnectError::ConnectorUnavailable {
            provider: "ledger".to_string(),
            suggestion: None,
        };
        assert_eq!(err.to_string(), "connector 'ledger' is not available");
    }

    #[test]
    fn test_validation_issue_display() {
        let issue = ValidationIssue {
            path: "stages[0].steps".to_string(),
            message: "at least one step is required".to_string(),
            severity: Severity::Error,
        };
        assert_eq!(
            issue.to_string(),
            "error: at least one step is required at stages[0].steps"
        );
    }

    #[test]
    fn test_validation_issue_warning_display() {
        let issue = ValidationIssue {
            path: "timing.completion_delay".to_string(),
            message: "delay is zero".to_string(),
            severity: Severity::Warning,
        };
        assert_eq!(
            issue.to_string(),
            "warning: delay is zero at timing.completion_delay"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::ParseError {
            path: PathBuf::from("flow.yaml"),
            line: Some(7),
            message: "unexpected token".to_string(),
        };
        assert!(err.to_string().contains("flow.yaml"));
        assert!(err.to_string().contains("unexpected token"));
    }
}
