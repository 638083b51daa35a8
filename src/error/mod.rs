//! # Engine Error System
//!
//! A unified error type for the migration engine with context chaining,
//! structured error codes, and a user/developer message split.
//!
//! Add `.context(...)` at effect boundaries: I/O, external calls (queue,
//! document store, model service), and layer transitions.
//!
//! ```
//! use migration_engine::error::{EngineError, ErrorExt};
//!
//! fn load(path: &str) -> Result<String, EngineError> {
//!     std::fs::read_to_string(path)
//!         .map_err(EngineError::from)
//!         .context("failed to read process checkpoint")
//! }
//! ```

use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

/// One entry in an error's context chain.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub message: String,
    pub location: Option<&'static str>,
}

/// The four-way error taxonomy from the failure-handling design: whether
/// a caller should ignore, retry, treat as blocking, or abort entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Ignorable,
    Retryable,
    Blocking,
    Critical,
}

/// The unified error type for the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("[E{code:04}] configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: Vec<ErrorContext>,
        error_source: Option<Arc<EngineError>>,
    },

    #[error("[E{code:04}] queue error: {message}")]
    Queue {
        code: u16,
        message: String,
        process_id: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: Vec<ErrorContext>,
        error_source: Option<Arc<EngineError>>,
    },

    #[error("[E{code:04}] telemetry store error: {message}")]
    Storage {
        code: u16,
        message: String,
        process_id: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: Vec<ErrorContext>,
        error_source: Option<Arc<EngineError>>,
    },

    #[error("[E{code:04}] executor error: {message}")]
    Execution {
        code: u16,
        message: String,
        task_name: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: Vec<ErrorContext>,
        error_source: Option<Arc<EngineError>>,
    },

    #[error("[E{code:04}] group-chat error: {message}")]
    GroupChat {
        code: u16,
        message: String,
        agent_name: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: Vec<ErrorContext>,
        error_source: Option<Arc<EngineError>>,
    },

    #[error("[E{code:04}] phase error: {message}")]
    Phase {
        code: u16,
        message: String,
        phase: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: Vec<ErrorContext>,
        error_source: Option<Arc<EngineError>>,
    },

    #[error("[E{code:04}] validation error: {message}")]
    Validation {
        code: u16,
        message: String,
        field: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: Vec<ErrorContext>,
        error_source: Option<Arc<EngineError>>,
    },

    #[error("[E{code:04}] {message}")]
    Other {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: Vec<ErrorContext>,
        error_source: Option<Arc<EngineError>>,
    },
}

macro_rules! for_each_variant {
    ($self:expr, $field:ident, $pat:pat => $body:expr) => {
        match $self {
            Self::Config { $field: $pat, .. }
            | Self::Queue { $field: $pat, .. }
            | Self::Storage { $field: $pat, .. }
            | Self::Execution { $field: $pat, .. }
            | Self::GroupChat { $field: $pat, .. }
            | Self::Phase { $field: $pat, .. }
            | Self::Validation { $field: $pat, .. }
            | Self::Other { $field: $pat, .. } => $body,
        }
    };
}

impl EngineError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            code: ErrorCode::CONFIG_GENERIC,
            message: message.into(),
            source: None,
            context: Vec::new(),
            error_source: None,
        }
    }

    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
            context: Vec::new(),
            error_source: None,
        }
    }

    pub fn queue(code: u16, message: impl Into<String>, process_id: Option<String>) -> Self {
        Self::Queue {
            code,
            message: message.into(),
            process_id,
            source: None,
            context: Vec::new(),
            error_source: None,
        }
    }

    pub fn storage(code: u16, message: impl Into<String>, process_id: Option<String>) -> Self {
        Self::Storage {
            code,
            message: message.into(),
            process_id,
            source: None,
            context: Vec::new(),
            error_source: None,
        }
    }

    pub fn execution(code: u16, message: impl Into<String>, task_name: Option<String>) -> Self {
        Self::Execution {
            code,
            message: message.into(),
            task_name,
            source: None,
            context: Vec::new(),
            error_source: None,
        }
    }

    pub fn group_chat(code: u16, message: impl Into<String>, agent_name: Option<String>) -> Self {
        Self::GroupChat {
            code,
            message: message.into(),
            agent_name,
            source: None,
            context: Vec::new(),
            error_source: None,
        }
    }

    pub fn phase(code: u16, message: impl Into<String>, phase: Option<String>) -> Self {
        Self::Phase {
            code,
            message: message.into(),
            phase,
            source: None,
            context: Vec::new(),
            error_source: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::VALIDATION_GENERIC,
            message: message.into(),
            field: None,
            source: None,
            context: Vec::new(),
            error_source: None,
        }
    }

    pub fn validation_with_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::VALIDATION_GENERIC,
            message: message.into(),
            field: Some(field.into()),
            source: None,
            context: Vec::new(),
            error_source: None,
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            code: ErrorCode::OTHER_GENERIC,
            message: message.into(),
            source: None,
            context: Vec::new(),
            error_source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        for_each_variant!(&mut self, source, src => *src = Some(source.into()));
        self
    }

    /// Append a context message (fluent, used at effect boundaries).
    pub fn context(mut self, message: impl Into<String>) -> Self {
        let ctx = ErrorContext {
            message: message.into(),
            location: None,
        };
        for_each_variant!(&mut self, context, context => context.push(ctx));
        self
    }

    pub fn with_error_source(mut self, source: EngineError) -> Self {
        for_each_variant!(&mut self, error_source, error_source => *error_source = Some(Arc::new(source)));
        self
    }

    pub fn chain(&self) -> &[ErrorContext] {
        for_each_variant!(self, context, context => context)
    }

    pub fn error_source(&self) -> Option<&EngineError> {
        for_each_variant!(self, error_source, error_source => error_source.as_deref())
    }

    pub fn code(&self) -> u16 {
        for_each_variant!(self, code, code => *code)
    }

    /// Category used by the dispatcher and state machine to branch on
    /// ignore/retry/block/abort without string-matching messages.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Queue { code, .. } if *code == ErrorCode::QUEUE_LEASE_FAILED => {
                ErrorCategory::Retryable
            }
            Self::Execution { code, .. }
                if *code == ErrorCode::EXEC_TIMEOUT || *code == ErrorCode::EXEC_TASK_FAILED =>
            {
                ErrorCategory::Retryable
            }
            Self::Phase { code, .. } if *code == ErrorCode::PHASE_BLOCKED => {
                ErrorCategory::Blocking
            }
            Self::Phase { code, .. } if *code == ErrorCode::PHASE_RETRY_EXHAUSTED => {
                ErrorCategory::Blocking
            }
            Self::Config { .. } => ErrorCategory::Critical,
            Self::Storage { code, .. } if *code == ErrorCode::STORAGE_BACKEND_ERROR => {
                ErrorCategory::Critical
            }
            Self::Storage { .. } => ErrorCategory::Ignorable,
            Self::GroupChat { code, .. } if *code == ErrorCode::GROUPCHAT_SELECTION_FAILED => {
                ErrorCategory::Ignorable
            }
            Self::GroupChat { .. } => ErrorCategory::Retryable,
            Self::Validation { .. } => ErrorCategory::Critical,
            Self::Execution { .. } => ErrorCategory::Retryable,
            Self::Queue { .. } => ErrorCategory::Blocking,
            Self::Phase { .. } => ErrorCategory::Critical,
            Self::Other { .. } => ErrorCategory::Critical,
        }
    }

    /// Exit code for the standalone CLI entry point.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Queue { .. } => 3,
            Self::Storage { .. } => 4,
            Self::Execution { .. } => 5,
            Self::GroupChat { .. } => 6,
            Self::Phase { .. } => 7,
            Self::Validation { .. } => 8,
            Self::Other { .. } => 1,
        }
    }

    fn variant_name(&self) -> &'static str {
        match self {
            Self::Config { .. } => "Config",
            Self::Queue { .. } => "Queue",
            Self::Storage { .. } => "Storage",
            Self::Execution { .. } => "Execution",
            Self::GroupChat { .. } => "GroupChat",
            Self::Phase { .. } => "Phase",
            Self::Validation { .. } => "Validation",
            Self::Other { .. } => "Other",
        }
    }

    /// Module-qualified stand-in for `type(error).__module__` when this
    /// error crosses into a failure-context record.
    pub fn exception_module(&self) -> String {
        format!("migration_engine::error::EngineError::{}", self.variant_name())
    }

    /// Stand-in for an exception's positional `args`; the numbered error
    /// code is the only structured identifier every variant carries.
    pub fn exception_args(&self) -> Vec<String> {
        vec![format!("code={}", self.code())]
    }

    /// The explicit `.with_error_source()` chain entry, if one was attached
    /// at an effect boundary. Mirrors Python's `__cause__`.
    pub fn exception_cause(&self) -> Option<String> {
        self.error_source().map(|err| err.to_string())
    }

    /// The `#[source]` field, if any. Mirrors Python's implicit `__context__`.
    pub fn exception_context(&self) -> Option<String> {
        std::error::Error::source(self).map(|err| err.to_string())
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, .. } => format!("Configuration problem: {message}"),
            Self::Queue {
                message,
                process_id,
                ..
            } => match process_id {
                Some(id) => format!("Queue error for process {id}: {message}"),
                None => format!("Queue error: {message}"),
            },
            Self::Storage {
                message,
                process_id,
                ..
            } => match process_id {
                Some(id) => format!("Telemetry error for process {id}: {message}"),
                None => format!("Telemetry error: {message}"),
            },
            Self::Execution {
                message, task_name, ..
            } => match task_name {
                Some(name) => format!("Task '{name}' failed: {message}"),
                None => format!("Executor error: {message}"),
            },
            Self::GroupChat {
                message, agent_name, ..
            } => match agent_name {
                Some(name) => format!("Agent '{name}' error: {message}"),
                None => format!("Group-chat error: {message}"),
            },
            Self::Phase { message, phase, .. } => match phase {
                Some(p) => format!("Phase '{p}' failed: {message}"),
                None => format!("Phase error: {message}"),
            },
            Self::Validation { message, field, .. } => match field {
                Some(f) => format!("Validation error for '{f}': {message}"),
                None => format!("Validation error: {message}"),
            },
            Self::Other { message, .. } => message.clone(),
        }
    }

    pub fn developer_message(&self) -> String {
        let mut msg = format!("{self:#}");
        let chain = self.chain();
        if !chain.is_empty() {
            msg.push_str("\n\nContext chain:");
            for (i, ctx) in chain.iter().enumerate() {
                msg.push_str(&format!("\n  {i}: {}", ctx.message));
                if let Some(loc) = ctx.location {
                    msg.push_str(&format!(" (at {loc})"));
                }
            }
        }
        if let Some(src) = self.error_source() {
            msg.push_str("\n\nCaused by:\n  ");
            msg.push_str(&src.developer_message());
        }
        msg
    }
}

/// Fluent context-chaining for `Result<T, EngineError>`.
pub trait ErrorExt<T> {
    fn context(self, message: impl Into<String> + Display) -> Result<T, EngineError>;
}

impl<T> ErrorExt<T> for Result<T, EngineError> {
    fn context(self, message: impl Into<String> + Display) -> Result<T, EngineError> {
        self.map_err(|e| e.context(message.to_string()))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::storage(ErrorCode::STORAGE_BACKEND_ERROR, err.to_string(), None)
            .with_source(err)
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::config_with_code(ErrorCode::CONFIG_INVALID_VALUE, "invalid JSON")
            .with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_chain_accumulates_in_order() {
        let err = EngineError::config("missing endpoint")
            .context("loading settings")
            .context("starting engine");
        let messages: Vec<_> = err.chain().iter().map(|c| c.message.as_str()).collect();
        assert_eq!(messages, vec!["loading settings", "starting engine"]);
    }

    #[test]
    fn phase_blocked_is_blocking_category() {
        let err = EngineError::phase(ErrorCode::PHASE_BLOCKED, "no source files", Some("analysis".into()));
        assert_eq!(err.category(), ErrorCategory::Blocking);
    }

    #[test]
    fn config_error_is_critical() {
        assert_eq!(EngineError::config("bad").category(), ErrorCategory::Critical);
    }
}
