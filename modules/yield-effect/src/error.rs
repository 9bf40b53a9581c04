//! Typed errors for effect creation, processing and task settlement.

use serde_json::Value;
use thiserror::Error;

use crate::task::TaskId;

/// Errors produced while building, interpreting or awaiting effects.
///
/// Cloneable so a single task failure can be observed by every handle that
/// joins it. Compared structurally: a joined task rejects with an error equal
/// to the one the task failed with.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EffectError {
    /// An effect creator was handed a malformed argument. Raised at the call
    /// site, never delivered into a coroutine.
    #[error("invalid effect argument: {0}")]
    InvalidEffectArgument(String),

    /// A yielded descriptor has no registered processor. Fatal to the task.
    #[error("no processor registered for effect kind `{0}`")]
    UnknownEffectKind(String),

    /// Failure raised by user code: a called function, a processor, or a
    /// coroutine body.
    #[error("{message}")]
    Failure { message: String, detail: Value },

    /// The task was terminated before it settled.
    #[error("{0} was terminated before it settled")]
    Terminated(TaskId),

    /// The task's driver went away without settling it.
    #[error("{0} was abandoned before it settled")]
    Abandoned(TaskId),
}

impl EffectError {
    /// A failure carrying only a message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
            detail: Value::Null,
        }
    }

    /// A failure carrying a message and structured detail.
    pub fn failure_with(message: impl Into<String>, detail: Value) -> Self {
        Self::Failure {
            message: message.into(),
            detail,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidEffectArgument(message.into())
    }

    /// Whether this error was produced by early termination.
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }
}

/// Result type alias for effect operations.
pub type EffectResult<T> = std::result::Result<T, EffectError>;
