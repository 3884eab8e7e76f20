use std::fmt;

use crate::form::DecodeError;

/// Navigation signal raised by business logic for the enclosing framework.
///
/// Signals are never converted into a response envelope; the dispatcher hands
/// them back to the caller untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlFlow {
    #[error("{kind} redirect to {location}")]
    Redirect {
        location: String,
        kind: RedirectKind,
    },

    #[error("not found")]
    NotFound,
}

/// How a redirect should be issued by the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedirectKind {
    /// 303, the usual answer to a form POST.
    #[default]
    SeeOther,
    /// 307.
    Temporary,
    /// 308.
    Permanent,
}

impl fmt::Display for RedirectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RedirectKind::SeeOther => "see_other",
            RedirectKind::Temporary => "temporary",
            RedirectKind::Permanent => "permanent",
        };
        f.write_str(label)
    }
}

/// Failure raised by an action's business function.
///
/// The set is closed: the dispatcher matches on the variant to decide whether
/// to propagate, show the message, or mask and report.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// A framework navigation signal. Propagated unchanged.
    #[error(transparent)]
    Signal(#[from] ControlFlow),

    /// An expected failure whose message is safe to show verbatim.
    #[error("{0}")]
    Business(String),

    /// Anything else. Reported, then masked behind a generic message.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// Convenience type alias for business function return values.
pub type ActionResult<T> = Result<T, ActionError>;

impl ActionError {
    pub fn business(message: impl Into<String>) -> Self {
        ActionError::Business(message.into())
    }

    /// See-other redirect to `location`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::redirect_with(location, RedirectKind::SeeOther)
    }

    pub fn redirect_with(location: impl Into<String>, kind: RedirectKind) -> Self {
        ActionError::Signal(ControlFlow::Redirect {
            location: location.into(),
            kind,
        })
    }

    pub fn not_found() -> Self {
        ActionError::Signal(ControlFlow::NotFound)
    }

    /// Wrap any error as unexpected.
    pub fn unexpected<E>(error: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        ActionError::Unexpected(error.into())
    }

    pub fn is_control_flow(&self) -> bool {
        matches!(self, ActionError::Signal(_))
    }

    pub fn is_business(&self) -> bool {
        matches!(self, ActionError::Business(_))
    }

    /// Short label used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            ActionError::Signal(ControlFlow::Redirect { .. }) => "redirect",
            ActionError::Signal(ControlFlow::NotFound) => "not_found",
            ActionError::Business(_) => "business",
            ActionError::Unexpected(_) => "unexpected",
        }
    }
}

impl From<DecodeError> for ActionError {
    fn from(err: DecodeError) -> Self {
        ActionError::Unexpected(err.into())
    }
}
