use thiserror::Error;

/// Core error type with minimal dependencies
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(&'static str),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Path to the input argument an error is attributed to, e.g. `["input", "id"]`.
pub type ArgumentPath = Vec<&'static str>;

/// A single field-level problem inside an `invalid_arguments` error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentIssue {
    pub argument_path: ArgumentPath,
    pub message: String,
}

impl ArgumentIssue {
    #[must_use]
    pub fn new(argument_path: ArgumentPath, message: impl Into<String>) -> Self {
        Self {
            argument_path,
            message: message.into(),
        }
    }
}

/// Domain error taxonomy shared by every mutation in the system.
///
/// Each variant maps to a stable machine-readable code (see [`DomainError::code`])
/// and carries the argument path of the offending input where one exists, so
/// callers can highlight the exact field.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("unauthorized action")]
    UnauthorizedAction,

    #[error("unauthorized action on resources associated to {}", join_path(argument_path))]
    UnauthorizedActionOnArguments { argument_path: ArgumentPath },

    #[error("invalid arguments: {}", issues.first().map_or("", |issue| issue.message.as_str()))]
    InvalidArguments { issues: Vec<ArgumentIssue> },

    #[error("resources associated to {} not found", join_path(argument_path))]
    ResourcesNotFound { argument_path: ArgumentPath },

    #[error("unexpected: {0}")]
    Unexpected(&'static str),
}

fn join_path(path: &[&'static str]) -> String {
    path.join(".")
}

impl DomainError {
    /// Machine-readable error kind, stable across releases.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::UnauthorizedAction => "unauthorized_action",
            Self::UnauthorizedActionOnArguments { .. } => {
                "unauthorized_action_on_arguments_associated_resources"
            }
            Self::InvalidArguments { .. } => "invalid_arguments",
            Self::ResourcesNotFound { .. } => "arguments_associated_resources_not_found",
            Self::Unexpected(_) => "unexpected",
        }
    }

    /// Single-issue `invalid_arguments` constructor.
    #[must_use]
    pub fn invalid(argument_path: ArgumentPath, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            issues: vec![ArgumentIssue::new(argument_path, message)],
        }
    }

    /// `arguments_associated_resources_not_found` constructor.
    #[must_use]
    pub fn not_found(argument_path: ArgumentPath) -> Self {
        Self::ResourcesNotFound { argument_path }
    }

    /// Argument-scoped authorization failure constructor.
    #[must_use]
    pub fn unauthorized_on(argument_path: ArgumentPath) -> Self {
        Self::UnauthorizedActionOnArguments { argument_path }
    }
}

pub type DomainResult<T> = std::result::Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn codes_are_stable() {
        assert_eq!(DomainError::Unauthenticated.code(), "unauthenticated");
        assert_eq!(DomainError::UnauthorizedAction.code(), "unauthorized_action");
        assert_eq!(
            DomainError::unauthorized_on(vec!["input", "id"]).code(),
            "unauthorized_action_on_arguments_associated_resources"
        );
        assert_eq!(
            DomainError::invalid(vec!["input", "scope"], "bad scope").code(),
            "invalid_arguments"
        );
        assert_eq!(
            DomainError::not_found(vec!["input", "eventId"]).code(),
            "arguments_associated_resources_not_found"
        );
        assert_eq!(
            DomainError::Unexpected("zero rows").code(),
            "unexpected"
        );
    }

    #[test_log::test]
    fn display_includes_argument_path() {
        let err = DomainError::not_found(vec!["input", "recurringEventInstanceId"]);
        assert_eq!(
            err.to_string(),
            "resources associated to input.recurringEventInstanceId not found"
        );
    }

    #[test_log::test]
    fn display_includes_first_issue_message() {
        let err = DomainError::invalid(vec!["input", "endAt"], "End time must be after start time");
        assert_eq!(
            err.to_string(),
            "invalid arguments: End time must be after start time"
        );
    }
}
