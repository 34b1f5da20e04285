use thiserror::Error;

use muster_core::error::{ArgumentPath, DomainError};

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    DomainError(#[from] DomainError),

    #[error(transparent)]
    DatabaseError(#[from] muster_db::error::DbError),

    #[error(transparent)]
    CoreError(#[from] muster_core::error::CoreError),

    #[error("Diesel error: {0}")]
    DieselError(#[from] diesel::result::Error),
}

impl ServiceError {
    /// Collapses the error onto the domain taxonomy for transport.
    ///
    /// Shorthand for [`ServiceError::into_domain_at`] with the whole `input`
    /// as the conflict path, for callers whose operation has no single
    /// identifying argument.
    #[must_use]
    pub fn into_domain(self) -> DomainError {
        self.into_domain_at(vec!["input"])
    }

    /// Collapses the error onto the domain taxonomy for transport.
    ///
    /// Version conflicts surface as `invalid_arguments` at `conflict_path`,
    /// the argument that named the contested row in the failing operation, so
    /// the caller retries with fresh state. Everything else non-domain is
    /// `unexpected`.
    #[must_use]
    pub fn into_domain_at(self, conflict_path: ArgumentPath) -> DomainError {
        match self {
            Self::DomainError(err) => err,
            Self::DatabaseError(muster_db::error::DbError::VersionConflict { .. }) => {
                DomainError::invalid(
                    conflict_path,
                    "The instance was modified concurrently; retry with current data.",
                )
            }
            Self::DatabaseError(_) | Self::CoreError(_) | Self::DieselError(_) => {
                DomainError::Unexpected("internal error")
            }
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn version_conflict() -> ServiceError {
        ServiceError::DatabaseError(muster_db::error::DbError::VersionConflict {
            id: uuid::Uuid::new_v4(),
            expected: 3,
        })
    }

    #[test_log::test]
    fn version_conflict_maps_to_invalid_arguments() {
        assert_eq!(version_conflict().into_domain().code(), "invalid_arguments");
    }

    #[test_log::test]
    fn version_conflict_is_attributed_to_the_callers_path() {
        let mapped = version_conflict().into_domain_at(vec!["input", "id"]);
        let DomainError::InvalidArguments { issues } = mapped else {
            panic!("expected invalid_arguments");
        };
        assert_eq!(issues[0].argument_path, vec!["input", "id"]);
    }

    #[test_log::test]
    fn default_conflict_path_is_the_whole_input() {
        let DomainError::InvalidArguments { issues } = version_conflict().into_domain() else {
            panic!("expected invalid_arguments");
        };
        assert_eq!(issues[0].argument_path, vec!["input"]);
    }

    #[test_log::test]
    fn domain_errors_pass_through() {
        let err = ServiceError::DomainError(DomainError::Unauthenticated);
        assert_eq!(err.into_domain().code(), "unauthenticated");
    }

    #[test_log::test]
    fn other_errors_collapse_to_unexpected() {
        let err = ServiceError::DieselError(diesel::result::Error::NotFound);
        assert_eq!(err.into_domain().code(), "unexpected");
    }
}
