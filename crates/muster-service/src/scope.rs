//! Scope resolution: maps `(event, scope, instance id)` mutation input onto
//! the concrete rows the mutation writes to.

use muster_core::error::{DomainError, DomainResult};
use muster_core::types::Scope;
use muster_db::db::connection::DbConnection;
use muster_db::db::query::instance;
use muster_db::model::event::Event;
use muster_db::model::instance::RecurringEventInstance;

use crate::error::ServiceResult;

/// Outcome of scope resolution.
///
/// `target_event_id` is the event row the mutation's series-level writes
/// attach to; `effective_instance` is the materialized instance for
/// instance-scoped writes and `None` for series-wide or standalone targets.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub target_event_id: uuid::Uuid,
    pub effective_instance: Option<RecurringEventInstance>,
}

/// Pure shape check on the scope arguments, before any row lookups.
///
/// # Errors
/// `invalid_arguments` with the path of the offending field:
/// - a scope supplied for a non-recurring event
/// - `THIS_INSTANCE_ONLY` without an instance id
/// - `ENTIRE_SERIES` with an instance id
pub fn validate_scope_arguments(
    event_is_recurring: bool,
    scope: Option<Scope>,
    instance_id: Option<uuid::Uuid>,
) -> DomainResult<()> {
    if !event_is_recurring {
        if scope.is_some() {
            return Err(DomainError::invalid(
                vec!["input", "scope"],
                "scope should only be provided for recurring events",
            ));
        }
        if instance_id.is_some() {
            return Err(DomainError::invalid(
                vec!["input", "recurringEventInstanceId"],
                "recurringEventInstanceId should only be provided for recurring events",
            ));
        }
        return Ok(());
    }

    // Recurring events default to series-wide when no scope is given.
    match scope.unwrap_or(Scope::EntireSeries) {
        Scope::ThisInstanceOnly => {
            if instance_id.is_none() {
                return Err(DomainError::invalid(
                    vec!["input", "recurringEventInstanceId"],
                    "recurringEventInstanceId is required for THIS_INSTANCE_ONLY scope",
                ));
            }
        }
        Scope::EntireSeries => {
            if instance_id.is_some() {
                return Err(DomainError::invalid(
                    vec!["input", "recurringEventInstanceId"],
                    "recurringEventInstanceId should not be provided for ENTIRE_SERIES scope",
                ));
            }
        }
    }
    Ok(())
}

/// ## Summary
/// Resolves the mutation target for an event and optional scope.
///
/// For `THIS_INSTANCE_ONLY` the referenced instance is loaded and checked to
/// belong to the event's series; its id becomes the effective target of
/// instance-level writes. For `ENTIRE_SERIES` and standalone events the
/// event row itself is the target.
///
/// ## Errors
/// - `invalid_arguments` on a shape violation (see
///   [`validate_scope_arguments`])
/// - `arguments_associated_resources_not_found` when the instance id does not
///   exist
/// - `invalid_arguments` when the instance belongs to a different series
#[tracing::instrument(skip(conn, event), fields(event_id = %event.id))]
pub async fn resolve_target(
    conn: &mut DbConnection<'_>,
    event: &Event,
    scope: Option<Scope>,
    instance_id: Option<uuid::Uuid>,
) -> ServiceResult<ResolvedTarget> {
    validate_scope_arguments(event.is_recurring_template, scope, instance_id)?;

    let Some(instance_id) = instance_id else {
        return Ok(ResolvedTarget {
            target_event_id: event.id,
            effective_instance: None,
        });
    };

    let found = instance::get_instance(conn, instance_id)
        .await?
        .ok_or_else(|| DomainError::not_found(vec!["input", "recurringEventInstanceId"]))?;

    if found.base_recurring_event_id != event.id {
        return Err(DomainError::invalid(
            vec!["input", "recurringEventInstanceId"],
            "The specified instance does not belong to the specified event",
        )
        .into());
    }

    Ok(ResolvedTarget {
        target_event_id: event.id,
        effective_instance: Some(found),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_issue_path(err: &DomainError) -> Vec<&'static str> {
        match err {
            DomainError::InvalidArguments { issues } => issues[0].argument_path.clone(),
            _ => panic!("expected invalid_arguments, got {err:?}"),
        }
    }

    #[test_log::test]
    fn standalone_event_accepts_no_scope() {
        assert!(validate_scope_arguments(false, None, None).is_ok());
    }

    #[test_log::test]
    fn standalone_event_rejects_scope() {
        let err = validate_scope_arguments(false, Some(Scope::EntireSeries), None).unwrap_err();
        assert_eq!(first_issue_path(&err), vec!["input", "scope"]);
    }

    #[test_log::test]
    fn standalone_event_rejects_instance_id() {
        let err =
            validate_scope_arguments(false, None, Some(uuid::Uuid::new_v4())).unwrap_err();
        assert_eq!(
            first_issue_path(&err),
            vec!["input", "recurringEventInstanceId"]
        );
    }

    #[test_log::test]
    fn instance_scope_requires_instance_id() {
        let err =
            validate_scope_arguments(true, Some(Scope::ThisInstanceOnly), None).unwrap_err();
        assert_eq!(
            first_issue_path(&err),
            vec!["input", "recurringEventInstanceId"]
        );
    }

    #[test_log::test]
    fn series_scope_rejects_instance_id() {
        let err = validate_scope_arguments(
            true,
            Some(Scope::EntireSeries),
            Some(uuid::Uuid::new_v4()),
        )
        .unwrap_err();
        assert_eq!(
            first_issue_path(&err),
            vec!["input", "recurringEventInstanceId"]
        );
    }

    #[test_log::test]
    fn recurring_event_defaults_to_series_scope() {
        assert!(validate_scope_arguments(true, None, None).is_ok());
        // The default still rejects a stray instance id.
        assert!(validate_scope_arguments(true, None, Some(uuid::Uuid::new_v4())).is_err());
    }

    #[test_log::test]
    fn instance_scope_with_id_is_valid() {
        assert!(validate_scope_arguments(
            true,
            Some(Scope::ThisInstanceOnly),
            Some(uuid::Uuid::new_v4())
        )
        .is_ok());
    }
}
