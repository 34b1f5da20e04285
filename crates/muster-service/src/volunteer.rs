//! Volunteer assignment mutations: scope-aware enrollment and per-instance
//! removal.

use diesel_async::AsyncConnection;
use diesel_async::scoped_futures::ScopedFutureExt;

use muster_core::error::DomainError;
use muster_core::types::Scope;
use muster_db::db::connection::DbConnection;
use muster_db::db::enums::MembershipStatus;
use muster_db::db::query::{actor as actor_query, event, membership, volunteer};
use muster_db::model::membership::{NewVolunteerMembership, VolunteerMembership};
use muster_db::model::volunteer::{EventVolunteer, NewEventVolunteerException};

use crate::auth::{self, Actor};
use crate::error::{ServiceError, ServiceResult};
use crate::scope;

/// Input for enrolling one user as a volunteer.
#[derive(Debug, Clone)]
pub struct CreateVolunteerInput {
    pub event_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub status: MembershipStatus,
    pub scope: Option<Scope>,
    pub recurring_event_instance_id: Option<uuid::Uuid>,
}

fn membership_row(
    volunteer_id: uuid::Uuid,
    event_id: uuid::Uuid,
    status: MembershipStatus,
    created_by: uuid::Uuid,
) -> NewVolunteerMembership {
    NewVolunteerMembership {
        volunteer_id,
        group_id: None,
        event_id,
        status,
        created_by,
    }
}

/// ## Summary
/// Enrolls a user as a volunteer for an event, series-wide or for a single
/// occurrence.
///
/// The volunteer row is always keyed to the event (template) and reused on
/// repeated enrollment; an existing ungrouped membership at the same target
/// is reused too, so calling this twice never duplicates rows. The
/// membership records the caller-supplied status and the effective target:
/// the instance id for `THIS_INSTANCE_ONLY`, the event id otherwise.
/// Series-wide enrollment also re-includes the volunteer at instances a
/// previous removal had excluded.
///
/// ## Errors
/// - `unauthenticated` / `unauthorized_action` from the gates
/// - `arguments_associated_resources_not_found` at `input.eventId` or
///   `input.userId`
/// - `invalid_arguments` on scope shape violations
#[tracing::instrument(skip(conn, actor, input), fields(event_id = %input.event_id, user_id = %input.user_id))]
pub async fn create_volunteer_membership(
    conn: &mut DbConnection<'_>,
    actor: &Actor,
    input: &CreateVolunteerInput,
) -> ServiceResult<(EventVolunteer, VolunteerMembership)> {
    let target_event = event::get_event(conn, input.event_id)
        .await?
        .ok_or_else(|| DomainError::not_found(vec!["input", "eventId"]))?;

    auth::require_event_author(conn, actor, &target_event).await?;

    if actor_query::get_user(conn, input.user_id).await?.is_none() {
        return Err(DomainError::not_found(vec!["input", "userId"]).into());
    }

    let resolved = scope::resolve_target(
        conn,
        &target_event,
        input.scope,
        input.recurring_event_instance_id,
    )
    .await?;

    let membership_event_id = resolved
        .effective_instance
        .as_ref()
        .map_or(resolved.target_event_id, |instance| instance.id);
    let series_wide =
        target_event.is_recurring_template && resolved.effective_instance.is_none();

    let actor_id = actor.user_id;
    let user_id = input.user_id;
    let event_id = target_event.id;
    let status = input.status;

    let (volunteer_row, enrollment) = conn
        .transaction::<_, ServiceError, _>(move |tx| {
            async move {
                let volunteer_row =
                    volunteer::find_or_create(tx, event_id, user_id, actor_id).await?;

                if series_wide {
                    volunteer::include_for_all_instances(tx, volunteer_row.id, actor_id).await?;
                }

                if let Some(existing) =
                    membership::get_ungrouped_for_target(tx, volunteer_row.id, membership_event_id)
                        .await?
                {
                    tracing::debug!(membership_id = %existing.id, "Reusing existing membership");
                    return Ok((volunteer_row, existing));
                }

                let enrollment = membership::create_membership(
                    tx,
                    &membership_row(volunteer_row.id, membership_event_id, status, actor_id),
                )
                .await?;

                Ok((volunteer_row, enrollment))
            }
            .scope_boxed()
        })
        .await?;

    tracing::info!(volunteer_id = %volunteer_row.id, membership_id = %enrollment.id, "Volunteer enrolled");
    Ok((volunteer_row, enrollment))
}

/// ## Summary
/// Removes a volunteer from one occurrence of a recurring series.
///
/// The series-level assignment is untouched; removal writes an exclusion row
/// (`is_excluded = true`) for the `(volunteer, instance)` pair. Calling it
/// again is a no-op at the data level. Returns the volunteer row.
///
/// ## Errors
/// - `unauthenticated` / `unauthorized_action` from the gates
/// - `arguments_associated_resources_not_found` at `input.volunteerId` or
///   `input.recurringEventInstanceId`
/// - `invalid_arguments` when the instance belongs to a different event than
///   the volunteer
#[tracing::instrument(skip(conn, actor))]
pub async fn delete_event_volunteer_for_instance(
    conn: &mut DbConnection<'_>,
    actor: &Actor,
    volunteer_id: uuid::Uuid,
    recurring_event_instance_id: uuid::Uuid,
) -> ServiceResult<EventVolunteer> {
    let volunteer_row = volunteer::get_volunteer(conn, volunteer_id)
        .await?
        .ok_or_else(|| DomainError::not_found(vec!["input", "volunteerId"]))?;

    let target_event = event::get_event(conn, volunteer_row.event_id)
        .await?
        .ok_or(DomainError::Unexpected("volunteer has no event"))?;

    auth::require_event_author(conn, actor, &target_event).await?;

    let instance_row =
        muster_db::db::query::instance::get_instance(conn, recurring_event_instance_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found(vec!["input", "recurringEventInstanceId"])
            })?;

    if instance_row.base_recurring_event_id != volunteer_row.event_id {
        return Err(DomainError::invalid(
            vec!["input", "recurringEventInstanceId"],
            "The specified instance does not belong to the volunteer's event",
        )
        .into());
    }

    volunteer::upsert_exclusion(
        conn,
        &NewEventVolunteerException {
            volunteer_id: volunteer_row.id,
            recurring_event_instance_id: instance_row.id,
            is_excluded: true,
            created_by: actor.user_id,
        },
        actor.user_id,
    )
    .await?;

    tracing::info!(volunteer_id = %volunteer_row.id, instance_id = %instance_row.id, "Volunteer excluded from instance");
    Ok(volunteer_row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn membership_carries_the_requested_status() {
        let volunteer_id = uuid::Uuid::new_v4();
        let target_id = uuid::Uuid::new_v4();
        let actor_id = uuid::Uuid::new_v4();

        let row = membership_row(volunteer_id, target_id, MembershipStatus::Accepted, actor_id);
        assert_eq!(row.status, MembershipStatus::Accepted);
        assert_eq!(row.volunteer_id, volunteer_id);
        assert_eq!(row.event_id, target_id);
        assert_eq!(row.created_by, actor_id);
    }

    #[test_log::test]
    fn direct_enrollment_is_never_grouped() {
        let row = membership_row(
            uuid::Uuid::new_v4(),
            uuid::Uuid::new_v4(),
            MembershipStatus::Requested,
            uuid::Uuid::new_v4(),
        );
        assert_eq!(row.group_id, None);
    }
}
