//! Volunteer group mutations: scope-aware group creation with member
//! enrollment, and per-instance group removal.

use diesel_async::AsyncConnection;
use diesel_async::scoped_futures::ScopedFutureExt;

use muster_core::error::DomainError;
use muster_core::types::Scope;
use muster_db::db::connection::DbConnection;
use muster_db::db::enums::MembershipStatus;
use muster_db::db::query::{actor as actor_query, event, membership, volunteer, volunteer_group};
use muster_db::model::membership::NewVolunteerMembership;
use muster_db::model::volunteer_group::{
    EventVolunteerGroup, NewEventVolunteerGroup, NewEventVolunteerGroupException,
};

use crate::auth::{self, Actor};
use crate::error::{ServiceError, ServiceResult};
use crate::scope;

/// Input for creating (or extending) a volunteer group.
#[derive(Debug, Clone)]
pub struct CreateVolunteerGroupInput {
    pub event_id: uuid::Uuid,
    pub name: String,
    pub leader_id: uuid::Uuid,
    pub description: Option<String>,
    pub volunteers_required: Option<i32>,
    pub volunteer_user_ids: Vec<uuid::Uuid>,
    pub scope: Option<Scope>,
    pub recurring_event_instance_id: Option<uuid::Uuid>,
}

/// ## Summary
/// Creates a volunteer group for an event and enrolls its initial members.
///
/// Groups are unique per `(event, name)`: a second creation with the same
/// name reuses the existing group and only adds the new members. Each listed
/// user gets a volunteer row (reused when present) and a membership at
/// status `invited` pointing at the group and the scope's effective target.
///
/// Scope shapes the group's availability rows: `ENTIRE_SERIES` re-includes
/// the group at every instance a previous removal excluded;
/// `THIS_INSTANCE_ONLY` records an inclusion row for just that instance.
///
/// ## Errors
/// - `unauthenticated` / `unauthorized_action` from the gates
/// - `arguments_associated_resources_not_found` at `input.eventId`,
///   `input.leaderId` or `input.volunteerUserIds`
/// - `invalid_arguments` on scope shape violations or an empty name
#[expect(clippy::too_many_lines)]
#[tracing::instrument(skip(conn, actor, input), fields(event_id = %input.event_id, name = %input.name))]
pub async fn create_event_volunteer_group(
    conn: &mut DbConnection<'_>,
    actor: &Actor,
    input: &CreateVolunteerGroupInput,
) -> ServiceResult<EventVolunteerGroup> {
    if input.name.trim().is_empty() {
        return Err(DomainError::invalid(
            vec!["input", "name"],
            "Group name must not be empty.",
        )
        .into());
    }

    let target_event = event::get_event(conn, input.event_id)
        .await?
        .ok_or_else(|| DomainError::not_found(vec!["input", "eventId"]))?;

    auth::require_event_author(conn, actor, &target_event).await?;

    if actor_query::get_user(conn, input.leader_id).await?.is_none() {
        return Err(DomainError::not_found(vec!["input", "leaderId"]).into());
    }
    for user_id in &input.volunteer_user_ids {
        if actor_query::get_user(conn, *user_id).await?.is_none() {
            tracing::debug!(%user_id, "Listed volunteer user does not exist");
            return Err(DomainError::not_found(vec!["input", "volunteerUserIds"]).into());
        }
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
    let instance_id = resolved.effective_instance.as_ref().map(|row| row.id);
    let series_wide = target_event.is_recurring_template && instance_id.is_none();

    let actor_id = actor.user_id;
    let event_id = target_event.id;
    let volunteer_user_ids = input.volunteer_user_ids.clone();
    let new_group = NewEventVolunteerGroup {
        event_id,
        leader_id: input.leader_id,
        creator_id: actor_id,
        name: input.name.clone(),
        description: input.description.clone(),
        volunteers_required: input.volunteers_required,
    };
    let group_name = input.name.clone();

    let group = conn
        .transaction::<_, ServiceError, _>(move |tx| {
            async move {
                let group = if let Some(existing) =
                    volunteer_group::get_by_event_and_name(tx, event_id, &group_name).await?
                {
                    tracing::debug!(group_id = %existing.id, "Reusing existing group");
                    existing
                } else {
                    volunteer_group::create_group(tx, &new_group).await?
                };

                let mut memberships = Vec::with_capacity(volunteer_user_ids.len());
                for user_id in volunteer_user_ids {
                    let volunteer_row =
                        volunteer::find_or_create(tx, event_id, user_id, actor_id).await?;
                    if membership::get_for_volunteer_and_group(tx, volunteer_row.id, group.id)
                        .await?
                        .is_none()
                    {
                        memberships.push(NewVolunteerMembership {
                            volunteer_id: volunteer_row.id,
                            group_id: Some(group.id),
                            event_id: membership_event_id,
                            status: MembershipStatus::Invited,
                            created_by: actor_id,
                        });
                    }
                }
                membership::create_memberships(tx, &memberships).await?;

                if series_wide {
                    volunteer_group::include_for_all_instances(tx, group.id, actor_id).await?;
                } else if let Some(instance_id) = instance_id {
                    volunteer_group::upsert_exclusion(
                        tx,
                        &NewEventVolunteerGroupException {
                            volunteer_group_id: group.id,
                            recurring_event_instance_id: instance_id,
                            is_excluded: false,
                            created_by: actor_id,
                        },
                        actor_id,
                    )
                    .await?;
                }

                Ok(group)
            }
            .scope_boxed()
        })
        .await?;

    tracing::info!(group_id = %group.id, "Volunteer group ready");
    Ok(group)
}

/// ## Summary
/// Removes a volunteer group from one occurrence of a recurring series.
///
/// Mirrors the single-volunteer removal: the group and its memberships stay,
/// an exclusion row marks the group unavailable at that instance. Returns
/// the group row.
///
/// ## Errors
/// - `unauthenticated` / `unauthorized_action` from the gates
/// - `arguments_associated_resources_not_found` at `input.groupId` or
///   `input.recurringEventInstanceId`
/// - `invalid_arguments` when the instance belongs to a different event
#[tracing::instrument(skip(conn, actor))]
pub async fn delete_event_volunteer_group_for_instance(
    conn: &mut DbConnection<'_>,
    actor: &Actor,
    group_id: uuid::Uuid,
    recurring_event_instance_id: uuid::Uuid,
) -> ServiceResult<EventVolunteerGroup> {
    let group = volunteer_group::get_group(conn, group_id)
        .await?
        .ok_or_else(|| DomainError::not_found(vec!["input", "groupId"]))?;

    let target_event = event::get_event(conn, group.event_id)
        .await?
        .ok_or(DomainError::Unexpected("volunteer group has no event"))?;

    auth::require_event_author(conn, actor, &target_event).await?;

    let instance_row =
        muster_db::db::query::instance::get_instance(conn, recurring_event_instance_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found(vec!["input", "recurringEventInstanceId"])
            })?;

    if instance_row.base_recurring_event_id != group.event_id {
        return Err(DomainError::invalid(
            vec!["input", "recurringEventInstanceId"],
            "The specified instance does not belong to the group's event",
        )
        .into());
    }

    volunteer_group::upsert_exclusion(
        conn,
        &NewEventVolunteerGroupException {
            volunteer_group_id: group.id,
            recurring_event_instance_id: instance_row.id,
            is_excluded: true,
            created_by: actor.user_id,
        },
        actor.user_id,
    )
    .await?;

    tracing::info!(group_id = %group.id, instance_id = %instance_row.id, "Group excluded from instance");
    Ok(group)
}
