//! Event volunteer group rows and their instance-scoped exclusion overrides.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::{event_volunteer_group, event_volunteer_group_exception};
use crate::error::DbResult;
use crate::model::volunteer_group::{
    EventVolunteerGroup, EventVolunteerGroupException, NewEventVolunteerGroup,
    NewEventVolunteerGroupException,
};

/// ## Summary
/// Returns a query to find a volunteer group by ID.
#[must_use]
pub fn by_id(id: uuid::Uuid) -> event_volunteer_group::BoxedQuery<'static, diesel::pg::Pg> {
    event_volunteer_group::table
        .filter(event_volunteer_group::id.eq(id))
        .into_boxed()
}

/// ## Summary
/// Returns a query to find a group by its `(event, name)` pair.
#[must_use]
pub fn for_event_and_name(
    event_id: uuid::Uuid,
    name: &str,
) -> event_volunteer_group::BoxedQuery<'_, diesel::pg::Pg> {
    event_volunteer_group::table
        .filter(event_volunteer_group::event_id.eq(event_id))
        .filter(event_volunteer_group::name.eq(name))
        .into_boxed()
}

/// ## Summary
/// Fetches a volunteer group by ID.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn get_group(
    conn: &mut DbConnection<'_>,
    id: uuid::Uuid,
) -> DbResult<Option<EventVolunteerGroup>> {
    let found = by_id(id)
        .select(EventVolunteerGroup::as_select())
        .first(conn)
        .await
        .optional()?;
    Ok(found)
}

/// ## Summary
/// Fetches the group named `name` for an event, if any.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn get_by_event_and_name(
    conn: &mut DbConnection<'_>,
    event_id: uuid::Uuid,
    name: &str,
) -> DbResult<Option<EventVolunteerGroup>> {
    let found = for_event_and_name(event_id, name)
        .select(EventVolunteerGroup::as_select())
        .first(conn)
        .await
        .optional()?;
    Ok(found)
}

/// ## Summary
/// Creates a volunteer group row.
///
/// ## Errors
/// Returns a database error if the insert fails.
#[tracing::instrument(skip(conn, new), fields(event_id = %new.event_id, name = %new.name))]
pub async fn create_group(
    conn: &mut DbConnection<'_>,
    new: &NewEventVolunteerGroup,
) -> DbResult<EventVolunteerGroup> {
    let row = diesel::insert_into(event_volunteer_group::table)
        .values(new)
        .returning(EventVolunteerGroup::as_returning())
        .get_result(conn)
        .await?;
    Ok(row)
}

/// ## Summary
/// Atomically records an instance-scoped availability override for a group.
///
/// Same shape as the volunteer variant: one row per `(group, instance)`,
/// stable id across repeated calls, never deleted.
///
/// ## Errors
/// Returns a database error if the upsert fails.
#[tracing::instrument(
    skip(conn, new),
    fields(group_id = %new.volunteer_group_id, instance_id = %new.recurring_event_instance_id)
)]
pub async fn upsert_exclusion(
    conn: &mut DbConnection<'_>,
    new: &NewEventVolunteerGroupException,
    actor_id: uuid::Uuid,
) -> DbResult<EventVolunteerGroupException> {
    let row = diesel::insert_into(event_volunteer_group_exception::table)
        .values(new)
        .on_conflict((
            event_volunteer_group_exception::volunteer_group_id,
            event_volunteer_group_exception::recurring_event_instance_id,
        ))
        .do_update()
        .set((
            event_volunteer_group_exception::is_excluded.eq(new.is_excluded),
            event_volunteer_group_exception::updated_by.eq(Some(actor_id)),
            event_volunteer_group_exception::updated_at.eq(chrono::Utc::now()),
        ))
        .returning(EventVolunteerGroupException::as_returning())
        .get_result(conn)
        .await?;

    tracing::debug!(exception_id = %row.id, excluded = row.is_excluded, "Upserted group exclusion");
    Ok(row)
}

/// ## Summary
/// Re-includes a group at every instance by tombstoning its exclusions.
///
/// Series-wide assignment means the group participates everywhere again, so
/// existing per-instance exclusions are flipped to `is_excluded = false`
/// rather than deleted, preserving the audit trail.
///
/// ## Errors
/// Returns a database error if the update fails.
#[tracing::instrument(skip(conn))]
pub async fn include_for_all_instances(
    conn: &mut DbConnection<'_>,
    volunteer_group_id: uuid::Uuid,
    actor_id: uuid::Uuid,
) -> DbResult<usize> {
    let updated = diesel::update(
        event_volunteer_group_exception::table
            .filter(event_volunteer_group_exception::volunteer_group_id.eq(volunteer_group_id))
            .filter(event_volunteer_group_exception::is_excluded.eq(true)),
    )
    .set((
        event_volunteer_group_exception::is_excluded.eq(false),
        event_volunteer_group_exception::updated_by.eq(Some(actor_id)),
        event_volunteer_group_exception::updated_at.eq(chrono::Utc::now()),
    ))
    .execute(conn)
    .await?;
    Ok(updated)
}
