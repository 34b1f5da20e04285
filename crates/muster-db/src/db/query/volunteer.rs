//! Event volunteer rows and their instance-scoped exclusion overrides.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use muster_core::error::CoreError;

use crate::db::connection::DbConnection;
use crate::db::schema::{event_volunteer, event_volunteer_exception};
use crate::error::{DbError, DbResult};
use crate::model::volunteer::{
    EventVolunteer, EventVolunteerException, NewEventVolunteer, NewEventVolunteerException,
};

/// ## Summary
/// Returns a query to find a volunteer by ID.
#[must_use]
pub fn by_id(id: uuid::Uuid) -> event_volunteer::BoxedQuery<'static, diesel::pg::Pg> {
    event_volunteer::table
        .filter(event_volunteer::id.eq(id))
        .into_boxed()
}

/// ## Summary
/// Returns a query to find the volunteer row for a `(event, user)` pair.
#[must_use]
pub fn for_event_and_user(
    event_id: uuid::Uuid,
    user_id: uuid::Uuid,
) -> event_volunteer::BoxedQuery<'static, diesel::pg::Pg> {
    event_volunteer::table
        .filter(event_volunteer::event_id.eq(event_id))
        .filter(event_volunteer::user_id.eq(user_id))
        .into_boxed()
}

/// ## Summary
/// Fetches a volunteer by ID.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn get_volunteer(
    conn: &mut DbConnection<'_>,
    id: uuid::Uuid,
) -> DbResult<Option<EventVolunteer>> {
    let found = by_id(id)
        .select(EventVolunteer::as_select())
        .first(conn)
        .await
        .optional()?;
    Ok(found)
}

/// ## Summary
/// Finds the volunteer row for `(event, user)` or creates it.
///
/// Idempotent under concurrency: the insert targets the unique
/// `(event_id, user_id)` constraint with `DO NOTHING`, and a conflicting
/// insert falls back to re-reading the row the other writer created.
///
/// ## Errors
/// Returns a database error, or an invariant violation if neither insert nor
/// re-read produced a row.
#[tracing::instrument(skip(conn))]
pub async fn find_or_create(
    conn: &mut DbConnection<'_>,
    event_id: uuid::Uuid,
    user_id: uuid::Uuid,
    creator_id: uuid::Uuid,
) -> DbResult<EventVolunteer> {
    let new = NewEventVolunteer {
        event_id,
        user_id,
        creator_id,
        has_accepted: false,
        is_public: true,
    };

    let inserted = diesel::insert_into(event_volunteer::table)
        .values(&new)
        .on_conflict((event_volunteer::event_id, event_volunteer::user_id))
        .do_nothing()
        .returning(EventVolunteer::as_returning())
        .get_result(conn)
        .await
        .optional()?;

    if let Some(row) = inserted {
        tracing::debug!(volunteer_id = %row.id, "Created volunteer row");
        return Ok(row);
    }

    let existing = for_event_and_user(event_id, user_id)
        .select(EventVolunteer::as_select())
        .first(conn)
        .await
        .optional()?;

    existing.ok_or(DbError::CoreError(CoreError::InvariantViolation(
        "volunteer upsert conflicted but no row is readable",
    )))
}

/// ## Summary
/// Atomically records an instance-scoped availability override for a
/// volunteer.
///
/// One row per `(volunteer, instance)`: repeated calls update the existing
/// row (flag, `updated_by`, `updated_at`) while its id stays constant. The
/// row is never deleted; re-inclusion writes `is_excluded = false`.
///
/// ## Errors
/// Returns a database error if the upsert fails.
#[tracing::instrument(
    skip(conn, new),
    fields(volunteer_id = %new.volunteer_id, instance_id = %new.recurring_event_instance_id)
)]
pub async fn upsert_exclusion(
    conn: &mut DbConnection<'_>,
    new: &NewEventVolunteerException,
    actor_id: uuid::Uuid,
) -> DbResult<EventVolunteerException> {
    let row = diesel::insert_into(event_volunteer_exception::table)
        .values(new)
        .on_conflict((
            event_volunteer_exception::volunteer_id,
            event_volunteer_exception::recurring_event_instance_id,
        ))
        .do_update()
        .set((
            event_volunteer_exception::is_excluded.eq(new.is_excluded),
            event_volunteer_exception::updated_by.eq(Some(actor_id)),
            event_volunteer_exception::updated_at.eq(chrono::Utc::now()),
        ))
        .returning(EventVolunteerException::as_returning())
        .get_result(conn)
        .await?;

    tracing::debug!(exception_id = %row.id, excluded = row.is_excluded, "Upserted volunteer exclusion");
    Ok(row)
}

/// ## Summary
/// Re-includes a volunteer at every instance by tombstoning their exclusions.
///
/// Series-wide re-assignment flips existing exclusions to
/// `is_excluded = false` instead of deleting them.
///
/// ## Errors
/// Returns a database error if the update fails.
#[tracing::instrument(skip(conn))]
pub async fn include_for_all_instances(
    conn: &mut DbConnection<'_>,
    volunteer_id: uuid::Uuid,
    actor_id: uuid::Uuid,
) -> DbResult<usize> {
    let updated = diesel::update(
        event_volunteer_exception::table
            .filter(event_volunteer_exception::volunteer_id.eq(volunteer_id))
            .filter(event_volunteer_exception::is_excluded.eq(true)),
    )
    .set((
        event_volunteer_exception::is_excluded.eq(false),
        event_volunteer_exception::updated_by.eq(Some(actor_id)),
        event_volunteer_exception::updated_at.eq(chrono::Utc::now()),
    ))
    .execute(conn)
    .await?;
    Ok(updated)
}
