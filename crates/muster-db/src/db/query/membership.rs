//! Volunteer membership rows: who is enrolled, where, and at what status.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::volunteer_membership;
use crate::error::DbResult;
use crate::model::membership::{NewVolunteerMembership, VolunteerMembership};

/// ## Summary
/// Returns a query for the memberships of a volunteer.
#[must_use]
pub fn for_volunteer(
    volunteer_id: uuid::Uuid,
) -> volunteer_membership::BoxedQuery<'static, diesel::pg::Pg> {
    volunteer_membership::table
        .filter(volunteer_membership::volunteer_id.eq(volunteer_id))
        .into_boxed()
}

/// ## Summary
/// Returns a query for the memberships of a group.
#[must_use]
pub fn for_group(
    group_id: uuid::Uuid,
) -> volunteer_membership::BoxedQuery<'static, diesel::pg::Pg> {
    volunteer_membership::table
        .filter(volunteer_membership::group_id.eq(group_id))
        .into_boxed()
}

/// ## Summary
/// Returns a query for a volunteer's ungrouped memberships at one target
/// (an event or a single instance).
#[must_use]
pub fn ungrouped_for_target(
    volunteer_id: uuid::Uuid,
    event_id: uuid::Uuid,
) -> volunteer_membership::BoxedQuery<'static, diesel::pg::Pg> {
    for_volunteer(volunteer_id)
        .filter(volunteer_membership::group_id.is_null())
        .filter(volunteer_membership::event_id.eq(event_id))
}

/// ## Summary
/// Fetches a volunteer's ungrouped membership at a target, if any.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn get_ungrouped_for_target(
    conn: &mut DbConnection<'_>,
    volunteer_id: uuid::Uuid,
    event_id: uuid::Uuid,
) -> DbResult<Option<VolunteerMembership>> {
    let found = ungrouped_for_target(volunteer_id, event_id)
        .select(VolunteerMembership::as_select())
        .first(conn)
        .await
        .optional()?;
    Ok(found)
}

/// ## Summary
/// Fetches the membership rows tying a volunteer to a group, if any.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn get_for_volunteer_and_group(
    conn: &mut DbConnection<'_>,
    volunteer_id: uuid::Uuid,
    group_id: uuid::Uuid,
) -> DbResult<Option<VolunteerMembership>> {
    let found = for_volunteer(volunteer_id)
        .filter(volunteer_membership::group_id.eq(group_id))
        .select(VolunteerMembership::as_select())
        .first(conn)
        .await
        .optional()?;
    Ok(found)
}

/// ## Summary
/// Inserts a single membership row.
///
/// ## Errors
/// Returns a database error if the insert fails.
#[tracing::instrument(skip(conn, new), fields(volunteer_id = %new.volunteer_id))]
pub async fn create_membership(
    conn: &mut DbConnection<'_>,
    new: &NewVolunteerMembership,
) -> DbResult<VolunteerMembership> {
    let row = diesel::insert_into(volunteer_membership::table)
        .values(new)
        .returning(VolunteerMembership::as_returning())
        .get_result(conn)
        .await?;
    Ok(row)
}

/// ## Summary
/// Inserts a batch of membership rows in one statement.
///
/// ## Errors
/// Returns a database error if the insert fails.
#[tracing::instrument(skip(conn, rows), fields(rows = rows.len()))]
pub async fn create_memberships(
    conn: &mut DbConnection<'_>,
    rows: &[NewVolunteerMembership],
) -> DbResult<Vec<VolunteerMembership>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let inserted = diesel::insert_into(volunteer_membership::table)
        .values(rows)
        .returning(VolunteerMembership::as_returning())
        .get_results(conn)
        .await?;
    Ok(inserted)
}
