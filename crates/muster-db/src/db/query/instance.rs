//! Instance store: materialized occurrence rows with idempotent batch
//! insertion and optimistic, version-checked timing updates.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use muster_core::error::CoreError;

use crate::db::connection::DbConnection;
use crate::db::schema::recurring_event_instance;
use crate::error::{DbError, DbResult};
use crate::model::instance::{NewRecurringEventInstance, RecurringEventInstance};

/// ## Summary
/// Returns a query to select all instances.
#[must_use]
pub fn all() -> recurring_event_instance::BoxedQuery<'static, diesel::pg::Pg> {
    recurring_event_instance::table.into_boxed()
}

/// ## Summary
/// Returns a query to find an instance by ID.
#[must_use]
pub fn by_id(id: uuid::Uuid) -> recurring_event_instance::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(recurring_event_instance::id.eq(id))
}

/// ## Summary
/// Returns a query for all instances of a series, ordered by sequence number.
#[must_use]
pub fn for_series(
    series_id: uuid::Uuid,
) -> recurring_event_instance::BoxedQuery<'static, diesel::pg::Pg> {
    all()
        .filter(recurring_event_instance::base_recurring_event_id.eq(series_id))
        .order(recurring_event_instance::sequence_number.asc())
}

/// ## Summary
/// Fetches an instance by ID.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn get_instance(
    conn: &mut DbConnection<'_>,
    id: uuid::Uuid,
) -> DbResult<Option<RecurringEventInstance>> {
    let found = by_id(id)
        .select(RecurringEventInstance::as_select())
        .first(conn)
        .await
        .optional()?;
    Ok(found)
}

/// ## Summary
/// Inserts generated instances, skipping sequence numbers that already exist.
///
/// Conflicts on `(base_recurring_event_id, sequence_number)` mean "already
/// generated" and are swallowed, which makes concurrent generation runs safe.
/// Returns the number of rows actually inserted.
///
/// ## Errors
/// Returns a database error if the insert fails for any other reason.
#[tracing::instrument(skip(conn, rows), fields(candidate_rows = rows.len()))]
pub async fn insert_missing(
    conn: &mut DbConnection<'_>,
    rows: &[NewRecurringEventInstance],
) -> DbResult<usize> {
    if rows.is_empty() {
        return Ok(0);
    }

    let inserted = diesel::insert_into(recurring_event_instance::table)
        .values(rows)
        .on_conflict((
            recurring_event_instance::base_recurring_event_id,
            recurring_event_instance::sequence_number,
        ))
        .do_nothing()
        .execute(conn)
        .await?;

    tracing::debug!(inserted, "Materialized missing instances");
    Ok(inserted)
}

/// ## Summary
/// Applies a version-checked timing update to an instance.
///
/// The write only matches when the stored version equals `expected_version`
/// and bumps the version on success. Sequence number and original start time
/// are never part of the change set.
///
/// ## Errors
/// - [`DbError::VersionConflict`] when the row exists at a different version
///   (a concurrent editor won; the caller decides whether to retry).
/// - `NotFound` when the instance does not exist.
#[tracing::instrument(skip(conn))]
pub async fn update_timing(
    conn: &mut DbConnection<'_>,
    id: uuid::Uuid,
    expected_version: i32,
    start: chrono::DateTime<chrono::Utc>,
    end: chrono::DateTime<chrono::Utc>,
) -> DbResult<RecurringEventInstance> {
    if end <= start {
        return Err(DbError::CoreError(CoreError::InvariantViolation(
            "instance end time must be after start time",
        )));
    }

    let updated = diesel::update(
        recurring_event_instance::table
            .filter(recurring_event_instance::id.eq(id))
            .filter(recurring_event_instance::version.eq(expected_version)),
    )
    .set((
        recurring_event_instance::actual_start_time.eq(start),
        recurring_event_instance::actual_end_time.eq(end),
        recurring_event_instance::version.eq(expected_version + 1),
        recurring_event_instance::last_updated_at.eq(Some(chrono::Utc::now())),
    ))
    .returning(RecurringEventInstance::as_returning())
    .get_result(conn)
    .await
    .optional()?;

    let Some(row) = updated else {
        let exists: i64 = by_id(id).count().get_result(conn).await?;
        if exists > 0 {
            tracing::warn!(%id, expected_version, "Optimistic version check failed");
            return Err(DbError::VersionConflict {
                id,
                expected: expected_version,
            });
        }
        return Err(DbError::CoreError(CoreError::NotFound(format!(
            "recurring event instance {id}"
        ))));
    };
    Ok(row)
}
