//! Exception overlay storage: sparse per-instance override rows with
//! conflict-free upsert semantics.

use diesel::dsl::sql;
use diesel::prelude::*;
use diesel::sql_types::Jsonb;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::event_exception;
use crate::error::DbResult;
use crate::model::exception::{EventException, NewEventException};

/// ## Summary
/// Returns a query to find the exception row for an instance.
#[must_use]
pub fn by_instance(
    instance_id: uuid::Uuid,
) -> event_exception::BoxedQuery<'static, diesel::pg::Pg> {
    event_exception::table
        .filter(event_exception::recurring_event_instance_id.eq(instance_id))
        .into_boxed()
}

/// ## Summary
/// Fetches the exception row for an instance, if any.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn get_for_instance(
    conn: &mut DbConnection<'_>,
    instance_id: uuid::Uuid,
) -> DbResult<Option<EventException>> {
    let found = by_instance(instance_id)
        .select(EventException::as_select())
        .first(conn)
        .await
        .optional()?;
    Ok(found)
}

/// ## Summary
/// Fetches exception rows for a set of instances in one round trip.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn for_instances(
    conn: &mut DbConnection<'_>,
    instance_ids: &[uuid::Uuid],
) -> DbResult<Vec<EventException>> {
    if instance_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = event_exception::table
        .filter(event_exception::recurring_event_instance_id.eq_any(instance_ids))
        .select(EventException::as_select())
        .load(conn)
        .await?;
    Ok(rows)
}

/// ## Summary
/// Atomically inserts or merges an override row for an instance.
///
/// The first override for an instance inserts a row containing only the
/// supplied fields. Later overrides shallow-merge into the stored blob in
/// SQL (`stored || excluded`, last writer wins per key), so concurrent
/// editors never race a read-then-write window. The row id is stable across
/// upserts; `updated_at` strictly increases.
///
/// ## Errors
/// Returns a database error if the upsert fails.
#[tracing::instrument(skip(conn, new), fields(instance_id = %new.recurring_event_instance_id))]
pub async fn upsert_instance_exception(
    conn: &mut DbConnection<'_>,
    new: &NewEventException,
    actor_id: uuid::Uuid,
) -> DbResult<EventException> {
    let row = diesel::insert_into(event_exception::table)
        .values(new)
        .on_conflict(event_exception::recurring_event_instance_id)
        .do_update()
        .set((
            event_exception::exception_data.eq(sql::<Jsonb>(
                "event_exception.exception_data || excluded.exception_data",
            )),
            event_exception::updater_id.eq(Some(actor_id)),
            event_exception::updated_at.eq(chrono::Utc::now()),
        ))
        .returning(EventException::as_returning())
        .get_result(conn)
        .await?;

    tracing::debug!(exception_id = %row.id, "Upserted instance exception");
    Ok(row)
}
