//! Query builders and lookups for event rows.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::event;
use crate::error::DbResult;
use crate::model::event::{Event, NewEvent};

/// ## Summary
/// Returns a query to select all events.
#[must_use]
pub fn all() -> event::BoxedQuery<'static, diesel::pg::Pg> {
    event::table.into_boxed()
}

/// ## Summary
/// Returns a query to find an event by ID.
#[must_use]
pub fn by_id(id: uuid::Uuid) -> event::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(event::id.eq(id))
}

/// ## Summary
/// Returns a query restricted to series templates.
#[must_use]
pub fn templates() -> event::BoxedQuery<'static, diesel::pg::Pg> {
    all().filter(event::is_recurring_template.eq(true))
}

/// ## Summary
/// Fetches an event by ID.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn get_event(conn: &mut DbConnection<'_>, id: uuid::Uuid) -> DbResult<Option<Event>> {
    let found = by_id(id)
        .select(Event::as_select())
        .first(conn)
        .await
        .optional()?;
    Ok(found)
}

/// ## Summary
/// Inserts an event row and returns it.
///
/// ## Errors
/// Returns a database error if the insert fails.
#[tracing::instrument(skip(conn, new), fields(organization_id = %new.organization_id, name = %new.name))]
pub async fn create_event(conn: &mut DbConnection<'_>, new: &NewEvent) -> DbResult<Event> {
    let row = diesel::insert_into(event::table)
        .values(new)
        .returning(Event::as_returning())
        .get_result(conn)
        .await?;
    Ok(row)
}
