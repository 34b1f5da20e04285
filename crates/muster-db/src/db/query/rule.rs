//! Recurrence rule rows and the generation high-water mark.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::schema::recurrence_rule;
use crate::error::DbResult;
use crate::model::recurrence_rule::{NewRecurrenceRule, RecurrenceRule};

/// ## Summary
/// Inserts the rule owned by a new series template and returns it.
///
/// ## Errors
/// Returns a database error if the insert fails.
#[tracing::instrument(skip(conn, new), fields(event_id = %new.base_recurring_event_id))]
pub async fn create_rule(
    conn: &mut DbConnection<'_>,
    new: &NewRecurrenceRule,
) -> DbResult<RecurrenceRule> {
    let row = diesel::insert_into(recurrence_rule::table)
        .values(new)
        .returning(RecurrenceRule::as_returning())
        .get_result(conn)
        .await?;
    Ok(row)
}

/// ## Summary
/// Fetches every rule, for the generation sweep.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn all_rules(conn: &mut DbConnection<'_>) -> DbResult<Vec<RecurrenceRule>> {
    let rows = recurrence_rule::table
        .select(RecurrenceRule::as_select())
        .load(conn)
        .await?;
    Ok(rows)
}

/// ## Summary
/// Advances the generation high-water mark for a rule.
///
/// The mark only moves forward: a concurrent run that already wrote a later
/// date is left alone.
///
/// ## Errors
/// Returns a database error if the update fails.
#[tracing::instrument(skip(conn))]
pub async fn advance_latest_instance_date(
    conn: &mut DbConnection<'_>,
    rule_id: uuid::Uuid,
    latest: chrono::DateTime<chrono::Utc>,
) -> DbResult<usize> {
    let updated = diesel::update(
        recurrence_rule::table
            .filter(recurrence_rule::id.eq(rule_id))
            .filter(
                recurrence_rule::latest_instance_date
                    .is_null()
                    .or(recurrence_rule::latest_instance_date.lt(latest)),
            ),
    )
    .set(recurrence_rule::latest_instance_date.eq(Some(latest)))
    .execute(conn)
    .await?;
    Ok(updated)
}
