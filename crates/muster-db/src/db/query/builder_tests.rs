//! Query builder tests: render each builder to SQL and check its shape.

use diesel::query_builder::QueryFragment;

use super::{actor, event, exception, instance, membership, volunteer, volunteer_group};

/// Helper to check if a query compiles and is valid.
fn query_is_valid<Q>(query: Q) -> bool
where
    Q: QueryFragment<diesel::pg::Pg>,
{
    // If the query compiles and can be converted to SQL, it's valid
    let _ = diesel::debug_query::<diesel::pg::Pg, _>(&query).to_string();
    true
}

fn sql_of<Q>(query: &Q) -> String
where
    Q: QueryFragment<diesel::pg::Pg>,
{
    diesel::debug_query::<diesel::pg::Pg, _>(query).to_string()
}

#[test_log::test]
fn test_event_queries_build() {
    assert!(query_is_valid(event::all()), "all() query should be valid");
    assert!(
        query_is_valid(event::by_id(uuid::Uuid::new_v4())),
        "by_id() query should be valid"
    );
    assert!(
        query_is_valid(event::templates()),
        "templates() query should be valid"
    );
}

#[test_log::test]
fn test_templates_filters_on_template_flag() {
    let query_str = sql_of(&event::templates());
    assert!(
        query_str.contains("is_recurring_template"),
        "templates() should filter by is_recurring_template"
    );
}

#[test_log::test]
fn test_instance_queries_build() {
    assert!(
        query_is_valid(instance::by_id(uuid::Uuid::new_v4())),
        "by_id() query should be valid"
    );
    assert!(
        query_is_valid(instance::for_series(uuid::Uuid::new_v4())),
        "for_series() query should be valid"
    );
}

#[test_log::test]
fn test_for_series_filters_and_orders() {
    let query_str = sql_of(&instance::for_series(uuid::Uuid::new_v4()));
    assert!(
        query_str.contains("base_recurring_event_id"),
        "for_series() should filter by base_recurring_event_id"
    );
    assert!(
        query_str.contains("ORDER BY") && query_str.contains("sequence_number"),
        "for_series() should order by sequence_number"
    );
}

#[test_log::test]
fn test_exception_query_builds() {
    let query_str = sql_of(&exception::by_instance(uuid::Uuid::new_v4()));
    assert!(
        query_str.contains("recurring_event_instance_id"),
        "by_instance() should filter by recurring_event_instance_id"
    );
}

#[test_log::test]
fn test_volunteer_queries_build() {
    assert!(
        query_is_valid(volunteer::by_id(uuid::Uuid::new_v4())),
        "by_id() query should be valid"
    );
    let query_str = sql_of(&volunteer::for_event_and_user(
        uuid::Uuid::new_v4(),
        uuid::Uuid::new_v4(),
    ));
    assert!(
        query_str.contains("event_id") && query_str.contains("user_id"),
        "for_event_and_user() should filter by event_id and user_id"
    );
}

#[test_log::test]
fn test_volunteer_group_queries_build() {
    assert!(
        query_is_valid(volunteer_group::by_id(uuid::Uuid::new_v4())),
        "by_id() query should be valid"
    );
    let query_str = sql_of(&volunteer_group::for_event_and_name(
        uuid::Uuid::new_v4(),
        "Setup Crew",
    ));
    assert!(
        query_str.contains("event_id") && query_str.contains("name"),
        "for_event_and_name() should filter by event_id and name"
    );
}

#[test_log::test]
fn test_membership_queries_build() {
    let query_str = sql_of(&membership::for_volunteer(uuid::Uuid::new_v4()));
    assert!(
        query_str.contains("volunteer_id"),
        "for_volunteer() should filter by volunteer_id"
    );
    let query_str = sql_of(&membership::for_group(uuid::Uuid::new_v4()));
    assert!(
        query_str.contains("group_id"),
        "for_group() should filter by group_id"
    );
}

#[test_log::test]
fn test_ungrouped_membership_query_excludes_grouped_rows() {
    let query_str = sql_of(&membership::ungrouped_for_target(
        uuid::Uuid::new_v4(),
        uuid::Uuid::new_v4(),
    ));
    assert!(
        query_str.contains("group_id") && query_str.contains("IS NULL"),
        "ungrouped_for_target() should restrict to NULL group_id"
    );
    assert!(
        query_str.contains("event_id"),
        "ungrouped_for_target() should filter by event_id"
    );
}

#[test_log::test]
fn test_actor_queries_build() {
    assert!(
        query_is_valid(actor::user_by_id(uuid::Uuid::new_v4())),
        "user_by_id() query should be valid"
    );
}

/// The generated-instance insert, the exception upsert and the volunteer
/// upsert all lean on `ON CONFLICT` for their idempotence. These tests pin
/// the rendered conflict clause of each statement shape.
mod conflict_clauses {
    use chrono::{TimeZone, Utc};
    use diesel::dsl::sql;
    use diesel::prelude::*;
    use diesel::sql_types::Jsonb;

    use super::sql_of;
    use crate::db::schema::{event_exception, event_volunteer, recurring_event_instance};
    use crate::model::exception::NewEventException;
    use crate::model::instance::NewRecurringEventInstance;
    use crate::model::volunteer::NewEventVolunteer;

    #[test_log::test]
    fn instance_insert_skips_already_generated_sequences() {
        let start = Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap();
        let rows = vec![NewRecurringEventInstance {
            base_recurring_event_id: uuid::Uuid::new_v4(),
            recurrence_rule_id: uuid::Uuid::new_v4(),
            original_instance_start_time: start,
            actual_start_time: start,
            actual_end_time: start + chrono::TimeDelta::hours(1),
            sequence_number: 1,
            total_count: Some(4),
            organization_id: uuid::Uuid::new_v4(),
        }];

        let statement = diesel::insert_into(recurring_event_instance::table)
            .values(&rows[..])
            .on_conflict((
                recurring_event_instance::base_recurring_event_id,
                recurring_event_instance::sequence_number,
            ))
            .do_nothing();
        let query_str = sql_of(&statement);

        assert!(
            query_str.contains("ON CONFLICT"),
            "generated-instance insert should carry a conflict clause"
        );
        assert!(
            query_str.contains("base_recurring_event_id")
                && query_str.contains("sequence_number"),
            "conflict target should be the series/sequence pair"
        );
        assert!(
            query_str.contains("DO NOTHING"),
            "existing sequence numbers should be left untouched"
        );
    }

    #[test_log::test]
    fn exception_upsert_merges_stored_blob_in_sql() {
        let new = NewEventException {
            recurring_event_instance_id: uuid::Uuid::new_v4(),
            exception_data: serde_json::json!({ "name": "Renamed" }),
            organization_id: uuid::Uuid::new_v4(),
            creator_id: uuid::Uuid::new_v4(),
        };
        let actor_id = uuid::Uuid::new_v4();

        let statement = diesel::insert_into(event_exception::table)
            .values(&new)
            .on_conflict(event_exception::recurring_event_instance_id)
            .do_update()
            .set((
                event_exception::exception_data.eq(sql::<Jsonb>(
                    "event_exception.exception_data || excluded.exception_data",
                )),
                event_exception::updater_id.eq(Some(actor_id)),
                event_exception::updated_at.eq(chrono::Utc::now()),
            ));
        let query_str = sql_of(&statement);

        assert!(
            query_str.contains("ON CONFLICT") && query_str.contains("DO UPDATE"),
            "exception write should upsert on the instance id"
        );
        assert!(
            query_str.contains("event_exception.exception_data || excluded.exception_data"),
            "the stored blob should shallow-merge with the incoming one in SQL"
        );
    }

    #[test_log::test]
    fn volunteer_insert_defers_to_existing_row() {
        let new = NewEventVolunteer {
            event_id: uuid::Uuid::new_v4(),
            user_id: uuid::Uuid::new_v4(),
            creator_id: uuid::Uuid::new_v4(),
            has_accepted: false,
            is_public: true,
        };

        let statement = diesel::insert_into(event_volunteer::table)
            .values(&new)
            .on_conflict((event_volunteer::event_id, event_volunteer::user_id))
            .do_nothing();
        let query_str = sql_of(&statement);

        assert!(
            query_str.contains("ON CONFLICT"),
            "volunteer insert should carry a conflict clause"
        );
        assert!(
            query_str.contains("event_id") && query_str.contains("user_id"),
            "conflict target should be the (event, user) pair"
        );
        assert!(
            query_str.contains("DO NOTHING"),
            "a concurrent enrollment should win without erroring"
        );
    }
}
