use diesel::{pg::Pg, prelude::*};

use crate::db::schema;

/// One materialized occurrence of a recurring series.
///
/// `original_instance_start_time` is the unshifted time the rule produced and
/// never changes after creation; `actual_start_time`/`actual_end_time` carry
/// the current effective timing. `version` is bumped on every effective
/// update and backs optimistic concurrency control.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = schema::recurring_event_instance)]
#[diesel(check_for_backend(Pg))]
#[diesel(belongs_to(crate::model::event::Event, foreign_key = base_recurring_event_id))]
#[diesel(belongs_to(crate::model::recurrence_rule::RecurrenceRule, foreign_key = recurrence_rule_id))]
pub struct RecurringEventInstance {
    pub id: uuid::Uuid,
    pub base_recurring_event_id: uuid::Uuid,
    pub recurrence_rule_id: uuid::Uuid,
    pub original_instance_start_time: chrono::DateTime<chrono::Utc>,
    pub actual_start_time: chrono::DateTime<chrono::Utc>,
    pub actual_end_time: chrono::DateTime<chrono::Utc>,
    pub sequence_number: i32,
    pub total_count: Option<i32>,
    pub is_cancelled: bool,
    pub organization_id: uuid::Uuid,
    pub version: i32,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub last_updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::recurring_event_instance)]
pub struct NewRecurringEventInstance {
    pub base_recurring_event_id: uuid::Uuid,
    pub recurrence_rule_id: uuid::Uuid,
    pub original_instance_start_time: chrono::DateTime<chrono::Utc>,
    pub actual_start_time: chrono::DateTime<chrono::Utc>,
    pub actual_end_time: chrono::DateTime<chrono::Utc>,
    pub sequence_number: i32,
    pub total_count: Option<i32>,
    pub organization_id: uuid::Uuid,
}
