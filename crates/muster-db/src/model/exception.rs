use diesel::{pg::Pg, prelude::*};

use crate::db::schema;

/// Sparse per-instance field overrides; one row per instance that has ever
/// diverged from its template. `exception_data` is a shallow map whose keys
/// merge last-writer-wins on upsert. Rows are never hard-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = schema::event_exception)]
#[diesel(check_for_backend(Pg))]
#[diesel(belongs_to(crate::model::instance::RecurringEventInstance, foreign_key = recurring_event_instance_id))]
pub struct EventException {
    pub id: uuid::Uuid,
    pub recurring_event_instance_id: uuid::Uuid,
    pub exception_data: serde_json::Value,
    pub organization_id: uuid::Uuid,
    pub creator_id: uuid::Uuid,
    pub updater_id: Option<uuid::Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::event_exception)]
pub struct NewEventException {
    pub recurring_event_instance_id: uuid::Uuid,
    pub exception_data: serde_json::Value,
    pub organization_id: uuid::Uuid,
    pub creator_id: uuid::Uuid,
}
