use diesel::{pg::Pg, prelude::*};

use crate::db::schema;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = schema::event_volunteer_group)]
#[diesel(check_for_backend(Pg))]
#[diesel(belongs_to(crate::model::event::Event, foreign_key = event_id))]
pub struct EventVolunteerGroup {
    pub id: uuid::Uuid,
    pub event_id: uuid::Uuid,
    pub leader_id: uuid::Uuid,
    pub creator_id: uuid::Uuid,
    pub name: String,
    pub description: Option<String>,
    pub volunteers_required: Option<i32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::event_volunteer_group)]
pub struct NewEventVolunteerGroup {
    pub event_id: uuid::Uuid,
    pub leader_id: uuid::Uuid,
    pub creator_id: uuid::Uuid,
    pub name: String,
    pub description: Option<String>,
    pub volunteers_required: Option<i32>,
}

/// Instance-scoped availability override for one volunteer group; same
/// semantics as the volunteer variant.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = schema::event_volunteer_group_exception)]
#[diesel(check_for_backend(Pg))]
#[diesel(belongs_to(EventVolunteerGroup, foreign_key = volunteer_group_id))]
#[diesel(belongs_to(crate::model::instance::RecurringEventInstance, foreign_key = recurring_event_instance_id))]
pub struct EventVolunteerGroupException {
    pub id: uuid::Uuid,
    pub volunteer_group_id: uuid::Uuid,
    pub recurring_event_instance_id: uuid::Uuid,
    pub is_excluded: bool,
    pub created_by: uuid::Uuid,
    pub updated_by: Option<uuid::Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::event_volunteer_group_exception)]
pub struct NewEventVolunteerGroupException {
    pub volunteer_group_id: uuid::Uuid,
    pub recurring_event_instance_id: uuid::Uuid,
    pub is_excluded: bool,
    pub created_by: uuid::Uuid,
}
