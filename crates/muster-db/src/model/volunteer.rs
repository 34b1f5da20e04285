use diesel::{pg::Pg, prelude::*};

use crate::db::schema;

/// A volunteer assignment against an event; unique per `(event, user)` so
/// repeated assignment reuses the row instead of duplicating it.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = schema::event_volunteer)]
#[diesel(check_for_backend(Pg))]
#[diesel(belongs_to(crate::model::event::Event, foreign_key = event_id))]
#[diesel(belongs_to(crate::model::user::User, foreign_key = user_id))]
pub struct EventVolunteer {
    pub id: uuid::Uuid,
    pub event_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub creator_id: uuid::Uuid,
    pub has_accepted: bool,
    pub is_public: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::event_volunteer)]
pub struct NewEventVolunteer {
    pub event_id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub creator_id: uuid::Uuid,
    pub has_accepted: bool,
    pub is_public: bool,
}

/// Instance-scoped availability override for one volunteer.
///
/// A row with `is_excluded = true` removes the volunteer from that single
/// occurrence without touching the series-level assignment; flipping the flag
/// back is the tombstone-style re-inclusion, the row itself stays.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = schema::event_volunteer_exception)]
#[diesel(check_for_backend(Pg))]
#[diesel(belongs_to(EventVolunteer, foreign_key = volunteer_id))]
#[diesel(belongs_to(crate::model::instance::RecurringEventInstance, foreign_key = recurring_event_instance_id))]
pub struct EventVolunteerException {
    pub id: uuid::Uuid,
    pub volunteer_id: uuid::Uuid,
    pub recurring_event_instance_id: uuid::Uuid,
    pub is_excluded: bool,
    pub created_by: uuid::Uuid,
    pub updated_by: Option<uuid::Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::event_volunteer_exception)]
pub struct NewEventVolunteerException {
    pub volunteer_id: uuid::Uuid,
    pub recurring_event_instance_id: uuid::Uuid,
    pub is_excluded: bool,
    pub created_by: uuid::Uuid,
}
