use diesel::{pg::Pg, prelude::*};

use crate::db::schema;

/// An event row: either a standalone event or, when `is_recurring_template`
/// is set, the series template whose canonical fields instances inherit.
#[expect(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = schema::event)]
#[diesel(check_for_backend(Pg))]
pub struct Event {
    pub id: uuid::Uuid,
    pub organization_id: uuid::Uuid,
    pub creator_id: uuid::Uuid,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_at: chrono::DateTime<chrono::Utc>,
    pub end_at: chrono::DateTime<chrono::Utc>,
    pub all_day: bool,
    pub is_public: bool,
    pub is_registerable: bool,
    pub is_invite_only: bool,
    pub is_recurring_template: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[expect(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::event)]
pub struct NewEvent {
    pub organization_id: uuid::Uuid,
    pub creator_id: uuid::Uuid,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_at: chrono::DateTime<chrono::Utc>,
    pub end_at: chrono::DateTime<chrono::Utc>,
    pub all_day: bool,
    pub is_public: bool,
    pub is_registerable: bool,
    pub is_invite_only: bool,
    pub is_recurring_template: bool,
}
