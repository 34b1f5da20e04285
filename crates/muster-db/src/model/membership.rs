use diesel::{pg::Pg, prelude::*};

use crate::db::{enums::MembershipStatus, schema};

/// Enrollment of a volunteer, optionally into a group.
///
/// `event_id` is the resolved target of the enrolling mutation: the series
/// template for series-wide memberships, or the materialized instance id for
/// single-occurrence memberships.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = schema::volunteer_membership)]
#[diesel(check_for_backend(Pg))]
#[diesel(belongs_to(crate::model::volunteer::EventVolunteer, foreign_key = volunteer_id))]
pub struct VolunteerMembership {
    pub id: uuid::Uuid,
    pub volunteer_id: uuid::Uuid,
    pub group_id: Option<uuid::Uuid>,
    pub event_id: uuid::Uuid,
    pub status: MembershipStatus,
    pub created_by: uuid::Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::volunteer_membership)]
pub struct NewVolunteerMembership {
    pub volunteer_id: uuid::Uuid,
    pub group_id: Option<uuid::Uuid>,
    pub event_id: uuid::Uuid,
    pub status: MembershipStatus,
    pub created_by: uuid::Uuid,
}
