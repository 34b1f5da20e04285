use diesel::{pg::Pg, prelude::*};

use crate::db::{enums::OrganizationRole, schema};

/// Membership of a user in an organization; carries the role the
/// authorization gate checks.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = schema::organization_membership)]
#[diesel(check_for_backend(Pg))]
#[diesel(primary_key(organization_id, member_id))]
#[diesel(belongs_to(crate::model::user::User, foreign_key = member_id))]
pub struct OrganizationMembership {
    pub organization_id: uuid::Uuid,
    pub member_id: uuid::Uuid,
    pub role: OrganizationRole,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
