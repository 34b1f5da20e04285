//! Lookups backing authentication and organization-role checks.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::db::connection::DbConnection;
use crate::db::enums::OrganizationRole;
use crate::db::schema::{app_user, organization_membership};
use crate::error::DbResult;
use crate::model::user::User;

/// ## Summary
/// Returns a query to find a user by ID.
#[must_use]
pub fn user_by_id(id: uuid::Uuid) -> app_user::BoxedQuery<'static, diesel::pg::Pg> {
    app_user::table.filter(app_user::id.eq(id)).into_boxed()
}

/// ## Summary
/// Fetches a user by ID.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn get_user(conn: &mut DbConnection<'_>, id: uuid::Uuid) -> DbResult<Option<User>> {
    let found = user_by_id(id)
        .select(User::as_select())
        .first(conn)
        .await
        .optional()?;
    Ok(found)
}

/// ## Summary
/// Fetches the role a user holds in an organization, if they are a member.
///
/// ## Errors
/// Returns a database error if the query fails.
pub async fn organization_role(
    conn: &mut DbConnection<'_>,
    organization_id: uuid::Uuid,
    member_id: uuid::Uuid,
) -> DbResult<Option<OrganizationRole>> {
    let role = organization_membership::table
        .filter(organization_membership::organization_id.eq(organization_id))
        .filter(organization_membership::member_id.eq(member_id))
        .select(organization_membership::role)
        .first(conn)
        .await
        .optional()?;
    Ok(role)
}
