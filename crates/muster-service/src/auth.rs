//! Actor resolution and the authorization gate shared by every mutation.

use muster_core::error::DomainError;
use muster_db::db::connection::DbConnection;
use muster_db::db::enums::{OrganizationRole, UserRole};
use muster_db::db::query::actor;
use muster_db::model::event::Event;

use crate::error::ServiceResult;

/// The authenticated caller of a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: uuid::Uuid,
    pub role: UserRole,
}

impl Actor {
    #[must_use]
    pub const fn is_platform_administrator(&self) -> bool {
        matches!(self.role, UserRole::Administrator)
    }
}

/// ## Summary
/// Resolves the caller's user row into an [`Actor`].
///
/// ## Errors
/// `unauthenticated` when no caller id is supplied or the user row is gone
/// (a deleted account with a live token is treated as unauthenticated, not
/// as a missing resource).
#[tracing::instrument(skip(conn))]
pub async fn authenticate(
    conn: &mut DbConnection<'_>,
    caller_id: Option<uuid::Uuid>,
) -> ServiceResult<Actor> {
    let user_id = caller_id.ok_or(DomainError::Unauthenticated)?;
    let user = actor::get_user(conn, user_id)
        .await?
        .ok_or(DomainError::Unauthenticated)?;

    Ok(Actor {
        user_id: user.id,
        role: user.role,
    })
}

/// ## Summary
/// Fetches the actor's role in an organization, if they are a member.
///
/// ## Errors
/// Returns a database error if the lookup fails.
pub async fn organization_role(
    conn: &mut DbConnection<'_>,
    actor: &Actor,
    organization_id: uuid::Uuid,
) -> ServiceResult<Option<OrganizationRole>> {
    Ok(actor::organization_role(conn, organization_id, actor.user_id).await?)
}

/// Pure authorization rule: platform administrators, organization
/// administrators, and the event creator may mutate the event.
#[must_use]
pub fn may_mutate_event(actor: &Actor, org_role: Option<OrganizationRole>, event: &Event) -> bool {
    actor.is_platform_administrator()
        || matches!(org_role, Some(OrganizationRole::Administrator))
        || event.creator_id == actor.user_id
}

/// ## Summary
/// Authorization gate for event mutations.
///
/// ## Errors
/// `unauthorized_action` when the actor is none of: platform administrator,
/// administrator of the event's organization, or the event's creator.
#[tracing::instrument(skip(conn, actor, event), fields(user_id = %actor.user_id, event_id = %event.id))]
pub async fn require_event_author(
    conn: &mut DbConnection<'_>,
    actor: &Actor,
    event: &Event,
) -> ServiceResult<()> {
    let org_role = organization_role(conn, actor, event.organization_id).await?;
    if may_mutate_event(actor, org_role, event) {
        Ok(())
    } else {
        tracing::debug!("Actor failed the event author gate");
        Err(DomainError::UnauthorizedAction.into())
    }
}
