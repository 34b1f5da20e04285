//! Event creation: standalone events, or a series template with its
//! recurrence rule and the initial materialized window, in one transaction.

use chrono::{DateTime, Months, TimeDelta, Utc};
use diesel_async::AsyncConnection;
use diesel_async::scoped_futures::ScopedFutureExt;

use muster_core::constants::DEFAULT_RECURRENCE_INTERVAL;
use muster_core::error::{ArgumentIssue, CoreError, DomainError, DomainResult};
use muster_db::db::connection::DbConnection;
use muster_db::db::enums::RuleFrequency;
use muster_db::db::query::{event, rule};
use muster_db::model::event::{Event, NewEvent};
use muster_db::model::recurrence_rule::NewRecurrenceRule;

use crate::auth::{self, Actor};
use crate::error::{ServiceError, ServiceResult};
use crate::generation;

/// Recurrence pattern supplied at event creation.
#[derive(Debug, Clone)]
pub struct RecurrenceInput {
    pub frequency: RuleFrequency,
    pub interval: Option<i32>,
    pub count: Option<i32>,
    pub end_date: Option<DateTime<Utc>>,
    pub by_day: Vec<String>,
    pub by_month: Vec<i32>,
    pub by_month_day: Vec<i32>,
}

/// Input for creating an event. A present `recurrence` makes the event a
/// series template.
#[expect(clippy::struct_excessive_bools)]
#[derive(Debug, Clone)]
pub struct CreateEventInput {
    pub organization_id: uuid::Uuid,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub all_day: bool,
    pub is_public: bool,
    pub is_registerable: bool,
    pub is_invite_only: bool,
    pub recurrence: Option<RecurrenceInput>,
}

/// Schedule validation for a new event. A short grace period absorbs clock
/// skew between the caller and the server.
fn check_schedule(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> DomainResult<()> {
    if start < now - TimeDelta::seconds(2) {
        return Err(DomainError::invalid(
            vec!["input", "startAt"],
            "Start date must be in the future or within the next few seconds",
        ));
    }
    if end <= start {
        return Err(DomainError::invalid(
            vec!["input", "endAt"],
            format!("End time must be after start time: {start}."),
        ));
    }
    Ok(())
}

fn check_creation_visibility(is_public: bool, is_invite_only: bool) -> DomainResult<()> {
    if is_public && is_invite_only {
        return Err(DomainError::InvalidArguments {
            issues: vec![
                ArgumentIssue::new(
                    vec!["input", "isPublic"],
                    "cannot be both Public and Invite-Only",
                ),
                ArgumentIssue::new(
                    vec!["input", "isInviteOnly"],
                    "cannot be both Public and Invite-Only",
                ),
            ],
        });
    }
    Ok(())
}

fn none_if_empty<T>(values: Vec<T>) -> Option<Vec<T>> {
    if values.is_empty() { None } else { Some(values) }
}

fn rule_row(
    recurrence: &RecurrenceInput,
    base_recurring_event_id: uuid::Uuid,
    start_at: DateTime<Utc>,
) -> NewRecurrenceRule {
    NewRecurrenceRule {
        base_recurring_event_id,
        frequency: recurrence.frequency,
        interval: recurrence
            .interval
            .unwrap_or_else(|| i32::from(DEFAULT_RECURRENCE_INTERVAL)),
        count: recurrence.count,
        recurrence_start_date: start_at,
        recurrence_end_date: recurrence.end_date,
        by_day: none_if_empty(recurrence.by_day.clone()),
        by_month: none_if_empty(recurrence.by_month.clone()),
        by_month_day: none_if_empty(recurrence.by_month_day.clone()),
    }
}

/// Window end for the creation-time materialization pass.
///
/// The window spans `window_months` from whichever of now and the series
/// start is later, clamped to the recurrence end date when that comes
/// sooner. `None` only when the months push past the calendar.
fn creation_window_end(
    now: DateTime<Utc>,
    start_at: DateTime<Utc>,
    recurrence_end: Option<DateTime<Utc>>,
    window_months: u32,
) -> Option<DateTime<Utc>> {
    let default_end = now.max(start_at).checked_add_months(Months::new(window_months))?;
    Some(match recurrence_end {
        Some(end) if end < default_end => end,
        _ => default_end,
    })
}

/// ## Summary
/// Creates an event in an organization.
///
/// With a `recurrence` the event becomes a series template: the rule row is
/// created alongside it and the initial window of instances (up to
/// `window_months` out, clamped to the recurrence end date) is materialized
/// immediately, all in the same transaction, so the series is queryable the
/// moment the mutation returns.
///
/// ## Errors
/// - `unauthenticated` / `unauthorized_action_on_arguments_associated_resources`
///   at `input.organizationId` when the actor is not a member (platform
///   administrators bypass the membership check)
/// - `invalid_arguments` for a past start, a non-positive duration, a name
///   of only whitespace, a public invite-only combination, or a recurrence
///   the expander rejects
#[tracing::instrument(
    skip(conn, actor, input),
    fields(organization_id = %input.organization_id, name = %input.name)
)]
pub async fn create_event(
    conn: &mut DbConnection<'_>,
    actor: &Actor,
    input: &CreateEventInput,
    window_months: u32,
) -> ServiceResult<Event> {
    if input.name.trim().is_empty() {
        return Err(DomainError::invalid(vec!["input", "name"], "Name must not be empty.").into());
    }
    check_schedule(input.start_at, input.end_at, Utc::now())?;
    check_creation_visibility(input.is_public, input.is_invite_only)?;

    let org_role = auth::organization_role(conn, actor, input.organization_id).await?;
    if !actor.is_platform_administrator() && org_role.is_none() {
        return Err(DomainError::unauthorized_on(vec!["input", "organizationId"]).into());
    }

    let window_end = creation_window_end(
        Utc::now(),
        input.start_at,
        input.recurrence.as_ref().and_then(|recurrence| recurrence.end_date),
        window_months,
    )
    .ok_or(CoreError::InvariantViolation(
        "generation window overflows the calendar",
    ))?;

    let new_event = NewEvent {
        organization_id: input.organization_id,
        creator_id: actor.user_id,
        name: input.name.clone(),
        description: input.description.clone(),
        location: input.location.clone(),
        start_at: input.start_at,
        end_at: input.end_at,
        all_day: input.all_day,
        is_public: input.is_public,
        is_registerable: input.is_registerable,
        is_invite_only: input.is_invite_only,
        is_recurring_template: input.recurrence.is_some(),
    };
    let recurrence = input.recurrence.clone();
    let start_at = input.start_at;

    let created = conn
        .transaction::<_, ServiceError, _>(move |tx| {
            async move {
                let created = event::create_event(tx, &new_event).await?;

                if let Some(recurrence) = recurrence {
                    let new_rule = rule_row(&recurrence, created.id, start_at);
                    // Surface a malformed pattern as an argument error before
                    // the row lands.
                    new_rule.to_spec().map_err(|err| {
                        DomainError::invalid(vec!["input", "recurrence"], err.to_string())
                    })?;

                    let stored_rule = rule::create_rule(tx, &new_rule).await?;
                    let outcome =
                        generation::ensure_instances(tx, &created, &stored_rule, window_end)
                            .await
                            .map_err(|err| match err {
                                ServiceError::CoreError(core) => DomainError::invalid(
                                    vec!["input", "recurrence"],
                                    core.to_string(),
                                )
                                .into(),
                                other => other,
                            })?;
                    tracing::info!(
                        rule_id = %stored_rule.id,
                        instances = outcome.inserted,
                        "Created series template with initial window"
                    );
                }

                Ok(created)
            }
            .scope_boxed()
        })
        .await?;

    tracing::info!(event_id = %created.id, recurring = created.is_recurring_template, "Event created");
    Ok(created)
}
