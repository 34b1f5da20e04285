//! Single-instance update mutation and the resolved series listing.

use std::collections::HashMap;

use diesel_async::AsyncConnection;
use diesel_async::scoped_futures::ScopedFutureExt;
use serde_json::{Map, Value, json};

use muster_core::error::{DomainError, DomainResult};
use muster_db::db::connection::DbConnection;
use muster_db::db::query::{event, exception, instance};
use muster_db::model::event::Event;
use muster_db::model::exception::NewEventException;
use muster_db::model::instance::RecurringEventInstance;

use crate::auth::{self, Actor};
use crate::error::{ServiceError, ServiceResult};
use crate::overlay::{self, ResolvedEventInstance};

/// Field updates for one occurrence of a recurring series.
///
/// `None` leaves a field untouched. Nullable fields take a double option so
/// `Some(None)` clears the inherited value while `None` skips it.
#[derive(Debug, Clone, Default)]
pub struct UpdateInstanceInput {
    pub id: uuid::Uuid,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub all_day: Option<bool>,
    pub is_public: Option<bool>,
    pub is_registerable: Option<bool>,
    pub is_invite_only: Option<bool>,
    pub start_at: Option<chrono::DateTime<chrono::Utc>>,
    pub end_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl UpdateInstanceInput {
    fn has_updates(&self) -> bool {
        self.name.is_some()
            || self.description.is_some()
            || self.location.is_some()
            || self.all_day.is_some()
            || self.is_public.is_some()
            || self.is_registerable.is_some()
            || self.is_invite_only.is_some()
            || self.start_at.is_some()
            || self.end_at.is_some()
    }
}

/// Resolved effective timing for an update.
///
/// Moving only the start keeps the instance's current duration; moving only
/// the end keeps the current start. Returns `None` when the input touches
/// neither endpoint.
///
/// # Errors
/// `invalid_arguments` at `input.endAt` when the effective end does not fall
/// after the effective start.
pub fn resolve_timing(
    current_start: chrono::DateTime<chrono::Utc>,
    current_end: chrono::DateTime<chrono::Utc>,
    new_start: Option<chrono::DateTime<chrono::Utc>>,
    new_end: Option<chrono::DateTime<chrono::Utc>>,
) -> DomainResult<Option<(chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>)>> {
    let (start, end) = match (new_start, new_end) {
        (None, None) => return Ok(None),
        (Some(start), None) => (start, start + (current_end - current_start)),
        (None, Some(end)) => (current_start, end),
        (Some(start), Some(end)) => (start, end),
    };

    if end <= start {
        return Err(DomainError::invalid(
            vec!["input", "endAt"],
            format!("End time must be after start time: {start}."),
        ));
    }
    Ok(Some((start, end)))
}

fn override_blob(
    input: &UpdateInstanceInput,
    timing: Option<(chrono::DateTime<chrono::Utc>, chrono::DateTime<chrono::Utc>)>,
) -> Value {
    let mut data = Map::new();
    if let Some(name) = &input.name {
        data.insert("name".into(), json!(name));
    }
    if let Some(description) = &input.description {
        data.insert("description".into(), json!(description));
    }
    if let Some(location) = &input.location {
        data.insert("location".into(), json!(location));
    }
    if let Some(all_day) = input.all_day {
        data.insert("all_day".into(), json!(all_day));
    }
    if let Some(is_public) = input.is_public {
        data.insert("is_public".into(), json!(is_public));
    }
    if let Some(is_registerable) = input.is_registerable {
        data.insert("is_registerable".into(), json!(is_registerable));
    }
    if let Some(is_invite_only) = input.is_invite_only {
        data.insert("is_invite_only".into(), json!(is_invite_only));
    }
    if let Some((start, end)) = timing {
        data.insert("start_at".into(), json!(start.to_rfc3339()));
        data.insert("end_at".into(), json!(end.to_rfc3339()));
    }
    Value::Object(data)
}

/// Cancellation is terminal: a cancelled occurrence rejects every further
/// update.
fn check_not_cancelled(is_cancelled: bool) -> DomainResult<()> {
    if is_cancelled {
        return Err(DomainError::invalid(
            vec!["input", "id"],
            "Cannot update a cancelled recurring event instance.",
        ));
    }
    Ok(())
}

fn check_visibility(resolved_public: bool, resolved_invite_only: bool) -> DomainResult<()> {
    if resolved_public && resolved_invite_only {
        return Err(DomainError::invalid(
            vec!["input", "isPublic"],
            "Event cannot be both Public and Invite-Only simultaneously.",
        ));
    }
    Ok(())
}

/// ## Summary
/// Updates one occurrence of a recurring series without touching its
/// siblings.
///
/// The provided fields become (or merge into) the instance's override blob;
/// timing changes additionally rewrite the instance row under its optimistic
/// version check. Both writes happen in one transaction. Returns the
/// resolved post-update view.
///
/// ## Errors
/// - `unauthenticated` / `unauthorized_action` from the gates
/// - `arguments_associated_resources_not_found` for an unknown instance id
/// - `invalid_arguments` for an empty update, a cancelled instance, bad
///   timing, or a merged state that is both public and invite-only
#[tracing::instrument(skip(conn, actor, input), fields(instance_id = %input.id, user_id = %actor.user_id))]
pub async fn update_single_recurring_event_instance(
    conn: &mut DbConnection<'_>,
    actor: &Actor,
    input: &UpdateInstanceInput,
) -> ServiceResult<ResolvedEventInstance> {
    if !input.has_updates() {
        return Err(DomainError::invalid(
            vec!["input"],
            "At least one field to update must be provided.",
        )
        .into());
    }

    let target = instance::get_instance(conn, input.id)
        .await?
        .ok_or_else(|| DomainError::not_found(vec!["input", "id"]))?;

    check_not_cancelled(target.is_cancelled)?;

    let template = event::get_event(conn, target.base_recurring_event_id)
        .await?
        .ok_or(DomainError::Unexpected("instance has no template event"))?;

    auth::require_event_author(conn, actor, &template).await?;

    let timing = resolve_timing(
        target.actual_start_time,
        target.actual_end_time,
        input.start_at,
        input.end_at,
    )?;

    // Visibility is checked against the merged state the update produces,
    // not the patch alone.
    let stored = exception::get_for_instance(conn, target.id).await?;
    let pre_update = overlay::resolve_instance(
        &template,
        &target,
        stored.as_ref().map(|row| &row.exception_data),
    );
    check_visibility(
        input.is_public.unwrap_or(pre_update.is_public),
        input.is_invite_only.unwrap_or(pre_update.is_invite_only),
    )?;

    let new_exception = NewEventException {
        recurring_event_instance_id: target.id,
        exception_data: override_blob(input, timing),
        organization_id: target.organization_id,
        creator_id: actor.user_id,
    };

    let actor_id = actor.user_id;
    let expected_version = target.version;
    let target_id = target.id;

    let (merged_exception, updated_instance) = conn
        .transaction::<_, ServiceError, _>(move |tx| {
            async move {
                let merged =
                    exception::upsert_instance_exception(tx, &new_exception, actor_id).await?;
                let updated = if let Some((start, end)) = timing {
                    instance::update_timing(tx, target_id, expected_version, start, end).await?
                } else {
                    instance::get_instance(tx, target_id)
                        .await?
                        .ok_or(DomainError::Unexpected("instance vanished mid-update"))?
                };
                Ok((merged, updated))
            }
            .scope_boxed()
        })
        .await?;

    tracing::info!(version = updated_instance.version, "Instance updated");

    Ok(overlay::resolve_instance(
        &template,
        &updated_instance,
        Some(&merged_exception.exception_data),
    ))
}

/// ## Summary
/// Lists the resolved instances of a recurring series, ordered by sequence
/// number.
///
/// ## Errors
/// - `arguments_associated_resources_not_found` for an unknown event id
/// - `invalid_arguments` when the event is not a series template
pub async fn get_recurring_events(
    conn: &mut DbConnection<'_>,
    base_recurring_event_id: uuid::Uuid,
) -> ServiceResult<Vec<ResolvedEventInstance>> {
    let template = event::get_event(conn, base_recurring_event_id)
        .await?
        .ok_or_else(|| DomainError::not_found(vec!["input", "baseRecurringEventId"]))?;

    if !template.is_recurring_template {
        return Err(DomainError::invalid(
            vec!["input", "baseRecurringEventId"],
            "Event is not a recurring event template.",
        )
        .into());
    }

    let instances = list_series_instances(conn, &template).await?;
    Ok(instances)
}

async fn list_series_instances(
    conn: &mut DbConnection<'_>,
    template: &Event,
) -> ServiceResult<Vec<ResolvedEventInstance>> {
    use diesel::{QueryDsl, SelectableHelper};
    use diesel_async::RunQueryDsl;

    let rows: Vec<RecurringEventInstance> = instance::for_series(template.id)
        .select(RecurringEventInstance::as_select())
        .load(conn)
        .await
        .map_err(muster_db::error::DbError::from)?;

    let ids: Vec<uuid::Uuid> = rows.iter().map(|row| row.id).collect();
    let overrides: HashMap<uuid::Uuid, Value> = exception::for_instances(conn, &ids)
        .await?
        .into_iter()
        .map(|row| (row.recurring_event_instance_id, row.exception_data))
        .collect();

    Ok(overlay::resolve_instances(template, &rows, &overrides))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn utc(h: u32, mi: u32) -> chrono::DateTime<chrono::Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, h, mi, 0).unwrap()
    }

    #[test_log::test]
    fn untouched_timing_resolves_to_none() {
        let resolved = resolve_timing(utc(9, 0), utc(10, 0), None, None).unwrap();
        assert_eq!(resolved, None);
    }

    #[test_log::test]
    fn moving_start_preserves_duration() {
        let resolved = resolve_timing(utc(9, 0), utc(10, 30), Some(utc(14, 0)), None)
            .unwrap()
            .unwrap();
        assert_eq!(resolved, (utc(14, 0), utc(15, 30)));
    }

    #[test_log::test]
    fn moving_end_keeps_start() {
        let resolved = resolve_timing(utc(9, 0), utc(10, 0), None, Some(utc(11, 0)))
            .unwrap()
            .unwrap();
        assert_eq!(resolved, (utc(9, 0), utc(11, 0)));
    }

    #[test_log::test]
    fn end_before_start_is_rejected() {
        let err = resolve_timing(utc(9, 0), utc(10, 0), Some(utc(12, 0)), Some(utc(11, 0)))
            .unwrap_err();
        assert_eq!(err.code(), "invalid_arguments");
    }

    #[test_log::test]
    fn end_equal_to_start_is_rejected() {
        assert!(resolve_timing(utc(9, 0), utc(10, 0), Some(utc(11, 0)), Some(utc(11, 0))).is_err());
    }

    #[test_log::test]
    fn moving_end_behind_current_start_is_rejected() {
        assert!(resolve_timing(utc(9, 0), utc(10, 0), None, Some(utc(8, 0))).is_err());
    }

    #[test_log::test]
    fn visibility_conflict_is_rejected() {
        assert!(check_visibility(true, true).is_err());
        assert!(check_visibility(true, false).is_ok());
        assert!(check_visibility(false, true).is_ok());
    }

    #[test_log::test]
    fn cancelled_instance_rejects_updates() {
        let err = check_not_cancelled(true).unwrap_err();
        assert_eq!(err.code(), "invalid_arguments");
        assert_eq!(
            err.to_string(),
            "invalid arguments: Cannot update a cancelled recurring event instance."
        );
    }

    #[test_log::test]
    fn live_instance_passes_the_cancellation_gate() {
        assert!(check_not_cancelled(false).is_ok());
    }

    #[test_log::test]
    fn override_blob_skips_untouched_fields() {
        let input = UpdateInstanceInput {
            id: uuid::Uuid::new_v4(),
            name: Some("Renamed".into()),
            description: Some(None),
            ..UpdateInstanceInput::default()
        };
        let blob = override_blob(&input, None);

        assert_eq!(blob["name"], "Renamed");
        assert!(blob["description"].is_null());
        assert!(blob.get("location").is_none());
        assert!(blob.get("start_at").is_none());
    }

    #[test_log::test]
    fn override_blob_records_resolved_timing() {
        let input = UpdateInstanceInput {
            id: uuid::Uuid::new_v4(),
            start_at: Some(utc(14, 0)),
            ..UpdateInstanceInput::default()
        };
        let blob = override_blob(&input, Some((utc(14, 0), utc(15, 0))));

        assert_eq!(blob["start_at"], utc(14, 0).to_rfc3339());
        assert_eq!(blob["end_at"], utc(15, 0).to_rfc3339());
    }

    #[test_log::test]
    fn empty_input_reports_no_updates() {
        let input = UpdateInstanceInput {
            id: uuid::Uuid::new_v4(),
            ..UpdateInstanceInput::default()
        };
        assert!(!input.has_updates());
    }
}
