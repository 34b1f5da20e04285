//! Exception overlay: merges a series template, a materialized instance and
//! its sparse override blob into the single resolved view callers see.

use serde_json::Value;

use muster_db::model::event::Event;
use muster_db::model::instance::RecurringEventInstance;

/// Fully resolved view of one occurrence.
///
/// Field precedence is template, then the instance row's own timing and
/// cancellation state, then the override blob. An absent key in the blob
/// leaves the inherited value alone; an explicit JSON `null` clears a
/// nullable field.
#[expect(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ResolvedEventInstance {
    pub id: uuid::Uuid,
    pub base_recurring_event_id: uuid::Uuid,
    pub organization_id: uuid::Uuid,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_at: chrono::DateTime<chrono::Utc>,
    pub end_at: chrono::DateTime<chrono::Utc>,
    pub all_day: bool,
    pub is_public: bool,
    pub is_registerable: bool,
    pub is_invite_only: bool,
    pub is_cancelled: bool,
    /// Whether this occurrence carries any field override at all.
    pub has_exceptions: bool,
    pub sequence_number: i32,
    pub total_count: Option<i32>,
    pub version: i32,
}

fn string_override(overrides: Option<&Value>, key: &str, inherited: String) -> String {
    match overrides.and_then(|data| data.get(key)) {
        Some(Value::String(text)) => text.clone(),
        _ => inherited,
    }
}

fn nullable_string_override(
    overrides: Option<&Value>,
    key: &str,
    inherited: Option<String>,
) -> Option<String> {
    match overrides.and_then(|data| data.get(key)) {
        Some(Value::String(text)) => Some(text.clone()),
        // Explicit null clears the inherited value.
        Some(Value::Null) => None,
        _ => inherited,
    }
}

fn bool_override(overrides: Option<&Value>, key: &str, inherited: bool) -> bool {
    match overrides.and_then(|data| data.get(key)) {
        Some(Value::Bool(flag)) => *flag,
        _ => inherited,
    }
}

fn datetime_override(
    overrides: Option<&Value>,
    key: &str,
    inherited: chrono::DateTime<chrono::Utc>,
) -> chrono::DateTime<chrono::Utc> {
    overrides
        .and_then(|data| data.get(key))
        .and_then(Value::as_str)
        .and_then(|text| chrono::DateTime::parse_from_rfc3339(text).ok())
        .map_or(inherited, |parsed| parsed.with_timezone(&chrono::Utc))
}

/// ## Summary
/// Resolves one instance against its template and override blob.
///
/// The instance row's `actual_*` timing already reflects committed updates,
/// so timing keys in the blob only matter for views assembled before the row
/// catches up; the row wins by being the inherited value the blob overrides.
#[must_use]
pub fn resolve_instance(
    template: &Event,
    instance: &RecurringEventInstance,
    overrides: Option<&Value>,
) -> ResolvedEventInstance {
    ResolvedEventInstance {
        id: instance.id,
        base_recurring_event_id: instance.base_recurring_event_id,
        organization_id: instance.organization_id,
        name: string_override(overrides, "name", template.name.clone()),
        description: nullable_string_override(
            overrides,
            "description",
            template.description.clone(),
        ),
        location: nullable_string_override(overrides, "location", template.location.clone()),
        start_at: datetime_override(overrides, "start_at", instance.actual_start_time),
        end_at: datetime_override(overrides, "end_at", instance.actual_end_time),
        all_day: bool_override(overrides, "all_day", template.all_day),
        is_public: bool_override(overrides, "is_public", template.is_public),
        is_registerable: bool_override(overrides, "is_registerable", template.is_registerable),
        is_invite_only: bool_override(overrides, "is_invite_only", template.is_invite_only),
        is_cancelled: bool_override(overrides, "is_cancelled", instance.is_cancelled),
        has_exceptions: overrides
            .and_then(Value::as_object)
            .is_some_and(|data| !data.is_empty()),
        sequence_number: instance.sequence_number,
        total_count: instance.total_count,
        version: instance.version,
    }
}

/// Resolves a batch of instances of one series against a shared template.
///
/// `overrides_by_instance` pairs instance ids with their override blobs;
/// instances without a row inherit the template unchanged.
#[must_use]
pub fn resolve_instances(
    template: &Event,
    instances: &[RecurringEventInstance],
    overrides_by_instance: &std::collections::HashMap<uuid::Uuid, Value>,
) -> Vec<ResolvedEventInstance> {
    instances
        .iter()
        .map(|instance| {
            resolve_instance(template, instance, overrides_by_instance.get(&instance.id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn template() -> Event {
        Event {
            id: uuid::Uuid::new_v4(),
            organization_id: uuid::Uuid::new_v4(),
            creator_id: uuid::Uuid::new_v4(),
            name: "Food Drive".into(),
            description: Some("Monthly food drive".into()),
            location: Some("Community Hall".into()),
            start_at: Utc.with_ymd_and_hms(2025, 1, 4, 9, 0, 0).unwrap(),
            end_at: Utc.with_ymd_and_hms(2025, 1, 4, 12, 0, 0).unwrap(),
            all_day: false,
            is_public: true,
            is_registerable: true,
            is_invite_only: false,
            is_recurring_template: true,
            created_at: Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap(),
            updated_at: None,
        }
    }

    fn instance_of(template: &Event, sequence_number: i32) -> RecurringEventInstance {
        let start = Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap();
        RecurringEventInstance {
            id: uuid::Uuid::new_v4(),
            base_recurring_event_id: template.id,
            recurrence_rule_id: uuid::Uuid::new_v4(),
            original_instance_start_time: start,
            actual_start_time: start,
            actual_end_time: start + chrono::TimeDelta::hours(3),
            sequence_number,
            total_count: Some(12),
            is_cancelled: false,
            organization_id: template.organization_id,
            version: 1,
            generated_at: Utc::now(),
            last_updated_at: None,
        }
    }

    #[test_log::test]
    fn no_overrides_inherits_template_and_instance_timing() {
        let template = template();
        let instance = instance_of(&template, 2);
        let resolved = resolve_instance(&template, &instance, None);

        assert_eq!(resolved.name, "Food Drive");
        assert_eq!(resolved.description.as_deref(), Some("Monthly food drive"));
        assert_eq!(resolved.start_at, instance.actual_start_time);
        assert_eq!(resolved.end_at, instance.actual_end_time);
        assert!(!resolved.is_cancelled);
        assert!(!resolved.has_exceptions);
        assert_eq!(resolved.sequence_number, 2);
    }

    #[test_log::test]
    fn present_keys_override_inherited_values() {
        let template = template();
        let instance = instance_of(&template, 1);
        let overrides = json!({
            "name": "Food Drive (Special Edition)",
            "is_registerable": false,
            "is_cancelled": true,
        });
        let resolved = resolve_instance(&template, &instance, Some(&overrides));

        assert_eq!(resolved.name, "Food Drive (Special Edition)");
        assert!(!resolved.is_registerable);
        assert!(resolved.is_cancelled);
        assert!(resolved.has_exceptions);
        // Untouched fields still come from the template.
        assert_eq!(resolved.location.as_deref(), Some("Community Hall"));
    }

    #[test_log::test]
    fn explicit_null_clears_nullable_fields() {
        let template = template();
        let instance = instance_of(&template, 1);
        let overrides = json!({ "description": null, "location": null });
        let resolved = resolve_instance(&template, &instance, Some(&overrides));

        assert_eq!(resolved.description, None);
        assert_eq!(resolved.location, None);
    }

    #[test_log::test]
    fn absent_key_differs_from_explicit_null() {
        let template = template();
        let instance = instance_of(&template, 1);
        let overrides = json!({ "location": null });
        let resolved = resolve_instance(&template, &instance, Some(&overrides));

        assert_eq!(resolved.location, None);
        assert_eq!(resolved.description.as_deref(), Some("Monthly food drive"));
    }

    #[test_log::test]
    fn timing_overrides_parse_rfc3339() {
        let template = template();
        let instance = instance_of(&template, 1);
        let overrides = json!({ "start_at": "2025-02-01T10:30:00Z" });
        let resolved = resolve_instance(&template, &instance, Some(&overrides));

        assert_eq!(
            resolved.start_at,
            Utc.with_ymd_and_hms(2025, 2, 1, 10, 30, 0).unwrap()
        );
        assert_eq!(resolved.end_at, instance.actual_end_time);
    }

    #[test_log::test]
    fn batch_resolution_pairs_overrides_by_instance_id() {
        let template = template();
        let first = instance_of(&template, 1);
        let second = instance_of(&template, 2);
        let mut overrides = std::collections::HashMap::new();
        overrides.insert(second.id, json!({ "name": "Renamed" }));

        let resolved =
            resolve_instances(&template, &[first, second], &overrides);
        assert_eq!(resolved[0].name, "Food Drive");
        assert_eq!(resolved[1].name, "Renamed");
    }
}
