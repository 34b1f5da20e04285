use diesel::{pg::Pg, prelude::*};

use muster_core::constants::DEFAULT_RECURRENCE_INTERVAL;
use muster_core::error::{CoreError, CoreResult};
use muster_core::recurrence::RecurrenceRuleSpec;

use crate::db::{enums::RuleFrequency, schema};

/// Recurrence rule owned 1:1 by its series template.
///
/// `latest_instance_date` is the generation high-water mark: the original
/// start time of the newest instance materialized so far.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = schema::recurrence_rule)]
#[diesel(check_for_backend(Pg))]
#[diesel(belongs_to(crate::model::event::Event, foreign_key = base_recurring_event_id))]
pub struct RecurrenceRule {
    pub id: uuid::Uuid,
    pub base_recurring_event_id: uuid::Uuid,
    pub frequency: RuleFrequency,
    pub interval: i32,
    pub count: Option<i32>,
    pub recurrence_start_date: chrono::DateTime<chrono::Utc>,
    pub recurrence_end_date: Option<chrono::DateTime<chrono::Utc>>,
    pub by_day: Option<Vec<String>>,
    pub by_month: Option<Vec<i32>>,
    pub by_month_day: Option<Vec<i32>>,
    pub latest_instance_date: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl RecurrenceRule {
    /// ## Summary
    /// Converts the stored row into the expander's rule spec.
    ///
    /// ## Errors
    /// Returns a validation error when stored values fall outside the ranges
    /// the expander accepts (interval, BYMONTH, BYMONTHDAY).
    pub fn to_spec(&self) -> CoreResult<RecurrenceRuleSpec> {
        spec_from_parts(
            self.frequency,
            self.interval,
            self.count,
            self.recurrence_end_date,
            self.by_day.as_deref(),
            self.by_month.as_deref(),
            self.by_month_day.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::recurrence_rule)]
pub struct NewRecurrenceRule {
    pub base_recurring_event_id: uuid::Uuid,
    pub frequency: RuleFrequency,
    pub interval: i32,
    pub count: Option<i32>,
    pub recurrence_start_date: chrono::DateTime<chrono::Utc>,
    pub recurrence_end_date: Option<chrono::DateTime<chrono::Utc>>,
    pub by_day: Option<Vec<String>>,
    pub by_month: Option<Vec<i32>>,
    pub by_month_day: Option<Vec<i32>>,
}

impl NewRecurrenceRule {
    /// ## Summary
    /// Converts the pending row into the expander's rule spec, so a rule can
    /// be validated before it is ever inserted.
    ///
    /// ## Errors
    /// Same validation errors as [`RecurrenceRule::to_spec`].
    pub fn to_spec(&self) -> CoreResult<RecurrenceRuleSpec> {
        spec_from_parts(
            self.frequency,
            self.interval,
            self.count,
            self.recurrence_end_date,
            self.by_day.as_deref(),
            self.by_month.as_deref(),
            self.by_month_day.as_deref(),
        )
    }
}

fn spec_from_parts(
    frequency: RuleFrequency,
    interval: i32,
    count: Option<i32>,
    until: Option<chrono::DateTime<chrono::Utc>>,
    by_day: Option<&[String]>,
    by_month: Option<&[i32]>,
    by_month_day: Option<&[i32]>,
) -> CoreResult<RecurrenceRuleSpec> {
    let interval = if interval == 0 {
        DEFAULT_RECURRENCE_INTERVAL
    } else {
        u16::try_from(interval).map_err(|_| {
            CoreError::ValidationError(format!("invalid recurrence interval: {interval}"))
        })?
    };
    let count = count
        .map(|count| {
            u32::try_from(count)
                .map_err(|_| CoreError::ValidationError(format!("invalid recurrence count: {count}")))
        })
        .transpose()?;
    let by_month = by_month
        .unwrap_or_default()
        .iter()
        .map(|month| {
            u8::try_from(*month)
                .map_err(|_| CoreError::ValidationError(format!("invalid BYMONTH value: {month}")))
        })
        .collect::<CoreResult<Vec<_>>>()?;
    let by_month_day = by_month_day
        .unwrap_or_default()
        .iter()
        .map(|day| {
            i8::try_from(*day)
                .map_err(|_| CoreError::ValidationError(format!("invalid BYMONTHDAY value: {day}")))
        })
        .collect::<CoreResult<Vec<_>>>()?;

    Ok(RecurrenceRuleSpec {
        frequency: frequency.into(),
        interval,
        count,
        until,
        by_day: by_day.unwrap_or_default().to_vec(),
        by_month,
        by_month_day,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use muster_core::recurrence::Frequency;

    fn rule_row() -> RecurrenceRule {
        RecurrenceRule {
            id: uuid::Uuid::new_v4(),
            base_recurring_event_id: uuid::Uuid::new_v4(),
            frequency: RuleFrequency::Weekly,
            interval: 2,
            count: Some(8),
            recurrence_start_date: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            recurrence_end_date: None,
            by_day: Some(vec!["MO".into(), "FR".into()]),
            by_month: None,
            by_month_day: None,
            latest_instance_date: None,
            created_at: Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test_log::test]
    fn spec_conversion_carries_all_fields() {
        let spec = rule_row().to_spec().unwrap();
        assert_eq!(spec.frequency, Frequency::Weekly);
        assert_eq!(spec.interval, 2);
        assert_eq!(spec.count, Some(8));
        assert_eq!(spec.until, None);
        assert_eq!(spec.by_day, vec!["MO".to_string(), "FR".to_string()]);
    }

    #[test_log::test]
    fn zero_interval_falls_back_to_default() {
        let mut row = rule_row();
        row.interval = 0;
        assert_eq!(row.to_spec().unwrap().interval, 1);
    }

    #[test_log::test]
    fn negative_count_is_rejected() {
        let mut row = rule_row();
        row.count = Some(-3);
        assert!(row.to_spec().is_err());
    }

    #[test_log::test]
    fn pending_rule_converts_before_insert() {
        let pending = NewRecurrenceRule {
            base_recurring_event_id: uuid::Uuid::new_v4(),
            frequency: RuleFrequency::Monthly,
            interval: 1,
            count: None,
            recurrence_start_date: Utc.with_ymd_and_hms(2025, 5, 1, 18, 0, 0).unwrap(),
            recurrence_end_date: Some(Utc.with_ymd_and_hms(2026, 5, 1, 18, 0, 0).unwrap()),
            by_day: None,
            by_month: None,
            by_month_day: Some(vec![15]),
        };
        let spec = pending.to_spec().unwrap();
        assert_eq!(spec.frequency, Frequency::Monthly);
        assert_eq!(spec.by_month_day, vec![15]);
        assert!(spec.is_bounded());
    }

    #[test_log::test]
    fn pending_rule_rejects_out_of_range_month() {
        let pending = NewRecurrenceRule {
            base_recurring_event_id: uuid::Uuid::new_v4(),
            frequency: RuleFrequency::Yearly,
            interval: 1,
            count: Some(3),
            recurrence_start_date: Utc.with_ymd_and_hms(2025, 5, 1, 18, 0, 0).unwrap(),
            recurrence_end_date: None,
            by_day: None,
            by_month: Some(vec![400]),
            by_month_day: None,
        };
        assert!(pending.to_spec().is_err());
    }
}
