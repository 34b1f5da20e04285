//! Rule expansion: turns a structured recurrence rule into the ordered,
//! gap-free occurrence sequence that instance materialization persists.

use chrono::{DateTime, TimeDelta, Utc};
use rrule::{RRule, Tz, Unvalidated};

use crate::constants::MAX_EXPANSION_OCCURRENCES;
use crate::error::{CoreError, CoreResult};

/// Recurrence frequency supported by rule rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    #[must_use]
    pub const fn as_rrule_str(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_rrule_str())
    }
}

/// Structured recurrence rule, already resolved from storage.
///
/// `by_day` holds RFC weekday tokens (`MO`, `WE`) with an optional ordinal
/// prefix for monthly patterns (`2FR` = second Friday).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRuleSpec {
    pub frequency: Frequency,
    pub interval: u16,
    pub count: Option<u32>,
    pub until: Option<DateTime<Utc>>,
    pub by_day: Vec<String>,
    pub by_month: Vec<u8>,
    pub by_month_day: Vec<i8>,
}

impl RecurrenceRuleSpec {
    /// A rule is bounded when either `count` or `until` terminates it.
    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.count.is_some() || self.until.is_some()
    }

    /// Renders the rule as RRULE text for the `rrule` crate.
    ///
    /// `COUNT` wins over `UNTIL` in the rendered text when both are present;
    /// the tighter bound is still enforced during expansion.
    fn to_rrule_string(&self) -> CoreResult<String> {
        if self.interval == 0 {
            return Err(CoreError::ValidationError(
                "recurrence interval must be at least 1".into(),
            ));
        }

        for token in &self.by_day {
            if !is_valid_by_day_token(token) {
                return Err(CoreError::ValidationError(format!(
                    "invalid BYDAY token: {token}"
                )));
            }
        }
        if let Some(month) = self.by_month.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(CoreError::ValidationError(format!(
                "invalid BYMONTH value: {month}"
            )));
        }
        if let Some(day) = self
            .by_month_day
            .iter()
            .find(|d| **d == 0 || !(-31..=31).contains(*d))
        {
            return Err(CoreError::ValidationError(format!(
                "invalid BYMONTHDAY value: {day}"
            )));
        }

        let mut parts = vec![format!("FREQ={}", self.frequency.as_rrule_str())];
        if self.interval > 1 {
            parts.push(format!("INTERVAL={}", self.interval));
        }
        if let Some(count) = self.count {
            parts.push(format!("COUNT={count}"));
        } else if let Some(until) = self.until {
            parts.push(format!("UNTIL={}", until.format("%Y%m%dT%H%M%SZ")));
        }
        if !self.by_day.is_empty() {
            parts.push(format!("BYDAY={}", self.by_day.join(",")));
        }
        if !self.by_month.is_empty() {
            let months: Vec<String> = self.by_month.iter().map(ToString::to_string).collect();
            parts.push(format!("BYMONTH={}", months.join(",")));
        }
        if !self.by_month_day.is_empty() {
            let days: Vec<String> = self.by_month_day.iter().map(ToString::to_string).collect();
            parts.push(format!("BYMONTHDAY={}", days.join(",")));
        }

        Ok(parts.join(";"))
    }
}

fn is_valid_by_day_token(token: &str) -> bool {
    const DAY_CODES: [&str; 7] = ["SU", "MO", "TU", "WE", "TH", "FR", "SA"];

    let Some(day) = token.get(token.len().saturating_sub(2)..) else {
        return false;
    };
    if !DAY_CODES.contains(&day) {
        return false;
    }
    let ordinal = &token[..token.len() - 2];
    if ordinal.is_empty() {
        return true;
    }
    matches!(ordinal.parse::<i8>(), Ok(n) if n != 0 && (-5..=5).contains(&n))
}

/// One concrete occurrence of a series, prior to any per-instance override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    /// 1-based position in the series, strictly increasing and gap-free.
    pub sequence_number: i32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Result of expanding a rule over a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub occurrences: Vec<Occurrence>,
    /// Total size of the series when it is bounded; `None` for never-ending
    /// rules that were only cut off by the caller's horizon.
    pub total_count: Option<i32>,
}

/// ## Summary
/// Expands a recurrence rule into its ordered occurrence sequence.
///
/// Sequence numbers always count from the start of the series, so re-expanding
/// with a later horizon extends the sequence without renumbering. `horizon`
/// bounds the returned occurrences (inclusive); it is mandatory for rules
/// with neither `count` nor `until`.
///
/// ## Errors
/// Returns a validation error for an unbounded rule without a horizon, an
/// invalid rule (interval, BYDAY/BYMONTH/BYMONTHDAY values, RRULE rejection),
/// a non-positive duration, or expansion past the hard occurrence cap.
#[tracing::instrument(skip(spec), fields(frequency = %spec.frequency))]
pub fn expand(
    spec: &RecurrenceRuleSpec,
    dtstart: DateTime<Utc>,
    duration: TimeDelta,
    horizon: Option<DateTime<Utc>>,
) -> CoreResult<Expansion> {
    if duration <= TimeDelta::zero() {
        return Err(CoreError::ValidationError(
            "event duration must be positive".into(),
        ));
    }
    if !spec.is_bounded() && horizon.is_none() {
        return Err(CoreError::ValidationError(
            "recurrence rule has neither count nor end date and no horizon was supplied".into(),
        ));
    }

    let rrule_text = spec.to_rrule_string()?;
    tracing::trace!(rrule = %rrule_text, %dtstart, "Expanding recurrence rule");

    let rrule = rrule_text
        .parse::<RRule<Unvalidated>>()
        .map_err(|err| CoreError::ValidationError(err.to_string()))?;
    let mut rrule_set = rrule
        .build(dtstart.with_timezone(&Tz::UTC))
        .map_err(|err| CoreError::ValidationError(err.to_string()))?;

    // A bounded rule is expanded in full so the series length is exact; the
    // horizon only trims the returned list. Unbounded rules lean on the
    // horizon to terminate iteration.
    if !spec.is_bounded() {
        if let Some(horizon) = horizon {
            rrule_set = rrule_set.before(horizon.with_timezone(&Tz::UTC));
        }
    }

    let result = rrule_set.all(MAX_EXPANSION_OCCURRENCES);
    if result.limited {
        return Err(CoreError::ValidationError(format!(
            "recurrence rule expands past the supported limit of {MAX_EXPANSION_OCCURRENCES} occurrences"
        )));
    }

    // COUNT and UNTIL can both be present on a rule row; the rendered text
    // carries COUNT, so UNTIL is enforced here when it binds first.
    let starts: Vec<DateTime<Utc>> = result
        .dates
        .into_iter()
        .map(|date| date.with_timezone(&Utc))
        .filter(|start| spec.until.is_none_or(|until| *start <= until))
        .collect();

    let total_count = if spec.is_bounded() {
        Some(i32::try_from(starts.len()).map_err(|_| {
            CoreError::InvariantViolation("bounded expansion exceeds i32 occurrence count")
        })?)
    } else {
        None
    };

    let occurrences = starts
        .into_iter()
        .enumerate()
        .filter(|(_, start)| horizon.is_none_or(|horizon| *start <= horizon))
        .map(|(index, start)| {
            let sequence_number = i32::try_from(index + 1)
                .map_err(|_| CoreError::InvariantViolation("sequence number exceeds i32"))?;
            Ok(Occurrence {
                sequence_number,
                start,
                end: start + duration,
            })
        })
        .collect::<CoreResult<Vec<_>>>()?;

    tracing::debug!(
        occurrences = occurrences.len(),
        total_count = ?total_count,
        "Recurrence rule expanded"
    );

    Ok(Expansion {
        occurrences,
        total_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn weekly(count: Option<u32>, until: Option<DateTime<Utc>>) -> RecurrenceRuleSpec {
        RecurrenceRuleSpec {
            frequency: Frequency::Weekly,
            interval: 1,
            count,
            until,
            by_day: vec![],
            by_month: vec![],
            by_month_day: vec![],
        }
    }

    #[test_log::test]
    fn weekly_count_three_materializes_three_sundays() {
        let spec = weekly(Some(3), None);
        let expansion = expand(
            &spec,
            utc(2024, 12, 1, 10, 0),
            TimeDelta::hours(2),
            None,
        )
        .unwrap();

        assert_eq!(expansion.total_count, Some(3));
        let seqs: Vec<i32> = expansion
            .occurrences
            .iter()
            .map(|o| o.sequence_number)
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);

        let starts: Vec<DateTime<Utc>> = expansion.occurrences.iter().map(|o| o.start).collect();
        assert_eq!(
            starts,
            vec![
                utc(2024, 12, 1, 10, 0),
                utc(2024, 12, 8, 10, 0),
                utc(2024, 12, 15, 10, 0),
            ]
        );
        for occurrence in &expansion.occurrences {
            assert_eq!(occurrence.end - occurrence.start, TimeDelta::hours(2));
        }
    }

    #[test_log::test]
    fn expansion_is_deterministic() {
        let spec = weekly(Some(5), None);
        let first = expand(&spec, utc(2025, 1, 6, 9, 0), TimeDelta::minutes(30), None).unwrap();
        let second = expand(&spec, utc(2025, 1, 6, 9, 0), TimeDelta::minutes(30), None).unwrap();
        assert_eq!(first, second);
    }

    #[test_log::test]
    fn daily_interval_two_skips_alternate_days() {
        let spec = RecurrenceRuleSpec {
            frequency: Frequency::Daily,
            interval: 2,
            count: Some(4),
            until: None,
            by_day: vec![],
            by_month: vec![],
            by_month_day: vec![],
        };
        let expansion =
            expand(&spec, utc(2025, 1, 1, 8, 0), TimeDelta::hours(1), None).unwrap();
        let starts: Vec<DateTime<Utc>> = expansion.occurrences.iter().map(|o| o.start).collect();
        assert_eq!(
            starts,
            vec![
                utc(2025, 1, 1, 8, 0),
                utc(2025, 1, 3, 8, 0),
                utc(2025, 1, 5, 8, 0),
                utc(2025, 1, 7, 8, 0),
            ]
        );
    }

    #[test_log::test]
    fn until_bound_computes_total_count() {
        let spec = RecurrenceRuleSpec {
            frequency: Frequency::Daily,
            interval: 1,
            count: None,
            until: Some(utc(2025, 1, 5, 10, 0)),
            by_day: vec![],
            by_month: vec![],
            by_month_day: vec![],
        };
        let expansion =
            expand(&spec, utc(2025, 1, 1, 10, 0), TimeDelta::hours(1), None).unwrap();
        assert_eq!(expansion.total_count, Some(5));
        assert_eq!(expansion.occurrences.len(), 5);
    }

    #[test_log::test]
    fn horizon_trims_bounded_series_without_renumbering() {
        let spec = weekly(Some(10), None);
        let expansion = expand(
            &spec,
            utc(2024, 12, 1, 10, 0),
            TimeDelta::hours(1),
            Some(utc(2024, 12, 20, 0, 0)),
        )
        .unwrap();

        // Three Sundays fall on or before the horizon; the series is still 10 long.
        assert_eq!(expansion.occurrences.len(), 3);
        assert_eq!(expansion.total_count, Some(10));
        assert_eq!(expansion.occurrences[2].sequence_number, 3);
    }

    #[test_log::test]
    fn unbounded_rule_requires_horizon() {
        let spec = weekly(None, None);
        let err = expand(&spec, utc(2025, 1, 1, 10, 0), TimeDelta::hours(1), None).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[test_log::test]
    fn unbounded_rule_with_horizon_has_no_total() {
        let spec = RecurrenceRuleSpec {
            frequency: Frequency::Daily,
            interval: 1,
            count: None,
            until: None,
            by_day: vec![],
            by_month: vec![],
            by_month_day: vec![],
        };
        let expansion = expand(
            &spec,
            utc(2025, 1, 1, 10, 0),
            TimeDelta::hours(1),
            Some(utc(2025, 1, 3, 23, 59)),
        )
        .unwrap();
        assert_eq!(expansion.total_count, None);
        let starts: Vec<DateTime<Utc>> = expansion.occurrences.iter().map(|o| o.start).collect();
        assert_eq!(
            starts,
            vec![
                utc(2025, 1, 1, 10, 0),
                utc(2025, 1, 2, 10, 0),
                utc(2025, 1, 3, 10, 0),
            ]
        );
    }

    #[test_log::test]
    fn weekly_by_day_filters_weekdays() {
        let spec = RecurrenceRuleSpec {
            frequency: Frequency::Weekly,
            interval: 1,
            count: Some(4),
            until: None,
            by_day: vec!["MO".into(), "WE".into()],
            by_month: vec![],
            by_month_day: vec![],
        };
        // 2025-01-06 is a Monday.
        let expansion =
            expand(&spec, utc(2025, 1, 6, 10, 0), TimeDelta::hours(1), None).unwrap();
        let starts: Vec<DateTime<Utc>> = expansion.occurrences.iter().map(|o| o.start).collect();
        assert_eq!(
            starts,
            vec![
                utc(2025, 1, 6, 10, 0),
                utc(2025, 1, 8, 10, 0),
                utc(2025, 1, 13, 10, 0),
                utc(2025, 1, 15, 10, 0),
            ]
        );
    }

    #[test_log::test]
    fn rejects_invalid_by_day_token() {
        let mut spec = weekly(Some(2), None);
        spec.by_day = vec!["XX".into()];
        let err = expand(&spec, utc(2025, 1, 1, 10, 0), TimeDelta::hours(1), None).unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[test_log::test]
    fn rejects_zero_interval_and_zero_duration() {
        let mut spec = weekly(Some(2), None);
        spec.interval = 0;
        assert!(expand(&spec, utc(2025, 1, 1, 10, 0), TimeDelta::hours(1), None).is_err());

        let spec = weekly(Some(2), None);
        assert!(expand(&spec, utc(2025, 1, 1, 10, 0), TimeDelta::zero(), None).is_err());
    }

    #[test_log::test]
    fn by_day_token_validation() {
        assert!(is_valid_by_day_token("MO"));
        assert!(is_valid_by_day_token("2FR"));
        assert!(is_valid_by_day_token("-1SU"));
        assert!(!is_valid_by_day_token(""));
        assert!(!is_valid_by_day_token("0MO"));
        assert!(!is_valid_by_day_token("6TU"));
        assert!(!is_valid_by_day_token("MONDAY"));
    }
}
