//! Instance materialization: keeps the rolling window of concrete occurrence
//! rows filled for every recurring series.

use chrono::{Months, Utc};

use muster_core::error::CoreError;
use muster_db::db::connection::DbConnection;
use muster_db::db::query::{instance, rule};
use muster_db::model::event::Event;
use muster_db::model::instance::NewRecurringEventInstance;
use muster_db::model::recurrence_rule::RecurrenceRule;

use crate::error::{ServiceError, ServiceResult};

/// Outcome of one materialization pass over a single series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// Occurrences the rule produced inside the window.
    pub candidates: usize,
    /// Rows actually inserted; the rest already existed.
    pub inserted: usize,
}

/// Totals for one sweep over every recurring series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    /// Series the sweep attempted (templates found).
    pub series: usize,
    /// Series whose materialization failed; the rest of the sweep ran anyway.
    pub failed: usize,
    /// Instance rows inserted across all successful series.
    pub inserted: usize,
}

fn summarize<I>(outcomes: I) -> SweepSummary
where
    I: IntoIterator<Item = Result<GenerationOutcome, ServiceError>>,
{
    let mut summary = SweepSummary::default();
    for outcome in outcomes {
        summary.series += 1;
        match outcome {
            Ok(outcome) => summary.inserted += outcome.inserted,
            Err(_) => summary.failed += 1,
        }
    }
    summary
}

/// ## Summary
/// Materializes the missing instances of one series up to `window_end`.
///
/// Expansion always starts from the series start, so sequence numbers are
/// stable across runs; rows that already exist are skipped by the conflict
/// target rather than re-read up front. The rule's high-water mark is
/// advanced to the newest generated occurrence afterwards.
///
/// Safe to run concurrently for the same series: both runs compute the same
/// candidate rows and the unique constraint arbitrates the inserts.
///
/// ## Errors
/// Returns expansion validation errors or database errors.
#[tracing::instrument(skip(conn, template, rule_row), fields(event_id = %template.id))]
pub async fn ensure_instances(
    conn: &mut DbConnection<'_>,
    template: &Event,
    rule_row: &RecurrenceRule,
    window_end: chrono::DateTime<chrono::Utc>,
) -> ServiceResult<GenerationOutcome> {
    let spec = rule_row.to_spec()?;
    let duration = template.end_at - template.start_at;
    let horizon = Some(window_end);

    let expansion = muster_core::recurrence::expand(
        &spec,
        rule_row.recurrence_start_date,
        duration,
        horizon,
    )?;

    let rows: Vec<NewRecurringEventInstance> = expansion
        .occurrences
        .iter()
        .map(|occurrence| NewRecurringEventInstance {
            base_recurring_event_id: template.id,
            recurrence_rule_id: rule_row.id,
            original_instance_start_time: occurrence.start,
            actual_start_time: occurrence.start,
            actual_end_time: occurrence.end,
            sequence_number: occurrence.sequence_number,
            total_count: expansion.total_count,
            organization_id: template.organization_id,
        })
        .collect();

    let inserted = instance::insert_missing(conn, &rows).await?;

    if let Some(last) = expansion.occurrences.last() {
        rule::advance_latest_instance_date(conn, rule_row.id, last.start).await?;
    }

    tracing::info!(
        candidates = rows.len(),
        inserted,
        "Materialization pass complete"
    );

    Ok(GenerationOutcome {
        candidates: rows.len(),
        inserted,
    })
}

/// ## Summary
/// Runs one materialization sweep over every recurring series.
///
/// The window extends `window_months` from now. A series whose template is
/// missing is skipped with a warning, and a series whose materialization
/// fails is logged and counted without stopping the rest of the sweep, so
/// one pathological rule cannot starve every other series.
///
/// ## Errors
/// Returns an error only when the sweep itself cannot run (listing the
/// rules, loading a template, or an unrepresentable window).
#[tracing::instrument(skip(conn))]
pub async fn sweep_all_series(
    conn: &mut DbConnection<'_>,
    window_months: u32,
) -> ServiceResult<SweepSummary> {
    let window_end = Utc::now()
        .checked_add_months(Months::new(window_months))
        .ok_or(CoreError::InvariantViolation(
            "generation window overflows the calendar",
        ))?;

    let rules = rule::all_rules(conn).await?;
    let mut outcomes = Vec::with_capacity(rules.len());

    for rule_row in &rules {
        let Some(template) =
            muster_db::db::query::event::get_event(conn, rule_row.base_recurring_event_id).await?
        else {
            tracing::warn!(
                rule_id = %rule_row.id,
                event_id = %rule_row.base_recurring_event_id,
                "Recurrence rule has no template event; skipping"
            );
            continue;
        };

        let outcome = ensure_instances(conn, &template, rule_row, window_end).await;
        if let Err(err) = &outcome {
            tracing::error!(
                rule_id = %rule_row.id,
                event_id = %template.id,
                error = %err,
                "Materialization failed for series; continuing sweep"
            );
        }
        outcomes.push(outcome);
    }

    let summary = summarize(outcomes);
    tracing::info!(
        series = summary.series,
        failed = summary.failed,
        inserted = summary.inserted,
        "Generation sweep complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(inserted: usize) -> Result<GenerationOutcome, ServiceError> {
        Ok(GenerationOutcome {
            candidates: inserted,
            inserted,
        })
    }

    fn failure() -> Result<GenerationOutcome, ServiceError> {
        Err(ServiceError::CoreError(CoreError::ValidationError(
            "recurrence rule expands past the supported limit".into(),
        )))
    }

    #[test_log::test]
    fn failing_series_does_not_drop_later_outcomes() {
        let summary = summarize(vec![outcome(3), failure(), outcome(2)]);
        assert_eq!(summary.series, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.inserted, 5);
    }

    #[test_log::test]
    fn all_failures_still_count_every_series() {
        let summary = summarize(vec![failure(), failure()]);
        assert_eq!(summary.series, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.inserted, 0);
    }

    #[test_log::test]
    fn empty_sweep_summarizes_to_zero() {
        assert_eq!(summarize(vec![]), SweepSummary::default());
    }
}

