//! Recurrence engine
//!
//! Turns a [`RecurringPattern`] into dated occurrences. Every function here is
//! pure: the "today" anchor is a parameter, and nothing is persisted. The
//! [`RecurrenceService`] wrapper reads patterns through [`PatternSource`] for
//! callers that only hold an id.
//!
//! # Calendar policy
//!
//! Occurrence `k` is `base + k * step`, where `base` is the last generated
//! date or, for a never-generated pattern, the start date. A never-generated
//! pattern also occurs on its start date (k = 0); once something has been
//! generated, occurrences begin at k = 1. Steps are computed from the base
//! rather than from the previous occurrence, so a monthly pattern anchored on
//! Jan 31 yields Jan 31, Feb 28 then Mar 31.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::error::{ForecastError, ForecastResult};
use crate::models::projection::RECURRING_SUFFIX;
use crate::models::{
    CalendarDate, Frequency, Occurrence, PatternId, RecurringPattern, Transaction,
};
use crate::storage::PatternSource;

/// Upper bound on occurrences produced by a single expansion
pub const MAX_OCCURRENCES: usize = 100_000;

/// Calendar distance between two consecutive occurrences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Days(i64),
    Months(i64),
}

impl Step {
    pub fn of(pattern: &RecurringPattern) -> Self {
        let n = pattern.interval() as i64;
        match pattern.frequency {
            Frequency::Daily | Frequency::Custom => Step::Days(n),
            Frequency::Weekly => Step::Days(7 * n),
            Frequency::BiWeekly => Step::Days(14 * n),
            Frequency::Monthly => Step::Months(n),
            Frequency::Yearly => Step::Months(12 * n),
        }
    }

    /// `base` advanced by `k` steps
    pub fn advance(&self, base: NaiveDate, k: i64) -> NaiveDate {
        match *self {
            Step::Days(d) => base.add_days(d.saturating_mul(k)),
            Step::Months(m) => base.add_months(m.saturating_mul(k)),
        }
    }

    /// Smallest k >= `first` whose occurrence may land on or after `target`
    ///
    /// May undershoot by one for month steps; callers scan forward.
    fn first_index_near(&self, base: NaiveDate, target: NaiveDate, first: i64) -> i64 {
        let estimate = match *self {
            Step::Days(d) => base.diff_in_days(target).div_euclid(d),
            Step::Months(m) => months_between(base, target).div_euclid(m) - 1,
        };
        estimate.max(first)
    }
}

fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    use chrono::Datelike;
    (to.year() as i64 * 12 + to.month0() as i64) - (from.year() as i64 * 12 + from.month0() as i64)
}

/// Result of materializing one occurrence of a pattern
#[derive(Debug, Clone, PartialEq)]
pub enum Materialized {
    /// A transaction was produced and the pattern advanced
    Generated {
        transaction: Transaction,
        pattern: RecurringPattern,
    },
    /// The next occurrence falls after the end date; the pattern was switched off
    Deactivated(RecurringPattern),
    /// Nothing is due yet
    NotDue,
}

fn check(pattern: &RecurringPattern) -> ForecastResult<()> {
    pattern
        .validate()
        .map_err(|e| ForecastError::InvalidPattern(format!("{}: {}", pattern.id, e)))
}

/// The date occurrences are counted from
pub fn base_date(pattern: &RecurringPattern) -> NaiveDate {
    pattern.last_generated_date.unwrap_or(pattern.start_date)
}

/// Next date on which the pattern should produce a transaction
pub fn next_due_date(pattern: &RecurringPattern) -> ForecastResult<NaiveDate> {
    check(pattern)?;
    Ok(Step::of(pattern).advance(base_date(pattern), 1))
}

/// The occurrence immediately before [`next_due_date`]
pub fn previous_due_date(pattern: &RecurringPattern) -> ForecastResult<NaiveDate> {
    check(pattern)?;
    Ok(base_date(pattern))
}

/// Index of the first occurrence counted from [`base_date`]
fn first_index(pattern: &RecurringPattern) -> i64 {
    if pattern.last_generated_date.is_none() {
        0
    } else {
        1
    }
}

/// The earliest occurrence not yet generated
///
/// This is the start date for a never-generated pattern and
/// [`next_due_date`] afterwards.
pub fn pending_date(pattern: &RecurringPattern) -> ForecastResult<NaiveDate> {
    check(pattern)?;
    Ok(Step::of(pattern).advance(base_date(pattern), first_index(pattern)))
}

/// Whether the pattern has an outstanding occurrence as of `as_of`
///
/// Measured against [`next_due_date`], so a never-generated pattern only
/// turns due one step after its start; [`materialize`] produces the start
/// date itself before that.
pub fn is_due(pattern: &RecurringPattern, as_of: NaiveDate) -> ForecastResult<bool> {
    if !pattern.is_active || pattern.has_ended_by(as_of) {
        return Ok(false);
    }
    Ok(as_of >= next_due_date(pattern)?)
}

fn occurrence(pattern: &RecurringPattern, date: NaiveDate) -> Occurrence {
    Occurrence {
        pattern_id: pattern.id,
        account_id: pattern.account_id,
        date,
        kind: pattern.kind,
        amount: pattern.amount,
        signed_amount: pattern.signed_amount(),
        description: format!("{}{}", pattern.description, RECURRING_SUFFIX),
        category_id: pattern.category_id,
        transfer_to_account_id: pattern.transfer_to_account_id,
        is_projected: true,
    }
}

/// Expand an active pattern into occurrences dated within `[from, to]`
///
/// The sequence starts at [`pending_date`] and stops at `to` or the
/// pattern's end date, whichever comes first. Inactive patterns expand to
/// nothing.
pub fn expand(
    pattern: &RecurringPattern,
    from: NaiveDate,
    to: NaiveDate,
) -> ForecastResult<Vec<Occurrence>> {
    if to < from {
        return Err(ForecastError::OutOfRange(format!(
            "expansion ends {} before it starts {}",
            to, from
        )));
    }
    check(pattern)?;

    if !pattern.is_active {
        return Ok(Vec::new());
    }

    let step = Step::of(pattern);
    let base = base_date(pattern);
    let mut k = step.first_index_near(base, from, first_index(pattern));
    let mut occurrences = Vec::new();

    loop {
        let date = step.advance(base, k);
        if date > to || pattern.has_ended_by(date) {
            break;
        }
        if date >= from {
            if occurrences.len() >= MAX_OCCURRENCES {
                warn!(pattern = %pattern.id, "expansion truncated at {} occurrences", MAX_OCCURRENCES);
                break;
            }
            occurrences.push(occurrence(pattern, date));
        }
        if date == NaiveDate::MAX {
            break;
        }
        k += 1;
    }

    debug!(
        pattern = %pattern.id,
        %from,
        %to,
        count = occurrences.len(),
        "expanded recurring pattern"
    );
    Ok(occurrences)
}

/// Whether an occurrence of the pattern falls on `date`
///
/// Equivalent to `expand(pattern, date, date)` being non-empty; this is the
/// only "due on date" rule used by projections.
pub fn occurs_on(pattern: &RecurringPattern, date: NaiveDate) -> ForecastResult<bool> {
    Ok(!expand(pattern, date, date)?.is_empty())
}

/// The pattern's calendar grid anchored at its start date
///
/// Unlike [`expand`], the grid ignores materialization state and the end
/// date.
pub fn schedule(pattern: &RecurringPattern) -> impl Iterator<Item = NaiveDate> {
    let step = Step::of(pattern);
    let start = pattern.start_date;
    (0..).map(move |k| step.advance(start, k))
}

/// The next `count` occurrences, bounded by the end date
pub fn preview_next(pattern: &RecurringPattern, count: usize) -> ForecastResult<Vec<Occurrence>> {
    check(pattern)?;
    let step = Step::of(pattern);
    let base = base_date(pattern);
    let first = first_index(pattern);

    Ok((first..first + count as i64)
        .map(|k| step.advance(base, k))
        .take_while(|date| !pattern.has_ended_by(*date))
        .map(|date| occurrence(pattern, date))
        .collect())
}

/// Produce the pending transaction, or deactivate a finished pattern
///
/// The pending occurrence is the one [`expand`] would list first, so a
/// never-generated pattern materializes its start date before
/// [`next_due_date`]. Nothing is generated once `as_of` is past the end date;
/// a pattern whose pending date is past its end date is deactivated instead.
/// Pure: the caller persists the returned transaction and pattern together.
pub fn materialize(pattern: &RecurringPattern, as_of: NaiveDate) -> ForecastResult<Materialized> {
    if !pattern.is_active {
        return Ok(Materialized::NotDue);
    }

    let due = pending_date(pattern)?;
    if pattern.has_ended_by(due) {
        let mut finished = pattern.clone();
        finished.is_active = false;
        return Ok(Materialized::Deactivated(finished));
    }
    if pattern.has_ended_by(as_of) || as_of < due {
        return Ok(Materialized::NotDue);
    }

    let mut transaction = Transaction::new(
        pattern.account_id,
        pattern.kind,
        pattern.amount,
        pattern.description.clone(),
        due,
    )
    .with_pattern(pattern.id);
    transaction.category_id = pattern.category_id;
    transaction.transfer_to_account_id = pattern.transfer_to_account_id;

    let mut advanced = pattern.clone();
    advanced.last_generated_date = Some(due);
    if advanced.has_ended_by(Step::of(pattern).advance(due, 1)) {
        advanced.is_active = false;
    }

    Ok(Materialized::Generated {
        transaction,
        pattern: advanced,
    })
}

/// Advance past the pending occurrence without producing a transaction
pub fn skip_next(pattern: &RecurringPattern) -> ForecastResult<RecurringPattern> {
    let due = pending_date(pattern)?;
    let mut skipped = pattern.clone();
    skipped.last_generated_date = Some(due);
    Ok(skipped)
}

pub fn pause(pattern: &RecurringPattern) -> RecurringPattern {
    RecurringPattern {
        is_active: false,
        ..pattern.clone()
    }
}

pub fn resume(pattern: &RecurringPattern) -> RecurringPattern {
    RecurringPattern {
        is_active: true,
        ..pattern.clone()
    }
}

/// Pattern lookups by id on top of the pure engine
pub struct RecurrenceService<'a, S: PatternSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: PatternSource + ?Sized> RecurrenceService<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    fn load(&self, id: PatternId) -> ForecastResult<RecurringPattern> {
        self.source
            .pattern(id)?
            .ok_or_else(|| ForecastError::pattern_not_found(id.to_string()))
    }

    /// Expand a stored pattern over `[from, to]`
    pub fn expand_pattern(
        &self,
        id: PatternId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ForecastResult<Vec<Occurrence>> {
        expand(&self.load(id)?, from, to)
    }

    pub fn preview_pattern(&self, id: PatternId, count: usize) -> ForecastResult<Vec<Occurrence>> {
        preview_next(&self.load(id)?, count)
    }
}
