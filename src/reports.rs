// Aggregation stage shared by the three report pipelines.
//
// Everything here is pure: rows in, derived metrics out. Money stays in
// `Decimal` until the renderer needs floating point.
use crate::error::{ReportError, ReportResult};
use crate::types::{
    DailyProfitPoint, ProfitLine, ProgressMetric, ProgressReport, RentalRecord, StaffCarCount,
    StaffShare,
};
use chrono::{Days, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};

/// What to do with days inside the window that had no returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapFill {
    /// Days without activity are absent from the series.
    #[default]
    Omit,
    /// Every day of the window is present; quiet days carry zero profit.
    Zero,
}

/// The four parallel sequences the profit-progress report consumes.
///
/// Index `i` in every column must describe the same rental.
#[derive(Debug, Clone, Default)]
pub struct ProfitColumns {
    pub car_ids: Vec<i64>,
    pub paid: Vec<Decimal>,
    pub returned: Vec<Decimal>,
    pub costs: Vec<Option<Decimal>>,
}

impl ProfitColumns {
    pub fn from_records(records: &[RentalRecord]) -> Self {
        let mut cols = ProfitColumns::default();
        for r in records {
            cols.car_ids.push(r.car_id);
            cols.paid.push(r.amount_paid);
            cols.returned.push(r.amount_returned);
            cols.costs.push(r.maintenance_cost);
        }
        cols
    }

    fn check_aligned(&self) -> ReportResult<usize> {
        let n = self.car_ids.len();
        if self.paid.len() != n || self.returned.len() != n || self.costs.len() != n {
            return Err(ReportError::MisalignedInput(format!(
                "profit columns differ in length: car_ids={}, paid={}, returned={}, costs={}",
                n,
                self.paid.len(),
                self.returned.len(),
                self.costs.len()
            )));
        }
        Ok(n)
    }
}

pub fn validate_target(target_profit: Decimal) -> ReportResult<()> {
    if target_profit <= Decimal::ZERO {
        return Err(ReportError::InvalidConfiguration(format!(
            "target profit must be positive, got {}",
            target_profit
        )));
    }
    Ok(())
}

/// Attach per-car maintenance totals to rentals by `car_id`.
///
/// A car's total is charged once, against its first rental in `rent_id`
/// order; its later rentals keep `None`. `rentals` must already be ordered
/// by `rent_id`.
pub fn attach_maintenance(
    mut rentals: Vec<RentalRecord>,
    per_car_totals: &[(i64, Option<Decimal>)],
) -> Vec<RentalRecord> {
    let mut totals: HashMap<i64, Decimal> = HashMap::new();
    for (car_id, cost) in per_car_totals {
        let e = totals.entry(*car_id).or_insert(Decimal::ZERO);
        *e += cost.unwrap_or(Decimal::ZERO);
    }

    let mut charged: HashSet<i64> = HashSet::new();
    for r in &mut rentals {
        if charged.contains(&r.car_id) {
            continue;
        }
        if let Some(total) = totals.get(&r.car_id) {
            r.maintenance_cost = Some(*total);
            charged.insert(r.car_id);
        }
    }

    let orphaned = totals.keys().filter(|id| !charged.contains(id)).count();
    if orphaned > 0 {
        tracing::warn!(orphaned, "maintenance recorded for cars without rentals; not attributed");
    }
    rentals
}

/// Per-record profit, running total and capped progress against
/// `target_profit`.
pub fn aggregate_progress(
    columns: &ProfitColumns,
    target_profit: Decimal,
) -> ReportResult<ProgressReport> {
    validate_target(target_profit)?;
    let n = columns.check_aligned()?;

    let mut lines = Vec::with_capacity(n);
    let mut total_profit = Decimal::ZERO;
    for i in 0..n {
        let cost = columns.costs[i].unwrap_or(Decimal::ZERO);
        let profit = columns.paid[i] - columns.returned[i] - cost;
        total_profit += profit;
        tracing::debug!(car_id = columns.car_ids[i], %profit, "profit line");
        lines.push(ProfitLine {
            car_id: columns.car_ids[i],
            amount_paid: columns.paid[i],
            amount_returned: columns.returned[i],
            maintenance_cost: cost,
            profit,
        });
    }

    if total_profit.is_sign_negative() && !total_profit.is_zero() {
        tracing::warn!(%total_profit, "total profit is negative; progress clamped to 0");
    }
    // A tiny target can overflow the quotient; any positive profit has then
    // met it.
    let ratio = match total_profit.checked_div(target_profit) {
        Some(r) => r,
        None if total_profit > Decimal::ZERO => Decimal::ONE,
        None => Decimal::ZERO,
    }
    .min(Decimal::ONE)
        .max(Decimal::ZERO);

    Ok(ProgressReport {
        lines,
        metric: ProgressMetric {
            total_profit,
            target_profit,
            progress_percent: ratio * Decimal::ONE_HUNDRED,
        },
    })
}

/// Group records by return date: `SUM(paid) - SUM(returned)` per day within
/// `[since, until]`, ascending. Records without a return date are skipped.
pub fn bucket_daily_profit(
    records: &[RentalRecord],
    since: NaiveDate,
    until: NaiveDate,
) -> Vec<(NaiveDate, Decimal)> {
    let mut by_day: BTreeMap<NaiveDate, (Decimal, Decimal)> = BTreeMap::new();
    for r in records {
        let Some(day) = r.return_date else { continue };
        if day < since || day > until {
            continue;
        }
        let e = by_day.entry(day).or_insert((Decimal::ZERO, Decimal::ZERO));
        e.0 += r.amount_paid;
        e.1 += r.amount_returned;
    }
    by_day
        .into_iter()
        .map(|(day, (paid, returned))| (day, paid - returned))
        .collect()
}

/// First day of the trailing window ending at `today`.
///
/// Fails when the window reaches before the earliest representable date.
pub fn window_start(today: NaiveDate, window_days: u32) -> ReportResult<NaiveDate> {
    today
        .checked_sub_days(Days::new(u64::from(window_days)))
        .ok_or_else(|| {
            ReportError::InvalidConfiguration(format!(
                "window of {} days reaches before the earliest supported date",
                window_days
            ))
        })
}

/// Restrict pre-aggregated daily rows to `[today - window_days, today]`.
///
/// Input order is trusted: rows are expected ascending by date with one row
/// per day, and the output keeps the input order. Out-of-order input is
/// logged but not corrected.
pub fn window_daily_profit(
    rows: &[(NaiveDate, Decimal)],
    today: NaiveDate,
    window_days: u32,
    gap_fill: GapFill,
) -> ReportResult<Vec<DailyProfitPoint>> {
    let start = window_start(today, window_days)?;

    if rows.windows(2).any(|w| w[0].0 >= w[1].0) {
        tracing::warn!("daily profit rows are not strictly ascending; chart order follows input");
    }

    let points = match gap_fill {
        GapFill::Omit => rows
            .iter()
            .filter(|(day, _)| *day >= start && *day <= today)
            .map(|(day, profit)| DailyProfitPoint {
                date: *day,
                profit: *profit,
            })
            .collect(),
        GapFill::Zero => {
            let mut by_day: HashMap<NaiveDate, Decimal> = HashMap::new();
            for (day, profit) in rows {
                *by_day.entry(*day).or_insert(Decimal::ZERO) += *profit;
            }
            start
                .iter_days()
                .take_while(|day| *day <= today)
                .map(|day| DailyProfitPoint {
                    date: day,
                    profit: by_day.get(&day).copied().unwrap_or(Decimal::ZERO),
                })
                .collect()
        }
    };
    Ok(points)
}

/// Turn grouped `(staff, count)` rows into pie slices, keeping source order.
///
/// Rows with a non-positive count are dropped; a zero total is rejected.
pub fn staff_distribution(rows: &[(String, i64)]) -> ReportResult<Vec<StaffShare>> {
    let counts: Vec<StaffCarCount> = rows
        .iter()
        .filter_map(|(name, count)| {
            let car_count = u64::try_from(*count).ok().filter(|c| *c > 0)?;
            Some(StaffCarCount {
                staff_name: name.clone(),
                car_count,
            })
        })
        .collect();

    let total: u64 = counts.iter().map(|c| c.car_count).sum();
    if total == 0 {
        return Err(ReportError::InvalidConfiguration(
            "no rentals recorded for any staff member; distribution is undefined".to_string(),
        ));
    }

    Ok(counts
        .into_iter()
        .map(|c| {
            let percent = c.car_count as f64 / total as f64 * 100.0;
            StaffShare {
                label: format!("{:.1}%", percent),
                staff_name: c.staff_name,
                car_count: c.car_count,
                percent,
            }
        })
        .collect())
}

/// Progress as `f64` for chart drawing.
pub fn progress_as_f64(metric: &ProgressMetric) -> f64 {
    metric.progress_percent.to_f64().unwrap_or(0.0).clamp(0.0, 100.0)
}
