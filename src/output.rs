use crate::types::{
    DailyProfitPoint, DailyProfitRow, ProfitLine, ProfitLineRow, ProgressMetric, StaffShare,
    StaffShareRow,
};
use crate::util::format_decimal;
use tabled::{settings::Style, Table, Tabled};

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
    if rows.len() > max_rows {
        println!("({} more rows not shown)\n", rows.len() - max_rows);
    }
}

pub fn profit_rows(lines: &[ProfitLine]) -> Vec<ProfitLineRow> {
    lines
        .iter()
        .map(|l| ProfitLineRow {
            car_id: l.car_id,
            amount_paid: format_decimal(l.amount_paid, 2),
            amount_returned: format_decimal(l.amount_returned, 2),
            maintenance_cost: format_decimal(l.maintenance_cost, 2),
            profit: format_decimal(l.profit, 2),
        })
        .collect()
}

pub fn daily_rows(points: &[DailyProfitPoint]) -> Vec<DailyProfitRow> {
    points
        .iter()
        .map(|p| DailyProfitRow {
            date: p.date.format("%Y-%m-%d").to_string(),
            profit: format_decimal(p.profit, 2),
        })
        .collect()
}

pub fn staff_rows(shares: &[StaffShare]) -> Vec<StaffShareRow> {
    shares
        .iter()
        .map(|s| StaffShareRow {
            staff_name: s.staff_name.clone(),
            car_count: s.car_count,
            label: s.label.clone(),
        })
        .collect()
}

pub fn progress_summary(metric: &ProgressMetric) -> String {
    format!(
        "Total profit {} of target {} ({}%)",
        format_decimal(metric.total_profit, 2),
        format_decimal(metric.target_profit, 2),
        format_decimal(metric.progress_percent, 1)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn profit_rows_are_formatted() {
        let rows = profit_rows(&[ProfitLine {
            car_id: 3,
            amount_paid: dec!(1200),
            amount_returned: dec!(200),
            maintenance_cost: dec!(0),
            profit: dec!(1000),
        }]);
        assert_eq!(rows[0].amount_paid, "1,200.00");
        assert_eq!(rows[0].maintenance_cost, "0.00");
        assert_eq!(rows[0].profit, "1,000.00");
    }

    #[test]
    fn daily_rows_use_iso_dates() {
        let rows = daily_rows(&[DailyProfitPoint {
            date: NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
            profit: dec!(-10),
        }]);
        assert_eq!(rows[0].date, "2024-05-03");
        assert_eq!(rows[0].profit, "-10.00");
    }

    #[test]
    fn summary_mentions_percent() {
        let metric = ProgressMetric {
            total_profit: dec!(220),
            target_profit: dec!(1000),
            progress_percent: dec!(22),
        };
        assert_eq!(
            progress_summary(&metric),
            "Total profit 220.00 of target 1,000.00 (22.0%)"
        );
    }
}
