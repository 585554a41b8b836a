// Offline ledger source: CSV exports of the rental tables.
//
// Mirrors the live store's queries so reports can be produced from a dump
// without a database. Rows missing a required cell are skipped and counted.
use crate::error::ReportResult;
use crate::reports::{attach_maintenance, bucket_daily_profit};
use crate::store::RentalStore;
use crate::types::{RawMaintainRow, RawRentRow, RawStaffRow, RentalRecord};
use crate::util::{format_int, parse_date_safe, parse_decimal_safe, parse_i64_safe};
use async_trait::async_trait;
use chrono::NaiveDate;
use csv::ReaderBuilder;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const RENT_FILE: &str = "rent_information.csv";
pub const MAINTAIN_FILE: &str = "maintain_information.csv";
pub const STAFF_FILE: &str = "staff.csv";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
}

impl LoadReport {
    fn log(&self, file: &str) {
        if self.parse_errors > 0 {
            tracing::warn!(
                file,
                skipped = %format_int(self.parse_errors as u64),
                "rows skipped due to parse/validation errors"
            );
        }
        tracing::debug!(
            file,
            total = %format_int(self.total_rows as u64),
            loaded = %format_int(self.loaded_rows as u64),
            "ledger file loaded"
        );
    }
}

pub struct CsvLedger {
    dir: PathBuf,
}

impl CsvLedger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    /// Load `rent_information.csv`, sorted by `rent_id`.
    pub fn load_rentals(&self) -> ReportResult<(Vec<RentalRecord>, LoadReport)> {
        let mut rdr = reader(&self.path(RENT_FILE))?;
        let mut report = LoadReport::default();
        let mut rentals: Vec<RentalRecord> = Vec::new();

        for result in rdr.deserialize::<RawRentRow>() {
            report.total_rows += 1;
            let row = match result {
                Ok(r) => r,
                Err(_) => {
                    report.parse_errors += 1;
                    continue;
                }
            };

            let (Some(rent_id), Some(car_id), Some(amount_paid), Some(amount_returned)) = (
                parse_i64_safe(row.rent_id.as_deref()),
                parse_i64_safe(row.car_id.as_deref()),
                parse_decimal_safe(row.pay_the_amount.as_deref()),
                parse_decimal_safe(row.return_amount.as_deref()),
            ) else {
                report.parse_errors += 1;
                continue;
            };

            rentals.push(RentalRecord {
                rent_id,
                car_id,
                staff_id: parse_i64_safe(row.staff_id.as_deref()),
                amount_paid,
                amount_returned,
                maintenance_cost: None,
                return_date: parse_date_safe(row.return_date.as_deref()),
            });
        }

        rentals.sort_by_key(|r| r.rent_id);
        report.loaded_rows = rentals.len();
        report.log(RENT_FILE);
        Ok((rentals, report))
    }

    /// Per-car maintenance totals from `maintain_information.csv`. A missing
    /// file means no maintenance has been recorded.
    pub fn load_maintenance(&self) -> ReportResult<(Vec<(i64, Option<Decimal>)>, LoadReport)> {
        let path = self.path(MAINTAIN_FILE);
        let mut report = LoadReport::default();
        if !path.exists() {
            return Ok((Vec::new(), report));
        }

        let mut rdr = reader(&path)?;
        let mut totals: Vec<(i64, Option<Decimal>)> = Vec::new();
        for result in rdr.deserialize::<RawMaintainRow>() {
            report.total_rows += 1;
            let row = match result {
                Ok(r) => r,
                Err(_) => {
                    report.parse_errors += 1;
                    continue;
                }
            };
            let Some(car_id) = parse_i64_safe(row.car_id.as_deref()) else {
                report.parse_errors += 1;
                continue;
            };
            totals.push((car_id, parse_decimal_safe(row.maintain_cost.as_deref())));
        }

        report.loaded_rows = totals.len();
        report.log(MAINTAIN_FILE);
        Ok((totals, report))
    }

    /// `staff.csv` in file order.
    pub fn load_staff(&self) -> ReportResult<(Vec<(i64, String)>, LoadReport)> {
        let mut rdr = reader(&self.path(STAFF_FILE))?;
        let mut report = LoadReport::default();
        let mut staff: Vec<(i64, String)> = Vec::new();

        for result in rdr.deserialize::<RawStaffRow>() {
            report.total_rows += 1;
            let row = match result {
                Ok(r) => r,
                Err(_) => {
                    report.parse_errors += 1;
                    continue;
                }
            };
            let staff_id = parse_i64_safe(row.staff_id.as_deref());
            let name = row.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
            let (Some(staff_id), Some(name)) = (staff_id, name) else {
                report.parse_errors += 1;
                continue;
            };
            staff.push((staff_id, name));
        }

        report.loaded_rows = staff.len();
        report.log(STAFF_FILE);
        Ok((staff, report))
    }
}

fn reader(path: &Path) -> ReportResult<csv::Reader<std::fs::File>> {
    Ok(ReaderBuilder::new().flexible(true).trim(csv::Trim::All).from_path(path)?)
}

/// Rentals per staff member in staff-file order, members without rentals
/// left out.
pub fn count_by_staff(staff: &[(i64, String)], rentals: &[RentalRecord]) -> Vec<(String, i64)> {
    let mut per_staff: HashMap<i64, i64> = HashMap::new();
    for r in rentals {
        if let Some(id) = r.staff_id {
            *per_staff.entry(id).or_insert(0) += 1;
        }
    }
    staff
        .iter()
        .filter_map(|(id, name)| per_staff.get(id).map(|count| (name.clone(), *count)))
        .collect()
}

#[async_trait]
impl RentalStore for CsvLedger {
    async fn fetch_rentals(&self) -> ReportResult<Vec<RentalRecord>> {
        let (rentals, _) = self.load_rentals()?;
        let (totals, _) = self.load_maintenance()?;
        Ok(attach_maintenance(rentals, &totals))
    }

    async fn fetch_daily_profit(
        &self,
        since: NaiveDate,
        until: NaiveDate,
    ) -> ReportResult<Vec<(NaiveDate, Decimal)>> {
        let (rentals, _) = self.load_rentals()?;
        Ok(bucket_daily_profit(&rentals, since, until))
    }

    async fn fetch_staff_car_counts(&self) -> ReportResult<Vec<(String, i64)>> {
        let (staff, _) = self.load_staff()?;
        let (rentals, _) = self.load_rentals()?;
        Ok(count_by_staff(&staff, &rentals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use std::fs;

    fn ledger(files: &[(&str, &str)]) -> (tempfile::TempDir, CsvLedger) {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            fs::write(dir.path().join(name), body).unwrap();
        }
        let ledger = CsvLedger::new(dir.path());
        (dir, ledger)
    }

    const RENTS: &str = "\
rent_id,car_id,staff_id,user_id,rent_date,return_date,pay_the_amount,return_amount
2,11,1,5,2024-05-01,2024-05-03,200,50
1,10,1,4,2024-04-28,2024-05-01,100,20
3,10,2,4,2024-05-02,,\"1,000\",0
4,12,2,6,2024-05-02,2024-05-03,oops,0
";

    #[test]
    fn rentals_are_sorted_and_bad_rows_counted() {
        let (_dir, ledger) = ledger(&[(RENT_FILE, RENTS)]);
        let (rentals, report) = ledger.load_rentals().unwrap();

        let ids: Vec<i64> = rentals.iter().map(|r| r.rent_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(rentals[2].amount_paid, dec!(1000));
        assert_eq!(rentals[2].return_date, None);
        assert_eq!(
            report,
            LoadReport { total_rows: 4, loaded_rows: 3, parse_errors: 1 }
        );
    }

    #[tokio::test]
    async fn fetch_rentals_attaches_maintenance_by_car() {
        let maintain = "maintain_id,car_id,maintain_date,maimtain_cost\n1,10,2024-05-01,10\n2,99,2024-05-01,\n";
        let (_dir, ledger) = ledger(&[(RENT_FILE, RENTS), (MAINTAIN_FILE, maintain)]);
        let rentals = ledger.fetch_rentals().await.unwrap();

        assert_eq!(rentals[0].car_id, 10);
        assert_eq!(rentals[0].maintenance_cost, Some(dec!(10)));
        assert_eq!(rentals[1].maintenance_cost, None);
        assert_eq!(rentals[2].maintenance_cost, None);
    }

    #[tokio::test]
    async fn missing_maintenance_file_means_no_costs() {
        let (_dir, ledger) = ledger(&[(RENT_FILE, RENTS)]);
        let rentals = ledger.fetch_rentals().await.unwrap();
        assert!(rentals.iter().all(|r| r.maintenance_cost.is_none()));
    }

    #[tokio::test]
    async fn daily_profit_grouped_by_return_date() {
        let (_dir, ledger) = ledger(&[(RENT_FILE, RENTS)]);
        let since = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let until = NaiveDate::from_ymd_opt(2024, 5, 31).unwrap();
        let rows = ledger.fetch_daily_profit(since, until).await.unwrap();

        assert_eq!(
            rows,
            vec![
                (NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), dec!(80)),
                (NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(), dec!(150)),
            ]
        );
    }

    #[tokio::test]
    async fn staff_counts_follow_staff_file_order() {
        let staff = "staff_id,name,position\n2,Bob,clerk\n1,Alice,manager\n3,Carol,clerk\n";
        let (_dir, ledger) = ledger(&[(RENT_FILE, RENTS), (STAFF_FILE, staff)]);
        let counts = ledger.fetch_staff_car_counts().await.unwrap();

        assert_eq!(counts, vec![("Bob".to_string(), 1), ("Alice".to_string(), 2)]);
    }

    #[tokio::test]
    async fn missing_rent_file_is_source_unavailable() {
        let (_dir, ledger) = ledger(&[]);
        assert_matches!(
            ledger.fetch_rentals().await,
            Err(ReportError::SourceUnavailable(_))
        );
    }
}
