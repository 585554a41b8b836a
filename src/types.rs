use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tabled::Tabled;

/// One row of a `rent_information.csv` export. Every column is read as
/// text so that a single bad cell skips the row instead of failing the load.
#[derive(Debug, Deserialize)]
pub struct RawRentRow {
    pub rent_id: Option<String>,
    pub car_id: Option<String>,
    pub staff_id: Option<String>,
    pub return_date: Option<String>,
    pub pay_the_amount: Option<String>,
    pub return_amount: Option<String>,
}

/// One row of a `maintain_information.csv` export. The cost column keeps
/// the schema's spelling.
#[derive(Debug, Deserialize)]
pub struct RawMaintainRow {
    pub car_id: Option<String>,
    #[serde(rename = "maimtain_cost")]
    pub maintain_cost: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawStaffRow {
    pub staff_id: Option<String>,
    pub name: Option<String>,
}

/// A rental transaction as pulled from the store for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RentalRecord {
    pub rent_id: i64,
    pub car_id: i64,
    pub staff_id: Option<i64>,
    pub amount_paid: Decimal,
    pub amount_returned: Decimal,
    pub maintenance_cost: Option<Decimal>,
    pub return_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfitLine {
    pub car_id: i64,
    pub amount_paid: Decimal,
    pub amount_returned: Decimal,
    pub maintenance_cost: Decimal,
    pub profit: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressMetric {
    pub total_profit: Decimal,
    pub target_profit: Decimal,
    /// Always within `[0, 100]`.
    pub progress_percent: Decimal,
}

#[derive(Debug, Clone)]
pub struct ProgressReport {
    pub lines: Vec<ProfitLine>,
    pub metric: ProgressMetric,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyProfitPoint {
    pub date: NaiveDate,
    pub profit: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaffCarCount {
    pub staff_name: String,
    pub car_count: u64,
}

/// A staff member's slice of the distribution, ready for the pie chart.
#[derive(Debug, Clone, PartialEq)]
pub struct StaffShare {
    pub staff_name: String,
    pub car_count: u64,
    pub percent: f64,
    /// `percent` rounded to one decimal place, e.g. `"75.0%"`.
    pub label: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct ProfitLineRow {
    #[tabled(rename = "CarId")]
    pub car_id: i64,
    #[tabled(rename = "UserPayment")]
    pub amount_paid: String,
    #[tabled(rename = "ReturnPayment")]
    pub amount_returned: String,
    #[tabled(rename = "MaintainCost")]
    pub maintenance_cost: String,
    #[tabled(rename = "Profit")]
    pub profit: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct DailyProfitRow {
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "Profit")]
    pub profit: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct StaffShareRow {
    #[tabled(rename = "Staff")]
    pub staff_name: String,
    #[tabled(rename = "Cars")]
    pub car_count: u64,
    #[tabled(rename = "Share")]
    pub label: String,
}
