//! Query stage: read-only access to the rental ledger.
//!
//! [`MySqlStore`] talks to the live `car_rental_system` schema. Each fetch
//! opens its own connection, runs all of its statements on it and closes it
//! before returning, whether the statements succeeded or not.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Connection, MySqlConnection};

use crate::error::ReportResult;
use crate::reports::attach_maintenance;
use crate::types::RentalRecord;

#[async_trait]
pub trait RentalStore: Send + Sync {
    /// All rentals ordered by `rent_id`, maintenance attached per car.
    async fn fetch_rentals(&self) -> ReportResult<Vec<RentalRecord>>;

    /// `SUM(paid) - SUM(returned)` per return date in `[since, until]`,
    /// ascending by date.
    async fn fetch_daily_profit(
        &self,
        since: NaiveDate,
        until: NaiveDate,
    ) -> ReportResult<Vec<(NaiveDate, Decimal)>>;

    /// Rentals handled per staff member, staff without rentals excluded.
    async fn fetch_staff_car_counts(&self) -> ReportResult<Vec<(String, i64)>>;
}

const RENTALS_SQL: &str = "\
    SELECT CAST(rent_id AS SIGNED) AS rent_id, \
           CAST(car_id AS SIGNED) AS car_id, \
           CAST(staff_id AS SIGNED) AS staff_id, \
           pay_the_amount, return_amount, return_date \
    FROM rent_information \
    ORDER BY rent_id";

const MAINTENANCE_SQL: &str = "\
    SELECT CAST(car_id AS SIGNED) AS car_id, SUM(maimtain_cost) AS maintain_cost \
    FROM maintain_information \
    GROUP BY car_id";

const DAILY_PROFIT_SQL: &str = "\
    SELECT DATE(return_date) AS day, \
           SUM(pay_the_amount) - SUM(return_amount) AS profit \
    FROM rent_information \
    WHERE return_date >= ? AND DATE(return_date) <= ? \
    GROUP BY DATE(return_date) \
    ORDER BY DATE(return_date)";

const STAFF_CAR_COUNT_SQL: &str = "\
    SELECT s.name AS staff_name, COUNT(r.car_id) AS car_count \
    FROM rent_information r \
    JOIN staff s ON r.staff_id = s.staff_id \
    GROUP BY s.staff_id, s.name \
    ORDER BY s.staff_id";

#[derive(Debug, sqlx::FromRow)]
struct RentalRow {
    rent_id: i64,
    car_id: i64,
    staff_id: Option<i64>,
    pay_the_amount: Decimal,
    return_amount: Decimal,
    return_date: Option<NaiveDate>,
}

#[derive(Debug, sqlx::FromRow)]
struct MaintenanceRow {
    car_id: i64,
    maintain_cost: Option<Decimal>,
}

#[derive(Debug, sqlx::FromRow)]
struct DailyProfitRow {
    day: NaiveDate,
    profit: Option<Decimal>,
}

#[derive(Debug, sqlx::FromRow)]
struct StaffCountRow {
    staff_name: String,
    car_count: i64,
}

pub struct MySqlStore {
    database_url: String,
}

impl MySqlStore {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    async fn connect(&self) -> ReportResult<MySqlConnection> {
        let conn = MySqlConnection::connect(&self.database_url).await?;
        tracing::debug!("ledger connection opened");
        Ok(conn)
    }
}

/// Close a connection; a failed close is logged, never surfaced.
async fn release(conn: MySqlConnection) {
    if let Err(e) = conn.close().await {
        tracing::warn!(error = %e, "failed to close ledger connection");
    } else {
        tracing::debug!("ledger connection closed");
    }
}

async fn query_rentals(
    conn: &mut MySqlConnection,
) -> Result<(Vec<RentalRow>, Vec<MaintenanceRow>), sqlx::Error> {
    let rentals = sqlx::query_as::<_, RentalRow>(RENTALS_SQL)
        .fetch_all(&mut *conn)
        .await?;
    let maintenance = sqlx::query_as::<_, MaintenanceRow>(MAINTENANCE_SQL)
        .fetch_all(&mut *conn)
        .await?;
    Ok((rentals, maintenance))
}

#[async_trait]
impl RentalStore for MySqlStore {
    async fn fetch_rentals(&self) -> ReportResult<Vec<RentalRecord>> {
        let mut conn = self.connect().await?;
        let result = query_rentals(&mut conn).await;
        release(conn).await;
        let (rentals, maintenance) = result?;

        let records = rentals
            .into_iter()
            .map(|r| RentalRecord {
                rent_id: r.rent_id,
                car_id: r.car_id,
                staff_id: r.staff_id,
                amount_paid: r.pay_the_amount,
                amount_returned: r.return_amount,
                maintenance_cost: None,
                return_date: r.return_date,
            })
            .collect();
        let totals: Vec<(i64, Option<Decimal>)> = maintenance
            .into_iter()
            .map(|m| (m.car_id, m.maintain_cost))
            .collect();
        Ok(attach_maintenance(records, &totals))
    }

    async fn fetch_daily_profit(
        &self,
        since: NaiveDate,
        until: NaiveDate,
    ) -> ReportResult<Vec<(NaiveDate, Decimal)>> {
        let mut conn = self.connect().await?;
        let result = sqlx::query_as::<_, DailyProfitRow>(DAILY_PROFIT_SQL)
            .bind(since)
            .bind(until)
            .fetch_all(&mut conn)
            .await;
        release(conn).await;

        Ok(result?
            .into_iter()
            .map(|r| (r.day, r.profit.unwrap_or(Decimal::ZERO)))
            .collect())
    }

    async fn fetch_staff_car_counts(&self) -> ReportResult<Vec<(String, i64)>> {
        let mut conn = self.connect().await?;
        let result = sqlx::query_as::<_, StaffCountRow>(STAFF_CAR_COUNT_SQL)
            .fetch_all(&mut conn)
            .await;
        release(conn).await;

        Ok(result?
            .into_iter()
            .map(|r| (r.staff_name, r.car_count))
            .collect())
    }
}
