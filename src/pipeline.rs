//! The three report pipelines: query, aggregate, render.
//!
//! Each run validates configuration before touching the store and renders
//! only after aggregation has fully succeeded. Pipelines share nothing, so
//! one failing does not stop the others in [`ReportRunner::run_all`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::config::ReportConfig;
use crate::error::{ReportError, ReportResult};
use crate::output;
use crate::render::ChartRenderer;
use crate::reports::{
    aggregate_progress, staff_distribution, window_daily_profit, window_start, ProfitColumns,
};
use crate::store::RentalStore;
use crate::types::{DailyProfitPoint, ProgressReport, StaffShare};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Progress,
    Daily,
    Staff,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [ReportKind::Progress, ReportKind::Daily, ReportKind::Staff];

    pub fn title(self) -> &'static str {
        match self {
            ReportKind::Progress => "Total Profit Progress",
            ReportKind::Daily => "Recent Daily Profit",
            ReportKind::Staff => "Staff Vehicle Management Distribution",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportKind::Progress => "progress",
            ReportKind::Daily => "daily",
            ReportKind::Staff => "staff",
        })
    }
}

impl FromStr for ReportKind {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "progress" => Ok(ReportKind::Progress),
            "daily" => Ok(ReportKind::Daily),
            "staff" => Ok(ReportKind::Staff),
            other => Err(ReportError::InvalidConfiguration(format!(
                "unknown report '{other}', expected progress, daily or staff"
            ))),
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub enum ReportOutcome {
    Progress(ProgressReport),
    Daily(Vec<DailyProfitPoint>),
    Staff(Vec<StaffShare>),
}

impl ReportOutcome {
    pub fn summary(&self) -> String {
        match self {
            ReportOutcome::Progress(report) => output::progress_summary(&report.metric),
            ReportOutcome::Daily(points) => format!("{} day(s) plotted", points.len()),
            ReportOutcome::Staff(shares) => format!("{} staff member(s) plotted", shares.len()),
        }
    }
}

pub struct ReportRunner<'a, S: RentalStore, R: ChartRenderer> {
    config: &'a ReportConfig,
    store: &'a S,
    renderer: &'a R,
    /// When false, nothing is printed to stdout.
    preview: bool,
}

impl<'a, S: RentalStore, R: ChartRenderer> ReportRunner<'a, S, R> {
    pub fn new(config: &'a ReportConfig, store: &'a S, renderer: &'a R) -> Self {
        Self {
            config,
            store,
            renderer,
            preview: true,
        }
    }

    pub fn quiet(mut self) -> Self {
        self.preview = false;
        self
    }

    pub fn output_path(&self, kind: ReportKind) -> &PathBuf {
        match kind {
            ReportKind::Progress => &self.config.progress_chart,
            ReportKind::Daily => &self.config.daily_chart,
            ReportKind::Staff => &self.config.staff_chart,
        }
    }

    pub async fn run(&self, kind: ReportKind, today: NaiveDate) -> ReportResult<ReportOutcome> {
        let result = match kind {
            ReportKind::Progress => self.run_progress().await.map(ReportOutcome::Progress),
            ReportKind::Daily => self.run_daily(today).await.map(ReportOutcome::Daily),
            ReportKind::Staff => self.run_staff().await.map(ReportOutcome::Staff),
        };
        if let Err(e) = &result {
            tracing::error!(report = %kind, error = %e, "report failed");
        }
        result
    }

    /// Run every report independently, in a fixed order.
    pub async fn run_all(
        &self,
        today: NaiveDate,
    ) -> Vec<(ReportKind, ReportResult<ReportOutcome>)> {
        let mut results = Vec::with_capacity(ReportKind::ALL.len());
        for kind in ReportKind::ALL {
            results.push((kind, self.run(kind, today).await));
        }
        results
    }

    pub async fn run_progress(&self) -> ReportResult<ProgressReport> {
        self.config.validate()?;
        tracing::info!(target_profit = %self.config.target_profit, "profit progress report started");

        let records = self.store.fetch_rentals().await?;
        let report = aggregate_progress(&ProfitColumns::from_records(&records), self.config.target_profit)?;

        if self.preview {
            println!("{}\n", ReportKind::Progress.title());
            output::preview_table_rows(&output::profit_rows(&report.lines), 20);
        }

        let path = self.output_path(ReportKind::Progress);
        self.renderer.render_gauge(&report.metric, path)?;
        tracing::info!(
            records = report.lines.len(),
            progress = %report.metric.progress_percent,
            path = %path.display(),
            "profit progress chart written"
        );
        Ok(report)
    }

    pub async fn run_daily(&self, today: NaiveDate) -> ReportResult<Vec<DailyProfitPoint>> {
        self.config.validate()?;
        let since = window_start(today, self.config.window_days)?;
        tracing::info!(%since, %today, "daily profit report started");

        let rows = self.store.fetch_daily_profit(since, today).await?;
        let points =
            window_daily_profit(&rows, today, self.config.window_days, self.config.gap_fill)?;

        if self.preview {
            println!("{}\n", ReportKind::Daily.title());
            output::preview_table_rows(&output::daily_rows(&points), 40);
        }

        let path = self.output_path(ReportKind::Daily);
        self.renderer.render_line(&points, path)?;
        tracing::info!(points = points.len(), path = %path.display(), "daily profit chart written");
        Ok(points)
    }

    pub async fn run_staff(&self) -> ReportResult<Vec<StaffShare>> {
        self.config.validate()?;
        tracing::info!("staff distribution report started");

        let rows = self.store.fetch_staff_car_counts().await?;
        let shares = staff_distribution(&rows)?;

        if self.preview {
            println!("{}\n", ReportKind::Staff.title());
            output::preview_table_rows(&output::staff_rows(&shares), 20);
        }

        let path = self.output_path(ReportKind::Staff);
        self.renderer.render_pie(&shares, path)?;
        tracing::info!(staff = shares.len(), path = %path.display(), "staff distribution chart written");
        Ok(shares)
    }
}
