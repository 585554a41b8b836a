// Report configuration, read from the environment (and `.env`).
use crate::error::{ReportError, ReportResult};
use crate::reports::{validate_target, GapFill};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_TARGET_PROFIT: i64 = 1000;
pub const DEFAULT_WINDOW_DAYS: u32 = 30;
/// Longest trailing window accepted, roughly ten years.
pub const MAX_WINDOW_DAYS: u32 = 3650;
pub const DEFAULT_OUTPUT_DIR: &str = "plot";
pub const DEFAULT_LEDGER_DIR: &str = "ledger";

pub const PROGRESS_CHART_FILE: &str = "total_profit_progress.png";
pub const DAILY_CHART_FILE: &str = "recent_day_profit_plot.png";
pub const STAFF_CHART_FILE: &str = "staff_manage_car_plot.png";

#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    MySql { database_url: String },
    Csv { ledger_dir: PathBuf },
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub source: DataSource,
    /// Total profit that counts as 100% progress.
    pub target_profit: Decimal,
    pub window_days: u32,
    pub gap_fill: GapFill,
    pub progress_chart: PathBuf,
    pub daily_chart: PathBuf,
    pub staff_chart: PathBuf,
    /// TrueType/OpenType font for chart text; charts carry no text without it.
    pub font_path: Option<PathBuf>,
}

impl ReportConfig {
    pub fn from_env() -> ReportResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset and blank values fall back
    /// to defaults; malformed values are rejected.
    pub fn from_lookup<F>(lookup: F) -> ReportResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let source = match get("REPORT_SOURCE").as_deref().unwrap_or("mysql") {
            "mysql" => DataSource::MySql {
                database_url: get("DATABASE_URL").ok_or_else(|| {
                    ReportError::InvalidConfiguration(
                        "DATABASE_URL must be set when REPORT_SOURCE is mysql".to_string(),
                    )
                })?,
            },
            "csv" => DataSource::Csv {
                ledger_dir: PathBuf::from(
                    get("LEDGER_DIR").unwrap_or_else(|| DEFAULT_LEDGER_DIR.to_string()),
                ),
            },
            other => {
                return Err(ReportError::InvalidConfiguration(format!(
                    "REPORT_SOURCE must be mysql or csv, got {other}"
                )))
            }
        };

        let target_profit = match get("TARGET_PROFIT") {
            Some(v) => Decimal::from_str(&v).map_err(|_| {
                ReportError::InvalidConfiguration(format!("TARGET_PROFIT is not a number: {v}"))
            })?,
            None => Decimal::from(DEFAULT_TARGET_PROFIT),
        };

        let window_days = match get("WINDOW_DAYS") {
            Some(v) => v.parse::<u32>().map_err(|_| {
                ReportError::InvalidConfiguration(format!("WINDOW_DAYS is not a day count: {v}"))
            })?,
            None => DEFAULT_WINDOW_DAYS,
        };

        let gap_fill = match get("FILL_MISSING_DAYS").as_deref() {
            None | Some("false") | Some("0") | Some("no") => GapFill::Omit,
            Some("true") | Some("1") | Some("yes") => GapFill::Zero,
            Some(other) => {
                return Err(ReportError::InvalidConfiguration(format!(
                    "FILL_MISSING_DAYS must be true or false, got {other}"
                )))
            }
        };

        let output_dir =
            PathBuf::from(get("REPORT_OUTPUT_DIR").unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()));
        let chart_path = |key: &str, file: &str| {
            get(key)
                .map(PathBuf::from)
                .unwrap_or_else(|| output_dir.join(file))
        };

        let config = ReportConfig {
            source,
            target_profit,
            window_days,
            gap_fill,
            progress_chart: chart_path("PROGRESS_CHART_PATH", PROGRESS_CHART_FILE),
            daily_chart: chart_path("DAILY_CHART_PATH", DAILY_CHART_FILE),
            staff_chart: chart_path("STAFF_CHART_PATH", STAFF_CHART_FILE),
            font_path: get("CHART_FONT_PATH").map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ReportResult<()> {
        validate_target(self.target_profit)?;
        if self.window_days == 0 {
            return Err(ReportError::InvalidConfiguration(
                "window_days must be at least 1".to_string(),
            ));
        }
        if self.window_days > MAX_WINDOW_DAYS {
            return Err(ReportError::InvalidConfiguration(format!(
                "window_days must be at most {}, got {}",
                MAX_WINDOW_DAYS, self.window_days
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ReportResult<ReportConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ReportConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_for_csv_source() {
        let config = config_from(&[("REPORT_SOURCE", "csv")]).unwrap();

        assert_eq!(
            config.source,
            DataSource::Csv { ledger_dir: PathBuf::from("ledger") }
        );
        assert_eq!(config.target_profit, dec!(1000));
        assert_eq!(config.window_days, 30);
        assert_eq!(config.gap_fill, GapFill::Omit);
        assert_eq!(config.progress_chart, PathBuf::from("plot/total_profit_progress.png"));
        assert_eq!(config.daily_chart, PathBuf::from("plot/recent_day_profit_plot.png"));
        assert_eq!(config.staff_chart, PathBuf::from("plot/staff_manage_car_plot.png"));
        assert!(config.font_path.is_none());
    }

    #[test]
    fn mysql_source_requires_database_url() {
        assert_matches!(config_from(&[]), Err(ReportError::InvalidConfiguration(_)));

        let config = config_from(&[("DATABASE_URL", "mysql://root@localhost/car_rental_system")]).unwrap();
        assert_matches!(config.source, DataSource::MySql { .. });
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            ("REPORT_SOURCE", "csv"),
            ("TARGET_PROFIT", "2500.50"),
            ("WINDOW_DAYS", "7"),
            ("FILL_MISSING_DAYS", "true"),
            ("REPORT_OUTPUT_DIR", "/tmp/reports"),
            ("STAFF_CHART_PATH", "/srv/pie.png"),
        ])
        .unwrap();

        assert_eq!(config.target_profit, dec!(2500.50));
        assert_eq!(config.window_days, 7);
        assert_eq!(config.gap_fill, GapFill::Zero);
        assert_eq!(config.daily_chart, PathBuf::from("/tmp/reports/recent_day_profit_plot.png"));
        assert_eq!(config.staff_chart, PathBuf::from("/srv/pie.png"));
    }

    #[test]
    fn non_positive_target_is_rejected() {
        for target in ["0", "-100"] {
            assert_matches!(
                config_from(&[("REPORT_SOURCE", "csv"), ("TARGET_PROFIT", target)]),
                Err(ReportError::InvalidConfiguration(_))
            );
        }
    }

    #[test]
    fn oversized_window_is_rejected() {
        assert_matches!(
            config_from(&[("REPORT_SOURCE", "csv"), ("WINDOW_DAYS", "200000000")]),
            Err(ReportError::InvalidConfiguration(_))
        );
        let config = config_from(&[("REPORT_SOURCE", "csv"), ("WINDOW_DAYS", "3650")]).unwrap();
        assert_eq!(config.window_days, MAX_WINDOW_DAYS);
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert_matches!(
            config_from(&[("REPORT_SOURCE", "postgres")]),
            Err(ReportError::InvalidConfiguration(_))
        );
        assert_matches!(
            config_from(&[("REPORT_SOURCE", "csv"), ("WINDOW_DAYS", "0")]),
            Err(ReportError::InvalidConfiguration(_))
        );
        assert_matches!(
            config_from(&[("REPORT_SOURCE", "csv"), ("TARGET_PROFIT", "lots")]),
            Err(ReportError::InvalidConfiguration(_))
        );
    }
}
