// Entry point and high-level CLI flow.
//
// - `rental_report <progress|daily|staff|all>` runs once and exits, with a
//   non-zero status if any requested report failed.
// - Without an argument the report selection menu is shown; after each
//   run the user can go back to the menu or exit.
mod config;
mod error;
mod loader;
mod output;
mod pipeline;
mod render;
mod reports;
mod store;
mod types;
mod util;

use config::{DataSource, ReportConfig};
use error::ReportResult;
use loader::CsvLedger;
use pipeline::{ReportKind, ReportRunner};
use render::{ChartRenderer, RasterRenderer};
use std::io::{self, Write};
use std::process::ExitCode;
use store::{MySqlStore, RentalStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Reports selected from the menu or command line; `None` means all.
type Selection = Option<ReportKind>;

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask the user whether to go back to the report selection menu.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        if io::stdin().read_line(&mut buf).unwrap_or(0) == 0 {
            return false;
        }
        match buf.trim().to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn parse_selection(arg: &str) -> ReportResult<Selection> {
    if arg.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    arg.parse::<ReportKind>().map(Some)
}

/// Run the selected reports; returns how many failed.
async fn run_selection<S, R>(runner: &ReportRunner<'_, S, R>, selection: Selection) -> usize
where
    S: RentalStore,
    R: ChartRenderer,
{
    let today = chrono::Local::now().date_naive();
    println!("Generating reports...\n");
    let results = match selection {
        Some(kind) => vec![(kind, runner.run(kind, today).await)],
        None => runner.run_all(today).await,
    };

    let mut failed = 0usize;
    for (kind, result) in results {
        match result {
            Ok(outcome) => println!(
                "{}\n({} chart saved to {})\n",
                outcome.summary(),
                kind.title(),
                runner.output_path(kind).display()
            ),
            Err(e) => {
                failed += 1;
                eprintln!("{} failed: {}\n", kind.title(), e);
            }
        }
    }
    failed
}

async fn interactive<S, R>(runner: &ReportRunner<'_, S, R>)
where
    S: RentalStore,
    R: ChartRenderer,
{
    loop {
        println!("Select Report:");
        println!("[1] Total Profit Progress");
        println!("[2] Recent Daily Profit");
        println!("[3] Staff Vehicle Distribution");
        println!("[4] All Reports\n");
        let selection = match read_choice().as_str() {
            "1" => Some(ReportKind::Progress),
            "2" => Some(ReportKind::Daily),
            "3" => Some(ReportKind::Staff),
            "4" => None,
            "" => {
                println!("Exiting the program.");
                break;
            }
            _ => {
                println!("Invalid choice. Please enter 1, 2, 3 or 4.\n");
                continue;
            }
        };
        println!();
        run_selection(runner, selection).await;
        if !prompt_back_to_menu() {
            println!("Exiting the program.");
            break;
        }
    }
}

async fn dispatch<S: RentalStore>(
    config: &ReportConfig,
    store: &S,
    selection: Option<Selection>,
) -> ReportResult<usize> {
    let renderer = match &config.font_path {
        Some(path) => RasterRenderer::with_font_file(path)?,
        None => RasterRenderer::new(),
    };
    let runner = ReportRunner::new(config, store, &renderer);
    match selection {
        Some(selection) => Ok(run_selection(&runner, selection).await),
        None => {
            interactive(&runner).await;
            Ok(0)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rental_report=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let selection = match std::env::args().nth(1) {
        Some(arg) => match parse_selection(&arg) {
            Ok(sel) => Some(sel),
            Err(e) => {
                eprintln!("{}", e);
                eprintln!("Usage: rental_report [progress|daily|staff|all]");
                return ExitCode::from(2);
            }
        },
        None => None,
    };

    let config = match ReportConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "configuration rejected");
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    let result = match &config.source {
        DataSource::MySql { database_url } => {
            tracing::info!("reading ledger from MySQL");
            dispatch(&config, &MySqlStore::new(database_url.clone()), selection).await
        }
        DataSource::Csv { ledger_dir } => {
            tracing::info!(dir = %ledger_dir.display(), "reading ledger from CSV exports");
            dispatch(&config, &CsvLedger::new(ledger_dir.clone()), selection).await
        }
    };

    match result {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn selection_accepts_all_and_report_names() {
        assert_matches!(parse_selection("all"), Ok(None));
        assert_matches!(parse_selection("ALL"), Ok(None));
        assert_matches!(parse_selection("staff"), Ok(Some(ReportKind::Staff)));
        assert!(parse_selection("yearly").is_err());
    }
}
