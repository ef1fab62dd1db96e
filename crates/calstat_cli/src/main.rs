//! `calstat` command-line front end.
//!
//! # Responsibility
//! - Parse arguments, load configuration and call the engine.
//! - Print every result as pretty JSON on stdout; errors go to stderr.

use calstat_core::{
    Dimension, Engine, EngineConfig, EntityId, ItemFilter, RankingScope, TimeWindow, ValueOrder,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(name = "calstat", version, about = "Calendar time analytics")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, short, default_value = "calstat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import calendar files from the configured sources directory.
    Import {
        /// Wipe all imported data first.
        #[arg(long)]
        fresh: bool,
    },
    /// List stored calendars.
    Calendars,
    /// Rank calendars, or one calendar's dimension values, by total duration.
    Ranking {
        #[arg(long, requires = "dimension")]
        calendar: Option<String>,
        #[arg(long, requires = "calendar")]
        dimension: Option<Dimension>,
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Distinct values of one dimension.
    Values {
        #[arg(long)]
        calendar: String,
        #[arg(long)]
        dimension: Dimension,
        #[command(flatten)]
        window: WindowArgs,
        /// Order by total duration instead of name.
        #[arg(long)]
        by_duration: bool,
    },
    /// Years that have events.
    Years {
        #[arg(long)]
        calendar: Option<String>,
    },
    /// Months that have events.
    Months {
        #[arg(long)]
        calendar: Option<String>,
        #[arg(long)]
        year: Option<i32>,
    },
    /// Per-day totals for one month.
    Daily {
        #[arg(long)]
        calendar: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        #[command(flatten)]
        item: ItemArgs,
    },
    /// Summary statistics for a calendar, window and optional item.
    Report {
        #[arg(long)]
        calendar: String,
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        item: ItemArgs,
    },
    /// Time not classified along one dimension.
    Unclassified {
        #[arg(long)]
        calendar: String,
        #[arg(long)]
        dimension: Dimension,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Write one stored calendar as an .ics document.
    Export {
        #[arg(long)]
        calendar: String,
        /// Output file; stdout when omitted.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
struct WindowArgs {
    #[arg(long)]
    year: Option<i32>,
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,
}

impl WindowArgs {
    fn window(&self) -> TimeWindow {
        match (self.year, self.month) {
            (Some(year), Some(month)) => TimeWindow::month(year, month),
            (Some(year), None) => TimeWindow::year(year),
            (None, None) => TimeWindow::all(),
            // Same month across every year.
            (None, month) => TimeWindow { year: None, month },
        }
    }
}

#[derive(Debug, Args)]
struct ItemArgs {
    #[arg(long, requires = "item")]
    dimension: Option<Dimension>,
    #[arg(long, requires = "dimension")]
    item: Option<String>,
}

impl ItemArgs {
    fn filter(&self) -> Option<ItemFilter<'_>> {
        match (self.dimension, self.item.as_deref()) {
            (Some(dimension), Some(name)) => Some(ItemFilter::new(dimension, name)),
            _ => None,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let config = EngineConfig::load(&cli.config)?;
    let mut engine = Engine::open(config)?;

    match cli.command {
        Command::Import { fresh } => {
            let report = if fresh {
                engine.import_fresh()?
            } else {
                engine.import_incremental()?
            };
            print_json(&report)
        }
        Command::Calendars => print_json(&engine.analytics().calendars()?),
        Command::Ranking {
            calendar,
            dimension,
            window,
            limit,
        } => {
            let scope = match (calendar, dimension) {
                (Some(name), Some(dimension)) => RankingScope::Dimension {
                    calendar_id: calendar_id(&engine, &name)?,
                    dimension,
                },
                _ => RankingScope::Calendars,
            };
            let ranking = engine
                .analytics()
                .usage_ranking(scope, window.window(), limit)?;
            print_json(&ranking)
        }
        Command::Values {
            calendar,
            dimension,
            window,
            by_duration,
        } => {
            let order = if by_duration {
                ValueOrder::TotalDuration
            } else {
                ValueOrder::Name
            };
            let id = calendar_id(&engine, &calendar)?;
            let values = engine
                .analytics()
                .distinct_values(id, dimension, window.window(), order)?;
            print_json(&values)
        }
        Command::Years { calendar } => {
            let id = optional_calendar_id(&engine, calendar.as_deref())?;
            print_json(&engine.analytics().distinct_years(id)?)
        }
        Command::Months { calendar, year } => {
            let id = optional_calendar_id(&engine, calendar.as_deref())?;
            print_json(&engine.analytics().distinct_months(id, year)?)
        }
        Command::Daily {
            calendar,
            year,
            month,
            item,
        } => {
            let id = calendar_id(&engine, &calendar)?;
            let days = engine
                .analytics()
                .daily_breakdown(id, year, month, item.filter())?;
            print_json(&days)
        }
        Command::Report {
            calendar,
            window,
            item,
        } => {
            let id = calendar_id(&engine, &calendar)?;
            let report = engine
                .analytics()
                .report(id, window.window(), item.filter())?;
            print_json(&report)
        }
        Command::Unclassified {
            calendar,
            dimension,
            window,
        } => {
            let id = calendar_id(&engine, &calendar)?;
            let usage = engine
                .analytics()
                .unclassified_usage(id, dimension, window.window())?;
            print_json(&usage)
        }
        Command::Export { calendar, output } => {
            let document = engine.export_calendar(&calendar)?;
            match output {
                Some(path) => std::fs::write(&path, document)?,
                None => print!("{document}"),
            }
            Ok(())
        }
    }
}

fn calendar_id(engine: &Engine, name: &str) -> CliResult<EntityId> {
    engine
        .analytics()
        .calendar_by_name(name)?
        .map(|calendar| calendar.id)
        .ok_or_else(|| format!("calendar not found: `{name}`").into())
}

fn optional_calendar_id(engine: &Engine, name: Option<&str>) -> CliResult<Option<EntityId>> {
    name.map(|name| calendar_id(engine, name)).transpose()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
