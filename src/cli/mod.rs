pub mod report;

use std::{fmt::Display, path::PathBuf};

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime};
use chrono_english::parse_date_string;
use chrono_tz::Tz;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use tracing::level_filters::LevelFilter;

use crate::{
    bot::start_bot,
    config::Config,
    stats::{summarize, Window},
    store::{
        entities::{DiaperKind, Entry, EntryKind},
        entry_log::{EntryStore, EntryStoreImpl, StoreError},
    },
    utils::{
        clock::{Clock, DefaultClock},
        logging::{enable_logging, CLI_PREFIX},
        time::parse_time_of_day,
    },
};

#[derive(Parser, Debug)]
#[command(name = "Babylog", version, long_about = None)]
#[command(about = "Feeding, temperature and diaper log for a baby", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        help = "Path to the config file. By default reads $XDG_CONFIG_HOME/babylog/config.toml"
    )]
    config: Option<PathBuf>,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Show everything logged today")]
    Today {},
    #[command(about = "Add an entry to the log")]
    Add {
        #[command(subcommand)]
        entry: AddCommand,
    },
    #[command(about = "Delete the most recent entry of a kind")]
    Delete { kind: EntryKind },
    #[command(about = "Per-day feeding totals and aggregates over a window")]
    Stats { window: Option<Window> },
    #[command(about = "List raw entries over a date range")]
    History {
        #[command(flatten)]
        command: HistoryCommand,
    },
    #[command(about = "Run the Telegram bot in the current console")]
    Bot {},
}

#[derive(Subcommand, Debug)]
enum AddCommand {
    #[command(about = "A bottle feeding in ml")]
    Feeding {
        ml: u32,
        #[arg(long, help = "Wall time like 09:15. Defaults to now")]
        time: Option<String>,
        #[arg(long, help = "Initial to sign the entry with")]
        user: Option<String>,
    },
    #[command(about = "A body temperature in celsius")]
    Temperature {
        celsius: f64,
        #[arg(long, help = "Wall time like 09:15. Defaults to now")]
        time: Option<String>,
        #[arg(long, help = "Initial to sign the entry with")]
        user: Option<String>,
    },
    #[command(about = "A diaper change")]
    Diaper {
        kind: DiaperKind,
        #[arg(long, help = "Wall time like 09:15. Defaults to now")]
        time: Option<String>,
        #[arg(long, help = "Initial to sign the entry with")]
        user: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct HistoryCommand {
    #[arg(
        long = "start",
        short,
        help = "Start of the range. Examples are \"yesterday\", \"1 week ago\", \"15/03/2025\""
    )]
    start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "End of the range. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\""
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &config.app_dir, logging_level, args.log)?;

    let clock = DefaultClock::new(config.timezone);

    match args.commands {
        Commands::Today {} => {
            let store = EntryStoreImpl::open(config.data_file.clone()).await?;
            let today = clock.now().date_naive();
            let entries = store.entries_on(today).await?;
            report::print_day(today, &entries);
            Ok(())
        }
        Commands::Add { entry } => process_add_command(entry, &config, &clock).await,
        Commands::Delete { kind } => {
            let store = EntryStoreImpl::open(config.data_file.clone()).await?;
            match store.delete_last(kind).await {
                Ok((date, entry)) => {
                    report::print_deleted(date, &entry);
                    Ok(())
                }
                Err(StoreError::NotFound(kind)) => {
                    println!("No {kind} entry to delete.");
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }
        Commands::Stats { window } => {
            let store = EntryStoreImpl::open(config.data_file.clone()).await?;
            let summary =
                summarize(&store, &clock, window.unwrap_or(Window::Week)).await?;
            report::print_summary(&summary);
            Ok(())
        }
        Commands::History { command } => process_history_command(command, &config, &clock).await,
        Commands::Bot {} => start_bot(config).await,
    }
}

async fn process_add_command(
    command: AddCommand,
    config: &Config,
    clock: &DefaultClock,
) -> Result<()> {
    let store = EntryStoreImpl::open(config.data_file.clone()).await?;
    let now = clock.now();
    let today = now.date_naive();

    let entry = match command {
        AddCommand::Feeding { ml, time, user } => Entry::feeding(
            resolve_time(time.as_deref(), &now)?,
            ml,
            resolve_user(user, config),
        ),
        AddCommand::Temperature {
            celsius,
            time,
            user,
        } => Entry::temperature(
            resolve_time(time.as_deref(), &now)?,
            celsius,
            resolve_user(user, config),
        ),
        AddCommand::Diaper { kind, time, user } => Entry::diaper(
            resolve_time(time.as_deref(), &now)?,
            kind,
            resolve_user(user, config),
        ),
    };

    store.append(today, entry.clone()).await?;
    report::print_added(today, &entry);
    Ok(())
}

async fn process_history_command(
    HistoryCommand {
        start_date,
        end_date,
        date_style,
    }: HistoryCommand,
    config: &Config,
    clock: &DefaultClock,
) -> Result<()> {
    let (start, end) = parse_range(start_date, end_date, date_style, clock.now())?;

    let store = EntryStoreImpl::open(config.data_file.clone()).await?;
    let entries = store.entries_between(start, end).await?;
    report::print_history(&entries);
    Ok(())
}

/// Also provides sensible defaults: the last week up to today.
fn parse_range(
    start_date: Option<String>,
    end_date: Option<String>,
    date_style: DateStyle,
    now: DateTime<Tz>,
) -> Result<(NaiveDate, NaiveDate)> {
    let dialect: chrono_english::Dialect = date_style.into();
    let start = match start_date.map(|s| parse_date_string(&s, now, dialect)) {
        Some(Ok(v)) => v.date_naive(),
        Some(Err(e)) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate start date {e}"),
                )
                .into());
        }
        None => now.date_naive() - Duration::days(6),
    };
    let end = match end_date.map(|s| parse_date_string(&s, now, dialect)) {
        Some(Ok(v)) => v.date_naive(),
        Some(Err(e)) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate end date {e}"),
                )
                .into());
        }
        None => now.date_naive(),
    };
    Ok((start, end))
}

fn resolve_time(raw: Option<&str>, now: &DateTime<Tz>) -> Result<NaiveTime> {
    match raw {
        Some(raw) => parse_time_of_day(raw).map_err(|e| {
            Args::command()
                .error(clap::error::ErrorKind::ValueValidation, e.to_string())
                .into()
        }),
        None => Ok(now.time()),
    }
}

/// `--user` wins, otherwise the first configured user signs.
fn resolve_user(user: Option<String>, config: &Config) -> String {
    user.or_else(|| {
        let first = config.users.first()?;
        let letter = first.name.chars().next()?;
        Some(letter.to_uppercase().collect())
    })
    .unwrap_or_else(|| "?".to_owned())
}
