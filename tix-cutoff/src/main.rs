//! tix-cutoff - command-line front end
//!
//! - `resolve <VENUE>...`: venue text → IANA timezone
//! - `decide --event .. --venue ..`: stop/no-stop verdict as JSON
//! - `clock`: force a clock sync and print the status

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tix_common::config::TomlConfig;
use tix_cutoff::{build_engine, timezone_abbreviation, timezone_display_label};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for tix-cutoff
#[derive(Parser, Debug)]
#[command(name = "tix-cutoff")]
#[command(about = "Venue-local event cutoff checks")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(long, global = true, env = "TIX_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "tix_cutoff=trace"
    #[arg(long, global = true, env = "TIX_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve venue strings to IANA timezones
    Resolve {
        #[arg(required = true)]
        venues: Vec<String>,

        /// Static tables only, no geocoding
        #[arg(long)]
        offline: bool,
    },

    /// Check one event against its venue-local cutoff
    Decide {
        /// Local start time, YYYY-MM-DDTHH:MM[:SS]
        #[arg(long)]
        event: String,

        #[arg(long)]
        venue: String,

        #[arg(long, default_value_t = 2.0, allow_negative_numbers = true)]
        threshold_hours: f64,

        /// Static tables and unsynced clock only
        #[arg(long)]
        offline: bool,
    },

    /// Sync against the time providers and print the offset
    Clock,
}

#[derive(Serialize)]
struct Resolution<'a> {
    venue: &'a str,
    timezone: Option<String>,
    abbreviation: Option<String>,
    label: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; otherwise --log-level / TIX_LOG_LEVEL, then the config file
    let from_env = EnvFilter::try_from_default_env().ok();
    let has_env_filter = from_env.is_some();
    let initial = from_env.unwrap_or_else(|| filter_for(args.log_level.as_deref().unwrap_or("info")));
    let (filter, filter_handle) = reload::Layer::new(initial);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = TomlConfig::load_or_default(args.config.as_deref());
    if !has_env_filter && args.log_level.is_none() {
        filter_handle
            .reload(filter_for(&config.logging.level))
            .context("Failed to apply configured log level")?;
    }
    config.validate().context("Invalid configuration")?;

    let engine = build_engine(&config).context("Failed to initialize services")?;

    match args.command {
        Command::Resolve { venues, offline } => {
            let timezones = if offline {
                venues
                    .iter()
                    .map(|venue| engine.resolver().resolve_static(venue))
                    .collect()
            } else {
                engine
                    .resolver()
                    .resolve_many(&venues, config.resolver.batch_concurrency)
                    .await
            };

            let now = engine.clock().now();
            let resolutions: Vec<_> = venues
                .iter()
                .zip(timezones)
                .map(|(venue, timezone)| Resolution {
                    venue,
                    abbreviation: timezone.as_deref().and_then(|tz| timezone_abbreviation(tz, now)),
                    label: timezone.as_deref().map(timezone_display_label),
                    timezone,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&resolutions)?);
        }

        Command::Decide {
            event,
            venue,
            threshold_hours,
            offline,
        } => {
            let event_at = parse_event_time(&event)?;
            info!(venue = %venue, event = %event_at, threshold_hours, "Checking event");

            let decision = if offline {
                engine.decide_static(event_at, &venue, threshold_hours)
            } else {
                engine.decide_synced(event_at, &venue, threshold_hours).await
            };

            match decision {
                Some(decision) => println!("{}", serde_json::to_string_pretty(&decision)?),
                None => println!("unresolved"),
            }
        }

        Command::Clock => {
            let outcome = engine.clock().sync_now().await;
            info!(?outcome, "Clock sync finished");
            println!("{}", serde_json::to_string_pretty(&engine.clock().status())?);
        }
    }

    Ok(())
}

/// Bare levels apply to this workspace only; full directives pass through
fn filter_for(level: &str) -> EnvFilter {
    if level.contains('=') || level.contains(',') {
        EnvFilter::new(level)
    } else {
        EnvFilter::new(format!("tix_cutoff={0},tix_common={0}", level))
    }
}

/// Parse a fake-UTC event time. A trailing `Z` or offset is accepted and
/// ignored: the wall-clock fields are taken as written.
fn parse_event_time(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Utc.from_utc_datetime(&dt.naive_local()));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    bail!("Unrecognized event time {:?}; expected YYYY-MM-DDTHH:MM[:SS]", raw)
}
