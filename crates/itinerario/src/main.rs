use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod data;
mod emoji;
mod error;
mod export;
mod filter;
mod google;
mod grid;
mod html;
mod resolve;
mod server;
mod types;

use config::GoogleCalendarConfig;
use data::{CatalogSource, FIXTURE_FILE};
use filter::Filter;
use grid::WeekStart;
use html::{Links, Page, View};
use server::Settings;

#[derive(Parser, Debug)]
#[command(name = "itinerario")]
#[command(about = "Camp itinerary calendar: web view, static build and exports")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output directory for generated files
    #[arg(short, long, default_value = ".", global = true)]
    output: PathBuf,

    /// Directory holding the itinerary.json fixture
    #[arg(short, long, default_value = "data", global = true)]
    data: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// First day shown in the calendar (YYYY-MM-DD)
    #[arg(long, default_value = "2025-07-01", global = true)]
    from: NaiveDate,

    /// Last day shown in the calendar (YYYY-MM-DD)
    #[arg(long, default_value = "2025-08-31", global = true)]
    to: NaiveDate,

    /// First column of the calendar grid
    #[arg(long, value_enum, default_value_t = WeekStart::Sunday, global = true)]
    week_start: WeekStart,

    /// Page title
    #[arg(long, default_value = "Camp Itinerary 2025", global = true)]
    title: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the web server (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Generate static pages and exports (no server)
    Build,

    /// Write the catalog as ICS or CSV
    Export {
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Ics)]
        format: ExportFormat,

        /// Destination file (stdout when omitted)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Fetch events from Google Calendar into the fixture file
    Fetch,

    /// Show the activities on one date
    Day {
        /// Date to look up (YYYY-MM-DD)
        date: NaiveDate,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ExportFormat {
    Ics,
    Csv,
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level))
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("tower_http=warn".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level);

    if args.from > args.to {
        bail!("--from {} is after --to {}", args.from, args.to);
    }

    let google = GoogleCalendarConfig::from_env().context("Invalid calendar configuration")?;
    let settings = Settings {
        title: args.title.clone(),
        window: (args.from, args.to),
        week_start: args.week_start,
    };

    match args.command {
        // Default to serve if no command specified
        None => {
            let source = CatalogSource::from_config(google, &args.data)?;
            server::serve(8080, source, settings).await?;
        }
        Some(Commands::Serve { port }) => {
            let source = CatalogSource::from_config(google, &args.data)?;
            server::serve(port, source, settings).await?;
        }
        Some(Commands::Build) => {
            let source = CatalogSource::from_config(google, &args.data)?;
            let items = source.load(args.from, args.to).await?;
            build_site(&items, &settings, &args.output)?;
        }
        Some(Commands::Export { format, file }) => {
            let source = CatalogSource::from_config(google, &args.data)?;
            let items = source.load(args.from, args.to).await?;
            let body = match format {
                ExportFormat::Ics => export::to_ics(&items, Utc::now()),
                ExportFormat::Csv => export::to_csv(&items)?,
            };
            match file {
                Some(path) => {
                    std::fs::write(&path, body)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), count = items.len(), "Export saved");
                }
                None => print!("{body}"),
            }
        }
        Some(Commands::Fetch) => {
            let Some(config) = google else {
                bail!(
                    "{} and {} must be set to fetch from Google Calendar",
                    config::API_KEY_VAR,
                    config::CALENDAR_ID_VAR
                );
            };
            let source = CatalogSource::from_config(Some(config), &args.data)?;
            let items = source.load(args.from, args.to).await?;
            let path = args.data.join(FIXTURE_FILE);
            data::save_json(&items, &path)?;
            info!(path = %path.display(), count = items.len(), "Fixture saved");
        }
        Some(Commands::Day { date }) => {
            let source = CatalogSource::from_config(google, &args.data)?;
            let items = source.load(args.from, args.to).await?;
            let active = resolve::activities_on_date(&items, date);
            info!(date = %date, count = active.len(), "Activities");
            for item in resolve::multi_day_first(&active) {
                info!(
                    id = %item.id,
                    title = %item.title,
                    category = %item.category,
                    multi_day = item.is_multi_day(),
                    icon = emoji::icon_for(&item.title, item.category),
                    "Activity"
                );
            }
        }
    }

    Ok(())
}

/// Write the calendar, timeline and print pages plus both exports.
fn build_site(
    items: &[types::ActivityItem],
    settings: &Settings,
    output: &std::path::Path,
) -> Result<()> {
    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;

    let today = Local::now().date_naive();
    let filter = Filter::default();
    let page = |view: View| Page {
        title: &settings.title,
        catalog: items,
        filter: &filter,
        view,
        window: settings.window,
        week_start: settings.week_start,
        today,
        last_fetch: Some(Utc::now()),
        last_error: None,
        links: Links::Static,
    };

    html::generate_html(&page(View::Calendar), &output.join("index.html"))?;
    html::generate_html(&page(View::Timeline), &output.join("timeline.html"))?;
    html::generate_print(&settings.title, items, today, &output.join("print.html"))?;

    std::fs::write(output.join("itinerary.ics"), export::to_ics(items, Utc::now()))
        .context("Failed to write itinerary.ics")?;
    std::fs::write(output.join("itinerary.csv"), export::to_csv(items)?)
        .context("Failed to write itinerary.csv")?;

    info!(path = %output.display(), count = items.len(), "Site built");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings() -> Settings {
        Settings {
            title: "Camp Itinerary".to_string(),
            window: (
                NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 8, 31).unwrap(),
            ),
            week_start: WeekStart::Sunday,
        }
    }

    #[test]
    fn test_build_site_writes_pages_and_exports() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("site");

        build_site(&data::builtin_fixture(), &settings(), &output).unwrap();

        for name in [
            "index.html",
            "timeline.html",
            "print.html",
            "itinerary.ics",
            "itinerary.csv",
        ] {
            assert!(output.join(name).is_file(), "{name} missing");
        }
        let index = std::fs::read_to_string(output.join("index.html")).unwrap();
        assert!(index.contains("Camp Itinerary"));
        let csv = std::fs::read_to_string(output.join("itinerary.csv")).unwrap();
        assert_eq!(csv.lines().count(), 12);
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["itinerario", "build"]).unwrap();
        assert!(matches!(args.command, Some(Commands::Build)));
        assert_eq!(args.from, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        assert_eq!(args.data, PathBuf::from("data"));
    }
}
