use blinkit_scraper::batch::{BatchRunner, BrowserFetcher};
use blinkit_scraper::browser::BrowserManager;
use blinkit_scraper::config::Config;
use blinkit_scraper::export;
use blinkit_scraper::helpers;
use blinkit_scraper::models::{Combination, Location};
use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "blinkit-scraper",
    version,
    about = "Scrape Blinkit category listings into per-location CSV files"
)]
struct Cli {
    /// Category page URL(s) to scrape; overrides the config file list
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// Delivery location(s); overrides the config file list
    #[arg(long = "location", value_name = "LAT,LNG[:LABEL]")]
    locations: Vec<String>,

    /// Directory receiving all output artifacts
    #[arg(long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Maximum scroll steps per combination
    #[arg(long, value_name = "N")]
    scroll: Option<usize>,

    /// Capture raw payloads only; skip extraction and merge
    #[arg(long, conflicts_with = "process_only")]
    scrape_only: bool,

    /// Re-extract from existing raw payloads; skip the browser
    #[arg(long)]
    process_only: bool,

    /// Show the browser window (debugging)
    #[arg(long)]
    headful: bool,

    /// Configuration file
    #[arg(long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let mut config = Config::load(&cli.config);
    if let Some(dir) = &cli.output_dir {
        config.scraper.output_dir = dir.clone();
    }
    if let Some(scroll) = cli.scroll {
        config.scraper.scroll_count = scroll;
    }

    let combos = match build_combinations(&config, &cli) {
        Ok(combos) => combos,
        Err(message) => {
            log::error!("{}", message);
            return ExitCode::FAILURE;
        }
    };
    if combos.is_empty() {
        log::error!("no category URLs given; pass --url or list them in config.toml");
        return ExitCode::FAILURE;
    }

    let output_dir = PathBuf::from(&config.scraper.output_dir);
    if let Err(e) = fs::create_dir_all(&output_dir) {
        log::error!("cannot create output dir {}: {}", output_dir.display(), e);
        return ExitCode::FAILURE;
    }

    log::info!(
        "starting run: {} combination(s), output dir {}",
        combos.len(),
        output_dir.display()
    );

    let mut runner = BatchRunner::new(&config);

    if cli.process_only {
        runner.run_process(&combos);
    } else {
        let mut browser_config = config.browser.to_browser_config();
        if cli.headful {
            browser_config.headless = false;
            browser_config.disable_images = false;
        }

        // A browser that cannot start is the one failure fatal to the run
        let manager = match BrowserManager::new(browser_config) {
            Ok(manager) => manager,
            Err(e) => {
                log::error!("aborting run: {}", e);
                return ExitCode::FAILURE;
            }
        };

        let mut fetcher = match BrowserFetcher::new(&manager, &config) {
            Ok(fetcher) => fetcher,
            Err(e) => {
                log::error!("aborting run: {}", e);
                return ExitCode::FAILURE;
            }
        };

        runner.run_scrape(&mut fetcher, &combos, !cli.scrape_only);
    }

    if !cli.scrape_only {
        merge_outputs(&output_dir);
    }

    let metrics = runner.into_metrics();
    metrics.log_summary();

    let succeeded = if cli.scrape_only {
        metrics.captured() > 0
    } else {
        metrics.any_rows()
    };
    if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn merge_outputs(output_dir: &Path) {
    match export::merge_combination_csvs(output_dir) {
        Ok(report) => {
            log::info!(
                "merged {} file(s), {} data rows -> {}",
                report.files_merged,
                report.rows,
                report.path.display()
            );
            for file in &report.files_excluded {
                log::warn!("excluded from merge: {}", file);
            }

            let summary_path = output_dir.join(export::SUMMARY_FILE_NAME);
            match export::write_summary_csv(&report.path, &summary_path) {
                Ok(()) => log::info!("summary written to {}", summary_path.display()),
                Err(e) => log::warn!("could not write summary: {}", e),
            }
        }
        Err(e) => log::error!("merge failed: {}", e),
    }
}

fn build_combinations(config: &Config, cli: &Cli) -> Result<Vec<Combination>, String> {
    let urls: Vec<String> = if cli.urls.is_empty() {
        config.categories.iter().map(|c| c.url.clone()).collect()
    } else {
        cli.urls.clone()
    };

    let locations: Vec<Option<Location>> = if cli.locations.is_empty() {
        if config.locations.is_empty() {
            vec![None]
        } else {
            config
                .locations
                .iter()
                .map(|l| {
                    Some(Location {
                        lat: l.lat,
                        lng: l.lng,
                        label: l.label.clone(),
                    })
                })
                .collect()
        }
    } else {
        cli.locations
            .iter()
            .map(|arg| parse_location_arg(arg).map(Some))
            .collect::<Result<_, _>>()?
    };

    let mut combos = Vec::new();
    for url in &urls {
        let category = helpers::parse_category_url(url);
        for location in &locations {
            combos.push(Combination {
                category: category.clone(),
                location: location.clone(),
            });
        }
    }
    Ok(combos)
}

fn parse_location_arg(arg: &str) -> Result<Location, String> {
    let (coords, label) = match arg.split_once(':') {
        Some((coords, label)) => (coords, Some(label.to_string())),
        None => (arg, None),
    };

    let (lat, lng) = coords
        .split_once(',')
        .ok_or_else(|| format!("invalid location '{}', expected LAT,LNG[:LABEL]", arg))?;

    let lat = lat
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid latitude in '{}'", arg))?;
    let lng = lng
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid longitude in '{}'", arg))?;

    Ok(Location { lat, lng, label })
}

/// Prefer the log4rs.yml shipped next to the binary; fall back to a plain
/// console logger so the tool still works from any directory.
fn init_logging() {
    let yml = Path::new("log4rs.yml");
    if yml.exists() && log4rs::init_file(yml, Default::default()).is_ok() {
        return;
    }

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%H:%M:%S)} {h({l})} {t} - {m}{n}",
        )))
        .build();

    if let Ok(config) = log4rs::config::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))
    {
        let _ = log4rs::init_config(config);
    }
}
