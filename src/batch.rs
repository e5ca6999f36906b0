//! Sequential batch execution over (category, location) combinations.
//!
//! One combination is processed fully before the next begins. A failing
//! combination is logged and skipped; only a browser that cannot start at
//! all (handled by the caller) aborts a run.

use crate::browser::{BrowserManager, PageDriver};
use crate::capture::{ResponseCapturer, LISTING_API_PATTERN};
use crate::config::{Config, ScraperConfig};
use crate::error::ScrapeError;
use crate::export;
use crate::extract::RecordExtractor;
use crate::metrics::RunMetrics;
use crate::models::{Combination, CombinationOutcome, Location};
use crate::{geocode, helpers};
use rand::Rng;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Produces the raw listing payloads for one combination. The browser
/// pipeline implements this; tests substitute a stub so runner behavior is
/// observable without Chrome.
pub trait ListingFetcher {
    fn fetch(&mut self, combo: &Combination) -> Result<Vec<String>, ScrapeError>;
}

/// Drives the full scrape → snapshot → extract → write pipeline and records
/// per-combination outcomes.
pub struct BatchRunner<'a> {
    config: &'a Config,
    metrics: RunMetrics,
}

impl<'a> BatchRunner<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            metrics: RunMetrics::new(),
        }
    }

    /// Scrape every combination in order. With `process` set, captured
    /// payloads are extracted and written to CSV in the same pass; without
    /// it the run stops at the raw snapshots.
    pub fn run_scrape(
        &mut self,
        fetcher: &mut dyn ListingFetcher,
        combos: &[Combination],
        process: bool,
    ) {
        let output_dir = PathBuf::from(&self.config.scraper.output_dir);
        let attempts = self.config.scraper.capture_retries + 1;

        for combo in combos {
            log::info!("scraping {}", combo.name());

            let payloads = match fetch_with_retries(fetcher, combo, attempts) {
                Ok(payloads) => payloads,
                Err(reason) => {
                    log::error!("{}: {}", combo.name(), reason);
                    self.metrics
                        .record(combo.name(), CombinationOutcome::Failed(reason));
                    continue;
                }
            };

            if let Err(e) = save_payloads(&output_dir, combo, &payloads) {
                // Snapshots are an aid, not a gate; extraction can still run
                log::warn!("{}: could not save raw payloads: {}", combo.name(), e);
            }

            let outcome = if process {
                self.process_payloads(&output_dir, combo, &payloads)
            } else {
                CombinationOutcome::Captured {
                    payloads: payloads.len(),
                }
            };
            self.metrics.record(combo.name(), outcome);
        }
    }

    /// Re-extract every combination from raw snapshots left by an earlier
    /// scrape pass, without touching the browser.
    pub fn run_process(&mut self, combos: &[Combination]) {
        let output_dir = PathBuf::from(&self.config.scraper.output_dir);

        for combo in combos {
            let outcome = match load_payloads(&output_dir, combo) {
                Ok(payloads) if payloads.is_empty() => {
                    CombinationOutcome::Failed("no captured payloads on disk".to_string())
                }
                Ok(payloads) => self.process_payloads(&output_dir, combo, &payloads),
                Err(e) => CombinationOutcome::Failed(format!("reading payloads: {}", e)),
            };

            if let CombinationOutcome::Failed(reason) = &outcome {
                log::error!("{}: {}", combo.name(), reason);
            }
            self.metrics.record(combo.name(), outcome);
        }
    }

    fn process_payloads(
        &self,
        output_dir: &Path,
        combo: &Combination,
        payloads: &[String],
    ) -> CombinationOutcome {
        let mut extractor = RecordExtractor::new();
        let mut records = Vec::new();
        let mut skipped = 0;
        let mut parse_failures = 0;

        for payload in payloads {
            match extractor.extract(payload, combo) {
                Ok(outcome) => {
                    records.extend(outcome.records);
                    skipped += outcome.skipped;
                }
                Err(e) => {
                    log::warn!("{}: skipping payload: {}", combo.name(), e);
                    parse_failures += 1;
                }
            }
        }

        if !payloads.is_empty() && parse_failures == payloads.len() {
            return CombinationOutcome::Failed("no payload parsed".to_string());
        }

        let path = output_dir.join(combo.csv_file_name());
        if let Err(e) = export::write_combination_csv(&path, &records) {
            return CombinationOutcome::Failed(format!("writing {}: {}", path.display(), e));
        }

        if records.is_empty() {
            log::info!("{}: no products at this location", combo.name());
            CombinationOutcome::Empty
        } else {
            log::info!(
                "{}: {} records written to {}",
                combo.name(),
                records.len(),
                path.display()
            );
            CombinationOutcome::Scraped {
                records: records.len(),
                skipped,
            }
        }
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    pub fn into_metrics(self) -> RunMetrics {
        self.metrics
    }
}

fn fetch_with_retries(
    fetcher: &mut dyn ListingFetcher,
    combo: &Combination,
    attempts: usize,
) -> Result<Vec<String>, String> {
    for attempt in 1..=attempts {
        match fetcher.fetch(combo) {
            Ok(payloads) if payloads.is_empty() => {
                log::warn!(
                    "{}: no API responses captured (attempt {}/{})",
                    combo.name(),
                    attempt,
                    attempts
                );
            }
            Ok(payloads) => return Ok(payloads),
            Err(e) if e.is_capture_timeout() && attempt < attempts => {
                log::warn!(
                    "{}: capture timed out (attempt {}/{}), retrying",
                    combo.name(),
                    attempt,
                    attempts
                );
            }
            Err(e) => return Err(e.to_string()),
        }
    }
    Err("no API responses captured".to_string())
}

fn save_payloads(
    output_dir: &Path,
    combo: &Combination,
    payloads: &[String],
) -> io::Result<()> {
    let dir = output_dir.join(combo.raw_dir());
    fs::create_dir_all(&dir)?;

    // Drop snapshots from an earlier run of the same combination
    for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.extension().map_or(false, |ext| ext == "json") {
            fs::remove_file(path)?;
        }
    }

    for (i, payload) in payloads.iter().enumerate() {
        fs::write(dir.join(format!("payload_{:03}.json", i + 1)), payload)?;
    }
    Ok(())
}

fn load_payloads(output_dir: &Path, combo: &Combination) -> io::Result<Vec<String>> {
    let dir = output_dir.join(combo.raw_dir());
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = fs::read_dir(&dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
        .collect();
    files.sort();

    files.into_iter().map(fs::read_to_string).collect()
}

/// The real fetcher: drives a fresh tab through the listing page while a
/// response capturer collects the API bodies.
pub struct BrowserFetcher<'a> {
    manager: &'a BrowserManager,
    scraper: &'a ScraperConfig,
    http: reqwest::blocking::Client,
}

impl<'a> BrowserFetcher<'a> {
    pub fn new(manager: &'a BrowserManager, config: &'a Config) -> Result<Self, ScrapeError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent("blinkit-scraper")
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            manager,
            scraper: &config.scraper,
            http,
        })
    }

    fn drive(
        &self,
        page: &PageDriver,
        capturer: &ResponseCapturer,
        combo: &Combination,
    ) -> Result<Vec<String>, ScrapeError> {
        page.navigate(&combo.category.url)?;

        if let Some(location) = &combo.location {
            self.apply_location(page, combo, location);
        }

        match page.wait_for_listing() {
            Ok(()) => {
                if let Ok(cards) = page.product_card_count() {
                    log::info!("{}: {} product cards visible", combo.name(), cards);
                }
            }
            Err(e) => {
                // The API request can still fire without the container
                log::warn!("{}: listing not confirmed ({})", combo.name(), e);
            }
        }

        // Give the initial listing request time to fire before scrolling
        std::thread::sleep(Duration::from_secs(self.scraper.initial_wait_secs));

        let mut rng = rand::thread_rng();
        let mut quiet = 0usize;
        let mut last = capturer.count();

        for step in 1..=self.scraper.scroll_count {
            if quiet >= self.scraper.quiet_scroll_limit {
                log::info!(
                    "{}: {} quiet scrolls, stopping early",
                    combo.name(),
                    quiet
                );
                break;
            }

            if let Err(e) = page.scroll_step() {
                log::warn!("{}: scroll step {} failed: {}", combo.name(), step, e);
            }

            let jitter = rng.gen_range(0..=self.scraper.scroll_jitter_ms);
            std::thread::sleep(Duration::from_millis(self.scraper.scroll_pause_ms + jitter));

            let count = capturer.count();
            if count > last {
                log::info!(
                    "{}: scroll {} captured {} new response(s)",
                    combo.name(),
                    step,
                    count - last
                );
                last = count;
                quiet = 0;
            } else {
                quiet += 1;
            }
        }

        if capturer.count() == 0 {
            capturer.wait_for_first(Duration::from_secs(self.scraper.capture_timeout_secs))?;
        }

        Ok(capturer.take_payloads())
    }

    fn apply_location(&self, page: &PageDriver, combo: &Combination, location: &Location) {
        let query = match geocode::reverse_geocode(&self.http, location.lat, location.lng) {
            Ok(address) => Some(geocode::search_query(&address).to_string()),
            Err(e) => {
                log::warn!(
                    "{}: reverse geocoding failed ({}), falling back to label",
                    combo.name(),
                    e
                );
                location
                    .label
                    .as_ref()
                    .map(|label| helpers::sanitize_component(label).replace('_', " "))
            }
        };

        match query {
            Some(query) => {
                log::info!("{}: setting location to '{}'", combo.name(), query);
                if let Err(e) = page.set_location(&query) {
                    log::warn!(
                        "{}: could not set location ({}), using site default",
                        combo.name(),
                        e
                    );
                }
            }
            None => log::warn!(
                "{}: no location query available, using site default",
                combo.name()
            ),
        }
    }
}

impl ListingFetcher for BrowserFetcher<'_> {
    fn fetch(&mut self, combo: &Combination) -> Result<Vec<String>, ScrapeError> {
        let tab = self.manager.new_tab()?;
        let timeout = Duration::from_secs(self.manager.config().timeout_seconds);
        let page = PageDriver::new(tab.clone(), timeout);

        let result = match ResponseCapturer::attach(&tab, LISTING_API_PATTERN) {
            Ok(capturer) => self.drive(&page, &capturer, combo),
            Err(e) => Err(e.into()),
        };

        // Release the tab on every exit path
        let _ = tab.close(true);
        result
    }
}
