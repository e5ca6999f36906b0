//! Run accounting.
//!
//! Tracks what happened to every combination so the end of the run can report
//! attempted / succeeded / empty / failed counts and the record totals.

use crate::models::CombinationOutcome;
use std::time::Instant;

pub struct RunMetrics {
    started: Instant,
    outcomes: Vec<(String, CombinationOutcome)>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, combination: String, outcome: CombinationOutcome) {
        self.outcomes.push((combination, outcome));
    }

    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn scraped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, CombinationOutcome::Scraped { .. }))
            .count()
    }

    pub fn captured(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, CombinationOutcome::Captured { .. }))
            .count()
    }

    pub fn empty(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, CombinationOutcome::Empty))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, CombinationOutcome::Failed(_)))
            .count()
    }

    pub fn records_written(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, o)| match o {
                CombinationOutcome::Scraped { records, .. } => *records,
                _ => 0,
            })
            .sum()
    }

    pub fn records_skipped(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, o)| match o {
                CombinationOutcome::Scraped { skipped, .. } => *skipped,
                _ => 0,
            })
            .sum()
    }

    /// True when at least one combination produced a non-empty CSV,
    /// which is the run's success criterion.
    pub fn any_rows(&self) -> bool {
        self.outcomes.iter().any(|(_, o)| o.produced_rows())
    }

    pub fn outcomes(&self) -> &[(String, CombinationOutcome)] {
        &self.outcomes
    }

    /// Emit the user-facing end-of-run summary.
    pub fn log_summary(&self) {
        log::info!(
            "run finished in {:.0?}: {} combinations attempted, {} scraped, {} empty, {} failed",
            self.started.elapsed(),
            self.attempted(),
            self.scraped(),
            self.empty(),
            self.failed()
        );
        log::info!(
            "{} records written, {} entries skipped",
            self.records_written(),
            self.records_skipped()
        );

        for (name, outcome) in &self.outcomes {
            match outcome {
                CombinationOutcome::Scraped { records, skipped } => {
                    log::info!("  {}: {} records ({} skipped)", name, records, skipped)
                }
                CombinationOutcome::Captured { payloads } => {
                    log::info!("  {}: {} payload(s) captured", name, payloads)
                }
                CombinationOutcome::Empty => log::info!("  {}: no products", name),
                CombinationOutcome::Failed(reason) => {
                    log::warn!("  {}: skipped ({})", name, reason)
                }
            }
        }
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}
