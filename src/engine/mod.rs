// Card discovery and per-card bookkeeping. The engine owns no DOM and no
// timers: hosts hand it the page on every trigger.

pub mod schedule;
pub mod session;
pub mod trigger;
mod tests;

pub use schedule::{Debounce, Interval};
pub use session::{Observer, Session, SessionState};
pub use trigger::Trigger;

use crate::adapter::{AdapterError, Outcome, SiteAdapter};
use crate::dom::Dom;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Summary of one scan
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanReport {
    pub trigger: Trigger,
    /// Cards considered (all cards for a full scan, candidates for a mutation)
    pub cards: usize,
    /// Badges rendered by this scan
    pub rendered: usize,
    /// Cards not eligible yet, already badged, or past the retry cap
    pub skipped: usize,
    pub failed: usize,
    pub outcomes: Vec<Outcome>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub attempts: u32,
    pub last_error: AdapterError,
}

pub struct CardEngine<D: Dom> {
    adapter: SiteAdapter,
    max_attempts: Option<u32>,
    processed: HashSet<D::Node>,
    failed: HashMap<D::Node, Failure>,
    capped: HashSet<D::Node>,
    selector_warned: bool,
}

impl<D: Dom> CardEngine<D> {
    pub fn new(adapter: SiteAdapter) -> Self {
        Self {
            adapter,
            max_attempts: None,
            processed: HashSet::new(),
            failed: HashMap::new(),
            capped: HashSet::new(),
            selector_warned: false,
        }
    }

    /// Stop retrying a card after `limit` failures; `None` retries forever
    pub fn with_max_attempts(mut self, limit: Option<u32>) -> Self {
        self.max_attempts = limit;
        self
    }

    pub fn adapter(&self) -> &SiteAdapter {
        &self.adapter
    }

    pub fn is_processed(&self, card: &D::Node) -> bool {
        self.processed.contains(card)
    }

    pub fn failure(&self, card: &D::Node) -> Option<&Failure> {
        self.failed.get(card)
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Full scan of every card on the page
    pub fn rescan(&mut self, dom: &mut D, trigger: Trigger) -> ScanReport {
        let mut report = ScanReport {
            trigger,
            ..ScanReport::default()
        };

        let cards = match dom.query_all(self.adapter.card_selector()) {
            Ok(cards) => cards,
            Err(e) => {
                if !self.selector_warned {
                    warn!(site = %self.adapter.name, error = %e, "card selector unusable, nothing to scan");
                    self.selector_warned = true;
                }
                return report;
            }
        };

        // forget cards that left the page
        let present: HashSet<&D::Node> = cards.iter().collect();
        self.processed.retain(|card| present.contains(card));
        self.failed.retain(|card, _| present.contains(card));
        self.capped.retain(|card| present.contains(card));

        debug!(site = %self.adapter.name, %trigger, cards = cards.len(), "scan");
        for card in &cards {
            self.visit(dom, card, trigger, &mut report);
        }
        report
    }

    /// Process only the cards touched by `added` nodes: cards among them,
    /// cards inside them, and the card enclosing each of them.
    pub fn on_mutation(&mut self, dom: &mut D, added: &[D::Node]) -> ScanReport {
        let mut report = ScanReport {
            trigger: Trigger::Mutation,
            ..ScanReport::default()
        };

        let selector = self.adapter.card_selector().to_string();
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for node in added {
            let enclosing = match dom.closest(node, &selector) {
                Ok(found) => found,
                Err(e) => {
                    if !self.selector_warned {
                        warn!(site = %self.adapter.name, error = %e, "card selector unusable, nothing to scan");
                        self.selector_warned = true;
                    }
                    return report;
                }
            };
            let nested = dom.query_within(node, &selector).unwrap_or_default();
            for card in enclosing.into_iter().chain(nested) {
                if seen.insert(card.clone()) {
                    candidates.push(card);
                }
            }
        }

        for card in &candidates {
            self.visit(dom, card, Trigger::Mutation, &mut report);
        }
        report
    }

    fn visit(&mut self, dom: &mut D, card: &D::Node, trigger: Trigger, report: &mut ScanReport) {
        report.cards += 1;

        if let (Some(limit), Some(failure)) = (self.max_attempts, self.failed.get(card)) {
            if failure.attempts >= limit {
                if self.capped.insert(card.clone()) {
                    info!(
                        site = %self.adapter.name,
                        attempts = failure.attempts,
                        error = %failure.last_error,
                        "giving up on card"
                    );
                }
                report.skipped += 1;
                return;
            }
        }

        let eligible = match self.adapter.should_process(dom, card) {
            Ok(eligible) => eligible,
            Err(e) => {
                self.record_failure(card, e, trigger, report);
                return;
            }
        };
        if !eligible {
            report.skipped += 1;
            return;
        }

        match self.try_process(dom, card, trigger) {
            Ok(outcome) => {
                report.rendered += 1;
                report.outcomes.push(outcome);
            }
            Err(e) => {
                report.failed += 1;
                report.errors.push(e.to_string());
            }
        }
    }

    /// Run the adapter on one card. Errors are recorded against the card and
    /// returned for reporting; nothing here panics or aborts a scan.
    pub fn try_process(&mut self, dom: &mut D, card: &D::Node, trigger: Trigger) -> Result<Outcome, AdapterError> {
        match self.adapter.process(dom, card) {
            Ok(outcome) => {
                if let Some(previous) = self.failed.remove(card) {
                    debug!(site = %self.adapter.name, %trigger, attempts = previous.attempts, "card recovered");
                }
                self.processed.insert(card.clone());
                Ok(outcome)
            }
            Err(e) => {
                let attempts = self.note_failure(card, &e);
                if attempts == 1 {
                    warn!(site = %self.adapter.name, %trigger, error = %e, "card failed");
                } else {
                    debug!(site = %self.adapter.name, %trigger, attempts, error = %e, "card failed again");
                }
                Err(e)
            }
        }
    }

    fn record_failure(&mut self, card: &D::Node, e: AdapterError, trigger: Trigger, report: &mut ScanReport) {
        let attempts = self.note_failure(card, &e);
        debug!(site = %self.adapter.name, %trigger, attempts, error = %e, "eligibility check failed");
        report.failed += 1;
        report.errors.push(e.to_string());
    }

    fn note_failure(&mut self, card: &D::Node, e: &AdapterError) -> u32 {
        let entry = self.failed.entry(card.clone()).or_insert(Failure {
            attempts: 0,
            last_error: e.clone(),
        });
        entry.attempts += 1;
        entry.last_error = e.clone();
        entry.attempts
    }
}
