//! Lifecycle of one engine on one page, driven by an explicit clock.
//!
//! The host forwards page events (`ready`, `mutation`, `scroll`) and calls
//! [`Session::advance`] with the current time so due timers can fire. The
//! browser host wires a MutationObserver and a scroll listener to these and
//! keeps one timeout armed for [`Session::next_deadline`]; the tests drive
//! them directly.

use crate::config::EngineConfig;
use crate::dom::Dom;
use crate::engine::{CardEngine, Debounce, Interval, ScanReport, Trigger};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    /// `start` was called before the document finished loading
    WaitingForReady,
    Running,
    Stopped,
}

/// Which mutations the session listens to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observer {
    Off,
    Body,
    /// Only nodes inside elements matching this selector
    Root(String),
}

pub struct Session<D: Dom> {
    engine: CardEngine<D>,
    state: SessionState,
    observer: Observer,
    scroll: Debounce,
    poll: Interval,
}

impl<D: Dom> Session<D> {
    pub fn new(engine: CardEngine<D>, config: &EngineConfig) -> Self {
        Self {
            engine,
            state: SessionState::Idle,
            observer: Observer::Off,
            scroll: Debounce::new(config.scroll_debounce_ms),
            poll: Interval::new(config.poll_interval_ms),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn engine(&self) -> &CardEngine<D> {
        &self.engine
    }

    pub fn is_observing(&self) -> bool {
        self.observer != Observer::Off
    }

    /// What the host should attach its mutation observer to
    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    /// The host could not install its observer; scroll and poll still run
    pub fn disable_observer(&mut self) {
        self.observer = Observer::Off;
    }

    pub fn is_polling(&self) -> bool {
        self.poll.is_running()
    }

    pub fn scroll_pending(&self) -> bool {
        self.scroll.is_pending()
    }

    /// Begin processing. Runs the init scan right away when the document is
    /// ready, otherwise on [`Session::ready`]. Calling it while running is a no-op.
    pub fn start(&mut self, dom: &mut D, now: u64) -> Option<ScanReport> {
        match self.state {
            SessionState::Running | SessionState::WaitingForReady => None,
            SessionState::Idle | SessionState::Stopped => {
                if dom.is_ready() {
                    Some(self.begin(dom, now))
                } else {
                    self.state = SessionState::WaitingForReady;
                    None
                }
            }
        }
    }

    /// `DOMContentLoaded`
    pub fn ready(&mut self, dom: &mut D, now: u64) -> Option<ScanReport> {
        if self.state == SessionState::WaitingForReady {
            Some(self.begin(dom, now))
        } else {
            None
        }
    }

    /// Disable every trigger and drop pending timers. Safe to call in any state.
    pub fn stop(&mut self) {
        if self.state == SessionState::Running {
            info!(site = %self.engine.adapter().name, "stopped");
        }
        self.state = SessionState::Stopped;
        self.observer = Observer::Off;
        self.scroll.cancel();
        self.poll.stop();
    }

    pub fn mutation(&mut self, dom: &mut D, added: &[D::Node]) -> Option<ScanReport> {
        if self.state != SessionState::Running {
            return None;
        }
        let watched: Vec<D::Node> = match &self.observer {
            Observer::Off => return None,
            Observer::Body => added.to_vec(),
            Observer::Root(sel) => added
                .iter()
                .filter(|node| matches!(dom.closest(node, sel), Ok(Some(_))))
                .cloned()
                .collect(),
        };
        if watched.is_empty() {
            return None;
        }
        Some(self.engine.on_mutation(dom, &watched))
    }

    /// A scroll event; the scan runs once scrolling has been quiet for the debounce delay
    pub fn scroll(&mut self, now: u64) {
        if self.state == SessionState::Running {
            self.scroll.schedule(now);
        }
    }

    /// Earliest time at which [`Session::advance`] has work, while running
    pub fn next_deadline(&self) -> Option<u64> {
        if self.state != SessionState::Running {
            return None;
        }
        match (self.scroll.deadline(), self.poll.next()) {
            (Some(s), Some(p)) => Some(s.min(p)),
            (s, p) => s.or(p),
        }
    }

    /// Fire every timer due at `now`, earliest first
    pub fn advance(&mut self, dom: &mut D, now: u64) -> Vec<ScanReport> {
        let mut reports = Vec::new();
        while self.state == SessionState::Running {
            let scroll_at = self.scroll.deadline().filter(|at| *at <= now);
            let poll_at = self.poll.next().filter(|at| *at <= now);

            let trigger = match (scroll_at, poll_at) {
                (Some(s), Some(p)) if s <= p => Trigger::Scroll,
                (Some(_), None) => Trigger::Scroll,
                (_, Some(_)) => Trigger::Poll,
                (None, None) => break,
            };
            match trigger {
                Trigger::Scroll => self.scroll.fire(now),
                _ => self.poll.fire(now),
            };
            reports.push(self.engine.rescan(dom, trigger));
        }
        reports
    }

    fn begin(&mut self, dom: &mut D, now: u64) -> ScanReport {
        self.state = SessionState::Running;
        let site = self.engine.adapter().name.clone();
        info!(site = %site, "started");

        let report = self.engine.rescan(dom, Trigger::Init);

        self.observer = match self.engine.adapter().selectors.observe_root.clone() {
            None => Observer::Body,
            Some(sel) => match dom.query_all(&sel) {
                Ok(roots) if !roots.is_empty() => Observer::Root(sel),
                Ok(_) => {
                    warn!(site = %site, selector = %sel, "observe root not found, relying on scroll and poll");
                    Observer::Off
                }
                Err(e) => {
                    warn!(site = %site, error = %e, "observe root unusable, relying on scroll and poll");
                    Observer::Off
                }
            },
        };
        self.poll.start(now);
        report
    }
}
