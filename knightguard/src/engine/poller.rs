//! Tick-driven bounded retry polling.
//!
//! The chat host has no synchronous "did the join complete" signal, so the
//! engine discovers completion by re-checking a condition on every scheduler
//! tick until it holds or the tick budget runs out. Each use site owns one
//! [`RetryPoller`]; the success predicate is supplied per tick and the
//! outcome is returned to the caller, which runs the site-specific
//! success/exhaustion actions.

use tracing::debug;

/// Color setup gives up silently after this many failed ticks.
pub const COLOR_SETUP_MAX_TICKS: u32 = 20;

/// Join setup reports failure after this many failed ticks.
pub const JOIN_SETUP_MAX_TICKS: u32 = 60;

/// Ticks to wait after a join before asking for the member list.
pub const MEMBER_REQUEST_DELAY_TICKS: u32 = 60;

/// Counter state of one poller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollState {
    pub ticks_elapsed: u32,
    /// `None` means the poller never exhausts.
    pub max_ticks: Option<u32>,
    pub is_active: bool,
}

/// Result of feeding one tick to a poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The poller is not running; the tick was ignored.
    Idle,
    /// Predicate still false, budget left.
    Waiting,
    /// Predicate held; the poller deactivated.
    Succeeded,
    /// Budget ran out; the poller deactivated.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct RetryPoller {
    name: &'static str,
    state: PollState,
}

impl RetryPoller {
    pub fn new(name: &'static str, max_ticks: Option<u32>) -> Self {
        Self {
            name,
            state: PollState {
                ticks_elapsed: 0,
                max_ticks,
                is_active: false,
            },
        }
    }

    /// Poller that waits for the channel to be registered, bounded by `max_ticks`.
    pub fn bounded(name: &'static str, max_ticks: u32) -> Self {
        Self::new(name, Some(max_ticks))
    }

    /// Poller with no budget; its predicate must become true on its own.
    pub fn unbounded(name: &'static str) -> Self {
        Self::new(name, None)
    }

    /// (Re)start from zero. Supersedes any run in progress.
    pub fn start(&mut self) {
        self.state.ticks_elapsed = 0;
        self.state.is_active = true;
        debug!(poller = self.name, "poller started");
    }

    pub fn stop(&mut self) {
        self.state.is_active = false;
    }

    /// Feed one scheduler tick. `ready` is only evaluated while active.
    pub fn tick(&mut self, ready: impl FnOnce(&PollState) -> bool) -> PollOutcome {
        if !self.state.is_active {
            return PollOutcome::Idle;
        }

        if ready(&self.state) {
            self.state.is_active = false;
            debug!(
                poller = self.name,
                ticks = self.state.ticks_elapsed,
                "poller succeeded"
            );
            return PollOutcome::Succeeded;
        }

        self.state.ticks_elapsed += 1;
        match self.state.max_ticks {
            Some(max) if self.state.ticks_elapsed > max => {
                self.state.is_active = false;
                debug!(poller = self.name, max, "poller exhausted");
                PollOutcome::Exhausted
            }
            _ => PollOutcome::Waiting,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Predicate for fixed-duration delay pollers: true once `ticks` have elapsed.
pub fn delay_elapsed(ticks: u32) -> impl Fn(&PollState) -> bool {
    move |state| state.ticks_elapsed >= ticks
}
