use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::bus::{BusEvent, ChannelNoticeKind, ChatBus, Notice};
use super::channel::ChannelState;
use super::correlator::{Correlation, MemberSnapshot, PendingRequest, RequestCorrelator};
use super::poller::{PollOutcome, RetryPoller, delay_elapsed};
use super::presence::PresenceCache;
use super::saved::{BadgePosition, SavedSet};
use super::view_model::{ListViewModel, ScrollState, ViewRow, ViewSources};
use crate::config::KnightConfig;

/// Server index of a channel, treating 0 as "not registered".
fn registered_index<B: ChatBus + ?Sized>(bus: &B, channel: &str) -> Option<u32> {
    bus.channel_index(channel).filter(|idx| *idx > 0)
}

/// The three pollers that drive channel setup.
#[derive(Debug)]
struct SetupPollers {
    /// Re-applies the channel color after login; gives up silently.
    color_setup: RetryPoller,
    /// Waits for a requested join to register; failure is user-visible.
    join_setup: RetryPoller,
    /// Fixed delay between a completed join and the member request.
    member_request_delay: RetryPoller,
    member_request_delay_ticks: u32,
}

impl SetupPollers {
    fn from_config(config: &KnightConfig) -> Self {
        Self {
            color_setup: RetryPoller::bounded("color-setup", config.pollers.color_setup_max_ticks),
            join_setup: RetryPoller::bounded("join-setup", config.pollers.join_setup_max_ticks),
            member_request_delay: RetryPoller::unbounded("member-request-delay"),
            member_request_delay_ticks: config.pollers.member_request_delay_ticks,
        }
    }

    fn stop_all(&mut self) {
        self.color_setup.stop();
        self.join_setup.stop();
        self.member_request_delay.stop();
    }
}

/// The engine context: owns every piece of session state and the host bus.
///
/// All handlers run on one thread, one event or tick at a time.
pub struct KnightEngine<B: ChatBus> {
    bus: B,
    channel: ChannelState,
    correlator: RequestCorrelator,
    presence: PresenceCache,
    saved: SavedSet,
    view: ListViewModel,
    pollers: SetupPollers,
    window_shown: bool,
    notices: Vec<Notice>,
}

impl<B: ChatBus> KnightEngine<B> {
    pub fn new(bus: B, config: &KnightConfig, saved: SavedSet) -> Self {
        let mut engine = Self {
            bus,
            channel: ChannelState::new(config.channel.name.clone(), config.channel.color.clone()),
            correlator: RequestCorrelator::new(),
            presence: PresenceCache::new(),
            saved,
            view: ListViewModel::new(config.view.max_visible),
            pollers: SetupPollers::from_config(config),
            window_shown: false,
            notices: Vec::new(),
        };
        engine.recompute();
        engine
    }

    // ── Session lifecycle ───────────────────────────────────────────

    /// Start of a session: drop volatile state and re-apply channel setup
    /// once the host has registered the channel.
    pub fn login(&mut self) {
        self.correlator = RequestCorrelator::new();
        self.channel.server_index = None;
        self.pollers.stop_all();
        self.pollers.color_setup.start();
        self.recompute();
        info!(channel = %self.channel.name, "session started");
    }

    /// Show the window, refresh presence, and ask for fresh membership.
    pub fn open_view(&mut self) {
        self.window_shown = true;
        self.rescan_presence();
        self.request_members();
    }

    pub fn close_view(&mut self) {
        self.window_shown = false;
    }

    pub fn toggle_window(&mut self) {
        if self.window_shown {
            self.close_view();
        } else {
            self.open_view();
        }
    }

    pub fn rescan_presence(&mut self) {
        let friends = self.bus.friends();
        let roster = self.bus.guild_roster(true);
        self.presence.rescan(&friends, &roster);
    }

    // ── Channel membership ──────────────────────────────────────────

    /// Issue a join and wait for the host to register the channel.
    pub fn join_channel(&mut self) {
        self.bus.join_channel(&self.channel.name);
        self.pollers.join_setup.start();
        info!(channel = %self.channel.name, "join requested");
    }

    /// Fire a member-list query for the managed channel.
    pub fn request_members(&mut self) {
        self.correlator
            .request_members(&self.channel.name, &mut self.bus);
        self.recompute();
    }

    pub fn on_bus_event(&mut self, event: BusEvent) {
        match event {
            BusEvent::ChannelList { channel, payload } => {
                if self.correlator.on_channel_list(&channel, &payload) == Correlation::Matched {
                    self.recompute();
                }
            }
            BusEvent::ChannelNotice { channel, kind } => {
                debug!(%channel, ?kind, "channel notice");
                if channel.eq_ignore_ascii_case(&self.channel.name) {
                    self.channel.server_index = match kind {
                        ChannelNoticeKind::Joined => registered_index(&self.bus, &channel),
                        ChannelNoticeKind::Left => None,
                    };
                    if self.window_shown {
                        self.recompute();
                    }
                }
            }
        }
    }

    /// One scheduler tick. Drives all three pollers.
    pub fn on_tick(&mut self) {
        let name = self.channel.name.as_str();
        let bus = &self.bus;

        let color = self
            .pollers
            .color_setup
            .tick(|_| registered_index(bus, name).is_some());
        let join = self
            .pollers
            .join_setup
            .tick(|_| registered_index(bus, name).is_some());
        let delay = self
            .pollers
            .member_request_delay
            .tick(delay_elapsed(self.pollers.member_request_delay_ticks));

        match color {
            PollOutcome::Succeeded => self.apply_channel_setup(),
            PollOutcome::Exhausted => {
                debug!(channel = %self.channel.name, "channel not registered, skipping color setup");
            }
            PollOutcome::Idle | PollOutcome::Waiting => {}
        }

        match join {
            PollOutcome::Succeeded => {
                self.apply_channel_setup();
                if !self.window_shown {
                    self.window_shown = true;
                    self.rescan_presence();
                    self.recompute();
                }
                self.pollers.member_request_delay.start();
                info!(channel = %self.channel.name, "channel joined");
            }
            PollOutcome::Exhausted => {
                warn!(channel = %self.channel.name, "join did not complete");
                self.notices
                    .push(Notice::warning(format!("Could not join {}", self.channel.name)));
            }
            PollOutcome::Idle | PollOutcome::Waiting => {}
        }

        if delay == PollOutcome::Succeeded {
            self.request_members();
            self.notices.push(Notice::info(format!(
                "Requesting members of {}...",
                self.channel.name
            )));
        }
    }

    fn apply_channel_setup(&mut self) {
        self.channel.server_index = registered_index(&self.bus, &self.channel.name);
        self.bus
            .set_channel_color(&self.channel.name, &self.channel.color);
        self.bus.show_channel_in_default_output(&self.channel.name);
        debug!(
            channel = %self.channel.name,
            index = ?self.channel.server_index,
            "channel color applied"
        );
    }

    // ── View ────────────────────────────────────────────────────────

    pub fn recompute(&mut self) {
        self.view.recompute(&ViewSources {
            channel: Some(self.channel.name.as_str()),
            snapshot: self.correlator.snapshot(),
            pending: self.correlator.is_pending(),
            saved: &self.saved,
            presence: &self.presence,
        });
    }

    pub fn scroll_up(&mut self) {
        self.view.scroll_up();
        self.recompute();
    }

    pub fn scroll_down(&mut self) {
        self.view.scroll_down();
        self.recompute();
    }

    pub fn rows(&self) -> &[Option<ViewRow>] {
        self.view.rows()
    }

    pub fn status_line(&self) -> &str {
        self.view.status_line()
    }

    pub fn scroll(&self) -> ScrollState {
        self.view.scroll()
    }

    pub fn render_lines(&self) -> Vec<String> {
        self.view.render_lines()
    }

    // ── Saved set ───────────────────────────────────────────────────

    /// Flip a player's saved state. Returns whether it is saved afterwards.
    pub fn toggle_saved(&mut self, name: &str) -> bool {
        let saved = self.saved.toggle(name);
        self.recompute();
        saved
    }

    pub fn add_saved(&mut self, name: &str) -> bool {
        let added = self.saved.add(name);
        self.recompute();
        added
    }

    pub fn remove_saved(&mut self, name: &str) -> bool {
        let removed = self.saved.remove(name);
        self.recompute();
        removed
    }

    /// Saved player names, sorted. Never includes the badge position keys.
    pub fn list_saved(&self) -> Vec<String> {
        self.saved.names().map(str::to_string).collect()
    }

    pub fn set_badge_position(&mut self, badge: BadgePosition) {
        self.saved.set_badge(badge);
    }

    /// The persisted mapping, if anything changed since the last call.
    pub fn take_saved_changes(&mut self) -> Option<BTreeMap<String, Value>> {
        if self.saved.take_dirty() {
            Some(self.saved.to_persisted())
        } else {
            None
        }
    }

    // ── Diagnostics ─────────────────────────────────────────────────

    pub fn debug_dump(&self) -> Vec<String> {
        let mut out = Vec::new();
        let name = &self.channel.name;

        out.push(format!(
            "channel {name}: registry index {:?}, joined {}",
            self.bus.channel_index(name),
            self.channel.is_joined()
        ));
        match self.correlator.pending() {
            Some(p) => out.push(format!(
                "pending request: {} (since {})",
                p.channel_name,
                p.issued_at.format("%H:%M:%S")
            )),
            None => out.push("pending request: none".into()),
        }
        let snap = self.correlator.snapshot();
        out.push(format!(
            "snapshot: {} members of {:?}",
            snap.members.len(),
            snap.channel_name
        ));

        let friends = self.bus.friends();
        let roster = self.bus.guild_roster(true);
        out.push(format!(
            "friends: {} ({} connected)",
            friends.len(),
            friends.iter().filter(|f| f.connected).count()
        ));
        out.push(format!(
            "roster: {} ({} online)",
            roster.len(),
            roster.iter().filter(|m| m.online).count()
        ));
        out.push(format!(
            "presence cache: {} classes, {} zones",
            self.presence.class_count(),
            self.presence.zone_count()
        ));
        for (player, class, zone) in self.presence.entries() {
            out.push(format!(
                "  {player}: {} / {}",
                class.map(|c| c.as_str()).unwrap_or("?"),
                zone.as_deref().unwrap_or("?")
            ));
        }
        for poller in [
            &self.pollers.color_setup,
            &self.pollers.join_setup,
            &self.pollers.member_request_delay,
        ] {
            let state = poller.state();
            out.push(format!(
                "poller {}: active {}, ticks {}",
                poller.name(),
                state.is_active,
                state.ticks_elapsed
            ));
        }
        out
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn channel(&self) -> &ChannelState {
        &self.channel
    }

    pub fn snapshot(&self) -> &MemberSnapshot {
        self.correlator.snapshot()
    }

    pub fn pending_request(&self) -> Option<&PendingRequest> {
        self.correlator.pending()
    }

    pub fn presence(&self) -> &PresenceCache {
        &self.presence
    }

    pub fn saved(&self) -> &SavedSet {
        &self.saved
    }

    pub fn is_window_shown(&self) -> bool {
        self.window_shown
    }

    pub fn pollers_active(&self) -> [bool; 3] {
        [
            self.pollers.color_setup.is_active(),
            self.pollers.join_setup.is_active(),
            self.pollers.member_request_delay.is_active(),
        ]
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}
