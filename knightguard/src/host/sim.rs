use std::collections::{BTreeMap, VecDeque};

use tracing::debug;

use super::HostBus;
use crate::engine::bus::{BusEvent, ChannelNoticeKind, ChatBus, FriendEntry, RosterEntry};

/// Which member-list text format the simulated server answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberDialect {
    /// `Members of Name(3): a, b, c`
    MembersOf,
    /// `[6. Name] a, b, c`
    Bracketed,
    /// `a, b, c`
    Bare,
}

#[derive(Debug, Clone)]
struct SimChannel {
    name: String,
    index: Option<u32>,
    /// Member names including role sigils.
    members: Vec<String>,
    color: Option<String>,
    shown_in_default_output: bool,
}

impl SimChannel {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            index: None,
            members: Vec::new(),
            color: None,
            shown_in_default_output: false,
        }
    }
}

/// In-process stand-in for the chat host.
///
/// Joins register after `join_delay_ticks` host steps; list queries are
/// answered on the next step with the channel reported as `<name>-<realm>`.
#[derive(Debug)]
pub struct SimulatedServer {
    realm: String,
    dialect: MemberDialect,
    join_delay_ticks: u32,
    channels: BTreeMap<String, SimChannel>,
    pending_joins: Vec<(String, u32)>,
    pending_lists: Vec<String>,
    friends: Vec<FriendEntry>,
    roster: Vec<RosterEntry>,
    outbox: VecDeque<BusEvent>,
    next_index: u32,
    /// Every list query received, in order.
    pub list_queries: Vec<String>,
}

impl SimulatedServer {
    pub fn new(realm: &str) -> Self {
        Self {
            realm: realm.to_string(),
            dialect: MemberDialect::MembersOf,
            join_delay_ticks: 5,
            channels: BTreeMap::new(),
            pending_joins: Vec::new(),
            pending_lists: Vec::new(),
            friends: Vec::new(),
            roster: Vec::new(),
            outbox: VecDeque::new(),
            next_index: 1,
            list_queries: Vec::new(),
        }
    }

    pub fn with_dialect(mut self, dialect: MemberDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_join_delay(mut self, ticks: u32) -> Self {
        self.join_delay_ticks = ticks;
        self
    }

    /// A server with a populated channel, friends list and guild roster.
    pub fn demo(realm: &str, channel: &str) -> Self {
        let mut sim = Self::new(realm);
        for member in ["*Aldric", "+Brenna", "Cedric", "Dagny", "Elowen", "Fenwick"] {
            sim.add_channel_member(channel, member);
        }
        sim.add_friend(FriendEntry {
            name: "Brenna".into(),
            class: Some("Paladin".into()),
            zone: Some("Stormwind City".into()),
            connected: true,
        });
        sim.add_friend(FriendEntry {
            name: "Dagny".into(),
            class: Some("Unknown".into()),
            zone: Some("Unknown".into()),
            connected: false,
        });
        sim.add_roster_member(RosterEntry {
            name: "Aldric".into(),
            class: Some("WARRIOR".into()),
            zone: Some("Ironforge".into()),
            online: true,
        });
        sim.add_roster_member(RosterEntry {
            name: "Cedric".into(),
            class: Some("Magier".into()),
            zone: Some("Darnassus".into()),
            online: false,
        });
        sim.add_roster_member(RosterEntry {
            name: "Elowen".into(),
            class: Some("Druid".into()),
            zone: Some("Moonglade".into()),
            online: true,
        });
        sim
    }

    fn channel_mut(&mut self, name: &str) -> &mut SimChannel {
        self.channels
            .entry(name.to_lowercase())
            .or_insert_with(|| SimChannel::new(name))
    }

    pub fn add_channel_member(&mut self, channel: &str, member: &str) {
        self.channel_mut(channel).members.push(member.to_string());
    }

    pub fn remove_channel_member(&mut self, channel: &str, member: &str) {
        let ch = self.channel_mut(channel);
        ch.members
            .retain(|m| m.trim_start_matches(['*', '+']) != member);
    }

    pub fn add_friend(&mut self, friend: FriendEntry) {
        self.friends.push(friend);
    }

    pub fn add_roster_member(&mut self, member: RosterEntry) {
        self.roster.push(member);
    }

    /// Register a channel immediately, as if joined in an earlier session.
    pub fn register_channel(&mut self, channel: &str) -> u32 {
        let index = self.next_index;
        self.next_index += 1;
        self.channel_mut(channel).index = Some(index);
        index
    }

    /// Queue an arbitrary event, e.g. traffic for some other channel.
    pub fn push_event(&mut self, event: BusEvent) {
        self.outbox.push_back(event);
    }

    pub fn channel_color(&self, channel: &str) -> Option<&str> {
        self.channels
            .get(&channel.to_lowercase())
            .and_then(|c| c.color.as_deref())
    }

    pub fn is_shown_in_default_output(&self, channel: &str) -> bool {
        self.channels
            .get(&channel.to_lowercase())
            .is_some_and(|c| c.shown_in_default_output)
    }

    fn member_payload(&self, ch: &SimChannel) -> String {
        let list = ch.members.join(", ");
        match self.dialect {
            MemberDialect::MembersOf => {
                format!("Members of {}({}): {list}", ch.name, ch.members.len())
            }
            MemberDialect::Bracketed => {
                format!("[{}. {}] {list}", ch.index.unwrap_or(0), ch.name)
            }
            MemberDialect::Bare => list,
        }
    }
}

impl ChatBus for SimulatedServer {
    fn list_channel(&mut self, channel: &str) {
        self.list_queries.push(channel.to_string());
        self.pending_lists.push(channel.to_lowercase());
    }

    fn join_channel(&mut self, channel: &str) {
        let key = channel.to_lowercase();
        let already = self.channels.get(&key).is_some_and(|c| c.index.is_some());
        if already {
            self.outbox.push_back(BusEvent::ChannelNotice {
                channel: channel.to_string(),
                kind: ChannelNoticeKind::Joined,
            });
            return;
        }
        self.channel_mut(channel);
        if !self.pending_joins.iter().any(|(k, _)| *k == key) {
            self.pending_joins.push((key, self.join_delay_ticks));
        }
    }

    fn channel_index(&self, channel: &str) -> Option<u32> {
        self.channels
            .get(&channel.to_lowercase())
            .and_then(|c| c.index)
    }

    fn friends(&self) -> Vec<FriendEntry> {
        self.friends.clone()
    }

    fn guild_roster(&self, include_offline: bool) -> Vec<RosterEntry> {
        self.roster
            .iter()
            .filter(|m| include_offline || m.online)
            .cloned()
            .collect()
    }

    fn set_channel_color(&mut self, channel: &str, color: &str) {
        self.channel_mut(channel).color = Some(color.to_string());
    }

    fn show_channel_in_default_output(&mut self, channel: &str) {
        self.channel_mut(channel).shown_in_default_output = true;
    }
}

impl HostBus for SimulatedServer {
    fn step(&mut self) {
        let mut registered = Vec::new();
        self.pending_joins.retain_mut(|(key, remaining)| {
            if *remaining == 0 {
                registered.push(key.clone());
                false
            } else {
                *remaining -= 1;
                true
            }
        });
        for key in registered {
            let index = self.next_index;
            self.next_index += 1;
            if let Some(ch) = self.channels.get_mut(&key) {
                ch.index = Some(index);
                debug!(channel = %ch.name, index, "simulated join registered");
                self.outbox.push_back(BusEvent::ChannelNotice {
                    channel: ch.name.clone(),
                    kind: ChannelNoticeKind::Joined,
                });
            }
        }

        for key in std::mem::take(&mut self.pending_lists) {
            // Unknown channels get no answer at all
            let Some(ch) = self.channels.get(&key) else {
                continue;
            };
            let event = BusEvent::ChannelList {
                channel: format!("{}-{}", ch.name, self.realm),
                payload: self.member_payload(ch),
            };
            self.outbox.push_back(event);
        }
    }

    fn take_events(&mut self) -> Vec<BusEvent> {
        self.outbox.drain(..).collect()
    }
}
