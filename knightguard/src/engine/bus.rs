use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Asynchronous event delivered by the chat host. Handlers receive these
/// one at a time, interleaved with scheduler ticks in no guaranteed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusEvent {
    /// Response to a prior "list channel by name" query.
    ChannelList {
        /// Channel name as reported by the host (may carry a realm suffix).
        channel: String,
        /// Loosely-formatted member text.
        payload: String,
    },

    /// Host acknowledgement of a channel join or leave.
    ChannelNotice {
        channel: String,
        kind: ChannelNoticeKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelNoticeKind {
    Joined,
    Left,
}

/// One entry of the host's friends registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendEntry {
    pub name: String,
    pub class: Option<String>,
    pub zone: Option<String>,
    pub connected: bool,
}

/// One entry of the host's guild roster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub class: Option<String>,
    pub zone: Option<String>,
    pub online: bool,
}

/// The chat host as seen from the engine.
///
/// Queries named `list_*`/`join_*` are fire-and-forget: their results, if
/// any, arrive later as [`BusEvent`]s. The remaining methods are synchronous
/// lookups against host-side state.
pub trait ChatBus {
    /// Ask the host for the member list of a channel.
    fn list_channel(&mut self, channel: &str);

    /// Ask the host to join a channel.
    fn join_channel(&mut self, channel: &str);

    /// Server index of a joined channel, `None` when not (yet) joined.
    fn channel_index(&self, channel: &str) -> Option<u32>;

    /// Current friends registry.
    fn friends(&self) -> Vec<FriendEntry>;

    /// Current guild roster; offline members are included when asked for.
    fn guild_roster(&self, include_offline: bool) -> Vec<RosterEntry>;

    /// Apply a display color (`rrggbb`) to a joined channel.
    fn set_channel_color(&mut self, channel: &str, color: &str);

    /// Make sure the channel's messages show up in the default chat output.
    fn show_channel_in_default_output(&mut self, channel: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// A user-visible message queued for the host to print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
            at: Utc::now(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
            at: Utc::now(),
        }
    }
}
