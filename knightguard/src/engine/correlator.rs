use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::bus::ChatBus;
use super::member_list::parse_member_list;

/// The single in-flight "list channel" query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub channel_name: String,
    pub issued_at: DateTime<Utc>,
}

/// Most recently fetched member list. Replaced wholesale, never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberSnapshot {
    pub channel_name: String,
    /// Sorted canonical names.
    pub members: Vec<String>,
    pub fetched_at: Option<DateTime<Utc>>,
}

/// What happened to a member-list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    /// Nothing was pending; the event was ignored.
    NoPending,
    /// The event belongs to some other channel and was dropped.
    Mismatch,
    /// The event answered the pending request and the snapshot was replaced.
    Matched,
}

/// Matching key for a requested channel name.
///
/// Lowercased; when a `-` qualifier follows whitespace (`"KnightGuard - EU"`),
/// only the part before that whitespace run is kept. Hyphens inside the name
/// itself (`"Knight-Guard"`) are not separators, and a name with nothing
/// before its separator keeps its full lowercase form.
pub fn channel_match_key(requested: &str) -> String {
    let lower = requested.to_lowercase();
    for (idx, _) in lower.match_indices('-') {
        let head = &lower[..idx];
        let prefix = head.trim_end();
        if prefix.len() < head.len() && !prefix.is_empty() {
            return prefix.to_string();
        }
    }
    lower
}

/// Whether a response's channel field answers a request for `requested`.
///
/// Heuristic: the host may report the channel with a realm or locale suffix
/// (`"KnightGuard-Realm1"`), so the check is a case-insensitive substring
/// test of the match key against the reported name.
pub fn channel_matches(requested: &str, reported: &str) -> bool {
    reported
        .to_lowercase()
        .contains(&channel_match_key(requested))
}

/// Tracks the outstanding member request and correlates async responses to it.
#[derive(Debug, Default)]
pub struct RequestCorrelator {
    pending: Option<PendingRequest>,
    snapshot: MemberSnapshot,
}

impl RequestCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any pending request, clear the snapshot, and fire the query.
    ///
    /// A late response to a superseded request is dropped unless it names the
    /// same channel, in which case it still satisfies the new request.
    pub fn request_members<B: ChatBus + ?Sized>(&mut self, channel_name: &str, bus: &mut B) {
        if let Some(prev) = &self.pending {
            debug!(previous = %prev.channel_name, "superseding pending member request");
        }

        self.pending = Some(PendingRequest {
            channel_name: channel_name.to_string(),
            issued_at: Utc::now(),
        });
        self.snapshot = MemberSnapshot {
            channel_name: channel_name.to_string(),
            members: Vec::new(),
            fetched_at: None,
        };

        bus.list_channel(channel_name);
        info!(channel = %channel_name, "member list requested");
    }

    /// Handle a member-list response from the bus.
    pub fn on_channel_list(&mut self, reported_channel: &str, payload: &str) -> Correlation {
        let Some(pending) = &self.pending else {
            return Correlation::NoPending;
        };

        if !channel_matches(&pending.channel_name, reported_channel) {
            debug!(
                pending = %pending.channel_name,
                reported = %reported_channel,
                "dropping member list for another channel"
            );
            return Correlation::Mismatch;
        }

        let members = parse_member_list(payload);
        info!(
            channel = %pending.channel_name,
            count = members.len(),
            "member snapshot stored"
        );

        self.snapshot = MemberSnapshot {
            channel_name: pending.channel_name.clone(),
            members,
            fetched_at: Some(Utc::now()),
        };
        self.pending = None;
        Correlation::Matched
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn snapshot(&self) -> &MemberSnapshot {
        &self.snapshot
    }
}
