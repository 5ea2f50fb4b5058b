use serde::Serialize;

use super::correlator::MemberSnapshot;
use super::presence::{ClassColor, PresenceCache};
use super::saved::{SavedSet, is_reserved_key};

/// Default number of visible row slots.
pub const DEFAULT_MAX_VISIBLE: usize = 12;

pub const UNKNOWN_ZONE: &str = "Unknown zone";
pub const SAVED_LABEL: &str = "[saved]";
pub const SAVE_LABEL: &str = "[+save]";

/// Scroll position over the current row source.
///
/// Invariant: `offset <= max(0, total_rows - max_visible)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollState {
    pub offset: usize,
    pub total_rows: usize,
}

impl ScrollState {
    pub fn max_offset(&self, max_visible: usize) -> usize {
        self.total_rows.saturating_sub(max_visible)
    }

    pub fn clamp(&mut self, max_visible: usize) {
        self.offset = self.offset.min(self.max_offset(max_visible));
    }

    pub fn up(&mut self) {
        self.offset = self.offset.saturating_sub(1);
    }

    pub fn down(&mut self, max_visible: usize) {
        if self.offset < self.max_offset(max_visible) {
            self.offset += 1;
        }
    }
}

/// One rendered row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewRow {
    pub name: String,
    pub online: bool,
    pub saved: bool,
    pub zone_label: String,
    pub class_color: ClassColor,
}

impl ViewRow {
    pub fn save_label(&self) -> &'static str {
        if self.saved { SAVED_LABEL } else { SAVE_LABEL }
    }
}

/// Everything the view reads from. Borrowed from the engine per recompute.
pub struct ViewSources<'a> {
    /// Managed channel, if one is configured.
    pub channel: Option<&'a str>,
    pub snapshot: &'a MemberSnapshot,
    pub pending: bool,
    pub saved: &'a SavedSet,
    pub presence: &'a PresenceCache,
}

/// Fixed-size, scroll-windowed row set.
#[derive(Debug)]
pub struct ListViewModel {
    max_visible: usize,
    scroll: ScrollState,
    rows: Vec<Option<ViewRow>>,
    status: String,
}

impl ListViewModel {
    pub fn new(max_visible: usize) -> Self {
        Self {
            max_visible,
            scroll: ScrollState::default(),
            rows: vec![None; max_visible],
            status: String::new(),
        }
    }

    /// Rebuild the visible rows and status line from the sources.
    pub fn recompute(&mut self, src: &ViewSources<'_>) {
        let source: Vec<(&str, bool)> = match src.channel {
            Some(_) => src
                .snapshot
                .members
                .iter()
                .map(|name| (name.as_str(), true))
                .collect(),
            // SavedSet iterates in ascending order already
            None => src
                .saved
                .names()
                .filter(|name| !is_reserved_key(name))
                .map(|name| (name, false))
                .collect(),
        };

        self.scroll.total_rows = source.len();
        self.scroll.clamp(self.max_visible);

        let window = source
            .iter()
            .skip(self.scroll.offset)
            .take(self.max_visible);

        self.rows.clear();
        for &(name, online) in window {
            self.rows.push(Some(ViewRow {
                name: name.to_string(),
                online,
                saved: src.saved.contains(name),
                zone_label: src
                    .presence
                    .zone_of(name)
                    .unwrap_or(UNKNOWN_ZONE)
                    .to_string(),
                class_color: src.presence.color_of(name),
            }));
        }
        self.rows.resize(self.max_visible, None);

        self.status = if src.pending {
            format!(
                "Requesting members of {}...",
                src.channel.unwrap_or(src.snapshot.channel_name.as_str())
            )
        } else {
            let shown = self.rows.iter().filter(|r| r.is_some()).count();
            format!(
                "Showing {shown} of {} | {} saved | channel: {}",
                self.scroll.total_rows,
                src.saved.len(),
                src.channel.unwrap_or("none")
            )
        };
    }

    pub fn scroll_up(&mut self) {
        self.scroll.up();
    }

    pub fn scroll_down(&mut self) {
        self.scroll.down(self.max_visible);
    }

    /// Always exactly `max_visible` slots.
    pub fn rows(&self) -> &[Option<ViewRow>] {
        &self.rows
    }

    pub fn status_line(&self) -> &str {
        &self.status
    }

    pub fn scroll(&self) -> ScrollState {
        self.scroll
    }

    pub fn max_visible(&self) -> usize {
        self.max_visible
    }

    /// Render the rows as plain text lines, skipping empty slots.
    pub fn render_lines(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .rows
            .iter()
            .flatten()
            .map(|row| {
                format!(
                    "|cff{}{}|r  {}  {}  {}",
                    row.class_color.hex(),
                    row.name,
                    if row.online { "online" } else { "offline" },
                    row.zone_label,
                    row.save_label()
                )
            })
            .collect();
        out.push(self.status.clone());
        out
    }
}
