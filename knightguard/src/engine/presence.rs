use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::bus::{FriendEntry, RosterEntry};

/// Placeholder value some host snapshots use for "not known".
const UNKNOWN: &str = "Unknown";

/// Canonical player class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKey {
    Warrior,
    Paladin,
    Hunter,
    Rogue,
    Priest,
    Shaman,
    Mage,
    Warlock,
    Druid,
}

impl ClassKey {
    pub const ALL: [ClassKey; 9] = [
        ClassKey::Warrior,
        ClassKey::Paladin,
        ClassKey::Hunter,
        ClassKey::Rogue,
        ClassKey::Priest,
        ClassKey::Shaman,
        ClassKey::Mage,
        ClassKey::Warlock,
        ClassKey::Druid,
    ];

    /// Normalize a class identifier from any snapshot source.
    ///
    /// Accepts upper-case tokens (`"WARLOCK"`), English display names and
    /// German localized names (both genders), case-insensitively.
    pub fn normalize(raw: &str) -> Option<ClassKey> {
        let lower = raw.trim().to_lowercase();
        let key = match lower.as_str() {
            "warrior" | "krieger" | "kriegerin" => ClassKey::Warrior,
            "paladin" | "paladinin" => ClassKey::Paladin,
            "hunter" | "jäger" | "jägerin" => ClassKey::Hunter,
            "rogue" | "schurke" | "schurkin" => ClassKey::Rogue,
            "priest" | "priester" | "priesterin" => ClassKey::Priest,
            "shaman" | "schamane" | "schamanin" => ClassKey::Shaman,
            "mage" | "magier" | "magierin" => ClassKey::Mage,
            "warlock" | "hexenmeister" | "hexenmeisterin" => ClassKey::Warlock,
            "druid" | "druide" | "druidin" => ClassKey::Druid,
            _ => return None,
        };
        Some(key)
    }

    pub fn color(self) -> ClassColor {
        match self {
            ClassKey::Warrior => ClassColor::rgb(0xC7, 0x9C, 0x6E),
            ClassKey::Paladin => ClassColor::rgb(0xF5, 0x8C, 0xBA),
            ClassKey::Hunter => ClassColor::rgb(0xAB, 0xD4, 0x73),
            ClassKey::Rogue => ClassColor::rgb(0xFF, 0xF5, 0x69),
            ClassKey::Priest => ClassColor::rgb(0xFF, 0xFF, 0xFF),
            ClassKey::Shaman => ClassColor::rgb(0x00, 0x70, 0xDE),
            ClassKey::Mage => ClassColor::rgb(0x69, 0xCC, 0xF0),
            ClassKey::Warlock => ClassColor::rgb(0x94, 0x82, 0xC9),
            ClassKey::Druid => ClassColor::rgb(0xFF, 0x7D, 0x0A),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClassKey::Warrior => "warrior",
            ClassKey::Paladin => "paladin",
            ClassKey::Hunter => "hunter",
            ClassKey::Rogue => "rogue",
            ClassKey::Priest => "priest",
            ClassKey::Shaman => "shaman",
            ClassKey::Mage => "mage",
            ClassKey::Warlock => "warlock",
            ClassKey::Druid => "druid",
        }
    }
}

impl fmt::Display for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display color for a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ClassColor {
    pub const WHITE: ClassColor = ClassColor::rgb(0xFF, 0xFF, 0xFF);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lower-case `rrggbb`.
    pub fn hex(&self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Class and zone facts per canonical player name, merged from the friends
/// registry and the guild roster.
#[derive(Debug, Default)]
pub struct PresenceCache {
    class_of: HashMap<String, ClassKey>,
    zone_of: HashMap<String, String>,
}

fn known(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != UNKNOWN)
}

impl PresenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge fresh snapshots into the cache.
    ///
    /// Friends are scanned first, then the roster, so the roster wins on
    /// conflict. Roster zones are only taken from members marked online.
    /// Prior entries are never cleared; keys absent from this scan keep
    /// their last-known value.
    pub fn rescan(&mut self, friends: &[FriendEntry], roster: &[RosterEntry]) {
        for friend in friends {
            if friend.name.is_empty() {
                continue;
            }
            if let Some(class) = known(friend.class.as_deref()).and_then(ClassKey::normalize) {
                self.class_of.insert(friend.name.clone(), class);
            }
            if let Some(zone) = known(friend.zone.as_deref()) {
                self.zone_of.insert(friend.name.clone(), zone.to_string());
            }
        }

        for member in roster {
            if member.name.is_empty() {
                continue;
            }
            if let Some(class) = member
                .class
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .and_then(ClassKey::normalize)
            {
                self.class_of.insert(member.name.clone(), class);
            }
            if member.online
                && let Some(zone) = member.zone.as_deref().map(str::trim).filter(|z| !z.is_empty())
            {
                self.zone_of.insert(member.name.clone(), zone.to_string());
            }
        }

        debug!(
            friends = friends.len(),
            roster = roster.len(),
            classes = self.class_of.len(),
            zones = self.zone_of.len(),
            "presence cache rescanned"
        );
    }

    pub fn class_of(&self, name: &str) -> Option<ClassKey> {
        self.class_of.get(name).copied()
    }

    pub fn zone_of(&self, name: &str) -> Option<&str> {
        self.zone_of.get(name).map(String::as_str)
    }

    /// Class color, white when the class is unknown.
    pub fn color_of(&self, name: &str) -> ClassColor {
        self.class_of(name)
            .map(ClassKey::color)
            .unwrap_or(ClassColor::WHITE)
    }

    pub fn class_count(&self) -> usize {
        self.class_of.len()
    }

    pub fn zone_count(&self) -> usize {
        self.zone_of.len()
    }

    /// All cached names, sorted, with whatever facts are known.
    pub fn entries(&self) -> Vec<(String, Option<ClassKey>, Option<String>)> {
        let mut names: Vec<&String> = self.class_of.keys().chain(self.zone_of.keys()).collect();
        names.sort();
        names.dedup();
        names
            .into_iter()
            .map(|n| (n.clone(), self.class_of(n), self.zone_of(n).map(str::to_string)))
            .collect()
    }
}
