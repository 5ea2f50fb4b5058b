use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub const BADGE_POINT_KEY: &str = "__kgBtnPoint";
pub const BADGE_REL_POINT_KEY: &str = "__kgBtnRelPoint";
pub const BADGE_X_KEY: &str = "__kgBtnX";
pub const BADGE_Y_KEY: &str = "__kgBtnY";

/// Keys in the persisted mapping that hold the badge position, not players.
pub const RESERVED_KEYS: [&str; 4] = [BADGE_POINT_KEY, BADGE_REL_POINT_KEY, BADGE_X_KEY, BADGE_Y_KEY];

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Last screen position of the floating badge. Shares the persisted
/// namespace with saved players but is kept apart in memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BadgePosition {
    pub point: Option<String>,
    pub rel_point: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl BadgePosition {
    pub fn is_empty(&self) -> bool {
        self.point.is_none() && self.rel_point.is_none() && self.x.is_none() && self.y.is_none()
    }
}

/// The user's curated set of saved player names.
#[derive(Debug, Default)]
pub struct SavedSet {
    players: BTreeSet<String>,
    badge: BadgePosition,
    dirty: bool,
}

impl SavedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the flat persisted mapping.
    ///
    /// Player keys count as saved when their value is `true`; reserved keys
    /// are routed into the badge position and never treated as players.
    pub fn from_persisted(entries: BTreeMap<String, Value>) -> Self {
        let mut set = Self::new();
        for (key, value) in entries {
            match key.as_str() {
                BADGE_POINT_KEY => set.badge.point = value.as_str().map(str::to_string),
                BADGE_REL_POINT_KEY => set.badge.rel_point = value.as_str().map(str::to_string),
                BADGE_X_KEY => set.badge.x = value.as_f64(),
                BADGE_Y_KEY => set.badge.y = value.as_f64(),
                _ if value.as_bool() == Some(true) && !key.is_empty() => {
                    set.players.insert(key.clone());
                }
                _ => {}
            }
        }
        debug!(players = set.players.len(), "saved set loaded");
        set
    }

    /// Flatten back into the single persisted mapping.
    pub fn to_persisted(&self) -> BTreeMap<String, Value> {
        let mut out: BTreeMap<String, Value> = self
            .players
            .iter()
            .map(|name| (name.clone(), Value::Bool(true)))
            .collect();

        if let Some(point) = &self.badge.point {
            out.insert(BADGE_POINT_KEY.into(), Value::from(point.clone()));
        }
        if let Some(rel) = &self.badge.rel_point {
            out.insert(BADGE_REL_POINT_KEY.into(), Value::from(rel.clone()));
        }
        if let Some(x) = self.badge.x {
            out.insert(BADGE_X_KEY.into(), Value::from(x));
        }
        if let Some(y) = self.badge.y {
            out.insert(BADGE_Y_KEY.into(), Value::from(y));
        }
        out
    }

    pub fn contains(&self, name: &str) -> bool {
        self.players.contains(name)
    }

    /// Returns true if the name was newly added. Reserved keys are refused.
    pub fn add(&mut self, name: &str) -> bool {
        if name.is_empty() || is_reserved_key(name) {
            return false;
        }
        let added = self.players.insert(name.to_string());
        self.dirty |= added;
        added
    }

    /// Returns true if the name was present.
    pub fn remove(&mut self, name: &str) -> bool {
        let removed = self.players.remove(name);
        self.dirty |= removed;
        removed
    }

    /// Flip membership. Returns whether the name is saved afterwards.
    pub fn toggle(&mut self, name: &str) -> bool {
        if self.contains(name) {
            self.remove(name);
            false
        } else {
            self.add(name)
        }
    }

    /// Saved player names in ascending order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.players.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn badge(&self) -> &BadgePosition {
        &self.badge
    }

    pub fn set_badge(&mut self, badge: BadgePosition) {
        if self.badge != badge {
            self.badge = badge;
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag, returning its previous value.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
