//! Per-category connection counts for the active level.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

use crate::catalog::Level;
use crate::connection::Connection;

/// Tracked signal families. Every level reports all six, most with a
/// requirement of zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionCategory {
    Power,
    Xlr,
    Wireless,
    Ethernet,
    Dmx,
    Hdmi,
}

impl ConnectionCategory {
    pub const ALL: [Self; 6] = [
        Self::Power,
        Self::Xlr,
        Self::Wireless,
        Self::Ethernet,
        Self::Dmx,
        Self::Hdmi,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Xlr => "xlr",
            Self::Wireless => "wireless",
            Self::Ethernet => "ethernet",
            Self::Dmx => "dmx",
            Self::Hdmi => "hdmi",
        }
    }

    /// Name as players read it in hints and reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Xlr => "XLR",
            Self::Wireless => "wireless",
            Self::Ethernet => "Ethernet",
            Self::Dmx => "DMX",
            Self::Hdmi => "HDMI",
        }
    }
}

impl fmt::Display for ConnectionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryProgress {
    pub current: u32,
    pub required: u32,
}

impl CategoryProgress {
    #[must_use]
    pub const fn is_tracked(&self) -> bool {
        self.required > 0
    }

    #[must_use]
    pub const fn is_satisfied(&self) -> bool {
        self.current >= self.required
    }

    /// Count shown to the player. Connections beyond the requirement still
    /// count in `current` but are not displayed.
    #[must_use]
    pub fn display_current(&self) -> u32 {
        self.current.min(self.required)
    }

    #[must_use]
    pub const fn shortfall(&self) -> u32 {
        self.required.saturating_sub(self.current)
    }
}

/// Snapshot of progress for one level attempt, always holding every category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProgress {
    categories: BTreeMap<ConnectionCategory, CategoryProgress>,
}

impl Default for ConnectionProgress {
    fn default() -> Self {
        Self {
            categories: ConnectionCategory::ALL
                .into_iter()
                .map(|category| (category, CategoryProgress::default()))
                .collect(),
        }
    }
}

impl ConnectionProgress {
    /// Progress with the level's requirements and nothing connected yet.
    #[must_use]
    pub fn for_level(level: &Level) -> Self {
        let mut progress = Self::default();
        for (category, required) in required_counts(level) {
            progress.entry_mut(category).required = required;
        }
        progress
    }

    fn entry_mut(&mut self, category: ConnectionCategory) -> &mut CategoryProgress {
        self.categories.entry(category).or_default()
    }

    #[must_use]
    pub fn get(&self, category: ConnectionCategory) -> CategoryProgress {
        self.categories.get(&category).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConnectionCategory, CategoryProgress)> + '_ {
        self.categories.iter().map(|(category, entry)| (*category, *entry))
    }

    /// Categories the level actually asks for.
    pub fn tracked(&self) -> impl Iterator<Item = (ConnectionCategory, CategoryProgress)> + '_ {
        self.iter().filter(|(_, entry)| entry.is_tracked())
    }

    /// Unsatisfied categories with how many connections each still needs.
    #[must_use]
    pub fn missing(&self) -> SmallVec<[(ConnectionCategory, u32); 6]> {
        self.iter()
            .filter(|(_, entry)| !entry.is_satisfied())
            .map(|(category, entry)| (category, entry.shortfall()))
            .collect()
    }

    #[must_use]
    pub fn all_satisfied(&self) -> bool {
        self.iter().all(|(_, entry)| entry.is_satisfied())
    }

    #[must_use]
    pub fn total_required(&self) -> u32 {
        self.iter()
            .fold(0_u32, |acc, (_, entry)| acc.saturating_add(entry.required))
    }
}

/// Required connection count per category, summed over the level's
/// connection manifest. Untracked cable types contribute nothing.
#[must_use]
pub fn required_counts(level: &Level) -> BTreeMap<ConnectionCategory, u32> {
    let mut counts: BTreeMap<ConnectionCategory, u32> = ConnectionCategory::ALL
        .into_iter()
        .map(|category| (category, 0))
        .collect();
    for spec in &level.connections {
        if let Some(category) = spec.cable.category() {
            let slot = counts.entry(category).or_insert(0);
            *slot = slot.saturating_add(spec.quantity);
        }
    }
    counts
}

/// Fresh progress for `level` counting every connection in `connections`.
/// Pure: recomputing over the same list yields the same snapshot.
#[must_use]
pub fn recompute(level: &Level, connections: &[Connection]) -> ConnectionProgress {
    let mut progress = ConnectionProgress::for_level(level);
    for connection in connections {
        if let Some(category) = connection.cable.category() {
            let entry = progress.entry_mut(category);
            entry.current = entry.current.saturating_add(1);
        }
    }
    progress
}
