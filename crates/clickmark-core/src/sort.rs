//! Sort orders and shuffling
//!
//! Sorting only re-projects the in-memory collection. Each key keeps its
//! own direction flag which flips every time that key is applied;
//! applying one key never touches another key's flag.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::format::{elapsed_secs, normalize_for_display};
use crate::models::Entry;

/// User-selectable sort criteria
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// By URL with scheme, `www.` and trailing slash stripped
    Alphabetical,
    /// By number of confirmed clicks
    ClickCount,
    /// By time since the last click
    LastVisit,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alpha" | "alphabetical" | "abc" | "name" => Ok(SortKey::Alphabetical),
            "clicks" | "count" | "click-count" => Ok(SortKey::ClickCount),
            "last-visit" | "lastvisit" | "visit" | "recent" => Ok(SortKey::LastVisit),
            other => Err(format!(
                "unknown sort key '{}' (expected alpha, clicks or last-visit)",
                other
            )),
        }
    }
}

/// Direction flags, one per sort key
///
/// Each flag says which direction the *next* application of that key uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub alpha_ascending: bool,
    pub count_ascending: bool,
    pub last_visit_ascending: bool,
}

impl Default for SortState {
    fn default() -> Self {
        // First press: A to Z, most clicked first, most recently visited first
        Self {
            alpha_ascending: true,
            count_ascending: false,
            last_visit_ascending: true,
        }
    }
}

impl SortState {
    /// Direction the next application of `key` will use
    pub fn is_ascending(&self, key: SortKey) -> bool {
        match key {
            SortKey::Alphabetical => self.alpha_ascending,
            SortKey::ClickCount => self.count_ascending,
            SortKey::LastVisit => self.last_visit_ascending,
        }
    }

    fn flip(&mut self, key: SortKey) {
        let flag = match key {
            SortKey::Alphabetical => &mut self.alpha_ascending,
            SortKey::ClickCount => &mut self.count_ascending,
            SortKey::LastVisit => &mut self.last_visit_ascending,
        };
        *flag = !*flag;
    }

    /// Sort `entries` by `key` in its current direction, then flip that key
    pub fn apply(&mut self, key: SortKey, entries: &mut [Entry], now: DateTime<Utc>) {
        sort_entries(entries, key, self.is_ascending(key), now);
        self.flip(key);
    }

    /// Control label for `key` reflecting the next direction
    pub fn label(&self, key: SortKey) -> &'static str {
        match (key, self.is_ascending(key)) {
            (SortKey::Alphabetical, true) => "ABC",
            (SortKey::Alphabetical, false) => "CBA",
            (SortKey::ClickCount, true) => "Clicks ↓",
            (SortKey::ClickCount, false) => "Clicks ↑",
            (SortKey::LastVisit, true) => "Last Visit ↑",
            (SortKey::LastVisit, false) => "Last Visit ↓",
        }
    }
}

/// Sort entries by `key` in the given direction
///
/// The sort is stable. For `LastVisit`, never-clicked entries stay in one
/// block at the top whichever direction is chosen; ascending puts the most
/// recent click first.
pub fn sort_entries(entries: &mut [Entry], key: SortKey, ascending: bool, now: DateTime<Utc>) {
    match key {
        SortKey::Alphabetical => entries.sort_by(|a, b| {
            directed(collate(normalize_for_display(&a.url), normalize_for_display(&b.url)), ascending)
        }),
        SortKey::ClickCount => {
            entries.sort_by(|a, b| directed(a.click_count.cmp(&b.click_count), ascending))
        }
        SortKey::LastVisit => entries.sort_by(|a, b| match (a.last_clicked, b.last_clicked) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => directed(elapsed_secs(x, now).cmp(&elapsed_secs(y, now)), ascending),
        }),
    }
}

/// Sort by creation time, newest first
pub fn sort_newest_first(entries: &mut [Entry]) {
    entries.sort_by(|a, b| b.inserted_at.cmp(&a.inserted_at));
}

/// Uniformly random permutation (Fisher-Yates)
pub fn shuffle<R: Rng + ?Sized>(entries: &mut [Entry], rng: &mut R) {
    entries.shuffle(rng);
}

/// Case-insensitive comparison with a case-sensitive tie-break
fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn directed(ordering: Ordering, ascending: bool) -> Ordering {
    if ascending {
        ordering
    } else {
        ordering.reverse()
    }
}
