/// Level unlock tracking across difficulties.
///
/// Pure in-memory state: the driver feeds it round reports and reads back
/// which level to play next. Nothing here touches the disk.

use std::collections::BTreeMap;

use log::info;

use crate::config::Difficulty;
use super::round::{Outcome, RoundReport};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Progress {
    unlocked: BTreeMap<Difficulty, Vec<bool>>,
    pub selected_difficulty: Difficulty,
    pub selected_level: usize,
}

impl Progress {
    /// Fresh table: only the first easy level is open.
    pub fn new(levels_per_difficulty: usize) -> Self {
        let mut unlocked = BTreeMap::new();
        for d in Difficulty::ALL {
            unlocked.insert(d, vec![false; levels_per_difficulty]);
        }
        if let Some(first) = unlocked.get_mut(&Difficulty::Easy).and_then(|v| v.first_mut()) {
            *first = true;
        }
        Progress {
            unlocked,
            selected_difficulty: Difficulty::Easy,
            selected_level: 0,
        }
    }

    pub fn is_unlocked(&self, difficulty: Difficulty, index: usize) -> bool {
        self.unlocked
            .get(&difficulty)
            .and_then(|v| v.get(index))
            .copied()
            .unwrap_or(false)
    }

    pub fn levels_per_difficulty(&self) -> usize {
        self.unlocked.values().next().map_or(0, Vec::len)
    }

    /// Open and select a level directly (configured starting difficulty).
    pub fn select(&mut self, difficulty: Difficulty, index: usize) {
        if let Some(slot) = self.unlocked.get_mut(&difficulty).and_then(|v| v.get_mut(index)) {
            *slot = true;
            self.selected_difficulty = difficulty;
            self.selected_level = index;
        }
    }

    /// Unlock whatever follows `(difficulty, index)` and return it.
    ///
    /// Same difficulty first (an already open level still counts), then the
    /// first locked level of any harder difficulty.
    pub fn unlock_next(&mut self, difficulty: Difficulty, index: usize) -> Option<(Difficulty, usize)> {
        let next = index + 1;
        if let Some(slot) = self.unlocked.get_mut(&difficulty).and_then(|v| v.get_mut(next)) {
            *slot = true;
            return Some((difficulty, next));
        }

        for d in Difficulty::ALL.into_iter().filter(|d| *d > difficulty) {
            let Some(levels) = self.unlocked.get_mut(&d) else { continue };
            if let Some(i) = levels.iter().position(|open| !open) {
                levels[i] = true;
                info!("unlocked {d} level {}", i + 1);
                return Some((d, i));
            }
        }
        None
    }

    /// Apply a finished round. Only victories move the selection forward.
    pub fn record(&mut self, report: &RoundReport) -> Option<(Difficulty, usize)> {
        if !matches!(report.outcome, Outcome::Victory { .. }) {
            return None;
        }
        let next = self.unlock_next(report.difficulty, report.level_index)?;
        (self.selected_difficulty, self.selected_level) = next;
        Some(next)
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
