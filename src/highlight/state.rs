use crate::surface::HighlightCommand;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Phase {
    #[default]
    Idle,
    InitialLookahead,
    Streaming,
    EndFlush,
}

/// Highest token index the current audio time allows to be highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
#[ts(export)]
pub enum Ceiling {
    /// Nothing has been spoken yet.
    #[default]
    Blocked,
    Index(usize),
    /// Set right after a seek or end flush.
    Unbounded,
}

impl Ceiling {
    pub fn allows(self, index: usize) -> bool {
        match self {
            Self::Blocked => false,
            Self::Index(limit) => index <= limit,
            Self::Unbounded => true,
        }
    }

    pub(super) fn clamp(self, index: usize) -> Option<usize> {
        match self {
            Self::Blocked => None,
            Self::Index(limit) => Some(index.min(limit)),
            Self::Unbounded => Some(index),
        }
    }
}

/// Per-section progression state.
///
/// Committed tokens always form the prefix `0..highlighted_through`: every
/// commit gap-fills from the watermark, so the set needs no separate storage.
#[derive(Debug, Clone, Default)]
pub struct HighlightState {
    pub(super) phase: Phase,
    pub(super) highlighted_through: usize,
    pub(super) ceiling: Ceiling,
    /// Next timing event not yet processed; only moves forward between resets.
    pub(super) next_timing: usize,
    pub(super) last_matched: Option<usize>,
    /// Last index of a pending gap estimate, released as the ceiling allows.
    pub(super) gap_target: Option<usize>,
    /// Text index decided when each timing event became due (`None` = no
    /// confident match).
    pub(super) resolved: HashMap<usize, Option<usize>>,
    /// Lookups for events not yet due; discarded at the start of every tick.
    pub(super) provisional: HashMap<usize, Option<usize>>,
}

impl HighlightState {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn highlighted_through(&self) -> usize {
        self.highlighted_through
    }

    pub fn ceiling(&self) -> Ceiling {
        self.ceiling
    }

    pub fn next_timing(&self) -> usize {
        self.next_timing
    }

    pub fn is_highlighted(&self, index: usize) -> bool {
        index < self.highlighted_through
    }

    /// The token currently treated as the spoken frontier.
    pub fn frontier(&self) -> Option<usize> {
        self.highlighted_through.checked_sub(1)
    }

    /// Commit every token from the watermark through `target` inclusive.
    ///
    /// Returns false when nothing new was committed. Commands come out in
    /// increasing index order; already-committed indices are never re-emitted.
    pub(super) fn commit_through(
        &mut self,
        target: usize,
        token_count: usize,
        out: &mut Vec<HighlightCommand>,
    ) -> bool {
        let Some(last) = token_count.checked_sub(1) else {
            return false;
        };
        let target = target.min(last);
        if target < self.highlighted_through {
            return false;
        }

        if let Some(frontier) = self.frontier() {
            out.push(HighlightCommand::MarkRead { index: frontier });
        }
        for index in self.highlighted_through..=target {
            out.push(HighlightCommand::Highlight { index });
            if index < target {
                out.push(HighlightCommand::MarkRead { index });
            }
        }
        self.highlighted_through = target + 1;
        true
    }

    /// Like [`commit_through`](Self::commit_through) but never past the ceiling.
    pub(super) fn commit_clamped(
        &mut self,
        target: usize,
        token_count: usize,
        out: &mut Vec<HighlightCommand>,
    ) -> bool {
        match self.ceiling.clamp(target) {
            Some(target) => self.commit_through(target, token_count, out),
            None => false,
        }
    }

    /// Commands that rebuild the committed state on a fresh surface.
    pub fn replay(&self) -> Vec<HighlightCommand> {
        let mut out = vec![HighlightCommand::ClearAll];
        for index in 0..self.highlighted_through {
            out.push(HighlightCommand::Highlight { index });
            if index + 1 < self.highlighted_through {
                out.push(HighlightCommand::MarkRead { index });
            }
        }
        out
    }
}
