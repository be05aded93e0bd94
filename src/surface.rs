//! Render surface interface.
//!
//! The engine never holds on to visible elements. Every command names a token
//! by index; the index is resolved to a [`TokenHandle`] right before use and the
//! handle is checked for liveness. A surface that was rebuilt since the handle
//! was issued reports it stale and the command is skipped.

use crate::tokenizer::Document;
use serde::{Deserialize, Serialize};
use tracing::trace;
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum HighlightCommand {
    /// Mark a token as spoken.
    Highlight { index: usize },
    /// The token is no longer the spoken frontier.
    MarkRead { index: usize },
    /// Drop every highlight and read marker (seek or clear).
    ClearAll,
}

/// Non-owning reference to one rendered token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenHandle {
    pub index: usize,
    pub generation: u64,
}

pub trait RenderSurface {
    fn token_count(&self) -> usize;

    /// Normalized word rendered at `index`.
    fn word(&self, index: usize) -> Option<&str>;

    fn resolve(&self, index: usize) -> Option<TokenHandle>;

    fn is_live(&self, handle: TokenHandle) -> bool;

    fn set_highlighted(&mut self, handle: TokenHandle);

    fn set_read(&mut self, handle: TokenHandle);

    fn clear_all(&mut self);
}

/// Whether `surface` renders exactly the tokens of `document`, in order.
pub fn matches_document(surface: &dyn RenderSurface, document: &Document) -> bool {
    if surface.token_count() != document.len() {
        return false;
    }
    document
        .tokens()
        .iter()
        .all(|token| surface.word(token.index) == Some(token.normalized.as_str()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub skipped: usize,
}

/// Issue commands in order, re-resolving each index and skipping stale handles.
pub fn apply_commands(
    surface: &mut dyn RenderSurface,
    commands: &[HighlightCommand],
) -> ApplyReport {
    let mut report = ApplyReport::default();

    for command in commands {
        let index = match *command {
            HighlightCommand::ClearAll => {
                surface.clear_all();
                report.applied += 1;
                continue;
            }
            HighlightCommand::Highlight { index } | HighlightCommand::MarkRead { index } => index,
        };

        let Some(handle) = surface.resolve(index).filter(|handle| surface.is_live(*handle)) else {
            trace!(index, "Skipping command for unresolved or stale token handle");
            report.skipped += 1;
            continue;
        };

        match command {
            HighlightCommand::Highlight { .. } => surface.set_highlighted(handle),
            HighlightCommand::MarkRead { .. } => surface.set_read(handle),
            HighlightCommand::ClearAll => {}
        }
        report.applied += 1;
    }

    report
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenCell {
    pub word: String,
    pub highlighted: bool,
    pub read: bool,
}

/// In-memory surface used by the CLI harness and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    cells: Vec<TokenCell>,
    generation: u64,
}

impl MemorySurface {
    pub fn new(document: &Document) -> Self {
        Self {
            cells: render_cells(document),
            generation: 0,
        }
    }

    /// Re-render: every cell resets and previously issued handles go stale.
    pub fn rebuild(&mut self, document: &Document) {
        self.cells = render_cells(document);
        self.generation += 1;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cell(&self, index: usize) -> Option<&TokenCell> {
        self.cells.get(index)
    }

    pub fn highlighted_indices(&self) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.highlighted)
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn highlighted_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.highlighted).count()
    }
}

fn render_cells(document: &Document) -> Vec<TokenCell> {
    document
        .tokens()
        .iter()
        .map(|token| TokenCell {
            word: token.normalized.clone(),
            ..TokenCell::default()
        })
        .collect()
}

impl RenderSurface for MemorySurface {
    fn token_count(&self) -> usize {
        self.cells.len()
    }

    fn word(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(|cell| cell.word.as_str())
    }

    fn resolve(&self, index: usize) -> Option<TokenHandle> {
        (index < self.cells.len()).then_some(TokenHandle {
            index,
            generation: self.generation,
        })
    }

    fn is_live(&self, handle: TokenHandle) -> bool {
        handle.generation == self.generation && handle.index < self.cells.len()
    }

    fn set_highlighted(&mut self, handle: TokenHandle) {
        if let Some(cell) = self.cells.get_mut(handle.index) {
            cell.highlighted = true;
        }
    }

    fn set_read(&mut self, handle: TokenHandle) {
        if let Some(cell) = self.cells.get_mut(handle.index) {
            cell.read = true;
        }
    }

    fn clear_all(&mut self) {
        for cell in &mut self.cells {
            cell.highlighted = false;
            cell.read = false;
        }
    }
}
