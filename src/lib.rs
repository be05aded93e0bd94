//! Listen-along alignment engine.
//!
//! Aligns a timed transcript stream (word + start/end seconds) against a
//! reference text and drives word-level highlighting that follows audio
//! playback, survives seeks and can locate arbitrary passages.

pub mod audio;
pub mod config;
pub mod highlight;
pub mod locator;
pub mod matcher;
pub mod normalizer;
pub mod seek;
pub mod session;
pub mod stop;
pub mod surface;
pub mod text_utils;
pub mod timing;
pub mod tokenizer;

pub use audio::{AudioBus, AudioEngine, AudioEvent, SimulatedAudio, Subscription};
pub use config::AlignerConfig;
pub use highlight::{Ceiling, HighlightController, Phase};
pub use locator::{LocateResult, ParagraphLocator};
pub use matcher::{ContextMatcher, MatchResult};
pub use seek::{SeekOutcome, SeekStrategy};
pub use session::{
    ReadAlongSession, ReadAlongSnapshot, SectionDeck, SessionCommand, SessionEvent,
};
pub use stop::StopSignal;
pub use surface::{HighlightCommand, MemorySurface, RenderSurface, apply_commands};
pub use timing::{RawTimingRecord, TimingEvent};
pub use tokenizer::{Document, Token};
