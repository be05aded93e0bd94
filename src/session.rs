//! Per-section read-along orchestration.
//!
//! A [`ReadAlongSession`] owns one section's text, timings and progression
//! state and exposes a command/event surface: every [`SessionCommand`] yields
//! the highlight commands to apply plus a fresh [`ReadAlongSnapshot`].
//! Several sections live in a [`SectionDeck`], which routes input only to the
//! section it was explicitly bound to.

use crate::audio::AudioEvent;
use crate::config::AlignerConfig;
use crate::highlight::{Ceiling, HighlightController, Phase};
use crate::locator::{LocateResult, ParagraphLocator};
use crate::matcher::ContextMatcher;
use crate::seek::SeekStrategy;
use crate::stop::StopSignal;
use crate::surface::{HighlightCommand, RenderSurface, matches_document};
use crate::timing::TimingEvent;
use crate::tokenizer::Document;
use serde::Serialize;
use tracing::{debug, info, trace, warn};
use ts_rs::TS;

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ReadAlongSnapshot {
    pub section: String,
    pub phase: Phase,
    pub highlighted_through: usize,
    pub ceiling: Ceiling,
    pub token_count: usize,
    pub timing_count: usize,
    pub progress_pct: f64,
    pub current_paragraph: Option<usize>,
    pub playing: bool,
    pub playback_rate: f64,
    pub current_time_secs: f64,
    pub duration_secs: f64,
    pub last_seek: Option<SeekStrategy>,
    pub last_locate: Option<LocateResult>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    GetSnapshot,
    Tick { time: f64, duration: f64 },
    Audio(AudioEvent),
    Locate { text: String },
    Clear,
    Resync,
}

impl SessionCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetSnapshot => "read_along_get_snapshot",
            Self::Tick { .. } => "read_along_tick",
            Self::Audio(AudioEvent::Play) => "read_along_play",
            Self::Audio(AudioEvent::Pause) => "read_along_pause",
            Self::Audio(AudioEvent::Seek { .. }) => "read_along_seek",
            Self::Audio(AudioEvent::RateChanged { .. }) => "read_along_rate_changed",
            Self::Audio(AudioEvent::Ended) => "read_along_ended",
            Self::Locate { .. } => "read_along_locate",
            Self::Clear => "read_along_clear",
            Self::Resync => "read_along_resync",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub action: &'static str,
    pub commands: Vec<HighlightCommand>,
    /// Set when the audio engine should be moved (after a successful locate).
    pub seek_to: Option<f64>,
    pub snapshot: ReadAlongSnapshot,
}

#[derive(Debug, Clone)]
pub struct ReadAlongSession {
    label: String,
    document: Document,
    timings: Vec<TimingEvent>,
    config: AlignerConfig,
    controller: HighlightController,
    stop: StopSignal,
    playing: bool,
    playback_rate: f64,
    current_time: f64,
    duration: f64,
    last_seek: Option<SeekStrategy>,
    last_locate: Option<LocateResult>,
}

impl ReadAlongSession {
    pub fn new(
        label: impl Into<String>,
        document: Document,
        timings: Vec<TimingEvent>,
        config: AlignerConfig,
    ) -> Self {
        let label = label.into();
        let duration = timings
            .iter()
            .map(|event| event.end_secs)
            .fold(0.0, f64::max);
        info!(
            section = %label,
            tokens = document.len(),
            timings = timings.len(),
            duration,
            "Read-along section bound"
        );
        Self {
            label,
            document,
            timings,
            config,
            controller: HighlightController::new(),
            stop: StopSignal::new(),
            playing: false,
            playback_rate: 1.0,
            current_time: 0.0,
            duration,
            last_seek: None,
            last_locate: None,
        }
    }

    /// Share an existing stop flag, e.g. one a signal handler already holds.
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn timings(&self) -> &[TimingEvent] {
        &self.timings
    }

    pub fn controller(&self) -> &HighlightController {
        &self.controller
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Whether `surface` shows this section's text, so index-based commands
    /// land on the intended words.
    pub fn is_rendered_by(&self, surface: &dyn RenderSurface) -> bool {
        matches_document(surface, &self.document)
    }

    pub fn set_duration(&mut self, duration: f64) {
        if duration.is_finite() && duration >= 0.0 {
            self.duration = duration;
        }
    }

    pub fn apply_command(&mut self, command: SessionCommand) -> SessionEvent {
        let action = command.action();
        let mut seek_to = None;
        let commands = match command {
            SessionCommand::GetSnapshot => Vec::new(),
            SessionCommand::Tick { time, duration } => self.tick(time, duration),
            SessionCommand::Audio(event) => self.on_audio(event),
            SessionCommand::Locate { text } => {
                seek_to = self.locate(&text).map(|found| found.timestamp_secs);
                Vec::new()
            }
            SessionCommand::Clear => {
                self.last_seek = None;
                self.controller.reset()
            }
            SessionCommand::Resync => self.controller.replay(),
        };
        SessionEvent {
            action,
            commands,
            seek_to,
            snapshot: self.snapshot(),
        }
    }

    /// Advance progression to `time`; ticks are ignored while paused or stopped.
    pub fn tick(&mut self, time: f64, duration: f64) -> Vec<HighlightCommand> {
        if self.stop.is_stopped() {
            trace!(section = %self.label, time, "Dropping tick for stopped section");
            return Vec::new();
        }
        if !self.playing {
            return Vec::new();
        }
        self.set_duration(duration);
        if time.is_finite() {
            self.current_time = time.max(0.0);
        }
        let matcher = ContextMatcher::new(&self.document, &self.timings, &self.config);
        self.controller.tick(&matcher, self.current_time, self.duration)
    }

    pub fn on_audio(&mut self, event: AudioEvent) -> Vec<HighlightCommand> {
        match event {
            AudioEvent::Play => {
                self.playing = true;
                debug!(section = %self.label, "Playback started");
                Vec::new()
            }
            AudioEvent::Pause => {
                self.playing = false;
                debug!(section = %self.label, "Playback paused");
                Vec::new()
            }
            AudioEvent::Seek { time } => self.seek(time),
            AudioEvent::RateChanged { rate } => {
                // Progression follows audio time, so a new rate needs no realignment.
                self.playback_rate = rate;
                debug!(section = %self.label, rate, "Playback rate changed");
                Vec::new()
            }
            AudioEvent::Ended => {
                self.playing = false;
                self.current_time = self.duration;
                self.controller.end_flush(self.document.len())
            }
        }
    }

    pub fn seek(&mut self, time: f64) -> Vec<HighlightCommand> {
        let matcher = ContextMatcher::new(&self.document, &self.timings, &self.config);
        let outcome = self.controller.seek(&matcher, time, self.duration);
        self.current_time = outcome.time;
        self.last_seek = Some(outcome.strategy);
        if outcome.is_cleared() {
            debug!(section = %self.label, time = outcome.time, "Seek cleared all highlights");
        }
        outcome.commands
    }

    pub fn locate(&mut self, text: &str) -> Option<LocateResult> {
        let matcher = ContextMatcher::new(&self.document, &self.timings, &self.config);
        let found = ParagraphLocator::new(matcher).locate(text);
        if found.is_none() {
            info!(section = %self.label, query = text, "Passage not found");
        }
        self.last_locate = found;
        found
    }

    pub fn snapshot(&self) -> ReadAlongSnapshot {
        let token_count = self.document.len();
        let highlighted_through = self.controller.highlighted_through();
        let progress_pct = if token_count == 0 {
            0.0
        } else {
            highlighted_through as f64 * 100.0 / token_count as f64
        };
        ReadAlongSnapshot {
            section: self.label.clone(),
            phase: self.controller.phase(),
            highlighted_through,
            ceiling: self.controller.ceiling(),
            token_count,
            timing_count: self.timings.len(),
            progress_pct,
            current_paragraph: self
                .controller
                .state()
                .frontier()
                .and_then(|index| self.document.paragraph_of(index)),
            playing: self.playing,
            playback_rate: self.playback_rate,
            current_time_secs: self.current_time,
            duration_secs: self.duration,
            last_seek: self.last_seek,
            last_locate: self.last_locate,
        }
    }
}

/// Sections sharing one read-along display; only the bound one receives input.
#[derive(Debug, Clone, Default)]
pub struct SectionDeck {
    sections: Vec<ReadAlongSession>,
    active: Option<usize>,
}

impl SectionDeck {
    /// The first section starts bound; every other one starts stopped.
    pub fn new(sections: Vec<ReadAlongSession>) -> Self {
        let active = (!sections.is_empty()).then_some(0);
        for section in sections.iter().skip(1) {
            section.stop.stop();
        }
        Self { sections, active }
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active(&self) -> Option<&ReadAlongSession> {
        self.active.and_then(|idx| self.sections.get(idx))
    }

    pub fn section(&self, index: usize) -> Option<&ReadAlongSession> {
        self.sections.get(index)
    }

    /// Bind the display to `index`; the previously bound section is paused
    /// and stopped, the new one resumes taking ticks.
    pub fn rebind(&mut self, index: usize) -> bool {
        if index >= self.sections.len() {
            warn!(index, sections = self.sections.len(), "Ignoring rebind to unknown section");
            return false;
        }
        if self.active == Some(index) {
            return true;
        }
        if let Some(previous) = self.active.and_then(|idx| self.sections.get_mut(idx)) {
            previous.on_audio(AudioEvent::Pause);
            previous.stop.stop();
        }
        self.sections[index].stop.resume();
        self.active = Some(index);
        info!(
            index,
            section = %self.sections[index].label,
            "Read-along display rebound"
        );
        true
    }

    pub fn dispatch(&mut self, command: SessionCommand) -> Option<SessionEvent> {
        let index = self.active?;
        self.sections
            .get_mut(index)
            .map(|section| section.apply_command(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{MemorySurface, apply_commands};
    use crate::timing::{RawTimingRecord, ingest};

    const TEXT: &str = "the quick brown fox jumps over the lazy dog";

    fn session(label: &str) -> ReadAlongSession {
        let records: Vec<RawTimingRecord> = TEXT
            .split_whitespace()
            .enumerate()
            .map(|(i, word)| RawTimingRecord {
                word: word.to_string(),
                time_start: i as f64 * 0.5,
                time_end: i as f64 * 0.5 + 0.4,
            })
            .collect();
        ReadAlongSession::new(
            label,
            Document::from_text(TEXT),
            ingest(&records, 0),
            AlignerConfig::default(),
        )
    }

    #[test]
    fn ticks_are_ignored_while_paused() {
        let mut session = session("one");
        let event = session.apply_command(SessionCommand::Tick {
            time: 1.2,
            duration: 5.0,
        });
        assert_eq!(event.action, "read_along_tick");
        assert!(event.commands.is_empty());

        session.apply_command(SessionCommand::Audio(AudioEvent::Play));
        let event = session.apply_command(SessionCommand::Tick {
            time: 1.2,
            duration: 5.0,
        });
        assert!(!event.commands.is_empty());
        assert_eq!(event.snapshot.highlighted_through, 3);
        assert!(event.snapshot.playing);
    }

    #[test]
    fn stopped_section_drops_ticks_but_still_seeks() {
        let mut session = session("one");
        let handler = session.stop_signal();
        session.apply_command(SessionCommand::Audio(AudioEvent::Play));
        session.tick(0.6, 5.0);
        assert_eq!(session.controller().highlighted_through(), 2);

        handler.stop();
        assert!(session.is_stopped());
        assert!(session.tick(2.1, 5.0).is_empty());
        assert_eq!(session.controller().highlighted_through(), 2);

        let event = session.apply_command(SessionCommand::Audio(AudioEvent::Seek { time: 2.1 }));
        assert_eq!(event.snapshot.highlighted_through, 5);

        handler.resume();
        assert!(!session.tick(3.1, 5.0).is_empty());
        assert_eq!(session.controller().highlighted_through(), 7);
    }

    #[test]
    fn seek_event_rederives_state() {
        let mut session = session("one");
        let event = session.apply_command(SessionCommand::Audio(AudioEvent::Seek { time: 2.1 }));
        assert_eq!(event.action, "read_along_seek");
        assert_eq!(event.commands.first(), Some(&HighlightCommand::ClearAll));
        assert_eq!(event.snapshot.highlighted_through, 5);
        assert_eq!(event.snapshot.last_seek, Some(SeekStrategy::ContainingEvent));
    }

    #[test]
    fn ended_flushes_everything() {
        let mut session = session("one");
        let event = session.apply_command(SessionCommand::Audio(AudioEvent::Ended));
        assert_eq!(event.snapshot.highlighted_through, 9);
        assert_eq!(event.snapshot.phase, Phase::EndFlush);
        assert_eq!(event.snapshot.progress_pct, 100.0);
    }

    #[test]
    fn locate_requests_audio_seek() {
        let mut session = session("one");
        let event = session.apply_command(SessionCommand::Locate {
            text: "the lazy dog".to_string(),
        });
        assert_eq!(event.seek_to, Some(3.0));
        assert_eq!(event.snapshot.last_locate.map(|found| found.start), Some(6));
    }

    #[test]
    fn resync_restores_rebuilt_surface() {
        let mut session = session("one");
        let mut surface = MemorySurface::new(session.document());
        let seek = session.seek(1.1);
        apply_commands(&mut surface, &seek);

        surface.rebuild(session.document());
        assert_eq!(surface.highlighted_count(), 0);
        let event = session.apply_command(SessionCommand::Resync);
        apply_commands(&mut surface, &event.commands);
        assert_eq!(surface.highlighted_indices(), vec![0, 1, 2]);
    }

    #[test]
    fn deck_routes_to_bound_section_only() {
        let mut deck = SectionDeck::new(vec![session("one"), session("two")]);
        deck.dispatch(SessionCommand::Audio(AudioEvent::Play));
        assert!(deck.section(0).is_some_and(ReadAlongSession::is_playing));

        assert!(deck.section(1).is_some_and(ReadAlongSession::is_stopped));

        assert!(deck.rebind(1));
        assert!(!deck.section(0).is_some_and(ReadAlongSession::is_playing));
        assert!(deck.section(0).is_some_and(ReadAlongSession::is_stopped));
        assert!(!deck.section(1).is_some_and(ReadAlongSession::is_stopped));
        deck.dispatch(SessionCommand::Audio(AudioEvent::Seek { time: 2.1 }));
        assert_eq!(
            deck.section(0).map(|s| s.controller().highlighted_through()),
            Some(0)
        );
        assert_eq!(
            deck.section(1).map(|s| s.controller().highlighted_through()),
            Some(5)
        );
        assert!(!deck.rebind(7));
        assert_eq!(deck.active_index(), Some(1));
    }
}
