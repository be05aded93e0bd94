//! Audio engine interface and typed playback events.
//!
//! Transport notifications are published on an [`AudioBus`] and consumed
//! through explicit subscriptions, so delivery order and unsubscription are
//! visible at the call site.

use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use tracing::{debug, trace};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum AudioEvent {
    Play,
    Pause,
    Seek { time: f64 },
    RateChanged { rate: f64 },
    Ended,
}

pub trait AudioEngine {
    fn current_time(&self) -> f64;

    fn duration(&self) -> f64;

    fn playback_rate(&self) -> f64;

    fn is_playing(&self) -> bool;

    fn seek_to(&mut self, time: f64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::Receiver<AudioEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Drain every event published since the last call, in publish order.
    pub fn drain(&self) -> Vec<AudioEvent> {
        self.receiver.try_iter().collect()
    }
}

#[derive(Default)]
pub struct AudioBus {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, mpsc::Sender<AudioEvent>)>,
}

impl AudioBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, sender));
        debug!(id = id.0, "Audio subscriber added");
        Subscription { id, receiver }
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(existing, _)| *existing != id);
        debug!(id = id.0, "Audio subscriber removed");
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver to every subscriber; dropped subscriptions are pruned.
    pub fn publish(&mut self, event: AudioEvent) {
        trace!(?event, "Publishing audio event");
        self.subscribers.retain(|(_, tx)| tx.send(event).is_ok());
    }
}

/// Clock-driven stand-in for a real player.
pub struct SimulatedAudio {
    position: f64,
    duration: f64,
    rate: f64,
    playing: bool,
    ended: bool,
    bus: AudioBus,
}

impl SimulatedAudio {
    pub fn new(duration: f64) -> Self {
        Self {
            position: 0.0,
            duration: duration.max(0.0),
            rate: 1.0,
            playing: false,
            ended: false,
            bus: AudioBus::new(),
        }
    }

    pub fn bus_mut(&mut self) -> &mut AudioBus {
        &mut self.bus
    }

    pub fn play(&mut self) {
        if !self.playing {
            self.playing = true;
            self.bus.publish(AudioEvent::Play);
        }
    }

    pub fn pause(&mut self) {
        if self.playing {
            self.playing = false;
            self.bus.publish(AudioEvent::Pause);
        }
    }

    pub fn set_rate(&mut self, rate: f64) {
        let rate = if rate.is_finite() { rate.clamp(0.25, 4.0) } else { 1.0 };
        if (rate - self.rate).abs() > f64::EPSILON {
            self.rate = rate;
            self.bus.publish(AudioEvent::RateChanged { rate });
        }
    }

    pub fn has_ended(&self) -> bool {
        self.ended
    }

    /// Advance the clock by `dt` wall-clock seconds scaled by the playback rate.
    pub fn advance(&mut self, dt: f64) {
        if !self.playing || self.ended {
            return;
        }
        self.position = (self.position + dt.max(0.0) * self.rate).min(self.duration);
        if self.position >= self.duration {
            self.playing = false;
            self.ended = true;
            self.bus.publish(AudioEvent::Ended);
        }
    }
}

impl AudioEngine for SimulatedAudio {
    fn current_time(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn playback_rate(&self) -> f64 {
        self.rate
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn seek_to(&mut self, time: f64) {
        let time = if time.is_finite() {
            time.clamp(0.0, self.duration)
        } else {
            0.0
        };
        self.position = time;
        self.ended = false;
        self.bus.publish(AudioEvent::Seek { time });
    }
}
