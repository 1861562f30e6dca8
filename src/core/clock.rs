use crate::game::timing::seconds_per_beat;
use log::info;
use std::time::{Duration, Instant};

/// What the game needs from the music: where in the song we are, in beats.
pub trait AudioBeatClock {
    fn current_beat(&self) -> f32;
    fn bpm(&self) -> f32;
    fn is_playing(&self) -> bool;
    /// Song position in 0.0–1.0.
    fn progress(&self) -> f32;
}

/// Beat clock driven by wall time since `start()`. Playback itself is left
/// to the audio backend; this only tracks where the song should be.
#[derive(Debug, Clone)]
pub struct WallBeatClock {
    bpm: f32,
    length: Duration,
    started_at: Option<Instant>,
    stopped_at: Option<Instant>,
}

impl WallBeatClock {
    pub fn new(bpm: f32, length: Duration) -> Self {
        Self {
            bpm,
            length,
            started_at: None,
            stopped_at: None,
        }
    }

    pub fn start(&mut self) {
        info!(
            "Beat clock started at {:.1} BPM ({:.2}s per beat, {:.0}s song).",
            self.bpm,
            seconds_per_beat(self.bpm),
            self.length.as_secs_f32()
        );
        self.started_at = Some(Instant::now());
        self.stopped_at = None;
    }

    pub fn stop(&mut self) {
        if self.started_at.is_some() && self.stopped_at.is_none() {
            self.stopped_at = Some(Instant::now());
        }
    }

    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm;
    }

    /// Seconds of song elapsed, frozen once stopped.
    pub fn elapsed_seconds(&self) -> f32 {
        let Some(start) = self.started_at else {
            return 0.0;
        };
        let end = self.stopped_at.unwrap_or_else(Instant::now);
        end.saturating_duration_since(start).as_secs_f32()
    }
}

impl AudioBeatClock for WallBeatClock {
    fn current_beat(&self) -> f32 {
        self.elapsed_seconds() / seconds_per_beat(self.bpm)
    }

    fn bpm(&self) -> f32 {
        self.bpm
    }

    fn is_playing(&self) -> bool {
        self.started_at.is_some()
            && self.stopped_at.is_none()
            && self.elapsed_seconds() < self.length.as_secs_f32()
    }

    fn progress(&self) -> f32 {
        let len = self.length.as_secs_f32();
        if len <= 0.0 {
            return 1.0;
        }
        (self.elapsed_seconds() / len).clamp(0.0, 1.0)
    }
}
