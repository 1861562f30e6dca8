use chrono::{DateTime, Local};
use serde::Serialize;

use crate::game::arc::JudgmentArc;
use crate::game::note::NoteRenderInfo;

/// End-of-session record handed to the UI.
#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
    pub total: u32,
    pub hit: u32,
    pub miss: u32,
    pub max_combo: u32,
    pub score: u32,
    pub accuracy: f32,
    pub finished_at: DateTime<Local>,
}

/// Everything the renderer draws for one tick.
#[derive(Clone, Debug, Serialize)]
pub struct FrameSnapshot {
    pub arc: JudgmentArc,
    pub notes: Vec<NoteRenderInfo>,
    pub score: u32,
    pub accuracy: f32,
    pub combo: u32,
    /// Song progress in 0.0–1.0.
    pub progress: f32,
}
