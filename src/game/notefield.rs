use crate::game::arc::JudgmentArc;
use crate::game::note::{Note, NoteKind, NoteRenderInfo, NoteStatus};
use crate::game::scores::ScoreState;
use crate::game::timing;
use log::trace;

/// Owns every live note. Notes travel outward from the arc center and leave
/// the field one update after they are judged.
#[derive(Clone, Debug)]
pub struct NoteField {
    arc: JudgmentArc,
    notes: Vec<Note>,
    next_note_id: u64,
    /// Units per reference tick.
    note_speed: f32,
    /// Drawn size of a note; also widens the hand contact distance.
    note_radius: f32,
    spawn_radius: f32,
}

impl NoteField {
    pub fn new(arc: JudgmentArc, note_speed: f32, note_radius: f32, spawn_radius: f32) -> Self {
        Self {
            arc,
            notes: Vec::new(),
            next_note_id: 0,
            note_speed,
            note_radius,
            spawn_radius: spawn_radius.clamp(0.0, arc.radius),
        }
    }

    #[inline(always)]
    pub fn arc(&self) -> &JudgmentArc {
        &self.arc
    }

    #[inline(always)]
    pub fn note_speed(&self) -> f32 {
        self.note_speed
    }

    #[inline(always)]
    pub fn note_radius(&self) -> f32 {
        self.note_radius
    }

    #[inline(always)]
    pub fn spawn_radius(&self) -> f32 {
        self.spawn_radius
    }

    /// Distance a note covers between spawning and reaching the arc line.
    #[inline(always)]
    pub fn travel_distance(&self) -> f32 {
        (self.arc.radius - self.spawn_radius).max(0.0)
    }

    pub fn spawn(&mut self, zone_index: usize, angle: f32, kind: NoteKind) -> u64 {
        let id = self.next_note_id;
        self.next_note_id += 1;
        self.notes.push(Note {
            id,
            zone_index,
            angle,
            radius: self.spawn_radius,
            status: NoteStatus::Active,
            kind,
        });
        trace!("Spawned note {id} in zone {zone_index} at {angle:.1}° ({kind:?}).");
        id
    }

    /// Drops notes judged on the previous update, moves the rest outward by
    /// `delta_seconds` of travel, and turns overshooting notes into misses.
    pub fn advance(&mut self, delta_seconds: f32, score: &mut ScoreState) {
        self.notes.retain(Note::is_active);

        let delta = if delta_seconds.is_finite() { delta_seconds.max(0.0) } else { 0.0 };
        let step = timing::units_per_second(self.note_speed) * delta;
        let overshoot = self.arc.overshoot_radius();
        for note in &mut self.notes {
            note.radius += step;
            if note.radius > overshoot {
                note.status = NoteStatus::Miss;
                score.record_miss();
                trace!("Note {} missed.", note.id);
            }
        }
    }

    /// Marks an active note as hit. Returns its kind, or `None` if the note is
    /// gone or already judged.
    pub(crate) fn mark_hit(&mut self, id: u64) -> Option<NoteKind> {
        let note = self.notes.iter_mut().find(|n| n.id == id && n.is_active())?;
        note.status = NoteStatus::Hit;
        Some(note.kind)
    }

    pub fn all(&self) -> &[Note] {
        &self.notes
    }

    pub fn active_count(&self) -> usize {
        self.notes.iter().filter(|n| n.is_active()).count()
    }

    pub fn snapshot_for_render(&self) -> Vec<NoteRenderInfo> {
        self.notes
            .iter()
            .map(|n| NoteRenderInfo {
                position: n.position(self.arc.center),
                radius: self.note_radius,
                status: n.status,
                kind: n.kind,
            })
            .collect()
    }
}
