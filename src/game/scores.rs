use crate::game::note::NoteKind;
use crate::game::stage_stats::SessionSummary;

/// Running totals for one session. Only the note field and the collision
/// judge mutate it, through `record_hit` / `record_miss`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScoreState {
    score: u32,
    combo: u32,
    max_combo: u32,
    total_notes: u32,
    hit_notes: u32,
    miss_notes: u32,
}

impl ScoreState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&mut self, kind: NoteKind) {
        self.score = self.score.saturating_add(kind.points());
        self.hit_notes = self.hit_notes.saturating_add(1);
        self.total_notes = self.total_notes.saturating_add(1);
        self.combo = self.combo.saturating_add(1);
        self.max_combo = self.max_combo.max(self.combo);
    }

    pub(crate) fn record_miss(&mut self) {
        self.miss_notes = self.miss_notes.saturating_add(1);
        self.total_notes = self.total_notes.saturating_add(1);
        self.combo = 0;
    }

    #[inline(always)]
    pub const fn score(&self) -> u32 {
        self.score
    }

    #[inline(always)]
    pub const fn combo(&self) -> u32 {
        self.combo
    }

    #[inline(always)]
    pub const fn max_combo(&self) -> u32 {
        self.max_combo
    }

    #[inline(always)]
    pub const fn total_notes(&self) -> u32 {
        self.total_notes
    }

    #[inline(always)]
    pub const fn hit_notes(&self) -> u32 {
        self.hit_notes
    }

    #[inline(always)]
    pub const fn miss_notes(&self) -> u32 {
        self.miss_notes
    }

    /// Hit percentage in 0.0–100.0; 0.0 before anything has been judged.
    pub fn accuracy(&self) -> f32 {
        if self.total_notes == 0 {
            return 0.0;
        }
        (self.hit_notes as f32 / self.total_notes as f32 * 100.0).clamp(0.0, 100.0)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            total: self.total_notes,
            hit: self.hit_notes,
            miss: self.miss_notes,
            max_combo: self.max_combo,
            score: self.score,
            accuracy: self.accuracy(),
            finished_at: chrono::Local::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ScoreState;
    use crate::game::note::NoteKind;

    #[test]
    fn accuracy_is_zero_without_judged_notes() {
        let s = ScoreState::new();
        assert_eq!(s.accuracy(), 0.0);
        assert_eq!(s.total_notes(), 0);
    }

    #[test]
    fn hits_build_combo_and_miss_resets_it() {
        let mut s = ScoreState::new();
        s.record_hit(NoteKind::Normal);
        s.record_hit(NoteKind::Bonus);
        s.record_hit(NoteKind::Normal);
        assert_eq!(s.score(), 4);
        assert_eq!(s.combo(), 3);
        assert_eq!(s.max_combo(), 3);

        s.record_miss();
        assert_eq!(s.combo(), 0);
        assert_eq!(s.max_combo(), 3);
        assert_eq!(s.score(), 4, "a miss never takes points away");

        s.record_hit(NoteKind::Normal);
        assert_eq!(s.combo(), 1);
        assert_eq!(s.max_combo(), 3);
        assert_eq!(s.total_notes(), s.hit_notes() + s.miss_notes());
        assert!((s.accuracy() - 80.0).abs() < 1e-4);
    }

    #[test]
    fn summary_mirrors_counters() {
        let mut s = ScoreState::new();
        s.record_hit(NoteKind::Bonus);
        s.record_miss();
        let summary = s.summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.hit, 1);
        assert_eq!(summary.miss, 1);
        assert_eq!(summary.max_combo, 1);
        assert_eq!(summary.score, 2);
        assert!((summary.accuracy - 50.0).abs() < 1e-4);
    }
}
