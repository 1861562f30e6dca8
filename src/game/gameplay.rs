use crate::config::Config;
use crate::core::clock::AudioBeatClock;
use crate::game::arc::JudgmentArc;
use crate::game::beatmap::BeatmapPattern;
use crate::game::judgment::{CollisionJudge, Hands};
use crate::game::notefield::NoteField;
use crate::game::scheduler::NoteScheduler;
use crate::game::scores::ScoreState;
use crate::game::stage_stats::{FrameSnapshot, SessionSummary};
use log::info;

/// One play-through: the scheduler, live notes, judge and score advanced
/// together from the foreground loop.
pub struct GameSession {
    scheduler: NoteScheduler,
    field: NoteField,
    judge: CollisionJudge,
    score: ScoreState,
    current_beat: f32,
    log_timer: f32,
}

impl GameSession {
    pub fn new(scheduler: NoteScheduler, field: NoteField, judge: CollisionJudge) -> Self {
        Self {
            scheduler,
            field,
            judge,
            score: ScoreState::new(),
            current_beat: 0.0,
            log_timer: 0.0,
        }
    }

    pub fn from_config(cfg: &Config, pattern: BeatmapPattern, seed: u64) -> Self {
        let arc = JudgmentArc::bottom_center(
            cfg.screen_width,
            cfg.screen_height,
            cfg.arc_radius,
            cfg.zone_count,
            cfg.hit_tolerance,
        );
        let field = NoteField::new(arc, cfg.note_speed, cfg.note_radius, cfg.spawn_radius);
        let scheduler = NoteScheduler::new(
            pattern,
            cfg.zone_count,
            cfg.notes_per_beat,
            cfg.bonus_chance,
            seed,
        );
        Self::new(scheduler, field, CollisionJudge::new(cfg.hit_threshold))
    }

    /// Advances the session by `delta_seconds`: spawn, move, judge. No new
    /// notes are scheduled once the clock stops playing, but notes already in
    /// flight keep moving so they still resolve.
    pub fn update(&mut self, delta_seconds: f32, clock: &dyn AudioBeatClock, hands: &Hands) {
        self.current_beat = clock.current_beat();
        if clock.is_playing() {
            self.scheduler
                .tick(self.current_beat, clock.bpm(), &mut self.field);
        }
        self.field.advance(delta_seconds, &mut self.score);
        self.judge.judge_all(hands, &mut self.field, &mut self.score);

        self.log_timer += delta_seconds.max(0.0);
        if self.log_timer >= 1.0 {
            info!(
                "Beat: {:.2}, Score: {}, Combo: {}, Misses: {}, Active Notes: {}",
                self.current_beat,
                self.score.score(),
                self.score.combo(),
                self.score.miss_notes(),
                self.field.active_count()
            );
            self.log_timer -= 1.0;
        }
    }

    #[inline(always)]
    pub fn arc(&self) -> &JudgmentArc {
        self.field.arc()
    }

    #[inline(always)]
    pub fn score(&self) -> &ScoreState {
        &self.score
    }

    #[inline(always)]
    pub fn field(&self) -> &NoteField {
        &self.field
    }

    #[inline(always)]
    pub fn scheduler(&self) -> &NoteScheduler {
        &self.scheduler
    }

    /// True once nothing is left on screen to resolve.
    pub fn is_drained(&self) -> bool {
        self.field.active_count() == 0
    }

    pub fn snapshot(&self, progress: f32) -> FrameSnapshot {
        FrameSnapshot {
            arc: *self.field.arc(),
            notes: self.field.snapshot_for_render(),
            score: self.score.score(),
            accuracy: self.score.accuracy(),
            combo: self.score.combo(),
            progress: progress.clamp(0.0, 1.0),
        }
    }

    pub fn summary(&self) -> SessionSummary {
        self.score.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::GameSession;
    use crate::config::Config;
    use crate::core::clock::AudioBeatClock;
    use crate::game::arc::JudgmentArc;
    use crate::game::beatmap::BeatmapPattern;
    use crate::game::judgment::CollisionJudge;
    use crate::game::note::NoteStatus;
    use crate::game::notefield::NoteField;
    use crate::game::scheduler::NoteScheduler;
    use glam::Vec2;

    /// Clock whose position is set by the test.
    struct ScriptedClock {
        beat: f32,
        bpm: f32,
        playing: bool,
    }

    impl AudioBeatClock for ScriptedClock {
        fn current_beat(&self) -> f32 {
            self.beat
        }
        fn bpm(&self) -> f32 {
            self.bpm
        }
        fn is_playing(&self) -> bool {
            self.playing
        }
        fn progress(&self) -> f32 {
            self.beat / 16.0
        }
    }

    const CENTER: Vec2 = Vec2::new(960.0, 1080.0);

    /// Notes spawn on the arc line, so spawn beat equals arrival beat.
    fn zero_latency_session(bits: &[u8]) -> GameSession {
        let arc = JudgmentArc::new(CENTER, 350.0, 4, 80.0);
        let field = NoteField::new(arc, 3.0, 20.0, 350.0);
        let pattern = BeatmapPattern::from_slots(bits.iter().map(|&b| b == 1).collect()).unwrap();
        let scheduler = NoteScheduler::new(pattern, 4, 1, 0.0, 17);
        GameSession::new(scheduler, field, CollisionJudge::new(50.0))
    }

    #[test]
    fn pattern_drives_spawns_and_untouched_notes_miss() {
        let mut session = zero_latency_session(&[1, 0, 1, 0]);
        let mut clock = ScriptedClock {
            beat: 0.0,
            bpm: 120.0,
            playing: true,
        };
        let dt = 1.0 / 60.0;
        let mut spawned_on = Vec::new();
        let mut newest_id = None;
        for step in 0..240 {
            clock.beat = step as f32 * dt * 2.0;
            session.update(dt, &clock, &[None, None]);
            let newest = session.field().all().iter().map(|n| n.id).max();
            if newest > newest_id {
                newest_id = newest;
                spawned_on.push(session.scheduler().last_spawned_beat());
            }
        }
        assert_eq!(spawned_on, vec![0, 2, 4, 6]);
        // A second at 90 units/s carries each note past the band.
        assert_eq!(session.score().miss_notes(), 4);
        assert_eq!(session.score().combo(), 0);
        assert_eq!(session.summary().accuracy, 0.0);
    }

    #[test]
    fn stopped_clock_spawns_nothing() {
        let mut session = zero_latency_session(&[1]);
        let clock = ScriptedClock {
            beat: 3.0,
            bpm: 120.0,
            playing: false,
        };
        session.update(0.1, &clock, &[None, None]);
        assert!(session.is_drained());
        assert_eq!(session.scheduler().last_spawned_beat(), -1);
    }

    #[test]
    fn hand_on_a_fresh_note_scores_through_the_session() {
        let mut session = zero_latency_session(&[1]);
        let clock = ScriptedClock {
            beat: 0.0,
            bpm: 120.0,
            playing: true,
        };
        session.update(0.0, &clock, &[None, None]);
        let note = session.field().all()[0].clone();
        let hand = note.position(CENTER);

        session.update(0.0, &clock, &[Some(hand), None]);
        assert_eq!(session.score().hit_notes(), 1);
        assert_eq!(session.score().combo(), 1);

        let snap = session.snapshot(clock.progress());
        assert_eq!(snap.score, note.kind.points());
        assert_eq!(snap.accuracy, 100.0);
        assert_eq!(snap.notes.len(), 1);
        assert_eq!(snap.notes[0].status, NoteStatus::Hit);

        // The resolved note is gone after the next tick.
        session.update(0.0, &clock, &[Some(hand), None]);
        assert!(session.snapshot(1.5).notes.is_empty());
        assert_eq!(session.snapshot(1.5).progress, 1.0);
    }

    #[test]
    fn zero_bpm_session_keeps_running() {
        let mut session = zero_latency_session(&[1]);
        let mut clock = ScriptedClock {
            beat: 0.0,
            bpm: 0.0,
            playing: true,
        };
        for step in 0..120 {
            clock.beat = step as f32 / 30.0;
            session.update(1.0 / 30.0, &clock, &[None, None]);
        }
        let total = session.score().total_notes() as usize + session.field().active_count();
        assert_eq!(total, 4);
    }

    #[test]
    fn session_follows_config_geometry() {
        let cfg = Config::default();
        let session = GameSession::from_config(&cfg, BeatmapPattern::default(), 1);
        let arc = session.arc();
        assert_eq!(arc.center, Vec2::new((cfg.screen_width / 2) as f32, cfg.screen_height as f32));
        assert_eq!(arc.radius, cfg.arc_radius);
        assert_eq!(arc.zone_count, cfg.zone_count);
    }
}
