use crate::game::beatmap::BeatmapPattern;
use crate::game::note::NoteKind;
use crate::game::notefield::NoteField;
use crate::game::timing;
use log::{debug, trace};
use rand::SeedableRng;
use rand::distr::{Bernoulli, Distribution, Uniform};
use rand::rngs::StdRng;
use smallvec::SmallVec;

/// Zones closer than this to one used by the previous batch are skipped.
pub const MIN_ZONE_SEPARATION: usize = 2;
/// Keeps spawns off the zone borders so neighbouring notes stay apart.
const ZONE_EDGE_MARGIN_DEG: f32 = 10.0;

pub type ZoneBatch = SmallVec<[usize; 4]>;

/// Picks spawn zones while keeping consecutive batches visually apart.
#[derive(Clone, Debug)]
pub struct ZoneSelector {
    zone_count: usize,
    recent: ZoneBatch,
}

impl ZoneSelector {
    pub fn new(zone_count: usize) -> Self {
        Self {
            zone_count: zone_count.max(1),
            recent: ZoneBatch::new(),
        }
    }

    pub fn recent(&self) -> &[usize] {
        &self.recent
    }

    #[inline(always)]
    fn is_excluded(&self, zone: usize) -> bool {
        self.recent
            .iter()
            .any(|&r| zone.abs_diff(r) < MIN_ZONE_SEPARATION)
    }

    /// Returns `count` distinct zones (clamped to the zone count). When the
    /// exclusion leaves too few candidates, it is cleared and the pick is
    /// made from every zone.
    pub fn select(&mut self, count: usize, rng: &mut StdRng) -> ZoneBatch {
        let count = count.min(self.zone_count);
        let mut available: ZoneBatch = (0..self.zone_count)
            .filter(|&z| !self.is_excluded(z))
            .collect();
        if available.len() < count {
            trace!(
                "Zone pool exhausted ({} free, {} wanted); resetting exclusions.",
                available.len(),
                count
            );
            self.recent.clear();
            available = (0..self.zone_count).collect();
        }

        let mut picked = ZoneBatch::new();
        while picked.len() < count {
            let Ok(dist) = Uniform::new(0, available.len()) else {
                break;
            };
            let idx = dist.sample(rng);
            picked.push(available.swap_remove(idx));
        }
        self.recent = picked.clone();
        picked
    }
}

/// Decides on every tick whether notes must be created now so they reach the
/// arc exactly on their beat.
#[derive(Debug)]
pub struct NoteScheduler {
    pattern: BeatmapPattern,
    notes_per_beat: usize,
    bonus: Option<Bernoulli>,
    last_spawned_beat: i64,
    zones: ZoneSelector,
    rng: StdRng,
}

impl NoteScheduler {
    pub fn new(
        pattern: BeatmapPattern,
        zone_count: usize,
        notes_per_beat: usize,
        bonus_chance: f64,
        seed: u64,
    ) -> Self {
        let bonus_chance = if bonus_chance.is_finite() {
            bonus_chance.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            pattern,
            notes_per_beat: notes_per_beat.max(1),
            bonus: Bernoulli::new(bonus_chance).ok(),
            last_spawned_beat: -1,
            zones: ZoneSelector::new(zone_count),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[inline(always)]
    pub fn last_spawned_beat(&self) -> i64 {
        self.last_spawned_beat
    }

    pub fn recent_zones(&self) -> &[usize] {
        self.zones.recent()
    }

    /// Evaluates the beat slot that a note spawned now would land on. Each
    /// slot is looked at once; returns how many notes were spawned.
    pub fn tick(&mut self, current_beat: f32, bpm: f32, field: &mut NoteField) -> usize {
        let look_ahead =
            timing::beats_of_travel(field.travel_distance(), field.note_speed(), bpm);
        let target = timing::target_beat(current_beat, look_ahead);
        if target <= self.last_spawned_beat {
            return 0;
        }

        let mut spawned = 0;
        if self.pattern.is_spawn_beat(target) {
            let zones = self.zones.select(self.notes_per_beat, &mut self.rng);
            for zone in zones {
                let angle = self.pick_angle(field, zone);
                let is_bonus = self
                    .bonus
                    .as_ref()
                    .is_some_and(|b| b.sample(&mut self.rng));
                let kind = if is_bonus {
                    NoteKind::Bonus
                } else {
                    NoteKind::Normal
                };
                field.spawn(zone, angle, kind);
                spawned += 1;
            }
            debug!(
                "Beat {target}: spawned {spawned} note(s) at beat {current_beat:.2} ({look_ahead:.2} beats ahead)."
            );
        }
        self.last_spawned_beat = target;
        spawned
    }

    fn pick_angle(&mut self, field: &NoteField, zone: usize) -> f32 {
        let arc = field.arc();
        let (low, high) = arc.zone_span(zone);
        let margin = ZONE_EDGE_MARGIN_DEG.min(arc.zone_angle_width() / 4.0);
        let (low, high) = (low + margin, high - margin);
        match Uniform::new_inclusive(low, high) {
            Ok(dist) if high > low => dist.sample(&mut self.rng),
            _ => (low + high) * 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MIN_ZONE_SEPARATION, NoteScheduler, ZoneSelector};
    use crate::game::arc::JudgmentArc;
    use crate::game::beatmap::BeatmapPattern;
    use crate::game::note::NoteKind;
    use crate::game::notefield::NoteField;
    use glam::Vec2;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn arc() -> JudgmentArc {
        JudgmentArc::new(Vec2::new(960.0, 1080.0), 350.0, 4, 80.0)
    }

    fn pattern(bits: &[u8]) -> BeatmapPattern {
        BeatmapPattern::from_slots(bits.iter().map(|&b| b == 1).collect()).unwrap()
    }

    #[test]
    fn zero_latency_follows_pattern_exactly() {
        // Spawning on the arc line removes travel latency.
        let mut field = NoteField::new(arc(), 3.0, 20.0, 350.0);
        let mut sched = NoteScheduler::new(pattern(&[1, 0, 1, 0]), 4, 1, 0.0, 7);
        let mut spawn_beats = Vec::new();
        for step in 0..32 {
            let beat = step as f32 * 0.25;
            if sched.tick(beat, 120.0, &mut field) > 0 {
                spawn_beats.push(beat.floor() as i64);
            }
        }
        assert_eq!(spawn_beats, vec![0, 2, 4, 6]);
        assert_eq!(field.all().len(), 4);
        assert_eq!(sched.last_spawned_beat(), 7);
    }

    #[test]
    fn notes_are_created_ahead_of_their_beat() {
        // 330 units / 3 per tick / 30 ticks/s = 3.67s = 7.33 beats at 120 BPM.
        let mut field = NoteField::new(arc(), 3.0, 20.0, 20.0);
        let mut sched = NoteScheduler::new(pattern(&[1]), 4, 1, 0.0, 1);
        assert_eq!(sched.tick(0.0, 120.0, &mut field), 1);
        assert_eq!(sched.last_spawned_beat(), 7);
        assert_eq!(sched.tick(0.5, 120.0, &mut field), 0);
        assert_eq!(sched.tick(0.7, 120.0, &mut field), 1);
        assert_eq!(sched.last_spawned_beat(), 8);
    }

    #[test]
    fn spawned_note_reaches_arc_on_its_beat() {
        let bpm = 120.0;
        let mut field = NoteField::new(arc(), 3.0, 20.0, 20.0);
        let mut sched = NoteScheduler::new(pattern(&[1]), 4, 1, 0.0, 3);
        let dt = 1.0 / 120.0;
        let mut time = 0.0_f32;
        let mut score = crate::game::scores::ScoreState::new();
        sched.tick(time * bpm / 60.0, bpm, &mut field);
        let target = sched.last_spawned_beat() as f32;
        while field.all()[0].radius < 350.0 {
            time += dt;
            field.advance(dt, &mut score);
        }
        let arrival_beat = time * bpm / 60.0;
        // Spawned at beat 0 aiming for 7.33 beats of travel, so it lands within the target slot.
        assert!(arrival_beat >= target && arrival_beat < target + 1.0, "arrived at {arrival_beat}");
    }

    #[test]
    fn zero_bpm_uses_fallback_interval() {
        let mut field = NoteField::new(arc(), 3.0, 20.0, 20.0);
        let mut sched = NoteScheduler::new(pattern(&[1]), 4, 1, 0.0, 1);
        // 3.67s of travel at 1s per beat is 3.67 beats.
        assert_eq!(sched.tick(0.0, 0.0, &mut field), 1);
        assert_eq!(sched.last_spawned_beat(), 3);
        assert_eq!(sched.tick(1.0, -10.0, &mut field), 1);
        assert_eq!(sched.last_spawned_beat(), 4);
    }

    #[test]
    fn silent_slots_are_still_consumed() {
        let mut field = NoteField::new(arc(), 3.0, 20.0, 350.0);
        let mut sched = NoteScheduler::new(pattern(&[0]), 4, 1, 0.0, 1);
        for beat in 0..5 {
            assert_eq!(sched.tick(beat as f32, 120.0, &mut field), 0);
            assert_eq!(sched.last_spawned_beat(), beat);
        }
        assert!(field.all().is_empty());
    }

    #[test]
    fn notes_per_beat_spawns_distinct_zones() {
        let six_zones = JudgmentArc::new(Vec2::new(960.0, 1080.0), 350.0, 6, 80.0);
        let mut field = NoteField::new(six_zones, 3.0, 20.0, 350.0);
        let mut sched = NoteScheduler::new(pattern(&[1]), 6, 2, 0.0, 11);
        assert_eq!(sched.tick(0.0, 120.0, &mut field), 2);
        let zones: Vec<usize> = field.all().iter().map(|n| n.zone_index).collect();
        assert_ne!(zones[0], zones[1]);
        assert_eq!(sched.recent_zones(), zones.as_slice());
        for note in field.all() {
            let (low, high) = field.arc().zone_span(note.zone_index);
            assert!(note.angle >= low && note.angle <= high);
        }
    }

    #[test]
    fn scheduler_state_shows_in_debug_output() {
        let mut field = NoteField::new(arc(), 3.0, 20.0, 350.0);
        let mut sched = NoteScheduler::new(pattern(&[1, 0]), 4, 1, 0.0, 2);
        sched.tick(0.0, 120.0, &mut field);
        let dump = format!("{sched:?}");
        assert!(dump.contains("last_spawned_beat: 0"), "{dump}");
        assert!(dump.contains("recent"), "{dump}");
    }

    #[test]
    fn bonus_chance_one_makes_every_note_bonus() {
        let mut field = NoteField::new(arc(), 3.0, 20.0, 350.0);
        let mut sched = NoteScheduler::new(pattern(&[1]), 4, 1, 1.0, 5);
        for beat in 0..4 {
            sched.tick(beat as f32, 120.0, &mut field);
        }
        assert!(field.all().iter().all(|n| n.kind == NoteKind::Bonus));
    }

    #[test]
    fn consecutive_batches_keep_their_distance() {
        let mut selector = ZoneSelector::new(8);
        let mut rng = StdRng::seed_from_u64(42);
        let mut previous = selector.select(2, &mut rng);
        for _ in 0..500 {
            let batch = selector.select(2, &mut rng);
            let free = (0..8)
                .filter(|z: &usize| previous.iter().all(|p| z.abs_diff(*p) >= MIN_ZONE_SEPARATION))
                .count();
            if free >= 2 {
                for z in &batch {
                    for p in &previous {
                        assert!(z.abs_diff(*p) >= MIN_ZONE_SEPARATION, "{z} too close to {p}");
                    }
                }
            }
            previous = batch;
        }
    }

    #[test]
    fn exhausted_pool_resets_instead_of_stalling() {
        // Any pick from two zones excludes both for the next batch.
        let mut selector = ZoneSelector::new(2);
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            assert_eq!(selector.select(1, &mut rng).len(), 1);
        }
        let mut single = ZoneSelector::new(1);
        for _ in 0..10 {
            assert_eq!(single.select(3, &mut rng).as_slice(), &[0]);
        }
    }
}
