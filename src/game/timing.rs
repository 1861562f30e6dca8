// Beat/travel arithmetic shared by the scheduler and the note field.

/// Ticks per second that `note_speed` is expressed against. The field scales
/// motion by wall-clock delta, so the look-ahead prediction holds at any frame rate.
pub const REFERENCE_TICK_RATE: f32 = 30.0;

/// Beat interval used when the clock reports a non-positive or non-finite BPM.
pub const FALLBACK_SECONDS_PER_BEAT: f32 = 1.0;

#[inline(always)]
pub fn seconds_per_beat(bpm: f32) -> f32 {
    if bpm.is_finite() && bpm > 0.0 {
        60.0 / bpm
    } else {
        FALLBACK_SECONDS_PER_BEAT
    }
}

/// Distance covered in one second by a note moving `note_speed` units per reference tick.
#[inline(always)]
pub fn units_per_second(note_speed: f32) -> f32 {
    note_speed * REFERENCE_TICK_RATE
}

/// Seconds a note needs to cover `distance` at `note_speed`.
#[inline(always)]
pub fn travel_seconds(distance: f32, note_speed: f32) -> f32 {
    if distance <= 0.0 || !note_speed.is_finite() || note_speed <= 0.0 {
        return 0.0;
    }
    let travel_ticks = distance / note_speed;
    travel_ticks / REFERENCE_TICK_RATE
}

/// How many beats of look-ahead a note spawned now needs to land on its beat.
#[inline(always)]
pub fn beats_of_travel(distance: f32, note_speed: f32, bpm: f32) -> f32 {
    travel_seconds(distance, note_speed) / seconds_per_beat(bpm)
}

/// The beat slot whose note has to be created at `current_beat`.
#[inline(always)]
pub fn target_beat(current_beat: f32, beats_of_travel: f32) -> i64 {
    let beat = current_beat + beats_of_travel;
    if beat.is_finite() { beat.floor() as i64 } else { i64::MIN }
}
