use glam::Vec2;
use serde::Serialize;

/// Session-constant geometry of the semicircle notes are judged on.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct JudgmentArc {
    pub center: Vec2,
    pub radius: f32,
    pub zone_count: usize,
    /// Half-width of the radial band counted as "on the line".
    pub hit_tolerance: f32,
}

impl JudgmentArc {
    pub fn new(center: Vec2, radius: f32, zone_count: usize, hit_tolerance: f32) -> Self {
        Self {
            center,
            radius: radius.max(0.0),
            zone_count: zone_count.max(1),
            hit_tolerance: hit_tolerance.max(0.0),
        }
    }

    /// Arc anchored at the bottom middle of a `width` x `height` screen.
    pub fn bottom_center(width: u32, height: u32, radius: f32, zone_count: usize, hit_tolerance: f32) -> Self {
        Self::new(
            Vec2::new((width / 2) as f32, height as f32),
            radius,
            zone_count,
            hit_tolerance,
        )
    }

    #[inline(always)]
    pub fn zone_angle_width(&self) -> f32 {
        180.0 / self.zone_count as f32
    }

    /// Angular span `(low, high)` in degrees covered by `zone`. Zone 0 starts at 180°.
    pub fn zone_span(&self, zone: usize) -> (f32, f32) {
        let w = self.zone_angle_width();
        let start = 180.0 - zone as f32 * w;
        let end = 180.0 - (zone as f32 + 1.0) * w;
        (end, start)
    }

    /// True when `point` lies within `hit_tolerance` of the arc line.
    #[inline(always)]
    pub fn in_band(&self, point: Vec2) -> bool {
        (point.distance(self.center) - self.radius).abs() < self.hit_tolerance
    }

    /// Radius past which an unjudged note counts as missed.
    #[inline(always)]
    pub fn overshoot_radius(&self) -> f32 {
        self.radius + self.hit_tolerance
    }
}
