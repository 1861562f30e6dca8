use glam::Vec2;
use serde::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteStatus {
    Active,
    Hit,
    Miss,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    #[default]
    Normal,
    Bonus,
}

impl NoteKind {
    /// Points credited when a note of this kind is hit.
    #[inline(always)]
    pub const fn points(self) -> u32 {
        match self {
            Self::Normal => 1,
            Self::Bonus => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    pub id: u64,
    pub zone_index: usize,
    /// Degrees in the upper half-plane, 0 = right, 180 = left.
    pub angle: f32,
    pub radius: f32,
    pub status: NoteStatus,
    pub kind: NoteKind,
}

impl Note {
    #[inline(always)]
    pub fn is_active(&self) -> bool {
        self.status == NoteStatus::Active
    }

    /// Screen position around `center`. Y grows downward, so the arc opens upward.
    #[inline(always)]
    pub fn position(&self, center: Vec2) -> Vec2 {
        let rad = self.angle.to_radians();
        Vec2::new(
            center.x + self.radius * rad.cos(),
            center.y - self.radius * rad.sin(),
        )
    }
}

/// What the renderer needs to draw one note.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NoteRenderInfo {
    pub position: Vec2,
    pub radius: f32,
    pub status: NoteStatus,
    pub kind: NoteKind,
}
