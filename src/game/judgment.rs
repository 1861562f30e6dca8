use crate::game::notefield::NoteField;
use crate::game::scores::ScoreState;
use glam::Vec2;
use log::debug;

/// Simultaneously tracked hands.
pub const MAX_HANDS: usize = 2;

/// Latest hand coordinates, one slot per tracked hand.
pub type Hands = [Option<Vec2>; MAX_HANDS];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HandChannel {
    A,
    B,
}

impl HandChannel {
    pub const ALL: [Self; MAX_HANDS] = [Self::A, Self::B];

    #[inline(always)]
    pub const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

/// Hit-tests live notes against hand positions. Contact state is kept per
/// hand so two hands can score different notes on the same tick.
#[derive(Clone, Debug)]
pub struct CollisionJudge {
    hit_threshold: f32,
    last_credited: [Option<u64>; MAX_HANDS],
}

impl CollisionJudge {
    pub fn new(hit_threshold: f32) -> Self {
        Self {
            hit_threshold: hit_threshold.max(0.0),
            last_credited: [None; MAX_HANDS],
        }
    }

    pub fn last_credited(&self, channel: HandChannel) -> Option<u64> {
        self.last_credited[channel.index()]
    }

    /// Judges every hand slot in `hands` against the field.
    pub fn judge_all(&mut self, hands: &Hands, field: &mut NoteField, score: &mut ScoreState) -> usize {
        HandChannel::ALL
            .iter()
            .map(|&ch| self.judge(ch, hands[ch.index()], field, score))
            .sum()
    }

    /// Credits every active note this hand touches on the arc line. Returns
    /// the number of notes credited.
    pub fn judge(
        &mut self,
        channel: HandChannel,
        hand: Option<Vec2>,
        field: &mut NoteField,
        score: &mut ScoreState,
    ) -> usize {
        let slot = &mut self.last_credited[channel.index()];
        let Some(hand) = hand else {
            *slot = None;
            return 0;
        };

        let arc = *field.arc();
        if !arc.in_band(hand) {
            return 0;
        }

        let reach = field.note_radius() + self.hit_threshold;
        let touched: Vec<u64> = field
            .all()
            .iter()
            .filter(|n| n.is_active() && Some(n.id) != *slot)
            .filter(|n| {
                let pos = n.position(arc.center);
                arc.in_band(pos) && hand.distance(pos) < reach
            })
            .map(|n| n.id)
            .collect();

        let mut credited = 0;
        for id in touched {
            if let Some(kind) = field.mark_hit(id) {
                score.record_hit(kind);
                *slot = Some(id);
                credited += 1;
                debug!(
                    "Hand {:?} hit note {} ({:?}); combo {}.",
                    channel,
                    id,
                    kind,
                    score.combo()
                );
            }
        }
        credited
    }
}
