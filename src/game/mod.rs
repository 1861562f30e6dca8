pub mod arc;
pub mod beatmap;
pub mod gameplay;
pub mod judgment;
pub mod note;
pub mod notefield;
pub mod scheduler;
pub mod scores;
pub mod stage_stats;
pub mod timing;
