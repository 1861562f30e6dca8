use log::{info, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Played when a song has no usable beatmap: a note every other beat.
pub const DEFAULT_PATTERN: [bool; 4] = [true, false, true, false];

#[derive(Debug, Error)]
pub enum BeatmapError {
    #[error("failed to read beatmap '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed beatmap list: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid beat token '{token}' at slot {index}; expected 0 or 1")]
    InvalidToken { index: usize, token: String },
    #[error("beatmap has no beat slots")]
    Empty,
}

/// Cyclic sequence of per-beat spawn flags. Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeatmapPattern {
    slots: Vec<bool>,
}

impl Default for BeatmapPattern {
    fn default() -> Self {
        Self {
            slots: DEFAULT_PATTERN.to_vec(),
        }
    }
}

impl BeatmapPattern {
    pub fn from_slots(slots: Vec<bool>) -> Result<Self, BeatmapError> {
        if slots.is_empty() {
            return Err(BeatmapError::Empty);
        }
        Ok(Self { slots })
    }

    /// Parses either a bracketed list (`[0, 1, 1, 0]`, the authoring tool's
    /// output) or bare tokens separated by whitespace and/or commas.
    pub fn parse(text: &str) -> Result<Self, BeatmapError> {
        let trimmed = text.trim();
        if trimmed.starts_with('[') {
            let values: Vec<u8> = serde_json::from_str(trimmed)?;
            let slots = values
                .into_iter()
                .enumerate()
                .map(|(index, v)| match v {
                    0 => Ok(false),
                    1 => Ok(true),
                    other => Err(BeatmapError::InvalidToken {
                        index,
                        token: other.to_string(),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Self::from_slots(slots);
        }

        let slots = trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .enumerate()
            .map(|(index, token)| match token {
                "0" => Ok(false),
                "1" => Ok(true),
                other => Err(BeatmapError::InvalidToken {
                    index,
                    token: other.to_string(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_slots(slots)
    }

    pub fn path_for_song(dir: &Path, song_id: &str) -> PathBuf {
        dir.join(format!("{song_id}.txt"))
    }

    pub fn load(dir: &Path, song_id: &str) -> Result<Self, BeatmapError> {
        let path = Self::path_for_song(dir, song_id);
        let text = std::fs::read_to_string(&path).map_err(|source| BeatmapError::Io {
            path: path.clone(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Loads the song's beatmap, substituting the default pattern on any failure.
    pub fn load_or_default(dir: &Path, song_id: &str) -> Self {
        match Self::load(dir, song_id) {
            Ok(pattern) => {
                info!(
                    "Loaded beatmap for '{}': {} beats, {} notes.",
                    song_id,
                    pattern.len(),
                    pattern.spawn_slot_count()
                );
                pattern
            }
            Err(e) => {
                warn!("{e}; using default beatmap pattern.");
                Self::default()
            }
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether `beat` (any integer, wrapped cyclically) carries a note.
    #[inline(always)]
    pub fn is_spawn_beat(&self, beat: i64) -> bool {
        let idx = beat.rem_euclid(self.slots.len() as i64) as usize;
        self.slots[idx]
    }

    pub fn spawn_slot_count(&self) -> usize {
        self.slots.iter().filter(|&&s| s).count()
    }
}
