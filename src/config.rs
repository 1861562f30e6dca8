use log::{info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

const CONFIG_PATH: &str = "arcbeat.ini";
/// Longest song the beat clock accepts; keeps the length a valid `Duration`.
pub const MAX_LENGTH_SECONDS: f32 = 24.0 * 3600.0;

// --- Minimal INI reader ---
#[derive(Debug, Default)]
pub struct SimpleIni {
    sections: HashMap<String, HashMap<String, String>>,
}

impl SimpleIni {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        self.parse_str(&content);
        Ok(())
    }

    pub fn parse_str(&mut self, content: &str) {
        self.sections.clear();
        let mut current_section: Option<String> = None;

        for raw_line in content.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            // Section header: [SectionName]
            if line.starts_with('[') && line.ends_with(']') && line.len() >= 2 {
                let section = line[1..line.len() - 1].trim().to_string();
                current_section = Some(section.clone());
                self.sections.entry(section).or_default();
                continue;
            }

            // Key/value pair: key=value
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                let section = current_section.clone().unwrap_or_default();
                self.sections
                    .entry(section)
                    .or_default()
                    .insert(key.to_string(), value.trim().to_string());
            }
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.sections.get(section).and_then(|s| s.get(key)).cloned()
    }

    fn parsed<T: FromStr>(&self, section: &str, key: &str) -> Option<T> {
        self.get(section, key).and_then(|v| v.parse().ok())
    }

    fn flag(&self, section: &str, key: &str) -> Option<bool> {
        self.get(section, key).and_then(|v| parse_bool(&v))
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    if v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes") || v.eq_ignore_ascii_case("on") {
        Some(true)
    } else if v.eq_ignore_ascii_case("false")
        || v.eq_ignore_ascii_case("no")
        || v.eq_ignore_ascii_case("off")
    {
        Some(false)
    } else {
        v.parse::<u8>().ok().map(|n| n != 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    const fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Debug => "Debug",
            Self::Trace => "Trace",
        }
    }

    pub const fn as_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Off => log::LevelFilter::Off,
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(Self::Off),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(()),
        }
    }
}

/// `Auto` draws a fresh seed per run; a number makes note placement repeatable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RngSeed {
    Auto,
    Fixed(u64),
}

impl RngSeed {
    pub fn resolve(self) -> u64 {
        match self {
            Self::Fixed(seed) => seed,
            Self::Auto => {
                let now = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default();
                now.as_secs() ^ u64::from(now.subsec_nanos()).rotate_left(32)
            }
        }
    }
}

impl FromStr for RngSeed {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        s.parse::<u64>().map(Self::Fixed).map_err(|_| ())
    }
}

impl std::fmt::Display for RngSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => f.write_str("Auto"),
            Self::Fixed(seed) => write!(f, "{seed}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    // [Options]
    pub log_level: LogLevel,
    pub target_fps: u32,
    pub show_profiler: bool,
    pub profiler_interval: u32,
    pub rng_seed: RngSeed,
    pub camera_width: u32,
    pub camera_height: u32,
    pub background_video: bool,
    pub first_frame_timeout_ms: u64,
    // [Game]
    pub screen_width: u32,
    pub screen_height: u32,
    pub arc_radius: f32,
    pub zone_count: usize,
    /// Units per reference tick (1/30 s).
    pub note_speed: f32,
    pub note_radius: f32,
    pub hit_threshold: f32,
    pub hit_tolerance: f32,
    pub spawn_radius: f32,
    pub notes_per_beat: usize,
    pub bonus_chance: f64,
    // [Song]
    pub song_id: String,
    pub beatmap_dir: PathBuf,
    pub bpm: f32,
    pub length_seconds: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            target_fps: 60,
            show_profiler: false,
            profiler_interval: 60,
            rng_seed: RngSeed::Auto,
            camera_width: 640,
            camera_height: 480,
            background_video: true,
            first_frame_timeout_ms: 3000,
            screen_width: 1920,
            screen_height: 1080,
            arc_radius: 350.0,
            zone_count: 4,
            note_speed: 3.0,
            note_radius: 20.0,
            hit_threshold: 50.0,
            hit_tolerance: 80.0,
            spawn_radius: 20.0,
            notes_per_beat: 1,
            bonus_chance: 0.1,
            song_id: "demo".to_string(),
            beatmap_dir: PathBuf::from("beatmaps"),
            bpm: 120.0,
            length_seconds: 60.0,
        }
    }
}

#[inline(always)]
fn positive_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() && v > 0.0 { v } else { fallback }
}

impl Config {
    /// Reads every key, keeping the default for anything missing or unparsable.
    pub fn from_ini(conf: &SimpleIni) -> Self {
        let d = Self::default();
        let cfg = Self {
            log_level: conf.parsed("Options", "LogLevel").unwrap_or(d.log_level),
            target_fps: conf.parsed("Options", "TargetFps").unwrap_or(d.target_fps),
            show_profiler: conf.flag("Options", "ShowProfiler").unwrap_or(d.show_profiler),
            profiler_interval: conf
                .parsed("Options", "ProfilerInterval")
                .unwrap_or(d.profiler_interval),
            rng_seed: conf.parsed("Options", "RngSeed").unwrap_or(d.rng_seed),
            camera_width: conf.parsed("Options", "CameraWidth").unwrap_or(d.camera_width),
            camera_height: conf.parsed("Options", "CameraHeight").unwrap_or(d.camera_height),
            background_video: conf
                .flag("Options", "BackgroundVideo")
                .unwrap_or(d.background_video),
            first_frame_timeout_ms: conf
                .parsed("Options", "FirstFrameTimeoutMs")
                .unwrap_or(d.first_frame_timeout_ms),
            screen_width: conf.parsed("Game", "ScreenWidth").unwrap_or(d.screen_width),
            screen_height: conf.parsed("Game", "ScreenHeight").unwrap_or(d.screen_height),
            arc_radius: conf.parsed("Game", "ArcRadius").unwrap_or(d.arc_radius),
            zone_count: conf.parsed("Game", "ZoneCount").unwrap_or(d.zone_count),
            note_speed: conf.parsed("Game", "NoteSpeed").unwrap_or(d.note_speed),
            note_radius: conf.parsed("Game", "NoteRadius").unwrap_or(d.note_radius),
            hit_threshold: conf.parsed("Game", "HitThreshold").unwrap_or(d.hit_threshold),
            hit_tolerance: conf.parsed("Game", "HitTolerance").unwrap_or(d.hit_tolerance),
            spawn_radius: conf.parsed("Game", "SpawnRadius").unwrap_or(d.spawn_radius),
            notes_per_beat: conf.parsed("Game", "NotesPerBeat").unwrap_or(d.notes_per_beat),
            bonus_chance: conf.parsed("Game", "BonusChance").unwrap_or(d.bonus_chance),
            song_id: conf
                .get("Song", "SongId")
                .filter(|s| !s.is_empty())
                .unwrap_or(d.song_id.clone()),
            beatmap_dir: conf
                .get("Song", "BeatmapDir")
                .filter(|s| !s.is_empty())
                .map_or(d.beatmap_dir.clone(), PathBuf::from),
            bpm: conf.parsed("Song", "Bpm").unwrap_or(d.bpm),
            length_seconds: conf.parsed("Song", "LengthSeconds").unwrap_or(d.length_seconds),
        };
        cfg.sanitized()
    }

    /// Clamps values into ranges the game can run with.
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();
        self.target_fps = self.target_fps.clamp(1, 1000);
        self.profiler_interval = self.profiler_interval.max(1);
        self.camera_width = self.camera_width.max(1);
        self.camera_height = self.camera_height.max(1);
        self.screen_width = self.screen_width.max(1);
        self.screen_height = self.screen_height.max(1);
        self.arc_radius = positive_or(self.arc_radius, d.arc_radius);
        self.zone_count = self.zone_count.max(1);
        self.note_speed = positive_or(self.note_speed, d.note_speed);
        self.note_radius = positive_or(self.note_radius, d.note_radius);
        self.hit_threshold = if self.hit_threshold.is_finite() {
            self.hit_threshold.max(0.0)
        } else {
            d.hit_threshold
        };
        self.hit_tolerance = positive_or(self.hit_tolerance, d.hit_tolerance);
        self.spawn_radius = if self.spawn_radius.is_finite() {
            self.spawn_radius.clamp(0.0, self.arc_radius)
        } else {
            d.spawn_radius.min(self.arc_radius)
        };
        self.notes_per_beat = self.notes_per_beat.clamp(1, self.zone_count);
        self.bonus_chance = if self.bonus_chance.is_finite() {
            self.bonus_chance.clamp(0.0, 1.0)
        } else {
            d.bonus_chance
        };
        self.length_seconds =
            positive_or(self.length_seconds, d.length_seconds).min(MAX_LENGTH_SECONDS);
        // Bpm is left as-is: the timing layer already treats <= 0 as 1 s/beat.
        self
    }

    pub fn to_ini_string(&self) -> String {
        let flag = |b: bool| if b { "1" } else { "0" };
        let mut content = String::new();

        // [Options] section - keys in alphabetical order
        content.push_str("[Options]\n");
        content.push_str(&format!("BackgroundVideo={}\n", flag(self.background_video)));
        content.push_str(&format!("CameraHeight={}\n", self.camera_height));
        content.push_str(&format!("CameraWidth={}\n", self.camera_width));
        content.push_str(&format!("FirstFrameTimeoutMs={}\n", self.first_frame_timeout_ms));
        content.push_str(&format!("LogLevel={}\n", self.log_level.as_str()));
        content.push_str(&format!("ProfilerInterval={}\n", self.profiler_interval));
        content.push_str(&format!("RngSeed={}\n", self.rng_seed));
        content.push_str(&format!("ShowProfiler={}\n", flag(self.show_profiler)));
        content.push_str(&format!("TargetFps={}\n", self.target_fps));
        content.push('\n');

        content.push_str("[Game]\n");
        content.push_str(&format!("ArcRadius={}\n", self.arc_radius));
        content.push_str(&format!("BonusChance={}\n", self.bonus_chance));
        content.push_str(&format!("HitThreshold={}\n", self.hit_threshold));
        content.push_str(&format!("HitTolerance={}\n", self.hit_tolerance));
        content.push_str(&format!("NoteRadius={}\n", self.note_radius));
        content.push_str(&format!("NoteSpeed={}\n", self.note_speed));
        content.push_str(&format!("NotesPerBeat={}\n", self.notes_per_beat));
        content.push_str(&format!("ScreenHeight={}\n", self.screen_height));
        content.push_str(&format!("ScreenWidth={}\n", self.screen_width));
        content.push_str(&format!("SpawnRadius={}\n", self.spawn_radius));
        content.push_str(&format!("ZoneCount={}\n", self.zone_count));
        content.push('\n');

        content.push_str("[Song]\n");
        content.push_str(&format!("BeatmapDir={}\n", self.beatmap_dir.display()));
        content.push_str(&format!("Bpm={}\n", self.bpm));
        content.push_str(&format!("LengthSeconds={}\n", self.length_seconds));
        content.push_str(&format!("SongId={}\n", self.song_id));
        content.push('\n');
        content
    }
}

const ALL_KEYS: [(&str, &str); 24] = [
    ("Options", "BackgroundVideo"),
    ("Options", "CameraHeight"),
    ("Options", "CameraWidth"),
    ("Options", "FirstFrameTimeoutMs"),
    ("Options", "LogLevel"),
    ("Options", "ProfilerInterval"),
    ("Options", "RngSeed"),
    ("Options", "ShowProfiler"),
    ("Options", "TargetFps"),
    ("Game", "ArcRadius"),
    ("Game", "BonusChance"),
    ("Game", "HitThreshold"),
    ("Game", "HitTolerance"),
    ("Game", "NoteRadius"),
    ("Game", "NoteSpeed"),
    ("Game", "NotesPerBeat"),
    ("Game", "ScreenHeight"),
    ("Game", "ScreenWidth"),
    ("Game", "SpawnRadius"),
    ("Game", "ZoneCount"),
    ("Song", "BeatmapDir"),
    ("Song", "Bpm"),
    ("Song", "LengthSeconds"),
    ("Song", "SongId"),
];

static CONFIG: std::sync::LazyLock<Mutex<Config>> =
    std::sync::LazyLock::new(|| Mutex::new(Config::default()));

// --- File I/O ---

fn create_default_config_file() -> Result<(), std::io::Error> {
    info!("'{CONFIG_PATH}' not found, creating with default values.");
    std::fs::write(CONFIG_PATH, Config::default().to_ini_string())
}

pub fn load() {
    if !Path::new(CONFIG_PATH).exists()
        && let Err(e) = create_default_config_file()
    {
        warn!("Failed to create default config file: {e}");
    }

    let mut conf = SimpleIni::new();
    match conf.load(CONFIG_PATH) {
        Ok(()) => {
            let loaded = Config::from_ini(&conf);
            *CONFIG.lock().unwrap_or_else(PoisonError::into_inner) = loaded.clone();
            info!("Configuration loaded from '{CONFIG_PATH}'.");

            let missing = ALL_KEYS
                .iter()
                .any(|(sec, key)| conf.get(sec, key).is_none());
            if missing {
                if let Err(e) = std::fs::write(CONFIG_PATH, loaded.to_ini_string()) {
                    warn!("Failed to save config file: {e}");
                } else {
                    info!("'{CONFIG_PATH}' updated with default values for any missing fields.");
                }
            } else {
                info!("Configuration OK; no write needed.");
            }
        }
        Err(e) => {
            warn!("Failed to load '{CONFIG_PATH}': {e}. Using default values.");
        }
    }
}

pub fn get() -> Config {
    CONFIG.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

#[cfg(test)]
mod tests {
    use super::{ALL_KEYS, Config, LogLevel, MAX_LENGTH_SECONDS, RngSeed, SimpleIni};
    use std::path::PathBuf;
    use std::time::Duration;

    fn ini(text: &str) -> SimpleIni {
        let mut conf = SimpleIni::new();
        conf.parse_str(text);
        conf
    }

    #[test]
    fn reads_sections_and_ignores_comments() {
        let conf = ini("; header\n[Game]\nZoneCount = 6\n# note\n[Song]\nSongId=track_01\nBpm=95.5\n");
        let cfg = Config::from_ini(&conf);
        assert_eq!(cfg.zone_count, 6);
        assert_eq!(cfg.song_id, "track_01");
        assert_eq!(cfg.bpm, 95.5);
        assert_eq!(cfg.arc_radius, Config::default().arc_radius);
    }

    #[test]
    fn unparsable_values_fall_back_to_defaults() {
        let cfg = Config::from_ini(&ini("[Options]\nLogLevel=loud\nTargetFps=fast\n[Game]\nNoteSpeed=-2\nBonusChance=7\n"));
        let d = Config::default();
        assert_eq!(cfg.log_level, d.log_level);
        assert_eq!(cfg.target_fps, d.target_fps);
        assert_eq!(cfg.note_speed, d.note_speed);
        assert_eq!(cfg.bonus_chance, 1.0);
    }

    #[test]
    fn sanitizing_keeps_the_game_playable() {
        let cfg = Config::from_ini(&ini(
            "[Game]\nZoneCount=0\nNotesPerBeat=9\nArcRadius=100\nSpawnRadius=400\nHitThreshold=-1\n",
        ));
        assert_eq!(cfg.zone_count, 1);
        assert_eq!(cfg.notes_per_beat, 1);
        assert_eq!(cfg.spawn_radius, 100.0);
        assert_eq!(cfg.hit_threshold, 0.0);

        let huge = Config::from_ini(&ini("[Song]\nLengthSeconds=1e20\n"));
        assert_eq!(huge.length_seconds, MAX_LENGTH_SECONDS);
        assert!(Duration::try_from_secs_f32(huge.length_seconds).is_ok());
        let negative = Config::from_ini(&ini("[Song]\nLengthSeconds=-5\n"));
        assert_eq!(negative.length_seconds, Config::default().length_seconds);
    }

    #[test]
    fn seed_and_flags_parse() {
        let cfg = Config::from_ini(&ini("[Options]\nRngSeed=42\nShowProfiler=yes\nBackgroundVideo=0\nLogLevel=debug\n"));
        assert_eq!(cfg.rng_seed, RngSeed::Fixed(42));
        assert!(cfg.show_profiler);
        assert!(!cfg.background_video);
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(RngSeed::Fixed(7).resolve(), 7);
        assert_eq!("AUTO".parse::<RngSeed>(), Ok(RngSeed::Auto));
    }

    #[test]
    fn written_file_reads_back_identically() {
        let mut cfg = Config::default();
        cfg.song_id = "warmup".into();
        cfg.beatmap_dir = PathBuf::from("maps/custom");
        cfg.rng_seed = RngSeed::Fixed(3);
        cfg.log_level = LogLevel::Trace;
        let conf = ini(&cfg.to_ini_string());
        for (sec, key) in ALL_KEYS {
            assert!(conf.get(sec, key).is_some(), "{sec}/{key} not written");
        }
        assert_eq!(Config::from_ini(&conf), cfg);
    }
}
