use crate::config::{self, Config, MAX_LENGTH_SECONDS};
use crate::core::capture::FrameReader;
use crate::core::clock::{AudioBeatClock, WallBeatClock};
use crate::core::pose::{Frame, PoseSensingStage};
use crate::core::profiler::{FpsCounter, StepProfiler};
use crate::core::sim::{SimulatedPoseEstimator, SyntheticCamera, SyntheticVideo};
use crate::game::beatmap::BeatmapPattern;
use crate::game::gameplay::GameSession;
use crate::game::judgment::{Hands, MAX_HANDS};

use log::{debug, info, log_enabled, trace, warn};
use std::{error::Error, thread, time::Duration, time::Instant};

/* -------------------- demo collaborators -------------------- */
const SIMULATED_CAMERA_FPS: f32 = 30.0;
const SIMULATED_INFERENCE_LATENCY: Duration = Duration::from_millis(40);
const BACKGROUND_CLIP_FRAMES: u32 = 48;
const BACKGROUND_CLIP_FPS: f32 = 24.0;

/// Latest pixels for the renderer, drawn beneath the `FrameSnapshot` overlay.
#[derive(Default)]
struct RenderLayers {
    background: Option<Frame>,
    /// Mirrored camera frame with the detected hands marked.
    annotated: Option<Frame>,
}

impl RenderLayers {
    fn describe(&self) -> String {
        let dims = |f: &Option<Frame>| {
            f.as_ref()
                .map_or_else(|| "-".to_string(), |img| format!("{}x{}", img.width(), img.height()))
        };
        format!("bg {} | overlay {}", dims(&self.background), dims(&self.annotated))
    }
}

/// Foreground state: the only owner of the game session. Everything produced
/// on other threads is read through mailboxes and never waited on.
struct App {
    session: GameSession,
    clock: WallBeatClock,
    camera: FrameReader,
    background: Option<FrameReader>,
    pose: PoseSensingStage,
    layers: RenderLayers,
    profiler: StepProfiler,
    fps: FpsCounter,
    seen_camera: u64,
    seen_background: u64,
    seen_pose: u64,
    last_frame_time: Instant,
}

impl App {
    fn new(cfg: &Config) -> Result<Self, Box<dyn Error>> {
        let seed = cfg.rng_seed.resolve();
        let pattern = BeatmapPattern::load_or_default(&cfg.beatmap_dir, &cfg.song_id);
        info!(
            "Song '{}': {} slots ({} spawning), {:.1} BPM, seed {seed}.",
            cfg.song_id,
            pattern.len(),
            pattern.spawn_slot_count(),
            cfg.bpm
        );
        let session = GameSession::from_config(cfg, pattern, seed);

        let camera = FrameReader::camera(SyntheticCamera::new(
            cfg.camera_width,
            cfg.camera_height,
            SIMULATED_CAMERA_FPS,
        ))?;
        let background = if cfg.background_video {
            Some(FrameReader::video(SyntheticVideo::new(
                cfg.camera_width,
                cfg.camera_height,
                BACKGROUND_CLIP_FRAMES,
                BACKGROUND_CLIP_FPS,
            ))?)
        } else {
            None
        };
        let pose = PoseSensingStage::spawn(SimulatedPoseEstimator::new(
            *session.arc(),
            cfg.screen_width,
            cfg.screen_height,
            SIMULATED_INFERENCE_LATENCY,
        ))?;

        Ok(Self {
            session,
            clock: WallBeatClock::new(
                cfg.bpm,
                Duration::try_from_secs_f32(cfg.length_seconds)
                    .unwrap_or(Duration::from_secs_f32(MAX_LENGTH_SECONDS)),
            ),
            camera,
            background,
            pose,
            layers: RenderLayers::default(),
            profiler: StepProfiler::new(cfg.show_profiler, cfg.profiler_interval),
            fps: FpsCounter::new(),
            seen_camera: 0,
            seen_background: 0,
            seen_pose: 0,
            last_frame_time: Instant::now(),
        })
    }

    /// Runs one frame. Returns `false` once the song is over and every note
    /// has been judged.
    fn frame(&mut self) -> Result<bool, Box<dyn Error>> {
        let now = Instant::now();
        let delta_time = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;

        self.profiler.start("camera");
        if let Some((version, frame)) = self.camera.newer_than(self.seen_camera) {
            self.seen_camera = version;
            self.pose.submit(frame);
        }

        self.profiler.start("background");
        if let Some((version, frame)) = self
            .background
            .as_ref()
            .and_then(|bg| bg.newer_than(self.seen_background))
        {
            self.seen_background = version;
            self.layers.background = Some(frame);
        }

        self.profiler.start("pose");
        let hands: Hands = match self.pose.fetch_latest() {
            Some(result) => {
                if result.version != self.seen_pose {
                    self.seen_pose = result.version;
                    trace!(
                        "Pose v{} in {:.1} ms: {:?}",
                        result.version,
                        result.processing_time.as_secs_f64() * 1000.0,
                        result.hands
                    );
                    self.layers.annotated = Some(result.frame);
                }
                result.hands
            }
            None => [None; MAX_HANDS],
        };

        self.profiler.start("update");
        self.session.update(delta_time, &self.clock, &hands);

        self.profiler.start("snapshot");
        let snapshot = self.session.snapshot(self.clock.progress());
        if log_enabled!(log::Level::Trace) {
            trace!("{}", serde_json::to_string(&snapshot)?);
        }
        self.profiler.frame_done();

        if let Some(fps) = self.fps.tick(Instant::now()) {
            debug!(
                "{:.1} FPS | camera {} | background {} | pose {} | {} | progress {:.0}%",
                fps,
                self.camera.frames_read(),
                self.background.as_ref().map_or(0, FrameReader::frames_read),
                self.pose.result_version(),
                self.layers.describe(),
                snapshot.progress * 100.0
            );
        }

        Ok(self.clock.is_playing() || !self.session.is_drained())
    }

    fn shutdown(&mut self) {
        self.clock.stop();
        self.pose.stop();
        self.camera.stop();
        if let Some(bg) = self.background.as_mut() {
            bg.stop();
        }
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::get();
    let mut app = App::new(&cfg)?;

    let timeout = Duration::from_millis(cfg.first_frame_timeout_ms);
    if app.camera.wait_for_first_frame(timeout).is_none() {
        warn!("No camera frame within {timeout:?}; playing without hands until one arrives.");
    }
    if let Some(bg) = &app.background
        && bg.wait_for_first_frame(timeout).is_none()
    {
        warn!("Background video unavailable; continuing without it.");
    }

    let frame_budget = Duration::from_secs_f32(1.0 / cfg.target_fps as f32);
    app.clock.start();
    app.last_frame_time = Instant::now();

    let result = loop {
        let frame_start = Instant::now();
        match app.frame() {
            Ok(true) => {}
            Ok(false) => break Ok(()),
            Err(e) => break Err(e),
        }
        let spent = frame_start.elapsed();
        if spent < frame_budget {
            thread::sleep(frame_budget - spent);
        }
    };
    app.shutdown();
    result?;

    let summary = app.session.summary();
    info!(
        "Session finished: {}/{} notes hit, max combo {}, score {}, accuracy {:.1}%.",
        summary.hit, summary.total, summary.max_combo, summary.score, summary.accuracy
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
