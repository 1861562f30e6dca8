use crate::core::mailbox::Latest;
use crate::core::pose::{Frame, SensingError};
use image::RgbImage;
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

pub const DEFAULT_VIDEO_FPS: f32 = 30.0;
const MAX_VIDEO_FPS: f32 = 120.0;
/// Back-off when a live source has nothing ready.
const IDLE_BACKOFF: Duration = Duration::from_millis(5);
/// Longest uninterrupted sleep while pacing, so stop requests are seen quickly.
const MAX_SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Result of asking a source for its next frame.
#[derive(Debug)]
pub enum SourceRead {
    Frame(RgbImage),
    /// Nothing ready right now; try again.
    Pending,
    /// End of stream.
    Ended,
}

/// Something that yields images: a camera device or a decoded video file.
pub trait FrameSource: Send + 'static {
    fn read_frame(&mut self) -> SourceRead;

    /// Seeks back to the first frame. Sources that cannot rewind return `false`.
    fn rewind(&mut self) -> bool {
        false
    }

    /// Frame rate the source was authored at, if it has one.
    fn nominal_fps(&self) -> Option<f32> {
        None
    }

    /// Frees the underlying device or file.
    fn release(&mut self) {}
}

/// Falls back to 30 FPS for missing or implausible rates.
pub fn sanitize_fps(fps: Option<f32>) -> f32 {
    match fps {
        Some(f) if f.is_finite() && f > 0.0 && f <= MAX_VIDEO_FPS => f,
        _ => DEFAULT_VIDEO_FPS,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Pacing {
    /// The source blocks until a frame exists.
    Live,
    /// Frames are released at this rate and the stream loops.
    Looping(f32),
}

/// Background thread that keeps the newest frame of a [`FrameSource`] in a
/// single-slot mailbox.
pub struct FrameReader {
    name: &'static str,
    frames: Arc<Latest<Frame>>,
    stop_signal: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl FrameReader {
    /// Starts an unpaced reader for a live camera.
    pub fn camera<S: FrameSource>(source: S) -> Result<Self, SensingError> {
        Self::start("camera-reader", source, Pacing::Live, None)
    }

    /// Starts a looping, paced reader for a background video. The first frame
    /// is read before the thread is spawned; if that fails the reader stays
    /// idle and never reports a frame.
    pub fn video<S: FrameSource>(mut source: S) -> Result<Self, SensingError> {
        let name = "video-reader";
        let fps = sanitize_fps(source.nominal_fps());
        if source.nominal_fps() != Some(fps) {
            warn!(
                "Background video reports {:?} FPS; pacing at {DEFAULT_VIDEO_FPS}.",
                source.nominal_fps()
            );
        }
        let SourceRead::Frame(first) = source.read_frame() else {
            warn!("Background video produced no first frame; not starting {name}.");
            source.release();
            return Ok(Self::idle(name));
        };
        Self::start(name, source, Pacing::Looping(fps), Some(first))
    }

    fn idle(name: &'static str) -> Self {
        Self {
            name,
            frames: Arc::new(Latest::new()),
            stop_signal: Arc::new(AtomicBool::new(true)),
            thread: None,
        }
    }

    fn start<S: FrameSource>(
        name: &'static str,
        source: S,
        pacing: Pacing,
        first: Option<RgbImage>,
    ) -> Result<Self, SensingError> {
        let frames = Arc::new(Latest::new());
        if let Some(first) = first {
            frames.publish(Arc::new(first));
        }
        let stop_signal = Arc::new(AtomicBool::new(false));
        let frames_clone = Arc::clone(&frames);
        let stop_clone = Arc::clone(&stop_signal);
        let thread = thread::Builder::new()
            .name(name.into())
            .spawn(move || reader_loop(name, source, pacing, &frames_clone, &stop_clone))
            .map_err(|source| SensingError::Spawn { name, source })?;
        info!("Started {name} ({pacing:?}).");
        Ok(Self {
            name,
            frames,
            stop_signal,
            thread: Some(thread),
        })
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Blocks up to `timeout` for the first frame.
    pub fn wait_for_first_frame(&self, timeout: Duration) -> Option<Frame> {
        if self.thread.is_none() && self.frames.version() == 0 {
            return None;
        }
        self.frames.wait_first(timeout).map(|(_, f)| f)
    }

    pub fn latest(&self) -> Option<Frame> {
        self.frames.latest().map(|(_, f)| f)
    }

    /// Newest frame if it was published after version `seen`.
    pub fn newer_than(&self, seen: u64) -> Option<(u64, Frame)> {
        self.frames.newer_than(seen)
    }

    /// Number of frames published so far.
    pub fn frames_read(&self) -> u64 {
        self.frames.version()
    }

    /// Stops the thread, which releases the source on its way out.
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.stop_signal.store(true, Ordering::Relaxed);
        if thread.join().is_err() {
            warn!("{} panicked.", self.name);
        }
    }
}

impl Drop for FrameReader {
    fn drop(&mut self) {
        self.stop();
    }
}

fn reader_loop<S: FrameSource>(
    name: &'static str,
    mut source: S,
    pacing: Pacing,
    frames: &Latest<Frame>,
    stop_signal: &AtomicBool,
) {
    let interval = match pacing {
        Pacing::Live => None,
        Pacing::Looping(fps) => Some(Duration::from_secs_f32(1.0 / fps)),
    };
    let mut next_due = Instant::now();
    let mut rewinds = 0u64;

    while !stop_signal.load(Ordering::Relaxed) {
        if let Some(interval) = interval {
            next_due += interval;
            let now = Instant::now();
            if next_due > now {
                sleep_until(next_due, stop_signal);
            } else {
                // Running behind; don't try to catch up with a burst.
                next_due = now;
            }
        }

        match source.read_frame() {
            SourceRead::Frame(frame) => {
                frames.publish(Arc::new(frame));
            }
            SourceRead::Pending => thread::sleep(IDLE_BACKOFF),
            SourceRead::Ended => match pacing {
                Pacing::Looping(_) if source.rewind() => {
                    rewinds += 1;
                    debug!("{name}: end of stream, rewound ({rewinds} loops).");
                }
                Pacing::Looping(_) => {
                    warn!("{name}: end of stream and the source cannot rewind.");
                    break;
                }
                Pacing::Live => thread::sleep(IDLE_BACKOFF),
            },
        }
    }

    source.release();
    info!("{name} stopped after {} frames.", frames.version());
}

fn sleep_until(deadline: Instant, stop_signal: &AtomicBool) {
    loop {
        let now = Instant::now();
        if now >= deadline || stop_signal.load(Ordering::Relaxed) {
            return;
        }
        thread::sleep((deadline - now).min(MAX_SLEEP_SLICE));
    }
}
