use crate::core::mailbox::Latest;
use crate::game::judgment::Hands;
use image::RgbImage;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Camera frames are shared by handle; the pixels are never copied between threads.
pub type Frame = Arc<RgbImage>;

/// How long the worker sleeps on the "new frame" signal before re-checking
/// the stop flag.
const FRAME_WAIT_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum SensingError {
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Output of one pose-estimation pass.
#[derive(Clone, Debug)]
pub struct PoseInference {
    /// The input frame with whatever overlay the estimator draws.
    pub annotated: RgbImage,
    pub hands: Hands,
}

/// The (expensive) model that turns an image into hand positions.
pub trait PoseEstimator: Send + 'static {
    fn infer(&mut self, frame: &RgbImage) -> PoseInference;
}

#[derive(Clone, Debug)]
pub struct PoseResult {
    pub frame: Frame,
    pub hands: Hands,
    /// Grows by one per completed inference.
    pub version: u64,
    pub processing_time: Duration,
}

#[derive(Default)]
struct Inbox {
    frame: Option<Frame>,
    fresh: bool,
}

struct Shared {
    inbox: Mutex<Inbox>,
    frame_ready: Condvar,
    results: Latest<PoseResult>,
    stop: AtomicBool,
}

/// Runs a [`PoseEstimator`] on its own thread. The game loop hands it the
/// newest camera frame and reads back whatever result is newest; neither
/// side ever waits for the other.
pub struct PoseSensingStage {
    shared: Arc<Shared>,
    worker: Option<thread::JoinHandle<()>>,
}

impl PoseSensingStage {
    pub fn spawn<E: PoseEstimator>(estimator: E) -> Result<Self, SensingError> {
        let shared = Arc::new(Shared {
            inbox: Mutex::new(Inbox::default()),
            frame_ready: Condvar::new(),
            results: Latest::new(),
            stop: AtomicBool::new(false),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("pose-worker".into())
            .spawn(move || worker_loop(&worker_shared, estimator))
            .map_err(|source| SensingError::Spawn {
                name: "pose-worker",
                source,
            })?;
        info!("Pose sensing worker started.");
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Offers a frame to the worker, replacing any frame it has not picked up yet.
    pub fn submit(&self, frame: Frame) {
        {
            let mut inbox = self
                .shared
                .inbox
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            inbox.frame = Some(frame);
            inbox.fresh = true;
        }
        self.shared.frame_ready.notify_one();
    }

    /// Most recently completed result, or `None` before the first one. May
    /// return the same result on consecutive calls.
    pub fn fetch_latest(&self) -> Option<PoseResult> {
        self.shared.results.latest().map(|(_, r)| r)
    }

    /// Version of the newest published result; 0 before the first.
    pub fn result_version(&self) -> u64 {
        self.shared.results.version()
    }

    /// Signals the worker and waits for it to exit.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        {
            let _inbox = self
                .shared
                .inbox
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            self.shared.stop.store(true, Ordering::Release);
        }
        self.shared.frame_ready.notify_all();
        if worker.join().is_err() {
            warn!("Pose sensing worker panicked.");
        }
    }
}

impl Drop for PoseSensingStage {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop<E: PoseEstimator>(shared: &Shared, mut estimator: E) {
    let mut version = 0u64;
    let mut total_time = Duration::ZERO;
    loop {
        let frame = {
            let inbox = shared.inbox.lock().unwrap_or_else(PoisonError::into_inner);
            let (mut inbox, _) = shared
                .frame_ready
                .wait_timeout_while(inbox, FRAME_WAIT_TIMEOUT, |i| {
                    !i.fresh && !shared.stop.load(Ordering::Acquire)
                })
                .unwrap_or_else(PoisonError::into_inner);
            if shared.stop.load(Ordering::Acquire) {
                break;
            }
            if !inbox.fresh {
                continue;
            }
            inbox.fresh = false;
            inbox.frame.clone()
        };
        let Some(frame) = frame else {
            continue;
        };

        let started = Instant::now();
        let PoseInference { annotated, hands } = estimator.infer(&frame);
        let processing_time = started.elapsed();
        total_time += processing_time;

        version += 1;
        shared.results.publish(PoseResult {
            frame: Arc::new(annotated),
            hands,
            version,
            processing_time,
        });
        if version % 100 == 0 {
            debug!(
                "Pose worker: {} results, {:.1} ms average.",
                version,
                total_time.as_secs_f64() * 1000.0 / version as f64
            );
        }
    }
    info!("Pose sensing worker stopped after {version} results.");
}
