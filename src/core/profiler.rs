use log::debug;
use smallvec::SmallVec;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
struct StepTotal {
    name: &'static str,
    total: Duration,
    samples: u32,
}

/// Times named steps of the game loop and logs their averages every
/// `interval` frames.
#[derive(Clone, Debug)]
pub struct StepProfiler {
    enabled: bool,
    interval: u32,
    frames: u32,
    current: Option<(&'static str, Instant)>,
    steps: SmallVec<[StepTotal; 8]>,
}

impl StepProfiler {
    pub fn new(enabled: bool, interval: u32) -> Self {
        Self {
            enabled,
            interval: interval.max(1),
            frames: 0,
            current: None,
            steps: SmallVec::new(),
        }
    }

    /// Starts timing `name`, closing any step still open.
    pub fn start(&mut self, name: &'static str) {
        if !self.enabled {
            return;
        }
        self.end();
        self.current = Some((name, Instant::now()));
    }

    pub fn end(&mut self) {
        let Some((name, started)) = self.current.take() else {
            return;
        };
        let elapsed = started.elapsed();
        match self.steps.iter_mut().find(|s| s.name == name) {
            Some(step) => {
                step.total += elapsed;
                step.samples += 1;
            }
            None => self.steps.push(StepTotal {
                name,
                total: elapsed,
                samples: 1,
            }),
        }
    }

    /// Marks the end of a frame. Returns the averaged report when one was due.
    pub fn frame_done(&mut self) -> Option<Vec<(&'static str, Duration)>> {
        if !self.enabled {
            return None;
        }
        self.end();
        self.frames += 1;
        if self.frames < self.interval {
            return None;
        }

        let report = self.averages();
        let total_ms: f64 = report.iter().map(|(_, d)| d.as_secs_f64() * 1000.0).sum();
        debug!("Step timings over the last {} frames:", self.frames);
        for (name, avg) in &report {
            debug!("  {:<12} {:>7.2} ms", name, avg.as_secs_f64() * 1000.0);
        }
        debug!("  {:<12} {:>7.2} ms", "total", total_ms);

        self.frames = 0;
        self.steps.clear();
        Some(report)
    }

    /// Average time per frame spent in each step so far, in first-seen order.
    pub fn averages(&self) -> Vec<(&'static str, Duration)> {
        let frames = self.frames.max(1);
        self.steps.iter().map(|s| (s.name, s.total / frames)).collect()
    }
}

/// Frames per second, recomputed once a second of frames has been counted.
#[derive(Clone, Debug)]
pub struct FpsCounter {
    frame_count: u32,
    window_start: Instant,
    last_fps: f32,
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsCounter {
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            window_start: Instant::now(),
            last_fps: 0.0,
        }
    }

    /// Counts one frame ending at `now`; returns the fresh value when the
    /// window rolls over.
    pub fn tick(&mut self, now: Instant) -> Option<f32> {
        self.frame_count += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed.as_secs_f32() < 1.0 {
            return None;
        }
        self.last_fps = self.frame_count as f32 / elapsed.as_secs_f32();
        self.frame_count = 0;
        self.window_start = now;
        Some(self.last_fps)
    }

    #[inline(always)]
    pub fn fps(&self) -> f32 {
        self.last_fps
    }
}
