//! Stand-ins for the camera, background video and pose model so the game can
//! run (and be tested) without hardware or a neural network.

use crate::core::capture::{FrameSource, SourceRead};
use crate::core::pose::{PoseEstimator, PoseInference};
use crate::game::arc::JudgmentArc;
use crate::game::judgment::Hands;
use glam::Vec2;
use image::imageops;
use image::{Rgb, RgbImage};
use std::f32::consts::TAU;
use std::thread;
use std::time::{Duration, Instant};

const MARKER_HALF_SIZE: u32 = 6;
const MARKER_COLORS: [Rgb<u8>; 2] = [Rgb([255, 64, 64]), Rgb([64, 160, 255])];

/// Live-camera stand-in: a moving gradient delivered at a fixed rate. Like a
/// real device, `read_frame` blocks until the next frame is due.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    interval: Duration,
    next_due: Instant,
    frame_index: u32,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32, fps: f32) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 30.0 };
        Self {
            width: width.max(1),
            height: height.max(1),
            interval: Duration::from_secs_f32(1.0 / fps),
            next_due: Instant::now(),
            frame_index: 0,
        }
    }
}

impl FrameSource for SyntheticCamera {
    fn read_frame(&mut self) -> SourceRead {
        let now = Instant::now();
        if self.next_due > now {
            thread::sleep(self.next_due - now);
        }
        self.next_due = self.next_due.max(now) + self.interval;

        let shift = self.frame_index;
        self.frame_index = self.frame_index.wrapping_add(1);
        let (w, h) = (self.width, self.height);
        SourceRead::Frame(RgbImage::from_fn(w, h, |x, y| {
            let r = (x.wrapping_add(shift.wrapping_mul(4)) % w * 255 / w) as u8;
            let g = (y * 255 / h) as u8;
            Rgb([r, g, 96])
        }))
    }
}

/// Looping background clip made of solid colour frames fading through a palette.
pub struct SyntheticVideo {
    width: u32,
    height: u32,
    frame_count: u32,
    fps: f32,
    position: u32,
}

impl SyntheticVideo {
    pub fn new(width: u32, height: u32, frame_count: u32, fps: f32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            frame_count,
            fps,
            position: 0,
        }
    }
}

impl FrameSource for SyntheticVideo {
    fn read_frame(&mut self) -> SourceRead {
        if self.position >= self.frame_count {
            return SourceRead::Ended;
        }
        let t = self.position as f32 / self.frame_count as f32;
        self.position += 1;
        let shade = |phase: f32| ((0.5 + 0.5 * (TAU * (t + phase)).sin()) * 80.0) as u8;
        SourceRead::Frame(RgbImage::from_pixel(
            self.width,
            self.height,
            Rgb([shade(0.0), shade(1.0 / 3.0), shade(2.0 / 3.0)]),
        ))
    }

    fn rewind(&mut self) -> bool {
        self.position = 0;
        true
    }

    fn nominal_fps(&self) -> Option<f32> {
        Some(self.fps)
    }
}

/// Pretends to be a pose model: mirrors the frame the way a selfie camera
/// preview is shown, waits out a fixed latency, and reports two hands sweeping
/// back and forth along the arc line.
pub struct SimulatedPoseEstimator {
    arc: JudgmentArc,
    screen: (u32, u32),
    latency: Duration,
    /// Radians of sweep advanced per inference.
    sweep_step: f32,
    phase: f32,
}

impl SimulatedPoseEstimator {
    pub fn new(arc: JudgmentArc, screen_width: u32, screen_height: u32, latency: Duration) -> Self {
        Self {
            arc,
            screen: (screen_width.max(1), screen_height.max(1)),
            latency,
            sweep_step: 0.15,
            phase: 0.0,
        }
    }

    /// Hand positions for the current phase: hand A covers the left half of
    /// the arc, hand B the right half, mirrored.
    pub fn hands_at(&self, phase: f32) -> Hands {
        let swing = phase.sin();
        let left = 135.0 + 45.0 * swing;
        let right = 45.0 - 45.0 * swing;
        [Some(self.on_arc(left)), Some(self.on_arc(right))]
    }

    fn on_arc(&self, angle_deg: f32) -> Vec2 {
        let rad = angle_deg.to_radians();
        self.arc.center + Vec2::new(rad.cos(), -rad.sin()) * self.arc.radius
    }

    fn stamp(&self, image: &mut RgbImage, hand: Vec2, color: Rgb<u8>) {
        let (w, h) = image.dimensions();
        let sx = w as f32 / self.screen.0 as f32;
        let sy = h as f32 / self.screen.1 as f32;
        let cx = (hand.x * sx).clamp(0.0, (w - 1) as f32) as u32;
        let cy = (hand.y * sy).clamp(0.0, (h - 1) as f32) as u32;
        let x0 = cx.saturating_sub(MARKER_HALF_SIZE);
        let y0 = cy.saturating_sub(MARKER_HALF_SIZE);
        let x1 = (cx + MARKER_HALF_SIZE).min(w - 1);
        let y1 = (cy + MARKER_HALF_SIZE).min(h - 1);
        for y in y0..=y1 {
            for x in x0..=x1 {
                image.put_pixel(x, y, color);
            }
        }
    }
}

impl PoseEstimator for SimulatedPoseEstimator {
    fn infer(&mut self, frame: &RgbImage) -> PoseInference {
        let mut annotated = imageops::flip_horizontal(frame);
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        let hands = self.hands_at(self.phase);
        self.phase = (self.phase + self.sweep_step) % TAU;

        if annotated.width() > 0 && annotated.height() > 0 {
            for (hand, color) in hands.iter().zip(MARKER_COLORS) {
                if let Some(hand) = hand {
                    self.stamp(&mut annotated, *hand, color);
                }
            }
        }
        PoseInference { annotated, hands }
    }
}
