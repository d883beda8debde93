//! Time management utilities

use std::time::{Duration, Instant};

/// Length of the window the displayed frame rate is averaged over
const FPS_WINDOW: f32 = 1.0;

/// Frame timer feeding the camera's delta time and the overlay's FPS read-out
///
/// The timer can be driven by the wall clock through [`FrameTimer::update`]
/// or by a fixed step through [`FrameTimer::advance`], which the headless
/// viewer uses for reproducible runs.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
    window_time: f32,
    window_frames: u32,
    fps: f32,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
            window_time: 0.0,
            window_frames: 0,
            fps: 0.0,
        }
    }

    /// Update the timer from the wall clock (call once per frame)
    pub fn update(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.advance(elapsed);
    }

    /// Advance the timer by a fixed amount instead of reading the clock
    pub fn advance(&mut self, elapsed: Duration) {
        self.delta_time = elapsed.as_secs_f32();
        self.total_time += self.delta_time;
        self.frame_count += 1;

        self.window_time += self.delta_time;
        self.window_frames += 1;
        if self.window_time >= FPS_WINDOW {
            self.fps = self.window_frames as f32 / self.window_time;
            self.window_time = 0.0;
            self.window_frames = 0;
        }
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Frame rate averaged over the last completed one-second window
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Milliseconds per frame matching [`FrameTimer::fps`]
    pub fn frame_time_ms(&self) -> f32 {
        if self.fps > 0.0 {
            1000.0 / self.fps
        } else {
            0.0
        }
    }

    /// Get the average FPS since timer creation
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame_count as f32 / self.total_time
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn fps_is_published_after_a_full_window() {
        let mut timer = FrameTimer::new();

        for _ in 0..59 {
            timer.advance(Duration::from_millis(16));
        }
        assert_eq!(timer.fps(), 0.0);

        for _ in 0..10 {
            timer.advance(Duration::from_millis(16));
        }
        assert!(timer.fps() > 60.0 && timer.fps() < 64.0);
        assert_relative_eq!(timer.delta_time(), 0.016, epsilon = 1e-6);
        assert_eq!(timer.frame_count(), 69);
    }

    #[test]
    fn fresh_timer_reports_zero_rates() {
        let timer = FrameTimer::new();

        assert_eq!(timer.fps(), 0.0);
        assert_eq!(timer.frame_time_ms(), 0.0);
        assert_eq!(timer.average_fps(), 0.0);
    }
}
