//! Frame pacing and housekeeping around the renderer.
//!
//! Provides portable frame pacing without async/await or platform-specific timers.
//! The caller is responsible for sleeping/waiting between frames.

use embassy_time::{Duration, Instant};
use log::{info, warn};

use crate::config::EngineTimings;
use crate::effect::EffectMode;
use crate::platform::Platform;
use crate::renderer::Renderer;
use crate::OutputDriver;

/// Result of a frame tick operation.
#[derive(Debug, Clone, Copy)]
pub struct FrameResult {
    /// The deadline for the next frame.
    pub next_deadline: Instant,
    /// How long to wait until the next frame (may be zero if behind schedule).
    pub sleep_duration: Duration,
}

/// Frames per second over fixed reporting windows
#[derive(Debug, Clone)]
pub struct FramerateCounter {
    interval: Duration,
    window_start: Option<Instant>,
    renders: u32,
    stream_frames: u32,
}

impl FramerateCounter {
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            window_start: None,
            renders: 0,
            stream_frames: 0,
        }
    }

    /// Count one rendered frame, returns the framerate when a window closes
    ///
    /// `stream_frames` is the running total of committed stream frames. When
    /// `streaming`, the report counts those instead of rendered frames.
    #[allow(clippy::cast_possible_truncation)]
    pub fn record(&mut self, now: Instant, stream_frames: u32, streaming: bool) -> Option<u32> {
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            self.renders = 0;
            self.stream_frames = stream_frames;
            return None;
        };
        self.renders = self.renders.saturating_add(1);

        let elapsed = now.saturating_duration_since(start);
        if elapsed < self.interval || elapsed.as_millis() == 0 {
            return None;
        }

        let count = if streaming {
            stream_frames.wrapping_sub(self.stream_frames)
        } else {
            self.renders
        };
        let elapsed_ms = elapsed.as_millis();
        let fps = (u64::from(count) * 1000 + elapsed_ms / 2) / elapsed_ms;

        self.window_start = Some(now);
        self.renders = 0;
        self.stream_frames = stream_frames;
        Some(fps.min(u64::from(u32::MAX)) as u32)
    }
}

/// Portable render loop that manages timing without async.
///
/// Every tick:
/// - Feeds the watchdog and reports stalls
/// - Throttles reconnect requests while the bus is down
/// - Switches the strip off after the configured silence
/// - Renders and writes the frame
/// - Publishes framerate telemetry, echoed on the serial link in `GlowWorm`
///
/// # Usage
///
/// ```ignore
/// let mut render_loop = RenderLoop::new(renderer, driver, platform, timings);
///
/// loop {
///     let now = get_current_time_ms();
///     let result = render_loop.tick(Instant::from_millis(now));
///
///     // Platform-specific sleep
///     sleep_ms(result.sleep_duration.as_millis() as u64);
/// }
/// ```
pub struct RenderLoop<'a, O, P, const MAX_LEDS: usize, const QUEUE_SIZE: usize>
where
    O: OutputDriver,
    P: Platform,
{
    output: O,
    platform: P,
    renderer: Renderer<'a, MAX_LEDS, QUEUE_SIZE>,
    timings: EngineTimings,
    next_frame: Instant,
    started: Option<Instant>,
    last_tick: Option<Instant>,
    last_reconnect: Option<Instant>,
    framerate: FramerateCounter,
}

impl<'a, O, P, const MAX_LEDS: usize, const QUEUE_SIZE: usize> RenderLoop<'a, O, P, MAX_LEDS, QUEUE_SIZE>
where
    O: OutputDriver,
    P: Platform,
{
    pub fn new(
        renderer: Renderer<'a, MAX_LEDS, QUEUE_SIZE>,
        driver: O,
        platform: P,
        timings: EngineTimings,
    ) -> Self {
        Self {
            output: driver,
            platform,
            renderer,
            timings,
            next_frame: Instant::from_millis(0),
            started: None,
            last_tick: None,
            last_reconnect: None,
            framerate: FramerateCounter::new(timings.telemetry_interval),
        }
    }

    /// Process one frame and return timing information.
    ///
    /// The caller is responsible for waiting until `next_deadline` before
    /// calling `tick` again.
    pub fn tick(&mut self, now: Instant) -> FrameResult {
        let started = *self.started.get_or_insert(now);

        self.platform.feed_watchdog();
        self.check_stall(now);
        self.check_connection(now);
        self.check_off_timer(now, started);

        // Skip the backlog after long stalls instead of catching up
        let max_drift = self.timings.frame_interval.as_millis() * 2;
        if now.as_millis() > self.next_frame.as_millis() + max_drift {
            self.next_frame = now;
        }

        let frame = self.renderer.render(now, &mut self.platform);
        self.output.write(frame);

        let streaming = self.renderer.is_streaming();
        if let Some(fps) = self
            .framerate
            .record(now, self.renderer.stream_frames(), streaming)
        {
            self.renderer.publish_framerate(fps, &mut self.platform);
            if self.renderer.state().mode() == EffectMode::GlowWorm {
                self.renderer.send_serial_info(fps, &mut self.platform);
            }
        }

        self.next_frame += self.timings.frame_interval;

        let sleep_duration = if self.next_frame.as_millis() > now.as_millis() {
            Duration::from_millis(self.next_frame.as_millis() - now.as_millis())
        } else {
            Duration::from_millis(0)
        };

        FrameResult {
            next_deadline: self.next_frame,
            sleep_duration,
        }
    }

    fn check_stall(&mut self, now: Instant) {
        if let Some(last) = self.last_tick.replace(now) {
            let gap = now.saturating_duration_since(last);
            if gap >= self.timings.stall_threshold {
                warn!("render loop stalled for {} ms", gap.as_millis());
            }
        }
    }

    fn check_connection(&mut self, now: Instant) {
        if self.platform.is_connected() {
            return;
        }
        let due = self
            .last_reconnect
            .is_none_or(|last| now.saturating_duration_since(last) >= self.timings.reconnect_interval);
        if due {
            info!("message bus down, requesting reconnect");
            self.last_reconnect = Some(now);
            self.platform.request_reconnect();
        }
    }

    fn check_off_timer(&mut self, now: Instant, started: Instant) {
        let Some(timeout) = self.timings.off_timeout else {
            return;
        };
        if !self.renderer.is_on() {
            return;
        }
        let last = self.renderer.last_traffic().unwrap_or(started);
        if now.saturating_duration_since(last) >= timeout {
            self.renderer.power_off(&mut self.platform);
        }
    }

    /// Get a reference to the renderer.
    pub fn renderer(&self) -> &Renderer<'a, MAX_LEDS, QUEUE_SIZE> {
        &self.renderer
    }

    /// Get a mutable reference to the renderer.
    pub fn renderer_mut(&mut self) -> &mut Renderer<'a, MAX_LEDS, QUEUE_SIZE> {
        &mut self.renderer
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn output(&self) -> &O {
        &self.output
    }
}
