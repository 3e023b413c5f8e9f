//! Target / displayed color with step fades and the flash overlay.

use embassy_time::{Duration, Instant};
use log::debug;

use crate::color::{BLACK, Rgb};

/// Period of one flash on/off cycle
pub const FLASH_PERIOD: Duration = Duration::from_millis(1000);

/// Visible part of each flash period
pub const FLASH_VISIBLE: Duration = Duration::from_millis(500);

/// Number of ticks a fade of `transition` takes at `frame_interval`
///
/// Rounds up, so the fade always fits in the transition budget at one step
/// per frame. Zero means the color applies instantly.
#[allow(clippy::cast_possible_truncation)]
pub const fn fade_steps(transition: Duration, frame_interval: Duration) -> u16 {
    let frame_ms = frame_interval.as_millis();
    let transition_ms = transition.as_millis();
    if frame_ms == 0 || transition_ms == 0 {
        return 0;
    }
    let steps = transition_ms.div_ceil(frame_ms);
    if steps > u16::MAX as u64 {
        u16::MAX
    } else {
        steps as u16
    }
}

/// Temporary blinking overlay
#[derive(Debug, Clone, Copy)]
struct FlashState {
    color: Rgb,
    length: Duration,
    start: Instant,
    on_before: bool,
    visible: bool,
}

/// Color state driven by control commands
///
/// `color` and `brightness` are the authoritative target values. `real` is the
/// color currently displayed and converges toward the fade destination one
/// step per tick.
#[derive(Debug, Clone)]
pub struct ColorState {
    color: Rgb,
    brightness: u8,
    on: bool,
    real: Rgb,
    fade_steps: u16,
    remaining_steps: u16,
    flash: Option<FlashState>,
}

impl ColorState {
    /// Create a settled state, already displaying its destination
    pub const fn new(color: Rgb, brightness: u8, on: bool, fade_steps: u16) -> Self {
        Self {
            color,
            brightness,
            on,
            real: if on { color } else { BLACK },
            fade_steps,
            remaining_steps: 0,
            flash: None,
        }
    }

    /// Target color
    pub const fn color(&self) -> Rgb {
        self.color
    }

    /// Interpolated color
    pub const fn real(&self) -> Rgb {
        self.real
    }

    pub const fn brightness(&self) -> u8 {
        self.brightness
    }

    pub const fn is_on(&self) -> bool {
        self.on
    }

    pub const fn in_fade(&self) -> bool {
        self.remaining_steps > 0
    }

    pub const fn is_flashing(&self) -> bool {
        self.flash.is_some()
    }

    /// Color the fade is heading to
    pub const fn destination(&self) -> Rgb {
        if self.on { self.color } else { BLACK }
    }

    /// Color to display this tick
    pub const fn output(&self) -> Rgb {
        match self.flash {
            Some(FlashState { visible: true, color, .. }) => color,
            Some(_) => BLACK,
            None => self.real,
        }
    }

    /// Change the number of ticks used by the following fades
    pub fn set_fade_steps(&mut self, steps: u16) {
        self.fade_steps = steps;
    }

    /// Set the target color
    ///
    /// Cancels a flash. A running fade is abandoned and a new one starts from
    /// the current real color.
    pub fn set_color(&mut self, color: Rgb) {
        self.cancel_flash();
        self.color = color;
        self.begin_fade();
    }

    /// Switch the light on or off, fading toward the new destination
    pub fn set_power(&mut self, on: bool) {
        self.cancel_flash();
        self.on = on;
        self.begin_fade();
    }

    pub fn set_brightness(&mut self, brightness: u8) {
        self.brightness = brightness;
    }

    fn begin_fade(&mut self) {
        let destination = self.destination();
        if self.fade_steps == 0 || self.real == destination {
            self.real = destination;
            self.remaining_steps = 0;
        } else {
            self.remaining_steps = self.fade_steps;
        }
    }

    /// Drop the running fade and display its destination right away
    pub fn cancel_fade(&mut self) {
        self.real = self.destination();
        self.remaining_steps = 0;
    }

    /// Move the real color one step toward the destination
    ///
    /// Returns `true` while the fade is still running.
    pub fn advance_fade(&mut self) -> bool {
        if self.remaining_steps == 0 {
            return false;
        }
        let destination = self.destination();
        let remaining = self.remaining_steps;
        self.real.r = step_toward(self.real.r, destination.r, remaining);
        self.real.g = step_toward(self.real.g, destination.g, remaining);
        self.real.b = step_toward(self.real.b, destination.b, remaining);
        self.remaining_steps -= 1;

        if self.real == destination {
            self.remaining_steps = 0;
        }
        self.remaining_steps > 0
    }

    /// Start blinking `color` for `length`
    pub fn start_flash(&mut self, color: Rgb, length: Duration, now: Instant) {
        let on_before = match self.flash {
            Some(flash) => flash.on_before,
            None => self.on,
        };
        debug!("flash started for {} ms", length.as_millis());
        self.on = true;
        self.flash = Some(FlashState {
            color,
            length,
            start: now,
            on_before,
            visible: true,
        });
    }

    /// Stop the flash and restore the state it interrupted
    pub fn cancel_flash(&mut self) {
        if let Some(flash) = self.flash.take() {
            self.on = flash.on_before;
            self.real = self.destination();
            self.remaining_steps = 0;
        }
    }

    /// Advance the flash overlay and the fade by one tick
    pub fn tick(&mut self, now: Instant) {
        if let Some(flash) = self.flash.as_mut() {
            let elapsed = now.saturating_duration_since(flash.start);
            if elapsed > flash.length {
                debug!("flash finished");
                self.cancel_flash();
            } else {
                let phase = elapsed.as_millis() % FLASH_PERIOD.as_millis();
                flash.visible = phase <= FLASH_VISIBLE.as_millis();
            }
        }
        self.advance_fade();
    }
}

/// One fade step: `ceil(|to - from| / remaining)`, never past `to`
#[allow(clippy::cast_possible_truncation)]
fn step_toward(from: u8, to: u8, remaining: u16) -> u8 {
    let distance = u16::from(from.abs_diff(to));
    let step = distance.div_ceil(remaining.max(1)).min(distance) as u8;
    if from < to { from + step } else { from - step }
}
