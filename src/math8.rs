//! 8-bit fixed point helpers in the `FastLED` tradition.

use embassy_time::Instant;

/// Scale an 8-bit value by a factor (0-255 = 0.0-1.0)
///
/// Uses integer math for efficiency on embedded systems.
#[inline]
#[allow(clippy::cast_lossless, clippy::cast_possible_truncation)]
pub const fn scale8(value: u8, scale: u8) -> u8 {
    ((value as u16 * (1 + scale as u16)) >> 8) as u8
}

/// Blend two 8-bit values
#[inline]
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
pub const fn blend8(a: u8, b: u8, amount_of_b: u8) -> u8 {
    let delta = b as i16 - a as i16;

    let mut partial: u32 = (a as u32) << 16; // a * 65536
    partial = partial.wrapping_add(
        (delta as u32)
            .wrapping_mul(amount_of_b as u32)
            .wrapping_mul(257),
    ); // (b - a) * amount_of_b * 257
    partial = partial.wrapping_add(0x8000); // + 32768 for rounding

    (partial >> 16) as u8
}

/// Sine approximation on the 0-255 circle, output centered on 128
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn sin8(theta: u8) -> u8 {
    let radians = f32::from(theta) * (2.0 * core::f32::consts::PI / 256.0);
    let value = libm::roundf((libm::sinf(radians) + 1.0) * 127.5);
    value.clamp(0.0, 255.0) as u8
}

/// Sawtooth wave advancing `bpm` times per minute, 0-255
#[allow(clippy::cast_possible_truncation)]
pub const fn beat8(bpm: u8, now: Instant) -> u8 {
    ((now.as_millis() * bpm as u64 * 256 / 60_000) & 0xFF) as u8
}

/// Sine wave oscillating between `low` and `high` at `bpm` beats per minute
pub fn beatsin8(bpm: u8, low: u8, high: u8, now: Instant) -> u8 {
    let (low, high) = if low <= high { (low, high) } else { (high, low) };
    let beat = sin8(beat8(bpm, now));
    low + scale8(beat, high - low)
}
