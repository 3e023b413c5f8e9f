use smart_leds::hsv::hsv2rgb;

use crate::color::{Hsv, Rgb};

/// Saturation used by the rainbow fill
const RAINBOW_SATURATION: u8 = 240;

/// Fill the strip with a hue gradient starting at `initial_hue`
///
/// Each following pixel shifts the hue by `delta_hue` on the 0-255 circle.
pub fn fill_rainbow(leds: &mut [Rgb], initial_hue: u8, delta_hue: u8) {
    let mut hue = initial_hue;
    for led in leds {
        *led = hsv2rgb(Hsv {
            hue,
            sat: RAINBOW_SATURATION,
            val: 255,
        });
        hue = hue.wrapping_add(delta_hue);
    }
}
