mod gradient;
mod palette;
mod utils;

pub use gradient::fill_rainbow;
pub use palette::{OCEAN_COLORS, PARTY_COLORS, PALETTE_SIZE, Palette16};
use smart_leds::{RGB8, hsv::Hsv as HSV};
pub use utils::{BLACK, blend_colors, hsv2rgb, rgb_from_u32, scale_color};

pub type Rgb = RGB8;
pub type Hsv = HSV;
