#![no_std]

pub mod channel;
pub mod color;
pub mod color_state;
pub mod command;
pub mod config;
pub mod effect;
pub mod error;
pub mod frame_buffer;
mod handlers;
pub mod math8;
pub mod message;
pub mod platform;
pub mod random;
pub mod render_loop;
pub mod renderer;
pub mod stream;
pub mod topics;

pub use color_state::ColorState;
pub use config::{
    BaudRate, DeviceSettings, EngineTimings, LightEngineConfig, SettingKey, SettingsStore,
    StreamFallback,
};
pub use effect::{EffectEngine, EffectMode, EffectSlot};
pub use error::{CommandError, StreamError};
pub use frame_buffer::FrameBuffer;
pub use message::{Inbound, MessageChannel, MessageReceiver, MessageSender};
pub use platform::Platform;
pub use render_loop::{FrameResult, RenderLoop};
pub use renderer::{EngineState, Renderer};
pub use stream::StreamIngest;
pub use topics::{Route, Topics};

pub use color::{Hsv, Rgb};
pub use embassy_time::{Duration, Instant};

/// Abstract LED driver trait
///
/// Implement this trait to support different hardware platforms.
/// The light engine is generic over this trait.
pub trait OutputDriver {
    /// Write colors to the LED strip
    fn write(&mut self, colors: &[Rgb]);
}

/// Install the serial console logger, level taken from `ESP_LOG`
#[cfg(feature = "esp32-log")]
pub fn init_logger() {
    esp_println::logger::init_logger_from_env();
}
