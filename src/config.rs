//! Device settings and engine configuration
//!
//! Settings are single scalars persisted by the platform, one small JSON file
//! per setting. The engine only reads them at startup through
//! [`SettingsStore`] and writes changes back through
//! [`Platform::persist`](crate::Platform::persist).

use core::fmt::Write;
use core::str::FromStr;

use embassy_time::Duration;
use heapless::String;
use log::warn;

use crate::color::Rgb;
use crate::effect::EffectMode;
use crate::error::CommandError;

/// Firmware version reported in the capability report
pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// LED ceiling of the reference hardware
pub const DEFAULT_MAX_LEDS: usize = 511;

pub const DEFAULT_GPIO: u8 = 5;
pub const DEFAULT_TOPIC: &str = "glowwormluciferin";
pub const DEFAULT_DEVICE_NAME: &str = "GlowWorm";

/// Capacity of topic base names
pub const TOPIC_NAME_LEN: usize = 32;

/// Capacity of a setting value rendered as text
pub const SETTING_VALUE_LEN: usize = 32;

pub type TopicName = String<TOPIC_NAME_LEN>;
pub type SettingValue = String<SETTING_VALUE_LEN>;

/// Default target frame rate (60 FPS).
pub const DEFAULT_FPS: u64 = 60;

/// Default frame duration based on target FPS.
pub const DEFAULT_FRAME_DURATION: Duration = Duration::from_millis(1000 / DEFAULT_FPS);

/// Serial baud rates selectable by index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum BaudRate {
    B230400 = 1,
    B460800 = 2,
    #[default]
    B500000 = 3,
    B921600 = 4,
    B1000000 = 5,
    B1500000 = 6,
    B2000000 = 7,
}

impl BaudRate {
    pub const fn from_index(index: u8) -> Option<Self> {
        Some(match index {
            1 => Self::B230400,
            2 => Self::B460800,
            3 => Self::B500000,
            4 => Self::B921600,
            5 => Self::B1000000,
            6 => Self::B1500000,
            7 => Self::B2000000,
            _ => return None,
        })
    }

    pub const fn index(self) -> u8 {
        self as u8
    }

    pub const fn bits_per_second(self) -> u32 {
        match self {
            Self::B230400 => 230_400,
            Self::B460800 => 460_800,
            Self::B500000 => 500_000,
            Self::B921600 => 921_600,
            Self::B1000000 => 1_000_000,
            Self::B1500000 => 1_500_000,
            Self::B2000000 => 2_000_000,
        }
    }
}

/// Persisted settings, each stored as `{"<param>": "<value>"}` in its own file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    LedCount,
    Gpio,
    Topic,
    BaudRate,
    Effect,
}

impl SettingKey {
    pub const ALL: [SettingKey; 5] = [
        SettingKey::LedCount,
        SettingKey::Gpio,
        SettingKey::Topic,
        SettingKey::BaudRate,
        SettingKey::Effect,
    ];

    pub const fn file_name(self) -> &'static str {
        match self {
            Self::LedCount => "led_number.json",
            Self::Gpio => "gpio.json",
            Self::Topic => "topic.json",
            Self::BaudRate => "baudrate.json",
            Self::Effect => "effect.json",
        }
    }

    pub const fn param(self) -> &'static str {
        match self {
            Self::LedCount => "lednum",
            Self::Gpio => "gpio",
            Self::Topic => "mqttopic",
            Self::BaudRate => "baudrate",
            Self::Effect => "effect",
        }
    }
}

/// Read access to persisted settings
pub trait SettingsStore {
    /// Raw value stored for `key`, if any
    fn read(&mut self, key: SettingKey) -> Option<SettingValue>;
}

/// Render `{"<param>":"<value>"}`, the document stored in a setting file
pub fn setting_document(key: SettingKey, value: &str) -> Option<String<64>> {
    let mut doc = String::new();
    write!(doc, "{{\"{}\":\"{}\"}}", key.param(), value).ok()?;
    Some(doc)
}

/// Settings owned by the device, persisted across reboots
#[derive(Debug, Clone)]
pub struct DeviceSettings {
    pub led_count: u16,
    pub gpio: u8,
    pub baud_rate: BaudRate,
    pub topic: TopicName,
    pub effect: EffectMode,
    pub device_name: TopicName,
    pub mac: String<18>,
}

impl DeviceSettings {
    /// Defaults for a strip of `led_count` LEDs
    pub fn new(led_count: u16) -> Self {
        Self {
            led_count: led_count.max(1),
            gpio: DEFAULT_GPIO,
            baud_rate: BaudRate::default(),
            topic: String::from_str(DEFAULT_TOPIC).unwrap_or_default(),
            effect: EffectMode::default(),
            device_name: String::from_str(DEFAULT_DEVICE_NAME).unwrap_or_default(),
            mac: String::new(),
        }
    }

    /// Load every setting from `store`, keeping the current value for
    /// missing or unreadable entries
    pub fn load(mut self, store: &mut impl SettingsStore, max_leds: usize) -> Self {
        for key in SettingKey::ALL {
            let Some(raw) = store.read(key) else {
                continue;
            };
            if let Err(err) = self.apply_raw(key, raw.as_str(), max_leds) {
                warn!("stored {} ignored: {}", key.file_name(), err);
            }
        }
        self
    }

    /// Parse and apply a textual setting value
    pub fn apply_raw(&mut self, key: SettingKey, raw: &str, max_leds: usize) -> Result<(), CommandError> {
        let raw = raw.trim();
        match key {
            SettingKey::LedCount => {
                let count = raw.parse::<u16>().map_err(|_| CommandError::InvalidSetting)?;
                self.set_led_count(count, max_leds);
            }
            SettingKey::Gpio => {
                self.gpio = raw.parse().map_err(|_| CommandError::InvalidSetting)?;
            }
            SettingKey::Topic => self.set_topic(raw)?,
            SettingKey::BaudRate => {
                let index = raw.parse().map_err(|_| CommandError::InvalidSetting)?;
                self.baud_rate = BaudRate::from_index(index).ok_or(CommandError::InvalidSetting)?;
            }
            SettingKey::Effect => {
                self.effect = raw
                    .parse::<u8>()
                    .ok()
                    .and_then(EffectMode::from_raw)
                    .or_else(|| EffectMode::parse_from_str(raw))
                    .ok_or(CommandError::UnknownEffect)?;
            }
        }
        Ok(())
    }

    /// Render the current value of `key` as stored text, `None` if it does not fit
    pub fn raw_value(&self, key: SettingKey) -> Option<SettingValue> {
        let mut value = SettingValue::new();
        let written = match key {
            SettingKey::LedCount => write!(value, "{}", self.led_count),
            SettingKey::Gpio => write!(value, "{}", self.gpio),
            SettingKey::Topic => write!(value, "{}", self.topic),
            SettingKey::BaudRate => write!(value, "{}", self.baud_rate.index()),
            SettingKey::Effect => write!(value, "{}", self.effect.as_raw()),
        };
        written.ok().map(|()| value)
    }

    /// Set the LED count clamped to `[1, max_leds]`, returns the applied value
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_led_count(&mut self, count: u16, max_leds: usize) -> u16 {
        let max = max_leds.min(usize::from(u16::MAX)) as u16;
        self.led_count = count.clamp(1, max.max(1));
        self.led_count
    }

    pub fn set_topic(&mut self, topic: &str) -> Result<(), CommandError> {
        if topic.is_empty() || topic.contains(['/', '#', '+']) {
            return Err(CommandError::InvalidSetting);
        }
        self.topic = String::from_str(topic).map_err(|()| CommandError::TopicTooLong)?;
        Ok(())
    }
}

/// What a streaming mode shows once frames stop arriving
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamFallback {
    /// Keep showing the last committed frame
    #[default]
    HoldLastFrame,
    /// Show the solid color from the color state
    Solid,
}

/// Timing configuration of the render loop
#[derive(Debug, Clone, Copy)]
pub struct EngineTimings {
    /// Target interval between frames
    pub frame_interval: Duration,
    /// Default duration of color fades
    pub color_transition: Duration,
    /// Silence after which a streaming mode is considered idle
    pub stream_idle_timeout: Duration,
    /// Silence after which the strip is switched off, disabled when `None`
    pub off_timeout: Option<Duration>,
    /// Interval between framerate reports
    pub telemetry_interval: Duration,
    /// Minimal interval between reconnect requests
    pub reconnect_interval: Duration,
    /// Gap between ticks reported as a stall
    pub stall_threshold: Duration,
}

impl Default for EngineTimings {
    fn default() -> Self {
        Self {
            frame_interval: DEFAULT_FRAME_DURATION,
            color_transition: Duration::from_millis(400),
            stream_idle_timeout: Duration::from_secs(5),
            off_timeout: None,
            telemetry_interval: Duration::from_secs(10),
            reconnect_interval: Duration::from_secs(5),
            stall_threshold: Duration::from_secs(2),
        }
    }
}

/// Configuration for the light engine
#[derive(Debug, Clone)]
pub struct LightEngineConfig {
    pub settings: DeviceSettings,
    pub timings: EngineTimings,
    pub stream_fallback: StreamFallback,
    pub color: Rgb,
    pub brightness: u8,
    pub power: bool,
    /// Seed of the effect randomness
    pub seed: u64,
}

impl LightEngineConfig {
    pub fn new(settings: DeviceSettings) -> Self {
        Self {
            settings,
            timings: EngineTimings::default(),
            stream_fallback: StreamFallback::default(),
            color: Rgb::new(255, 255, 255),
            brightness: 255,
            power: true,
            seed: 0x5eed,
        }
    }
}
