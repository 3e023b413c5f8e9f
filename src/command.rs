//! Control and report documents
//!
//! These types match the JSON exchanged with the PC application and the
//! home automation side over the message bus.

use core::fmt;

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::CommandError;

/// Largest report rendered by the engine
pub const REPORT_BUFFER_LEN: usize = 320;

/// Largest serial info block
pub const SERIAL_INFO_LEN: usize = 128;

/// RGB color as sent on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RgbDocument {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl From<RgbDocument> for Rgb {
    fn from(color: RgbDocument) -> Self {
        Rgb::new(color.r, color.g, color.b)
    }
}

impl From<Rgb> for RgbDocument {
    fn from(color: Rgb) -> Self {
        Self {
            r: color.r,
            g: color.g,
            b: color.b,
        }
    }
}

/// Control document received on the `set` topic
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LightCommand<'a> {
    /// Requested state ("ON" or "OFF")
    #[serde(default)]
    pub state: Option<&'a str>,
    #[serde(default)]
    pub color: Option<RgbDocument>,
    #[serde(default)]
    pub brightness: Option<u8>,
    /// Effect wire name
    #[serde(default)]
    pub effect: Option<&'a str>,
    /// Fade duration in seconds
    #[serde(default)]
    pub transition: Option<f32>,
    /// Flash duration in seconds
    #[serde(default)]
    pub flash: Option<f32>,
    /// New topic base name
    #[serde(default, rename = "MQTTopic")]
    pub topic: Option<&'a str>,
    #[serde(default)]
    pub lednum: Option<u16>,
    #[serde(default)]
    pub gpio: Option<u8>,
    /// Baud rate index
    #[serde(default)]
    pub baudrate: Option<u8>,
}

impl LightCommand<'_> {
    /// Requested power state, `None` when absent or not recognised
    pub fn power(&self) -> Option<bool> {
        match self.state {
            Some(state) if state.eq_ignore_ascii_case("on") => Some(true),
            Some(state) if state.eq_ignore_ascii_case("off") => Some(false),
            _ => None,
        }
    }
}

/// Firmware update trigger received on the `update` topic
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct UpdateCommand {
    /// Size of the firmware image in bytes
    #[serde(default)]
    pub update: Option<u32>,
}

/// Capability request received on the `firmwareconfig` topic
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FirmwareConfigRequest<'a> {
    /// Target device; absent means every device
    #[serde(default, rename = "MAC")]
    pub mac: Option<&'a str>,
    #[serde(default)]
    pub gpio: Option<u8>,
    #[serde(default)]
    pub lednum: Option<u16>,
    #[serde(default)]
    pub baudrate: Option<u8>,
}

/// Stream instance swap received on the `unsubscribe` topic
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnsubscribeCommand<'a> {
    /// Device the command is meant for; absent means every device
    #[serde(default)]
    pub manager: Option<&'a str>,
    #[serde(default)]
    pub instance: Option<u8>,
}

/// Reboot command, content is not inspected
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RebootCommand<'a> {
    #[serde(default)]
    pub value: Option<&'a str>,
}

/// Device state published on the light state topic
#[derive(Debug, Clone, Serialize)]
pub struct LightStateReport<'a> {
    pub state: &'a str,
    pub color: RgbDocument,
    pub brightness: u8,
    pub effect: &'a str,
    pub lednum: u16,
}

/// Periodic framerate telemetry
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FramerateReport {
    pub framerate: u32,
}

/// Device capabilities published in reply to a capability request
#[derive(Debug, Clone, Serialize)]
pub struct FirmwareConfigReport<'a> {
    #[serde(rename = "deviceName")]
    pub device_name: &'a str,
    #[serde(rename = "MAC")]
    pub mac: &'a str,
    pub ver: &'a str,
    pub lednum: u16,
    pub gpio: u8,
    pub baudrate: u8,
    pub mqttopic: &'a str,
    pub effect: &'a str,
}

/// Acknowledgement of a firmware update trigger
#[derive(Debug, Clone, Serialize)]
pub struct UpdateResultReport<'a> {
    #[serde(rename = "deviceName")]
    pub device_name: &'a str,
    pub update: &'a str,
}

/// Status lines written back over the serial link while streaming from it
///
/// Rendered as `key:value` lines the PC application reads between frames.
#[derive(Debug, Clone, Copy)]
pub struct SerialInfoReport<'a> {
    pub framerate: u32,
    pub ver: &'a str,
    pub lednum: u16,
    pub gpio: u8,
    pub baudrate: u8,
    pub effect: u8,
}

impl fmt::Display for SerialInfoReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "framerate:{}", self.framerate)?;
        writeln!(f, "ver:{}", self.ver)?;
        writeln!(f, "lednum:{}", self.lednum)?;
        writeln!(f, "gpio:{}", self.gpio)?;
        writeln!(f, "baudrate:{}", self.baudrate)?;
        writeln!(f, "effect:{}", self.effect)
    }
}

/// Parse a JSON document from a payload
pub fn parse<'a, T: Deserialize<'a>>(payload: &'a [u8]) -> Result<T, CommandError> {
    serde_json_core::from_slice::<T>(payload)
        .map(|(value, _)| value)
        .map_err(|_| CommandError::Malformed)
}

/// Render a report into `buffer`, returns the used length
pub fn encode<T: Serialize>(value: &T, buffer: &mut [u8]) -> Result<usize, CommandError> {
    serde_json_core::to_slice(value, buffer).map_err(|_| CommandError::Serialization)
}

/// Convert a duration in seconds to a [`Duration`], negative or NaN is zero
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn seconds_to_duration(seconds: f32) -> Duration {
    let millis = libm::roundf(seconds * 1000.0);
    if millis.is_nan() || millis <= 0.0 {
        return Duration::from_millis(0);
    }
    Duration::from_millis(millis as u64)
}
