//! Services the engine needs from the surrounding firmware.

use crate::config::SettingKey;

/// Network, storage and system services
///
/// Implemented by the firmware on top of its MQTT client, flash storage and
/// watchdog. All calls are made from the render tick and must not block for
/// long; anything slow belongs in the platform's own tasks.
pub trait Platform {
    /// Publish a payload on a message bus topic
    fn publish(&mut self, topic: &str, payload: &[u8]);

    fn subscribe(&mut self, topic: &str);

    fn unsubscribe(&mut self, topic: &str);

    /// Store a setting value (`{"<param>": "<value>"}` in the setting's file)
    fn persist(&mut self, key: SettingKey, value: &str);

    fn reboot(&mut self);

    /// Start an over-the-air update of `size` bytes, `false` if refused
    fn begin_firmware_update(&mut self, size: u32) -> bool;

    /// Keep the hardware watchdog from resetting the device
    fn feed_watchdog(&mut self);

    /// Whether the message bus connection is up
    fn is_connected(&self) -> bool {
        true
    }

    /// Ask the network layer to reconnect, must return immediately
    fn request_reconnect(&mut self) {}

    /// Move the strip data line to another pin
    fn set_gpio(&mut self, _gpio: u8) {}

    /// Reconfigure the serial link
    fn set_baud_rate(&mut self, _bits_per_second: u32) {}

    /// Write status text to the serial link
    fn write_serial(&mut self, _bytes: &[u8]) {}
}
