//! Message handlers
//!
//! Each inbound message is applied to the [`EngineState`] at the start of a
//! render tick, before the effect is computed.

use core::fmt::Write as _;

use embassy_time::Instant;
use heapless::String;
use log::{debug, info, warn};
use serde::Serialize;

use crate::color_state::fade_steps;
use crate::command::{
    self, FirmwareConfigReport, FirmwareConfigRequest, LightCommand, LightStateReport,
    RebootCommand, RgbDocument, UnsubscribeCommand, UpdateCommand, UpdateResultReport,
    seconds_to_duration,
};
use crate::config::{BaudRate, FIRMWARE_VERSION, SettingKey};
use crate::effect::{EffectMode, StreamSource};
use crate::error::CommandError;
use crate::message::Inbound;
use crate::platform::Platform;
use crate::renderer::EngineState;
use crate::stream::ChunkOutcome;
use crate::topics::{Route, Topics};

/// Render `value` into `buffer` and publish it on `topic`
pub(crate) fn publish<T: Serialize>(
    platform: &mut impl Platform,
    topic: &str,
    value: &T,
    buffer: &mut [u8],
) -> Result<(), CommandError> {
    let len = command::encode(value, buffer)?;
    platform.publish(topic, &buffer[..len]);
    Ok(())
}

impl<const MAX_LEDS: usize> EngineState<MAX_LEDS> {
    /// Apply one inbound message
    pub(crate) fn handle(
        &mut self,
        message: &Inbound,
        now: Instant,
        platform: &mut impl Platform,
    ) -> Result<(), CommandError> {
        let payload = message.payload.as_slice();
        match message.route {
            Route::Set => self.process_json(payload, now, platform),
            Route::Stream => {
                self.process_stream(StreamSource::Network, payload, now, platform);
                Ok(())
            }
            Route::Serial => {
                self.process_stream(StreamSource::Serial, payload, now, platform);
                Ok(())
            }
            Route::Update => self.process_update(payload, platform),
            Route::Unsubscribe => self.process_unsubscribe(payload, platform),
            Route::FirmwareConfig => self.process_firmware_config(payload, platform),
            Route::Reboot => {
                command::parse::<RebootCommand<'_>>(payload)?;
                info!("reboot requested");
                platform.reboot();
                Ok(())
            }
        }
    }

    /// Control document from the `set` topic
    ///
    /// A document carrying a new topic name only swaps topics. Otherwise the
    /// fields apply in order: transition, settings, effect, power, flash or
    /// color, brightness. The resulting state is published back.
    fn process_json(
        &mut self,
        payload: &[u8],
        now: Instant,
        platform: &mut impl Platform,
    ) -> Result<(), CommandError> {
        let command: LightCommand<'_> = command::parse(payload)?;

        if let Some(topic) = command.topic {
            return self.swap_topic(topic, platform);
        }

        if let Some(seconds) = command.transition {
            let steps = fade_steps(seconds_to_duration(seconds), self.timings.frame_interval);
            self.color.set_fade_steps(steps);
        }

        self.apply_settings(command.lednum, command.gpio, command.baudrate, platform);

        if let Some(name) = command.effect {
            match EffectMode::parse_from_str(name) {
                Some(mode) => self.set_effect(mode, now, platform),
                None => warn!("{}: {}", CommandError::UnknownEffect, name),
            }
        }

        if let Some(on) = command.power() {
            self.color.set_power(on);
        }

        let flash = command.flash.map(seconds_to_duration).filter(|length| length.as_ticks() > 0);
        match (flash, command.color) {
            (Some(length), color) => {
                let color = color.map_or(self.color.color(), Into::into);
                self.color.start_flash(color, length, now);
            }
            (None, Some(color)) => self.color.set_color(color.into()),
            (None, None) => {}
        }

        if let Some(brightness) = command.brightness {
            self.color.set_brightness(brightness);
        }

        self.publish_state(platform);
        Ok(())
    }

    fn apply_settings(
        &mut self,
        lednum: Option<u16>,
        gpio: Option<u8>,
        baudrate: Option<u8>,
        platform: &mut impl Platform,
    ) {
        if let Some(count) = lednum {
            self.set_num_led(count, platform);
        }
        if let Some(gpio) = gpio {
            self.set_gpio(gpio, platform);
        }
        if let Some(index) = baudrate {
            if let Err(err) = self.set_baud_rate(index, platform) {
                warn!("baud rate index {} ignored: {}", index, err);
            }
        }
    }

    pub(crate) fn set_num_led(&mut self, count: u16, platform: &mut impl Platform) {
        let applied = self.settings.set_led_count(count, MAX_LEDS);
        if applied != count {
            warn!("led count {} clamped to {}", count, applied);
        }
        self.frame.set_active_len(usize::from(applied));
        self.persist(SettingKey::LedCount, platform);
    }

    pub(crate) fn set_gpio(&mut self, gpio: u8, platform: &mut impl Platform) {
        if gpio == self.settings.gpio {
            return;
        }
        info!("data pin moved from {} to {}", self.settings.gpio, gpio);
        self.settings.gpio = gpio;
        platform.set_gpio(gpio);
        self.persist(SettingKey::Gpio, platform);
    }

    pub(crate) fn set_baud_rate(
        &mut self,
        index: u8,
        platform: &mut impl Platform,
    ) -> Result<(), CommandError> {
        let baud_rate = BaudRate::from_index(index).ok_or(CommandError::InvalidSetting)?;
        if baud_rate != self.settings.baud_rate {
            info!("serial link set to {} baud", baud_rate.bits_per_second());
            self.settings.baud_rate = baud_rate;
            platform.set_baud_rate(baud_rate.bits_per_second());
            self.persist(SettingKey::BaudRate, platform);
        }
        Ok(())
    }

    fn set_effect(&mut self, mode: EffectMode, now: Instant, platform: &mut impl Platform) {
        if mode == self.effects.mode() {
            return;
        }
        info!("effect {} -> {}", self.effects.mode().as_str(), mode.as_str());
        self.effects.set_mode(mode);
        self.color.cancel_flash();
        self.color.cancel_fade();
        self.stream.reset(now);
        self.stream_idle = false;
        self.settings.effect = mode;
        self.persist(SettingKey::Effect, platform);
    }

    /// Move every subscription to the topics of base name `name`
    pub(crate) fn swap_topic(
        &mut self,
        name: &str,
        platform: &mut impl Platform,
    ) -> Result<(), CommandError> {
        let topics = Topics::new(name)?;
        self.settings.set_topic(name)?;

        for topic in self.topics.subscriptions() {
            platform.unsubscribe(topic);
        }
        self.topics = topics;
        for topic in self.topics.subscriptions() {
            platform.subscribe(topic);
        }
        info!("topic base switched to {}", name);
        self.persist(SettingKey::Topic, platform);
        Ok(())
    }

    fn process_update(
        &mut self,
        payload: &[u8],
        platform: &mut impl Platform,
    ) -> Result<(), CommandError> {
        let command: UpdateCommand = command::parse(payload)?;
        let size = command.update.ok_or(CommandError::Malformed)?;
        let accepted = platform.begin_firmware_update(size);
        info!("firmware update of {} bytes {}", size, if accepted { "started" } else { "refused" });

        let report = UpdateResultReport {
            device_name: &self.settings.device_name,
            update: if accepted { "OK" } else { "KO" },
        };
        publish(platform, &self.topics.update_result, &report, &mut self.report_buffer)
    }

    fn process_unsubscribe(
        &mut self,
        payload: &[u8],
        platform: &mut impl Platform,
    ) -> Result<(), CommandError> {
        let command: UnsubscribeCommand<'_> = command::parse(payload)?;
        if command
            .manager
            .is_some_and(|manager| manager != self.settings.device_name.as_str())
        {
            debug!("unsubscribe for another device ignored");
            return Ok(());
        }

        platform.unsubscribe(&self.topics.stream);
        match command.instance {
            Some(instance) if instance > 0 => {
                let mut suffix: String<4> = String::new();
                write!(suffix, "{}", instance).map_err(|_| CommandError::TopicTooLong)?;
                self.topics.set_stream_instance(&suffix)?;
            }
            _ => self.topics.stream = self.topics.base_stream.clone(),
        }
        platform.subscribe(&self.topics.stream);
        info!("stream topic is now {}", self.topics.stream);
        Ok(())
    }

    fn process_firmware_config(
        &mut self,
        payload: &[u8],
        platform: &mut impl Platform,
    ) -> Result<(), CommandError> {
        let request: FirmwareConfigRequest<'_> = command::parse(payload)?;
        if request
            .mac
            .is_some_and(|mac| !mac.eq_ignore_ascii_case(&self.settings.mac))
        {
            debug!("capability request for another device ignored");
            return Ok(());
        }

        self.apply_settings(request.lednum, request.gpio, request.baudrate, platform);

        let settings = &self.settings;
        let report = FirmwareConfigReport {
            device_name: &settings.device_name,
            mac: &settings.mac,
            ver: FIRMWARE_VERSION,
            lednum: settings.led_count,
            gpio: settings.gpio,
            baudrate: settings.baud_rate.index(),
            mqttopic: &settings.topic,
            effect: settings.effect.as_str(),
        };
        publish(platform, &self.topics.light_state, &report, &mut self.report_buffer)
    }

    /// Apply stream data if `source` feeds the active mode
    fn process_stream(
        &mut self,
        source: StreamSource,
        payload: &[u8],
        now: Instant,
        platform: &mut impl Platform,
    ) {
        if self.effects.mode().stream_source() != Some(source) {
            debug!("{:?} stream data ignored in {}", source, self.effects.mode().as_str());
            return;
        }

        let committed = match source {
            StreamSource::Network => {
                match self.stream.ingest_network(payload, &mut self.frame, now) {
                    Ok(ChunkOutcome::Committed { .. }) => true,
                    Ok(ChunkOutcome::Partial { .. }) => false,
                    Err(err) => {
                        warn!("stream chunk dropped: {}", err);
                        false
                    }
                }
            }
            StreamSource::Serial => {
                self.stream.ingest_serial(payload, &mut self.frame, now).committed > 0
            }
        };

        if committed {
            self.sync_led_count(platform);
        }
    }

    /// Follow the strip length announced by the stream
    #[allow(clippy::cast_possible_truncation)]
    fn sync_led_count(&mut self, platform: &mut impl Platform) {
        let active = self.frame.active_len() as u16;
        if active != self.settings.led_count {
            self.settings.led_count = active;
            self.persist(SettingKey::LedCount, platform);
        }
    }

    fn persist(&self, key: SettingKey, platform: &mut impl Platform) {
        match self.settings.raw_value(key) {
            Some(value) => platform.persist(key, &value),
            None => warn!("{} not persisted: value too long", key.file_name()),
        }
    }

    /// Publish the state document on the light state topic
    pub(crate) fn publish_state(&mut self, platform: &mut impl Platform) {
        let report = LightStateReport {
            state: if self.color.is_on() { "ON" } else { "OFF" },
            color: RgbDocument::from(self.color.color()),
            brightness: self.color.brightness(),
            effect: self.effects.mode().as_str(),
            lednum: self.settings.led_count,
        };
        if let Err(err) = publish(platform, &self.topics.light_state, &report, &mut self.report_buffer) {
            warn!("state report dropped: {}", err);
        }
    }
}
