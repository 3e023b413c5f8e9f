use core::fmt::Write as _;

use embassy_time::Instant;
use heapless::String;
use log::{info, warn};

use crate::color::{BLACK, Rgb, scale_color};
use crate::color_state::{ColorState, fade_steps};
use crate::command::{FramerateReport, REPORT_BUFFER_LEN, SERIAL_INFO_LEN, SerialInfoReport};
use crate::config::{
    DeviceSettings, EngineTimings, FIRMWARE_VERSION, LightEngineConfig, StreamFallback,
};
use crate::effect::{EffectEngine, EffectMode};
use crate::error::CommandError;
use crate::frame_buffer::FrameBuffer;
use crate::message::MessageReceiver;
use crate::platform::Platform;
use crate::stream::StreamIngest;
use crate::topics::Topics;

/// Everything the render tick owns
///
/// Handlers, effects and stream ingest operate on this state only; nothing is
/// shared outside the render loop.
pub struct EngineState<const MAX_LEDS: usize> {
    pub(crate) settings: DeviceSettings,
    pub(crate) topics: Topics,
    pub(crate) timings: EngineTimings,
    pub(crate) fallback: StreamFallback,
    pub(crate) color: ColorState,
    pub(crate) effects: EffectEngine,
    pub(crate) frame: FrameBuffer<MAX_LEDS>,
    pub(crate) stream: StreamIngest<MAX_LEDS>,
    pub(crate) last_traffic: Option<Instant>,
    pub(crate) stream_idle: bool,
    pub(crate) report_buffer: [u8; REPORT_BUFFER_LEN],
}

impl<const MAX_LEDS: usize> EngineState<MAX_LEDS> {
    pub fn new(config: &LightEngineConfig) -> Result<Self, CommandError> {
        let mut settings = config.settings.clone();
        let led_count = settings.set_led_count(settings.led_count, MAX_LEDS);
        let topics = Topics::new(&settings.topic)?;
        let steps = fade_steps(config.timings.color_transition, config.timings.frame_interval);

        Ok(Self {
            effects: EffectEngine::new(settings.effect, config.seed),
            settings,
            topics,
            timings: config.timings,
            fallback: config.stream_fallback,
            color: ColorState::new(config.color, config.brightness, config.power, steps),
            frame: FrameBuffer::new(usize::from(led_count)),
            stream: StreamIngest::new(),
            last_traffic: None,
            stream_idle: false,
            report_buffer: [0; REPORT_BUFFER_LEN],
        })
    }

    pub const fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    pub const fn topics(&self) -> &Topics {
        &self.topics
    }

    pub const fn color(&self) -> &ColorState {
        &self.color
    }

    pub const fn mode(&self) -> EffectMode {
        self.effects.mode()
    }

    pub const fn effects(&self) -> &EffectEngine {
        &self.effects
    }

    pub const fn frame(&self) -> &FrameBuffer<MAX_LEDS> {
        &self.frame
    }

    pub const fn stream(&self) -> &StreamIngest<MAX_LEDS> {
        &self.stream
    }

    /// Whether the streaming mode currently shows its idle fallback
    pub const fn is_stream_idle(&self) -> bool {
        self.stream_idle
    }

    /// Fill the active frame for this tick
    fn compose(&mut self, now: Instant) {
        let mode = self.effects.mode();
        if mode.is_streaming() {
            self.check_stream_idle(now);
            return;
        }

        let color = self.color.output();
        if self.color.is_flashing() {
            self.frame.fill(color);
        } else {
            self.effects.render(now, self.frame.active_mut(), color);
        }
    }

    fn check_stream_idle(&mut self, now: Instant) {
        let idle = self.stream.is_idle(now, self.timings.stream_idle_timeout);
        if idle != self.stream_idle {
            if idle {
                info!("stream idle, falling back to {:?}", self.fallback);
            } else {
                info!("stream resumed");
            }
            self.stream_idle = idle;
        }
        if idle && self.fallback == StreamFallback::Solid {
            self.frame.fill(self.color.output());
        }
    }

    /// Brightness applied to the committed frame
    fn output_level(&self) -> u8 {
        let lit = self.color.is_on() || self.color.is_flashing();
        if !lit && self.effects.mode() != EffectMode::Solid {
            // Solid fades to black through the color state instead
            return 0;
        }
        self.color.brightness()
    }
}

/// Light Engine - the per-tick pipeline
pub struct Renderer<'a, const MAX_LEDS: usize, const QUEUE_SIZE: usize> {
    messages: MessageReceiver<'a, QUEUE_SIZE>,
    state: EngineState<MAX_LEDS>,
    output: [Rgb; MAX_LEDS],
}

impl<'a, const MAX_LEDS: usize, const QUEUE_SIZE: usize> Renderer<'a, MAX_LEDS, QUEUE_SIZE> {
    /// Create a new renderer draining `messages`
    pub fn new(
        messages: MessageReceiver<'a, QUEUE_SIZE>,
        config: &LightEngineConfig,
    ) -> Result<Self, CommandError> {
        Ok(Self {
            messages,
            state: EngineState::new(config)?,
            output: [BLACK; MAX_LEDS],
        })
    }

    pub const fn state(&self) -> &EngineState<MAX_LEDS> {
        &self.state
    }

    /// Process one frame
    ///
    /// Applies queued messages, advances flash and fade, computes the effect
    /// (or the stream fallback) and returns the brightness-scaled pixels to
    /// commit.
    pub fn render(&mut self, now: Instant, platform: &mut impl Platform) -> &[Rgb] {
        self.process_messages(now, platform);
        self.state.color.tick(now);
        self.state.compose(now);
        self.commit()
    }

    fn process_messages(&mut self, now: Instant, platform: &mut impl Platform) {
        while let Ok(message) = self.messages.try_receive() {
            self.state.last_traffic = Some(now);
            if let Err(err) = self.state.handle(&message, now, platform) {
                warn!("{:?} message rejected: {}", message.route, err);
            }
        }
    }

    fn commit(&mut self) -> &[Rgb] {
        let level = self.state.output_level();
        let frame = self.state.frame.active();
        let output = &mut self.output[..frame.len()];
        for (out, pixel) in output.iter_mut().zip(frame) {
            *out = scale_color(*pixel, level);
        }
        output
    }

    /// Time of the last inbound message
    pub const fn last_traffic(&self) -> Option<Instant> {
        self.state.last_traffic
    }

    pub const fn is_on(&self) -> bool {
        self.state.color.is_on()
    }

    /// Frames committed by stream ingest so far
    pub const fn stream_frames(&self) -> u32 {
        self.state.stream.frames()
    }

    pub const fn is_streaming(&self) -> bool {
        self.state.effects.mode().is_streaming()
    }

    /// Switch the strip off, as the idle timer does
    pub fn power_off(&mut self, platform: &mut impl Platform) {
        info!("powering off after inactivity");
        self.state.color.set_power(false);
        self.state.publish_state(platform);
    }

    /// Apply a new LED count from configuration management
    pub fn set_num_led(&mut self, count: u16, platform: &mut impl Platform) {
        self.state.set_num_led(count, platform);
    }

    /// Apply a new data pin from configuration management
    pub fn set_gpio(&mut self, gpio: u8, platform: &mut impl Platform) {
        self.state.set_gpio(gpio, platform);
    }

    /// Apply a new baud rate index from configuration management
    pub fn set_baud_rate(&mut self, index: u8, platform: &mut impl Platform) -> Result<(), CommandError> {
        self.state.set_baud_rate(index, platform)
    }

    /// Switch the topic base name from configuration management
    pub fn swap_topic(&mut self, topic: &str, platform: &mut impl Platform) -> Result<(), CommandError> {
        self.state.swap_topic(topic, platform)
    }

    /// Publish framerate telemetry on the fps topic
    pub fn publish_framerate(&mut self, framerate: u32, platform: &mut impl Platform) {
        let state = &mut self.state;
        if let Err(err) = crate::handlers::publish(
            platform,
            &state.topics.fps,
            &FramerateReport { framerate },
            &mut state.report_buffer,
        ) {
            warn!("framerate report dropped: {}", err);
        }
    }

    /// Write the status lines to the serial link
    pub fn send_serial_info(&self, framerate: u32, platform: &mut impl Platform) {
        let settings = &self.state.settings;
        let report = SerialInfoReport {
            framerate,
            ver: FIRMWARE_VERSION,
            lednum: settings.led_count,
            gpio: settings.gpio,
            baudrate: settings.baud_rate.index(),
            effect: self.state.effects.mode().as_raw(),
        };
        let mut text: String<SERIAL_INFO_LEN> = String::new();
        if write!(text, "{}", report).is_err() {
            warn!("serial info dropped: does not fit {} bytes", SERIAL_INFO_LEN);
            return;
        }
        platform.write_serial(text.as_bytes());
    }
}
