//! Message bus topic names derived from the configurable base name

use core::fmt::Write;

use heapless::String;

use crate::error::CommandError;

/// Capacity of a full topic string
pub const TOPIC_LEN: usize = 80;

pub type Topic = String<TOPIC_LEN>;

/// Role of an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Control document (`processJson`)
    Set,
    /// Stream chunk from the network
    Stream,
    /// Firmware update trigger
    Update,
    /// Stream topic unsubscribe / instance swap
    Unsubscribe,
    /// Capability request
    FirmwareConfig,
    /// Reboot command
    Reboot,
    /// Raw bytes from the serial link
    Serial,
}

/// Full topic set for one base name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub light_state: Topic,
    pub set: Topic,
    pub base_stream: Topic,
    pub stream: Topic,
    pub update: Topic,
    pub update_result: Topic,
    pub unsubscribe: Topic,
    pub fps: Topic,
    pub firmware_config: Topic,
    pub reboot: Topic,
}

impl Topics {
    pub fn new(base: &str) -> Result<Self, CommandError> {
        let stream = lights_topic(base, "/set/stream")?;
        Ok(Self {
            light_state: lights_topic(base, "")?,
            set: lights_topic(base, "/set")?,
            base_stream: stream.clone(),
            stream,
            update: lights_topic(base, "/update")?,
            update_result: lights_topic(base, "/update/result")?,
            unsubscribe: lights_topic(base, "/unsubscribe")?,
            fps: lights_topic(base, "/fps")?,
            firmware_config: lights_topic(base, "/firmwareconfig")?,
            reboot: format_topic(format_args!("cmnd/{}/reboot", base))?,
        })
    }

    /// Map an incoming topic to its handler
    pub fn route(&self, topic: &str) -> Option<Route> {
        let routes = [
            (&self.set, Route::Set),
            (&self.stream, Route::Stream),
            (&self.update, Route::Update),
            (&self.unsubscribe, Route::Unsubscribe),
            (&self.firmware_config, Route::FirmwareConfig),
            (&self.reboot, Route::Reboot),
        ];
        routes
            .into_iter()
            .find(|(candidate, _)| candidate.as_str() == topic)
            .map(|(_, route)| route)
    }

    /// Topics the device listens on
    pub fn subscriptions(&self) -> [&str; 6] {
        [
            self.set.as_str(),
            self.stream.as_str(),
            self.update.as_str(),
            self.unsubscribe.as_str(),
            self.firmware_config.as_str(),
            self.reboot.as_str(),
        ]
    }

    /// Point the stream topic at `<base stream><instance>`
    pub fn set_stream_instance(&mut self, instance: &str) -> Result<(), CommandError> {
        self.stream = format_topic(format_args!("{}{}", self.base_stream, instance))?;
        Ok(())
    }
}

fn lights_topic(base: &str, suffix: &str) -> Result<Topic, CommandError> {
    format_topic(format_args!("lights/{}{}", base, suffix))
}

fn format_topic(args: core::fmt::Arguments<'_>) -> Result<Topic, CommandError> {
    let mut topic = Topic::new();
    topic.write_fmt(args).map_err(|_| CommandError::TopicTooLong)?;
    Ok(topic)
}
