//! Inbound messages queued by the transports for the render tick

use heapless::Vec;

use crate::channel::{Channel, Receiver, Sender};
use crate::stream::MAX_CHUNK_LEN;
use crate::topics::Route;

/// Largest payload a single inbound message carries
pub const MAX_PAYLOAD: usize = MAX_CHUNK_LEN;

/// One message from the bus or the serial link
#[derive(Debug, Clone)]
pub struct Inbound {
    pub route: Route,
    pub payload: Vec<u8, MAX_PAYLOAD>,
}

impl Inbound {
    /// Copy `payload` into a message, `None` if it exceeds [`MAX_PAYLOAD`]
    pub fn new(route: Route, payload: &[u8]) -> Option<Self> {
        Some(Self {
            route,
            payload: Vec::from_slice(payload).ok()?,
        })
    }
}

/// Type alias for message sender
pub type MessageSender<'a, const SIZE: usize> = Sender<'a, Inbound, SIZE>;

/// Type alias for message receiver
pub type MessageReceiver<'a, const SIZE: usize> = Receiver<'a, Inbound, SIZE>;

/// Type alias for the message channel
pub type MessageChannel<const SIZE: usize> = Channel<Inbound, SIZE>;
