use thiserror::Error;

use crate::{accumulator::FlushResult, message::Message};

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("String of {0} bytes does not fit an i16 length prefix")]
    StringTooLong(usize),
    #[error("Length {0} does not fit a u32 length prefix")]
    LengthOverflow(usize),
}

/// Transmission failure reported by a [`Sender`](crate::Sender)
#[derive(Error, Debug)]
pub enum SendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode outbound frame: {0}")]
    Encode(#[from] EncodeError),
    #[error("Sender is closed")]
    Closed,
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(Error, Debug)]
pub enum OfferError {
    #[error("Message of {size} bytes exceeds the maximum batch size of {max_size} bytes")]
    MessageTooLarge {
        message: Message,
        size: u64,
        max_size: u64,
    },
}

impl OfferError {
    /// The rejected message
    pub fn message(&self) -> &Message {
        match self {
            OfferError::MessageTooLarge { message, .. } => message,
        }
    }

    pub fn into_message(self) -> Message {
        match self {
            OfferError::MessageTooLarge { message, .. } => message,
        }
    }
}

#[derive(Error, Debug)]
pub enum FlushError {
    #[error("Failed to send batch: {0}")]
    SendFailed(#[source] SendError),
}

/// Returned by [`BatchAccumulator::offer_all`](crate::BatchAccumulator::offer_all)
/// when a flush fails. Nothing offered is lost: messages already packed stay in the
/// accumulator's open batch and everything not yet packed is handed back in `unsent`.
#[derive(Error, Debug)]
#[error("Failed to send batch after {} successful flushes: {cause}", .sent.len())]
pub struct OfferAllError {
    #[source]
    pub cause: SendError,
    pub sent: Vec<FlushResult>,
    pub failures: Vec<OfferError>,
    pub unsent: Vec<Message>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ByteCapacityParseError {
    #[error("Empty byte capacity")]
    Empty,
    #[error("Invalid byte capacity '{0}', expected \\d+(B|KB|MB|GB|TB)")]
    Invalid(String),
    #[error("Byte capacity '{0}' overflows u64")]
    Overflow(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    MissingVariable(&'static str),
    #[error("Invalid value for {variable}: {reason}")]
    InvalidValue {
        variable: &'static str,
        reason: String,
    },
    #[error("Missing configuration field {0}")]
    MissingField(&'static str),
}
