//! Size-bounded batching of outbound messages for queue-based messaging clients.
//!
//! A [`BatchAccumulator`] packs [`Message`](types::Message)s into batches that
//! never exceed a configured byte ceiling and hands full or final batches to a
//! [`Sender`], the collaborator that owns the actual transport.
mod accumulator;
mod batch;
mod byte_capacity;
mod environment;
pub mod error;
mod message;
mod sender;

pub type QueueBatcherResult<T> = Result<T, error::SendError>;

pub use crate::accumulator::{
    AccumulatorState, BatchAccumulator, FlushResult, OfferAllOutcome, OfferResult,
};
pub use crate::environment::{Environment, EnvironmentBuilder, EnvironmentOptions};
pub use crate::sender::{FrameSender, Sender, TracingSender};

pub mod types {

    pub use crate::batch::Batch;
    pub use crate::byte_capacity::ByteCapacity;
    pub use crate::environment::TransportType;
    pub use crate::message::{Message, MessageBuilder};
}
