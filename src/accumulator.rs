use tracing::{debug, error, trace, warn};

use crate::{
    batch::Batch,
    error::{FlushError, OfferAllError, OfferError, SendError},
    message::Message,
    sender::Sender,
};

/// Outcome of [`BatchAccumulator::offer`]
#[derive(Debug, PartialEq, Eq)]
pub enum OfferResult {
    Added,
    /// The open batch has no room for the message, which is handed back untouched.
    /// Flush and offer it again.
    BatchFull(Message),
}

/// Outcome of [`BatchAccumulator::flush`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushResult {
    Sent { count: usize, bytes: u64 },
    NoOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorState {
    Empty,
    Filling,
    Full,
}

#[derive(Debug, Default)]
pub struct OfferAllOutcome {
    pub sent: Vec<FlushResult>,
    pub failures: Vec<OfferError>,
}

/// Packs offered messages into batches bounded by `max_batch_size` and hands
/// them to a [`Sender`].
///
/// `offer` and `flush` both borrow the accumulator mutably, so a batch can never be
/// sent while it is being filled. Concurrent producers need one accumulator each.
pub struct BatchAccumulator<S> {
    sender: S,
    max_batch_size: u64,
    batch: Batch,
    full: bool,
}

impl<S: Sender> BatchAccumulator<S> {
    pub fn new(sender: S, max_batch_size: u64) -> Self {
        BatchAccumulator {
            sender,
            max_batch_size,
            batch: Batch::new(max_batch_size),
            full: false,
        }
    }

    pub fn offer(&mut self, message: Message) -> Result<OfferResult, OfferError> {
        let size = message.size();
        if size > self.max_batch_size {
            return Err(OfferError::MessageTooLarge {
                message,
                size,
                max_size: self.max_batch_size,
            });
        }

        match self.batch.try_add(message) {
            Ok(()) => {
                trace!(size, pending = self.batch.len(), "message added to batch");
                Ok(OfferResult::Added)
            }
            Err(message) => {
                self.full = true;
                Ok(OfferResult::BatchFull(message))
            }
        }
    }

    /// Sends the open batch and starts a fresh one. The batch is only cleared once
    /// the sender confirms it, so a failed send leaves it in place for a retry.
    pub async fn flush(&mut self) -> Result<FlushResult, FlushError> {
        if self.batch.is_empty() {
            return Ok(FlushResult::NoOp);
        }

        if let Err(err) = self.sender.send(&self.batch).await {
            error!(
                count = self.batch.len(),
                bytes = self.batch.size(),
                error = %err,
                "failed to send batch"
            );
            return Err(FlushError::SendFailed(err));
        }

        let sent = std::mem::replace(&mut self.batch, Batch::new(self.max_batch_size));
        self.full = false;

        let (count, bytes) = (sent.len(), sent.size());
        debug!(count, bytes, "batch sent");
        Ok(FlushResult::Sent { count, bytes })
    }

    /// Offers every message in order, flushing whenever the open batch fills up and
    /// once more at the end.
    ///
    /// Oversized messages are collected in [`OfferAllOutcome::failures`] without
    /// interrupting the stream. A send failure stops immediately.
    pub async fn offer_all<I>(&mut self, messages: I) -> Result<OfferAllOutcome, OfferAllError>
    where
        I: IntoIterator<Item = Message>,
    {
        let mut outcome = OfferAllOutcome::default();
        let mut messages = messages.into_iter();

        while let Some(mut message) = messages.next() {
            loop {
                match self.offer(message) {
                    Ok(OfferResult::Added) => break,
                    Ok(OfferResult::BatchFull(rejected)) => match self.flush().await {
                        Ok(result) => {
                            outcome.sent.push(result);
                            message = rejected;
                        }
                        Err(FlushError::SendFailed(cause)) => {
                            let unsent = std::iter::once(rejected).chain(messages).collect();
                            return Err(abort(outcome, cause, unsent));
                        }
                    },
                    Err(err) => {
                        warn!(error = %err, "skipping message");
                        outcome.failures.push(err);
                        break;
                    }
                }
            }
        }

        match self.flush().await {
            Ok(FlushResult::NoOp) => {}
            Ok(result) => outcome.sent.push(result),
            Err(FlushError::SendFailed(cause)) => return Err(abort(outcome, cause, Vec::new())),
        }

        Ok(outcome)
    }

    pub fn state(&self) -> AccumulatorState {
        if self.full {
            AccumulatorState::Full
        } else if self.batch.is_empty() {
            AccumulatorState::Empty
        } else {
            AccumulatorState::Filling
        }
    }

    pub fn max_batch_size(&self) -> u64 {
        self.max_batch_size
    }

    /// Number of messages waiting in the open batch
    pub fn pending_len(&self) -> usize {
        self.batch.len()
    }

    pub fn pending_size(&self) -> u64 {
        self.batch.size()
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }
}

fn abort(outcome: OfferAllOutcome, cause: SendError, unsent: Vec<Message>) -> OfferAllError {
    OfferAllError {
        cause,
        sent: outcome.sent,
        failures: outcome.failures,
        unsent,
    }
}

#[cfg(test)]
mod tests {
    use super::{AccumulatorState, BatchAccumulator, OfferResult};
    use crate::{message::Message, sender::TracingSender};

    fn message_of(size: usize) -> Message {
        Message::new(vec![b'x'; size])
    }

    #[tokio::test]
    async fn full_state_holds_until_flush() {
        let sender = TracingSender::new("queue");
        let mut accumulator = BatchAccumulator::new(&sender, 100);

        assert_eq!(AccumulatorState::Empty, accumulator.state());
        accumulator.offer(message_of(90)).unwrap();
        assert_eq!(AccumulatorState::Filling, accumulator.state());

        assert!(matches!(
            accumulator.offer(message_of(20)).unwrap(),
            OfferResult::BatchFull(_)
        ));
        assert_eq!(AccumulatorState::Full, accumulator.state());

        // a smaller message still fits, the batch stays full until flushed
        assert_eq!(OfferResult::Added, accumulator.offer(message_of(10)).unwrap());
        assert_eq!(AccumulatorState::Full, accumulator.state());
        assert_eq!(100, accumulator.pending_size());

        accumulator.flush().await.unwrap();
        assert_eq!(AccumulatorState::Empty, accumulator.state());
    }

    #[tokio::test]
    async fn rejected_message_leaves_batch_untouched() {
        let sender = TracingSender::new("queue");
        let mut accumulator = BatchAccumulator::new(&sender, 100);
        accumulator.offer(message_of(60)).unwrap();

        let returned = match accumulator.offer(message_of(50)).unwrap() {
            OfferResult::BatchFull(message) => message,
            OfferResult::Added => panic!("message must not fit"),
        };

        assert_eq!(50, returned.size());
        assert_eq!(1, accumulator.pending_len());
        assert_eq!(60, accumulator.pending_size());
    }
}
