#![allow(dead_code)]

use std::{
    io,
    sync::atomic::{AtomicUsize, Ordering},
};

use queue_batcher::{
    error::SendError,
    types::{Batch, Message},
    QueueBatcherResult, Sender,
};
use tokio::sync::Mutex;

/// Sender that keeps every batch it receives and can be armed to fail.
#[derive(Default)]
pub struct RecordingSender {
    batches: Mutex<Vec<Vec<Message>>>,
    failures: AtomicUsize,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` sends fail
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub async fn batches(&self) -> Vec<Vec<Message>> {
        self.batches.lock().await.clone()
    }

    pub async fn sent_messages(&self) -> Vec<Message> {
        self.batches.lock().await.iter().flatten().cloned().collect()
    }
}

#[async_trait::async_trait]
impl Sender for RecordingSender {
    async fn send(&self, batch: &Batch) -> QueueBatcherResult<()> {
        let armed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if armed {
            return Err(SendError::Io(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset",
            )));
        }
        self.batches.lock().await.push(batch.messages().to_vec());
        Ok(())
    }
}

pub fn message_of(size: usize) -> Message {
    Message::new(vec![b'x'; size])
}

pub fn sizes(messages: &[Message]) -> Vec<u64> {
    messages.iter().map(Message::size).collect()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}
