use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};
use tracing::{info, trace};

use crate::{
    batch::Batch,
    error::{EncodeError, SendError},
    message::{write_len, write_str, Message},
    QueueBatcherResult,
};

/// Transport collaborator that delivers messages to a destination over an
/// already established connection.
#[async_trait::async_trait]
pub trait Sender: Send + Sync {
    async fn send(&self, batch: &Batch) -> QueueBatcherResult<()>;

    async fn send_message(&self, message: &Message) -> QueueBatcherResult<()> {
        self.send(&Batch::single(message.clone())).await
    }
}

#[async_trait::async_trait]
impl<T: Sender + ?Sized> Sender for &T {
    async fn send(&self, batch: &Batch) -> QueueBatcherResult<()> {
        (**self).send(batch).await
    }

    async fn send_message(&self, message: &Message) -> QueueBatcherResult<()> {
        (**self).send_message(message).await
    }
}

#[async_trait::async_trait]
impl<T: Sender + ?Sized> Sender for Arc<T> {
    async fn send(&self, batch: &Batch) -> QueueBatcherResult<()> {
        (**self).send(batch).await
    }

    async fn send_message(&self, message: &Message) -> QueueBatcherResult<()> {
        (**self).send_message(message).await
    }
}

/// Writes every batch as a length-prefixed frame to an async writer.
///
/// Frame layout (big endian):
/// `u32 frame_len | i16 destination_len, destination | u32 message_count | message*`
pub struct FrameSender<W> {
    destination: String,
    writer: Mutex<W>,
    closed: AtomicBool,
}

impl<W> FrameSender<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(destination: &str, writer: W) -> Self {
        FrameSender {
            destination: destination.to_owned(),
            writer: Mutex::new(writer),
            closed: AtomicBool::new(false),
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Flushes and shuts down the writer. Later sends fail with [`SendError::Closed`].
    pub async fn close(&self) -> QueueBatcherResult<()> {
        match self
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(false) => {
                let mut writer = self.writer.lock().await;
                writer.flush().await?;
                writer.shutdown().await?;
                Ok(())
            }
            _ => Err(SendError::Closed),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn encode_frame(&self, batch: &Batch) -> Result<Vec<u8>, EncodeError> {
        let body_len = 2
            + self.destination.len() as u64
            + 4
            + batch.iter().map(Message::encoded_len).sum::<u64>();

        let mut frame = Vec::with_capacity(4 + body_len as usize);
        write_len(&mut frame, body_len as usize)?;
        write_str(&mut frame, &self.destination)?;
        write_len(&mut frame, batch.len())?;
        for message in batch {
            message.encode(&mut frame)?;
        }
        Ok(frame)
    }
}

#[async_trait::async_trait]
impl<W> Sender for FrameSender<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, batch: &Batch) -> QueueBatcherResult<()> {
        if self.is_closed() {
            return Err(SendError::Closed);
        }
        let frame = self.encode_frame(batch)?;

        let mut writer = self.writer.lock().await;
        writer.write_all(&frame).await?;
        writer.flush().await?;

        trace!(
            destination = %self.destination,
            count = batch.len(),
            frame_len = frame.len(),
            "frame written"
        );
        Ok(())
    }
}

/// Dry-run sender: reports each batch as a tracing event and transmits nothing.
pub struct TracingSender {
    destination: String,
}

impl TracingSender {
    pub fn new(destination: &str) -> Self {
        TracingSender {
            destination: destination.to_owned(),
        }
    }
}

#[async_trait::async_trait]
impl Sender for TracingSender {
    async fn send(&self, batch: &Batch) -> QueueBatcherResult<()> {
        info!(
            destination = %self.destination,
            count = batch.len(),
            bytes = batch.size(),
            "batch sent"
        );
        Ok(())
    }
}
