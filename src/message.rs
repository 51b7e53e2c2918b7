use std::{collections::HashMap, io::Write, sync::Arc};

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Bytes;

use crate::error::EncodeError;

/// Outbound message: an immutable payload plus application properties.
///
/// Cloning is cheap, the content is shared.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Message(Arc<InternalMessage>);

#[derive(Debug, PartialEq, Eq, Default)]
struct InternalMessage {
    body: Bytes,
    properties: HashMap<String, String>,
}

impl Message {
    pub fn new(body: impl Into<Bytes>) -> Message {
        Message::builder().body(body).build()
    }

    /// Builder for creating [`Message`]
    pub fn builder() -> MessageBuilder {
        MessageBuilder(InternalMessage::default())
    }

    pub fn body(&self) -> &[u8] {
        &self.0.body
    }

    pub fn properties(&self) -> &HashMap<String, String> {
        &self.0.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.0.properties.get(key).map(String::as_str)
    }

    /// Size accounted against a batch ceiling: the body length plus the
    /// serialized overhead of the application properties.
    pub fn size(&self) -> u64 {
        self.0.body.len() as u64 + self.properties_overhead()
    }

    fn properties_overhead(&self) -> u64 {
        if self.0.properties.is_empty() {
            return 0;
        }
        4 + self
            .0
            .properties
            .iter()
            .fold(0, |acc, (k, v)| acc + str_size(k) + str_size(v))
    }

    /// Exact number of bytes written by [`Message::encode`]
    pub fn encoded_len(&self) -> u64 {
        4 + self.0.body.len() as u64
            + 4
            + self
                .0
                .properties
                .iter()
                .fold(0, |acc, (k, v)| acc + str_size(k) + str_size(v))
    }

    pub fn encode(&self, writer: &mut impl Write) -> Result<(), EncodeError> {
        write_len(writer, self.0.body.len())?;
        writer.write_all(&self.0.body)?;

        write_len(writer, self.0.properties.len())?;
        for (k, v) in &self.0.properties {
            write_str(writer, k)?;
            write_str(writer, v)?;
        }
        Ok(())
    }
}

fn str_size(input: &str) -> u64 {
    2 + input.len() as u64
}

pub(crate) fn write_len(writer: &mut impl Write, len: usize) -> Result<(), EncodeError> {
    let len = u32::try_from(len).map_err(|_| EncodeError::LengthOverflow(len))?;
    writer.write_u32::<BigEndian>(len)?;
    Ok(())
}

pub(crate) fn write_str(writer: &mut impl Write, input: &str) -> Result<(), EncodeError> {
    let len = i16::try_from(input.len()).map_err(|_| EncodeError::StringTooLong(input.len()))?;
    writer.write_i16::<BigEndian>(len)?;
    writer.write_all(input.as_bytes())?;
    Ok(())
}

pub struct MessageBuilder(InternalMessage);

impl MessageBuilder {
    pub fn body(mut self, data: impl Into<Bytes>) -> Self {
        self.0.body = data.into();
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.properties.insert(key.into(), value.into());
        self
    }

    pub fn properties<K, V>(mut self, properties: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0
            .properties
            .extend(properties.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn build(self) -> Message {
        Message(Arc::new(self.0))
    }
}
