use crate::message::Message;

/// Ordered group of messages whose accounted size never exceeds `max_size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    messages: Vec<Message>,
    size: u64,
    max_size: u64,
}

impl Batch {
    pub fn new(max_size: u64) -> Batch {
        Batch {
            messages: Vec::new(),
            size: 0,
            max_size,
        }
    }

    /// Batch holding exactly `message`, with a ceiling equal to its size
    pub fn single(message: Message) -> Batch {
        let size = message.size();
        Batch {
            messages: vec![message],
            size,
            max_size: size,
        }
    }

    /// Appends `message` if it fits in the remaining room, otherwise hands it back
    /// leaving the batch untouched.
    pub fn try_add(&mut self, message: Message) -> Result<(), Message> {
        let message_size = message.size();
        match self.size.checked_add(message_size) {
            Some(size) if size <= self.max_size => {
                self.size = size;
                self.messages.push(message);
                Ok(())
            }
            _ => Err(message),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Accounted size of all the messages in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn remaining(&self) -> u64 {
        self.max_size - self.size
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
