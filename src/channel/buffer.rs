use std::collections::VecDeque;

use super::message::InboundMessage;

/// Sliding window over the most recent live messages, oldest first
#[derive(Debug, Clone)]
pub struct MessageBuffer {
    capacity: usize,
    messages: VecDeque<InboundMessage>,
}

impl MessageBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            messages: VecDeque::with_capacity(capacity),
        }
    }

    /// Append, evicting the oldest entry when full
    pub fn push(&mut self, message: InboundMessage) {
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    /// Oldest first, in arrival order
    pub fn snapshot(&self) -> Vec<InboundMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&InboundMessage> {
        self.messages.back()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> InboundMessage {
        InboundMessage::parse(&format!(r#"{{"type": "test_broadcast", "payload": {{"n": {}}}}}"#, n)).unwrap()
    }

    #[test]
    fn test_eleventh_message_evicts_oldest() {
        let mut buffer = MessageBuffer::new(10);
        for n in 0..11 {
            buffer.push(numbered(n));
            assert!(buffer.len() <= 10);
        }
        let kept: Vec<u64> = buffer.snapshot().iter().map(|m| m.data["n"].as_u64().unwrap()).collect();
        assert_eq!(kept, (1..11).collect::<Vec<u64>>());
        assert_eq!(buffer.latest().unwrap().data["n"], 10);
    }

    #[test]
    fn test_long_sequence_stays_bounded() {
        let mut buffer = MessageBuffer::new(10);
        for n in 0..250 {
            buffer.push(numbered(n));
        }
        assert_eq!(buffer.len(), 10);
        assert_eq!(buffer.snapshot()[0].data["n"], 240);
    }
}
