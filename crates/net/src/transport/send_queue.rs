//! FIFO of outbound buffers with high/low water mark backpressure.
//!
//! Every buffer is written completely before the next one starts: a partial write only advances
//! the front buffer. The queue counts bytes, not buffers, against two thresholds:
//!
//! - above `high_water`: [`push`](SendQueue::push) reports [`SendStatus::Backpressure`] and the
//!   queue enters the paused state, raising one backpressure event
//! - at or below `low_water` while paused: [`advance`](SendQueue::advance) reports the drain once
//!   and the queue leaves the paused state

use std::collections::VecDeque;

use bytes::{Buf, Bytes};

/// Outcome of enqueuing a buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SendStatus {
    /// Enqueued, the queue is below its high water mark.
    Queued,
    /// Enqueued, but the queue exceeds its high water mark; the producer should slow down.
    Backpressure,
}

#[derive(Debug)]
pub struct SendQueue {
    buffers: VecDeque<Bytes>,
    queued: usize,
    high_water: usize,
    low_water: usize,
    paused: bool,
    backpressure_event: bool,
}

impl SendQueue {
    /// Creates a queue; `low_water` is clamped to `high_water`.
    pub fn new(high_water: usize, low_water: usize) -> Self {
        Self {
            buffers: VecDeque::new(),
            queued: 0,
            high_water,
            low_water: low_water.min(high_water),
            paused: false,
            backpressure_event: false,
        }
    }

    pub fn push(&mut self, buffer: Bytes) -> SendStatus {
        if !buffer.is_empty() {
            self.queued += buffer.len();
            self.buffers.push_back(buffer);
        }

        if self.queued <= self.high_water {
            return SendStatus::Queued;
        }

        if !self.paused {
            self.paused = true;
            self.backpressure_event = true;
        }
        SendStatus::Backpressure
    }

    /// The unwritten part of the front buffer.
    pub fn front(&self) -> Option<Bytes> {
        self.buffers.front().cloned()
    }

    /// Marks `written` bytes of the front buffer as sent.
    ///
    /// Returns true exactly once per paused period, when the queue drains to the low water mark.
    pub fn advance(&mut self, written: usize) -> bool {
        let mut remaining = written.min(self.queued);
        self.queued -= remaining;

        while remaining > 0 {
            let Some(front) = self.buffers.front_mut() else {
                break;
            };
            if remaining < front.len() {
                front.advance(remaining);
                break;
            }
            remaining -= front.len();
            self.buffers.pop_front();
        }

        if self.paused && self.queued <= self.low_water {
            // a pending backpressure event stays pending so it is still reported before the drain
            self.paused = false;
            return true;
        }
        false
    }

    /// Returns true once after the queue crossed its high water mark.
    pub fn take_backpressure_event(&mut self) -> bool {
        std::mem::take(&mut self.backpressure_event)
    }

    /// Discards everything queued.
    pub fn clear(&mut self) {
        self.buffers.clear();
        self.queued = 0;
        self.paused = false;
        self.backpressure_event = false;
    }

    /// Queued bytes not yet written.
    pub fn len(&self) -> usize {
        self.queued
    }

    pub fn is_empty(&self) -> bool {
        self.queued == 0
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_writes_keep_order() {
        let mut queue = SendQueue::new(1024, 256);
        queue.push(Bytes::from_static(b"AAAA"));
        queue.push(Bytes::from_static(b"BB"));

        let mut written = Vec::new();
        while let Some(front) = queue.front() {
            written.push(front[0]);
            queue.advance(1);
        }

        assert_eq!(written, b"AAAABB");
        assert!(queue.is_empty());
    }

    #[test]
    fn backpressure_above_high_water() {
        let mut queue = SendQueue::new(10, 4);

        assert_eq!(queue.push(Bytes::from(vec![0; 8])), SendStatus::Queued);
        assert_eq!(queue.push(Bytes::from(vec![0; 2])), SendStatus::Queued);
        assert_eq!(queue.push(Bytes::from(vec![0; 1])), SendStatus::Backpressure);
        assert_eq!(queue.push(Bytes::from(vec![0; 1])), SendStatus::Backpressure);

        assert!(queue.is_paused());
        assert!(queue.take_backpressure_event());
        assert!(!queue.take_backpressure_event());
    }

    #[test]
    fn ready_fires_once_at_low_water() {
        let mut queue = SendQueue::new(10, 4);
        queue.push(Bytes::from(vec![0; 12]));

        assert!(!queue.advance(4));
        assert!(!queue.advance(3));
        assert!(queue.advance(1));
        assert!(!queue.advance(1));
        assert!(!queue.advance(3));
        assert!(!queue.is_paused());
        assert!(queue.is_empty());
    }

    #[test]
    fn low_water_is_clamped() {
        let mut queue = SendQueue::new(4, 100);
        queue.push(Bytes::from(vec![0; 6]));
        assert!(!queue.advance(1));
        assert!(queue.advance(1));
    }

    #[test]
    fn clear_resets_backpressure() {
        let mut queue = SendQueue::new(2, 1);
        queue.push(Bytes::from_static(b"xyz"));
        queue.clear();

        assert!(queue.is_empty());
        assert!(!queue.is_paused());
        assert!(!queue.take_backpressure_event());
        assert!(queue.front().is_none());
    }
}
