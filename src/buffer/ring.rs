//! A bounded FIFO over a fixed-size backing array.
//!
//! `start` points at the oldest element and `end` at the next free slot.
//! When they are equal the queue is either empty or completely full,
//! so `is_full` is tracked explicitly to tell the two apart.

use super::BufferError;

/// Bounded circular queue of `Copy` elements.
///
/// The capacity is fixed at construction.
/// Neither [`RingBuffer::enqueue`] nor [`RingBuffer::dequeue`] mutate anything
/// when they fail.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buffer: Vec<T>,
    start: usize,
    end: usize,
    is_full: bool,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Allocate a ring buffer holding at most `capacity` elements.
    ///
    /// A zero capacity is refused, as is a capacity the allocator cannot provide.
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        if capacity == 0 {
            return Err(BufferError::Allocation { capacity });
        }

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(capacity)
            .map_err(|_| BufferError::Allocation { capacity })?;
        buffer.resize(capacity, T::default());

        Ok(Self {
            buffer,
            start: 0,
            end: 0,
            is_full: false,
        })
    }
}

impl<T: Copy> RingBuffer<T> {
    /// How many elements fit in total.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// True when no elements are queued.
    pub fn is_empty(&self) -> bool {
        !self.is_full && self.start == self.end
    }

    /// True when exactly [`RingBuffer::capacity`] elements are queued.
    pub fn is_full(&self) -> bool {
        self.is_full
    }

    /// Number of queued elements.
    pub fn len(&self) -> usize {
        if self.is_full {
            self.capacity()
        } else if self.end >= self.start {
            self.end - self.start
        } else {
            self.capacity() - (self.start - self.end)
        }
    }

    /// Number of elements that can still be enqueued.
    pub fn free(&self) -> usize {
        self.capacity() - self.len()
    }

    /// Put a value at the back of the queue.
    pub fn enqueue(&mut self, value: T) -> Result<(), BufferError> {
        if self.is_full {
            return Err(BufferError::Full {
                capacity: self.capacity(),
            });
        }

        self.buffer[self.end] = value;
        self.end = (self.end + 1) % self.capacity();
        self.is_full = self.end == self.start;

        Ok(())
    }

    /// Take the value at the front of the queue.
    pub fn dequeue(&mut self) -> Result<T, BufferError> {
        if self.is_empty() {
            return Err(BufferError::Empty);
        }

        let value = self.buffer[self.start];
        self.start = (self.start + 1) % self.capacity();
        self.is_full = false;

        Ok(value)
    }

    /// The longest run of queued elements that is contiguous in memory,
    /// starting at the front of the queue.
    ///
    /// When the queue wraps around the end of the backing array this is
    /// only the first part. Call [`RingBuffer::advance`] with however many
    /// elements were consumed, then ask again for the rest.
    pub fn contiguous(&self) -> &[T] {
        if self.is_empty() {
            &[]
        } else if self.end > self.start {
            &self.buffer[self.start..self.end]
        } else {
            &self.buffer[self.start..]
        }
    }

    /// Drop up to `count` elements from the front of the queue,
    /// returning how many were dropped.
    pub fn advance(&mut self, count: usize) -> usize {
        let count = count.min(self.len());
        if count == 0 {
            return 0;
        }

        self.start = (self.start + count) % self.capacity();
        self.is_full = false;

        count
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn state<T: Copy>(ring: &RingBuffer<T>) -> (usize, usize, bool) {
        (ring.start, ring.end, ring.is_full)
    }

    #[test]
    fn zero_capacity_is_refused() {
        let err = RingBuffer::<u8>::new(0).unwrap_err();

        assert_eq!(err, BufferError::Allocation { capacity: 0 });
    }

    #[test]
    fn new_is_empty() {
        let ring = RingBuffer::<u8>::new(4).unwrap();

        assert!(ring.is_empty());
        assert!(!ring.is_full());
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.free(), 4);
        assert_eq!(ring.capacity(), 4);
    }

    #[test]
    fn fifo_order() {
        let mut ring = RingBuffer::new(3).unwrap();

        ring.enqueue(1u32).unwrap();
        ring.enqueue(2).unwrap();
        assert_eq!(ring.dequeue(), Ok(1));

        ring.enqueue(3).unwrap();
        ring.enqueue(4).unwrap();
        assert!(ring.is_full());

        assert_eq!(ring.dequeue(), Ok(2));
        assert_eq!(ring.dequeue(), Ok(3));
        assert_eq!(ring.dequeue(), Ok(4));
        assert!(ring.is_empty());
    }

    #[test]
    fn enqueue_when_full_leaves_state_alone() {
        let mut ring = RingBuffer::new(2).unwrap();
        ring.enqueue(b'a').unwrap();
        ring.enqueue(b'b').unwrap();

        let before = state(&ring);
        assert_eq!(ring.enqueue(b'c'), Err(BufferError::Full { capacity: 2 }));
        assert_eq!(state(&ring), before);

        assert_eq!(ring.dequeue(), Ok(b'a'));
        assert_eq!(ring.dequeue(), Ok(b'b'));
    }

    #[test]
    fn dequeue_when_empty_leaves_state_alone() {
        let mut ring = RingBuffer::<u8>::new(2).unwrap();
        ring.enqueue(7).unwrap();
        ring.dequeue().unwrap();

        let before = state(&ring);
        assert_eq!(ring.dequeue(), Err(BufferError::Empty));
        assert_eq!(state(&ring), before);
    }

    #[test]
    fn full_and_empty_are_told_apart_when_cursors_meet() {
        let mut ring = RingBuffer::new(3).unwrap();

        for value in 0..3u8 {
            ring.enqueue(value).unwrap();
        }
        assert_eq!(ring.start, ring.end);
        assert!(ring.is_full());
        assert!(!ring.is_empty());
        assert_eq!(ring.len(), 3);

        for _ in 0..3 {
            ring.dequeue().unwrap();
        }
        assert_eq!(ring.start, ring.end);
        assert!(!ring.is_full());
        assert!(ring.is_empty());
        assert_eq!(ring.len(), 0);
    }

    #[test]
    fn len_tracks_successful_operations() {
        let mut ring = RingBuffer::new(5).unwrap();
        let mut expected = 0usize;

        // A fixed but irregular mix of operations, some of which fail.
        let script = "eeeddeeeeeedddddddeeed";

        for (index, op) in script.chars().enumerate() {
            match op {
                'e' => {
                    if ring.enqueue(index as u16).is_ok() {
                        expected += 1;
                    }
                }
                'd' => {
                    if ring.dequeue().is_ok() {
                        expected -= 1;
                    }
                }
                _ => unreachable!(),
            }

            assert_eq!(ring.len(), expected, "after op #{index} ({op})");
            assert_eq!(ring.is_full(), expected == 5);
        }
    }

    #[test]
    fn contiguous_and_advance_across_the_wrap() {
        let mut ring = RingBuffer::new(4).unwrap();

        for byte in b"abc" {
            ring.enqueue(*byte).unwrap();
        }
        assert_eq!(ring.advance(2), 2);
        for byte in b"def" {
            ring.enqueue(*byte).unwrap();
        }

        // Queue is now "cdef", stored as [e, f, c, d].
        assert_eq!(ring.contiguous(), b"cd");
        assert_eq!(ring.advance(1), 1);
        assert_eq!(ring.contiguous(), b"d");
        assert_eq!(ring.advance(1), 1);
        assert_eq!(ring.contiguous(), b"ef");
        assert_eq!(ring.advance(2), 2);

        assert!(ring.is_empty());
        assert_eq!(ring.contiguous(), b"");
    }

    #[test]
    fn advance_stops_at_the_end() {
        let mut ring = RingBuffer::new(4).unwrap();
        ring.enqueue(1u8).unwrap();
        ring.enqueue(2u8).unwrap();

        assert_eq!(ring.advance(5), 2);
        assert!(ring.is_empty());
        assert_eq!(ring.advance(1), 0);
        assert_eq!(ring.dequeue(), Err(BufferError::Empty));
    }

    #[test]
    fn contiguous_when_full() {
        let mut ring = RingBuffer::new(3).unwrap();
        for byte in b"xyz" {
            ring.enqueue(*byte).unwrap();
        }

        assert_eq!(ring.contiguous(), b"xyz");
        assert_eq!(ring.advance(3), 3);
        assert!(ring.is_empty());
    }
}
