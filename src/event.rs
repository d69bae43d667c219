//! Frame-local publish/subscribe for arbitrary value types.
//!
//! Each event type gets its own [`Events<T>`] ring, held as an ordinary world resource. Writers
//! append; readers hold a [`ReaderId`] and advance their own cursor on read, so one writer can
//! feed many independent readers without cloning per-reader queues. A value is dropped once every
//! registered reader's cursor has passed it, which [`Events::update`] sweeps once per frame.

use std::collections::VecDeque;

/// Handle returned by [`Events::register_reader`]; each reader tracks its own read position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReaderId(usize);

struct Record<T> {
    sequence: u64,
    mask: u32,
    value: T,
}

/// Ring of emitted `T` values, with an independent read cursor per registered reader.
pub struct Events<T> {
    queue: VecDeque<Record<T>>,
    next_sequence: u64,
    cursors: Vec<u64>,
}

impl<T> Default for Events<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Events<T> {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            next_sequence: 0,
            cursors: Vec::new(),
        }
    }

    /// Registers a new reader, starting from whatever is currently in the ring.
    pub fn register_reader(&mut self) -> ReaderId {
        let id = ReaderId(self.cursors.len());
        self.cursors.push(self.next_sequence);
        id
    }

    pub fn send(&mut self, value: T) {
        self.send_masked(value, u32::MAX);
    }

    /// Sends `value` tagged with `mask`, so readers can filter by [`read_masked`](Self::read_masked).
    pub fn send_masked(&mut self, value: T, mask: u32) {
        self.queue.push_back(Record {
            sequence: self.next_sequence,
            mask,
            value,
        });
        self.next_sequence += 1;
    }

    /// Returns every value written since `reader`'s last read, advancing its cursor past all of
    /// them regardless of mask.
    pub fn read(&mut self, reader: ReaderId) -> Vec<&T> {
        self.read_masked(reader, u32::MAX)
    }

    /// Returns every value written since `reader`'s last read whose mask overlaps `mask`,
    /// advancing its cursor past all of them (matching and non-matching alike).
    pub fn read_masked(&mut self, reader: ReaderId, mask: u32) -> Vec<&T> {
        let cursor = self.cursors[reader.0];
        let result: Vec<&T> = self
            .queue
            .iter()
            .filter(|r| r.sequence >= cursor && r.mask & mask != 0)
            .map(|r| &r.value)
            .collect();
        self.cursors[reader.0] = self.next_sequence;
        result
    }

    /// Drops every value whose sequence number every registered reader has already passed. Called
    /// once per frame by the harness that owns the event's lifetime.
    pub fn update(&mut self) {
        let Some(&min_cursor) = self.cursors.iter().min() else {
            self.queue.clear();
            return;
        };
        while let Some(front) = self.queue.front() {
            if front.sequence < min_cursor {
                self.queue.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_observes_writes_in_order() {
        let mut events = Events::<u32>::new();
        let reader = events.register_reader();
        events.send(1);
        events.send(2);
        assert_eq!(events.read(reader), vec![&1, &2]);
    }

    #[test]
    fn second_reader_does_not_see_stale_position() {
        let mut events = Events::<&str>::new();
        events.send("before");
        let late_reader = events.register_reader();
        events.send("after");
        assert_eq!(events.read(late_reader), vec![&"after"]);
    }

    #[test]
    fn update_drops_values_every_reader_has_passed() {
        let mut events = Events::<u32>::new();
        let a = events.register_reader();
        let b = events.register_reader();
        events.send(1);
        events.read(a);
        events.update();
        assert_eq!(events.len(), 1, "b has not read yet, so the value survives");
        events.read(b);
        events.update();
        assert_eq!(events.len(), 0);
    }

    #[test]
    fn masked_read_filters_but_still_advances_cursor() {
        let mut events = Events::<u32>::new();
        let reader = events.register_reader();
        events.send_masked(1, 0b01);
        events.send_masked(2, 0b10);
        assert_eq!(events.read_masked(reader, 0b01), vec![&1]);
        assert!(events.read(reader).is_empty(), "cursor already past both");
    }
}
