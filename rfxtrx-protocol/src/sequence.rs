/// One-byte identifier correlating an outbound command with its reply.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceId(u8);

impl SequenceId {
    pub fn new(value: u8) -> Self {
        Self(value)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl From<u8> for SequenceId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for SequenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wrapping 0..=255 counter. One allocator per connection.
#[derive(Debug, Default)]
pub struct SequenceAllocator {
    next: u8,
}

impl SequenceAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current id and advances, wrapping 255 → 0.
    pub fn next(&mut self) -> SequenceId {
        let id = SequenceId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }

    /// Restart at 0, as after a device reset.
    pub fn reset(&mut self) {
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn starts_at_zero() {
        let mut alloc = SequenceAllocator::new();
        assert_eq!(alloc.next(), SequenceId::new(0));
        assert_eq!(alloc.next(), SequenceId::new(1));
    }

    #[test]
    fn full_cycle_then_wraps() {
        let mut alloc = SequenceAllocator::new();
        let seen: HashSet<u8> = (0..256).map(|_| alloc.next().value()).collect();
        assert_eq!(seen.len(), 256);
        // call 257
        assert_eq!(alloc.next(), SequenceId::new(0));
    }

    #[test]
    fn reset_restarts() {
        let mut alloc = SequenceAllocator::new();
        for _ in 0..10 {
            alloc.next();
        }
        alloc.reset();
        assert_eq!(alloc.next().value(), 0);
    }

    #[test]
    fn display() {
        assert_eq!(SequenceId::new(42).to_string(), "42");
    }
}
