/// Hands out a rider's fix sequence numbers, starting at 1.
///
/// A rider's numbering outlives any single reporter: a restarted reporter
/// continues from [`starting_at`](Self::starting_at) the previous one's
/// [`peek`](Self::peek). Only fixes that survive filtering and coalescing draw a number, so the
/// numbers reaching the buffer are gap-free. Eviction never renumbers.
#[derive(Clone, Debug)]
pub struct SequenceAllocator {
    next: u64,
}

impl SequenceAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Continue a numbering whose next value is `next`. Zero is never handed
    /// out.
    pub fn starting_at(next: u64) -> Self {
        Self { next: next.max(1) }
    }

    pub fn allocate(&mut self) -> u64 {
        let seq = self.next;
        self.next += 1;
        seq
    }

    /// The number the next fix will get.
    pub fn peek(&self) -> u64 {
        self.next
    }
}

impl Default for SequenceAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_consecutively_from_one() {
        let mut seq = SequenceAllocator::new();
        assert_eq!(seq.peek(), 1);
        let drawn: Vec<u64> = (0..4).map(|_| seq.allocate()).collect();
        assert_eq!(drawn, vec![1, 2, 3, 4]);
        assert_eq!(seq.peek(), 5);
    }

    #[test]
    fn continues_an_earlier_numbering() {
        let mut first = SequenceAllocator::new();
        first.allocate();
        first.allocate();

        let mut second = SequenceAllocator::starting_at(first.peek());
        assert_eq!(second.allocate(), 3);
        assert_eq!(SequenceAllocator::starting_at(0).peek(), 1);
    }
}
