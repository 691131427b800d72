use std::collections::VecDeque;

/// Locators waiting to be resolved into images.
///
/// A refill replaces the whole content instead of appending, so repeated failed
/// queries can never grow the queue. Every replace or invalidate bumps the
/// generation, which identifies one queue "instance".
#[derive(Debug, Default)]
pub struct SourceQueue<L> {
    items: VecDeque<L>,
    generation: u64,
}

impl<L> SourceQueue<L> {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
            generation: 0,
        }
    }

    /// Drop stale entries and enqueue `locators` in order.
    pub fn replace(&mut self, locators: Vec<L>) {
        self.items.clear();
        self.items.extend(locators);
        self.generation += 1;
    }

    /// Empty the queue so the next pop forces a refill.
    pub fn invalidate(&mut self) {
        self.items.clear();
        self.generation += 1;
    }

    /// Remove the next locator; it is never handed out again by this instance.
    pub fn pop(&mut self) -> Option<L> {
        self.items.pop_front()
    }

    /// Keep only the locators matching `keep`, order preserved.
    pub fn retain(&mut self, keep: impl FnMut(&L) -> bool) {
        self.items.retain(keep);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn iter(&self) -> impl Iterator<Item = &L> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_clears_stale_entries() {
        let mut queue = SourceQueue::new();
        queue.replace(vec![1, 2, 3]);
        assert_eq!(queue.pop(), Some(1));
        queue.replace(vec![7]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop(), Some(7));
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.generation(), 2);
    }

    #[test]
    fn test_invalidate() {
        let mut queue = SourceQueue::new();
        queue.replace(vec!["a", "b"]);
        queue.invalidate();
        assert!(queue.is_empty());
        assert_eq!(queue.generation(), 2);
    }
}
