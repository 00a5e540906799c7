use serde::Serialize;
use std::collections::VecDeque;
use tracing::trace;

/// Newest-first list that drops its oldest entry once full
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    entries: VecDeque<T>,
    capacity: usize,
    stats: HistoryStats,
}

/// Counters kept alongside a bounded history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    /// Entries ever inserted
    pub inserted: u64,
    /// Entries dropped to stay within capacity
    pub evicted: u64,
}

impl<T> BoundedHistory<T> {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            stats: HistoryStats::default(),
        }
    }

    /// Insert as the newest entry, returning the evicted oldest entry if any
    pub fn push(&mut self, entry: T) -> Option<T> {
        self.entries.push_front(entry);
        self.stats.inserted += 1;

        if self.entries.len() > self.capacity {
            self.stats.evicted += 1;
            trace!("History at capacity {}, evicting oldest entry", self.capacity);
            return self.entries.pop_back();
        }
        None
    }

    /// Insert several entries in order; the last one ends up newest
    pub fn push_batch<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let mut count = 0;
        for entry in entries {
            self.push(entry);
            count += 1;
        }
        count
    }

    pub fn newest(&self) -> Option<&T> {
        self.entries.front()
    }

    pub fn oldest(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Iterate newest-first
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> HistoryStats {
        self.stats
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Clone> BoundedHistory<T> {
    /// Copy of every entry, newest-first
    pub fn to_vec(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_orders_newest_first() {
        let mut history = BoundedHistory::new(3);
        history.push(1);
        history.push(2);

        assert_eq!(history.to_vec(), vec![2, 1]);
        assert_eq!(history.newest(), Some(&2));
        assert_eq!(history.oldest(), Some(&1));
    }

    #[test]
    fn test_wraparound_evicts_oldest() {
        let mut history = BoundedHistory::new(3);
        for i in 0..3 {
            assert_eq!(history.push(i), None);
        }
        assert_eq!(history.push(3), Some(0));
        assert_eq!(history.push(4), Some(1));

        assert_eq!(history.len(), 3);
        assert_eq!(history.to_vec(), vec![4, 3, 2]);
        assert_eq!(
            history.stats(),
            HistoryStats {
                inserted: 5,
                evicted: 2
            }
        );
    }

    #[test]
    fn test_batch_insert_keeps_last_as_newest() {
        let mut history = BoundedHistory::new(4);
        history.push(0);
        assert_eq!(history.push_batch(vec![1, 2, 3, 4]), 4);
        assert_eq!(history.to_vec(), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let mut history = BoundedHistory::new(0);
        assert_eq!(history.capacity(), 1);
        history.push("a");
        history.push("b");
        assert_eq!(history.to_vec(), vec!["b"]);
    }

    #[test]
    fn test_clear() {
        let mut history = BoundedHistory::new(2);
        history.push(1);
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.stats().inserted, 1);
    }
}
