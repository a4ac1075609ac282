//! Recency lists.
//!
//! Each syntax category keeps a bounded list of the descriptors that resolved
//! most recently. Resolution tries those first, then the rest in registration
//! order, which keeps repeated lines of the same shape cheap: a recent hit
//! spares the attempts on every descriptor registered after it. Recency never
//! decides between two descriptors that would both match. The resolver still
//! checks the earlier registered ones and lets the first of them win.

use std::collections::VecDeque;

/// Syntax categories that keep their own recency list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Expression,
    Effect,
    Section,
    Event,
}

#[derive(Debug, Clone)]
pub struct RecentList {
    capacity: usize,
    entries: VecDeque<usize>,
}

impl RecentList {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: VecDeque::with_capacity(capacity) }
    }

    /// Move `index` to the front, evicting the oldest entry when full.
    pub fn acknowledge(&mut self, index: usize) {
        if self.capacity == 0 {
            return;
        }
        if let Some(at) = self.entries.iter().position(|&e| e == index) {
            self.entries.remove(at);
        }
        self.entries.push_front(index);
        self.entries.truncate(self.capacity);
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attempt order over `total` descriptors: recent ones first, then the
    /// remaining ones in registration order.
    pub fn order(&self, total: usize) -> Vec<usize> {
        let mut order: Vec<usize> = self.entries.iter().copied().filter(|&i| i < total).collect();
        order.extend((0..total).filter(|i| !self.entries.contains(i)));
        order
    }
}

/// One recency list per category, owned by a parser handle.
#[derive(Debug, Clone)]
pub struct RecentLists {
    pub expressions: RecentList,
    pub effects: RecentList,
    pub sections: RecentList,
    pub events: RecentList,
}

impl RecentLists {
    pub fn new(capacity: usize) -> Self {
        Self {
            expressions: RecentList::new(capacity),
            effects: RecentList::new(capacity),
            sections: RecentList::new(capacity),
            events: RecentList::new(capacity),
        }
    }

    pub fn get(&self, category: Category) -> &RecentList {
        match category {
            Category::Expression => &self.expressions,
            Category::Effect => &self.effects,
            Category::Section => &self.sections,
            Category::Event => &self.events,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut RecentList {
        match category {
            Category::Expression => &mut self.expressions,
            Category::Effect => &mut self.effects,
            Category::Section => &mut self.sections,
            Category::Event => &mut self.events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acknowledge_moves_to_front_and_evicts() {
        let mut recent = RecentList::new(2);
        recent.acknowledge(3);
        recent.acknowledge(1);
        recent.acknowledge(3);
        assert_eq!(recent.iter().collect::<Vec<_>>(), vec![3, 1]);
        recent.acknowledge(0);
        assert_eq!(recent.iter().collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn order_puts_recent_first_without_duplicates() {
        let mut recent = RecentList::new(4);
        recent.acknowledge(2);
        recent.acknowledge(4);
        assert_eq!(recent.order(5), vec![4, 2, 0, 1, 3]);
        // Stale indices beyond the registry are skipped.
        assert_eq!(recent.order(3), vec![2, 0, 1]);
    }

    #[test]
    fn zero_capacity_never_remembers() {
        let mut recent = RecentList::new(0);
        recent.acknowledge(1);
        assert!(recent.is_empty());
        assert_eq!(recent.order(2), vec![0, 1]);
    }
}
