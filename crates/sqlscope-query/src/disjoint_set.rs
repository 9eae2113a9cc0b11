//! Disjoint-set forest over hashable values

use indexmap::IndexMap;
use std::hash::Hash;

/// Union-find keyed by value.
///
/// Groups come back in first-insertion order, members too.
#[derive(Debug, Clone)]
pub struct DisjointSet<T> {
    index: IndexMap<T, usize>,
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl<T: Hash + Eq + Clone> Default for DisjointSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq + Clone> DisjointSet<T> {
    pub fn new() -> Self {
        Self {
            index: IndexMap::new(),
            parent: Vec::new(),
            rank: Vec::new(),
        }
    }

    /// Add a singleton set; returns the item's slot
    pub fn insert(&mut self, item: T) -> usize {
        if let Some(&slot) = self.index.get(&item) {
            return slot;
        }
        let slot = self.parent.len();
        self.index.insert(item, slot);
        self.parent.push(slot);
        self.rank.push(0);
        slot
    }

    fn find(&mut self, mut slot: usize) -> usize {
        while self.parent[slot] != slot {
            self.parent[slot] = self.parent[self.parent[slot]];
            slot = self.parent[slot];
        }
        slot
    }

    /// Merge the sets of two items, inserting them if needed
    pub fn union(&mut self, a: T, b: T) {
        let a = self.insert(a);
        let b = self.insert(b);
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }

    /// Returns true if both items are known and in the same set
    pub fn same(&mut self, a: &T, b: &T) -> bool {
        match (self.index.get(a).copied(), self.index.get(b).copied()) {
            (Some(a), Some(b)) => self.find(a) == self.find(b),
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Every set, as lists of members
    pub fn groups(&mut self) -> Vec<Vec<T>> {
        let mut groups: IndexMap<usize, Vec<T>> = IndexMap::new();
        let items: Vec<(T, usize)> = self.index.iter().map(|(k, &v)| (k.clone(), v)).collect();
        for (item, slot) in items {
            let root = self.find(slot);
            groups.entry(root).or_default().push(item);
        }
        groups.into_values().collect()
    }
}
