// NetPlan: Multilayer Network Planning and Traffic Consistency
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! # Network element identity
//!
//! Every element of the network plan has a stable id, which never changes and is never reused,
//! and a dense index, which is its position inside the owning container. Removing an element
//! shifts the index of every later element down by one. Therefore, indexes must never be cached
//! across a removal; all references between elements are ids.

use std::collections::HashMap;
use std::hash::Hash;

/// Ordered set of ids with O(1) id to index lookup. The index of an id is its position in the
/// insertion order, and removal compacts the indexes.
#[derive(Debug, Clone)]
pub struct IndexedSet<I: Copy + Eq + Hash> {
    order: Vec<I>,
    positions: HashMap<I, usize>,
}

impl<I: Copy + Eq + Hash> Default for IndexedSet<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Copy + Eq + Hash> IndexedSet<I> {
    /// Create an empty set
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the set is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns true if the id is part of the set
    pub fn contains(&self, id: &I) -> bool {
        self.positions.contains_key(id)
    }

    /// Returns the current index of the id
    pub fn index_of(&self, id: &I) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// Returns the id at the given index
    pub fn get(&self, index: usize) -> Option<I> {
        self.order.get(index).copied()
    }

    /// Iterate over all ids in index order
    pub fn iter(&self) -> impl Iterator<Item = I> + '_ {
        self.order.iter().copied()
    }

    /// Returns all ids in index order
    pub fn to_vec(&self) -> Vec<I> {
        self.order.clone()
    }

    /// Append the id at the end and return its index. If the id is already present, its current
    /// index is returned.
    pub fn push(&mut self, id: I) -> usize {
        if let Some(idx) = self.positions.get(&id) {
            return *idx;
        }
        let idx = self.order.len();
        self.order.push(id);
        self.positions.insert(id, idx);
        idx
    }

    /// Remove the id, returning the index it had. All later ids move one position down.
    pub fn remove(&mut self, id: &I) -> Option<usize> {
        let idx = self.positions.remove(id)?;
        self.order.remove(idx);
        for (i, later) in self.order.iter().enumerate().skip(idx) {
            self.positions.insert(*later, i);
        }
        Some(idx)
    }

    /// Checks that the position lookup matches the order.
    pub(crate) fn is_consistent(&self) -> bool {
        self.order.len() == self.positions.len()
            && self.order.iter().enumerate().all(|(i, id)| self.positions.get(id) == Some(&i))
    }
}

/// Indexed set, where each id owns an element.
#[derive(Debug, Clone)]
pub struct ElementStore<I: Copy + Eq + Hash, T> {
    index: IndexedSet<I>,
    data: HashMap<I, T>,
}

impl<I: Copy + Eq + Hash, T> Default for ElementStore<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Copy + Eq + Hash, T> ElementStore<I, T> {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            index: IndexedSet::new(),
            data: HashMap::new(),
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if the store is empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns true if the id is part of the store
    pub fn contains(&self, id: &I) -> bool {
        self.data.contains_key(id)
    }

    /// Insert a new element at the end and return its index.
    pub fn insert(&mut self, id: I, element: T) -> usize {
        self.data.insert(id, element);
        self.index.push(id)
    }

    /// Remove an element, compacting the indexes of all later elements.
    pub fn remove(&mut self, id: &I) -> Option<T> {
        self.index.remove(id)?;
        self.data.remove(id)
    }

    /// Get a reference to the element
    pub fn get(&self, id: &I) -> Option<&T> {
        self.data.get(id)
    }

    /// Get a mutable reference to the element
    pub fn get_mut(&mut self, id: &I) -> Option<&mut T> {
        self.data.get_mut(id)
    }

    /// Returns the current index of the element
    pub fn index_of(&self, id: &I) -> Option<usize> {
        self.index.index_of(id)
    }

    /// Returns the ids in index order
    pub fn ids(&self) -> impl Iterator<Item = I> + '_ {
        self.index.iter()
    }

    /// Iterate over all elements in index order
    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> + '_ {
        let data = &self.data;
        self.index.iter().filter_map(move |id| data.get(&id).map(|e| (id, e)))
    }

    /// Iterate over all elements mutably, in arbitrary order
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.data.values_mut()
    }

    pub(crate) fn is_consistent(&self) -> bool {
        self.index.is_consistent()
            && self.index.len() == self.data.len()
            && self.index.iter().all(|id| self.data.contains_key(&id))
    }
}
