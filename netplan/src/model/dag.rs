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

//! # Directed acyclic graph
//!
//! Adjacency-list based DAG with weighted edges. Edge insertion checks reachability first and
//! rejects every edge that would close a cycle, so the graph is acyclic at all times. It is used
//! for the layer coupling graph (edge weight: the coupled element pairs) and for the demand
//! aggregation graph of a layer (edge weight: the fraction of the upstream traffic).

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use thiserror::Error;

/// Errors when modifying a DAG
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum DagError {
    /// Adding the edge would create a cycle
    #[error("Adding the edge would create a cycle")]
    Cycle,
}

/// Directed acyclic graph with vertices of type `K` and edge weights of type `W`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dag<K: Ord + Copy, W> {
    children: BTreeMap<K, BTreeMap<K, W>>,
    parents: BTreeMap<K, BTreeSet<K>>,
}

impl<K: Ord + Copy, W> Default for Dag<K, W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Copy, W> Dag<K, W> {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            children: BTreeMap::new(),
            parents: BTreeMap::new(),
        }
    }

    /// Add a vertex without any edges. Nothing happens if it already exists.
    pub fn add_vertex(&mut self, v: K) {
        self.children.entry(v).or_insert_with(BTreeMap::new);
        self.parents.entry(v).or_insert_with(BTreeSet::new);
    }

    /// Returns true if the vertex exists
    pub fn contains_vertex(&self, v: K) -> bool {
        self.children.contains_key(&v)
    }

    /// Remove a vertex together with all its edges, returning the removed outgoing edges.
    pub fn remove_vertex(&mut self, v: K) -> BTreeMap<K, W> {
        let out = self.children.remove(&v).unwrap_or_default();
        for child in out.keys() {
            if let Some(p) = self.parents.get_mut(child) {
                p.remove(&v);
            }
        }
        for parent in self.parents.remove(&v).unwrap_or_default() {
            if let Some(c) = self.children.get_mut(&parent) {
                c.remove(&v);
            }
        }
        out
    }

    /// Add an edge from `from` to `to`, inserting the vertices if they don't exist. If the edge
    /// already exists, its weight is replaced. Fails, without modifying the graph, if the edge
    /// would create a cycle.
    pub fn add_edge(&mut self, from: K, to: K, weight: W) -> Result<(), DagError> {
        if !self.has_edge(from, to) && (from == to || self.is_ancestor(to, from)) {
            return Err(DagError::Cycle);
        }
        self.add_vertex(from);
        self.add_vertex(to);
        self.children.entry(from).or_insert_with(BTreeMap::new).insert(to, weight);
        self.parents.entry(to).or_insert_with(BTreeSet::new).insert(from);
        Ok(())
    }

    /// Returns true if the edge could be inserted without creating a cycle.
    pub fn can_add_edge(&self, from: K, to: K) -> bool {
        self.has_edge(from, to) || (from != to && !self.is_ancestor(to, from))
    }

    /// Remove an edge, returning its weight
    pub fn remove_edge(&mut self, from: K, to: K) -> Option<W> {
        let w = self.children.get_mut(&from)?.remove(&to)?;
        if let Some(p) = self.parents.get_mut(&to) {
            p.remove(&from);
        }
        Some(w)
    }

    /// Returns true if the edge exists
    pub fn has_edge(&self, from: K, to: K) -> bool {
        self.children.get(&from).map(|c| c.contains_key(&to)).unwrap_or(false)
    }

    /// Weight of an edge
    pub fn edge(&self, from: K, to: K) -> Option<&W> {
        self.children.get(&from)?.get(&to)
    }

    /// Mutable weight of an edge
    pub fn edge_mut(&mut self, from: K, to: K) -> Option<&mut W> {
        self.children.get_mut(&from)?.get_mut(&to)
    }

    /// Outgoing edges of a vertex
    pub fn children(&self, v: K) -> impl Iterator<Item = (K, &W)> + '_ {
        self.children.get(&v).into_iter().flat_map(|c| c.iter().map(|(k, w)| (*k, w)))
    }

    /// Vertices with an edge towards `v`
    pub fn parents(&self, v: K) -> impl Iterator<Item = K> + '_ {
        self.parents.get(&v).into_iter().flat_map(|p| p.iter().copied())
    }

    /// Iterate over all edges
    pub fn edges(&self) -> impl Iterator<Item = (K, K, &W)> + '_ {
        self.children.iter().flat_map(|(from, c)| c.iter().map(move |(to, w)| (*from, *to, w)))
    }

    /// All vertices
    pub fn vertices(&self) -> impl Iterator<Item = K> + '_ {
        self.children.keys().copied()
    }

    /// Returns true if `a` is a (transitive) ancestor of `b`, or `a == b`.
    pub fn is_ancestor(&self, a: K, b: K) -> bool {
        if a == b {
            return true;
        }
        let mut visited: BTreeSet<K> = BTreeSet::new();
        let mut queue: VecDeque<K> = self.parents(b).collect();
        while let Some(v) = queue.pop_front() {
            if v == a {
                return true;
            }
            if visited.insert(v) {
                queue.extend(self.parents(v));
            }
        }
        false
    }

    /// All transitive ancestors of `v`, excluding `v` itself.
    pub fn ancestors(&self, v: K) -> BTreeSet<K> {
        let mut visited: BTreeSet<K> = BTreeSet::new();
        let mut queue: VecDeque<K> = self.parents(v).collect();
        while let Some(x) = queue.pop_front() {
            if visited.insert(x) {
                queue.extend(self.parents(x));
            }
        }
        visited
    }

    /// All transitive descendants of `v`, excluding `v` itself.
    pub fn descendants(&self, v: K) -> BTreeSet<K> {
        let mut visited: BTreeSet<K> = BTreeSet::new();
        let mut queue: VecDeque<K> = self.children(v).map(|(c, _)| c).collect();
        while let Some(x) = queue.pop_front() {
            if visited.insert(x) {
                queue.extend(self.children(x).map(|(c, _)| c));
            }
        }
        visited
    }

    /// Returns `v` followed by all its descendants, in topological order (every vertex appears
    /// after all of its ancestors that are part of the returned set).
    pub fn topological_order_from(&self, v: K) -> Vec<K> {
        let mut subset = self.descendants(v);
        subset.insert(v);

        let mut in_degree: BTreeMap<K, usize> = subset
            .iter()
            .map(|x| (*x, self.parents(*x).filter(|p| subset.contains(p)).count()))
            .collect();
        let mut queue: VecDeque<K> =
            in_degree.iter().filter(|(_, d)| **d == 0).map(|(x, _)| *x).collect();
        let mut order = Vec::with_capacity(subset.len());

        while let Some(x) = queue.pop_front() {
            order.push(x);
            for (child, _) in self.children(x) {
                if let Some(d) = in_degree.get_mut(&child) {
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(child);
                    }
                }
            }
        }
        debug_assert_eq!(order.len(), subset.len(), "cycle in a DAG");
        order
    }

    /// Checks that the parent lookup matches the children, and that there is no cycle.
    pub(crate) fn is_consistent(&self) -> bool {
        let parents_ok = self.children.iter().all(|(from, c)| {
            c.keys().all(|to| self.parents.get(to).map(|p| p.contains(from)).unwrap_or(false))
        }) && self.parents.iter().all(|(to, p)| p.iter().all(|from| self.has_edge(*from, *to)));
        let acyclic = self.edges().all(|(from, to, _)| !self.descendants(to).contains(&from));
        parents_ok && acyclic
    }
}
