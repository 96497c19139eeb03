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

//! Module containing multicast demands and multicast trees.

use crate::model::link::Link;
use crate::model::types::{
    LayerId, LinkId, MulticastDemandId, MulticastTreeId, NetPlanError, NodeId,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// # Multicast Demand
///
/// One-to-many traffic demand from an ingress node to a set of egress nodes. Its traffic is
/// carried by multicast trees. A multicast demand can be coupled to a set of upper layer links,
/// one per egress node, each going from the ingress to that egress node.
#[derive(Debug, Clone, PartialEq)]
pub struct MulticastDemand {
    pub(crate) id: MulticastDemandId,
    pub(crate) layer: LayerId,
    pub(crate) ingress: NodeId,
    pub(crate) egresses: BTreeSet<NodeId>,
    pub(crate) offered_traffic: f64,
    pub(crate) carried_traffic: f64,
    pub(crate) coupled_upper_links: BTreeMap<NodeId, LinkId>,
    pub(crate) trees: BTreeSet<MulticastTreeId>,
}

impl MulticastDemand {
    /// Id of the multicast demand
    pub fn id(&self) -> MulticastDemandId {
        self.id
    }

    /// Layer of the multicast demand
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// Ingress node
    pub fn ingress(&self) -> NodeId {
        self.ingress
    }

    /// Egress nodes
    pub fn egresses(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.egresses.iter().copied()
    }

    /// Offered traffic
    pub fn offered_traffic(&self) -> f64 {
        self.offered_traffic
    }

    /// Traffic currently carried by all trees
    pub fn carried_traffic(&self) -> f64 {
        self.carried_traffic
    }

    /// Offered traffic not carried
    pub fn blocked_traffic(&self) -> f64 {
        (self.offered_traffic - self.carried_traffic).max(0.0)
    }

    /// Upper layer links coupled to this demand, by egress node
    pub fn coupled_upper_layer_links(&self) -> &BTreeMap<NodeId, LinkId> {
        &self.coupled_upper_links
    }

    /// Returns true if the multicast demand is coupled to upper layer links
    pub fn is_coupled(&self) -> bool {
        !self.coupled_upper_links.is_empty()
    }

    /// Trees of the multicast demand
    pub fn multicast_trees(&self) -> impl Iterator<Item = MulticastTreeId> + '_ {
        self.trees.iter().copied()
    }
}

/// # Multicast Tree
///
/// Set of links forming a tree rooted at the ingress node of the multicast demand, reaching all
/// of its egress nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct MulticastTree {
    pub(crate) id: MulticastTreeId,
    pub(crate) layer: LayerId,
    pub(crate) demand: MulticastDemandId,
    pub(crate) links: BTreeSet<LinkId>,
    pub(crate) carried_traffic_if_up: f64,
    pub(crate) occupied_if_up: f64,
    pub(crate) is_down: bool,
}

impl MulticastTree {
    /// Id of the tree
    pub fn id(&self) -> MulticastTreeId {
        self.id
    }

    /// Layer of the tree
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// Multicast demand of the tree
    pub fn demand(&self) -> MulticastDemandId {
        self.demand
    }

    /// Links of the tree
    pub fn links(&self) -> impl Iterator<Item = LinkId> + '_ {
        self.links.iter().copied()
    }

    /// Traffic carried in the current failure state
    pub fn carried_traffic(&self) -> f64 {
        if self.is_down {
            0.0
        } else {
            self.carried_traffic_if_up
        }
    }

    /// Capacity occupied on every link, in the current failure state
    pub fn occupied_capacity(&self) -> f64 {
        if self.is_down {
            0.0
        } else {
            self.occupied_if_up
        }
    }

    /// Traffic carried when the tree is up
    pub fn carried_traffic_if_up(&self) -> f64 {
        self.carried_traffic_if_up
    }

    /// Returns true if any link or node of the tree has failed
    pub fn is_down(&self) -> bool {
        self.is_down
    }
}

/// Checks that the links form a tree rooted at `ingress` whose leaves are egress nodes, and that
/// every egress node is reached.
pub(crate) fn validate_tree(
    ingress: NodeId,
    egresses: &BTreeSet<NodeId>,
    tree_links: &BTreeSet<LinkId>,
    links: &HashMap<LinkId, Link>,
) -> Result<(), NetPlanError> {
    let mut out_links: BTreeMap<NodeId, Vec<&Link>> = BTreeMap::new();
    let mut in_degree: BTreeMap<NodeId, usize> = BTreeMap::new();
    for l in tree_links {
        let link = links.get(l).ok_or(NetPlanError::LinkNotFound(*l))?;
        out_links.entry(link.origin).or_insert_with(Vec::new).push(link);
        *in_degree.entry(link.destination).or_insert(0) += 1;
    }
    if in_degree.values().any(|d| *d > 1) {
        return Err(NetPlanError::InvalidMulticastTree("a node has two incoming links".into()));
    }
    if in_degree.contains_key(&ingress) {
        return Err(NetPlanError::InvalidMulticastTree("the ingress has an incoming link".into()));
    }

    // traverse the tree from the ingress
    let mut reached: BTreeSet<NodeId> = BTreeSet::new();
    let mut visited_links = 0;
    let mut queue: VecDeque<NodeId> = VecDeque::from(vec![ingress]);
    while let Some(n) = queue.pop_front() {
        reached.insert(n);
        for link in out_links.get(&n).into_iter().flatten() {
            visited_links += 1;
            queue.push_back(link.destination);
        }
    }
    if visited_links != tree_links.len() {
        return Err(NetPlanError::InvalidMulticastTree("links not reachable from ingress".into()));
    }
    if !egresses.is_subset(&reached) {
        return Err(NetPlanError::InvalidMulticastTree("not all egress nodes are reached".into()));
    }
    let leaves_are_egresses = reached
        .iter()
        .filter(|n| **n != ingress && !out_links.contains_key(n))
        .all(|n| egresses.contains(n));
    if !leaves_are_egresses {
        return Err(NetPlanError::InvalidMulticastTree("a leaf is not an egress node".into()));
    }
    Ok(())
}
