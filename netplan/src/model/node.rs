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

//! Module containing the node of the network plan.

use crate::model::types::{DemandId, LayerId, LinkId, MulticastDemandId, NodeId, ResourceId};
use std::collections::{BTreeMap, BTreeSet};

/// Per-layer cache of incident elements
pub(crate) type LayerCache<T> = BTreeMap<LayerId, BTreeSet<T>>;

pub(crate) fn cache_insert<T: Ord>(cache: &mut LayerCache<T>, layer: LayerId, elem: T) {
    cache.entry(layer).or_insert_with(BTreeSet::new).insert(elem);
}

pub(crate) fn cache_remove<T: Ord>(cache: &mut LayerCache<T>, layer: LayerId, elem: &T) {
    if let Some(set) = cache.get_mut(&layer) {
        set.remove(elem);
        if set.is_empty() {
            cache.remove(&layer);
        }
    }
}

fn cache_get<T: Ord + Copy>(cache: &LayerCache<T>, layer: LayerId) -> Vec<T> {
    cache.get(&layer).map(|s| s.iter().copied().collect()).unwrap_or_default()
}

/// # Node
///
/// Nodes are shared by all layers. Each node caches, per layer, the links and demands that start
/// or end at it.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    pub(crate) position: (f64, f64),
    pub(crate) is_up: bool,
    pub(crate) out_links: LayerCache<LinkId>,
    pub(crate) in_links: LayerCache<LinkId>,
    pub(crate) out_demands: LayerCache<DemandId>,
    pub(crate) in_demands: LayerCache<DemandId>,
    pub(crate) out_multicast_demands: LayerCache<MulticastDemandId>,
    pub(crate) in_multicast_demands: LayerCache<MulticastDemandId>,
    pub(crate) resources: BTreeSet<ResourceId>,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: String, position: (f64, f64)) -> Self {
        Self {
            id,
            name,
            position,
            is_up: true,
            out_links: BTreeMap::new(),
            in_links: BTreeMap::new(),
            out_demands: BTreeMap::new(),
            in_demands: BTreeMap::new(),
            out_multicast_demands: BTreeMap::new(),
            in_multicast_demands: BTreeMap::new(),
            resources: BTreeSet::new(),
        }
    }

    /// Id of the node
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Name of the node
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position `(x, y)` of the node
    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    /// Returns false if the node has failed
    pub fn is_up(&self) -> bool {
        self.is_up
    }

    /// Links of the layer starting at this node
    pub fn outgoing_links(&self, layer: LayerId) -> Vec<LinkId> {
        cache_get(&self.out_links, layer)
    }

    /// Links of the layer ending at this node
    pub fn incoming_links(&self, layer: LayerId) -> Vec<LinkId> {
        cache_get(&self.in_links, layer)
    }

    /// Demands of the layer with this node as ingress
    pub fn outgoing_demands(&self, layer: LayerId) -> Vec<DemandId> {
        cache_get(&self.out_demands, layer)
    }

    /// Demands of the layer with this node as egress
    pub fn incoming_demands(&self, layer: LayerId) -> Vec<DemandId> {
        cache_get(&self.in_demands, layer)
    }

    /// Multicast demands of the layer with this node as ingress
    pub fn outgoing_multicast_demands(&self, layer: LayerId) -> Vec<MulticastDemandId> {
        cache_get(&self.out_multicast_demands, layer)
    }

    /// Multicast demands of the layer with this node as one of its egress nodes
    pub fn incoming_multicast_demands(&self, layer: LayerId) -> Vec<MulticastDemandId> {
        cache_get(&self.in_multicast_demands, layer)
    }

    /// Resources hosted at this node
    pub fn resources(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.resources.iter().copied()
    }

    /// Returns true if any element of any layer still references this node.
    pub fn is_referenced(&self) -> bool {
        !(self.out_links.is_empty()
            && self.in_links.is_empty()
            && self.out_demands.is_empty()
            && self.in_demands.is_empty()
            && self.out_multicast_demands.is_empty()
            && self.in_multicast_demands.is_empty()
            && self.resources.is_empty())
    }
}
