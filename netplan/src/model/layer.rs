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

//! Module containing the network layer.

use crate::model::dag::Dag;
use crate::model::element::IndexedSet;
use crate::model::forwarding::ForwardingRules;
use crate::model::types::{
    DemandId, LayerId, LinkId, MulticastDemandId, MulticastTreeId, RouteId, RoutingType,
};

/// # Network Layer
///
/// A layer owns its links, demands, multicast demands, routes, and multicast trees (by id; the
/// elements themselves live in the [`NetPlan`](crate::model::NetPlan)). The position of an id in
/// the layer's sets is its index.
///
/// Depending on the routing type, the demands are either routed by routes (source routing) or
/// by the forwarding rules stored in the layer (hop-by-hop routing). Multicast demands are always
/// routed by multicast trees.
#[derive(Debug, Clone)]
pub struct NetworkLayer {
    pub(crate) id: LayerId,
    pub(crate) name: String,
    pub(crate) routing_type: RoutingType,
    pub(crate) demand_traffic_units: String,
    pub(crate) link_capacity_units: String,
    pub(crate) links: IndexedSet<LinkId>,
    pub(crate) demands: IndexedSet<DemandId>,
    pub(crate) multicast_demands: IndexedSet<MulticastDemandId>,
    pub(crate) routes: IndexedSet<RouteId>,
    pub(crate) multicast_trees: IndexedSet<MulticastTreeId>,
    pub(crate) forwarding: ForwardingRules,
    /// Demand aggregation graph: edge from upstream to downstream, weighted by the fraction.
    pub(crate) aggregation: Dag<DemandId, f64>,
}

impl NetworkLayer {
    pub(crate) fn new(
        id: LayerId,
        name: String,
        routing_type: RoutingType,
        demand_traffic_units: String,
        link_capacity_units: String,
    ) -> Self {
        Self {
            id,
            name,
            routing_type,
            demand_traffic_units,
            link_capacity_units,
            links: IndexedSet::new(),
            demands: IndexedSet::new(),
            multicast_demands: IndexedSet::new(),
            routes: IndexedSet::new(),
            multicast_trees: IndexedSet::new(),
            forwarding: ForwardingRules::default(),
            aggregation: Dag::new(),
        }
    }

    /// Id of the layer
    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Name of the layer
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Routing type of the layer
    pub fn routing_type(&self) -> RoutingType {
        self.routing_type
    }

    /// Name of the units of the demand traffic
    pub fn demand_traffic_units(&self) -> &str {
        &self.demand_traffic_units
    }

    /// Name of the units of the link capacity
    pub fn link_capacity_units(&self) -> &str {
        &self.link_capacity_units
    }

    /// Links of the layer, in index order
    pub fn links(&self) -> &IndexedSet<LinkId> {
        &self.links
    }

    /// Demands of the layer, in index order
    pub fn demands(&self) -> &IndexedSet<DemandId> {
        &self.demands
    }

    /// Multicast demands of the layer, in index order
    pub fn multicast_demands(&self) -> &IndexedSet<MulticastDemandId> {
        &self.multicast_demands
    }

    /// Routes of the layer, in index order
    pub fn routes(&self) -> &IndexedSet<RouteId> {
        &self.routes
    }

    /// Multicast trees of the layer, in index order
    pub fn multicast_trees(&self) -> &IndexedSet<MulticastTreeId> {
        &self.multicast_trees
    }

    /// Forwarding rules and carried traffic of the hop-by-hop routing
    pub fn forwarding_rules(&self) -> &ForwardingRules {
        &self.forwarding
    }

    /// Returns true if the layer contains no link, demand, or multicast demand
    pub fn is_empty(&self) -> bool {
        self.links.is_empty() && self.demands.is_empty() && self.multicast_demands.is_empty()
    }
}
