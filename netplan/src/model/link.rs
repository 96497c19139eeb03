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

//! Module containing the link of a layer.

use crate::model::types::{LayerId, LinkId, LowerLayerCoupling, MulticastTreeId, NodeId, RouteId};
use std::collections::BTreeSet;

/// Default propagation speed in km/s (speed of light in fiber)
pub const DEFAULT_PROPAGATION_SPEED_KM_PER_S: f64 = 200_000.0;

/// # Link
///
/// Directed link of a single layer. The carried traffic and the occupied capacity are caches,
/// updated by the routing engine whenever a route, multicast tree, or forwarding rule changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub(crate) id: LinkId,
    pub(crate) layer: LayerId,
    pub(crate) origin: NodeId,
    pub(crate) destination: NodeId,
    pub(crate) capacity: f64,
    pub(crate) length_km: f64,
    pub(crate) propagation_speed_km_per_s: f64,
    pub(crate) is_up: bool,
    pub(crate) carried_traffic: f64,
    pub(crate) occupied_capacity: f64,
    pub(crate) coupled_lower: Option<LowerLayerCoupling>,
    pub(crate) traversing_routes: BTreeSet<RouteId>,
    pub(crate) traversing_trees: BTreeSet<MulticastTreeId>,
}

impl Link {
    pub(crate) fn new(
        id: LinkId,
        layer: LayerId,
        origin: NodeId,
        destination: NodeId,
        capacity: f64,
        length_km: f64,
        propagation_speed_km_per_s: f64,
    ) -> Self {
        Self {
            id,
            layer,
            origin,
            destination,
            capacity,
            length_km,
            propagation_speed_km_per_s,
            is_up: true,
            carried_traffic: 0.0,
            occupied_capacity: 0.0,
            coupled_lower: None,
            traversing_routes: BTreeSet::new(),
            traversing_trees: BTreeSet::new(),
        }
    }

    /// Id of the link
    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Layer of the link
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// Origin node
    pub fn origin(&self) -> NodeId {
        self.origin
    }

    /// Destination node
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// Capacity in the link capacity units of the layer
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Length in km
    pub fn length_km(&self) -> f64 {
        self.length_km
    }

    /// Propagation speed in km/s
    pub fn propagation_speed_km_per_s(&self) -> f64 {
        self.propagation_speed_km_per_s
    }

    /// Propagation delay in ms. Links with infinite propagation speed have no delay.
    pub fn propagation_delay_ms(&self) -> f64 {
        if self.propagation_speed_km_per_s.is_infinite() {
            0.0
        } else {
            1000.0 * self.length_km / self.propagation_speed_km_per_s
        }
    }

    /// Returns false if the link has failed. This does not consider the state of the end nodes.
    pub fn is_up(&self) -> bool {
        self.is_up
    }

    /// Traffic currently carried by the link
    pub fn carried_traffic(&self) -> f64 {
        self.carried_traffic
    }

    /// Capacity currently occupied on the link
    pub fn occupied_capacity(&self) -> f64 {
        self.occupied_capacity
    }

    /// Occupied capacity divided by the capacity. A link without capacity has utilization 0 if
    /// unused, and infinity otherwise.
    pub fn utilization(&self) -> f64 {
        if self.capacity > 0.0 {
            self.occupied_capacity / self.capacity
        } else if self.occupied_capacity > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    }

    /// Lower layer element whose carried traffic dictates the capacity of this link
    pub fn coupled_lower_layer_element(&self) -> Option<LowerLayerCoupling> {
        self.coupled_lower
    }

    /// Returns true if the link is coupled to a lower layer demand or multicast demand.
    pub fn is_coupled(&self) -> bool {
        self.coupled_lower.is_some()
    }

    /// Routes traversing this link
    pub fn traversing_routes(&self) -> impl Iterator<Item = RouteId> + '_ {
        self.traversing_routes.iter().copied()
    }

    /// Multicast trees traversing this link
    pub fn traversing_multicast_trees(&self) -> impl Iterator<Item = MulticastTreeId> + '_ {
        self.traversing_trees.iter().copied()
    }
}
