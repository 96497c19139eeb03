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

//! Module containing the unicast demand.

use crate::model::types::{
    DemandId, IntendedRecoveryType, LayerId, LinkId, NodeId, RouteId, RoutingCycleType,
};
use std::collections::BTreeSet;

/// # Demand
///
/// Unicast traffic demand from an ingress to an egress node of a single layer.
///
/// The offered traffic stored here is only used while the demand is *independent*. As soon as the
/// demand is attached downstream of other demands (see
/// [`NetPlan::attach_to_aggregated_demands`](crate::model::NetPlan::attach_to_aggregated_demands)),
/// its offered traffic is derived from the carried traffic of its upstream demands, and can be
/// read with [`NetPlan::get_offered_traffic`](crate::model::NetPlan::get_offered_traffic).
#[derive(Debug, Clone, PartialEq)]
pub struct Demand {
    pub(crate) id: DemandId,
    pub(crate) layer: LayerId,
    pub(crate) ingress: NodeId,
    pub(crate) egress: NodeId,
    pub(crate) offered_traffic: f64,
    pub(crate) carried_traffic: f64,
    pub(crate) routing_cycle_type: RoutingCycleType,
    pub(crate) coupled_upper_link: Option<LinkId>,
    pub(crate) mandatory_resource_types: Vec<String>,
    pub(crate) recovery_type: IntendedRecoveryType,
    pub(crate) routes: BTreeSet<RouteId>,
}

impl Demand {
    pub(crate) fn new(
        id: DemandId,
        layer: LayerId,
        ingress: NodeId,
        egress: NodeId,
        offered_traffic: f64,
    ) -> Self {
        Self {
            id,
            layer,
            ingress,
            egress,
            offered_traffic,
            carried_traffic: 0.0,
            routing_cycle_type: RoutingCycleType::Loopless,
            coupled_upper_link: None,
            mandatory_resource_types: Vec::new(),
            recovery_type: IntendedRecoveryType::None,
            routes: BTreeSet::new(),
        }
    }

    /// Id of the demand
    pub fn id(&self) -> DemandId {
        self.id
    }

    /// Layer of the demand
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// Ingress node
    pub fn ingress(&self) -> NodeId {
        self.ingress
    }

    /// Egress node
    pub fn egress(&self) -> NodeId {
        self.egress
    }

    /// Traffic currently carried
    pub fn carried_traffic(&self) -> f64 {
        self.carried_traffic
    }

    /// Cycle classification of the current routing
    pub fn routing_cycle_type(&self) -> RoutingCycleType {
        self.routing_cycle_type
    }

    /// Upper layer link whose capacity equals the carried traffic of this demand
    pub fn coupled_upper_layer_link(&self) -> Option<LinkId> {
        self.coupled_upper_link
    }

    /// Returns true if the demand is coupled to an upper layer link
    pub fn is_coupled(&self) -> bool {
        self.coupled_upper_link.is_some()
    }

    /// Sequence of resource types each route must traverse (service chain). Empty for regular
    /// demands.
    pub fn mandatory_resource_types(&self) -> &[String] {
        &self.mandatory_resource_types
    }

    /// Returns true if the routes of this demand are service chains
    pub fn is_service_chain(&self) -> bool {
        !self.mandatory_resource_types.is_empty()
    }

    /// Intended recovery type (metadata only)
    pub fn intended_recovery_type(&self) -> IntendedRecoveryType {
        self.recovery_type
    }

    /// Routes of the demand (only in source routing layers)
    pub fn routes(&self) -> impl Iterator<Item = RouteId> + '_ {
        self.routes.iter().copied()
    }
}
