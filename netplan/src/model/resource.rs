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

//! Module containing the resources traversed by service chains.

use crate::model::types::{NodeId, ResourceId, RouteId};
use std::collections::BTreeSet;

/// # Resource
///
/// A typed resource (e.g. a virtual network function) hosted at a node. Service chain routes
/// traverse resources and occupy part of their capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub(crate) id: ResourceId,
    pub(crate) resource_type: String,
    pub(crate) name: String,
    pub(crate) host_node: NodeId,
    pub(crate) capacity: f64,
    pub(crate) capacity_units: String,
    pub(crate) processing_time_ms: f64,
    pub(crate) occupied_capacity: f64,
    pub(crate) traversing_routes: BTreeSet<RouteId>,
}

impl Resource {
    /// Id of the resource
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Type of the resource, matched against the mandatory resource types of a demand
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Name of the resource
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node hosting the resource
    pub fn host_node(&self) -> NodeId {
        self.host_node
    }

    /// Capacity of the resource
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Units of the capacity
    pub fn capacity_units(&self) -> &str {
        &self.capacity_units
    }

    /// Time a route spends in the resource, in ms
    pub fn processing_time_ms(&self) -> f64 {
        self.processing_time_ms
    }

    /// Capacity currently occupied by the traversing routes
    pub fn occupied_capacity(&self) -> f64 {
        self.occupied_capacity
    }

    /// Routes traversing this resource
    pub fn traversing_routes(&self) -> impl Iterator<Item = RouteId> + '_ {
        self.traversing_routes.iter().copied()
    }
}
