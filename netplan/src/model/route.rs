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

//! Module containing routes of source routing layers.

use crate::model::link::Link;
use crate::model::types::{
    DemandId, LayerId, LinkId, NodeId, PathElement, ResourceId, RouteId, RouteRole,
};
use itertools::Itertools;
use std::collections::{BTreeSet, HashMap};

/// # Route
///
/// A route carries traffic of a demand along a path of links, possibly interleaved with
/// resources (service chains). Each path element has its own occupied capacity.
///
/// A route is either a primary route, possibly with backup routes, or the backup of exactly one
/// primary route. Which routes carry traffic under failure is not decided by the route itself.
/// A route that traverses a failed link or node is down, and then carries no traffic and
/// occupies no capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub(crate) id: RouteId,
    pub(crate) layer: LayerId,
    pub(crate) demand: DemandId,
    pub(crate) path: Vec<PathElement>,
    pub(crate) carried_traffic_if_up: f64,
    pub(crate) occupied_if_up: Vec<f64>,
    pub(crate) role: RouteRole,
    pub(crate) backups: BTreeSet<RouteId>,
    /// failure state as currently applied to the caches of the traversed elements
    pub(crate) is_down: bool,
}

impl Route {
    /// Id of the route
    pub fn id(&self) -> RouteId {
        self.id
    }

    /// Layer of the route
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// Demand of the route
    pub fn demand(&self) -> DemandId {
        self.demand
    }

    /// Path of the route
    pub fn path(&self) -> &[PathElement] {
        &self.path
    }

    /// Links traversed by the route, in order
    pub fn links(&self) -> impl Iterator<Item = LinkId> + '_ {
        self.path.iter().filter_map(|e| e.link())
    }

    /// Resources traversed by the route, in order
    pub fn resources(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.path.iter().filter_map(|e| e.resource())
    }

    /// Traffic carried by the route in the current failure state
    pub fn carried_traffic(&self) -> f64 {
        if self.is_down {
            0.0
        } else {
            self.carried_traffic_if_up
        }
    }

    /// Traffic the route carries when it is up
    pub fn carried_traffic_if_up(&self) -> f64 {
        self.carried_traffic_if_up
    }

    /// Capacity occupied at each path element, in the current failure state
    pub fn occupied_capacity(&self) -> Vec<f64> {
        if self.is_down {
            vec![0.0; self.path.len()]
        } else {
            self.occupied_if_up.clone()
        }
    }

    /// Capacity occupied at each path element when the route is up
    pub fn occupied_capacity_if_up(&self) -> &[f64] {
        &self.occupied_if_up
    }

    /// Role of the route
    pub fn role(&self) -> RouteRole {
        self.role
    }

    /// Returns true if the route is a backup of another route
    pub fn is_backup_route(&self) -> bool {
        matches!(self.role, RouteRole::BackupOf(_))
    }

    /// Returns the primary route if this route is a backup route
    pub fn primary_route(&self) -> Option<RouteId> {
        match self.role {
            RouteRole::BackupOf(r) => Some(r),
            RouteRole::Primary => None,
        }
    }

    /// Returns true if the route has backup routes
    pub fn has_backup_routes(&self) -> bool {
        !self.backups.is_empty()
    }

    /// Backup routes of this route
    pub fn backup_routes(&self) -> impl Iterator<Item = RouteId> + '_ {
        self.backups.iter().copied()
    }

    /// Returns true if the route traverses a failed link, node, or resource host
    pub fn is_down(&self) -> bool {
        self.is_down
    }
}

/// Sequence of nodes visited by the links of a path. Returns an empty vector for a path without
/// links.
pub(crate) fn path_nodes(path: &[PathElement], links: &HashMap<LinkId, Link>) -> Vec<NodeId> {
    let path_links = path.iter().filter_map(|e| e.link()).filter_map(|l| links.get(&l));
    let mut nodes = Vec::new();
    for (i, link) in path_links.enumerate() {
        if i == 0 {
            nodes.push(link.origin);
        }
        nodes.push(link.destination);
    }
    nodes
}

/// Returns true if any link or any node appears twice in the path.
pub(crate) fn path_has_loops(path: &[PathElement], links: &HashMap<LinkId, Link>) -> bool {
    let path_links = path.iter().filter_map(|e| e.link()).collect::<Vec<_>>();
    let nodes = path_nodes(path, links);
    path_links.iter().unique().count() != path_links.len()
        || nodes.iter().unique().count() != nodes.len()
}
