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

//! # Source routing
//!
//! Routes and multicast trees, together with the caches they feed: the carried traffic and
//! occupied capacity of links and resources, and the carried traffic of unicast and multicast
//! demands.
//!
//! Each route and tree remembers whether it is currently down. This flag always reflects the
//! state applied to the caches: a route that is down has been subtracted from every element it
//! traverses.

use crate::model::network::NetPlan;
use crate::model::printer;
use crate::model::multicast::{validate_tree, MulticastTree};
use crate::model::route::{path_has_loops, path_nodes, Route};
use crate::model::types::{
    DemandId, LayerId, LinkId, MulticastDemandId, MulticastTreeId, NetPlanError, NodeId,
    PathElement, RouteId, RouteRole, RoutingCycleType, RoutingType,
};

use log::*;
use std::collections::BTreeSet;

impl NetPlan {
    // ---------------------------------------------------------------------------------------------
    // Routes
    // ---------------------------------------------------------------------------------------------

    /// Add a route to a demand of a source routing layer.
    ///
    /// The path must be a connected walk from the ingress to the egress node of the demand, where
    /// every resource is hosted at the node reached so far. The resources of the path must match
    /// the mandatory resource types of the demand, in order. If `occupied` is `None`, the route
    /// occupies `carried` on every path element.
    pub fn add_route<P, I>(
        &mut self,
        demand: DemandId,
        carried: f64,
        path: I,
        occupied: Option<Vec<f64>>,
    ) -> Result<RouteId, NetPlanError>
    where
        P: Into<PathElement>,
        I: IntoIterator<Item = P>,
    {
        self.check_is_modifiable()?;
        let path = path.into_iter().map(|e| e.into()).collect::<Vec<PathElement>>();
        let layer = self.get_demand(demand)?.layer;
        self.check_routing_type(layer, RoutingType::SourceRouting)?;
        let occupied = self.check_route_values(&path, carried, occupied)?;
        self.validate_path(demand, &path)?;

        let route = RouteId(self.next_id());
        for elem in path.iter() {
            self.set_traversal(*elem, route, true);
        }
        self.routes.insert(
            route,
            Route {
                id: route,
                layer,
                demand,
                path,
                carried_traffic_if_up: carried,
                occupied_if_up: occupied,
                role: RouteRole::Primary,
                backups: BTreeSet::new(),
                is_down: true,
            },
        );
        self.layer_mut(layer)?.routes.push(route);
        if let Some(d) = self.demands.get_mut(&demand) {
            d.routes.insert(route);
        }
        self.refresh_route_failure_state(route);
        debug!("Add route {}", printer::route(self, route)?);

        self.update_source_routing_demand(demand);
        self.propagate_carried_traffic_change(demand);
        self.after_mutation();
        Ok(route)
    }

    /// Remove a route. If the route is a primary route, all of its backup routes are removed as
    /// well. If it is a backup route, it is unlinked from its primary route.
    pub fn remove_route(&mut self, route: RouteId) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        self.get_route(route)?;
        debug!("Remove route {}", printer::route(self, route)?);
        if let Some(demand) = self.remove_route_unchecked(route) {
            self.propagate_carried_traffic_change(demand);
        }
        self.after_mutation();
        Ok(())
    }

    /// Remove a route (and its backups) without propagating the change of the demand. Returns the
    /// demand of the route.
    pub(crate) fn remove_route_unchecked(&mut self, route: RouteId) -> Option<DemandId> {
        let r = self.routes.get(&route)?;
        let demand = r.demand;
        let layer = r.layer;
        let backups = r.backups.iter().copied().collect::<Vec<_>>();
        let primary = r.primary_route();

        for b in backups {
            self.remove_route_unchecked(b);
        }
        if let Some(p) = primary.and_then(|p| self.routes.get_mut(&p)) {
            p.backups.remove(&route);
        }

        self.apply_route_contribution(route, -1.0);
        let r = self.routes.remove(&route)?;
        for elem in r.path.iter() {
            self.set_traversal(*elem, route, false);
        }
        if let Some(l) = self.layers.get_mut(&layer) {
            l.routes.remove(&route);
        }
        if let Some(d) = self.demands.get_mut(&demand) {
            d.routes.remove(&route);
        }
        self.update_source_routing_demand(demand);
        Some(demand)
    }

    /// Change the traffic carried by a route. If `occupied` is `None`, the route occupies
    /// `carried` on every path element.
    pub fn set_route_carried_traffic(
        &mut self,
        route: RouteId,
        carried: f64,
        occupied: Option<Vec<f64>>,
    ) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let r = self.get_route(route)?;
        let demand = r.demand;
        let occupied = self.check_route_values(&r.path, carried, occupied)?;

        self.apply_route_contribution(route, -1.0);
        if let Some(r) = self.routes.get_mut(&route) {
            r.carried_traffic_if_up = carried;
            r.occupied_if_up = occupied;
        }
        self.apply_route_contribution(route, 1.0);
        debug!("Set carried traffic of route {} to {}", printer::route(self, route)?, carried);

        self.update_source_routing_demand(demand);
        self.propagate_carried_traffic_change(demand);
        self.after_mutation();
        Ok(())
    }

    /// Change the path of a route. If `occupied` is `None`, the route occupies its carried
    /// traffic on every element of the new path.
    pub fn set_route_path<P, I>(
        &mut self,
        route: RouteId,
        path: I,
        occupied: Option<Vec<f64>>,
    ) -> Result<(), NetPlanError>
    where
        P: Into<PathElement>,
        I: IntoIterator<Item = P>,
    {
        self.check_is_modifiable()?;
        let path = path.into_iter().map(|e| e.into()).collect::<Vec<PathElement>>();
        let r = self.get_route(route)?;
        let demand = r.demand;
        let occupied = self.check_route_values(&path, r.carried_traffic_if_up, occupied)?;
        self.validate_path(demand, &path)?;

        self.apply_route_contribution(route, -1.0);
        let old_path = match self.routes.get_mut(&route) {
            Some(r) => {
                r.occupied_if_up = occupied;
                r.is_down = true;
                std::mem::replace(&mut r.path, path.clone())
            }
            None => return Err(NetPlanError::RouteNotFound(route)),
        };
        for elem in old_path {
            self.set_traversal(elem, route, false);
        }
        for elem in path {
            self.set_traversal(elem, route, true);
        }
        self.refresh_route_failure_state(route);
        debug!("Set path of route {}", printer::route(self, route)?);

        self.update_source_routing_demand(demand);
        self.propagate_carried_traffic_change(demand);
        self.after_mutation();
        Ok(())
    }

    /// Make `backup` a backup route of `primary`. Both routes must belong to the same demand,
    /// `primary` must not be a backup route itself, and `backup` must neither be a backup route
    /// already nor have backup routes of its own.
    pub fn add_backup_route(
        &mut self,
        primary: RouteId,
        backup: RouteId,
    ) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let p = self.get_route(primary)?;
        let b = self.get_route(backup)?;
        if primary == backup {
            return Err(NetPlanError::InvalidBackupRoute(backup, "a route cannot back up itself"));
        }
        if p.demand != b.demand {
            return Err(NetPlanError::InvalidBackupRoute(backup, "routes of different demands"));
        }
        if p.is_backup_route() {
            return Err(NetPlanError::InvalidBackupRoute(backup, "the primary is a backup route"));
        }
        if b.is_backup_route() {
            return Err(NetPlanError::InvalidBackupRoute(backup, "already a backup route"));
        }
        if b.has_backup_routes() {
            return Err(NetPlanError::InvalidBackupRoute(backup, "the route has backup routes"));
        }
        if let Some(b) = self.routes.get_mut(&backup) {
            b.role = RouteRole::BackupOf(primary);
        }
        if let Some(p) = self.routes.get_mut(&primary) {
            p.backups.insert(backup);
        }
        debug!("Route {:?} is now a backup of {:?}", backup, primary);
        self.after_mutation();
        Ok(())
    }

    /// Remove the backup relationship between `primary` and `backup`. The backup route itself is
    /// kept, as a primary route without backups.
    pub fn remove_backup_route(
        &mut self,
        primary: RouteId,
        backup: RouteId,
    ) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        self.get_route(primary)?;
        if self.get_route(backup)?.primary_route() != Some(primary) {
            return Err(NetPlanError::InvalidBackupRoute(backup, "not a backup of the primary"));
        }
        if let Some(b) = self.routes.get_mut(&backup) {
            b.role = RouteRole::Primary;
        }
        if let Some(p) = self.routes.get_mut(&primary) {
            p.backups.remove(&backup);
        }
        self.after_mutation();
        Ok(())
    }

    /// Returns true if the route is a backup route
    pub fn is_backup_route(&self, route: RouteId) -> Result<bool, NetPlanError> {
        Ok(self.get_route(route)?.is_backup_route())
    }

    /// Returns true if the route has backup routes
    pub fn has_backup_routes(&self, route: RouteId) -> Result<bool, NetPlanError> {
        Ok(self.get_route(route)?.has_backup_routes())
    }

    /// Primary route of a backup route
    pub fn get_primary_route(&self, route: RouteId) -> Result<Option<RouteId>, NetPlanError> {
        Ok(self.get_route(route)?.primary_route())
    }

    /// Backup routes of a primary route
    pub fn get_backup_routes(&self, route: RouteId) -> Result<Vec<RouteId>, NetPlanError> {
        Ok(self.get_route(route)?.backup_routes().collect())
    }

    /// Routes of a demand
    pub fn get_demand_routes(&self, demand: DemandId) -> Result<Vec<RouteId>, NetPlanError> {
        Ok(self.get_demand(demand)?.routes().collect())
    }

    /// Returns true if a link or a node appears twice in the route.
    pub fn route_has_loops(&self, route: RouteId) -> Result<bool, NetPlanError> {
        Ok(path_has_loops(&self.get_route(route)?.path, &self.links))
    }

    /// Returns true if the route traverses a failed link or node, or a resource hosted at a
    /// failed node.
    pub fn is_route_down(&self, route: RouteId) -> Result<bool, NetPlanError> {
        Ok(self.get_route(route)?.is_down)
    }

    /// Sequence of nodes visited by the route
    pub fn get_route_nodes(&self, route: RouteId) -> Result<Vec<NodeId>, NetPlanError> {
        Ok(path_nodes(&self.get_route(route)?.path, &self.links))
    }

    /// Total length of the links of the route in km
    pub fn get_route_length_km(&self, route: RouteId) -> Result<f64, NetPlanError> {
        let mut length = 0.0;
        for l in self.get_route(route)?.links() {
            length += self.get_link(l)?.length_km;
        }
        Ok(length)
    }

    /// Propagation delay of the route in ms, including the processing time of all traversed
    /// resources.
    pub fn get_route_propagation_delay_ms(&self, route: RouteId) -> Result<f64, NetPlanError> {
        let mut delay = 0.0;
        for elem in self.get_route(route)?.path.iter() {
            delay += match elem {
                PathElement::Link(l) => self.get_link(*l)?.propagation_delay_ms(),
                PathElement::Resource(r) => self.get_resource(*r)?.processing_time_ms,
            };
        }
        Ok(delay)
    }

    // ---------------------------------------------------------------------------------------------
    // Multicast trees
    // ---------------------------------------------------------------------------------------------

    /// Add a multicast tree carrying traffic of a multicast demand. The links must form a tree in
    /// the layer of the demand, rooted at its ingress node, whose leaves are exactly egress nodes,
    /// and which reaches all egress nodes. If `occupied` is `None`, the tree occupies `carried`
    /// on every link.
    pub fn add_multicast_tree(
        &mut self,
        demand: MulticastDemandId,
        carried: f64,
        occupied: Option<f64>,
        links: impl IntoIterator<Item = LinkId>,
    ) -> Result<MulticastTreeId, NetPlanError> {
        self.check_is_modifiable()?;
        let md = self.get_multicast_demand(demand)?;
        let layer = md.layer;
        let links = links.into_iter().collect::<BTreeSet<_>>();
        self.validate_tree_links(demand, &links)?;
        let occupied = occupied.unwrap_or(carried);
        if carried < 0.0 {
            return Err(NetPlanError::NegativeValue("carried traffic", carried));
        }
        if occupied < 0.0 {
            return Err(NetPlanError::NegativeValue("occupied capacity", occupied));
        }

        let tree = MulticastTreeId(self.next_id());
        for l in links.iter() {
            if let Some(link) = self.links.get_mut(l) {
                link.traversing_trees.insert(tree);
            }
        }
        self.multicast_trees.insert(
            tree,
            MulticastTree {
                id: tree,
                layer,
                demand,
                links,
                carried_traffic_if_up: carried,
                occupied_if_up: occupied,
                is_down: true,
            },
        );
        self.layer_mut(layer)?.multicast_trees.push(tree);
        if let Some(md) = self.multicast_demands.get_mut(&demand) {
            md.trees.insert(tree);
        }
        self.refresh_tree_failure_state(tree);
        debug!("Add multicast tree {:?} of {:?}", tree, demand);

        self.update_multicast_demand(demand);
        self.after_mutation();
        Ok(tree)
    }

    /// Remove a multicast tree
    pub fn remove_multicast_tree(&mut self, tree: MulticastTreeId) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        self.get_multicast_tree(tree)?;
        debug!("Remove multicast tree {:?}", tree);
        if let Some(md) = self.remove_multicast_tree_unchecked(tree) {
            self.update_multicast_demand(md);
        }
        self.after_mutation();
        Ok(())
    }

    /// Remove a tree, updating the link caches, but not the multicast demand. Returns the
    /// multicast demand of the tree.
    pub(crate) fn remove_multicast_tree_unchecked(
        &mut self,
        tree: MulticastTreeId,
    ) -> Option<MulticastDemandId> {
        self.apply_tree_contribution(tree, -1.0);
        let t = self.multicast_trees.remove(&tree)?;
        for l in t.links.iter() {
            if let Some(link) = self.links.get_mut(l) {
                link.traversing_trees.remove(&tree);
            }
        }
        if let Some(layer) = self.layers.get_mut(&t.layer) {
            layer.multicast_trees.remove(&tree);
        }
        if let Some(md) = self.multicast_demands.get_mut(&t.demand) {
            md.trees.remove(&tree);
        }
        self.update_multicast_demand(t.demand);
        Some(t.demand)
    }

    /// Change the traffic carried by a multicast tree
    pub fn set_multicast_tree_carried_traffic(
        &mut self,
        tree: MulticastTreeId,
        carried: f64,
        occupied: Option<f64>,
    ) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let demand = self.get_multicast_tree(tree)?.demand;
        let occupied = occupied.unwrap_or(carried);
        if carried < 0.0 {
            return Err(NetPlanError::NegativeValue("carried traffic", carried));
        }
        if occupied < 0.0 {
            return Err(NetPlanError::NegativeValue("occupied capacity", occupied));
        }
        self.apply_tree_contribution(tree, -1.0);
        if let Some(t) = self.multicast_trees.get_mut(&tree) {
            t.carried_traffic_if_up = carried;
            t.occupied_if_up = occupied;
        }
        self.apply_tree_contribution(tree, 1.0);
        self.update_multicast_demand(demand);
        self.after_mutation();
        Ok(())
    }

    /// Returns true if the tree traverses a failed link or node
    pub fn is_multicast_tree_down(&self, tree: MulticastTreeId) -> Result<bool, NetPlanError> {
        Ok(self.get_multicast_tree(tree)?.is_down)
    }

    // ---------------------------------------------------------------------------------------------
    // Cache maintenance
    // ---------------------------------------------------------------------------------------------

    pub(crate) fn check_routing_type(
        &self,
        layer: LayerId,
        expected: RoutingType,
    ) -> Result<(), NetPlanError> {
        if self.get_layer(layer)?.routing_type != expected {
            Err(NetPlanError::WrongRoutingType { layer, expected })
        } else {
            Ok(())
        }
    }

    /// Check the traffic values of a route, and expand the occupied capacity.
    fn check_route_values(
        &self,
        path: &[PathElement],
        carried: f64,
        occupied: Option<Vec<f64>>,
    ) -> Result<Vec<f64>, NetPlanError> {
        if carried < 0.0 {
            return Err(NetPlanError::NegativeValue("carried traffic", carried));
        }
        let occupied = occupied.unwrap_or_else(|| vec![carried; path.len()]);
        if occupied.len() != path.len() {
            return Err(NetPlanError::OccupationLength {
                expected: path.len(),
                found: occupied.len(),
            });
        }
        if let Some(o) = occupied.iter().find(|o| **o < 0.0) {
            return Err(NetPlanError::NegativeValue("occupied capacity", *o));
        }
        Ok(occupied)
    }

    /// Check that the path is a valid walk for the demand.
    pub(crate) fn validate_path(
        &self,
        demand: DemandId,
        path: &[PathElement],
    ) -> Result<(), NetPlanError> {
        let d = self.get_demand(demand)?;
        let mut current = d.ingress;
        let mut resource_types: Vec<&str> = Vec::new();
        for elem in path {
            match elem {
                PathElement::Link(l) => {
                    let link = self.get_link(*l)?;
                    if link.layer != d.layer {
                        return Err(NetPlanError::WrongLayer {
                            expected: d.layer,
                            found: link.layer,
                        });
                    }
                    if link.origin != current {
                        return Err(NetPlanError::InvalidPath(format!(
                            "link {} does not start at {}",
                            printer::link(self, *l)?,
                            self.get_node(current)?.name
                        )));
                    }
                    current = link.destination;
                }
                PathElement::Resource(r) => {
                    let res = self.get_resource(*r)?;
                    if res.host_node != current {
                        return Err(NetPlanError::InvalidPath(format!(
                            "resource {} is not hosted at {}",
                            res.name,
                            self.get_node(current)?.name
                        )));
                    }
                    resource_types.push(&res.resource_type);
                }
            }
        }
        if current != d.egress || path.iter().all(|e| e.link().is_none()) {
            return Err(NetPlanError::InvalidPath(format!(
                "path does not end at {}",
                self.get_node(d.egress)?.name
            )));
        }
        if resource_types.len() != d.mandatory_resource_types.len()
            || resource_types.iter().zip(d.mandatory_resource_types.iter()).any(|(a, b)| a != b)
        {
            return Err(NetPlanError::ServiceChainMismatch(demand));
        }
        Ok(())
    }

    fn validate_tree_links(
        &self,
        demand: MulticastDemandId,
        links: &BTreeSet<LinkId>,
    ) -> Result<(), NetPlanError> {
        let md = self.get_multicast_demand(demand)?;
        for l in links.iter() {
            let link = self.get_link(*l)?;
            if link.layer != md.layer {
                return Err(NetPlanError::WrongLayer {
                    expected: md.layer,
                    found: link.layer,
                });
            }
        }
        validate_tree(md.ingress, &md.egresses, links, &self.links)
    }

    fn set_traversal(&mut self, elem: PathElement, route: RouteId, traverses: bool) {
        match elem {
            PathElement::Link(l) => {
                if let Some(link) = self.links.get_mut(&l) {
                    if traverses {
                        link.traversing_routes.insert(route);
                    } else {
                        link.traversing_routes.remove(&route);
                    }
                }
            }
            PathElement::Resource(r) => {
                if let Some(res) = self.resources.get_mut(&r) {
                    if traverses {
                        res.traversing_routes.insert(route);
                    } else {
                        res.traversing_routes.remove(&route);
                    }
                }
            }
        }
    }

    /// Add (`sign = 1.0`) or subtract (`sign = -1.0`) the contribution of a route to the caches of
    /// the traversed elements. Routes which are down contribute nothing.
    fn apply_route_contribution(&mut self, route: RouteId, sign: f64) {
        let (path, carried, occupied) = match self.routes.get(&route) {
            Some(r) if !r.is_down => (
                r.path.clone(),
                r.carried_traffic_if_up,
                r.occupied_if_up.clone(),
            ),
            _ => return,
        };
        for (elem, occ) in path.into_iter().zip(occupied) {
            match elem {
                PathElement::Link(l) => {
                    if let Some(link) = self.links.get_mut(&l) {
                        link.carried_traffic += sign * carried;
                        link.occupied_capacity += sign * occ;
                    }
                }
                PathElement::Resource(r) => {
                    if let Some(res) = self.resources.get_mut(&r) {
                        res.occupied_capacity += sign * occ;
                    }
                }
            }
        }
    }

    fn apply_tree_contribution(&mut self, tree: MulticastTreeId, sign: f64) {
        let (links, carried, occupied) = match self.multicast_trees.get(&tree) {
            Some(t) if !t.is_down => (t.links.clone(), t.carried_traffic_if_up, t.occupied_if_up),
            _ => return,
        };
        for l in links {
            if let Some(link) = self.links.get_mut(&l) {
                link.carried_traffic += sign * carried;
                link.occupied_capacity += sign * occupied;
            }
        }
    }

    /// Returns true if any element of the path has failed.
    pub(crate) fn is_path_down(&self, path: &[PathElement]) -> bool {
        path.iter().any(|elem| match elem {
            PathElement::Link(l) => self
                .links
                .get(l)
                .map(|l| !self.is_link_usable(l))
                .unwrap_or(true),
            PathElement::Resource(r) => self
                .resources
                .get(r)
                .and_then(|r| self.nodes.get(&r.host_node))
                .map(|n| !n.is_up)
                .unwrap_or(true),
        })
    }

    /// Recompute whether the route is down, and update the caches if this changed. Returns true
    /// if the state changed.
    pub(crate) fn refresh_route_failure_state(&mut self, route: RouteId) -> bool {
        let (was_down, is_down) = match self.routes.get(&route) {
            Some(r) => (r.is_down, self.is_path_down(&r.path)),
            None => return false,
        };
        if was_down == is_down {
            return false;
        }
        if is_down {
            self.apply_route_contribution(route, -1.0);
        }
        if let Some(r) = self.routes.get_mut(&route) {
            r.is_down = is_down;
        }
        if !is_down {
            self.apply_route_contribution(route, 1.0);
        }
        true
    }

    /// Recompute whether the tree is down, and update the caches if this changed. Returns true if
    /// the state changed.
    pub(crate) fn refresh_tree_failure_state(&mut self, tree: MulticastTreeId) -> bool {
        let (was_down, is_down) = match self.multicast_trees.get(&tree) {
            Some(t) => (
                t.is_down,
                t.links
                    .iter()
                    .any(|l| self.links.get(l).map(|l| !self.is_link_usable(l)).unwrap_or(true)),
            ),
            None => return false,
        };
        if was_down == is_down {
            return false;
        }
        if is_down {
            self.apply_tree_contribution(tree, -1.0);
        }
        if let Some(t) = self.multicast_trees.get_mut(&tree) {
            t.is_down = is_down;
        }
        if !is_down {
            self.apply_tree_contribution(tree, 1.0);
        }
        true
    }

    /// Recompute the carried traffic and cycle type of a demand of a source routing layer from
    /// its routes.
    pub(crate) fn update_source_routing_demand(&mut self, demand: DemandId) {
        let (carried, has_loops) = match self.demands.get(&demand) {
            Some(d) => (
                d.routes
                    .iter()
                    .filter_map(|r| self.routes.get(r))
                    .map(|r| r.carried_traffic())
                    .sum(),
                d.routes
                    .iter()
                    .filter_map(|r| self.routes.get(r))
                    .any(|r| path_has_loops(&r.path, &self.links)),
            ),
            None => return,
        };
        if let Some(d) = self.demands.get_mut(&demand) {
            d.carried_traffic = carried;
            d.routing_cycle_type =
                if has_loops { RoutingCycleType::OpenCycles } else { RoutingCycleType::Loopless };
        }
    }

    /// Recompute the carried traffic of a multicast demand from its trees, and push it into the
    /// coupled upper layer links.
    pub(crate) fn update_multicast_demand(&mut self, demand: MulticastDemandId) {
        let carried = match self.multicast_demands.get(&demand) {
            Some(md) => md
                .trees
                .iter()
                .filter_map(|t| self.multicast_trees.get(t))
                .map(|t| t.carried_traffic())
                .sum(),
            None => return,
        };
        if let Some(md) = self.multicast_demands.get_mut(&demand) {
            md.carried_traffic = carried;
        }
        self.push_multicast_coupled_capacity(demand);
    }
}
