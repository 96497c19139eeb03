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

//! # Cache consistency checker
//!
//! Recomputes every cache of the network plan from scratch, and compares it to the stored value.
//! [`NetPlan::validate_caches`] returns the first violation, while
//! [`NetPlan::check_caches_consistency`] panics on it. If [`NetPlanConfig::check_consistency`]
//! is set, the check runs after every mutation.
//!
//! [`NetPlanConfig::check_consistency`]: crate::model::NetPlanConfig::check_consistency

use crate::model::network::NetPlan;
use crate::model::node::{cache_insert, LayerCache};
use crate::model::types::{
    DemandId, LayerId, LinkId, LowerLayerCoupling, MulticastDemandId, NodeId, PathElement,
    ResourceId, RouteId, RouteRole, RoutingType,
};

use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

/// A cache of the network plan does not match the value recomputed from scratch.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum ConsistencyError {
    /// The id or index structures of a container are broken
    #[error("Index structure is broken: {0}")]
    Index(String),
    /// Element refers to an element which does not exist, or which does not refer back
    #[error("Dangling reference: {0}")]
    Reference(String),
    /// The incidence caches of a node are wrong
    #[error("Incidence cache of node {0:?} is wrong")]
    NodeCache(NodeId),
    /// Carried traffic or occupied capacity of a link is wrong
    #[error("Link {link:?}: cached {what} is {found}, expected {expected}")]
    LinkTraffic {
        /// Link
        link: LinkId,
        /// Which value
        what: &'static str,
        /// Recomputed value
        expected: f64,
        /// Cached value
        found: f64,
    },
    /// Carried traffic of a demand is wrong
    #[error("Demand {demand:?}: cached carried traffic is {found}, expected {expected}")]
    DemandTraffic {
        /// Demand
        demand: DemandId,
        /// Recomputed value
        expected: f64,
        /// Cached value
        found: f64,
    },
    /// Routing cycle type of a demand is wrong
    #[error("Demand {0:?} has the wrong routing cycle type")]
    RoutingCycleType(DemandId),
    /// Carried traffic of a multicast demand is wrong
    #[error("Multicast demand {demand:?}: cached carried traffic is {found}, expected {expected}")]
    MulticastTraffic {
        /// Multicast demand
        demand: MulticastDemandId,
        /// Recomputed value
        expected: f64,
        /// Cached value
        found: f64,
    },
    /// Occupied capacity of a resource is wrong
    #[error("Resource {resource:?}: cached occupied capacity is {found}, expected {expected}")]
    ResourceOccupation {
        /// Resource
        resource: ResourceId,
        /// Recomputed value
        expected: f64,
        /// Cached value
        found: f64,
    },
    /// Failure state of a route does not match the traversed elements
    #[error("Route {0:?} has the wrong failure state")]
    RouteFailureState(RouteId),
    /// Backup relationship is broken
    #[error("Backup relationship of route {0:?} is broken")]
    BackupRoute(RouteId),
    /// Routing elements do not match the routing type of the layer
    #[error("Layer {0:?} contains routing elements of the wrong routing type")]
    RoutingType(LayerId),
    /// Forwarding rules are invalid
    #[error("Forwarding rules of demand {0:?} are invalid")]
    ForwardingRules(DemandId),
    /// Coupling state is broken
    #[error("Coupling is broken: {0}")]
    Coupling(String),
    /// Demand aggregation is broken
    #[error("Demand aggregation is broken: {0}")]
    Aggregation(String),
}

impl NetPlan {
    /// Recompute every cache, and compare it to the stored value. Returns the first violation.
    pub fn validate_caches(&self) -> Result<(), ConsistencyError> {
        self.validate_indexes()?;
        self.validate_node_caches()?;
        self.validate_routes()?;
        self.validate_hop_by_hop()?;
        self.validate_link_caches()?;
        self.validate_resource_caches()?;
        self.validate_multicast()?;
        self.validate_coupling()?;
        self.validate_aggregation()?;
        Ok(())
    }

    /// Recompute every cache, and panic if any of them does not match the stored value.
    pub fn check_caches_consistency(&self) {
        if let Err(e) = self.validate_caches() {
            panic!("Cache consistency check failed: {}", e);
        }
    }

    /// Called at the end of every successful mutation.
    pub(crate) fn after_mutation(&self) {
        if self.config.check_consistency {
            self.check_caches_consistency();
        }
    }

    fn differs(&self, a: f64, b: f64) -> bool {
        (a - b).abs() > self.config.precision_factor * b.abs().max(1.0)
    }

    fn validate_indexes(&self) -> Result<(), ConsistencyError> {
        if !self.nodes.is_consistent()
            || !self.resources.is_consistent()
            || !self.layers.is_consistent()
        {
            return Err(ConsistencyError::Index("global element store".to_string()));
        }
        if !self.layers.contains(&self.default_layer) {
            return Err(ConsistencyError::Index("default layer does not exist".to_string()));
        }
        let (mut links, mut demands, mut multicast, mut routes, mut trees) = (0, 0, 0, 0, 0);
        for (id, layer) in self.layers.iter() {
            let structures_ok = layer.links.is_consistent()
                && layer.demands.is_consistent()
                && layer.multicast_demands.is_consistent()
                && layer.routes.is_consistent()
                && layer.multicast_trees.is_consistent();
            if !structures_ok || layer.id != id {
                return Err(ConsistencyError::Index(format!("layer {}", layer.name)));
            }
            let wrong_layer = layer
                .links
                .iter()
                .any(|l| self.links.get(&l).map(|l| l.layer) != Some(id))
                || layer.demands.iter().any(|d| self.demands.get(&d).map(|d| d.layer) != Some(id))
                || layer
                    .multicast_demands
                    .iter()
                    .any(|d| self.multicast_demands.get(&d).map(|d| d.layer) != Some(id))
                || layer.routes.iter().any(|r| self.routes.get(&r).map(|r| r.layer) != Some(id))
                || layer
                    .multicast_trees
                    .iter()
                    .any(|t| self.multicast_trees.get(&t).map(|t| t.layer) != Some(id));
            if wrong_layer {
                return Err(ConsistencyError::Reference(format!("element of layer {}", layer.name)));
            }
            links += layer.links.len();
            demands += layer.demands.len();
            multicast += layer.multicast_demands.len();
            routes += layer.routes.len();
            trees += layer.multicast_trees.len();
        }
        if links != self.links.len()
            || demands != self.demands.len()
            || multicast != self.multicast_demands.len()
            || routes != self.routes.len()
            || trees != self.multicast_trees.len()
        {
            return Err(ConsistencyError::Index("element not part of any layer".to_string()));
        }
        Ok(())
    }

    fn validate_node_caches(&self) -> Result<(), ConsistencyError> {
        let mut out_links: HashMap<NodeId, LayerCache<LinkId>> = HashMap::new();
        let mut in_links: HashMap<NodeId, LayerCache<LinkId>> = HashMap::new();
        let mut out_demands: HashMap<NodeId, LayerCache<DemandId>> = HashMap::new();
        let mut in_demands: HashMap<NodeId, LayerCache<DemandId>> = HashMap::new();
        let mut out_multicast: HashMap<NodeId, LayerCache<MulticastDemandId>> = HashMap::new();
        let mut in_multicast: HashMap<NodeId, LayerCache<MulticastDemandId>> = HashMap::new();
        let mut resources: HashMap<NodeId, BTreeSet<ResourceId>> = HashMap::new();

        for (id, l) in self.links.iter() {
            cache_insert(out_links.entry(l.origin).or_default(), l.layer, *id);
            cache_insert(in_links.entry(l.destination).or_default(), l.layer, *id);
        }
        for (id, d) in self.demands.iter() {
            cache_insert(out_demands.entry(d.ingress).or_default(), d.layer, *id);
            cache_insert(in_demands.entry(d.egress).or_default(), d.layer, *id);
        }
        for (id, md) in self.multicast_demands.iter() {
            cache_insert(out_multicast.entry(md.ingress).or_default(), md.layer, *id);
            for e in md.egresses.iter() {
                cache_insert(in_multicast.entry(*e).or_default(), md.layer, *id);
            }
        }
        for (id, r) in self.resources.iter() {
            resources.entry(r.host_node).or_default().insert(id);
        }

        let referenced = out_links
            .keys()
            .chain(in_links.keys())
            .chain(out_demands.keys())
            .chain(in_demands.keys())
            .chain(out_multicast.keys())
            .chain(in_multicast.keys())
            .chain(resources.keys());
        for n in referenced {
            if !self.nodes.contains(n) {
                return Err(ConsistencyError::Reference(format!("node {:?} does not exist", n)));
            }
        }

        for (id, node) in self.nodes.iter() {
            let matches = node.out_links == out_links.remove(&id).unwrap_or_default()
                && node.in_links == in_links.remove(&id).unwrap_or_default()
                && node.out_demands == out_demands.remove(&id).unwrap_or_default()
                && node.in_demands == in_demands.remove(&id).unwrap_or_default()
                && node.out_multicast_demands == out_multicast.remove(&id).unwrap_or_default()
                && node.in_multicast_demands == in_multicast.remove(&id).unwrap_or_default()
                && node.resources == resources.remove(&id).unwrap_or_default();
            if !matches || node.id != id {
                return Err(ConsistencyError::NodeCache(id));
            }
        }
        Ok(())
    }

    fn validate_routes(&self) -> Result<(), ConsistencyError> {
        let mut link_routes: HashMap<LinkId, BTreeSet<RouteId>> = HashMap::new();
        let mut resource_routes: HashMap<ResourceId, BTreeSet<RouteId>> = HashMap::new();
        let mut demand_routes: HashMap<DemandId, BTreeSet<RouteId>> = HashMap::new();

        for (id, r) in self.routes.iter() {
            if self.get_layer(r.layer).map(|l| l.routing_type) != Ok(RoutingType::SourceRouting) {
                return Err(ConsistencyError::RoutingType(r.layer));
            }
            if r.path.len() != r.occupied_if_up.len()
                || self.validate_path(r.demand, &r.path).is_err()
            {
                return Err(ConsistencyError::Reference(format!("path of route {:?}", id)));
            }
            if r.is_down != self.is_path_down(&r.path) {
                return Err(ConsistencyError::RouteFailureState(*id));
            }
            match r.role {
                RouteRole::BackupOf(p) => {
                    let valid = self
                        .routes
                        .get(&p)
                        .map(|p| {
                            p.backups.contains(id)
                                && p.demand == r.demand
                                && p.role == RouteRole::Primary
                        })
                        .unwrap_or(false);
                    if !valid || !r.backups.is_empty() {
                        return Err(ConsistencyError::BackupRoute(*id));
                    }
                }
                RouteRole::Primary => {
                    let valid = r.backups.iter().all(|b| {
                        self.routes
                            .get(b)
                            .map(|b| b.role == RouteRole::BackupOf(*id))
                            .unwrap_or(false)
                    });
                    if !valid {
                        return Err(ConsistencyError::BackupRoute(*id));
                    }
                }
            }
            for elem in r.path.iter() {
                match elem {
                    PathElement::Link(l) => link_routes.entry(*l).or_default().insert(*id),
                    PathElement::Resource(x) => resource_routes.entry(*x).or_default().insert(*id),
                };
            }
            demand_routes.entry(r.demand).or_default().insert(*id);
        }

        for (id, l) in self.links.iter() {
            if l.traversing_routes != link_routes.remove(id).unwrap_or_default() {
                return Err(ConsistencyError::Reference(format!("routes traversing link {:?}", id)));
            }
        }
        for (id, r) in self.resources.iter() {
            if r.traversing_routes != resource_routes.remove(&id).unwrap_or_default() {
                return Err(ConsistencyError::Reference(format!(
                    "routes traversing resource {:?}",
                    id
                )));
            }
        }
        for (id, d) in self.demands.iter() {
            if d.routes != demand_routes.remove(id).unwrap_or_default() {
                return Err(ConsistencyError::Reference(format!("routes of demand {:?}", id)));
            }
            let sr =
                self.get_layer(d.layer).map(|l| l.routing_type) == Ok(RoutingType::SourceRouting);
            if sr {
                let carried: f64 = d
                    .routes
                    .iter()
                    .filter_map(|r| self.routes.get(r))
                    .map(|r| r.carried_traffic())
                    .sum();
                if self.differs(d.carried_traffic, carried) {
                    return Err(ConsistencyError::DemandTraffic {
                        demand: *id,
                        expected: carried,
                        found: d.carried_traffic,
                    });
                }
            }
        }
        if !(link_routes.is_empty() && resource_routes.is_empty() && demand_routes.is_empty()) {
            return Err(ConsistencyError::Reference(
                "route traverses a missing element".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_hop_by_hop(&self) -> Result<(), ConsistencyError> {
        for (id, layer) in self.layers.iter() {
            if layer.routing_type == RoutingType::SourceRouting {
                if layer.forwarding.demands().next().is_some()
                    || layer.forwarding.carried_demands().next().is_some()
                {
                    return Err(ConsistencyError::RoutingType(id));
                }
                continue;
            }
            for d in layer.forwarding.demands().chain(layer.forwarding.carried_demands()) {
                if !layer.demands.contains(&d) {
                    return Err(ConsistencyError::ForwardingRules(d));
                }
            }
            for d in layer.demands.iter() {
                let fractions = layer.forwarding.fractions(d);
                let mut sum_out: BTreeMap<NodeId, f64> = BTreeMap::new();
                for (l, f) in fractions.iter() {
                    let link = match self.links.get(l) {
                        Some(link) if link.layer == id => link,
                        _ => return Err(ConsistencyError::ForwardingRules(d)),
                    };
                    if !(0.0..=1.0).contains(f) {
                        return Err(ConsistencyError::ForwardingRules(d));
                    }
                    *sum_out.entry(link.origin).or_insert(0.0) += f;
                }
                if sum_out.values().any(|s| *s > 1.0 + self.config.precision_factor) {
                    return Err(ConsistencyError::ForwardingRules(d));
                }

                let solution = self.solve_hop_by_hop(d, false);
                let demand = &self.demands[&d];
                if self.differs(demand.carried_traffic, solution.carried_traffic) {
                    return Err(ConsistencyError::DemandTraffic {
                        demand: d,
                        expected: solution.carried_traffic,
                        found: demand.carried_traffic,
                    });
                }
                if demand.routing_cycle_type != solution.fundamental.cycle_type {
                    return Err(ConsistencyError::RoutingCycleType(d));
                }
                let stored = layer.forwarding.carried_row(d);
                let links = stored
                    .keys()
                    .chain(solution.link_traffic.keys())
                    .collect::<BTreeSet<_>>();
                for l in links {
                    let expected = solution.link_traffic.get(l).copied().unwrap_or(0.0);
                    let found = stored.get(l).copied().unwrap_or(0.0);
                    if self.differs(found, expected) {
                        return Err(ConsistencyError::LinkTraffic {
                            link: *l,
                            what: "demand traffic",
                            expected,
                            found,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_link_caches(&self) -> Result<(), ConsistencyError> {
        let mut carried: HashMap<LinkId, f64> = HashMap::new();
        let mut occupied: HashMap<LinkId, f64> = HashMap::new();
        for (_, layer) in self.layers.iter() {
            for d in layer.forwarding.carried_demands() {
                for (l, x) in layer.forwarding.carried_row(d) {
                    *carried.entry(l).or_insert(0.0) += x;
                    *occupied.entry(l).or_insert(0.0) += x;
                }
            }
        }
        for r in self.routes.values() {
            for (elem, occ) in r.path.iter().zip(r.occupied_capacity()) {
                if let PathElement::Link(l) = elem {
                    *carried.entry(*l).or_insert(0.0) += r.carried_traffic();
                    *occupied.entry(*l).or_insert(0.0) += occ;
                }
            }
        }
        for t in self.multicast_trees.values() {
            for l in t.links.iter() {
                *carried.entry(*l).or_insert(0.0) += t.carried_traffic();
                *occupied.entry(*l).or_insert(0.0) += t.occupied_capacity();
            }
        }
        for (id, l) in self.links.iter() {
            let expected = carried.get(id).copied().unwrap_or(0.0);
            if self.differs(l.carried_traffic, expected) {
                return Err(ConsistencyError::LinkTraffic {
                    link: *id,
                    what: "carried traffic",
                    expected,
                    found: l.carried_traffic,
                });
            }
            let expected = occupied.get(id).copied().unwrap_or(0.0);
            if self.differs(l.occupied_capacity, expected) {
                return Err(ConsistencyError::LinkTraffic {
                    link: *id,
                    what: "occupied capacity",
                    expected,
                    found: l.occupied_capacity,
                });
            }
        }
        Ok(())
    }

    fn validate_resource_caches(&self) -> Result<(), ConsistencyError> {
        let mut occupied: HashMap<ResourceId, f64> = HashMap::new();
        for r in self.routes.values() {
            for (elem, occ) in r.path.iter().zip(r.occupied_capacity()) {
                if let PathElement::Resource(x) = elem {
                    *occupied.entry(*x).or_insert(0.0) += occ;
                }
            }
        }
        for (id, r) in self.resources.iter() {
            let expected = occupied.get(&id).copied().unwrap_or(0.0);
            if self.differs(r.occupied_capacity, expected) {
                return Err(ConsistencyError::ResourceOccupation {
                    resource: id,
                    expected,
                    found: r.occupied_capacity,
                });
            }
        }
        Ok(())
    }

    fn validate_multicast(&self) -> Result<(), ConsistencyError> {
        for (id, t) in self.multicast_trees.iter() {
            let md = self
                .multicast_demands
                .get(&t.demand)
                .ok_or_else(|| ConsistencyError::Reference(format!("demand of tree {:?}", id)))?;
            let down = t
                .links
                .iter()
                .any(|l| self.links.get(l).map(|l| !self.is_link_usable(l)).unwrap_or(true));
            if !md.trees.contains(id) || down != t.is_down {
                return Err(ConsistencyError::Reference(format!("tree {:?}", id)));
            }
            let traversed = t.links.iter().all(|l| {
                self.links.get(l).map(|l| l.traversing_trees.contains(id)).unwrap_or(false)
            });
            if !traversed {
                return Err(ConsistencyError::Reference(format!("links of tree {:?}", id)));
            }
        }
        for l in self.links.values() {
            let traversing = l.traversing_trees.iter().all(|t| {
                self.multicast_trees.get(t).map(|t| t.links.contains(&l.id)).unwrap_or(false)
            });
            if !traversing {
                return Err(ConsistencyError::Reference(format!("trees of link {:?}", l.id)));
            }
        }
        for (id, md) in self.multicast_demands.iter() {
            let expected: f64 = md
                .trees
                .iter()
                .filter_map(|t| self.multicast_trees.get(t))
                .map(|t| t.carried_traffic())
                .sum();
            if self.differs(md.carried_traffic, expected) {
                return Err(ConsistencyError::MulticastTraffic {
                    demand: *id,
                    expected,
                    found: md.carried_traffic,
                });
            }
        }
        Ok(())
    }

    fn validate_coupling(&self) -> Result<(), ConsistencyError> {
        if !self.coupling.is_consistent() {
            return Err(ConsistencyError::Coupling("layer coupling graph".to_string()));
        }
        let layers = self.layers.ids().collect::<BTreeSet<_>>();
        if self.coupling.vertices().collect::<BTreeSet<_>>() != layers {
            return Err(ConsistencyError::Coupling("layers of the coupling graph".to_string()));
        }

        let mut coupled_demands: BTreeMap<DemandId, LinkId> = BTreeMap::new();
        let mut coupled_multicast: BTreeMap<MulticastDemandId, BTreeSet<LinkId>> = BTreeMap::new();
        for (lower, upper, pairs) in self.coupling.edges() {
            if pairs.is_empty() {
                return Err(ConsistencyError::Coupling(format!(
                    "empty edge {:?} -> {:?}",
                    lower, upper
                )));
            }
            for (d, l) in pairs.demand_link_pairs() {
                let ok = pairs.link_to_demand.get(&l) == Some(&d)
                    && self.demands.get(&d).map(|d| d.layer) == Some(lower)
                    && self.links.get(&l).map(|l| l.layer) == Some(upper);
                if !ok {
                    return Err(ConsistencyError::Coupling(format!("pair {:?} - {:?}", d, l)));
                }
                coupled_demands.insert(d, l);
            }
            if pairs.link_to_demand.len() != pairs.demand_to_link.len() {
                return Err(ConsistencyError::Coupling("demand to link map".to_string()));
            }
            for (md, l) in pairs.multicast_link_pairs() {
                let ok = pairs.multicast_to_links.get(&md).map(|x| x.contains(&l)).unwrap_or(false)
                    && self.multicast_demands.get(&md).map(|d| d.layer) == Some(lower)
                    && self.links.get(&l).map(|l| l.layer) == Some(upper);
                if !ok {
                    return Err(ConsistencyError::Coupling(format!("pair {:?} - {:?}", md, l)));
                }
                coupled_multicast.entry(md).or_default().insert(l);
            }
            let num_multicast_pairs =
                pairs.multicast_to_links.values().map(|x| x.len()).sum::<usize>();
            if num_multicast_pairs != pairs.link_to_multicast.len() {
                return Err(ConsistencyError::Coupling("multicast demand to link map".to_string()));
            }
        }

        for (id, d) in self.demands.iter() {
            if d.coupled_upper_link != coupled_demands.get(id).copied() {
                return Err(ConsistencyError::Coupling(format!("demand {:?}", id)));
            }
            if let Some(l) = d.coupled_upper_link {
                let link = &self.links[&l];
                if link.coupled_lower != Some(LowerLayerCoupling::Demand(*id)) {
                    return Err(ConsistencyError::Coupling(format!("link {:?}", l)));
                }
                if self.differs(link.capacity, d.carried_traffic) {
                    return Err(ConsistencyError::LinkTraffic {
                        link: l,
                        what: "coupled capacity",
                        expected: d.carried_traffic,
                        found: link.capacity,
                    });
                }
            }
        }
        for (id, md) in self.multicast_demands.iter() {
            let links = md.coupled_upper_links.values().copied().collect::<BTreeSet<_>>();
            if links != coupled_multicast.remove(id).unwrap_or_default() {
                return Err(ConsistencyError::Coupling(format!("multicast demand {:?}", id)));
            }
            for (egress, l) in md.coupled_upper_links.iter() {
                let link = &self.links[l];
                if link.coupled_lower != Some(LowerLayerCoupling::MulticastDemand(*id))
                    || link.origin != md.ingress
                    || link.destination != *egress
                {
                    return Err(ConsistencyError::Coupling(format!("link {:?}", l)));
                }
                if self.differs(link.capacity, md.carried_traffic) {
                    return Err(ConsistencyError::LinkTraffic {
                        link: *l,
                        what: "coupled capacity",
                        expected: md.carried_traffic,
                        found: link.capacity,
                    });
                }
            }
        }
        for (id, l) in self.links.iter() {
            let back = match l.coupled_lower {
                Some(LowerLayerCoupling::Demand(d)) => {
                    self.demands.get(&d).and_then(|d| d.coupled_upper_link) == Some(*id)
                }
                Some(LowerLayerCoupling::MulticastDemand(md)) => self
                    .multicast_demands
                    .get(&md)
                    .map(|md| md.coupled_upper_links.values().any(|x| x == id))
                    .unwrap_or(false),
                None => true,
            };
            if !back {
                return Err(ConsistencyError::Coupling(format!("link {:?}", id)));
            }
        }
        Ok(())
    }

    fn validate_aggregation(&self) -> Result<(), ConsistencyError> {
        for (id, layer) in self.layers.iter() {
            let aggregation = &layer.aggregation;
            if !aggregation.is_consistent() {
                return Err(ConsistencyError::Aggregation(format!("graph of layer {}", layer.name)));
            }
            for d in aggregation.vertices() {
                let demand = self
                    .demands
                    .get(&d)
                    .filter(|d| d.layer == id)
                    .ok_or_else(|| {
                        ConsistencyError::Aggregation(format!("demand {:?} not in layer", d))
                    })?;
                let children = aggregation.children(d).collect::<Vec<_>>();
                if children.is_empty() {
                    continue;
                }
                let sum: f64 = children.iter().map(|(_, f)| **f).sum();
                if (sum - 1.0).abs() > self.config.precision_factor
                    || children.iter().any(|(_, f)| **f < 0.0)
                {
                    return Err(ConsistencyError::Aggregation(format!("fractions of {:?}", d)));
                }
                for (down, _) in children {
                    let down = &self.demands[&down];
                    if down.ingress != demand.egress || down.is_coupled() {
                        return Err(ConsistencyError::Aggregation(format!(
                            "downstream demand {:?}",
                            down.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
