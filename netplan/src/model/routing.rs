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

//! # Routing engine
//!
//! The hop-by-hop routing of a demand is an absorbing Markov chain: a unit of traffic at node `n`
//! moves over link `e` with probability `f_e` (the splitting fraction), is absorbed at the egress
//! node, or is dropped with the remaining probability. With `q` the node-to-node transition
//! matrix, the fundamental matrix `M = (I - q)^-1` contains the expected number of visits of each
//! node. Every carried traffic value follows from `M`:
//!
//! - traffic of the demand on link `e`: `h * M[ingress][origin(e)] * f_e`,
//! - carried traffic of the demand: `h * M[ingress][egress] * s`, where `s` is the absorption
//!   probability at the egress node.
//!
//! If `I - q` is singular, some traffic loops forever (closed cycles), and the demand carries
//! nothing. If `M` has a diagonal element different from one, some node is visited more than
//! once (open cycles).

use crate::model::forwarding::LinkValues;
use crate::model::matrix::Matrix;
use crate::model::network::NetPlan;
use crate::model::printer;
use crate::model::route::Route;
use crate::model::types::{
    DemandId, LayerId, LinkId, NetPlanError, NodeId, PathElement, RouteId, RouteRole,
    RoutingCycleType, RoutingType,
};

use log::*;
use petgraph::algo::{astar, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Tolerance of the engine for the sum of the outgoing fractions of a node, and for the diagonal
/// of the fundamental matrix.
pub const ENGINE_TOLERANCE: f64 = 1e-5;

/// Result of the fundamental matrix computation of a single demand.
#[derive(Debug, Clone, PartialEq)]
pub struct FundamentalMatrixResult {
    /// Cycle classification of the routing
    pub cycle_type: RoutingCycleType,
    /// Probability that traffic at the egress node is absorbed there
    pub absorption: f64,
    /// Probability that traffic at each node is dropped. The entry of the egress node is zero.
    pub drop_fractions: Vec<f64>,
    /// The fundamental matrix, or `None` if the routing has closed cycles
    pub matrix: Option<Matrix>,
}

/// Compute the fundamental matrix of the routing on a graph with `num_nodes` nodes, where
/// `links[e] = (origin, destination)` and `fractions[e]` is the splitting fraction of link `e`.
///
/// # Panics
///
/// Panics if the outgoing fractions of a node sum to a value outside of `[0, 1]`. Callers must
/// validate the forwarding rules first.
pub fn compute_routing_fundamental_matrix(
    num_nodes: usize,
    links: &[(usize, usize)],
    egress: usize,
    fractions: &[f64],
) -> FundamentalMatrixResult {
    assert_eq!(links.len(), fractions.len(), "one fraction per link is required");

    // q = A_out * diag(f) * A_in^T
    let mut a_out_f = Matrix::zeros(num_nodes, links.len());
    let mut a_in = Matrix::zeros(num_nodes, links.len());
    for (e, ((origin, destination), f)) in links.iter().zip(fractions.iter()).enumerate() {
        a_out_f[(*origin, e)] = *f;
        a_in[(*destination, e)] = 1.0;
    }
    let q = a_out_f.mul(&a_in.transpose());

    let sum_out = q.row_sums();
    for (n, s) in sum_out.iter().enumerate() {
        assert!(
            *s >= -ENGINE_TOLERANCE && *s <= 1.0 + ENGINE_TOLERANCE,
            "outgoing fractions of node {} sum to {}",
            n,
            s
        );
    }
    let absorption = 1.0 - sum_out[egress];
    let drop_fractions = sum_out
        .iter()
        .enumerate()
        .map(|(n, s)| if n == egress { 0.0 } else { 1.0 - s })
        .collect();

    let matrix = q.identity_minus().inverse();
    let cycle_type = match matrix.as_ref() {
        None => RoutingCycleType::ClosedCycles,
        Some(m) if (0..num_nodes).any(|n| (m[(n, n)] - 1.0).abs() > ENGINE_TOLERANCE) => {
            RoutingCycleType::OpenCycles
        }
        Some(_) => RoutingCycleType::Loopless,
    };

    FundamentalMatrixResult {
        cycle_type,
        absorption,
        drop_fractions,
        matrix,
    }
}

/// Traffic of a single demand, as resulting from its forwarding rules.
#[derive(Debug, Clone, PartialEq)]
pub struct HopByHopSolution {
    /// Result of the fundamental matrix computation (nodes indexed by their node index)
    pub fundamental: FundamentalMatrixResult,
    /// Traffic reaching the egress node
    pub carried_traffic: f64,
    /// Traffic on each link. Empty if the routing has closed cycles.
    pub link_traffic: LinkValues,
}

impl NetPlan {
    /// Compute the routing of a demand of a hop-by-hop layer for the given splitting fractions,
    /// without changing anything. Fractions of links of other layers are rejected.
    pub fn compute_routing_fundamental_matrix_demand(
        &self,
        demand: DemandId,
        fractions: &LinkValues,
    ) -> Result<HopByHopSolution, NetPlanError> {
        let d = self.get_demand(demand)?;
        let mut sum_out: BTreeMap<NodeId, f64> = BTreeMap::new();
        for (l, f) in fractions.iter() {
            let link = self.get_link(*l)?;
            if link.layer != d.layer {
                return Err(NetPlanError::WrongLayer {
                    expected: d.layer,
                    found: link.layer,
                });
            }
            if !(0.0..=1.0).contains(f) {
                return Err(NetPlanError::InvalidForwardingFraction(*l, *f));
            }
            *sum_out.entry(link.origin).or_insert(0.0) += f;
        }
        if let Some((n, s)) = sum_out.into_iter().find(|(_, s)| *s > 1.0 + ENGINE_TOLERANCE) {
            return Err(NetPlanError::ForwardingFractionsExceeded(demand, n, s));
        }
        Ok(self.solve_hop_by_hop_fractions(demand, fractions))
    }

    /// Compute the routing of a demand with its forwarding rules. If `assume_no_failure_state` is
    /// not set, rules on failed links (or links with a failed end node) are ignored.
    pub(crate) fn solve_hop_by_hop(
        &self,
        demand: DemandId,
        assume_no_failure_state: bool,
    ) -> HopByHopSolution {
        let mut fractions = self
            .demands
            .get(&demand)
            .and_then(|d| self.layers.get(&d.layer))
            .map(|l| l.forwarding.fractions(demand))
            .unwrap_or_default();
        if !assume_no_failure_state {
            fractions
                .retain(|l, _| self.links.get(l).map(|l| self.is_link_usable(l)).unwrap_or(false));
        }
        self.solve_hop_by_hop_fractions(demand, &fractions)
    }

    fn solve_hop_by_hop_fractions(
        &self,
        demand: DemandId,
        fractions: &LinkValues,
    ) -> HopByHopSolution {
        let offered = self.derived_offered_traffic(demand);
        let (ingress, egress, layer) = match self.demands.get(&demand) {
            Some(d) => (d.ingress, d.egress, d.layer),
            None => {
                return HopByHopSolution {
                    fundamental: FundamentalMatrixResult {
                        cycle_type: RoutingCycleType::Unknown,
                        absorption: 0.0,
                        drop_fractions: Vec::new(),
                        matrix: None,
                    },
                    carried_traffic: 0.0,
                    link_traffic: LinkValues::new(),
                }
            }
        };
        let layer_links = self.layers.get(&layer).map(|l| l.links.to_vec()).unwrap_or_default();
        let node_index = |n: NodeId| self.nodes.index_of(&n).unwrap_or(0);

        let mut links = Vec::with_capacity(layer_links.len());
        let mut values = Vec::with_capacity(layer_links.len());
        for l in layer_links.iter() {
            if let Some(link) = self.links.get(l) {
                links.push((node_index(link.origin), node_index(link.destination)));
                values.push(fractions.get(l).copied().unwrap_or(0.0));
            }
        }

        let fundamental = compute_routing_fundamental_matrix(
            self.nodes.len(),
            &links,
            node_index(egress),
            &values,
        );
        let (carried_traffic, link_traffic) = match fundamental.matrix.as_ref() {
            Some(m) => {
                let ing = node_index(ingress);
                let carried = offered * m[(ing, node_index(egress))] * fundamental.absorption;
                let link_traffic = layer_links
                    .iter()
                    .zip(links.iter().zip(values.iter()))
                    .map(|(l, ((origin, _), f))| (*l, offered * m[(ing, *origin)] * f))
                    .filter(|(_, x)| *x != 0.0)
                    .collect();
                (carried, link_traffic)
            }
            None => (0.0, LinkValues::new()),
        };

        HopByHopSolution {
            fundamental,
            carried_traffic,
            link_traffic,
        }
    }

    /// Recompute the carried traffic of a single hop-by-hop demand in the current failure state,
    /// and update the link caches by the difference to the previous result. The change is not
    /// propagated to downstream demands or coupled links.
    pub(crate) fn update_hop_by_hop_demand(&mut self, demand: DemandId) {
        let layer = match self.demands.get(&demand) {
            Some(d) => d.layer,
            None => return,
        };
        let solution = self.solve_hop_by_hop(demand, false);
        let cycle_type = solution.fundamental.cycle_type;
        if cycle_type == RoutingCycleType::ClosedCycles {
            warn!("Demand {:?} has closed routing cycles, no traffic is carried", demand);
        }
        trace!("Demand {:?}: {} carried, {}", demand, solution.carried_traffic, cycle_type);

        let old_row = match self.layers.get_mut(&layer) {
            Some(l) => l.forwarding.replace_carried(demand, solution.link_traffic.clone()),
            None => return,
        };
        self.apply_link_traffic_delta(&old_row, -1.0);
        self.apply_link_traffic_delta(&solution.link_traffic, 1.0);
        if let Some(d) = self.demands.get_mut(&demand) {
            d.carried_traffic = solution.carried_traffic;
            d.routing_cycle_type = cycle_type;
        }
    }

    /// Add (`sign = 1.0`) or subtract (`sign = -1.0`) hop-by-hop traffic to the link caches. In
    /// hop-by-hop layers, the occupied capacity equals the carried traffic.
    pub(crate) fn apply_link_traffic_delta(&mut self, row: &LinkValues, sign: f64) {
        for (l, x) in row.iter() {
            if let Some(link) = self.links.get_mut(l) {
                link.carried_traffic += sign * x;
                link.occupied_capacity += sign * x;
            }
        }
    }

    /// Recompute the failure state of all routes and trees of the given layers, and the routing
    /// of all hop-by-hop demands, propagating every change.
    pub(crate) fn refresh_failure_state(&mut self, layers: &BTreeSet<LayerId>) {
        let mut touched: BTreeSet<DemandId> = BTreeSet::new();
        for layer in layers {
            let layer_obj = match self.layers.get(layer) {
                Some(l) => l,
                None => continue,
            };
            let routing_type = layer_obj.routing_type;
            let routes = layer_obj.routes.to_vec();
            let trees = layer_obj.multicast_trees.to_vec();
            let demands = layer_obj.demands.to_vec();

            for r in routes {
                if self.refresh_route_failure_state(r) {
                    if let Some(d) = self.routes.get(&r).map(|r| r.demand) {
                        self.update_source_routing_demand(d);
                        touched.insert(d);
                    }
                }
            }
            for t in trees {
                if self.refresh_tree_failure_state(t) {
                    if let Some(md) = self.multicast_trees.get(&t).map(|t| t.demand) {
                        self.update_multicast_demand(md);
                    }
                }
            }
            if routing_type == RoutingType::HopByHopRouting {
                for d in demands {
                    self.update_hop_by_hop_demand(d);
                    touched.insert(d);
                }
            }
        }
        for d in touched {
            self.propagate_carried_traffic_change(d);
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Forwarding rules
    // ---------------------------------------------------------------------------------------------

    /// Splitting fraction of the demand on the link
    pub fn get_forwarding_rule(&self, demand: DemandId, link: LinkId) -> Result<f64, NetPlanError> {
        let layer = self.get_demand(demand)?.layer;
        self.get_link(link)?;
        Ok(self.get_layer(layer)?.forwarding.fraction(demand, link))
    }

    /// All non-zero splitting fractions of the demand
    pub fn get_forwarding_rules(&self, demand: DemandId) -> Result<LinkValues, NetPlanError> {
        let layer = self.get_demand(demand)?.layer;
        Ok(self.get_layer(layer)?.forwarding.fractions(demand))
    }

    /// Traffic of the demand carried on the link (hop-by-hop layers only, zero otherwise)
    pub fn get_demand_traffic_on_link(
        &self,
        demand: DemandId,
        link: LinkId,
    ) -> Result<f64, NetPlanError> {
        let layer = self.get_demand(demand)?.layer;
        self.get_link(link)?;
        Ok(self.get_layer(layer)?.forwarding.carried(demand, link))
    }

    /// Set a single forwarding rule. See [`NetPlan::set_forwarding_rules`].
    pub fn set_forwarding_rule(
        &mut self,
        demand: DemandId,
        link: LinkId,
        fraction: f64,
    ) -> Result<(), NetPlanError> {
        self.set_forwarding_rules(vec![(demand, link, fraction)])
    }

    /// Set a batch of forwarding rules `(demand, link, fraction)` in a hop-by-hop layer, and
    /// recompute the routing of all affected demands. A fraction of zero removes the rule.
    ///
    /// The whole batch is validated before anything changes: every fraction must lie in
    /// `[0, 1]`, every link must belong to the layer of its demand, and the fractions leaving any
    /// node must not sum to more than one.
    pub fn set_forwarding_rules(
        &mut self,
        rules: impl IntoIterator<Item = (DemandId, LinkId, f64)>,
    ) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let rules = rules.into_iter().collect::<Vec<_>>();

        let mut new_rows: BTreeMap<DemandId, LinkValues> = BTreeMap::new();
        for (demand, link, fraction) in rules.iter() {
            let d = self.get_demand(*demand)?;
            self.check_routing_type(d.layer, RoutingType::HopByHopRouting)?;
            let l = self.get_link(*link)?;
            if l.layer != d.layer {
                return Err(NetPlanError::WrongLayer {
                    expected: d.layer,
                    found: l.layer,
                });
            }
            if !(0.0..=1.0).contains(fraction) {
                return Err(NetPlanError::InvalidForwardingFraction(*link, *fraction));
            }
            let layer = self.get_layer(d.layer)?;
            new_rows
                .entry(*demand)
                .or_insert_with(|| layer.forwarding.fractions(*demand))
                .insert(*link, *fraction);
        }

        // the fractions leaving a node must not exceed one
        let tolerance = self.config.precision_factor.min(ENGINE_TOLERANCE);
        for (demand, row) in new_rows.iter() {
            let mut sum_out: BTreeMap<NodeId, f64> = BTreeMap::new();
            for (l, f) in row.iter() {
                *sum_out.entry(self.get_link(*l)?.origin).or_insert(0.0) += f;
            }
            if let Some((n, s)) = sum_out.into_iter().find(|(_, s)| *s > 1.0 + tolerance) {
                return Err(NetPlanError::ForwardingFractionsExceeded(*demand, n, s));
            }
        }

        for (demand, link, fraction) in rules {
            let layer = self.get_demand(demand)?.layer;
            self.layer_mut(layer)?.forwarding.set_fraction(demand, link, fraction);
            debug!(
                "Set forwarding rule of {:?} on {}: {}",
                demand,
                printer::link(self, link)?,
                fraction
            );
        }
        for demand in new_rows.keys() {
            self.update_hop_by_hop_demand(*demand);
            self.propagate_carried_traffic_change(*demand);
        }
        self.after_mutation();
        Ok(())
    }

    /// Remove all forwarding rules of a demand of a hop-by-hop layer. The demand then carries no
    /// traffic.
    pub fn remove_all_forwarding_rules(&mut self, demand: DemandId) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let layer = self.get_demand(demand)?.layer;
        self.check_routing_type(layer, RoutingType::HopByHopRouting)?;
        self.layer_mut(layer)?.forwarding.clear_fractions(demand);
        debug!("Remove all forwarding rules of {}", printer::demand(self, demand)?);
        self.update_hop_by_hop_demand(demand);
        self.propagate_carried_traffic_change(demand);
        self.after_mutation();
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------------------------------

    /// Links of the layer of the demand that carry (or would carry) traffic of the demand, split
    /// into links of primary routes and links of backup routes.
    ///
    /// In hop-by-hop layers, the primary set contains every link whose traffic exceeds the
    /// precision factor, and the backup set is empty. In source routing layers, routes which are
    /// down are ignored, unless `assume_no_failure_state` is set.
    pub fn get_links_this_layer_potentially_carrying_traffic(
        &self,
        demand: DemandId,
        assume_no_failure_state: bool,
    ) -> Result<(BTreeSet<LinkId>, BTreeSet<LinkId>), NetPlanError> {
        let d = self.get_demand(demand)?;
        let mut primary = BTreeSet::new();
        let mut backup = BTreeSet::new();
        match self.get_layer(d.layer)?.routing_type {
            RoutingType::HopByHopRouting => {
                let solution = self.solve_hop_by_hop(demand, assume_no_failure_state);
                primary.extend(
                    solution
                        .link_traffic
                        .into_iter()
                        .filter(|(_, x)| *x > self.config.precision_factor)
                        .map(|(l, _)| l),
                );
            }
            RoutingType::SourceRouting => {
                for r in d.routes.iter() {
                    let route = self.get_route(*r)?;
                    if route.is_down && !assume_no_failure_state {
                        continue;
                    }
                    match route.role {
                        RouteRole::Primary => primary.extend(route.links()),
                        RouteRole::BackupOf(_) => backup.extend(route.links()),
                    }
                }
            }
        }
        Ok((primary, backup))
    }

    /// Worst case propagation time of the traffic of a demand, in ms.
    ///
    /// In source routing layers, this is the largest propagation delay of all routes which are
    /// up. In hop-by-hop layers, this is the longest path from the ingress to the egress node
    /// over the links carrying traffic of the demand, which is infinite if these links contain a
    /// cycle.
    pub fn get_worst_case_propagation_time_ms(
        &self,
        demand: DemandId,
    ) -> Result<f64, NetPlanError> {
        let d = self.get_demand(demand)?;
        let layer = self.get_layer(d.layer)?;
        match layer.routing_type {
            RoutingType::SourceRouting => {
                let mut worst: f64 = 0.0;
                for r in d.routes.iter() {
                    if !self.get_route(*r)?.is_down {
                        worst = worst.max(self.get_route_propagation_delay_ms(*r)?);
                    }
                }
                Ok(worst)
            }
            RoutingType::HopByHopRouting => {
                let mut g: DiGraph<NodeId, f64> = DiGraph::new();
                let mut indices: HashMap<NodeId, NodeIndex> = HashMap::new();
                for (l, x) in layer.forwarding.carried_row(demand) {
                    if x <= self.config.precision_factor {
                        continue;
                    }
                    let link = self.get_link(l)?;
                    let a = *indices.entry(link.origin).or_insert_with(|| g.add_node(link.origin));
                    let b = *indices
                        .entry(link.destination)
                        .or_insert_with(|| g.add_node(link.destination));
                    g.add_edge(a, b, link.propagation_delay_ms());
                }
                let order = match toposort(&g, None) {
                    Ok(order) => order,
                    Err(_) => return Ok(f64::INFINITY),
                };
                let start = match indices.get(&d.ingress) {
                    Some(n) => *n,
                    None => return Ok(0.0),
                };

                // longest path in topological order
                let mut dist: HashMap<NodeIndex, f64> = HashMap::new();
                dist.insert(start, 0.0);
                for n in order {
                    let base = match dist.get(&n) {
                        Some(x) => *x,
                        None => continue,
                    };
                    for e in g.edges(n) {
                        let candidate = base + *e.weight();
                        let entry = dist.entry(e.target()).or_insert(candidate);
                        *entry = entry.max(candidate);
                    }
                }
                Ok(indices.get(&d.egress).and_then(|n| dist.get(n)).copied().unwrap_or(0.0))
            }
        }
    }

    // ---------------------------------------------------------------------------------------------
    // Routing type conversion
    // ---------------------------------------------------------------------------------------------

    /// Change the routing type of a layer, converting the routing of every demand.
    ///
    /// - Source routing to hop-by-hop: the splitting fraction of each link is the traffic of the
    ///   routes on the link, divided by the traffic entering its origin node. All routes are
    ///   removed.
    /// - Hop-by-hop to source routing: the traffic of each demand is decomposed into paths from
    ///   the ingress to the egress node, each becoming a route. All forwarding rules are removed.
    ///   This fails without any change if a demand has closed routing cycles, or if a demand has
    ///   mandatory resource types (the decomposed paths contain links only).
    pub fn set_routing_type(
        &mut self,
        layer: LayerId,
        routing_type: RoutingType,
    ) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let layer_obj = self.get_layer(layer)?;
        if layer_obj.routing_type == routing_type {
            return Ok(());
        }
        let demands = layer_obj.demands.to_vec();
        debug!("Change routing type of layer {} to {}", layer_obj.name, routing_type);

        match routing_type {
            RoutingType::HopByHopRouting => {
                let mut rules: Vec<(DemandId, LinkValues)> = Vec::new();
                for d in demands.iter() {
                    rules.push((*d, self.fractions_from_routes(*d)?));
                }
                for route in self.get_layer(layer)?.routes.to_vec() {
                    self.remove_route_unchecked(route);
                }
                self.layer_mut(layer)?.routing_type = routing_type;
                for (d, row) in rules {
                    for (l, f) in row {
                        self.layer_mut(layer)?.forwarding.set_fraction(d, l, f);
                    }
                }
                for d in demands.iter() {
                    self.update_hop_by_hop_demand(*d);
                }
            }
            RoutingType::SourceRouting => {
                let mut paths: Vec<(DemandId, Vec<(Vec<LinkId>, f64)>)> = Vec::new();
                for d in demands.iter() {
                    let demand = self.get_demand(*d)?;
                    if demand.routing_cycle_type == RoutingCycleType::ClosedCycles {
                        return Err(NetPlanError::ClosedRoutingCycles(*d));
                    }
                    // decomposed paths never traverse resources
                    if !demand.mandatory_resource_types.is_empty() {
                        return Err(NetPlanError::ServiceChainMismatch(*d));
                    }
                    paths.push((*d, self.decompose_into_paths(*d)?));
                }
                for d in demands.iter() {
                    let old_row =
                        self.layer_mut(layer)?.forwarding.replace_carried(*d, LinkValues::new());
                    self.apply_link_traffic_delta(&old_row, -1.0);
                }
                let layer_obj = self.layer_mut(layer)?;
                layer_obj.forwarding.clear();
                layer_obj.routing_type = routing_type;
                for (d, demand_paths) in paths {
                    for (path, traffic) in demand_paths {
                        self.add_route_unchecked(d, traffic, path);
                    }
                    self.update_source_routing_demand(d);
                }
            }
        }

        for d in demands {
            self.propagate_carried_traffic_change(d);
        }
        self.after_mutation();
        Ok(())
    }

    /// Splitting fractions which reproduce the traffic of the routes of a demand.
    fn fractions_from_routes(&self, demand: DemandId) -> Result<LinkValues, NetPlanError> {
        let d = self.get_demand(demand)?;
        let mut link_traffic: LinkValues = LinkValues::new();
        for r in d.routes.iter() {
            let route = self.get_route(*r)?;
            for l in route.links() {
                *link_traffic.entry(l).or_insert(0.0) += route.carried_traffic_if_up;
            }
        }

        let mut traffic_in: BTreeMap<NodeId, f64> = BTreeMap::new();
        let mut traffic_out: BTreeMap<NodeId, f64> = BTreeMap::new();
        traffic_in.insert(d.ingress, self.derived_offered_traffic(demand));
        for (l, x) in link_traffic.iter() {
            let link = self.get_link(*l)?;
            *traffic_in.entry(link.destination).or_insert(0.0) += x;
            *traffic_out.entry(link.origin).or_insert(0.0) += x;
        }

        let mut fractions = LinkValues::new();
        for (l, x) in link_traffic {
            if x <= 0.0 {
                continue;
            }
            let origin = self.get_link(l)?.origin;
            let through = traffic_in
                .get(&origin)
                .copied()
                .unwrap_or(0.0)
                .max(traffic_out.get(&origin).copied().unwrap_or(0.0));
            fractions.insert(l, (x / through).min(1.0));
        }
        Ok(fractions)
    }

    /// Decompose the current traffic of a hop-by-hop demand into paths from the ingress to the
    /// egress node. Traffic circulating in open cycles is not part of any path.
    fn decompose_into_paths(
        &self,
        demand: DemandId,
    ) -> Result<Vec<(Vec<LinkId>, f64)>, NetPlanError> {
        let d = self.get_demand(demand)?;
        let precision = self.config.precision_factor;
        let mut remaining = self.get_layer(d.layer)?.forwarding.carried_row(demand);
        let mut to_route = d.carried_traffic;
        let mut paths = Vec::new();

        while to_route > precision {
            let mut g: DiGraph<NodeId, LinkId> = DiGraph::new();
            let mut indices: HashMap<NodeId, NodeIndex> = HashMap::new();
            for (l, x) in remaining.iter() {
                if *x <= precision {
                    continue;
                }
                let link = self.get_link(*l)?;
                let a = *indices.entry(link.origin).or_insert_with(|| g.add_node(link.origin));
                let b = *indices
                    .entry(link.destination)
                    .or_insert_with(|| g.add_node(link.destination));
                g.add_edge(a, b, *l);
            }
            let (start, goal) = match (indices.get(&d.ingress), indices.get(&d.egress)) {
                (Some(s), Some(g)) => (*s, *g),
                _ => break,
            };
            let path = match astar(&g, start, |n| n == goal, |_| 1, |_| 0) {
                Some((_, nodes)) => nodes,
                None => break,
            };

            // choose the link with the largest remaining traffic between each pair of nodes
            let mut links = Vec::with_capacity(path.len());
            for (a, b) in path.iter().zip(path.iter().skip(1)) {
                let best = g
                    .edges_connecting(*a, *b)
                    .map(|e| *e.weight())
                    .max_by(|x, y| {
                        remaining[x].partial_cmp(&remaining[y]).unwrap_or(Ordering::Equal)
                    });
                match best {
                    Some(l) => links.push(l),
                    None => break,
                }
            }
            let traffic = links
                .iter()
                .map(|l| remaining.get(l).copied().unwrap_or(0.0))
                .fold(to_route, f64::min);
            for l in links.iter() {
                if let Some(x) = remaining.get_mut(l) {
                    *x -= traffic;
                }
            }
            to_route -= traffic;
            paths.push((links, traffic));
        }
        Ok(paths)
    }

    /// Create a route from a validated path, without propagation.
    fn add_route_unchecked(&mut self, demand: DemandId, carried: f64, path: Vec<LinkId>) {
        let layer = match self.demands.get(&demand) {
            Some(d) => d.layer,
            None => return,
        };
        let path: Vec<PathElement> = path.into_iter().map(PathElement::Link).collect();
        let route = RouteId(self.next_id());
        for l in path.iter().filter_map(|e| e.link()) {
            if let Some(link) = self.links.get_mut(&l) {
                link.traversing_routes.insert(route);
            }
        }
        self.routes.insert(
            route,
            Route {
                id: route,
                layer,
                demand,
                occupied_if_up: vec![carried; path.len()],
                path,
                carried_traffic_if_up: carried,
                role: RouteRole::Primary,
                backups: BTreeSet::new(),
                is_down: true,
            },
        );
        if let Some(l) = self.layers.get_mut(&layer) {
            l.routes.push(route);
        }
        if let Some(d) = self.demands.get_mut(&demand) {
            d.routes.insert(route);
        }
        self.refresh_route_failure_state(route);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn loopless_line() {
        // 0 -> 1 -> 2
        let r = compute_routing_fundamental_matrix(3, &[(0, 1), (1, 2)], 2, &[1.0, 1.0]);
        assert_eq!(r.cycle_type, RoutingCycleType::Loopless);
        assert_approx_eq!(r.absorption, 1.0);
        let m = r.matrix.unwrap();
        assert_approx_eq!(m[(0, 2)], 1.0);
        assert_approx_eq!(m[(0, 1)], 1.0);
    }

    #[test]
    fn open_cycle() {
        // 0 -> 1, 1 -> 0 with 0.5, 1 -> 2 with 0.5
        let r =
            compute_routing_fundamental_matrix(3, &[(0, 1), (1, 0), (1, 2)], 2, &[1.0, 0.5, 0.5]);
        assert_eq!(r.cycle_type, RoutingCycleType::OpenCycles);
        let m = r.matrix.unwrap();
        // expected visits of node 0 starting at node 0: 1 / (1 - 0.5)
        assert_approx_eq!(m[(0, 0)], 2.0);
        assert_approx_eq!(m[(0, 2)], 1.0);
    }

    #[test]
    fn closed_cycle() {
        let r = compute_routing_fundamental_matrix(3, &[(0, 1), (1, 0)], 2, &[1.0, 1.0]);
        assert_eq!(r.cycle_type, RoutingCycleType::ClosedCycles);
        assert!(r.matrix.is_none());
    }

    #[test]
    fn drop_fractions() {
        let r = compute_routing_fundamental_matrix(3, &[(0, 1), (1, 2)], 2, &[0.5, 1.0]);
        assert_approx_eq!(r.drop_fractions[0], 0.5);
        assert_approx_eq!(r.drop_fractions[1], 0.0);
        assert_approx_eq!(r.drop_fractions[2], 0.0);
    }

    #[test]
    #[should_panic]
    fn fractions_above_one() {
        compute_routing_fundamental_matrix(2, &[(0, 1), (0, 1)], 1, &[0.7, 0.7]);
    }
}
