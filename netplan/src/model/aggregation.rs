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

//! # Demand aggregation
//!
//! Inside a layer, the carried traffic of a demand can be split among downstream demands starting
//! at its egress node (e.g. a service chain continuing after a hop). The offered traffic of a
//! downstream demand is then the sum of the carried traffic of its immediate upstream demands,
//! each multiplied by its fraction. The upstream-downstream relation is a DAG per layer.
//!
//! Whenever the carried traffic of a demand changes, all of its downstream demands are processed
//! in topological order: hop-by-hop demands are recomputed, and every coupled demand pushes its
//! new carried traffic into its upper layer link.

use crate::model::network::NetPlan;
use crate::model::printer;
use crate::model::types::{DemandId, NetPlanError, RoutingType};

use itertools::Itertools;
use log::*;
use std::collections::BTreeMap;

impl NetPlan {
    /// Make the demands of `mapping` the downstream demands of `demand`, each receiving the given
    /// fraction of its carried traffic. The fractions must be non-negative and sum up to one. An
    /// empty mapping removes all downstream demands.
    ///
    /// Every downstream demand must be in the same layer as `demand`, start at its egress node,
    /// not be coupled to an upper layer link, and not be upstream of `demand`. Previous downstream
    /// demands which are not part of the mapping and have no other upstream demand become
    /// independent, with zero offered traffic.
    pub fn attach_to_aggregated_demands(
        &mut self,
        demand: DemandId,
        mapping: impl IntoIterator<Item = (DemandId, f64)>,
    ) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let mapping: BTreeMap<DemandId, f64> = mapping.into_iter().collect();
        let d = self.get_demand(demand)?;
        let layer = d.layer;

        if !mapping.is_empty() {
            let sum: f64 = mapping.values().sum();
            if mapping.values().any(|f| *f < 0.0)
                || (sum - 1.0).abs() > self.config.precision_factor
            {
                return Err(NetPlanError::InvalidFractions { demand, sum });
            }
        }
        let aggregation = &self.get_layer(layer)?.aggregation;
        for down in mapping.keys() {
            let dd = self.get_demand(*down)?;
            if dd.layer != layer {
                return Err(NetPlanError::WrongLayer {
                    expected: layer,
                    found: dd.layer,
                });
            }
            if *down == demand {
                return Err(NetPlanError::InvalidDownstreamDemand(
                    *down,
                    "it is the upstream demand",
                ));
            }
            if dd.is_coupled() {
                return Err(NetPlanError::InvalidDownstreamDemand(
                    *down,
                    "it is coupled to a link",
                ));
            }
            if dd.ingress != d.egress {
                return Err(NetPlanError::InvalidDownstreamDemand(
                    *down,
                    "it does not start at the egress node of the upstream demand",
                ));
            }
            if aggregation.contains_vertex(*down) && aggregation.is_ancestor(*down, demand) {
                return Err(NetPlanError::AggregationCycle(demand, *down));
            }
        }

        debug!(
            "Attach {} downstream of {}",
            mapping
                .keys()
                .map(|x| printer::demand(self, *x))
                .collect::<Result<Vec<_>, _>>()?
                .iter()
                .join(", "),
            printer::demand(self, demand)?
        );

        // release the previous downstream demands
        let aggregation = &mut self.layer_mut(layer)?.aggregation;
        let previous = aggregation.children(demand).map(|(x, _)| x).collect::<Vec<_>>();
        for x in previous.iter() {
            aggregation.remove_edge(demand, *x);
        }
        aggregation.add_vertex(demand);
        for (down, fraction) in mapping.iter() {
            aggregation
                .add_edge(demand, *down, *fraction)
                .map_err(|_| NetPlanError::AggregationCycle(demand, *down))?;
        }
        let detached = previous
            .into_iter()
            .filter(|x| !mapping.contains_key(x))
            .collect::<Vec<_>>();
        for x in detached.iter() {
            let independent = self
                .get_layer(layer)
                .map(|l| l.aggregation.parents(*x).next().is_none())
                .unwrap_or(false);
            if independent {
                if let Some(dd) = self.demands.get_mut(x) {
                    dd.offered_traffic = 0.0;
                }
            }
        }

        self.propagate_carried_traffic_change(demand);
        for x in detached {
            self.propagate_offered_traffic_change(x);
        }
        self.after_mutation();
        Ok(())
    }

    /// Remove all downstream demands of a demand. Downstream demands without another upstream
    /// demand become independent, with zero offered traffic.
    pub fn clear_downstream_demands(&mut self, demand: DemandId) -> Result<(), NetPlanError> {
        self.attach_to_aggregated_demands(demand, Vec::new())
    }

    /// Offered traffic of a demand. For aggregated demands, this is derived from the current
    /// carried traffic of the upstream demands.
    pub fn get_offered_traffic(&self, demand: DemandId) -> Result<f64, NetPlanError> {
        self.get_demand(demand)?;
        Ok(self.derived_offered_traffic(demand))
    }

    /// Returns true if the demand has upstream demands.
    pub fn is_aggregated_demand(&self, demand: DemandId) -> Result<bool, NetPlanError> {
        let layer = self.get_demand(demand)?.layer;
        Ok(self.get_layer(layer)?.aggregation.parents(demand).next().is_some())
    }

    /// Immediate upstream demands with the fraction of their traffic sent to this demand
    pub fn get_upstream_demands(
        &self,
        demand: DemandId,
    ) -> Result<Vec<(DemandId, f64)>, NetPlanError> {
        let layer = self.get_demand(demand)?.layer;
        let aggregation = &self.get_layer(layer)?.aggregation;
        Ok(aggregation
            .parents(demand)
            .map(|u| (u, aggregation.edge(u, demand).copied().unwrap_or(0.0)))
            .collect())
    }

    /// Immediate downstream demands with the fraction of the traffic sent to each
    pub fn get_downstream_demands(
        &self,
        demand: DemandId,
    ) -> Result<Vec<(DemandId, f64)>, NetPlanError> {
        let layer = self.get_demand(demand)?.layer;
        Ok(self.get_layer(layer)?.aggregation.children(demand).map(|(x, f)| (x, *f)).collect())
    }

    pub(crate) fn derived_offered_traffic(&self, demand: DemandId) -> f64 {
        let d = match self.demands.get(&demand) {
            Some(d) => d,
            None => return 0.0,
        };
        let aggregation = match self.layers.get(&d.layer) {
            Some(l) => &l.aggregation,
            None => return d.offered_traffic,
        };
        let mut upstream = aggregation.parents(demand).peekable();
        if upstream.peek().is_none() {
            return d.offered_traffic;
        }
        upstream
            .map(|u| {
                let carried = self.demands.get(&u).map(|u| u.carried_traffic).unwrap_or(0.0);
                carried * aggregation.edge(u, demand).copied().unwrap_or(0.0)
            })
            .sum()
    }

    /// Process all downstream demands after the carried traffic of `demand` has changed:
    /// hop-by-hop demands are recomputed in topological order, and every visited demand
    /// (including `demand` itself) pushes its carried traffic into its coupled link.
    pub(crate) fn propagate_carried_traffic_change(&mut self, demand: DemandId) {
        let layer = match self.demands.get(&demand) {
            Some(d) => d.layer,
            None => return,
        };
        let (order, routing_type) = match self.layers.get(&layer) {
            Some(l) if l.aggregation.contains_vertex(demand) => {
                (l.aggregation.topological_order_from(demand), l.routing_type)
            }
            Some(l) => (vec![demand], l.routing_type),
            None => return,
        };
        for x in order {
            if x != demand && routing_type == RoutingType::HopByHopRouting {
                self.update_hop_by_hop_demand(x);
            }
            self.push_coupled_capacity(x);
        }
    }

    /// Process a demand whose offered traffic has changed, and then all of its downstream demands.
    pub(crate) fn propagate_offered_traffic_change(&mut self, demand: DemandId) {
        let hop_by_hop = self
            .demands
            .get(&demand)
            .and_then(|d| self.layers.get(&d.layer))
            .map(|l| l.routing_type == RoutingType::HopByHopRouting)
            .unwrap_or(false);
        if hop_by_hop {
            self.update_hop_by_hop_demand(demand);
        }
        self.propagate_carried_traffic_change(demand);
    }
}
