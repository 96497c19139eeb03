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

//! # Inter-layer coupling
//!
//! A demand of a lower layer can be coupled to a link of an upper layer: the capacity of the link
//! is then always equal to the carried traffic of the demand. Similarly, a multicast demand can be
//! coupled to one upper layer link per egress node.
//!
//! The layers form a DAG, with an edge from the lower to the upper layer for every pair of layers
//! with at least one coupled pair. The edge weight holds the coupled pairs in both directions.

use crate::model::network::NetPlan;
use crate::model::printer;
use crate::model::types::{
    DemandId, LayerId, LinkId, LowerLayerCoupling, MulticastDemandId, NetPlanError, NodeId,
};

use log::*;
use std::collections::{BTreeMap, BTreeSet};

/// Coupled element pairs between a lower and an upper layer, stored in both directions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoupledPairs {
    pub(crate) demand_to_link: BTreeMap<DemandId, LinkId>,
    pub(crate) link_to_demand: BTreeMap<LinkId, DemandId>,
    pub(crate) multicast_to_links: BTreeMap<MulticastDemandId, BTreeSet<LinkId>>,
    pub(crate) link_to_multicast: BTreeMap<LinkId, MulticastDemandId>,
}

impl CoupledPairs {
    /// Number of coupled pairs (a multicast demand counts once per link)
    pub fn len(&self) -> usize {
        self.demand_to_link.len() + self.link_to_multicast.len()
    }

    /// Returns true if no pair is coupled
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over all coupled demand and link pairs
    pub fn demand_link_pairs(&self) -> impl Iterator<Item = (DemandId, LinkId)> + '_ {
        self.demand_to_link.iter().map(|(d, l)| (*d, *l))
    }

    /// Iterate over all coupled multicast demand and link pairs
    pub fn multicast_link_pairs(&self) -> impl Iterator<Item = (MulticastDemandId, LinkId)> + '_ {
        self.link_to_multicast.iter().map(|(l, md)| (*md, *l))
    }
}

impl NetPlan {
    /// Couple a demand to a link of an upper layer. The link must connect the same nodes as the
    /// demand, its capacity units must equal the traffic units of the demand's layer, and neither
    /// element may be coupled already. The demand must not be a downstream aggregated demand, and
    /// the coupling must not create a cycle among the layers.
    ///
    /// Afterwards, the capacity of the link equals the carried traffic of the demand.
    pub fn couple_demand_to_link(
        &mut self,
        demand: DemandId,
        link: LinkId,
    ) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let d = self.get_demand(demand)?;
        let l = self.get_link(link)?;
        let (lower, upper) = (d.layer, l.layer);
        self.check_coupling_layers(lower, upper)?;
        if l.origin != d.ingress || l.destination != d.egress {
            return Err(NetPlanError::EndNodesMismatch);
        }
        if d.is_coupled() {
            return Err(NetPlanError::DemandAlreadyCoupled(demand));
        }
        if l.is_coupled() {
            return Err(NetPlanError::LinkAlreadyCoupled(link));
        }
        if self.is_aggregated_demand(demand)? {
            return Err(NetPlanError::InvalidDownstreamDemand(demand, "it is an aggregated demand"));
        }

        self.ensure_coupling_edge(lower, upper)?;
        if let Some(pairs) = self.coupling.edge_mut(lower, upper) {
            pairs.demand_to_link.insert(demand, link);
            pairs.link_to_demand.insert(link, demand);
        }
        if let Some(d) = self.demands.get_mut(&demand) {
            d.coupled_upper_link = Some(link);
        }
        if let Some(l) = self.links.get_mut(&link) {
            l.coupled_lower = Some(LowerLayerCoupling::Demand(demand));
        }
        debug!(
            "Couple demand {} to link {}",
            printer::demand(self, demand)?,
            printer::link(self, link)?
        );
        self.push_coupled_capacity(demand);
        self.after_mutation();
        Ok(())
    }

    /// Create a new link in the upper layer between the end nodes of the demand, and couple it to
    /// the demand. The length of the link is the Euclidean distance between the nodes. If the
    /// coupling fails, the created link is removed again.
    pub fn couple_demand_to_new_link_created(
        &mut self,
        demand: DemandId,
        upper_layer: LayerId,
    ) -> Result<LinkId, NetPlanError> {
        self.check_is_modifiable()?;
        let d = self.get_demand(demand)?;
        let (ingress, egress) = (d.ingress, d.egress);
        let length = self.get_node_pair_euclidean_distance(ingress, egress)?;
        let link = self.add_link(upper_layer, ingress, egress, 0.0, length)?;
        match self.couple_demand_to_link(demand, link) {
            Ok(()) => Ok(link),
            Err(e) => {
                self.remove_link(link)?;
                Err(e)
            }
        }
    }

    /// Remove the coupling of a demand. The upper layer link keeps its current capacity.
    pub fn decouple_demand(&mut self, demand: DemandId) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        if !self.get_demand(demand)?.is_coupled() {
            return Ok(());
        }
        debug!("Decouple demand {}", printer::demand(self, demand)?);
        self.decouple_demand_unchecked(demand);
        self.after_mutation();
        Ok(())
    }

    /// Remove the coupling of a link, be it to a demand or to a multicast demand. A multicast
    /// demand is decoupled from all of its links.
    pub fn decouple_link(&mut self, link: LinkId) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        match self.get_link(link)?.coupled_lower {
            Some(LowerLayerCoupling::Demand(d)) => self.decouple_demand(d),
            Some(LowerLayerCoupling::MulticastDemand(md)) => self.decouple_multicast_demand(md),
            None => Ok(()),
        }
    }

    pub(crate) fn decouple_demand_unchecked(&mut self, demand: DemandId) {
        let link = match self.demands.get_mut(&demand).and_then(|d| d.coupled_upper_link.take()) {
            Some(l) => l,
            None => return,
        };
        let upper = match self.links.get_mut(&link) {
            Some(l) => {
                l.coupled_lower = None;
                l.layer
            }
            None => return,
        };
        let lower = match self.demands.get(&demand) {
            Some(d) => d.layer,
            None => return,
        };
        if let Some(pairs) = self.coupling.edge_mut(lower, upper) {
            pairs.demand_to_link.remove(&demand);
            pairs.link_to_demand.remove(&link);
        }
        self.release_coupling_edge(lower, upper);
    }

    /// Couple a multicast demand to upper layer links, one per egress node, each going from the
    /// ingress to its egress node. The capacity of every link equals the carried traffic of the
    /// multicast demand.
    pub fn couple_multicast_demand_to_links(
        &mut self,
        demand: MulticastDemandId,
        links: impl IntoIterator<Item = LinkId>,
    ) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let links = links.into_iter().collect::<BTreeSet<_>>();
        let md = self.get_multicast_demand(demand)?;
        if md.is_coupled() {
            return Err(NetPlanError::MulticastDemandAlreadyCoupled(demand));
        }
        let lower = md.layer;
        let mut by_egress: BTreeMap<NodeId, LinkId> = BTreeMap::new();
        let mut upper: Option<LayerId> = None;
        for link in links.iter() {
            let l = self.get_link(*link)?;
            let expected = *upper.get_or_insert(l.layer);
            if expected != l.layer {
                return Err(NetPlanError::WrongLayer {
                    expected,
                    found: l.layer,
                });
            }
            if l.is_coupled() {
                return Err(NetPlanError::LinkAlreadyCoupled(*link));
            }
            if l.origin != md.ingress || !md.egresses.contains(&l.destination) {
                return Err(NetPlanError::EndNodesMismatch);
            }
            if by_egress.insert(l.destination, *link).is_some() {
                return Err(NetPlanError::EndNodesMismatch);
            }
        }
        if by_egress.len() != md.egresses.len() {
            return Err(NetPlanError::EndNodesMismatch);
        }
        let upper = match upper {
            Some(u) => u,
            None => return Err(NetPlanError::EndNodesMismatch),
        };
        self.check_coupling_layers(lower, upper)?;

        self.ensure_coupling_edge(lower, upper)?;
        if let Some(pairs) = self.coupling.edge_mut(lower, upper) {
            pairs.multicast_to_links.insert(demand, links.clone());
            for l in links.iter() {
                pairs.link_to_multicast.insert(*l, demand);
            }
        }
        for l in links.iter() {
            if let Some(link) = self.links.get_mut(l) {
                link.coupled_lower = Some(LowerLayerCoupling::MulticastDemand(demand));
            }
        }
        if let Some(md) = self.multicast_demands.get_mut(&demand) {
            md.coupled_upper_links = by_egress;
        }
        debug!("Couple multicast demand {:?} to {} links", demand, links.len());
        self.push_multicast_coupled_capacity(demand);
        self.after_mutation();
        Ok(())
    }

    /// Create one new link per egress node in the upper layer, and couple them to the multicast
    /// demand. If the coupling fails, the created links are removed again.
    pub fn couple_multicast_demand_to_new_links_created(
        &mut self,
        demand: MulticastDemandId,
        upper_layer: LayerId,
    ) -> Result<Vec<LinkId>, NetPlanError> {
        self.check_is_modifiable()?;
        let md = self.get_multicast_demand(demand)?;
        let ingress = md.ingress;
        let egresses = md.egresses.iter().copied().collect::<Vec<_>>();
        let mut links = Vec::with_capacity(egresses.len());
        for egress in egresses {
            let length = self.get_node_pair_euclidean_distance(ingress, egress)?;
            match self.add_link(upper_layer, ingress, egress, 0.0, length) {
                Ok(l) => links.push(l),
                Err(e) => {
                    for l in links {
                        self.remove_link(l)?;
                    }
                    return Err(e);
                }
            }
        }
        match self.couple_multicast_demand_to_links(demand, links.clone()) {
            Ok(()) => Ok(links),
            Err(e) => {
                for l in links {
                    self.remove_link(l)?;
                }
                Err(e)
            }
        }
    }

    /// Remove the coupling of a multicast demand from all of its links.
    pub fn decouple_multicast_demand(
        &mut self,
        demand: MulticastDemandId,
    ) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        if !self.get_multicast_demand(demand)?.is_coupled() {
            return Ok(());
        }
        debug!("Decouple multicast demand {:?}", demand);
        self.decouple_multicast_demand_unchecked(demand);
        self.after_mutation();
        Ok(())
    }

    pub(crate) fn decouple_multicast_demand_unchecked(&mut self, demand: MulticastDemandId) {
        let (lower, links) = match self.multicast_demands.get_mut(&demand) {
            Some(md) => (md.layer, std::mem::take(&mut md.coupled_upper_links)),
            None => return,
        };
        let mut upper = None;
        for l in links.values() {
            if let Some(link) = self.links.get_mut(l) {
                link.coupled_lower = None;
                upper = Some(link.layer);
            }
        }
        if let Some(upper) = upper {
            if let Some(pairs) = self.coupling.edge_mut(lower, upper) {
                pairs.multicast_to_links.remove(&demand);
                for l in links.values() {
                    pairs.link_to_multicast.remove(l);
                }
            }
            self.release_coupling_edge(lower, upper);
        }
    }

    /// Layers directly above the given layer
    pub fn get_upper_layers(&self, layer: LayerId) -> Result<Vec<LayerId>, NetPlanError> {
        self.get_layer(layer)?;
        Ok(self.coupling.children(layer).map(|(l, _)| l).collect())
    }

    /// Layers directly below the given layer
    pub fn get_lower_layers(&self, layer: LayerId) -> Result<Vec<LayerId>, NetPlanError> {
        self.get_layer(layer)?;
        Ok(self.coupling.parents(layer).collect())
    }

    /// Coupled pairs between two layers, if any
    pub fn get_coupled_pairs(&self, lower: LayerId, upper: LayerId) -> Option<&CoupledPairs> {
        self.coupling.edge(lower, upper)
    }

    /// Upper layer link coupled to the demand
    pub fn get_coupled_link(&self, demand: DemandId) -> Result<Option<LinkId>, NetPlanError> {
        Ok(self.get_demand(demand)?.coupled_upper_link)
    }

    /// Lower layer demand coupled to the link
    pub fn get_coupled_lower_demand(&self, link: LinkId) -> Result<Option<DemandId>, NetPlanError> {
        Ok(match self.get_link(link)?.coupled_lower {
            Some(LowerLayerCoupling::Demand(d)) => Some(d),
            _ => None,
        })
    }

    /// Lower layer multicast demand coupled to the link
    pub fn get_coupled_lower_multicast_demand(
        &self,
        link: LinkId,
    ) -> Result<Option<MulticastDemandId>, NetPlanError> {
        Ok(match self.get_link(link)?.coupled_lower {
            Some(LowerLayerCoupling::MulticastDemand(md)) => Some(md),
            _ => None,
        })
    }

    /// Returns true if the link is coupled to a lower layer element
    pub fn is_link_coupled(&self, link: LinkId) -> Result<bool, NetPlanError> {
        Ok(self.get_link(link)?.is_coupled())
    }

    /// Returns true if the demand is coupled to an upper layer link
    pub fn is_demand_coupled(&self, demand: DemandId) -> Result<bool, NetPlanError> {
        Ok(self.get_demand(demand)?.is_coupled())
    }

    /// Push the carried traffic of a coupled demand into the capacity of its upper layer link.
    pub(crate) fn push_coupled_capacity(&mut self, demand: DemandId) {
        let (link, carried) = match self.demands.get(&demand) {
            Some(d) => match d.coupled_upper_link {
                Some(l) => (l, d.carried_traffic),
                None => return,
            },
            None => return,
        };
        if let Some(l) = self.links.get_mut(&link) {
            if l.capacity != carried {
                trace!("Capacity of coupled link {:?} is now {}", link, carried);
            }
            l.capacity = carried;
        }
    }

    /// Push the carried traffic of a coupled multicast demand into the capacity of all of its
    /// upper layer links.
    pub(crate) fn push_multicast_coupled_capacity(&mut self, demand: MulticastDemandId) {
        let (links, carried) = match self.multicast_demands.get(&demand) {
            Some(md) => (
                md.coupled_upper_links.values().copied().collect::<Vec<_>>(),
                md.carried_traffic,
            ),
            None => return,
        };
        for link in links {
            if let Some(l) = self.links.get_mut(&link) {
                l.capacity = carried;
            }
        }
    }

    /// Check that a coupling from `lower` to `upper` is allowed by the layers.
    fn check_coupling_layers(&self, lower: LayerId, upper: LayerId) -> Result<(), NetPlanError> {
        if lower == upper {
            return Err(NetPlanError::SameLayerCoupling(lower));
        }
        let lower_units = &self.get_layer(lower)?.demand_traffic_units;
        let upper_units = &self.get_layer(upper)?.link_capacity_units;
        if lower_units != upper_units {
            return Err(NetPlanError::UnitsMismatch {
                lower: lower_units.clone(),
                upper: upper_units.clone(),
            });
        }
        if !self.coupling.has_edge(lower, upper) && !self.coupling.can_add_edge(lower, upper) {
            return Err(NetPlanError::LayerCouplingCycle(lower, upper));
        }
        Ok(())
    }

    fn ensure_coupling_edge(&mut self, lower: LayerId, upper: LayerId) -> Result<(), NetPlanError> {
        if !self.coupling.has_edge(lower, upper) {
            self.coupling
                .add_edge(lower, upper, CoupledPairs::default())
                .map_err(|_| NetPlanError::LayerCouplingCycle(lower, upper))?;
        }
        Ok(())
    }

    fn release_coupling_edge(&mut self, lower: LayerId, upper: LayerId) {
        if self.coupling.edge(lower, upper).map(|p| p.is_empty()).unwrap_or(false) {
            self.coupling.remove_edge(lower, upper);
        }
    }
}
