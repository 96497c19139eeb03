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

//! # Top-level network plan
//!
//! This module contains the [`NetPlan`], the owner of every element of a multilayer network
//! design. All mutations go through the `NetPlan`, which keeps the carried traffic, the routing,
//! and the coupling state consistent as part of every single call.

use crate::model::coupling::CoupledPairs;
use crate::model::dag::Dag;
use crate::model::demand::Demand;
use crate::model::element::ElementStore;
use crate::model::layer::NetworkLayer;
use crate::model::link::{Link, DEFAULT_PROPAGATION_SPEED_KM_PER_S};
use crate::model::multicast::{MulticastDemand, MulticastTree};
use crate::model::node::{cache_insert, cache_remove, Node};
use crate::model::printer;
use crate::model::resource::Resource;
use crate::model::route::Route;
use crate::model::types::{
    DemandId, IntendedRecoveryType, LayerId, LinkId, LowerLayerCoupling, MulticastDemandId,
    MulticastTreeId, NetPlanError, NodeId, ResourceId, RouteId, RoutingType,
};
use crate::model::NetPlanConfig;

use log::*;
use std::collections::{BTreeSet, HashMap};

/// # Network Plan
///
/// The network plan owns all nodes, resources, and layers, and all links, demands, multicast
/// demands, routes, and multicast trees of every layer. Elements reference each other only by
/// their ids; the index of an element is its position in the owning container and changes when
/// an earlier element is removed.
///
/// ## Consistency
///
/// Every mutator validates all its preconditions before touching any state. If a precondition is
/// violated, a [`NetPlanError`] is returned, and the network plan is left unchanged. After a
/// successful mutation, the following caches are up to date:
///
/// - carried traffic and occupied capacity of every link and resource,
/// - carried traffic and routing cycle type of every demand,
/// - carried traffic of every multicast demand,
/// - the capacity of every coupled upper layer link, which equals the carried traffic of the
///   coupled lower layer demand,
/// - the offered traffic of every aggregated demand, which is derived on every read.
///
/// If [`NetPlanConfig::check_consistency`] is set, every mutation ends with a complete
/// consistency check (see [`NetPlan::check_caches_consistency`]).
///
/// ## Example
///
/// ```rust
/// use netplan::model::{NetPlan, RoutingType};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut net = NetPlan::new();
///     let layer = net.default_layer();
///
///     let n1 = net.add_node("n1", 0.0, 0.0)?;
///     let n2 = net.add_node("n2", 1.0, 0.0)?;
///     let n3 = net.add_node("n3", 2.0, 0.0)?;
///     let l12 = net.add_link(layer, n1, n2, 100.0, 10.0)?;
///     let l23 = net.add_link(layer, n2, n3, 100.0, 10.0)?;
///
///     let d13 = net.add_demand(layer, n1, n3, 3.0)?;
///     net.add_route(d13, 1.0, vec![l12, l23], None)?;
///     net.add_route(d13, 1.0, vec![l12, l23], None)?;
///
///     assert_eq!(net.get_layer(layer)?.routing_type(), RoutingType::SourceRouting);
///     assert_eq!(net.get_carried_traffic(d13)?, 2.0);
///     assert_eq!(net.get_blocked_traffic(d13)?, 1.0);
///     assert!(net.is_bifurcated(d13)?);
///     assert_eq!(net.get_link(l12)?.carried_traffic(), 2.0);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct NetPlan {
    pub(crate) config: NetPlanConfig,
    pub(crate) modifiable: bool,
    next_id: u64,
    pub(crate) nodes: ElementStore<NodeId, Node>,
    pub(crate) resources: ElementStore<ResourceId, Resource>,
    pub(crate) layers: ElementStore<LayerId, NetworkLayer>,
    pub(crate) default_layer: LayerId,
    pub(crate) links: HashMap<LinkId, Link>,
    pub(crate) demands: HashMap<DemandId, Demand>,
    pub(crate) multicast_demands: HashMap<MulticastDemandId, MulticastDemand>,
    pub(crate) routes: HashMap<RouteId, Route>,
    pub(crate) multicast_trees: HashMap<MulticastTreeId, MulticastTree>,
    /// Layer coupling graph: edge from the lower to the upper layer, carrying the coupled pairs.
    pub(crate) coupling: Dag<LayerId, CoupledPairs>,
}

impl Default for NetPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl NetPlan {
    /// Create an empty network plan with the default configuration. The plan contains a single
    /// source routing layer, with traffic and capacity in `Gbps`.
    pub fn new() -> Self {
        Self::with_config(NetPlanConfig::default())
    }

    /// Create an empty network plan with the given configuration.
    pub fn with_config(config: NetPlanConfig) -> Self {
        let mut net = Self {
            config,
            modifiable: true,
            next_id: 0,
            nodes: ElementStore::new(),
            resources: ElementStore::new(),
            layers: ElementStore::new(),
            default_layer: LayerId(0),
            links: HashMap::new(),
            demands: HashMap::new(),
            multicast_demands: HashMap::new(),
            routes: HashMap::new(),
            multicast_trees: HashMap::new(),
            coupling: Dag::new(),
        };
        let layer = LayerId(net.next_id());
        net.layers.insert(
            layer,
            NetworkLayer::new(
                layer,
                String::from("Layer 0"),
                RoutingType::SourceRouting,
                String::from("Gbps"),
                String::from("Gbps"),
            ),
        );
        net.coupling.add_vertex(layer);
        net.default_layer = layer;
        net
    }

    /// Configuration of the network plan
    pub fn config(&self) -> &NetPlanConfig {
        &self.config
    }

    /// Tolerance used for all traffic comparisons
    pub fn precision_factor(&self) -> f64 {
        self.config.precision_factor
    }

    /// Returns true if the network plan can be modified
    pub fn is_modifiable(&self) -> bool {
        self.modifiable
    }

    /// Switch the network plan between read-write and read-only.
    pub fn set_modifiable(&mut self, modifiable: bool) {
        self.modifiable = modifiable;
    }

    /// Returns an error if the network plan is read-only
    pub fn check_is_modifiable(&self) -> Result<(), NetPlanError> {
        if self.modifiable {
            Ok(())
        } else {
            Err(NetPlanError::NotModifiable)
        }
    }

    pub(crate) fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ---------------------------------------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------------------------------------

    /// Get a layer
    pub fn get_layer(&self, layer: LayerId) -> Result<&NetworkLayer, NetPlanError> {
        self.layers.get(&layer).ok_or(NetPlanError::LayerNotFound(layer))
    }

    pub(crate) fn layer_mut(&mut self, layer: LayerId) -> Result<&mut NetworkLayer, NetPlanError> {
        self.layers.get_mut(&layer).ok_or(NetPlanError::LayerNotFound(layer))
    }

    /// Get a node
    pub fn get_node(&self, node: NodeId) -> Result<&Node, NetPlanError> {
        self.nodes.get(&node).ok_or(NetPlanError::NodeNotFound(node))
    }

    /// Get a link
    pub fn get_link(&self, link: LinkId) -> Result<&Link, NetPlanError> {
        self.links.get(&link).ok_or(NetPlanError::LinkNotFound(link))
    }

    /// Get a demand
    pub fn get_demand(&self, demand: DemandId) -> Result<&Demand, NetPlanError> {
        self.demands.get(&demand).ok_or(NetPlanError::DemandNotFound(demand))
    }

    /// Get a multicast demand
    pub fn get_multicast_demand(
        &self,
        demand: MulticastDemandId,
    ) -> Result<&MulticastDemand, NetPlanError> {
        self.multicast_demands.get(&demand).ok_or(NetPlanError::MulticastDemandNotFound(demand))
    }

    /// Get a route
    pub fn get_route(&self, route: RouteId) -> Result<&Route, NetPlanError> {
        self.routes.get(&route).ok_or(NetPlanError::RouteNotFound(route))
    }

    /// Get a multicast tree
    pub fn get_multicast_tree(
        &self,
        tree: MulticastTreeId,
    ) -> Result<&MulticastTree, NetPlanError> {
        self.multicast_trees.get(&tree).ok_or(NetPlanError::MulticastTreeNotFound(tree))
    }

    /// Get a resource
    pub fn get_resource(&self, resource: ResourceId) -> Result<&Resource, NetPlanError> {
        self.resources.get(&resource).ok_or(NetPlanError::ResourceNotFound(resource))
    }

    /// Find a node by its name
    pub fn get_node_by_name(&self, name: impl AsRef<str>) -> Result<NodeId, NetPlanError> {
        self.nodes
            .iter()
            .find(|(_, n)| n.name == name.as_ref())
            .map(|(id, _)| id)
            .ok_or_else(|| NetPlanError::NodeNameNotFound(name.as_ref().to_string()))
    }

    /// The default layer. This is the first layer created, or the first remaining layer if it
    /// was removed.
    pub fn default_layer(&self) -> LayerId {
        self.default_layer
    }

    /// All layers, in index order
    pub fn get_layers(&self) -> Vec<LayerId> {
        self.layers.ids().collect()
    }

    /// All nodes, in index order
    pub fn get_nodes(&self) -> Vec<NodeId> {
        self.nodes.ids().collect()
    }

    /// All resources, in index order
    pub fn get_resources(&self) -> Vec<ResourceId> {
        self.resources.ids().collect()
    }

    /// Resources of the given type, in index order
    pub fn get_resources_of_type(&self, resource_type: &str) -> Vec<ResourceId> {
        self.resources
            .iter()
            .filter(|(_, r)| r.resource_type == resource_type)
            .map(|(id, _)| id)
            .collect()
    }

    /// Links of the layer, in index order
    pub fn get_links(&self, layer: LayerId) -> Result<Vec<LinkId>, NetPlanError> {
        Ok(self.get_layer(layer)?.links.to_vec())
    }

    /// Demands of the layer, in index order
    pub fn get_demands(&self, layer: LayerId) -> Result<Vec<DemandId>, NetPlanError> {
        Ok(self.get_layer(layer)?.demands.to_vec())
    }

    /// Multicast demands of the layer, in index order
    pub fn get_multicast_demands(
        &self,
        layer: LayerId,
    ) -> Result<Vec<MulticastDemandId>, NetPlanError> {
        Ok(self.get_layer(layer)?.multicast_demands.to_vec())
    }

    /// Routes of the layer, in index order
    pub fn get_routes(&self, layer: LayerId) -> Result<Vec<RouteId>, NetPlanError> {
        Ok(self.get_layer(layer)?.routes.to_vec())
    }

    /// Multicast trees of the layer, in index order
    pub fn get_multicast_trees(
        &self,
        layer: LayerId,
    ) -> Result<Vec<MulticastTreeId>, NetPlanError> {
        Ok(self.get_layer(layer)?.multicast_trees.to_vec())
    }

    /// Current index of the layer
    pub fn get_layer_index(&self, layer: LayerId) -> Result<usize, NetPlanError> {
        self.layers.index_of(&layer).ok_or(NetPlanError::LayerNotFound(layer))
    }

    /// Current index of the node
    pub fn get_node_index(&self, node: NodeId) -> Result<usize, NetPlanError> {
        self.nodes.index_of(&node).ok_or(NetPlanError::NodeNotFound(node))
    }

    /// Current index of the resource
    pub fn get_resource_index(&self, resource: ResourceId) -> Result<usize, NetPlanError> {
        self.resources.index_of(&resource).ok_or(NetPlanError::ResourceNotFound(resource))
    }

    /// Current index of the link inside its layer
    pub fn get_link_index(&self, link: LinkId) -> Result<usize, NetPlanError> {
        let layer = self.get_link(link)?.layer;
        self.get_layer(layer)?.links.index_of(&link).ok_or(NetPlanError::LinkNotFound(link))
    }

    /// Current index of the demand inside its layer
    pub fn get_demand_index(&self, demand: DemandId) -> Result<usize, NetPlanError> {
        let layer = self.get_demand(demand)?.layer;
        self.get_layer(layer)?.demands.index_of(&demand).ok_or(NetPlanError::DemandNotFound(demand))
    }

    /// Current index of the route inside its layer
    pub fn get_route_index(&self, route: RouteId) -> Result<usize, NetPlanError> {
        let layer = self.get_route(route)?.layer;
        self.get_layer(layer)?.routes.index_of(&route).ok_or(NetPlanError::RouteNotFound(route))
    }

    /// Returns true if the link, and both of its end nodes, are up.
    pub(crate) fn is_link_usable(&self, link: &Link) -> bool {
        link.is_up
            && self.nodes.get(&link.origin).map(|n| n.is_up).unwrap_or(false)
            && self.nodes.get(&link.destination).map(|n| n.is_up).unwrap_or(false)
    }

    // ---------------------------------------------------------------------------------------------
    // Layers
    // ---------------------------------------------------------------------------------------------

    /// Add a new, empty layer.
    pub fn add_layer(
        &mut self,
        name: impl Into<String>,
        routing_type: RoutingType,
        demand_traffic_units: impl Into<String>,
        link_capacity_units: impl Into<String>,
    ) -> Result<LayerId, NetPlanError> {
        self.check_is_modifiable()?;
        let layer = LayerId(self.next_id());
        let layer_obj = NetworkLayer::new(
            layer,
            name.into(),
            routing_type,
            demand_traffic_units.into(),
            link_capacity_units.into(),
        );
        debug!("Add layer {} ({})", layer_obj.name, routing_type);
        self.layers.insert(layer, layer_obj);
        self.coupling.add_vertex(layer);
        self.after_mutation();
        Ok(layer)
    }

    /// Remove a layer. The layer must not contain any link, demand, or multicast demand, and it
    /// must not be the last layer of the network plan.
    pub fn remove_layer(&mut self, layer: LayerId) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let layer_obj = self.get_layer(layer)?;
        if !layer_obj.is_empty() {
            return Err(NetPlanError::ElementStillReferenced(format!(
                "layer {} is not empty",
                layer_obj.name
            )));
        }
        if self.layers.len() == 1 {
            return Err(NetPlanError::LastLayer);
        }
        debug!("Remove layer {}", layer_obj.name);
        self.layers.remove(&layer);
        self.coupling.remove_vertex(layer);
        if self.default_layer == layer {
            if let Some(first) = self.layers.ids().next() {
                self.default_layer = first;
            }
        }
        self.after_mutation();
        Ok(())
    }

    /// Rename a layer
    pub fn set_layer_name(
        &mut self,
        layer: LayerId,
        name: impl Into<String>,
    ) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        self.layer_mut(layer)?.name = name.into();
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------
    // Nodes
    // ---------------------------------------------------------------------------------------------

    /// Add a new node at the given position. Nodes are shared by all layers.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        x: f64,
        y: f64,
    ) -> Result<NodeId, NetPlanError> {
        self.check_is_modifiable()?;
        let node = NodeId(self.next_id());
        let node_obj = Node::new(node, name.into(), (x, y));
        debug!("Add node {}", node_obj.name);
        self.nodes.insert(node, node_obj);
        self.after_mutation();
        Ok(node)
    }

    /// Remove a node. This fails if any link, demand, multicast demand, or resource of any layer
    /// still references the node.
    pub fn remove_node(&mut self, node: NodeId) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let node_obj = self.get_node(node)?;
        if node_obj.is_referenced() {
            return Err(NetPlanError::ElementStillReferenced(format!(
                "node {} still has links, demands or resources",
                node_obj.name
            )));
        }
        debug!("Remove node {}", node_obj.name);
        self.nodes.remove(&node);
        self.after_mutation();
        Ok(())
    }

    /// Move a node
    pub fn set_node_position(&mut self, node: NodeId, x: f64, y: f64) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        self.nodes.get_mut(&node).ok_or(NetPlanError::NodeNotFound(node))?.position = (x, y);
        Ok(())
    }

    /// Set the failure state of a node. All links starting or ending at a failed node are
    /// unusable, all routes and trees traversing them are down, and the hop-by-hop routing of all
    /// layers is recomputed.
    pub fn set_node_failure_state(
        &mut self,
        node: NodeId,
        is_up: bool,
    ) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let node_obj = self.nodes.get_mut(&node).ok_or(NetPlanError::NodeNotFound(node))?;
        if node_obj.is_up == is_up {
            return Ok(());
        }
        node_obj.is_up = is_up;
        debug!("Node {} is now {}", node_obj.name, if is_up { "up" } else { "down" });
        let layers = self.get_layers().into_iter().collect::<BTreeSet<_>>();
        self.refresh_failure_state(&layers);
        self.after_mutation();
        Ok(())
    }

    /// Euclidean distance between two nodes
    pub fn get_node_pair_euclidean_distance(
        &self,
        a: NodeId,
        b: NodeId,
    ) -> Result<f64, NetPlanError> {
        let (xa, ya) = self.get_node(a)?.position;
        let (xb, yb) = self.get_node(b)?.position;
        Ok(((xa - xb).powi(2) + (ya - yb).powi(2)).sqrt())
    }

    // ---------------------------------------------------------------------------------------------
    // Links
    // ---------------------------------------------------------------------------------------------

    /// Add a link to a layer with the default propagation speed.
    pub fn add_link(
        &mut self,
        layer: LayerId,
        origin: NodeId,
        destination: NodeId,
        capacity: f64,
        length_km: f64,
    ) -> Result<LinkId, NetPlanError> {
        self.add_link_with_speed(
            layer,
            origin,
            destination,
            capacity,
            length_km,
            DEFAULT_PROPAGATION_SPEED_KM_PER_S,
        )
    }

    /// Add a link to a layer.
    pub fn add_link_with_speed(
        &mut self,
        layer: LayerId,
        origin: NodeId,
        destination: NodeId,
        capacity: f64,
        length_km: f64,
        propagation_speed_km_per_s: f64,
    ) -> Result<LinkId, NetPlanError> {
        self.check_is_modifiable()?;
        self.get_layer(layer)?;
        self.get_node(origin)?;
        self.get_node(destination)?;
        if origin == destination {
            return Err(NetPlanError::SameEndNodes(origin));
        }
        if capacity < 0.0 {
            return Err(NetPlanError::NegativeValue("link capacity", capacity));
        }
        if length_km < 0.0 {
            return Err(NetPlanError::NegativeValue("link length", length_km));
        }
        if propagation_speed_km_per_s <= 0.0 {
            return Err(NetPlanError::NegativeValue(
                "propagation speed",
                propagation_speed_km_per_s,
            ));
        }

        let link = LinkId(self.next_id());
        self.links.insert(
            link,
            Link::new(
                link,
                layer,
                origin,
                destination,
                capacity,
                length_km,
                propagation_speed_km_per_s,
            ),
        );
        self.layer_mut(layer)?.links.push(link);
        if let Some(n) = self.nodes.get_mut(&origin) {
            cache_insert(&mut n.out_links, layer, link);
        }
        if let Some(n) = self.nodes.get_mut(&destination) {
            cache_insert(&mut n.in_links, layer, link);
        }
        debug!("Add link {}", printer::link(self, link)?);
        self.after_mutation();
        Ok(link)
    }

    /// Add two links in opposite directions with the same properties.
    pub fn add_link_bidirectional(
        &mut self,
        layer: LayerId,
        a: NodeId,
        b: NodeId,
        capacity: f64,
        length_km: f64,
    ) -> Result<(LinkId, LinkId), NetPlanError> {
        let ab = self.add_link(layer, a, b, capacity, length_km)?;
        match self.add_link(layer, b, a, capacity, length_km) {
            Ok(ba) => Ok((ab, ba)),
            Err(e) => {
                self.remove_link(ab)?;
                Err(e)
            }
        }
    }

    /// Remove a link. All routes and multicast trees traversing the link are removed, all
    /// forwarding rules on it are removed, and a coupling to a lower layer is released. All index
    /// of later links of the layer are shifted down by one.
    pub fn remove_link(&mut self, link: LinkId) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let link_obj = self.get_link(link)?;
        debug!("Remove link {}", printer::link(self, link)?);
        let layer = link_obj.layer;
        let routes = link_obj.traversing_routes.iter().copied().collect::<Vec<_>>();
        let trees = link_obj.traversing_trees.iter().copied().collect::<Vec<_>>();
        let coupling = link_obj.coupled_lower;

        let mut touched_demands: BTreeSet<DemandId> = BTreeSet::new();
        let mut touched_multicast: BTreeSet<MulticastDemandId> = BTreeSet::new();
        for r in routes {
            if let Some(d) = self.remove_route_unchecked(r) {
                touched_demands.insert(d);
            }
        }
        for t in trees {
            if let Some(md) = self.remove_multicast_tree_unchecked(t) {
                touched_multicast.insert(md);
            }
        }

        match coupling {
            Some(LowerLayerCoupling::Demand(d)) => self.decouple_demand_unchecked(d),
            Some(LowerLayerCoupling::MulticastDemand(md)) => {
                self.decouple_multicast_demand_unchecked(md)
            }
            None => {}
        }

        // forget the link
        let affected = self.layer_mut(layer)?.forwarding.remove_link(link);
        touched_demands.extend(affected.iter().copied());
        self.layer_mut(layer)?.links.remove(&link);
        if let Some(link_obj) = self.links.remove(&link) {
            if let Some(n) = self.nodes.get_mut(&link_obj.origin) {
                cache_remove(&mut n.out_links, layer, &link);
            }
            if let Some(n) = self.nodes.get_mut(&link_obj.destination) {
                cache_remove(&mut n.in_links, layer, &link);
            }
        }

        // recompute the hop-by-hop routing of the demands that used the link
        for d in affected {
            self.update_hop_by_hop_demand(d);
        }
        for d in touched_demands {
            self.propagate_carried_traffic_change(d);
        }
        for md in touched_multicast {
            self.push_multicast_coupled_capacity(md);
        }
        self.after_mutation();
        Ok(())
    }

    /// Set the capacity of a link. The capacity of a coupled link is dictated by the lower layer
    /// and cannot be set.
    pub fn set_link_capacity(&mut self, link: LinkId, capacity: f64) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let link_obj = self.get_link(link)?;
        if link_obj.is_coupled() {
            return Err(NetPlanError::CoupledLinkCapacity(link));
        }
        if capacity < 0.0 {
            return Err(NetPlanError::NegativeValue("link capacity", capacity));
        }
        if let Some(l) = self.links.get_mut(&link) {
            l.capacity = capacity;
        }
        if self.is_link_oversubscribed(link)? {
            warn!("Link {} is oversubscribed", printer::link(self, link)?);
        }
        self.after_mutation();
        Ok(())
    }

    /// Set the length of a link in km
    pub fn set_link_length(&mut self, link: LinkId, length_km: f64) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        if length_km < 0.0 {
            return Err(NetPlanError::NegativeValue("link length", length_km));
        }
        self.links.get_mut(&link).ok_or(NetPlanError::LinkNotFound(link))?.length_km = length_km;
        self.after_mutation();
        Ok(())
    }

    /// Set the failure state of a link. Routes and trees traversing the link go down (or up), and
    /// the hop-by-hop routing of the layer is recomputed.
    pub fn set_link_failure_state(
        &mut self,
        link: LinkId,
        is_up: bool,
    ) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let link_obj = self.links.get_mut(&link).ok_or(NetPlanError::LinkNotFound(link))?;
        if link_obj.is_up == is_up {
            return Ok(());
        }
        link_obj.is_up = is_up;
        let layer = link_obj.layer;
        debug!("Link {} is now {}", printer::link(self, link)?, if is_up { "up" } else { "down" });
        self.refresh_failure_state(&maplit::btreeset! {layer});
        self.after_mutation();
        Ok(())
    }

    /// Returns true if the occupied capacity exceeds the capacity by more than the precision
    /// factor.
    pub fn is_link_oversubscribed(&self, link: LinkId) -> Result<bool, NetPlanError> {
        let l = self.get_link(link)?;
        Ok(l.occupied_capacity > l.capacity + self.config.precision_factor)
    }

    /// Returns true if any link of the layer is oversubscribed
    pub fn is_layer_oversubscribed(&self, layer: LayerId) -> Result<bool, NetPlanError> {
        for l in self.get_layer(layer)?.links.iter() {
            if self.is_link_oversubscribed(l)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    // ---------------------------------------------------------------------------------------------
    // Demands
    // ---------------------------------------------------------------------------------------------

    /// Add an independent unicast demand.
    pub fn add_demand(
        &mut self,
        layer: LayerId,
        ingress: NodeId,
        egress: NodeId,
        offered_traffic: f64,
    ) -> Result<DemandId, NetPlanError> {
        self.check_is_modifiable()?;
        self.get_layer(layer)?;
        self.get_node(ingress)?;
        self.get_node(egress)?;
        if ingress == egress {
            return Err(NetPlanError::SameEndNodes(ingress));
        }
        if offered_traffic < 0.0 {
            return Err(NetPlanError::NegativeValue("offered traffic", offered_traffic));
        }
        let demand = DemandId(self.next_id());
        self.demands.insert(demand, Demand::new(demand, layer, ingress, egress, offered_traffic));
        self.layer_mut(layer)?.demands.push(demand);
        if let Some(n) = self.nodes.get_mut(&ingress) {
            cache_insert(&mut n.out_demands, layer, demand);
        }
        if let Some(n) = self.nodes.get_mut(&egress) {
            cache_insert(&mut n.in_demands, layer, demand);
        }
        debug!("Add demand {}", printer::demand(self, demand)?);
        self.after_mutation();
        Ok(demand)
    }

    /// Remove a demand, together with its routes and forwarding rules. A coupling to an upper
    /// layer link is released (the link keeps its capacity). Downstream demands of the removed
    /// demand lose it as upstream demand, and those left without upstream demand become
    /// independent with zero offered traffic.
    ///
    /// A demand that is itself downstream of other demands cannot be removed, because this would
    /// break the fractions of its upstream demands. Detach it first.
    pub fn remove_demand(&mut self, demand: DemandId) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let d = self.get_demand(demand)?;
        let layer = d.layer;
        if self.get_layer(layer)?.aggregation.parents(demand).next().is_some() {
            return Err(NetPlanError::ElementStillReferenced(format!(
                "demand {} is downstream of other demands",
                printer::demand(self, demand)?
            )));
        }
        debug!("Remove demand {}", printer::demand(self, demand)?);
        let routes = d.routes.iter().copied().collect::<Vec<_>>();
        for r in routes {
            self.remove_route_unchecked(r);
        }
        if self.get_demand(demand)?.coupled_upper_link.is_some() {
            self.decouple_demand_unchecked(demand);
        }

        // remove the hop-by-hop traffic
        let old_row = self.layer_mut(layer)?.forwarding.replace_carried(demand, Default::default());
        self.apply_link_traffic_delta(&old_row, -1.0);
        self.layer_mut(layer)?.forwarding.remove_demand(demand);

        // release the downstream demands
        let downstream = self.layer_mut(layer)?.aggregation.remove_vertex(demand);
        for down in downstream.keys() {
            let has_upstream = self.get_layer(layer)?.aggregation.parents(*down).next().is_some();
            if !has_upstream {
                if let Some(dd) = self.demands.get_mut(down) {
                    dd.offered_traffic = 0.0;
                }
            }
        }

        self.layer_mut(layer)?.demands.remove(&demand);
        if let Some(d) = self.demands.remove(&demand) {
            if let Some(n) = self.nodes.get_mut(&d.ingress) {
                cache_remove(&mut n.out_demands, layer, &demand);
            }
            if let Some(n) = self.nodes.get_mut(&d.egress) {
                cache_remove(&mut n.in_demands, layer, &demand);
            }
        }

        for down in downstream.keys() {
            self.propagate_offered_traffic_change(*down);
        }
        self.after_mutation();
        Ok(())
    }

    /// Set the offered traffic of an independent demand. In hop-by-hop layers, the carried
    /// traffic follows immediately. In source routing layers, the carried traffic of the routes is
    /// managed independently, and only the offered traffic changes.
    pub fn set_offered_traffic(
        &mut self,
        demand: DemandId,
        offered: f64,
    ) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let layer = self.get_demand(demand)?.layer;
        if offered < 0.0 {
            return Err(NetPlanError::NegativeValue("offered traffic", offered));
        }
        if self.is_aggregated_demand(demand)? {
            return Err(NetPlanError::AggregatedDemand(demand));
        }
        if let Some(d) = self.demands.get_mut(&demand) {
            d.offered_traffic = offered;
        }
        debug!("Set offered traffic of {} to {}", printer::demand(self, demand)?, offered);
        if self.get_layer(layer)?.routing_type == RoutingType::HopByHopRouting {
            self.propagate_offered_traffic_change(demand);
        }
        self.after_mutation();
        Ok(())
    }

    /// Traffic carried by the demand
    pub fn get_carried_traffic(&self, demand: DemandId) -> Result<f64, NetPlanError> {
        Ok(self.get_demand(demand)?.carried_traffic)
    }

    /// Offered traffic that is not carried
    pub fn get_blocked_traffic(&self, demand: DemandId) -> Result<f64, NetPlanError> {
        let offered = self.get_offered_traffic(demand)?;
        Ok((offered - self.get_carried_traffic(demand)?).max(0.0))
    }

    /// Returns true if the blocked traffic exceeds the precision factor
    pub fn is_blocked(&self, demand: DemandId) -> Result<bool, NetPlanError> {
        Ok(self.get_blocked_traffic(demand)? > self.config.precision_factor)
    }

    /// Returns true if the traffic of the demand is split. In source routing layers, this is the
    /// case if it has more than one route. In hop-by-hop layers, this is the case if any node
    /// forwards its traffic on more than one link.
    pub fn is_bifurcated(&self, demand: DemandId) -> Result<bool, NetPlanError> {
        let d = self.get_demand(demand)?;
        let layer = self.get_layer(d.layer)?;
        match layer.routing_type {
            RoutingType::SourceRouting => Ok(d.routes.len() > 1),
            RoutingType::HopByHopRouting => {
                let mut out_degree: HashMap<NodeId, usize> = HashMap::new();
                for (l, _) in layer.forwarding.fractions(demand) {
                    let origin = self.get_link(l)?.origin;
                    *out_degree.entry(origin).or_insert(0) += 1;
                }
                Ok(out_degree.values().any(|x| *x > 1))
            }
        }
    }

    /// Routing cycle type of the demand
    pub fn get_routing_cycle_type(
        &self,
        demand: DemandId,
    ) -> Result<crate::model::RoutingCycleType, NetPlanError> {
        Ok(self.get_demand(demand)?.routing_cycle_type)
    }

    /// Set the intended recovery type of the demand. This is metadata only.
    pub fn set_intended_recovery_type(
        &mut self,
        demand: DemandId,
        recovery: IntendedRecoveryType,
    ) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        self.demands.get_mut(&demand).ok_or(NetPlanError::DemandNotFound(demand))?.recovery_type =
            recovery;
        Ok(())
    }

    /// Set the sequence of resource types every route of the demand must traverse. This is only
    /// possible while the demand has no routes.
    pub fn set_mandatory_resource_types<S: Into<String>>(
        &mut self,
        demand: DemandId,
        types: impl IntoIterator<Item = S>,
    ) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let d = self.demands.get_mut(&demand).ok_or(NetPlanError::DemandNotFound(demand))?;
        if !d.routes.is_empty() {
            return Err(NetPlanError::DemandHasRoutes(demand));
        }
        d.mandatory_resource_types = types.into_iter().map(|s| s.into()).collect();
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------
    // Multicast demands
    // ---------------------------------------------------------------------------------------------

    /// Add a multicast demand from the ingress to all egress nodes.
    pub fn add_multicast_demand(
        &mut self,
        layer: LayerId,
        ingress: NodeId,
        egresses: impl IntoIterator<Item = NodeId>,
        offered_traffic: f64,
    ) -> Result<MulticastDemandId, NetPlanError> {
        self.check_is_modifiable()?;
        self.get_layer(layer)?;
        self.get_node(ingress)?;
        let egresses = egresses.into_iter().collect::<BTreeSet<_>>();
        for e in egresses.iter() {
            self.get_node(*e)?;
        }
        if egresses.is_empty() || egresses.contains(&ingress) {
            return Err(NetPlanError::InvalidEgressNodes);
        }
        if offered_traffic < 0.0 {
            return Err(NetPlanError::NegativeValue("offered traffic", offered_traffic));
        }
        let demand = MulticastDemandId(self.next_id());
        for e in egresses.iter() {
            if let Some(n) = self.nodes.get_mut(e) {
                cache_insert(&mut n.in_multicast_demands, layer, demand);
            }
        }
        if let Some(n) = self.nodes.get_mut(&ingress) {
            cache_insert(&mut n.out_multicast_demands, layer, demand);
        }
        self.multicast_demands.insert(
            demand,
            MulticastDemand {
                id: demand,
                layer,
                ingress,
                egresses,
                offered_traffic,
                carried_traffic: 0.0,
                coupled_upper_links: Default::default(),
                trees: BTreeSet::new(),
            },
        );
        self.layer_mut(layer)?.multicast_demands.push(demand);
        debug!("Add multicast demand {:?}", demand);
        self.after_mutation();
        Ok(demand)
    }

    /// Remove a multicast demand together with its trees. A coupling to upper layer links is
    /// released.
    pub fn remove_multicast_demand(
        &mut self,
        demand: MulticastDemandId,
    ) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let md = self.get_multicast_demand(demand)?;
        let layer = md.layer;
        let trees = md.trees.iter().copied().collect::<Vec<_>>();
        let coupled = md.is_coupled();
        debug!("Remove multicast demand {:?}", demand);
        for t in trees {
            self.remove_multicast_tree_unchecked(t);
        }
        if coupled {
            self.decouple_multicast_demand_unchecked(demand);
        }
        self.layer_mut(layer)?.multicast_demands.remove(&demand);
        if let Some(md) = self.multicast_demands.remove(&demand) {
            if let Some(n) = self.nodes.get_mut(&md.ingress) {
                cache_remove(&mut n.out_multicast_demands, layer, &demand);
            }
            for e in md.egresses.iter() {
                if let Some(n) = self.nodes.get_mut(e) {
                    cache_remove(&mut n.in_multicast_demands, layer, &demand);
                }
            }
        }
        self.after_mutation();
        Ok(())
    }

    /// Set the offered traffic of a multicast demand
    pub fn set_multicast_demand_offered_traffic(
        &mut self,
        demand: MulticastDemandId,
        offered: f64,
    ) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        if offered < 0.0 {
            return Err(NetPlanError::NegativeValue("offered traffic", offered));
        }
        self.multicast_demands
            .get_mut(&demand)
            .ok_or(NetPlanError::MulticastDemandNotFound(demand))?
            .offered_traffic = offered;
        self.after_mutation();
        Ok(())
    }

    // ---------------------------------------------------------------------------------------------
    // Resources
    // ---------------------------------------------------------------------------------------------

    /// Add a resource hosted at a node.
    pub fn add_resource(
        &mut self,
        resource_type: impl Into<String>,
        name: impl Into<String>,
        host_node: NodeId,
        capacity: f64,
        capacity_units: impl Into<String>,
        processing_time_ms: f64,
    ) -> Result<ResourceId, NetPlanError> {
        self.check_is_modifiable()?;
        self.get_node(host_node)?;
        if capacity < 0.0 {
            return Err(NetPlanError::NegativeValue("resource capacity", capacity));
        }
        if processing_time_ms < 0.0 {
            return Err(NetPlanError::NegativeValue("processing time", processing_time_ms));
        }
        let resource = ResourceId(self.next_id());
        self.resources.insert(
            resource,
            Resource {
                id: resource,
                resource_type: resource_type.into(),
                name: name.into(),
                host_node,
                capacity,
                capacity_units: capacity_units.into(),
                processing_time_ms,
                occupied_capacity: 0.0,
                traversing_routes: BTreeSet::new(),
            },
        );
        if let Some(n) = self.nodes.get_mut(&host_node) {
            n.resources.insert(resource);
        }
        self.after_mutation();
        Ok(resource)
    }

    /// Remove a resource. This fails while routes still traverse it.
    pub fn remove_resource(&mut self, resource: ResourceId) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        let r = self.get_resource(resource)?;
        if !r.traversing_routes.is_empty() {
            return Err(NetPlanError::ElementStillReferenced(format!(
                "resource {} is traversed by routes",
                r.name
            )));
        }
        let host = r.host_node;
        if let Some(n) = self.nodes.get_mut(&host) {
            n.resources.remove(&resource);
        }
        self.resources.remove(&resource);
        self.after_mutation();
        Ok(())
    }

    /// Set the capacity of a resource
    pub fn set_resource_capacity(
        &mut self,
        resource: ResourceId,
        capacity: f64,
    ) -> Result<(), NetPlanError> {
        self.check_is_modifiable()?;
        if capacity < 0.0 {
            return Err(NetPlanError::NegativeValue("resource capacity", capacity));
        }
        self.resources
            .get_mut(&resource)
            .ok_or(NetPlanError::ResourceNotFound(resource))?
            .capacity = capacity;
        Ok(())
    }

    /// Returns true if the occupied capacity of the resource exceeds its capacity by more than
    /// the precision factor.
    pub fn is_resource_oversubscribed(&self, resource: ResourceId) -> Result<bool, NetPlanError> {
        let r = self.get_resource(resource)?;
        Ok(r.occupied_capacity > r.capacity + self.config.precision_factor)
    }
}
