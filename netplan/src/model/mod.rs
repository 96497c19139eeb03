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

#![deny(missing_docs, missing_debug_implementations)]

//! # Multilayer network model
//!
//! The model represents a network design across several stacked layers. Each layer contains
//! links, unicast and multicast demands, and the routing of these demands. The routing of a layer
//! is either *source routing* (the traffic of a demand is carried by explicit routes), or
//! *hop-by-hop routing* (every node splits the traffic of a demand among its outgoing links,
//! according to forwarding rules). Multicast demands are always carried by multicast trees.
//!
//! Layers are stacked by coupling: a lower layer demand carries the traffic of an upper layer
//! link, and the capacity of the link is always equal to the carried traffic of the demand.
//! Inside a layer, demands can be aggregated: the carried traffic of an upstream demand is split
//! among downstream demands starting at its egress node.
//!
//! ## Example usage
//!
//! The following example builds an IP layer on top of a WDM layer. The IP link between `A` and
//! `C` is carried by a lightpath demand in the WDM layer, routed over the fibers `A -> B -> C`.
//! The IP layer uses hop-by-hop routing.
//!
//! ```rust
//! use netplan::model::{NetPlan, RoutingType, RoutingCycleType};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut net = NetPlan::new();
//!     let wdm = net.default_layer();
//!     let ip = net.add_layer("IP", RoutingType::HopByHopRouting, "Gbps", "Gbps")?;
//!
//!     let a = net.add_node("A", 0.0, 0.0)?;
//!     let b = net.add_node("B", 100.0, 0.0)?;
//!     let c = net.add_node("C", 200.0, 0.0)?;
//!
//!     // fibers and lightpath
//!     let ab = net.add_link(wdm, a, b, 400.0, 100.0)?;
//!     let bc = net.add_link(wdm, b, c, 400.0, 100.0)?;
//!     let lightpath = net.add_demand(wdm, a, c, 100.0)?;
//!     net.add_route(lightpath, 100.0, vec![ab, bc], None)?;
//!
//!     // IP link on top of the lightpath
//!     let ip_link = net.couple_demand_to_new_link_created(lightpath, ip)?;
//!     assert_eq!(net.get_link(ip_link)?.capacity(), 100.0);
//!
//!     // IP demand routed hop-by-hop over the IP link
//!     let ip_demand = net.add_demand(ip, a, c, 40.0)?;
//!     net.set_forwarding_rule(ip_demand, ip_link, 1.0)?;
//!     assert!((net.get_carried_traffic(ip_demand)? - 40.0).abs() < 1e-9);
//!     assert_eq!(net.get_routing_cycle_type(ip_demand)?, RoutingCycleType::Loopless);
//!     assert!((net.get_link(ip_link)?.carried_traffic() - 40.0).abs() < 1e-9);
//!
//!     // a fiber cut takes down the lightpath, and the IP link loses its capacity
//!     net.set_link_failure_state(bc, false)?;
//!     assert_eq!(net.get_link(ip_link)?.capacity(), 0.0);
//!     assert!(net.is_link_oversubscribed(ip_link)?);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Consistency
//!
//! All caches (carried traffic of links, demands and multicast demands, occupied capacity of
//! links and resources, capacity of coupled links) are updated as part of every mutation. Enable
//! [`NetPlanConfig::check_consistency`] (or the cargo feature `check-consistency`) to recompute
//! everything from scratch after each mutation, and panic on the first mismatch.

mod aggregation;
pub mod config;
pub(crate) mod consistency;
pub mod coupling;
pub mod dag;
pub mod demand;
pub mod element;
pub mod forwarding;
pub mod layer;
pub mod link;
pub mod matrix;
pub mod multicast;
pub(crate) mod network;
pub mod node;
pub mod printer;
pub mod resource;
pub mod route;
pub mod routing;
mod source_routing;
pub mod types;

pub use config::NetPlanConfig;
pub use consistency::ConsistencyError;
pub use coupling::CoupledPairs;
pub use demand::Demand;
pub use forwarding::{ForwardingRules, LinkValues};
pub use layer::NetworkLayer;
pub use link::Link;
pub use multicast::{MulticastDemand, MulticastTree};
pub use network::NetPlan;
pub use node::Node;
pub use resource::Resource;
pub use route::Route;
pub use routing::{compute_routing_fundamental_matrix, FundamentalMatrixResult, HopByHopSolution};
pub use types::{
    DemandId, IntendedRecoveryType, LayerId, LinkId, LowerLayerCoupling, MulticastDemandId,
    MulticastTreeId, NetPlanError, NodeId, PathElement, ResourceId, RouteId, RouteRole,
    RoutingCycleType, RoutingType,
};
