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

//! Module containing all type definitions

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Node Identification
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct NodeId(pub u64);
/// Link Identification
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct LinkId(pub u64);
/// Unicast Demand Identification
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct DemandId(pub u64);
/// Multicast Demand Identification
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct MulticastDemandId(pub u64);
/// Route Identification
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct RouteId(pub u64);
/// Multicast Tree Identification
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct MulticastTreeId(pub u64);
/// Resource Identification
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct ResourceId(pub u64);
/// Network Layer Identification
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy)]
pub struct LayerId(pub u64);

/// How the traffic of the demands in a layer is routed.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum RoutingType {
    /// Traffic is carried along explicit end-to-end [`Route`](crate::model::Route) objects.
    SourceRouting,
    /// Traffic is split at each node according to fractional forwarding rules.
    HopByHopRouting,
}

impl fmt::Display for RoutingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceRouting => write!(f, "SOURCE_ROUTING"),
            Self::HopByHopRouting => write!(f, "HOP_BY_HOP_ROUTING"),
        }
    }
}

impl FromStr for RoutingType {
    type Err = NetPlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SOURCE_ROUTING" => Ok(Self::SourceRouting),
            "HOP_BY_HOP_ROUTING" => Ok(Self::HopByHopRouting),
            _ => Err(NetPlanError::UnknownRoutingType(s.to_string())),
        }
    }
}

/// Classification of the routing of a single demand.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum RoutingCycleType {
    /// No node is visited twice.
    Loopless,
    /// Some node is visited more than once in expectation, but all traffic eventually reaches
    /// the egress node or is dropped.
    OpenCycles,
    /// Some traffic is trapped in a cycle forever.
    ClosedCycles,
    /// Fallback for names which are not known.
    Unknown,
}

impl fmt::Display for RoutingCycleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loopless => write!(f, "LOOPLESS"),
            Self::OpenCycles => write!(f, "OPEN_CYCLES"),
            Self::ClosedCycles => write!(f, "CLOSED_CYCLES"),
            Self::Unknown => write!(f, "UNKNOWNTYPE"),
        }
    }
}

impl FromStr for RoutingCycleType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "LOOPLESS" => Self::Loopless,
            "OPEN_CYCLES" => Self::OpenCycles,
            "CLOSED_CYCLES" => Self::ClosedCycles,
            _ => Self::Unknown,
        })
    }
}

/// Intended recovery policy of a demand. This is advisory metadata, it is never enforced by the
/// model itself.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum IntendedRecoveryType {
    /// No recovery
    None,
    /// Traffic is rerouted after a failure
    Restoration,
    /// Traffic switches to a backup route and stays there
    ProtectionNoRevert,
    /// Traffic switches to a backup route and reverts to the primary once repaired
    ProtectionRevert,
    /// Fallback for names which are not known.
    Unknown,
}

impl Default for IntendedRecoveryType {
    fn default() -> Self {
        Self::None
    }
}

impl fmt::Display for IntendedRecoveryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Restoration => write!(f, "RESTORATION"),
            Self::ProtectionNoRevert => write!(f, "PROTECTION_NOREVERT"),
            Self::ProtectionRevert => write!(f, "PROTECTION_REVERT"),
            Self::Unknown => write!(f, "UNKNOWNTYPE"),
        }
    }
}

impl FromStr for IntendedRecoveryType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "NONE" => Self::None,
            "RESTORATION" => Self::Restoration,
            "PROTECTION_NOREVERT" => Self::ProtectionNoRevert,
            "PROTECTION_REVERT" => Self::ProtectionRevert,
            _ => Self::Unknown,
        })
    }
}

/// Element traversed by a route. Service chains interleave resources with the links.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum PathElement {
    /// Link of the route's layer
    Link(LinkId),
    /// Resource hosted at the node where the route currently is
    Resource(ResourceId),
}

impl PathElement {
    /// Returns the link, if the element is a link.
    pub fn link(&self) -> Option<LinkId> {
        match self {
            Self::Link(l) => Some(*l),
            Self::Resource(_) => None,
        }
    }

    /// Returns the resource, if the element is a resource.
    pub fn resource(&self) -> Option<ResourceId> {
        match self {
            Self::Link(_) => None,
            Self::Resource(r) => Some(*r),
        }
    }
}

impl From<LinkId> for PathElement {
    fn from(l: LinkId) -> Self {
        Self::Link(l)
    }
}

impl From<ResourceId> for PathElement {
    fn from(r: ResourceId) -> Self {
        Self::Resource(r)
    }
}

/// Role of a route inside the protection scheme of its demand.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum RouteRole {
    /// Regular route, possibly with backup routes
    Primary,
    /// Backup of the given primary route
    BackupOf(RouteId),
}

/// Lower-layer element to which a link is coupled.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum LowerLayerCoupling {
    /// The link capacity equals the carried traffic of this demand
    Demand(DemandId),
    /// The link capacity equals the carried traffic of this multicast demand
    MulticastDemand(MulticastDemandId),
}

/// Validation errors of the network plan. Whenever such an error is returned, the network plan
/// was left unchanged.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum NetPlanError {
    /// The network plan is read-only
    #[error("The network plan is not modifiable")]
    NotModifiable,
    /// Layer is not present
    #[error("Layer was not found: {0:?}")]
    LayerNotFound(LayerId),
    /// Node is not present
    #[error("Node was not found: {0:?}")]
    NodeNotFound(NodeId),
    /// Node name is not present
    #[error("Node name was not found: {0}")]
    NodeNameNotFound(String),
    /// Link is not present
    #[error("Link was not found: {0:?}")]
    LinkNotFound(LinkId),
    /// Demand is not present
    #[error("Demand was not found: {0:?}")]
    DemandNotFound(DemandId),
    /// Multicast demand is not present
    #[error("Multicast demand was not found: {0:?}")]
    MulticastDemandNotFound(MulticastDemandId),
    /// Route is not present
    #[error("Route was not found: {0:?}")]
    RouteNotFound(RouteId),
    /// Multicast tree is not present
    #[error("Multicast tree was not found: {0:?}")]
    MulticastTreeNotFound(MulticastTreeId),
    /// Resource is not present
    #[error("Resource was not found: {0:?}")]
    ResourceNotFound(ResourceId),
    /// A value which must not be negative is negative
    #[error("The {0} must not be negative, but is {1}")]
    NegativeValue(&'static str, f64),
    /// Links and demands must connect two different nodes
    #[error("Origin and destination must be different nodes: {0:?}")]
    SameEndNodes(NodeId),
    /// Multicast demand has no valid egress node
    #[error("Multicast demand needs at least one egress node different from the ingress")]
    InvalidEgressNodes,
    /// Two elements which must be in the same layer are not
    #[error("Element is in layer {found:?}, but layer {expected:?} was expected")]
    WrongLayer {
        /// Layer that was required
        expected: LayerId,
        /// Layer of the element
        found: LayerId,
    },
    /// Operation is not allowed with the routing type of the layer
    #[error("Operation needs a layer with {expected}, but {layer:?} uses a different routing type")]
    WrongRoutingType {
        /// Layer of the element
        layer: LayerId,
        /// Required routing type
        expected: RoutingType,
    },
    /// The demand is a downstream aggregated demand, its offered traffic is derived
    #[error("The offered traffic of the aggregated demand {0:?} cannot be set")]
    AggregatedDemand(DemandId),
    /// Downstream fractions are invalid
    #[error("Downstream fractions of {demand:?} must be non-negative and sum to 1 (sum {sum})")]
    InvalidFractions {
        /// Upstream demand
        demand: DemandId,
        /// Sum of the fractions
        sum: f64,
    },
    /// A demand cannot become a downstream demand
    #[error("Demand {0:?} cannot be attached as downstream demand: {1}")]
    InvalidDownstreamDemand(DemandId, &'static str),
    /// Demand aggregation would contain a cycle
    #[error("Attaching {1:?} downstream of {0:?} would create an aggregation cycle")]
    AggregationCycle(DemandId, DemandId),
    /// Coupling would create a cycle among layers
    #[error("Coupling layer {0:?} below layer {1:?} would create a layer coupling cycle")]
    LayerCouplingCycle(LayerId, LayerId),
    /// Coupled elements must be in different layers
    #[error("Cannot couple elements of the same layer {0:?}")]
    SameLayerCoupling(LayerId),
    /// End nodes of the coupled elements are not the same
    #[error("End nodes of the coupled elements do not match")]
    EndNodesMismatch,
    /// Units of the coupled layers do not match
    #[error("Units mismatch: lower layer traffic in {lower}, upper layer capacity in {upper}")]
    UnitsMismatch {
        /// Demand traffic units of the lower layer
        lower: String,
        /// Link capacity units of the upper layer
        upper: String,
    },
    /// Link is already coupled
    #[error("Link {0:?} is already coupled")]
    LinkAlreadyCoupled(LinkId),
    /// Demand is already coupled
    #[error("Demand {0:?} is already coupled")]
    DemandAlreadyCoupled(DemandId),
    /// Multicast demand is already coupled
    #[error("Multicast demand {0:?} is already coupled")]
    MulticastDemandAlreadyCoupled(MulticastDemandId),
    /// Capacity of a coupled link is dictated by the lower layer
    #[error("The capacity of the coupled link {0:?} cannot be set")]
    CoupledLinkCapacity(LinkId),
    /// Element cannot be removed, because others still reference it
    #[error("Element is still referenced: {0}")]
    ElementStillReferenced(String),
    /// The last layer cannot be removed
    #[error("The last layer of the network plan cannot be removed")]
    LastLayer,
    /// Path is not valid for the demand
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    /// Resources of the path do not match the mandatory resource types
    #[error("Resources of the path do not match the service chain of demand {0:?}")]
    ServiceChainMismatch(DemandId),
    /// Occupied capacities do not match the path
    #[error("Expected {expected} occupied capacity values, but {found} were given")]
    OccupationLength {
        /// Length of the path
        expected: usize,
        /// Number of values given
        found: usize,
    },
    /// Forwarding fraction is not within `[0, 1]`
    #[error("Forwarding fraction {1} for link {0:?} is not within [0, 1]")]
    InvalidForwardingFraction(LinkId, f64),
    /// Fractions going out of a node sum up to more than 1
    #[error("Forwarding fractions of demand {0:?} out of node {1:?} sum up to {2}")]
    ForwardingFractionsExceeded(DemandId, NodeId, f64),
    /// Route cannot be used as backup route
    #[error("Route {0:?} cannot be used as backup: {1}")]
    InvalidBackupRoute(RouteId, &'static str),
    /// Multicast tree is invalid
    #[error("Invalid multicast tree: {0}")]
    InvalidMulticastTree(String),
    /// The routing of a demand has closed cycles, and cannot be converted into routes.
    #[error("Demand {0:?} has closed routing cycles")]
    ClosedRoutingCycles(DemandId),
    /// Mandatory resource types cannot change while the demand is routed
    #[error("Demand {0:?} still has routes")]
    DemandHasRoutes(DemandId),
    /// Routing type name is unknown
    #[error("Unknown routing type: {0}")]
    UnknownRoutingType(String),
}
