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

//! Test demand aggregation: derived offered traffic, propagation and cycle detection.

use super::checked_net;
use crate::model::{DemandId, LinkId, NetPlan, NetPlanError, NodeId, RoutingType};
use assert_approx_eq::assert_approx_eq;

#[test]
fn test_aggregation_cycle() {
    let mut net = checked_net();
    let layer = net.default_layer();
    let n1 = net.add_node("n1", 0.0, 0.0).unwrap();
    let n2 = net.add_node("n2", 1.0, 0.0).unwrap();
    let l12 = net.add_link(layer, n1, n2, 10.0, 1.0).unwrap();
    let a = net.add_demand(layer, n1, n2, 5.0).unwrap();
    let b = net.add_demand(layer, n2, n1, 0.0).unwrap();
    net.add_route(a, 5.0, vec![l12], None).unwrap();

    net.attach_to_aggregated_demands(a, vec![(b, 1.0)]).unwrap();
    assert_approx_eq!(net.get_offered_traffic(b).unwrap(), 5.0);
    assert!(net.is_aggregated_demand(b).unwrap());
    assert!(!net.is_aggregated_demand(a).unwrap());

    assert_eq!(
        net.attach_to_aggregated_demands(b, vec![(a, 1.0)]),
        Err(NetPlanError::AggregationCycle(b, a))
    );
    assert_eq!(net.get_downstream_demands(a), Ok(vec![(b, 1.0)]));
    assert_eq!(net.get_upstream_demands(b), Ok(vec![(a, 1.0)]));
    assert!(net.get_downstream_demands(b).unwrap().is_empty());
    assert!(net.get_upstream_demands(a).unwrap().is_empty());
    assert_approx_eq!(net.get_offered_traffic(a).unwrap(), 5.0);
    assert_approx_eq!(net.get_offered_traffic(b).unwrap(), 5.0);
}

#[test]
fn test_invalid_attachments() {
    let mut net = checked_net();
    let layer = net.default_layer();
    let other_layer = net.add_layer("other", RoutingType::SourceRouting, "Gbps", "Gbps").unwrap();
    let n1 = net.add_node("n1", 0.0, 0.0).unwrap();
    let n2 = net.add_node("n2", 1.0, 0.0).unwrap();
    let n3 = net.add_node("n3", 2.0, 0.0).unwrap();
    let up = net.add_demand(layer, n1, n2, 5.0).unwrap();
    let d23 = net.add_demand(layer, n2, n3, 0.0).unwrap();
    let d13 = net.add_demand(layer, n1, n3, 0.0).unwrap();
    let other = net.add_demand(other_layer, n2, n3, 0.0).unwrap();

    assert_eq!(
        net.attach_to_aggregated_demands(up, vec![(d23, 0.5)]),
        Err(NetPlanError::InvalidFractions {
            demand: up,
            sum: 0.5,
        })
    );
    assert!(matches!(
        net.attach_to_aggregated_demands(up, vec![(d23, 1.5), (d13, -0.5)]),
        Err(NetPlanError::InvalidFractions { .. })
    ));
    assert!(matches!(
        net.attach_to_aggregated_demands(up, vec![(d13, 1.0)]),
        Err(NetPlanError::InvalidDownstreamDemand(..))
    ));
    assert!(matches!(
        net.attach_to_aggregated_demands(up, vec![(other, 1.0)]),
        Err(NetPlanError::WrongLayer { .. })
    ));
    assert!(net.get_downstream_demands(up).unwrap().is_empty());

    // the offered traffic of an aggregated demand is derived
    net.attach_to_aggregated_demands(up, vec![(d23, 1.0)]).unwrap();
    assert_eq!(net.set_offered_traffic(d23, 1.0), Err(NetPlanError::AggregatedDemand(d23)));
}

/// # Test network
///
/// ```text
/// n1 ---> n2 ---> n3
///          \
///           '---> n4
/// ```
///
/// Hop-by-hop layer. The demand `n1 => n2` is split into `n2 => n3` (40%) and `n2 => n4` (60%).
struct Chain {
    net: NetPlan,
    n2: NodeId,
    n3: NodeId,
    l23: LinkId,
    up: DemandId,
    d3: DemandId,
    d4: DemandId,
}

fn get_chain() -> Chain {
    let mut net = checked_net();
    let layer = net.add_layer("IP", RoutingType::HopByHopRouting, "Gbps", "Gbps").unwrap();
    let n1 = net.add_node("n1", 0.0, 0.0).unwrap();
    let n2 = net.add_node("n2", 1.0, 0.0).unwrap();
    let n3 = net.add_node("n3", 2.0, 0.0).unwrap();
    let n4 = net.add_node("n4", 2.0, 1.0).unwrap();
    let l12 = net.add_link(layer, n1, n2, 100.0, 1.0).unwrap();
    let l23 = net.add_link(layer, n2, n3, 100.0, 1.0).unwrap();
    let l24 = net.add_link(layer, n2, n4, 100.0, 1.0).unwrap();
    let up = net.add_demand(layer, n1, n2, 10.0).unwrap();
    let d3 = net.add_demand(layer, n2, n3, 0.0).unwrap();
    let d4 = net.add_demand(layer, n2, n4, 0.0).unwrap();
    net.set_forwarding_rules(vec![(up, l12, 1.0), (d3, l23, 1.0), (d4, l24, 1.0)]).unwrap();
    net.attach_to_aggregated_demands(up, vec![(d3, 0.4), (d4, 0.6)]).unwrap();
    Chain {
        net,
        n2,
        n3,
        l23,
        up,
        d3,
        d4,
    }
}

#[test]
fn test_propagation() {
    let Chain {
        mut net,
        l23,
        up,
        d3,
        d4,
        ..
    } = get_chain();
    assert_approx_eq!(net.get_offered_traffic(d3).unwrap(), 4.0);
    assert_approx_eq!(net.get_carried_traffic(d3).unwrap(), 4.0);
    assert_approx_eq!(net.get_carried_traffic(d4).unwrap(), 6.0);
    assert_approx_eq!(net.get_link(l23).unwrap().carried_traffic(), 4.0);

    net.set_offered_traffic(up, 20.0).unwrap();
    assert_approx_eq!(net.get_carried_traffic(d3).unwrap(), 8.0);
    assert_approx_eq!(net.get_carried_traffic(d4).unwrap(), 12.0);
    assert_approx_eq!(net.get_link(l23).unwrap().carried_traffic(), 8.0);

    // blocked upstream traffic is not offered downstream
    net.remove_all_forwarding_rules(up).unwrap();
    assert_approx_eq!(net.get_offered_traffic(d3).unwrap(), 0.0);
    assert_approx_eq!(net.get_link(l23).unwrap().carried_traffic(), 0.0);
}

#[test]
fn test_reattach() {
    let Chain {
        mut net,
        up,
        d3,
        d4,
        ..
    } = get_chain();

    // d4 is released, and becomes independent without traffic
    net.attach_to_aggregated_demands(up, vec![(d3, 1.0)]).unwrap();
    assert_approx_eq!(net.get_offered_traffic(d3).unwrap(), 10.0);
    assert!(!net.is_aggregated_demand(d4).unwrap());
    assert_approx_eq!(net.get_offered_traffic(d4).unwrap(), 0.0);
    assert_approx_eq!(net.get_carried_traffic(d4).unwrap(), 0.0);
    net.set_offered_traffic(d4, 2.0).unwrap();
    assert_approx_eq!(net.get_carried_traffic(d4).unwrap(), 2.0);

    net.clear_downstream_demands(up).unwrap();
    assert!(net.get_downstream_demands(up).unwrap().is_empty());
    assert_approx_eq!(net.get_offered_traffic(d3).unwrap(), 0.0);
    assert_approx_eq!(net.get_carried_traffic(d3).unwrap(), 0.0);
}

#[test]
fn test_multiple_upstream_demands() {
    let Chain {
        mut net,
        n2,
        n3,
        up,
        d3,
        ..
    } = get_chain();
    let layer = net.get_demand(up).unwrap().layer();
    let n5 = net.add_node("n5", 0.0, 1.0).unwrap();
    let l52 = net.add_link(layer, n5, n2, 100.0, 1.0).unwrap();
    let other = net.add_demand(layer, n5, n2, 5.0).unwrap();
    net.set_forwarding_rule(other, l52, 1.0).unwrap();
    net.attach_to_aggregated_demands(other, vec![(d3, 1.0)]).unwrap();

    assert_approx_eq!(net.get_offered_traffic(d3).unwrap(), 9.0);
    assert_approx_eq!(net.get_carried_traffic(d3).unwrap(), 9.0);
    assert_eq!(net.get_upstream_demands(d3).unwrap().len(), 2);

    // detaching one upstream demand keeps the other
    net.clear_downstream_demands(other).unwrap();
    assert!(net.is_aggregated_demand(d3).unwrap());
    assert_approx_eq!(net.get_offered_traffic(d3).unwrap(), 4.0);

    // a downstream demand cannot be removed, an upstream demand can
    assert!(matches!(net.remove_demand(d3), Err(NetPlanError::ElementStillReferenced(_))));
    net.remove_demand(up).unwrap();
    assert!(!net.is_aggregated_demand(d3).unwrap());
    assert_approx_eq!(net.get_offered_traffic(d3).unwrap(), 0.0);
    assert_approx_eq!(net.get_carried_traffic(d3).unwrap(), 0.0);
    assert_eq!(net.get_demand(d3).unwrap().egress(), n3);
    net.remove_demand(d3).unwrap();
}
