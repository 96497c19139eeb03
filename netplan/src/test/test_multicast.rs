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

//! Test multicast demands, multicast trees and their coupling to upper layer links.

use super::checked_net;
use crate::model::{LinkId, MulticastDemandId, NetPlan, NetPlanError, NodeId, RoutingType};
use assert_approx_eq::assert_approx_eq;

/// # Test network
///
/// ```text
///              .--> c
/// a ---> b ---+
///              '--> d ---> e
/// ```
///
/// The multicast demand goes from `a` to `c` and `d`, offering 5 units.
struct TestNet {
    net: NetPlan,
    a: NodeId,
    c: NodeId,
    d: NodeId,
    ab: LinkId,
    bc: LinkId,
    bd: LinkId,
    de: LinkId,
    md: MulticastDemandId,
}

fn get_test_net() -> TestNet {
    let mut net = checked_net();
    let layer = net.default_layer();
    let a = net.add_node("a", 0.0, 0.0).unwrap();
    let b = net.add_node("b", 1.0, 0.0).unwrap();
    let c = net.add_node("c", 2.0, 1.0).unwrap();
    let d = net.add_node("d", 2.0, -1.0).unwrap();
    let e = net.add_node("e", 3.0, -1.0).unwrap();
    let ab = net.add_link(layer, a, b, 100.0, 1.0).unwrap();
    let bc = net.add_link(layer, b, c, 100.0, 1.0).unwrap();
    let bd = net.add_link(layer, b, d, 100.0, 1.0).unwrap();
    let de = net.add_link(layer, d, e, 100.0, 1.0).unwrap();
    let md = net.add_multicast_demand(layer, a, vec![c, d], 5.0).unwrap();
    TestNet {
        net,
        a,
        c,
        d,
        ab,
        bc,
        bd,
        de,
        md,
    }
}

#[test]
fn test_multicast_tree() {
    let TestNet {
        mut net,
        c,
        d,
        ab,
        bc,
        bd,
        md,
        ..
    } = get_test_net();
    assert_eq!(net.get_multicast_demand(md).unwrap().egresses().collect::<Vec<_>>(), vec![c, d]);

    let t = net.add_multicast_tree(md, 5.0, None, vec![ab, bc, bd]).unwrap();
    assert_approx_eq!(net.get_multicast_demand(md).unwrap().carried_traffic(), 5.0);
    assert_approx_eq!(net.get_multicast_demand(md).unwrap().blocked_traffic(), 0.0);
    // every link carries the traffic once
    for l in vec![ab, bc, bd] {
        assert_approx_eq!(net.get_link(l).unwrap().carried_traffic(), 5.0);
        assert_eq!(
            net.get_link(l).unwrap().traversing_multicast_trees().collect::<Vec<_>>(),
            vec![t]
        );
    }

    net.set_multicast_tree_carried_traffic(t, 3.0, Some(4.0)).unwrap();
    assert_approx_eq!(net.get_multicast_demand(md).unwrap().carried_traffic(), 3.0);
    assert_approx_eq!(net.get_multicast_demand(md).unwrap().blocked_traffic(), 2.0);
    assert_approx_eq!(net.get_link(ab).unwrap().carried_traffic(), 3.0);
    assert_approx_eq!(net.get_link(ab).unwrap().occupied_capacity(), 4.0);

    net.set_multicast_demand_offered_traffic(md, 3.0).unwrap();
    assert_approx_eq!(net.get_multicast_demand(md).unwrap().blocked_traffic(), 0.0);

    net.remove_multicast_tree(t).unwrap();
    assert_approx_eq!(net.get_multicast_demand(md).unwrap().carried_traffic(), 0.0);
    assert_approx_eq!(net.get_link(ab).unwrap().occupied_capacity(), 0.0);
    assert!(net.get_multicast_trees(net.default_layer()).unwrap().is_empty());
}

#[test]
fn test_invalid_trees() {
    let TestNet {
        mut net,
        a,
        c,
        ab,
        bc,
        bd,
        de,
        md,
        ..
    } = get_test_net();
    let ac = net.add_link(net.default_layer(), a, c, 100.0, 1.0).unwrap();

    // not all egress nodes reached
    assert!(matches!(
        net.add_multicast_tree(md, 1.0, None, vec![ab, bc]),
        Err(NetPlanError::InvalidMulticastTree(_))
    ));
    // two links into c
    assert!(matches!(
        net.add_multicast_tree(md, 1.0, None, vec![ab, bc, bd, ac]),
        Err(NetPlanError::InvalidMulticastTree(_))
    ));
    // e is a leaf, but no egress node
    assert!(matches!(
        net.add_multicast_tree(md, 1.0, None, vec![ab, bc, bd, de]),
        Err(NetPlanError::InvalidMulticastTree(_))
    ));
    // links not reachable from the ingress
    assert!(matches!(
        net.add_multicast_tree(md, 1.0, None, vec![bc, bd]),
        Err(NetPlanError::InvalidMulticastTree(_))
    ));
    assert_eq!(
        net.add_multicast_tree(md, -1.0, None, vec![ab, bc, bd]),
        Err(NetPlanError::NegativeValue("carried traffic", -1.0))
    );
    assert!(net.get_multicast_trees(net.default_layer()).unwrap().is_empty());

    // invalid egress nodes
    assert_eq!(
        net.add_multicast_demand(net.default_layer(), a, vec![a, c], 1.0),
        Err(NetPlanError::InvalidEgressNodes)
    );
    assert_eq!(
        net.add_multicast_demand(net.default_layer(), a, Vec::new(), 1.0),
        Err(NetPlanError::InvalidEgressNodes)
    );
}

#[test]
fn test_tree_failure() {
    let TestNet {
        mut net,
        ab,
        bc,
        bd,
        md,
        ..
    } = get_test_net();
    let t = net.add_multicast_tree(md, 5.0, None, vec![ab, bc, bd]).unwrap();

    net.set_link_failure_state(bd, false).unwrap();
    assert!(net.is_multicast_tree_down(t).unwrap());
    assert_approx_eq!(net.get_multicast_demand(md).unwrap().carried_traffic(), 0.0);
    assert_approx_eq!(net.get_link(ab).unwrap().carried_traffic(), 0.0);

    net.set_link_failure_state(bd, true).unwrap();
    assert!(!net.is_multicast_tree_down(t).unwrap());
    assert_approx_eq!(net.get_link(ab).unwrap().carried_traffic(), 5.0);

    // removing a traversed link removes the tree
    net.remove_link(bd).unwrap();
    assert_eq!(net.get_multicast_tree(t), Err(NetPlanError::MulticastTreeNotFound(t)));
    assert_approx_eq!(net.get_multicast_demand(md).unwrap().carried_traffic(), 0.0);
    assert_approx_eq!(net.get_link(ab).unwrap().carried_traffic(), 0.0);
}

#[test]
fn test_multicast_coupling() {
    let TestNet {
        mut net,
        a,
        c,
        d,
        ab,
        bc,
        bd,
        md,
        ..
    } = get_test_net();
    let wdm = net.default_layer();
    let ip = net.add_layer("IP", RoutingType::HopByHopRouting, "Gbps", "Gbps").unwrap();
    net.add_multicast_tree(md, 5.0, None, vec![ab, bc, bd]).unwrap();

    let links = net.couple_multicast_demand_to_new_links_created(md, ip).unwrap();
    assert_eq!(links.len(), 2);
    for l in links.iter() {
        assert_approx_eq!(net.get_link(*l).unwrap().capacity(), 5.0);
        assert_eq!(net.get_link(*l).unwrap().origin(), a);
        assert_eq!(net.get_coupled_lower_multicast_demand(*l), Ok(Some(md)));
        assert_eq!(net.get_coupled_lower_demand(*l), Ok(None));
    }
    let by_egress = net.get_multicast_demand(md).unwrap().coupled_upper_layer_links().clone();
    assert_eq!(by_egress.keys().copied().collect::<Vec<_>>(), vec![c, d]);
    assert_eq!(net.get_coupled_pairs(wdm, ip).unwrap().multicast_link_pairs().count(), 2);

    // the capacity follows the carried traffic
    net.set_link_failure_state(ab, false).unwrap();
    for l in links.iter() {
        assert_approx_eq!(net.get_link(*l).unwrap().capacity(), 0.0);
    }
    net.set_link_failure_state(ab, true).unwrap();
    assert_approx_eq!(net.get_link(links[0]).unwrap().capacity(), 5.0);

    // capacity of coupled links is fixed
    assert_eq!(
        net.set_link_capacity(links[0], 1.0),
        Err(NetPlanError::CoupledLinkCapacity(links[0]))
    );
    assert_eq!(
        net.couple_multicast_demand_to_links(md, links.clone()),
        Err(NetPlanError::MulticastDemandAlreadyCoupled(md))
    );

    // decoupling one link decouples all of them
    net.decouple_link(links[1]).unwrap();
    for l in links.iter() {
        assert!(!net.is_link_coupled(*l).unwrap());
    }
    assert!(net.get_coupled_pairs(wdm, ip).is_none());

    // both egress nodes need a link
    assert_eq!(
        net.couple_multicast_demand_to_links(md, vec![links[0]]),
        Err(NetPlanError::EndNodesMismatch)
    );
    net.couple_multicast_demand_to_links(md, links.clone()).unwrap();

    // removing the multicast demand releases the coupling
    net.remove_multicast_demand(md).unwrap();
    for l in links.iter() {
        assert!(!net.is_link_coupled(*l).unwrap());
    }
    assert!(net.get_upper_layers(wdm).unwrap().is_empty());
    assert!(net.get_multicast_demands(wdm).unwrap().is_empty());
}

#[test]
fn test_multicast_in_hop_by_hop_layer() {
    let mut net = checked_net();
    let ip = net.add_layer("IP", RoutingType::HopByHopRouting, "Gbps", "Gbps").unwrap();
    let a = net.add_node("a", 0.0, 0.0).unwrap();
    let b = net.add_node("b", 1.0, 0.0).unwrap();
    let c = net.add_node("c", 1.0, 1.0).unwrap();
    let ab = net.add_link(ip, a, b, 10.0, 1.0).unwrap();
    let ac = net.add_link(ip, a, c, 10.0, 1.0).unwrap();
    let md = net.add_multicast_demand(ip, a, vec![b, c], 2.0).unwrap();
    net.add_multicast_tree(md, 2.0, None, vec![ab, ac]).unwrap();

    let d = net.add_demand(ip, a, b, 3.0).unwrap();
    net.set_forwarding_rule(d, ab, 1.0).unwrap();
    assert_approx_eq!(net.get_link(ab).unwrap().carried_traffic(), 5.0);
    assert_approx_eq!(net.get_link(ac).unwrap().carried_traffic(), 2.0);
}
