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

//! Test hop-by-hop routing: forwarding rules, cycle classification and traffic conservation.

use super::checked_net;
use crate::model::{
    DemandId, LayerId, LinkId, LinkValues, NetPlan, NetPlanError, NodeId, RoutingCycleType,
    RoutingType,
};
use assert_approx_eq::assert_approx_eq;
use maplit::btreemap;
use rand::prelude::*;

/// # Test network
///
/// ```text
///      .--> b ---.
///     /           v
///    a             d
///     \           ^
///      '--> c ---'
/// ```
///
/// All links have a capacity of 100. The link `c -> d` is 300km long, all others 100km. The
/// demand `a => d` offers 10 units.
struct Diamond {
    net: NetPlan,
    layer: LayerId,
    a: NodeId,
    b: NodeId,
    d: NodeId,
    ab: LinkId,
    ac: LinkId,
    bd: LinkId,
    cd: LinkId,
    demand: DemandId,
}

fn get_diamond() -> Diamond {
    let mut net = checked_net();
    let layer = net.add_layer("IP", RoutingType::HopByHopRouting, "Gbps", "Gbps").unwrap();
    let a = net.add_node("a", 0.0, 0.0).unwrap();
    let b = net.add_node("b", 100.0, 100.0).unwrap();
    let c = net.add_node("c", 100.0, -100.0).unwrap();
    let d = net.add_node("d", 200.0, 0.0).unwrap();
    let ab = net.add_link(layer, a, b, 100.0, 100.0).unwrap();
    let ac = net.add_link(layer, a, c, 100.0, 100.0).unwrap();
    let bd = net.add_link(layer, b, d, 100.0, 100.0).unwrap();
    let cd = net.add_link(layer, c, d, 100.0, 300.0).unwrap();
    let demand = net.add_demand(layer, a, d, 10.0).unwrap();
    Diamond {
        net,
        layer,
        a,
        b,
        d,
        ab,
        ac,
        bd,
        cd,
        demand,
    }
}

#[test]
fn test_parallel_links() {
    let mut net = checked_net();
    let layer = net.add_layer("IP", RoutingType::HopByHopRouting, "Gbps", "Gbps").unwrap();
    let a = net.add_node("a", 0.0, 0.0).unwrap();
    let e = net.add_node("e", 1.0, 0.0).unwrap();
    let la = net.add_link(layer, a, e, 100.0, 1.0).unwrap();
    let lb = net.add_link(layer, a, e, 100.0, 1.0).unwrap();
    let demand = net.add_demand(layer, a, e, 4.0).unwrap();

    let fractions: LinkValues = btreemap! {la => 0.5, lb => 0.5};
    let solution = net.compute_routing_fundamental_matrix_demand(demand, &fractions).unwrap();
    assert_eq!(solution.fundamental.cycle_type, RoutingCycleType::Loopless);
    assert_approx_eq!(solution.fundamental.absorption, 1.0);
    let ia = net.get_node_index(a).unwrap();
    assert_approx_eq!(solution.fundamental.drop_fractions[ia], 0.0);
    assert_approx_eq!(solution.carried_traffic, 4.0);
    assert_approx_eq!(solution.link_traffic[&la], 2.0);
    assert_approx_eq!(solution.link_traffic[&lb], 2.0);

    // computing the matrix does not change anything
    assert_approx_eq!(net.get_carried_traffic(demand).unwrap(), 0.0);
    assert!(net.get_forwarding_rules(demand).unwrap().is_empty());

    net.set_forwarding_rules(vec![(demand, la, 0.5), (demand, lb, 0.5)]).unwrap();
    assert_approx_eq!(net.get_carried_traffic(demand).unwrap(), 4.0);
    assert_eq!(net.get_routing_cycle_type(demand), Ok(RoutingCycleType::Loopless));
    assert!(net.is_bifurcated(demand).unwrap());
    assert_approx_eq!(net.get_link(la).unwrap().carried_traffic(), 2.0);
    assert_approx_eq!(net.get_link(lb).unwrap().occupied_capacity(), 2.0);
}

#[test]
fn test_diamond() {
    let Diamond {
        mut net,
        ab,
        ac,
        bd,
        cd,
        demand,
        ..
    } = get_diamond();

    net.set_forwarding_rules(vec![
        (demand, ab, 0.5),
        (demand, ac, 0.5),
        (demand, bd, 1.0),
        (demand, cd, 1.0),
    ])
    .unwrap();
    assert_approx_eq!(net.get_carried_traffic(demand).unwrap(), 10.0);
    assert!(!net.is_blocked(demand).unwrap());
    for l in vec![ab, ac, bd, cd] {
        assert_approx_eq!(net.get_demand_traffic_on_link(demand, l).unwrap(), 5.0);
        assert_approx_eq!(net.get_link(l).unwrap().carried_traffic(), 5.0);
    }
    assert_approx_eq!(net.get_forwarding_rule(demand, ab).unwrap(), 0.5);

    // longest path is a -> c -> d with 400km
    assert_approx_eq!(net.get_worst_case_propagation_time_ms(demand).unwrap(), 2.0);

    let (primary, backup) = net
        .get_links_this_layer_potentially_carrying_traffic(demand, false)
        .unwrap();
    assert_eq!(primary, maplit::btreeset! {ab, ac, bd, cd});
    assert!(backup.is_empty());

    // the carried traffic follows the offered traffic
    net.set_offered_traffic(demand, 20.0).unwrap();
    assert_approx_eq!(net.get_carried_traffic(demand).unwrap(), 20.0);
    assert_approx_eq!(net.get_link(cd).unwrap().carried_traffic(), 10.0);

    // a rule of zero removes the rule
    net.set_forwarding_rule(demand, ac, 0.0).unwrap();
    assert_eq!(net.get_forwarding_rules(demand).unwrap().len(), 3);
    assert_approx_eq!(net.get_carried_traffic(demand).unwrap(), 10.0);
    assert_approx_eq!(net.get_blocked_traffic(demand).unwrap(), 10.0);
    assert_approx_eq!(net.get_link(cd).unwrap().carried_traffic(), 0.0);
    assert_approx_eq!(net.get_worst_case_propagation_time_ms(demand).unwrap(), 1.0);

    net.remove_all_forwarding_rules(demand).unwrap();
    assert_approx_eq!(net.get_carried_traffic(demand).unwrap(), 0.0);
    assert_approx_eq!(net.get_link(ab).unwrap().carried_traffic(), 0.0);
}

#[test]
fn test_open_cycle() {
    let Diamond {
        mut net,
        layer,
        a,
        b,
        d,
        ab,
        bd,
        demand,
        ..
    } = get_diamond();
    let ba = net.add_link(layer, b, a, 100.0, 100.0).unwrap();

    net.set_forwarding_rules(vec![(demand, ab, 1.0), (demand, ba, 0.5), (demand, bd, 0.5)])
        .unwrap();
    assert_eq!(net.get_routing_cycle_type(demand), Ok(RoutingCycleType::OpenCycles));
    // every node is visited twice on average
    assert_approx_eq!(net.get_link(ab).unwrap().carried_traffic(), 20.0);
    assert_approx_eq!(net.get_link(ba).unwrap().carried_traffic(), 10.0);
    assert_approx_eq!(net.get_link(bd).unwrap().carried_traffic(), 10.0);
    assert_approx_eq!(net.get_carried_traffic(demand).unwrap(), 10.0);
    assert!(net.get_worst_case_propagation_time_ms(demand).unwrap().is_infinite());

    let rules = net.get_forwarding_rules(demand).unwrap();
    let solution = net.compute_routing_fundamental_matrix_demand(demand, &rules).unwrap();
    let m = solution.fundamental.matrix.unwrap();
    let (ia, id) = (net.get_node_index(a).unwrap(), net.get_node_index(d).unwrap());
    assert_approx_eq!(m[(ia, ia)], 2.0);
    assert_approx_eq!(m[(ia, id)], 1.0);
}

#[test]
fn test_closed_cycle() {
    let Diamond {
        mut net,
        layer,
        a,
        b,
        ab,
        demand,
        ..
    } = get_diamond();
    let ba = net.add_link(layer, b, a, 100.0, 100.0).unwrap();

    net.set_forwarding_rules(vec![(demand, ab, 1.0), (demand, ba, 1.0)]).unwrap();
    assert_eq!(net.get_routing_cycle_type(demand), Ok(RoutingCycleType::ClosedCycles));
    assert_approx_eq!(net.get_carried_traffic(demand).unwrap(), 0.0);
    assert_approx_eq!(net.get_link(ab).unwrap().carried_traffic(), 0.0);
    assert_approx_eq!(net.get_blocked_traffic(demand).unwrap(), 10.0);

    // the demand cannot be converted into routes
    assert_eq!(
        net.set_routing_type(layer, RoutingType::SourceRouting),
        Err(NetPlanError::ClosedRoutingCycles(demand))
    );
    assert_eq!(net.get_layer(layer).unwrap().routing_type(), RoutingType::HopByHopRouting);

    // leaking traffic at b opens the cycle
    net.set_forwarding_rule(demand, ba, 0.9).unwrap();
    assert_eq!(net.get_routing_cycle_type(demand), Ok(RoutingCycleType::OpenCycles));
}

#[test]
fn test_dropped_traffic() {
    let Diamond {
        mut net,
        ab,
        bd,
        demand,
        ..
    } = get_diamond();

    net.set_forwarding_rules(vec![(demand, ab, 0.5), (demand, bd, 0.8)]).unwrap();
    assert_approx_eq!(net.get_carried_traffic(demand).unwrap(), 4.0);
    assert_approx_eq!(net.get_blocked_traffic(demand).unwrap(), 6.0);
    assert!(net.is_blocked(demand).unwrap());
    assert!(!net.is_bifurcated(demand).unwrap());
    assert_approx_eq!(net.get_link(ab).unwrap().carried_traffic(), 5.0);
    assert_approx_eq!(net.get_link(bd).unwrap().carried_traffic(), 4.0);
}

#[test]
fn test_invalid_rules() {
    let Diamond {
        mut net,
        a,
        d,
        ab,
        ac,
        bd,
        demand,
        ..
    } = get_diamond();
    net.set_forwarding_rules(vec![(demand, ab, 1.0), (demand, bd, 1.0)]).unwrap();

    assert_eq!(
        net.set_forwarding_rule(demand, ac, 1.5),
        Err(NetPlanError::InvalidForwardingFraction(ac, 1.5))
    );
    assert_eq!(
        net.set_forwarding_rule(demand, ac, -0.1),
        Err(NetPlanError::InvalidForwardingFraction(ac, -0.1))
    );
    assert_eq!(
        net.set_forwarding_rule(demand, ac, 0.5),
        Err(NetPlanError::ForwardingFractionsExceeded(demand, a, 1.5))
    );
    // the batch is validated as a whole
    net.set_forwarding_rules(vec![(demand, ab, 0.5), (demand, ac, 0.5)]).unwrap();
    assert_approx_eq!(net.get_forwarding_rule(demand, ab).unwrap(), 0.5);

    // links of other layers
    let wdm = net.default_layer();
    let fiber = net.add_link(wdm, a, d, 100.0, 1.0).unwrap();
    assert!(matches!(
        net.set_forwarding_rule(demand, fiber, 0.1),
        Err(NetPlanError::WrongLayer { .. })
    ));

    // forwarding rules in source routing layers
    let lightpath = net.add_demand(wdm, a, d, 1.0).unwrap();
    assert_eq!(
        net.set_forwarding_rule(lightpath, fiber, 1.0),
        Err(NetPlanError::WrongRoutingType {
            layer: wdm,
            expected: RoutingType::HopByHopRouting,
        })
    );
    assert_approx_eq!(net.get_carried_traffic(demand).unwrap(), 5.0);
}

#[test]
fn test_failures() {
    let Diamond {
        mut net,
        b,
        ab,
        ac,
        bd,
        cd,
        demand,
        ..
    } = get_diamond();
    net.set_forwarding_rules(vec![
        (demand, ab, 0.5),
        (demand, ac, 0.5),
        (demand, bd, 1.0),
        (demand, cd, 1.0),
    ])
    .unwrap();

    net.set_link_failure_state(bd, false).unwrap();
    assert_approx_eq!(net.get_carried_traffic(demand).unwrap(), 5.0);
    assert_approx_eq!(net.get_link(bd).unwrap().carried_traffic(), 0.0);
    // the rule is kept
    assert_approx_eq!(net.get_forwarding_rule(demand, bd).unwrap(), 1.0);
    let (primary, _) = net.get_links_this_layer_potentially_carrying_traffic(demand, true).unwrap();
    assert!(primary.contains(&bd));
    net.set_link_failure_state(bd, true).unwrap();
    assert_approx_eq!(net.get_carried_traffic(demand).unwrap(), 10.0);

    net.set_node_failure_state(b, false).unwrap();
    assert_approx_eq!(net.get_carried_traffic(demand).unwrap(), 5.0);
    assert_approx_eq!(net.get_link(ab).unwrap().carried_traffic(), 0.0);
    net.set_node_failure_state(b, true).unwrap();
    assert_approx_eq!(net.get_link(ab).unwrap().carried_traffic(), 5.0);
}

#[test]
fn test_remove_link_with_rules() {
    let Diamond {
        mut net,
        layer,
        ab,
        ac,
        bd,
        cd,
        demand,
        ..
    } = get_diamond();
    net.set_forwarding_rules(vec![
        (demand, ab, 0.5),
        (demand, ac, 0.5),
        (demand, bd, 1.0),
        (demand, cd, 1.0),
    ])
    .unwrap();

    net.remove_link(bd).unwrap();
    assert_eq!(net.get_forwarding_rules(demand).unwrap().len(), 3);
    assert_approx_eq!(net.get_carried_traffic(demand).unwrap(), 5.0);
    assert_eq!(net.get_links(layer).unwrap(), vec![ab, ac, cd]);
    assert_eq!(net.get_link_index(cd), Ok(2));
}

/// Random forwarding rules on a full mesh: the carried traffic of every demand equals the traffic
/// entering its egress node, minus the traffic leaving it, and the link caches are the sum of the
/// traffic of all demands.
#[test]
fn test_conservation_random() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..5 {
        let mut net = checked_net();
        let layer = net.add_layer("IP", RoutingType::HopByHopRouting, "Gbps", "Gbps").unwrap();
        let nodes = (0..6)
            .map(|i| net.add_node(format!("n{}", i), i as f64, 0.0).unwrap())
            .collect::<Vec<_>>();
        for a in nodes.iter() {
            for b in nodes.iter().filter(|b| *b != a) {
                net.add_link(layer, *a, *b, 1000.0, 1.0).unwrap();
            }
        }

        let mut demands = Vec::new();
        for _ in 0..3 {
            let ingress = *nodes.choose(&mut rng).unwrap();
            let egress = *nodes.iter().filter(|n| **n != ingress).choose(&mut rng).unwrap();
            let demand = net.add_demand(layer, ingress, egress, rng.gen_range(1.0, 10.0)).unwrap();

            let mut rules = Vec::new();
            for n in nodes.iter().filter(|n| **n != egress) {
                let out = net.get_node(*n).unwrap().outgoing_links(layer);
                let weights = out.iter().map(|_| rng.gen_range(0.0, 1.0)).collect::<Vec<f64>>();
                let total: f64 = weights.iter().sum();
                let sum_out = rng.gen_range(0.5, 0.95);
                for (l, w) in out.into_iter().zip(weights) {
                    rules.push((demand, l, sum_out * w / total));
                }
            }
            net.set_forwarding_rules(rules).unwrap();
            demands.push(demand);
        }

        for demand in demands.iter() {
            let egress = net.get_demand(*demand).unwrap().egress();
            let node = net.get_node(egress).unwrap();
            let traffic_in: f64 = node
                .incoming_links(layer)
                .into_iter()
                .map(|l| net.get_demand_traffic_on_link(*demand, l).unwrap())
                .sum();
            let traffic_out: f64 = node
                .outgoing_links(layer)
                .into_iter()
                .map(|l| net.get_demand_traffic_on_link(*demand, l).unwrap())
                .sum();
            let carried = net.get_carried_traffic(*demand).unwrap();
            assert!((carried - (traffic_in - traffic_out)).abs() < 1e-3);
            assert!(carried <= net.get_offered_traffic(*demand).unwrap() + 1e-9);
            assert_ne!(net.get_routing_cycle_type(*demand), Ok(RoutingCycleType::ClosedCycles));
        }

        for l in net.get_links(layer).unwrap() {
            let expected: f64 = demands
                .iter()
                .map(|d| net.get_demand_traffic_on_link(*d, l).unwrap())
                .sum();
            assert!((net.get_link(l).unwrap().carried_traffic() - expected).abs() < 1e-6);
        }
    }
}
