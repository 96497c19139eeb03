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

//! Test the structure of the network plan: layers, nodes, indices, removal and read-only mode.

use super::checked_net;
use crate::model::printer;
use crate::model::{NetPlan, NetPlanConfig, NetPlanError, RoutingType};
use assert_approx_eq::assert_approx_eq;

#[test]
fn test_layers() {
    let mut net = checked_net();
    let l0 = net.default_layer();
    assert_eq!(net.get_layers(), vec![l0]);
    assert_eq!(net.get_layer(l0).unwrap().name(), "Layer 0");
    assert_eq!(net.get_layer(l0).unwrap().routing_type(), RoutingType::SourceRouting);
    assert_eq!(net.remove_layer(l0), Err(NetPlanError::LastLayer));

    let ip = net.add_layer("IP", RoutingType::HopByHopRouting, "Gbps", "Gbps").unwrap();
    net.set_layer_name(l0, "WDM").unwrap();
    assert_eq!(net.get_layer(l0).unwrap().name(), "WDM");
    assert_eq!(net.get_layer_index(ip), Ok(1));

    // non-empty layers cannot be removed
    let a = net.add_node("a", 0.0, 0.0).unwrap();
    let b = net.add_node("b", 0.0, 0.0).unwrap();
    let l = net.add_link(l0, a, b, 1.0, 1.0).unwrap();
    assert!(matches!(net.remove_layer(l0), Err(NetPlanError::ElementStillReferenced(_))));
    net.remove_link(l).unwrap();

    // removing the default layer picks another one
    net.remove_layer(l0).unwrap();
    assert_eq!(net.default_layer(), ip);
    assert_eq!(net.get_layer_index(ip), Ok(0));
    assert_eq!(net.get_layer(l0).map(|_| ()), Err(NetPlanError::LayerNotFound(l0)));
}

#[test]
fn test_nodes() {
    let mut net = checked_net();
    let layer = net.default_layer();
    let a = net.add_node("a", 0.0, 0.0).unwrap();
    let b = net.add_node("b", 3.0, 4.0).unwrap();
    let c = net.add_node("c", 6.0, 8.0).unwrap();

    assert_eq!(net.get_node_by_name("b"), Ok(b));
    assert_eq!(net.get_node_by_name("x"), Err(NetPlanError::NodeNameNotFound("x".to_string())));
    assert_approx_eq!(net.get_node_pair_euclidean_distance(a, c).unwrap(), 10.0);
    net.set_node_position(c, 3.0, 0.0).unwrap();
    assert_approx_eq!(net.get_node_pair_euclidean_distance(a, c).unwrap(), 3.0);

    let (ab, ba) = net.add_link_bidirectional(layer, a, b, 10.0, 5.0).unwrap();
    assert_eq!(net.get_node(a).unwrap().outgoing_links(layer), vec![ab]);
    assert_eq!(net.get_node(a).unwrap().incoming_links(layer), vec![ba]);
    let d = net.add_demand(layer, a, b, 1.0).unwrap();
    assert_eq!(net.get_node(b).unwrap().incoming_demands(layer), vec![d]);

    // referenced nodes cannot be removed
    assert!(matches!(net.remove_node(a), Err(NetPlanError::ElementStillReferenced(_))));
    net.remove_node(c).unwrap();
    assert_eq!(net.get_nodes(), vec![a, b]);

    net.remove_demand(d).unwrap();
    assert!(net.get_node(b).unwrap().incoming_demands(layer).is_empty());
    net.remove_link(ab).unwrap();
    net.remove_link(ba).unwrap();
    assert!(!net.get_node(a).unwrap().is_referenced());
    net.remove_node(a).unwrap();
    assert_eq!(net.get_node_index(b), Ok(0));
}

#[test]
fn test_invalid_elements() {
    let mut net = checked_net();
    let layer = net.default_layer();
    let a = net.add_node("a", 0.0, 0.0).unwrap();
    let b = net.add_node("b", 0.0, 0.0).unwrap();

    assert_eq!(net.add_link(layer, a, a, 1.0, 1.0), Err(NetPlanError::SameEndNodes(a)));
    assert_eq!(
        net.add_link(layer, a, b, -1.0, 1.0),
        Err(NetPlanError::NegativeValue("link capacity", -1.0))
    );
    assert_eq!(
        net.add_link(layer, a, b, 1.0, -1.0),
        Err(NetPlanError::NegativeValue("link length", -1.0))
    );
    assert_eq!(net.add_demand(layer, b, b, 1.0), Err(NetPlanError::SameEndNodes(b)));
    assert_eq!(
        net.add_demand(layer, a, b, -1.0),
        Err(NetPlanError::NegativeValue("offered traffic", -1.0))
    );
    let d = net.add_demand(layer, a, b, 1.0).unwrap();
    assert_eq!(
        net.set_offered_traffic(d, -2.0),
        Err(NetPlanError::NegativeValue("offered traffic", -2.0))
    );
    assert!(net.get_links(layer).unwrap().is_empty());
}

#[test]
fn test_index_shift() {
    let mut net = checked_net();
    let layer = net.default_layer();
    let a = net.add_node("a", 0.0, 0.0).unwrap();
    let b = net.add_node("b", 0.0, 0.0).unwrap();
    let links = (0..4).map(|_| net.add_link(layer, a, b, 10.0, 1.0).unwrap()).collect::<Vec<_>>();
    let demands = (0..3).map(|_| net.add_demand(layer, a, b, 1.0).unwrap()).collect::<Vec<_>>();
    let r = net.add_route(demands[2], 1.0, vec![links[1]], None).unwrap();

    net.remove_link(links[0]).unwrap();
    assert_eq!(net.get_link_index(links[1]), Ok(0));
    assert_eq!(net.get_link_index(links[3]), Ok(2));
    assert_eq!(net.get_link(links[0]).map(|_| ()), Err(NetPlanError::LinkNotFound(links[0])));

    net.remove_demand(demands[1]).unwrap();
    assert_eq!(net.get_demand_index(demands[0]), Ok(0));
    assert_eq!(net.get_demand_index(demands[2]), Ok(1));
    assert_eq!(net.get_demands(layer).unwrap(), vec![demands[0], demands[2]]);
    assert_approx_eq!(net.get_carried_traffic(demands[2]).unwrap(), 1.0);

    // removing the traversed link removes the route
    net.remove_link(links[1]).unwrap();
    assert_eq!(net.get_route(r).map(|_| ()), Err(NetPlanError::RouteNotFound(r)));
    assert_approx_eq!(net.get_carried_traffic(demands[2]).unwrap(), 0.0);
    assert_eq!(net.get_links(layer).unwrap(), vec![links[2], links[3]]);
}

#[test]
fn test_read_only() {
    let mut net = checked_net();
    let layer = net.default_layer();
    let a = net.add_node("a", 0.0, 0.0).unwrap();
    let b = net.add_node("b", 0.0, 0.0).unwrap();
    let l = net.add_link(layer, a, b, 10.0, 1.0).unwrap();
    let d = net.add_demand(layer, a, b, 1.0).unwrap();

    net.set_modifiable(false);
    assert!(!net.is_modifiable());
    assert_eq!(net.add_node("c", 0.0, 0.0), Err(NetPlanError::NotModifiable));
    assert_eq!(net.add_route(d, 1.0, vec![l], None), Err(NetPlanError::NotModifiable));
    assert_eq!(net.set_link_capacity(l, 1.0), Err(NetPlanError::NotModifiable));
    assert_eq!(net.remove_demand(d), Err(NetPlanError::NotModifiable));
    assert_eq!(
        net.set_routing_type(layer, RoutingType::HopByHopRouting),
        Err(NetPlanError::NotModifiable)
    );

    // queries still work
    assert_approx_eq!(net.get_offered_traffic(d).unwrap(), 1.0);
    assert_eq!(net.get_nodes().len(), 2);

    net.set_modifiable(true);
    net.add_route(d, 1.0, vec![l], None).unwrap();
}

#[test]
fn test_precision_factor() {
    let mut net = NetPlan::with_config(NetPlanConfig {
        precision_factor: 0.5,
        check_consistency: true,
    });
    assert_approx_eq!(net.precision_factor(), 0.5);
    let layer = net.default_layer();
    let a = net.add_node("a", 0.0, 0.0).unwrap();
    let b = net.add_node("b", 0.0, 0.0).unwrap();
    let l = net.add_link(layer, a, b, 10.0, 1.0).unwrap();
    let d = net.add_demand(layer, a, b, 1.0).unwrap();
    net.add_route(d, 0.6, vec![l], Some(vec![10.4])).unwrap();

    assert_approx_eq!(net.get_blocked_traffic(d).unwrap(), 0.4);
    assert!(!net.is_blocked(d).unwrap());
    assert!(!net.is_link_oversubscribed(l).unwrap());

    let default = NetPlan::new();
    assert_approx_eq!(default.precision_factor(), 1e-3);
    assert_eq!(default.config().check_consistency, cfg!(feature = "check-consistency"));
}

#[test]
fn test_layer_summary() {
    let mut net = checked_net();
    let layer = net.default_layer();
    let a = net.add_node("a", 0.0, 0.0).unwrap();
    let b = net.add_node("b", 0.0, 0.0).unwrap();
    let l = net.add_link(layer, a, b, 10.0, 1.0).unwrap();
    let d = net.add_demand(layer, a, b, 3.0).unwrap();
    net.add_route(d, 2.0, vec![l], Some(vec![12.0])).unwrap();

    assert_eq!(printer::link(&net, l).unwrap(), "a -> b");
    assert_eq!(printer::demand(&net, d).unwrap(), "a => b");
    assert_eq!(
        printer::layer_summary(&net, layer).unwrap(),
        vec![
            "Layer Layer 0 (SOURCE_ROUTING)".to_string(),
            "  link a -> b: 2.000 / 10.000 Gbps (oversubscribed)".to_string(),
            "  demand a => b: 2.000 of 3.000 Gbps carried, LOOPLESS".to_string(),
        ]
    );
}

#[test]
fn test_validate_caches() {
    let mut net = NetPlan::new();
    let layer = net.default_layer();
    let a = net.add_node("a", 0.0, 0.0).unwrap();
    let b = net.add_node("b", 0.0, 0.0).unwrap();
    let l = net.add_link(layer, a, b, 10.0, 1.0).unwrap();
    let d = net.add_demand(layer, a, b, 3.0).unwrap();
    net.add_route(d, 2.0, vec![l], None).unwrap();
    assert_eq!(net.validate_caches(), Ok(()));
    net.check_caches_consistency();

    // clones are independent
    let mut clone = net.clone();
    clone.remove_demand(d).unwrap();
    assert_eq!(clone.validate_caches(), Ok(()));
    assert_approx_eq!(net.get_link(l).unwrap().carried_traffic(), 2.0);
    assert_approx_eq!(clone.get_link(l).unwrap().carried_traffic(), 0.0);
}
