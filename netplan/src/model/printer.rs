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

//! # Helper (printer) functions for the network plan
//! Module containing helper functions to get formatted strings of the elements of the network
//! plan, with the node names inserted.

use crate::model::network::NetPlan;
use crate::model::types::{DemandId, LayerId, LinkId, NetPlanError, PathElement, RouteId};

use itertools::Itertools;

/// Returns the formatted string of a link, e.g. `A -> B`.
pub fn link(net: &NetPlan, link: LinkId) -> Result<String, NetPlanError> {
    let l = net.get_link(link)?;
    Ok(format!("{} -> {}", net.get_node(l.origin)?.name(), net.get_node(l.destination)?.name()))
}

/// Returns the formatted string of a demand, e.g. `A => B`.
pub fn demand(net: &NetPlan, demand: DemandId) -> Result<String, NetPlanError> {
    let d = net.get_demand(demand)?;
    Ok(format!("{} => {}", net.get_node(d.ingress())?.name(), net.get_node(d.egress())?.name()))
}

/// Returns the formatted path of a route, e.g. `A -> B -> [firewall fw1] -> C`.
pub fn route(net: &NetPlan, route: RouteId) -> Result<String, NetPlanError> {
    let r = net.get_route(route)?;
    let mut parts: Vec<String> = Vec::with_capacity(r.path().len() + 1);
    for (i, elem) in r.path().iter().enumerate() {
        match elem {
            PathElement::Link(l) => {
                let l = net.get_link(*l)?;
                if i == 0 {
                    parts.push(net.get_node(l.origin())?.name().to_string());
                }
                parts.push(net.get_node(l.destination())?.name().to_string());
            }
            PathElement::Resource(x) => {
                let x = net.get_resource(*x)?;
                parts.push(format!("[{} {}]", x.resource_type(), x.name()));
            }
        }
    }
    Ok(parts.iter().join(" -> "))
}

/// Returns a vector of lines describing the state of a layer: one line per link with its carried
/// traffic and capacity, and one line per demand with its offered and carried traffic.
pub fn layer_summary(net: &NetPlan, layer: LayerId) -> Result<Vec<String>, NetPlanError> {
    let layer_obj = net.get_layer(layer)?;
    let mut result = vec![format!("Layer {} ({})", layer_obj.name(), layer_obj.routing_type())];
    for l in layer_obj.links().iter() {
        let link_obj = net.get_link(l)?;
        result.push(format!(
            "  link {}: {:.3} / {:.3} {}{}",
            link(net, l)?,
            link_obj.carried_traffic(),
            link_obj.capacity(),
            layer_obj.link_capacity_units(),
            if net.is_link_oversubscribed(l)? { " (oversubscribed)" } else { "" }
        ));
    }
    for d in layer_obj.demands().iter() {
        result.push(format!(
            "  demand {}: {:.3} of {:.3} {} carried, {}",
            demand(net, d)?,
            net.get_carried_traffic(d)?,
            net.get_offered_traffic(d)?,
            layer_obj.demand_traffic_units(),
            net.get_routing_cycle_type(d)?
        ));
    }
    Ok(result)
}
