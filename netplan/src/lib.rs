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

#![deny(missing_docs)]

//! # NetPlan: Multilayer Network Planning and Traffic Consistency
//! This is a library for modelling a multilayer network design (nodes, links, demands, routes,
//! multicast trees and resources across stacked layers), and for keeping the carried traffic, the
//! routing and the coupling of the layers consistent under every edit.
//!
//! ## Structure
//!
//! This library is structured in the following way:
//!
//! - **[`Model`](model)**: The network plan itself. See the main structure
//!   [`NetPlan`](model::NetPlan). All elements are owned by the `NetPlan`, and referenced by
//!   their ids ([`NodeId`](model::NodeId), [`LinkId`](model::LinkId), ...). The index of an
//!   element is its position in the owning container, and changes when earlier elements are
//!   removed.
//!
//! - **[`Routing`](model::routing)**: The routing engine of hop-by-hop layers. The forwarding rules
//!   of a demand define an absorbing Markov chain, and the fundamental matrix of this chain
//!   yields the traffic on every link, the carried traffic of the demand, and the classification
//!   of routing cycles.
//!
//! - **[`Coupling`](model::coupling)**: Coupling of lower layer demands to upper layer links. The
//!   layers form a DAG, and the capacity of a coupled link always follows the carried traffic of
//!   its demand.
//!
//! - **[`Printer`](model::printer)**: Helper functions to format elements with node names, used
//!   for log and error messages.
//!
//! ## Features
//!
//! - *`check-consistency`*: If this feature is enabled, the default
//!   [configuration](model::NetPlanConfig) recomputes every cache from scratch after every
//!   mutation, and panics as soon as a cached value differs from the recomputed one.
//!
//! ## Logging
//!
//! The library logs using the [`log`](https://docs.rs/log) facade. Every applied mutation is
//! logged with `debug`, the internals of the routing engine with `trace`, and degenerate results
//! (closed routing cycles, oversubscribed links) with `warn`.

pub mod model;

// test modules
mod test;

pub use model::{NetPlan, NetPlanConfig, NetPlanError};
