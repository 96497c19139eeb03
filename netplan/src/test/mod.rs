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

//! Tests of the network plan, with the consistency check enabled after every mutation.

#[cfg(test)]
mod test_aggregation;
#[cfg(test)]
mod test_hop_by_hop;
#[cfg(test)]
mod test_multicast;
#[cfg(test)]
mod test_network;

#[cfg(test)]
use crate::model::{NetPlan, NetPlanConfig};

/// Network plan which checks all caches after every mutation, with logging enabled.
#[cfg(test)]
pub(crate) fn checked_net() -> NetPlan {
    let _ = pretty_env_logger::try_init();
    NetPlan::with_config(NetPlanConfig::checked())
}
