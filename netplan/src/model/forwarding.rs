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

//! # Forwarding rules of hop-by-hop layers
//!
//! Both the splitting fractions `f_de` and the resulting carried traffic `x_de` are stored as
//! sparse maps keyed by the stable ids of demands and links. Dense matrices are only built inside
//! the routing engine, fresh for every computation.

use crate::model::types::{DemandId, LinkId};
use std::collections::{BTreeMap, HashMap};

/// Sparse row of values per link
pub type LinkValues = BTreeMap<LinkId, f64>;

/// Forwarding rules and the carried traffic they cause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForwardingRules {
    /// Splitting fractions without failures, set by the user
    fractions: HashMap<DemandId, LinkValues>,
    /// Carried traffic in the current failure state, derived
    carried: HashMap<DemandId, LinkValues>,
}

impl ForwardingRules {
    /// Fraction of the traffic of `demand` at the origin of `link` that is forwarded on `link`
    pub fn fraction(&self, demand: DemandId, link: LinkId) -> f64 {
        self.fractions.get(&demand).and_then(|r| r.get(&link)).copied().unwrap_or(0.0)
    }

    /// All non-zero fractions of a demand
    pub fn fractions(&self, demand: DemandId) -> LinkValues {
        self.fractions.get(&demand).cloned().unwrap_or_default()
    }

    /// Traffic of `demand` carried on `link` in the current failure state
    pub fn carried(&self, demand: DemandId, link: LinkId) -> f64 {
        self.carried.get(&demand).and_then(|r| r.get(&link)).copied().unwrap_or(0.0)
    }

    /// All non-zero carried traffic values of a demand
    pub fn carried_row(&self, demand: DemandId) -> LinkValues {
        self.carried.get(&demand).cloned().unwrap_or_default()
    }

    /// Iterate over all demands having forwarding rules
    pub fn demands(&self) -> impl Iterator<Item = DemandId> + '_ {
        self.fractions.keys().copied()
    }

    /// Iterate over all demands having carried traffic
    pub(crate) fn carried_demands(&self) -> impl Iterator<Item = DemandId> + '_ {
        self.carried.keys().copied()
    }

    /// Set a single fraction. A fraction of zero removes the rule.
    pub(crate) fn set_fraction(&mut self, demand: DemandId, link: LinkId, fraction: f64) {
        if fraction == 0.0 {
            if let Some(row) = self.fractions.get_mut(&demand) {
                row.remove(&link);
                if row.is_empty() {
                    self.fractions.remove(&demand);
                }
            }
        } else {
            self.fractions.entry(demand).or_insert_with(BTreeMap::new).insert(link, fraction);
        }
    }

    /// Remove all rules of the demand, returning them.
    pub(crate) fn clear_fractions(&mut self, demand: DemandId) -> LinkValues {
        self.fractions.remove(&demand).unwrap_or_default()
    }

    /// Replace the carried traffic row of the demand, returning the old one.
    pub(crate) fn replace_carried(&mut self, demand: DemandId, row: LinkValues) -> LinkValues {
        let row: LinkValues = row.into_iter().filter(|(_, v)| *v != 0.0).collect();
        if row.is_empty() {
            self.carried.remove(&demand).unwrap_or_default()
        } else {
            self.carried.insert(demand, row).unwrap_or_default()
        }
    }

    /// Remove every rule on the link, returning the affected demands. The carried traffic is not
    /// touched, the caller must recompute the affected demands.
    pub(crate) fn remove_link(&mut self, link: LinkId) -> Vec<DemandId> {
        let mut affected = Vec::new();
        for (d, row) in self.fractions.iter_mut() {
            if row.remove(&link).is_some() {
                affected.push(*d);
            }
        }
        self.fractions.retain(|_, row| !row.is_empty());
        affected
    }

    /// Forget everything about the demand
    pub(crate) fn remove_demand(&mut self, demand: DemandId) {
        self.fractions.remove(&demand);
        self.carried.remove(&demand);
    }

    /// Forget every rule and every carried traffic value
    pub(crate) fn clear(&mut self) {
        self.fractions.clear();
        self.carried.clear();
    }
}
