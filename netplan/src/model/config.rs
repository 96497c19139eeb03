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

//! Configuration of a network plan.

/// Default tolerance for traffic comparisons
pub const DEFAULT_PRECISION_FACTOR: f64 = 1e-3;

/// Configuration of a [`NetPlan`](crate::model::NetPlan).
///
/// - `precision_factor`: tolerance used for every traffic comparison (blocked traffic, fraction
///   sums, oversubscription).
/// - `check_consistency`: if set, the entire cache consistency check runs after every mutation,
///   and panics on the first violation. The default is enabled only with the cargo feature
///   `check-consistency`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetPlanConfig {
    /// Tolerance for traffic comparisons
    pub precision_factor: f64,
    /// Run the consistency check after every mutation
    pub check_consistency: bool,
}

impl Default for NetPlanConfig {
    fn default() -> Self {
        Self {
            precision_factor: DEFAULT_PRECISION_FACTOR,
            check_consistency: cfg!(feature = "check-consistency"),
        }
    }
}

impl NetPlanConfig {
    /// Configuration with the consistency check enabled.
    pub fn checked() -> Self {
        Self {
            check_consistency: true,
            ..Self::default()
        }
    }
}
