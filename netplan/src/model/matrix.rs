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

//! Small dense matrix, used by the hop-by-hop routing engine to compute the fundamental matrix of
//! the absorbing Markov chain described by the forwarding rules.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Index, IndexMut};

/// Pivots below this value are treated as zero, and the matrix as singular.
const SINGULARITY_THRESHOLD: f64 = 1e-10;

/// Double precision matrix in row major order.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    elements: Vec<f64>,
}

impl Matrix {
    /// Matrix with all entries set to zero
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            elements: vec![0.0; rows * cols],
        }
    }

    /// Identity matrix of the given size
    pub fn identity(size: usize) -> Self {
        let mut m = Self::zeros(size, size);
        for i in 0..size {
            m[(i, i)] = 1.0;
        }
        m
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns a row as a slice
    pub fn row(&self, row: usize) -> &[f64] {
        &self.elements[row * self.cols..(row + 1) * self.cols]
    }

    /// Sum of every row
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.rows).map(|r| self.row(r).iter().sum()).collect()
    }

    /// Computes `I - self`. The matrix must be square.
    pub fn identity_minus(&self) -> Self {
        debug_assert_eq!(self.rows, self.cols);
        let mut m = Self::identity(self.rows);
        for (target, value) in m.elements.iter_mut().zip(self.elements.iter()) {
            *target -= value;
        }
        m
    }

    /// Matrix product `self * rhs`.
    pub fn mul(&self, rhs: &Self) -> Self {
        assert_eq!(self.cols, rhs.rows, "dimension mismatch in matrix product");
        let mut m = Self::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self[(i, k)];
                if a == 0.0 {
                    continue;
                }
                for j in 0..rhs.cols {
                    m[(i, j)] += a * rhs[(k, j)];
                }
            }
        }
        m
    }

    /// Transposed copy of the matrix
    pub fn transpose(&self) -> Self {
        let mut m = Self::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                m[(j, i)] = self[(i, j)];
            }
        }
        m
    }

    /// Inverse using Gauss-Jordan elimination with partial pivoting. Returns `None` if the matrix
    /// is singular (or not square).
    pub fn inverse(&self) -> Option<Self> {
        if self.rows != self.cols {
            return None;
        }
        let n = self.rows;
        let mut a = self.clone();
        let mut inv = Self::identity(n);

        for col in 0..n {
            // find the pivot
            let pivot = (col..n).max_by(|x, y| {
                a[(*x, col)]
                    .abs()
                    .partial_cmp(&a[(*y, col)].abs())
                    .unwrap_or(Ordering::Less)
            })?;
            if a[(pivot, col)].abs() < SINGULARITY_THRESHOLD {
                return None;
            }
            a.swap_rows(pivot, col);
            inv.swap_rows(pivot, col);

            let p = a[(col, col)];
            for j in 0..n {
                a[(col, j)] /= p;
                inv[(col, j)] /= p;
            }

            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = a[(row, col)];
                if factor == 0.0 {
                    continue;
                }
                for j in 0..n {
                    a[(row, j)] -= factor * a[(col, j)];
                    inv[(row, j)] -= factor * inv[(col, j)];
                }
            }
        }
        Some(inv)
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for j in 0..self.cols {
            self.elements.swap(a * self.cols + j, b * self.cols + j);
        }
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        debug_assert!(row < self.rows && col < self.cols);
        &self.elements[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        debug_assert!(row < self.rows && col < self.cols);
        &mut self.elements[row * self.cols + col]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.rows {
            let row = self.row(r).iter().map(|x| format!("{:.4}", x)).collect::<Vec<_>>();
            writeln!(f, "[{}]", row.join(", "))?;
        }
        Ok(())
    }
}
